// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. All problems are
//! collected; validation does not stop at the first one.

use crate::diagnostic::ConfigError;
use crate::model::SentiaConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for sync intervals and cache TTLs: one week.
const MAX_SCHEDULE_SECS: u64 = 7 * 24 * 60 * 60;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &SentiaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if let Some(token) = &config.server.bearer_token
        && token.trim().is_empty()
    {
        fail("server.bearer_token must not be blank; omit it to disable auth".to_string());
    }

    if config.server.event_buffer == 0 {
        fail("server.event_buffer must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "logging.level `{}` must be one of: {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.sync.default_timeout_secs == 0 {
        fail("sync.default_timeout_secs must be at least 1".to_string());
    }
    if config.sync.cache_purge_interval_secs == 0 {
        fail("sync.cache_purge_interval_secs must be at least 1".to_string());
    }

    let schedules = [
        (
            "accounting",
            config.accounting.sync_interval_secs,
            config.accounting.cache_ttl_secs,
            config.accounting.timeout_secs,
        ),
        (
            "storefront",
            config.storefront.sync_interval_secs,
            config.storefront.cache_ttl_secs,
            config.storefront.timeout_secs,
        ),
        (
            "marketplace",
            config.marketplace.sync_interval_secs,
            config.marketplace.cache_ttl_secs,
            config.marketplace.timeout_secs,
        ),
        (
            "erp",
            config.erp.sync_interval_secs,
            config.erp.cache_ttl_secs,
            config.erp.timeout_secs,
        ),
    ];

    for (section, interval, ttl, timeout) in schedules {
        if interval == 0 {
            fail(format!("{section}.sync_interval_secs must be at least 1"));
        } else if interval > MAX_SCHEDULE_SECS {
            fail(format!(
                "{section}.sync_interval_secs must be at most {MAX_SCHEDULE_SECS}"
            ));
        }
        match ttl {
            Some(0) => fail(format!("{section}.cache_ttl_secs must be at least 1")),
            Some(ttl) if ttl > MAX_SCHEDULE_SECS => fail(format!(
                "{section}.cache_ttl_secs must be at most {MAX_SCHEDULE_SECS}"
            )),
            _ => {}
        }
        let timeout = timeout.unwrap_or(config.sync.default_timeout_secs);
        if timeout == 0 {
            fail(format!("{section}.timeout_secs must be at least 1"));
        } else if interval > 0 && timeout >= interval {
            fail(format!(
                "{section}.timeout_secs ({timeout}) must be shorter than \
                 sync_interval_secs ({interval})"
            ));
        }
    }

    if let Some(domain) = &config.storefront.shop_domain
        && domain.contains("://")
    {
        fail(format!(
            "storefront.shop_domain `{domain}` must be a bare host such as `example.myshopify.com`"
        ));
    }

    for (key, url) in [
        ("accounting.base_url", config.accounting.base_url.as_str()),
        ("accounting.token_url", config.accounting.token_url.as_str()),
        ("marketplace.endpoint", config.marketplace.endpoint.as_str()),
        ("marketplace.token_url", config.marketplace.token_url.as_str()),
        ("erp.base_url", config.erp.base_url.as_str()),
    ]
    .into_iter()
    .chain(
        config
            .storefront
            .base_url
            .as_deref()
            .map(|url| ("storefront.base_url", url)),
    ) {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(format!("{key} `{url}` must start with http:// or https://"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &SentiaConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&SentiaConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = SentiaConfig::default();
        config.storage.database_path = "".to_string();
        assert!(messages(&config).iter().any(|m| m.contains("database_path")));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut config = SentiaConfig::default();
        config.erp.cache_ttl_secs = Some(0);
        assert!(messages(&config).iter().any(|m| m.contains("erp.cache_ttl_secs")));
    }

    #[test]
    fn oversized_ttl_and_interval_are_rejected() {
        let mut config = SentiaConfig::default();
        config.accounting.cache_ttl_secs = Some(10_000_000_000_000);
        config.marketplace.sync_interval_secs = u64::MAX;
        let messages = messages(&config);
        assert!(messages.iter().any(|m| m.contains("accounting.cache_ttl_secs")));
        assert!(messages.iter().any(|m| m.contains("marketplace.sync_interval_secs")));
    }

    #[test]
    fn timeout_must_fit_inside_interval() {
        let mut config = SentiaConfig::default();
        config.storefront.sync_interval_secs = 10;
        config.storefront.timeout_secs = Some(10);
        assert!(messages(&config).iter().any(|m| m.contains("storefront.timeout_secs")));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = SentiaConfig::default();
        config.server.host = "".to_string();
        config.logging.level = "loud".to_string();
        config.accounting.sync_interval_secs = 0;
        assert_eq!(messages(&config).len(), 3);
    }

    #[test]
    fn shop_domain_with_scheme_is_rejected() {
        let mut config = SentiaConfig::default();
        config.storefront.shop_domain = Some("https://demo.myshopify.com".into());
        assert!(messages(&config).iter().any(|m| m.contains("shop_domain")));
    }

    #[test]
    fn blank_bearer_token_is_rejected() {
        let mut config = SentiaConfig::default();
        config.server.bearer_token = Some(" ".into());
        assert!(messages(&config).iter().any(|m| m.contains("bearer_token")));
    }
}
