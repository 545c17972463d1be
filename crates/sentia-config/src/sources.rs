// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-source schedule derived from configuration.
//!
//! A source is configured when every credential it needs is present and
//! non-blank. Unconfigured sources still get a descriptor so callers can
//! report exactly what is missing.

use std::time::Duration;

use sentia_core::{SourceDescriptor, SourceName};

use crate::model::{
    AccountingConfig, ErpConfig, MarketplaceConfig, SentiaConfig, StorefrontConfig,
};

/// Schedule fields shared by every source section.
struct Schedule {
    interval_secs: u64,
    cache_ttl_secs: Option<u64>,
    timeout_secs: Option<u64>,
}

/// Descriptors for all four sources, in [`SourceName::ALL`] order.
pub fn source_descriptors(config: &SentiaConfig) -> Vec<SourceDescriptor> {
    SourceName::ALL
        .iter()
        .map(|name| source_descriptor(config, *name))
        .collect()
}

/// Descriptor for one source.
pub fn source_descriptor(config: &SentiaConfig, name: SourceName) -> SourceDescriptor {
    let (schedule, missing) = match name {
        SourceName::Accounting => (
            Schedule {
                interval_secs: config.accounting.sync_interval_secs,
                cache_ttl_secs: config.accounting.cache_ttl_secs,
                timeout_secs: config.accounting.timeout_secs,
            },
            missing_accounting(&config.accounting),
        ),
        SourceName::Storefront => (
            Schedule {
                interval_secs: config.storefront.sync_interval_secs,
                cache_ttl_secs: config.storefront.cache_ttl_secs,
                timeout_secs: config.storefront.timeout_secs,
            },
            missing_storefront(&config.storefront),
        ),
        SourceName::Marketplace => (
            Schedule {
                interval_secs: config.marketplace.sync_interval_secs,
                cache_ttl_secs: config.marketplace.cache_ttl_secs,
                timeout_secs: config.marketplace.timeout_secs,
            },
            missing_marketplace(&config.marketplace),
        ),
        SourceName::Erp => (
            Schedule {
                interval_secs: config.erp.sync_interval_secs,
                cache_ttl_secs: config.erp.cache_ttl_secs,
                timeout_secs: config.erp.timeout_secs,
            },
            missing_erp(&config.erp),
        ),
    };

    let mut descriptor = SourceDescriptor::new(name, Duration::from_secs(schedule.interval_secs))
        .with_timeout(Duration::from_secs(
            schedule
                .timeout_secs
                .unwrap_or(config.sync.default_timeout_secs),
        ))
        .with_missing(missing);
    if let Some(ttl) = schedule.cache_ttl_secs {
        descriptor = descriptor.with_cache_ttl(Duration::from_secs(ttl));
    }
    descriptor
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

fn collect_missing(required: &[(&Option<String>, &str)]) -> Vec<String> {
    required
        .iter()
        .filter(|(value, _)| is_blank(value))
        .map(|(_, label)| (*label).to_string())
        .collect()
}

pub fn missing_accounting(cfg: &AccountingConfig) -> Vec<String> {
    collect_missing(&[
        (&cfg.client_id, "client ID"),
        (&cfg.client_secret, "client secret"),
        (&cfg.tenant_id, "tenant ID"),
    ])
}

pub fn missing_storefront(cfg: &StorefrontConfig) -> Vec<String> {
    collect_missing(&[
        (&cfg.shop_domain, "shop domain"),
        (&cfg.access_token, "access token"),
    ])
}

pub fn missing_marketplace(cfg: &MarketplaceConfig) -> Vec<String> {
    collect_missing(&[
        (&cfg.client_id, "LWA client ID"),
        (&cfg.client_secret, "LWA client secret"),
        (&cfg.refresh_token, "refresh token"),
    ])
}

pub fn missing_erp(cfg: &ErpConfig) -> Vec<String> {
    collect_missing(&[(&cfg.api_id, "API ID"), (&cfg.api_key, "API key")])
}
