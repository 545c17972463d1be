// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered config loading with Figment.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. `/etc/sentia/sentia.toml`
//! 3. `~/.config/sentia/sentia.toml`
//! 4. `./sentia.toml`
//! 5. `SENTIA_*` environment variables

// figment::Error is external and large.
#![allow(clippy::result_large_err)]

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SentiaConfig;

/// Top-level sections addressable from the environment.
const SECTIONS: &[&str] = &[
    "server",
    "storage",
    "logging",
    "sync",
    "prometheus",
    "accounting",
    "storefront",
    "marketplace",
    "erp",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
pub fn load_config() -> Result<SentiaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<SentiaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SentiaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SentiaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SentiaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used for XDG loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SentiaConfig::default()))
        .merge(Toml::file("/etc/sentia/sentia.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sentia/sentia.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("sentia.toml"))
        .merge(env_provider())
}

/// Maps `SENTIA_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Only the leading section name is split off, so `SENTIA_ERP_SYNC_INTERVAL_SECS`
/// becomes `erp.sync_interval_secs` and never `erp_sync.interval_secs`.
fn env_provider() -> Env {
    Env::prefixed("SENTIA_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(
            map_env_key("storefront_access_token"),
            "storefront.access_token"
        );
        assert_eq!(
            map_env_key("erp_sync_interval_secs"),
            "erp.sync_interval_secs"
        );
        assert_eq!(
            map_env_key("sync_shutdown_grace_secs"),
            "sync.shutdown_grace_secs"
        );
        assert_eq!(map_env_key("server_port"), "server.port");
    }

    #[test]
    fn unknown_prefix_passes_through() {
        assert_eq!(map_env_key("nonsense"), "nonsense");
    }
}
