// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Sentia sync service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Sentia configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values. A source whose
/// credentials are absent is simply never scheduled.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SentiaConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Persistent store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Coordinator-wide settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Xero accounting source.
    #[serde(default)]
    pub accounting: AccountingConfig,

    /// Shopify storefront source.
    #[serde(default)]
    pub storefront: StorefrontConfig,

    /// Amazon Selling-Partner marketplace source.
    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    /// Unleashed ERP source.
    #[serde(default)]
    pub erp: ErpConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required on `/sync` and `/events`. `None` leaves them open.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Per-connection buffer of undelivered server-sent events.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_event_buffer() -> usize {
    64
}

/// Persistent store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    "sentia.db".to_string()
}

fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Coordinator-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Deadline for one upstream fetch when a source does not set its own.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// How long shutdown waits for in-flight cycles before exiting.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Interval of the task that actively evicts expired cache entries.
    #[serde(default = "default_cache_purge_secs")]
    pub cache_purge_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            cache_purge_interval_secs: default_cache_purge_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

fn default_cache_purge_secs() -> u64 {
    60
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Xero accounting configuration (custom-connection client credentials).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccountingConfig {
    /// OAuth2 client ID.
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth2 client secret.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Xero organisation (tenant) ID, sent as `xero-tenant-id`.
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// OAuth2 scopes requested with the client-credentials grant.
    #[serde(default = "default_xero_scopes")]
    pub scopes: Vec<String>,

    /// Accounting API base URL.
    #[serde(default = "default_xero_base_url")]
    pub base_url: String,

    /// OAuth2 token endpoint.
    #[serde(default = "default_xero_token_url")]
    pub token_url: String,

    #[serde(default = "default_accounting_interval")]
    pub sync_interval_secs: u64,

    /// Defaults to half of `sync_interval_secs`.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    /// Defaults to `sync.default_timeout_secs`.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            tenant_id: None,
            scopes: default_xero_scopes(),
            base_url: default_xero_base_url(),
            token_url: default_xero_token_url(),
            sync_interval_secs: default_accounting_interval(),
            cache_ttl_secs: None,
            timeout_secs: None,
        }
    }
}

fn default_xero_scopes() -> Vec<String> {
    vec!["accounting.transactions.read".to_string()]
}

fn default_xero_base_url() -> String {
    "https://api.xero.com".to_string()
}

fn default_xero_token_url() -> String {
    "https://identity.xero.com/connect/token".to_string()
}

fn default_accounting_interval() -> u64 {
    1800
}

/// Shopify storefront configuration (Admin API access token).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorefrontConfig {
    /// Shop domain, e.g. `example.myshopify.com`.
    #[serde(default)]
    pub shop_domain: Option<String>,

    /// Admin API access token.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Admin API version.
    #[serde(default = "default_shopify_api_version")]
    pub api_version: String,

    /// Overrides `https://{shop_domain}` (used for testing and proxies).
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_storefront_interval")]
    pub sync_interval_secs: u64,

    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            shop_domain: None,
            access_token: None,
            api_version: default_shopify_api_version(),
            base_url: None,
            sync_interval_secs: default_storefront_interval(),
            cache_ttl_secs: None,
            timeout_secs: None,
        }
    }
}

fn default_shopify_api_version() -> String {
    "2024-10".to_string()
}

fn default_storefront_interval() -> u64 {
    900
}

/// Amazon Selling-Partner API configuration (Login with Amazon refresh token).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarketplaceConfig {
    /// LWA application client ID.
    #[serde(default)]
    pub client_id: Option<String>,

    /// LWA application client secret.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Seller authorization refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Marketplace to query.
    #[serde(default = "default_marketplace_id")]
    pub marketplace_id: String,

    /// Regional SP-API endpoint.
    #[serde(default = "default_sp_api_endpoint")]
    pub endpoint: String,

    /// LWA token endpoint.
    #[serde(default = "default_lwa_token_url")]
    pub token_url: String,

    /// How far back order listings reach.
    #[serde(default = "default_order_lookback_days")]
    pub order_lookback_days: u32,

    #[serde(default = "default_marketplace_interval")]
    pub sync_interval_secs: u64,

    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            marketplace_id: default_marketplace_id(),
            endpoint: default_sp_api_endpoint(),
            token_url: default_lwa_token_url(),
            order_lookback_days: default_order_lookback_days(),
            sync_interval_secs: default_marketplace_interval(),
            cache_ttl_secs: None,
            timeout_secs: None,
        }
    }
}

fn default_marketplace_id() -> String {
    // UK marketplace.
    "A1F83G8C2ARO7P".to_string()
}

fn default_sp_api_endpoint() -> String {
    "https://sellingpartnerapi-eu.amazon.com".to_string()
}

fn default_lwa_token_url() -> String {
    "https://api.amazon.com/auth/o2/token".to_string()
}

fn default_order_lookback_days() -> u32 {
    30
}

fn default_marketplace_interval() -> u64 {
    1800
}

/// Unleashed ERP configuration (API ID + HMAC-signed requests).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ErpConfig {
    /// API ID, sent as `api-auth-id`.
    #[serde(default)]
    pub api_id: Option<String>,

    /// API key used to sign query strings.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL.
    #[serde(default = "default_unleashed_base_url")]
    pub base_url: String,

    /// Value of the `client-type` header.
    #[serde(default = "default_unleashed_client_type")]
    pub client_type: String,

    #[serde(default = "default_erp_interval")]
    pub sync_interval_secs: u64,

    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ErpConfig {
    fn default() -> Self {
        Self {
            api_id: None,
            api_key: None,
            base_url: default_unleashed_base_url(),
            client_type: default_unleashed_client_type(),
            sync_interval_secs: default_erp_interval(),
            cache_ttl_secs: None,
            timeout_secs: None,
        }
    }
}

fn default_unleashed_base_url() -> String {
    "https://api.unleashedsoftware.com".to_string()
}

fn default_unleashed_client_type() -> String {
    "sentia/sync".to_string()
}

fn default_erp_interval() -> u64 {
    900
}
