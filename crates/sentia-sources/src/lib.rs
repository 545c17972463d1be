// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upstream source clients for the Sentia sync service.
//!
//! One [`SourceClient`] per provider: Xero (accounting), Shopify
//! (storefront), Amazon SP-API (marketplace) and Unleashed (ERP). Clients
//! classify every failure into an [`ErrorKind`](sentia_core::ErrorKind) and
//! never retry on their own; scheduling decisions belong to the coordinator.

pub mod amazon;
pub mod http;
pub mod shopify;
pub mod token;
pub mod unleashed;
pub mod xero;

use std::sync::Arc;

use sentia_config::SentiaConfig;
use sentia_config::sources::source_descriptor;
use sentia_core::{SentiaError, SourceClient, SourceName};
use tracing::info;

pub use amazon::AmazonClient;
pub use shopify::ShopifyClient;
pub use unleashed::UnleashedClient;
pub use xero::XeroClient;

/// Build the client for one source, using its configured fetch timeout.
///
/// Fails with `NotConfigured` when credentials are absent.
pub fn build_client(
    config: &SentiaConfig,
    name: SourceName,
) -> Result<Arc<dyn SourceClient>, SentiaError> {
    let timeout = source_descriptor(config, name).timeout;
    let client: Arc<dyn SourceClient> = match name {
        SourceName::Accounting => Arc::new(XeroClient::new(&config.accounting, timeout)?),
        SourceName::Storefront => Arc::new(ShopifyClient::new(&config.storefront, timeout)?),
        SourceName::Marketplace => Arc::new(AmazonClient::new(&config.marketplace, timeout)?),
        SourceName::Erp => Arc::new(UnleashedClient::new(&config.erp, timeout)?),
    };
    Ok(client)
}

/// Clients for every configured source. Unconfigured sources are skipped
/// and logged; any other construction failure is returned.
pub fn build_clients(config: &SentiaConfig) -> Result<Vec<Arc<dyn SourceClient>>, SentiaError> {
    let mut clients = Vec::new();
    for name in SourceName::ALL {
        match build_client(config, name) {
            Ok(client) => clients.push(client),
            Err(SentiaError::NotConfigured { missing, .. }) => {
                info!(
                    source = %name,
                    provider = name.provider(),
                    missing = %missing.join(", "),
                    "source not configured, skipping"
                );
            }
            Err(e) => return Err(e),
        }
    }
    Ok(clients)
}
