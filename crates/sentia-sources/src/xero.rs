// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Xero accounting client (custom connection, client-credentials grant).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use sentia_config::model::AccountingConfig;
use sentia_config::sources::missing_accounting;
use sentia_core::{
    AdapterType, EntityType, HealthStatus, PluginAdapter, SentiaError, SourceClient, SourceName,
    SourceSummary, SyncError, SyncedRecord,
};

use crate::http::{self, amount, round2};
use crate::token::{TokenCache, TokenResponse, token_error};

/// Xero returns invoices in pages of this size.
const PAGE_SIZE: usize = 100;
const MAX_PAGES: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Invoice {
    #[serde(rename = "InvoiceID")]
    invoice_id: String,
    #[serde(default)]
    invoice_number: Option<String>,
    #[serde(default, rename = "Type")]
    invoice_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, with = "amount")]
    total: f64,
    #[serde(default, with = "amount")]
    amount_due: f64,
    #[serde(default)]
    currency_code: Option<String>,
    #[serde(default)]
    date_string: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InvoicesPage {
    #[serde(default)]
    invoices: Vec<Invoice>,
}

/// Client for the Xero Accounting API.
pub struct XeroClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    tenant_id: String,
    scopes: Vec<String>,
    base_url: String,
    token_url: String,
    timeout: Duration,
    token: TokenCache,
}

impl XeroClient {
    /// Build a client from the `[accounting]` section.
    ///
    /// Fails with `NotConfigured` naming every absent credential.
    pub fn new(config: &AccountingConfig, timeout: Duration) -> Result<Self, SentiaError> {
        let missing = missing_accounting(config);
        let (Some(client_id), Some(client_secret), Some(tenant_id), true) = (
            config.client_id.clone(),
            config.client_secret.clone(),
            config.tenant_id.clone(),
            missing.is_empty(),
        ) else {
            return Err(SentiaError::NotConfigured {
                source_name: SourceName::Accounting,
                missing,
            });
        };

        Ok(Self {
            http: http::build_client(timeout)?,
            client_id,
            client_secret,
            tenant_id,
            scopes: config.scopes.clone(),
            base_url: config.base_url.clone(),
            token_url: config.token_url.clone(),
            timeout,
            token: TokenCache::new(),
        })
    }

    async fn access_token(&self) -> Result<String, SyncError> {
        self.token
            .get_or_fetch(|| async move {
                let body = format!(
                    "grant_type=client_credentials&scope={}",
                    self.scopes.join("%20")
                );
                let request = self
                    .http
                    .post(&self.token_url)
                    .basic_auth(&self.client_id, Some(&self.client_secret))
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded",
                    )
                    .body(body);
                http::send_json::<TokenResponse>(request, self.timeout)
                    .await
                    .map(|(token, _)| token)
                    .map_err(token_error)
            })
            .await
    }

    async fn fetch_invoices(&self) -> Result<SourceSummary, SyncError> {
        let token = self.access_token().await?;
        let mut invoices = Vec::new();

        for page in 1..=MAX_PAGES {
            let mut url = http::join_url(&self.base_url, "/api.xro/2.0/Invoices")?;
            url.query_pairs_mut().append_pair("page", &page.to_string());
            let request = self
                .http
                .get(url)
                .bearer_auth(&token)
                .header("xero-tenant-id", &self.tenant_id)
                .header(reqwest::header::ACCEPT, "application/json");
            let (batch, _) = http::send_json::<InvoicesPage>(request, self.timeout).await?;
            let fetched = batch.invoices.len();
            invoices.extend(batch.invoices);
            debug!(page, fetched, "xero invoices page fetched");
            if fetched < PAGE_SIZE {
                break;
            }
        }

        Ok(summarize_invoices(invoices))
    }
}

fn summarize_invoices(invoices: Vec<Invoice>) -> SourceSummary {
    let total: f64 = invoices.iter().map(|i| i.total).sum();
    let outstanding: f64 = invoices.iter().map(|i| i.amount_due).sum();
    let outstanding_count = invoices.iter().filter(|i| i.amount_due > 0.0).count();
    let currency = invoices.iter().find_map(|i| i.currency_code.clone());

    let aggregate = json!({
        "invoiceCount": invoices.len(),
        "totalInvoiced": round2(total),
        "totalOutstanding": round2(outstanding),
        "outstandingCount": outstanding_count,
        "currency": currency,
    });

    let records = invoices
        .into_iter()
        .map(|invoice| {
            let key = invoice.invoice_id.clone();
            SyncedRecord::new(key, serde_json::to_value(&invoice).unwrap_or_default())
        })
        .collect();

    SourceSummary { records, aggregate }
}

#[async_trait]
impl PluginAdapter for XeroClient {
    fn name(&self) -> &str {
        "xero"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, SentiaError> {
        match self.access_token().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), SentiaError> {
        Ok(())
    }
}

#[async_trait]
impl SourceClient for XeroClient {
    fn source(&self) -> SourceName {
        SourceName::Accounting
    }

    fn entity_types(&self) -> &[EntityType] {
        SourceName::Accounting.entity_types()
    }

    async fn fetch_summary(&self, entity_type: EntityType) -> Result<SourceSummary, SyncError> {
        let result = match entity_type {
            EntityType::Invoices => self.fetch_invoices().await,
            other => Err(unsupported(SourceName::Accounting, other)),
        };
        result.map_err(|e| e.with_entity(entity_type))
    }

    async fn reset_auth(&self) {
        self.token.clear().await;
    }
}

pub(crate) fn unsupported(source: SourceName, entity_type: EntityType) -> SyncError {
    SyncError::upstream(format!("{source} does not provide {entity_type}"))
}
