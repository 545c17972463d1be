// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unleashed ERP client.
//!
//! Every request carries `api-auth-id` and `api-auth-signature`, the latter
//! being base64(HMAC-SHA256(query string, API key)).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use tracing::debug;

use sentia_config::model::ErpConfig;
use sentia_config::sources::missing_erp;
use sentia_core::{
    AdapterType, EntityType, HealthStatus, PluginAdapter, SentiaError, SourceClient, SourceName,
    SourceSummary, SyncError, SyncedRecord,
};

use crate::http::{self, amount, round2};
use crate::xero::unsupported;

type HmacSha256 = Hmac<Sha256>;

const PAGE_SIZE: &str = "200";
const MAX_PAGES: u32 = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PageInfo {
    #[serde(default = "one")]
    number_of_pages: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Page<T> {
    #[serde(default)]
    pagination: Option<PageInfo>,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StockOnHand {
    product_code: String,
    #[serde(default)]
    product_description: Option<String>,
    #[serde(default, with = "amount")]
    qty_on_hand: f64,
    #[serde(default, with = "amount")]
    available_qty: f64,
    #[serde(default, with = "amount")]
    total_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Currency {
    #[serde(default)]
    currency_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SalesOrder {
    order_number: String,
    #[serde(default)]
    order_status: Option<String>,
    #[serde(default)]
    order_date: Option<String>,
    #[serde(default, with = "amount")]
    total: f64,
    #[serde(default)]
    currency: Option<Currency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SalesShipment {
    shipment_number: String,
    #[serde(default)]
    order_number: Option<String>,
    #[serde(default)]
    shipment_status: Option<String>,
    #[serde(default)]
    dispatch_date: Option<String>,
}

/// Client for the Unleashed REST API.
pub struct UnleashedClient {
    http: reqwest::Client,
    api_id: String,
    api_key: String,
    base_url: String,
    client_type: String,
    timeout: Duration,
}

impl UnleashedClient {
    pub fn new(config: &ErpConfig, timeout: Duration) -> Result<Self, SentiaError> {
        let missing = missing_erp(config);
        let (Some(api_id), Some(api_key), true) = (
            config.api_id.clone(),
            config.api_key.clone(),
            missing.is_empty(),
        ) else {
            return Err(SentiaError::NotConfigured {
                source_name: SourceName::Erp,
                missing,
            });
        };

        Ok(Self {
            http: http::build_client(timeout)?,
            api_id,
            api_key,
            base_url: config.base_url.clone(),
            client_type: config.client_type.clone(),
            timeout,
        })
    }

    /// GET one page of `resource`, signing its query string.
    async fn get_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        page: u32,
    ) -> Result<Page<T>, SyncError> {
        let mut url = http::join_url(&self.base_url, &format!("/{resource}/{page}"))?;
        url.query_pairs_mut().append_pair("pageSize", PAGE_SIZE);
        let signature = sign(url.query().unwrap_or_default(), &self.api_key)?;

        let request = self
            .http
            .get(url)
            .header("api-auth-id", &self.api_id)
            .header("api-auth-signature", signature)
            .header("client-type", &self.client_type)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        http::send_json::<Page<T>>(request, self.timeout)
            .await
            .map(|(body, _)| body)
    }

    async fn get_all<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>, SyncError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let batch: Page<T> = self.get_page(resource, page).await?;
            let pages = batch.pagination.map_or(1, |p| p.number_of_pages);
            debug!(resource, page, pages, fetched = batch.items.len(), "unleashed page fetched");
            items.extend(batch.items);
            if page >= pages.min(MAX_PAGES) {
                break;
            }
            page += 1;
        }
        Ok(items)
    }
}

/// base64(HMAC-SHA256(`query`, `key`)). An empty query signs the empty string.
pub fn sign(query: &str, key: &str) -> Result<String, SyncError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| SyncError::unauthenticated(format!("unusable API key: {e}")))?;
    mac.update(query.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn summarize_stock(items: Vec<StockOnHand>) -> SourceSummary {
    let on_hand: f64 = items.iter().map(|i| i.qty_on_hand).sum();
    let available: f64 = items.iter().map(|i| i.available_qty).sum();
    let value: f64 = items.iter().map(|i| i.total_cost).sum();
    let aggregate = json!({
        "productCount": items.len(),
        "totalOnHand": round2(on_hand),
        "totalAvailable": round2(available),
        "stockValue": round2(value),
    });
    let records = items
        .into_iter()
        .map(|item| {
            let key = item.product_code.clone();
            SyncedRecord::new(key, serde_json::to_value(&item).unwrap_or_default())
        })
        .collect();
    SourceSummary { records, aggregate }
}

fn summarize_orders(orders: Vec<SalesOrder>) -> SourceSummary {
    let total: f64 = orders.iter().map(|o| o.total).sum();
    let open = orders
        .iter()
        .filter(|o| !matches!(o.order_status.as_deref(), Some("Completed") | Some("Deleted")))
        .count();
    let currency = orders
        .iter()
        .filter_map(|o| o.currency.as_ref())
        .find_map(|c| c.currency_code.clone());
    let aggregate = json!({
        "orderCount": orders.len(),
        "totalValue": round2(total),
        "openCount": open,
        "currency": currency,
    });
    let records = orders
        .into_iter()
        .map(|order| {
            let key = order.order_number.clone();
            SyncedRecord::new(key, serde_json::to_value(&order).unwrap_or_default())
        })
        .collect();
    SourceSummary { records, aggregate }
}

fn summarize_shipments(shipments: Vec<SalesShipment>) -> SourceSummary {
    let dispatched = shipments
        .iter()
        .filter(|s| s.shipment_status.as_deref() == Some("Dispatched"))
        .count();
    let aggregate = json!({
        "shipmentCount": shipments.len(),
        "dispatchedCount": dispatched,
        "pendingCount": shipments.len() - dispatched,
    });
    let records = shipments
        .into_iter()
        .map(|shipment| {
            let key = shipment.shipment_number.clone();
            SyncedRecord::new(key, serde_json::to_value(&shipment).unwrap_or_default())
        })
        .collect();
    SourceSummary { records, aggregate }
}

#[async_trait]
impl PluginAdapter for UnleashedClient {
    fn name(&self) -> &str {
        "unleashed"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, SentiaError> {
        match self.get_page::<serde_json::Value>("Currencies", 1).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), SentiaError> {
        Ok(())
    }
}

#[async_trait]
impl SourceClient for UnleashedClient {
    fn source(&self) -> SourceName {
        SourceName::Erp
    }

    fn entity_types(&self) -> &[EntityType] {
        SourceName::Erp.entity_types()
    }

    async fn fetch_summary(&self, entity_type: EntityType) -> Result<SourceSummary, SyncError> {
        let result = match entity_type {
            EntityType::Inventory => self.get_all("StockOnHand").await.map(summarize_stock),
            EntityType::Orders => self.get_all("SalesOrders").await.map(summarize_orders),
            EntityType::Shipments => self
                .get_all("SalesShipments")
                .await
                .map(summarize_shipments),
            other => Err(unsupported(SourceName::Erp, other)),
        };
        result.map_err(|e| e.with_entity(entity_type))
    }
}
