// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Amazon Selling-Partner API client.
//!
//! Authenticates with a Login-with-Amazon refresh token exchanged for a
//! short-lived access token, sent as `x-amz-access-token`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use sentia_config::model::MarketplaceConfig;
use sentia_config::sources::missing_marketplace;
use sentia_core::{
    AdapterType, EntityType, HealthStatus, PluginAdapter, SentiaError, SourceClient, SourceName,
    SourceSummary, SyncError, SyncedRecord,
};

use crate::http::{self, amount, round2};
use crate::token::{TokenCache, TokenResponse, token_error};
use crate::xero::unsupported;

const MAX_PAGES: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Money {
    #[serde(default)]
    currency_code: Option<String>,
    #[serde(default, with = "amount")]
    amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Order {
    amazon_order_id: String,
    #[serde(default)]
    purchase_date: Option<String>,
    #[serde(default)]
    order_status: Option<String>,
    #[serde(default)]
    fulfillment_channel: Option<String>,
    #[serde(default)]
    order_total: Option<Money>,
    #[serde(default)]
    number_of_items_unshipped: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OrdersPayload {
    #[serde(default)]
    orders: Vec<Order>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrdersResponse {
    payload: OrdersPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryDetails {
    #[serde(default)]
    fulfillable_quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventorySummary {
    seller_sku: String,
    #[serde(default)]
    asin: Option<String>,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    total_quantity: i64,
    #[serde(default)]
    inventory_details: Option<InventoryDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryPayload {
    #[serde(default)]
    inventory_summaries: Vec<InventorySummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InventoryResponse {
    payload: InventoryPayload,
    #[serde(default)]
    pagination: Option<Pagination>,
}

/// Client for the Amazon Selling-Partner API.
pub struct AmazonClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    marketplace_id: String,
    endpoint: String,
    token_url: String,
    order_lookback: chrono::Duration,
    timeout: Duration,
    token: TokenCache,
}

impl AmazonClient {
    pub fn new(config: &MarketplaceConfig, timeout: Duration) -> Result<Self, SentiaError> {
        let missing = missing_marketplace(config);
        let (Some(client_id), Some(client_secret), Some(refresh_token), true) = (
            config.client_id.clone(),
            config.client_secret.clone(),
            config.refresh_token.clone(),
            missing.is_empty(),
        ) else {
            return Err(SentiaError::NotConfigured {
                source_name: SourceName::Marketplace,
                missing,
            });
        };

        Ok(Self {
            http: http::build_client(timeout)?,
            client_id,
            client_secret,
            refresh_token,
            marketplace_id: config.marketplace_id.clone(),
            endpoint: config.endpoint.clone(),
            token_url: config.token_url.clone(),
            order_lookback: chrono::Duration::days(i64::from(config.order_lookback_days)),
            timeout,
            token: TokenCache::new(),
        })
    }

    async fn access_token(&self) -> Result<String, SyncError> {
        self.token
            .get_or_fetch(|| async move {
                let request = self.http.post(&self.token_url).json(&json!({
                    "grant_type": "refresh_token",
                    "refresh_token": self.refresh_token,
                    "client_id": self.client_id,
                    "client_secret": self.client_secret,
                }));
                http::send_json::<TokenResponse>(request, self.timeout)
                    .await
                    .map(|(token, _)| token)
                    .map_err(token_error)
            })
            .await
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: reqwest::Url,
        token: &str,
    ) -> Result<T, SyncError> {
        let request = self
            .http
            .get(url)
            .header("x-amz-access-token", token)
            .header(reqwest::header::ACCEPT, "application/json");
        http::send_json::<T>(request, self.timeout)
            .await
            .map(|(body, _)| body)
    }

    async fn fetch_orders(&self) -> Result<SourceSummary, SyncError> {
        let token = self.access_token().await?;
        let created_after =
            (Utc::now() - self.order_lookback).to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut orders = Vec::new();
        let mut next_token: Option<String> = None;
        for page in 1..=MAX_PAGES {
            let mut url = http::join_url(&self.endpoint, "/orders/v0/orders")?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("MarketplaceIds", &self.marketplace_id);
                match &next_token {
                    Some(next) => query.append_pair("NextToken", next),
                    None => query.append_pair("CreatedAfter", &created_after),
                };
            }
            let body: OrdersResponse = self.get(url, &token).await?;
            debug!(page, fetched = body.payload.orders.len(), "amazon orders page fetched");
            orders.extend(body.payload.orders);
            next_token = body.payload.next_token.filter(|t| !t.is_empty());
            if next_token.is_none() {
                break;
            }
        }
        Ok(summarize_orders(orders))
    }

    async fn fetch_inventory(&self) -> Result<SourceSummary, SyncError> {
        let token = self.access_token().await?;

        let mut summaries = Vec::new();
        let mut next_token: Option<String> = None;
        for page in 1..=MAX_PAGES {
            let mut url = http::join_url(&self.endpoint, "/fba/inventory/v1/summaries")?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("details", "true")
                    .append_pair("granularityType", "Marketplace")
                    .append_pair("granularityId", &self.marketplace_id)
                    .append_pair("marketplaceIds", &self.marketplace_id);
                if let Some(next) = &next_token {
                    query.append_pair("nextToken", next);
                }
            }
            let body: InventoryResponse = self.get(url, &token).await?;
            debug!(
                page,
                fetched = body.payload.inventory_summaries.len(),
                "amazon inventory page fetched"
            );
            summaries.extend(body.payload.inventory_summaries);
            next_token = body
                .pagination
                .and_then(|p| p.next_token)
                .filter(|t| !t.is_empty());
            if next_token.is_none() {
                break;
            }
        }
        Ok(summarize_inventory(summaries))
    }
}

fn summarize_orders(orders: Vec<Order>) -> SourceSummary {
    let revenue: f64 = orders
        .iter()
        .filter_map(|o| o.order_total.as_ref())
        .map(|t| t.amount)
        .sum();
    let unshipped = orders
        .iter()
        .filter(|o| {
            matches!(
                o.order_status.as_deref(),
                Some("Unshipped") | Some("PartiallyShipped")
            )
        })
        .count();
    let currency = orders
        .iter()
        .filter_map(|o| o.order_total.as_ref())
        .find_map(|t| t.currency_code.clone());

    let aggregate = json!({
        "orderCount": orders.len(),
        "totalRevenue": round2(revenue),
        "unshippedCount": unshipped,
        "currency": currency,
    });
    let records = orders
        .into_iter()
        .map(|order| {
            let key = order.amazon_order_id.clone();
            SyncedRecord::new(key, serde_json::to_value(&order).unwrap_or_default())
        })
        .collect();
    SourceSummary { records, aggregate }
}

fn summarize_inventory(summaries: Vec<InventorySummary>) -> SourceSummary {
    let total_units: i64 = summaries.iter().map(|s| s.total_quantity).sum();
    let fulfillable: i64 = summaries
        .iter()
        .filter_map(|s| s.inventory_details.as_ref())
        .map(|d| d.fulfillable_quantity)
        .sum();

    let aggregate = json!({
        "skuCount": summaries.len(),
        "totalUnits": total_units,
        "fulfillableUnits": fulfillable,
    });
    let records = summaries
        .into_iter()
        .map(|summary| {
            let key = summary.seller_sku.clone();
            SyncedRecord::new(key, serde_json::to_value(&summary).unwrap_or_default())
        })
        .collect();
    SourceSummary { records, aggregate }
}

#[async_trait]
impl PluginAdapter for AmazonClient {
    fn name(&self) -> &str {
        "amazon-sp-api"
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
impl SourceClient for AmazonClient {
    fn source(&self) -> SourceName {
        SourceName::Marketplace
    }

    fn entity_types(&self) -> &[EntityType] {
        SourceName::Marketplace.entity_types()
    }

    async fn fetch_summary(&self, entity_type: EntityType) -> Result<SourceSummary, SyncError> {
        let result = match entity_type {
            EntityType::Orders => self.fetch_orders().await,
            EntityType::Inventory => self.fetch_inventory().await,
            other => Err(unsupported(SourceName::Marketplace, other)),
        };
        result.map_err(|e| e.with_entity(entity_type))
    }

    async fn reset_auth(&self) {
        self.token.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unshipped_orders_are_counted() {
        let body: OrdersResponse = serde_json::from_value(json!({
            "payload": {
                "Orders": [
                    {"AmazonOrderId": "202-1", "OrderStatus": "Shipped",
                     "OrderTotal": {"CurrencyCode": "GBP", "Amount": "19.99"}},
                    {"AmazonOrderId": "202-2", "OrderStatus": "Unshipped",
                     "OrderTotal": {"CurrencyCode": "GBP", "Amount": "5.01"}},
                    {"AmazonOrderId": "202-3", "OrderStatus": "Pending"}
                ]
            }
        }))
        .unwrap();
        let summary = summarize_orders(body.payload.orders);
        assert_eq!(summary.aggregate["orderCount"], 3);
        assert_eq!(summary.aggregate["totalRevenue"], 25.0);
        assert_eq!(summary.aggregate["unshippedCount"], 1);
        assert_eq!(summary.aggregate["currency"], "GBP");
        assert_eq!(summary.records[2].natural_key, "202-3");
    }

    #[test]
    fn inventory_is_keyed_by_seller_sku() {
        let body: InventoryResponse = serde_json::from_value(json!({
            "payload": {"inventorySummaries": [
                {"sellerSku": "GIN-70", "totalQuantity": 12,
                 "inventoryDetails": {"fulfillableQuantity": 10}},
                {"sellerSku": "GIN-20", "totalQuantity": 3}
            ]},
            "pagination": {}
        }))
        .unwrap();
        let summary = summarize_inventory(body.payload.inventory_summaries);
        assert_eq!(summary.records[0].natural_key, "GIN-70");
        assert_eq!(summary.aggregate["skuCount"], 2);
        assert_eq!(summary.aggregate["totalUnits"], 15);
        assert_eq!(summary.aggregate["fulfillableUnits"], 10);
    }

    #[test]
    fn blank_refresh_token_is_missing() {
        let config = MarketplaceConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            refresh_token: Some("  ".into()),
            ..MarketplaceConfig::default()
        };
        match AmazonClient::new(&config, Duration::from_secs(5)) {
            Err(SentiaError::NotConfigured { missing, .. }) => {
                assert_eq!(missing, vec!["refresh token"]);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("client built without a refresh token"),
        }
    }
}
