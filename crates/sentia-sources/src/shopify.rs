// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shopify Admin REST client (custom app access token).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use sentia_config::model::StorefrontConfig;
use sentia_config::sources::missing_storefront;
use sentia_core::{
    AdapterType, EntityType, HealthStatus, PluginAdapter, SentiaError, SourceClient, SourceName,
    SourceSummary, SyncError, SyncedRecord,
};

use crate::http::{self, amount, round2};
use crate::xero::unsupported;

const PAGE_LIMIT: &str = "250";
const MAX_PAGES: u32 = 20;
/// Variants at or below this quantity count as low stock.
const LOW_STOCK_THRESHOLD: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Order {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, with = "amount")]
    total_price: f64,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    financial_status: Option<String>,
    #[serde(default)]
    fulfillment_status: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrdersPage {
    #[serde(default)]
    orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
struct Product {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    variants: Vec<Variant>,
}

#[derive(Debug, Deserialize)]
struct Variant {
    id: u64,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    inventory_quantity: i64,
    #[serde(default, with = "amount")]
    price: f64,
}

#[derive(Debug, Deserialize)]
struct ProductsPage {
    #[serde(default)]
    products: Vec<Product>,
}

/// One stocked variant, as persisted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InventoryRow {
    product_id: u64,
    variant_id: u64,
    title: Option<String>,
    sku: Option<String>,
    inventory_quantity: i64,
    price: f64,
}

/// Client for the Shopify Admin REST API.
pub struct ShopifyClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
    api_version: String,
    timeout: Duration,
}

impl ShopifyClient {
    pub fn new(config: &StorefrontConfig, timeout: Duration) -> Result<Self, SentiaError> {
        let missing = missing_storefront(config);
        let (Some(shop_domain), Some(access_token), true) = (
            config.shop_domain.clone(),
            config.access_token.clone(),
            missing.is_empty(),
        ) else {
            return Err(SentiaError::NotConfigured {
                source_name: SourceName::Storefront,
                missing,
            });
        };

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{shop_domain}"));

        Ok(Self {
            http: http::build_client(timeout)?,
            access_token,
            base_url,
            api_version: config.api_version.clone(),
            timeout,
        })
    }

    /// GET every page of `resource`, following `Link: <...>; rel="next"`.
    async fn get_pages<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        extra: &[(&str, &str)],
    ) -> Result<Vec<T>, SyncError> {
        let mut url = http::join_url(
            &self.base_url,
            &format!("/admin/api/{}/{resource}", self.api_version),
        )?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", PAGE_LIMIT);
            for (k, v) in extra {
                query.append_pair(k, v);
            }
        }

        let mut pages = Vec::new();
        for page in 1..=MAX_PAGES {
            let request = self
                .http
                .get(url.clone())
                .header("X-Shopify-Access-Token", &self.access_token)
                .header(reqwest::header::ACCEPT, "application/json");
            let (body, headers) = http::send_json::<T>(request, self.timeout).await?;
            pages.push(body);
            debug!(resource, page, "shopify page fetched");

            match next_link(&headers) {
                Some(next) => {
                    url = reqwest::Url::parse(&next).map_err(|e| {
                        SyncError::upstream(format!("invalid pagination link `{next}`: {e}"))
                    })?;
                }
                None => break,
            }
        }
        Ok(pages)
    }

    async fn fetch_orders(&self) -> Result<SourceSummary, SyncError> {
        let pages: Vec<OrdersPage> = self.get_pages("orders.json", &[("status", "any")]).await?;
        Ok(summarize_orders(
            pages.into_iter().flat_map(|p| p.orders).collect(),
        ))
    }

    async fn fetch_inventory(&self) -> Result<SourceSummary, SyncError> {
        let pages: Vec<ProductsPage> = self.get_pages("products.json", &[]).await?;
        Ok(summarize_inventory(
            pages.into_iter().flat_map(|p| p.products).collect(),
        ))
    }
}

/// URL of the `rel="next"` entry of a `Link` header.
fn next_link(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let link = headers.get(reqwest::header::LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        if !params.contains("rel=\"next\"") {
            return None;
        }
        let target = target.trim();
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

fn summarize_orders(orders: Vec<Order>) -> SourceSummary {
    let revenue: f64 = orders.iter().map(|o| o.total_price).sum();
    let unfulfilled = orders
        .iter()
        .filter(|o| o.fulfillment_status.is_none())
        .count();
    let currency = orders.iter().find_map(|o| o.currency.clone());

    let aggregate = json!({
        "orderCount": orders.len(),
        "totalRevenue": round2(revenue),
        "unfulfilledCount": unfulfilled,
        "currency": currency,
    });
    let records = orders
        .into_iter()
        .map(|order| {
            SyncedRecord::new(
                order.id.to_string(),
                serde_json::to_value(&order).unwrap_or_default(),
            )
        })
        .collect();
    SourceSummary { records, aggregate }
}

fn summarize_inventory(products: Vec<Product>) -> SourceSummary {
    let product_count = products.len();
    let rows: Vec<InventoryRow> = products
        .into_iter()
        .flat_map(|product| {
            let title = product.title;
            let product_id = product.id;
            product.variants.into_iter().map(move |v| InventoryRow {
                product_id,
                variant_id: v.id,
                title: title.clone(),
                sku: v.sku.filter(|s| !s.trim().is_empty()),
                inventory_quantity: v.inventory_quantity,
                price: v.price,
            })
        })
        .collect();

    let total_units: i64 = rows.iter().map(|r| r.inventory_quantity.max(0)).sum();
    let out_of_stock = rows.iter().filter(|r| r.inventory_quantity <= 0).count();
    let low_stock = rows
        .iter()
        .filter(|r| r.inventory_quantity > 0 && r.inventory_quantity <= LOW_STOCK_THRESHOLD)
        .count();

    let aggregate = json!({
        "productCount": product_count,
        "variantCount": rows.len(),
        "totalUnits": total_units,
        "lowStockCount": low_stock,
        "outOfStockCount": out_of_stock,
    });
    let records = rows
        .into_iter()
        .map(|row| {
            let key = row
                .sku
                .clone()
                .unwrap_or_else(|| format!("variant-{}", row.variant_id));
            SyncedRecord::new(key, serde_json::to_value(&row).unwrap_or_default())
        })
        .collect();
    SourceSummary { records, aggregate }
}

#[async_trait]
impl PluginAdapter for ShopifyClient {
    fn name(&self) -> &str {
        "shopify"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, SentiaError> {
        let url = http::join_url(
            &self.base_url,
            &format!("/admin/api/{}/shop.json", self.api_version),
        )?;
        let request = self
            .http
            .get(url)
            .header("X-Shopify-Access-Token", &self.access_token);
        match http::send_json::<serde_json::Value>(request, self.timeout).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), SentiaError> {
        Ok(())
    }
}

#[async_trait]
impl SourceClient for ShopifyClient {
    fn source(&self) -> SourceName {
        SourceName::Storefront
    }

    fn entity_types(&self) -> &[EntityType] {
        SourceName::Storefront.entity_types()
    }

    async fn fetch_summary(&self, entity_type: EntityType) -> Result<SourceSummary, SyncError> {
        let result = match entity_type {
            EntityType::Orders => self.fetch_orders().await,
            EntityType::Inventory => self.fetch_inventory().await,
            other => Err(unsupported(SourceName::Storefront, other)),
        };
        result.map_err(|e| e.with_entity(entity_type))
    }
}
