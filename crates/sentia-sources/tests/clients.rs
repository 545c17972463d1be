// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-level tests for the source clients against a wiremock server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sentia_config::model::{AccountingConfig, ErpConfig, MarketplaceConfig, StorefrontConfig};
use sentia_core::{EntityType, ErrorKind, SourceClient};
use sentia_sources::unleashed::sign;
use sentia_sources::{AmazonClient, ShopifyClient, UnleashedClient, XeroClient};

const TIMEOUT: Duration = Duration::from_secs(5);

fn xero(server: &MockServer) -> XeroClient {
    let config = AccountingConfig {
        client_id: Some("client".into()),
        client_secret: Some("secret".into()),
        tenant_id: Some("tenant-1".into()),
        base_url: server.uri(),
        token_url: format!("{}/connect/token", server.uri()),
        ..AccountingConfig::default()
    };
    XeroClient::new(&config, TIMEOUT).unwrap()
}

fn shopify(server: &MockServer, timeout: Duration) -> ShopifyClient {
    let config = StorefrontConfig {
        shop_domain: Some("sentia.myshopify.com".into()),
        access_token: Some("shpat_test".into()),
        base_url: Some(server.uri()),
        ..StorefrontConfig::default()
    };
    ShopifyClient::new(&config, timeout).unwrap()
}

fn amazon(server: &MockServer) -> AmazonClient {
    let config = MarketplaceConfig {
        client_id: Some("amzn-client".into()),
        client_secret: Some("amzn-secret".into()),
        refresh_token: Some("Atzr|refresh".into()),
        endpoint: server.uri(),
        token_url: format!("{}/auth/o2/token", server.uri()),
        ..MarketplaceConfig::default()
    };
    AmazonClient::new(&config, TIMEOUT).unwrap()
}

fn unleashed(server: &MockServer) -> UnleashedClient {
    let config = ErpConfig {
        api_id: Some("api-id".into()),
        api_key: Some("api-key".into()),
        base_url: server.uri(),
        ..ErpConfig::default()
    };
    UnleashedClient::new(&config, TIMEOUT).unwrap()
}

fn token_body(token: &str) -> serde_json::Value {
    json!({"access_token": token, "token_type": "Bearer", "expires_in": 1800})
}

// --- Xero ---

#[tokio::test]
async fn xero_fetches_invoices_with_tenant_header_and_caches_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("xero-tok")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Invoices"))
        .and(header("authorization", "Bearer xero-tok"))
        .and(header("xero-tenant-id", "tenant-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Invoices": [
                {"InvoiceID": "inv-1", "Total": 120.0, "AmountDue": 20.0, "CurrencyCode": "GBP"},
                {"InvoiceID": "inv-2", "Total": 80.0, "AmountDue": 0.0, "CurrencyCode": "GBP"}
            ]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = xero(&server);
    let summary = client.fetch_summary(EntityType::Invoices).await.unwrap();
    assert_eq!(summary.records.len(), 2);
    assert_eq!(summary.aggregate["totalInvoiced"], 200.0);
    assert_eq!(summary.aggregate["totalOutstanding"], 20.0);

    // Second fetch reuses the cached token.
    client.fetch_summary(EntityType::Invoices).await.unwrap();
}

#[tokio::test]
async fn xero_reset_auth_fetches_a_new_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("xero-tok")))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Invoices": []})))
        .mount(&server)
        .await;

    let client = xero(&server);
    client.fetch_summary(EntityType::Invoices).await.unwrap();
    client.reset_auth().await;
    let summary = client.fetch_summary(EntityType::Invoices).await.unwrap();
    assert_eq!(summary.aggregate["invoiceCount"], 0);
}

#[tokio::test]
async fn xero_rejected_client_credentials_are_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_client"})))
        .mount(&server)
        .await;

    let err = xero(&server)
        .fetch_summary(EntityType::Invoices)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthenticated);
    assert_eq!(err.entity_type, Some(EntityType::Invoices));
}

#[tokio::test]
async fn xero_expired_token_is_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("stale")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Invoices"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = xero(&server)
        .fetch_summary(EntityType::Invoices)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthenticated);
    assert_eq!(err.status, Some(401));
}

#[tokio::test]
async fn xero_rejects_entity_types_it_does_not_sync() {
    let server = MockServer::start().await;
    let err = xero(&server)
        .fetch_summary(EntityType::Shipments)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UpstreamError);
    assert_eq!(err.entity_type, Some(EntityType::Shipments));
}

// --- Shopify ---

#[tokio::test]
async fn shopify_follows_link_header_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/api/2024-10/orders.json"))
        .and(query_param("page_info", "page-2"))
        .and(header("X-Shopify-Access-Token", "shpat_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": [{"id": 3, "total_price": "5.00", "currency": "GBP",
                        "fulfillment_status": "fulfilled"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let next = format!(
        "<{}/admin/api/2024-10/orders.json?limit=250&page_info=page-2>; rel=\"next\"",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/admin/api/2024-10/orders.json"))
        .and(query_param("status", "any"))
        .and(header("X-Shopify-Access-Token", "shpat_test"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", next.as_str())
                .set_body_json(json!({
                    "orders": [
                        {"id": 1, "total_price": "10.50", "currency": "GBP"},
                        {"id": 2, "total_price": "4.50", "currency": "GBP"}
                    ]
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let summary = shopify(&server, TIMEOUT)
        .fetch_summary(EntityType::Orders)
        .await
        .unwrap();
    assert_eq!(summary.aggregate["orderCount"], 3);
    assert_eq!(summary.aggregate["totalRevenue"], 20.0);
    assert_eq!(summary.aggregate["unfulfilledCount"], 2);
    let keys: Vec<_> = summary.records.iter().map(|r| r.natural_key.as_str()).collect();
    assert_eq!(keys, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn shopify_throttling_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/api/2024-10/products.json"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2.0"))
        .mount(&server)
        .await;

    let err = shopify(&server, TIMEOUT)
        .fetch_summary(EntityType::Inventory)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimited);
    assert_eq!(err.retry_after_secs, Some(2));
    assert_eq!(err.entity_type, Some(EntityType::Inventory));
}

#[tokio::test]
async fn shopify_server_error_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = shopify(&server, TIMEOUT)
        .fetch_summary(EntityType::Orders)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UpstreamError);
    assert_eq!(err.status, Some(503));
    assert!(err.message.contains("maintenance"));
}

#[tokio::test]
async fn shopify_malformed_body_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = shopify(&server, TIMEOUT)
        .fetch_summary(EntityType::Orders)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UpstreamError);
    assert!(err.message.contains("malformed"));
}

#[tokio::test]
async fn shopify_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"orders": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = shopify(&server, Duration::from_millis(300))
        .fetch_summary(EntityType::Orders)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
}

// --- Amazon SP-API ---

#[tokio::test]
async fn amazon_exchanges_refresh_token_and_pages_orders() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/o2/token"))
        .and(body_partial_json(json!({
            "grant_type": "refresh_token",
            "refresh_token": "Atzr|refresh",
            "client_id": "amzn-client"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("Atza|access")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders/v0/orders"))
        .and(query_param("NextToken", "n1"))
        .and(header("x-amz-access-token", "Atza|access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "payload": {"Orders": [
                {"AmazonOrderId": "203-2", "OrderStatus": "Unshipped",
                 "OrderTotal": {"CurrencyCode": "GBP", "Amount": "7.50"}}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders/v0/orders"))
        .and(query_param("MarketplaceIds", "A1F83G8C2ARO7P"))
        .and(header("x-amz-access-token", "Atza|access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "payload": {
                "Orders": [
                    {"AmazonOrderId": "203-1", "OrderStatus": "Shipped",
                     "OrderTotal": {"CurrencyCode": "GBP", "Amount": "12.50"}}
                ],
                "NextToken": "n1"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let summary = amazon(&server)
        .fetch_summary(EntityType::Orders)
        .await
        .unwrap();
    assert_eq!(summary.aggregate["orderCount"], 2);
    assert_eq!(summary.aggregate["totalRevenue"], 20.0);
    assert_eq!(summary.aggregate["unshippedCount"], 1);
}

#[tokio::test]
async fn amazon_inventory_uses_marketplace_granularity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/o2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("Atza|access")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fba/inventory/v1/summaries"))
        .and(query_param("granularityType", "Marketplace"))
        .and(query_param("granularityId", "A1F83G8C2ARO7P"))
        .and(query_param("details", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "payload": {"inventorySummaries": [
                {"sellerSku": "GIN-70", "totalQuantity": 9,
                 "inventoryDetails": {"fulfillableQuantity": 7}}
            ]}
        })))
        .mount(&server)
        .await;

    let summary = amazon(&server)
        .fetch_summary(EntityType::Inventory)
        .await
        .unwrap();
    assert_eq!(summary.records[0].natural_key, "GIN-70");
    assert_eq!(summary.aggregate["fulfillableUnits"], 7);
}

#[tokio::test]
async fn amazon_revoked_refresh_token_is_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/o2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let err = amazon(&server)
        .fetch_summary(EntityType::Orders)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn amazon_quota_exceeded_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/o2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("Atza|access")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders/v0/orders"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "errors": [{"code": "QuotaExceeded"}]
        })))
        .mount(&server)
        .await;

    let err = amazon(&server)
        .fetch_summary(EntityType::Orders)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimited);
    assert_eq!(err.retry_after_secs, None);
}

// --- Unleashed ---

#[tokio::test]
async fn unleashed_signs_requests_and_walks_pages() {
    let server = MockServer::start().await;
    let signature = sign("pageSize=200", "api-key").unwrap();
    for (page, code) in [(1, "GIN-70"), (2, "GIN-20")] {
        Mock::given(method("GET"))
            .and(path(format!("/StockOnHand/{page}")))
            .and(query_param("pageSize", "200"))
            .and(header("api-auth-id", "api-id"))
            .and(header("api-auth-signature", signature.as_str()))
            .and(header("client-type", "sentia/sync"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Pagination": {
                    "NumberOfItems": 2, "PageSize": 1, "PageNumber": page, "NumberOfPages": 2
                },
                "Items": [{"ProductCode": code, "QtyOnHand": 4, "AvailableQty": 3, "TotalCost": 10}]
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let summary = unleashed(&server)
        .fetch_summary(EntityType::Inventory)
        .await
        .unwrap();
    assert_eq!(summary.aggregate["productCount"], 2);
    assert_eq!(summary.aggregate["totalOnHand"], 8.0);
    let keys: Vec<_> = summary.records.iter().map(|r| r.natural_key.as_str()).collect();
    assert_eq!(keys, vec!["GIN-70", "GIN-20"]);
}

#[tokio::test]
async fn unleashed_bad_signature_is_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/SalesOrders/1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = unleashed(&server)
        .fetch_summary(EntityType::Orders)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthenticated);
    assert_eq!(err.entity_type, Some(EntityType::Orders));
}

#[tokio::test]
async fn unleashed_shipments_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/SalesShipments/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Pagination": {"NumberOfPages": 1},
            "Items": [
                {"ShipmentNumber": "SS-1", "ShipmentStatus": "Dispatched"},
                {"ShipmentNumber": "SS-2", "ShipmentStatus": "Parked"}
            ]
        })))
        .mount(&server)
        .await;

    let summary = unleashed(&server)
        .fetch_summary(EntityType::Shipments)
        .await
        .unwrap();
    assert_eq!(summary.aggregate["dispatchedCount"], 1);
    assert_eq!(summary.aggregate["pendingCount"], 1);
}
