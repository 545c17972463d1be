// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use sentia_core::SentiaError;
use sentia_sync::DashboardQuery;

use crate::auth::{AuthConfig, auth_middleware};
use crate::{handlers, sse};

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Prometheus render function; `/metrics` answers 404 without one.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            prometheus_render: None,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub query: DashboardQuery,
    pub auth: AuthConfig,
    pub health: HealthState,
    /// Per-connection SSE buffer, in events.
    pub event_buffer: usize,
}

impl GatewayState {
    /// State with auth disabled, metrics off and a 64-event SSE buffer.
    pub fn new(query: DashboardQuery) -> Self {
        Self {
            query,
            auth: AuthConfig::default(),
            health: HealthState::default(),
            event_buffer: 64,
        }
    }
}

/// Gateway server configuration (mirrors `ServerConfig` from sentia-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the router.
///
/// `/health` and `/metrics` are always public. `/sync/*` and `/events`
/// require the bearer token when one is configured.
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let mut api_routes = Router::new()
        .route("/sync/status", get(handlers::get_status))
        .route("/sync/{source}", post(handlers::post_sync))
        .route("/sync/{source}/{entity_type}", get(handlers::get_summary))
        .route("/events", get(sse::stream_events));
    if state.auth.is_enabled() {
        api_routes = api_routes.route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ));
    } else {
        tracing::warn!("gateway bearer token not set, API routes are unauthenticated");
    }
    let api_routes = api_routes.with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the gateway until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), SentiaError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SentiaError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| SentiaError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_state_defaults_to_no_metrics() {
        let health = HealthState::default();
        assert!(health.prometheus_render.is_none());
    }

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}
