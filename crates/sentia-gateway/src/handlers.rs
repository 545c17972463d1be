// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles `GET /sync/{source}/{entity_type}`, `POST /sync/{source}`,
//! `GET /sync/status`, and the public `/health` and `/metrics` endpoints.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use sentia_core::{
    EntityType, ErrorKind, SentiaError, SourceName, SyncError, SyncOutcome, SyncResult,
};
use sentia_sync::{SourceSchedule, SummaryResponse};

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Response body for `GET /sync/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub sources: Vec<SourceSchedule>,
    /// Live event subscribers, SSE streams included.
    pub subscribers: usize,
}

/// A [`SyncResult`] as returned by `POST /sync/{source}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResultBody {
    pub id: uuid::Uuid,
    pub source: SourceName,
    pub outcome: SyncOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub record_counts: BTreeMap<EntityType, u64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<EntityType, ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncErrorBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl From<&SyncError> for SyncErrorBody {
    fn from(err: &SyncError) -> Self {
        Self {
            kind: err.kind,
            message: err.message.clone(),
            entity_type: err.entity_type,
            status: err.status,
            retry_after_secs: err.retry_after_secs,
        }
    }
}

impl From<&SyncResult> for SyncResultBody {
    fn from(result: &SyncResult) -> Self {
        Self {
            id: result.id,
            source: result.source,
            outcome: result.outcome,
            started_at: result.started_at,
            finished_at: result.finished_at,
            record_counts: result.record_counts.clone(),
            failures: result.failures.clone(),
            error: result.error.as_ref().map(SyncErrorBody::from),
        }
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Status code and body for a failed request.
fn error_response(err: SentiaError) -> Response {
    match err {
        SentiaError::UnknownSource(_) | SentiaError::UnknownEntity { .. } => {
            error_body(StatusCode::NOT_FOUND, err.to_string())
        }
        SentiaError::NotConfigured {
            source_name,
            missing,
        } => (
            StatusCode::PRECONDITION_REQUIRED,
            Json(SummaryResponse::SetupRequired {
                source: source_name,
                provider: source_name.provider(),
                missing,
            }),
        )
            .into_response(),
        SentiaError::InvalidArgument(_) => error_body(StatusCode::BAD_REQUEST, err.to_string()),
        other => {
            tracing::error!(error = %other, "request failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

fn parse_source(raw: &str) -> Result<SourceName, Response> {
    raw.parse()
        .map_err(|_| error_body(StatusCode::NOT_FOUND, format!("unknown source `{raw}`")))
}

/// GET /sync/{source}/{entity_type}
///
/// 200 with cached data, 428 when the source needs credentials, 503 when a
/// sync produced nothing for this entity type.
pub async fn get_summary(
    State(state): State<GatewayState>,
    Path((source, entity_type)): Path<(String, String)>,
) -> Response {
    let source = match parse_source(&source) {
        Ok(source) => source,
        Err(response) => return response,
    };
    let Ok(entity_type) = entity_type.parse::<EntityType>() else {
        return error_body(
            StatusCode::NOT_FOUND,
            format!("unknown entity type `{entity_type}`"),
        );
    };

    match state.query.get_summary(source, entity_type).await {
        Ok(summary) => {
            let status = match &summary {
                SummaryResponse::Ready { .. } => StatusCode::OK,
                SummaryResponse::SetupRequired { .. } => StatusCode::PRECONDITION_REQUIRED,
                SummaryResponse::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            };
            (status, Json(summary)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /sync/{source}
///
/// Runs a sync now (or joins the one in flight) and returns its result.
pub async fn post_sync(State(state): State<GatewayState>, Path(source): Path<String>) -> Response {
    let source = match parse_source(&source) {
        Ok(source) => source,
        Err(response) => return response,
    };
    match state.query.coordinator().trigger_manual_sync(source).await {
        Ok(result) => Json(SyncResultBody::from(result.as_ref())).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /sync/status
pub async fn get_status(State(state): State<GatewayState>) -> Json<StatusResponse> {
    let coordinator = state.query.coordinator();
    Json(StatusResponse {
        sources: coordinator.schedules().await,
        subscribers: coordinator.notifier().subscriber_count(),
    })
}

/// GET /health
///
/// Unauthenticated liveness probe.
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

/// GET /metrics
///
/// Prometheus text exposition; 404 when metrics are disabled.
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => error_body(StatusCode::NOT_FOUND, "metrics are disabled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_result_body_is_camel_case() {
        let at = Utc::now();
        let result = SyncResult::failed(
            SourceName::Marketplace,
            at,
            at,
            SyncError::rate_limited(Some(std::time::Duration::from_secs(30))).with_status(429),
        );
        let json = serde_json::to_value(SyncResultBody::from(&result)).unwrap();
        assert_eq!(json["source"], "marketplace");
        assert_eq!(json["outcome"], "failed");
        assert!(json.get("startedAt").is_some());
        assert_eq!(json["recordCounts"], serde_json::json!({}));
        assert!(json.get("failures").is_none());
        assert_eq!(json["error"]["kind"], "rate_limited");
        assert_eq!(json["error"]["retryAfterSecs"], 30);
        assert_eq!(json["error"]["status"], 429);
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptimeSecs\":42"));
    }

    #[test]
    fn unknown_source_maps_to_not_found() {
        let response = error_response(SentiaError::UnknownSource("crm".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn not_configured_maps_to_precondition_required() {
        let response = error_response(SentiaError::NotConfigured {
            source_name: SourceName::Erp,
            missing: vec!["API key".into()],
        });
        assert_eq!(response.status(), StatusCode::PRECONDITION_REQUIRED);
    }

    #[test]
    fn internal_errors_map_to_500() {
        let response = error_response(SentiaError::Internal("boom".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
