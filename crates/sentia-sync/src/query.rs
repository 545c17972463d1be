// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache-first read path for dashboard summaries.
//!
//! Every answer is one of three shapes: real data with its age, a setup
//! request naming the missing credentials, or an explicit "unavailable"
//! carrying the error kind. There is no fallback payload.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use sentia_cache::{CacheEntry, CacheKey};
use sentia_core::{EntityType, ErrorKind, SentiaError, SourceName};

use crate::coordinator::SyncCoordinator;

/// Answer to one summary request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SummaryResponse {
    /// Cached data from the last successful sync.
    Ready {
        source: SourceName,
        entity_type: EntityType,
        payload: serde_json::Value,
        cached_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        age_secs: u64,
    },
    /// The source has no credentials; nothing can be shown until it does.
    SetupRequired {
        source: SourceName,
        provider: &'static str,
        missing: Vec<String>,
    },
    /// A sync was attempted and produced no data for this entity type.
    Unavailable {
        source: SourceName,
        entity_type: EntityType,
        kind: ErrorKind,
        message: String,
    },
}

/// Dashboard query façade over a [`SyncCoordinator`].
#[derive(Clone)]
pub struct DashboardQuery {
    coordinator: SyncCoordinator,
}

impl DashboardQuery {
    pub fn new(coordinator: SyncCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    /// Summary for one source and entity type.
    ///
    /// A cache miss synchronously runs (or joins) a sync of the source,
    /// waiting at most the source's timeout for it.
    /// Fails with `UnknownSource` or `UnknownEntity` for requests that can
    /// never be answered.
    pub async fn get_summary(
        &self,
        source: SourceName,
        entity_type: EntityType,
    ) -> Result<SummaryResponse, SentiaError> {
        let descriptor = self
            .coordinator
            .descriptor(source)
            .ok_or_else(|| SentiaError::UnknownSource(source.to_string()))?;
        if !descriptor.supports(entity_type) {
            return Err(SentiaError::UnknownEntity {
                source_name: source,
                entity_type: entity_type.to_string(),
            });
        }
        if !descriptor.is_configured() {
            return Ok(setup_required(source, descriptor.missing.clone()));
        }

        let cache = self.coordinator.cache();
        let key = CacheKey::new(source, entity_type);
        if let Some(entry) = cache.get(&key).await {
            return Ok(self.ready(entry));
        }

        debug!(source = %source, entity_type = %entity_type, "cache miss, syncing");
        let deadline = descriptor.timeout;
        let sync = self.coordinator.trigger_manual_sync(source);
        let result = match tokio::time::timeout(deadline, sync).await {
            Ok(Ok(result)) => result,
            Ok(Err(SentiaError::NotConfigured { missing, .. })) => {
                return Ok(setup_required(source, missing));
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                // The cycle keeps running and refreshes the cache when done.
                debug!(
                    source = %source,
                    entity_type = %entity_type,
                    "sync outlasted read deadline"
                );
                return Ok(SummaryResponse::Unavailable {
                    source,
                    entity_type,
                    kind: ErrorKind::Timeout,
                    message: format!(
                        "{source} sync did not finish within {}s",
                        deadline.as_secs()
                    ),
                });
            }
        };

        if let Some(entry) = cache.get(&key).await {
            return Ok(self.ready(entry));
        }

        let (kind, message) = match (result.failure_kind_for(entity_type), &result.error) {
            (Some(kind), Some(err))
                if err.kind == kind && err.entity_type.is_none_or(|t| t == entity_type) =>
            {
                (kind, err.message.clone())
            }
            (Some(kind), _) => (kind, format!("{entity_type} sync failed: {kind}")),
            (None, _) => (
                ErrorKind::UpstreamError,
                format!("no {entity_type} data available after sync"),
            ),
        };
        Ok(SummaryResponse::Unavailable {
            source,
            entity_type,
            kind,
            message,
        })
    }

    fn ready(&self, entry: CacheEntry) -> SummaryResponse {
        let age = entry.age_at(self.coordinator.clock().now());
        SummaryResponse::Ready {
            source: entry.key.source,
            entity_type: entry.key.entity_type,
            payload: entry.payload,
            cached_at: entry.cached_at,
            expires_at: entry.expires_at,
            age_secs: age.as_secs(),
        }
    }
}

fn setup_required(source: SourceName, missing: Vec<String>) -> SummaryResponse {
    SummaryResponse::SetupRequired {
        source,
        provider: source.provider(),
        missing,
    }
}
