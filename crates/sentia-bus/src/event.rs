// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events published by the sync coordinator and their JSON wire form.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sentia_core::{EntityType, SourceName, SyncResult};
use serde_json::{Map, Value, json};

/// Something a dashboard may want to know about.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A sync cycle finished, whatever its outcome.
    SyncResult(Arc<SyncResult>),
    /// Records of one entity type were persisted and cached.
    RecordsSynced {
        source: SourceName,
        entity_type: EntityType,
        count: u64,
        timestamp: DateTime<Utc>,
    },
}

impl SyncEvent {
    pub fn source(&self) -> SourceName {
        match self {
            Self::SyncResult(result) => result.source,
            Self::RecordsSynced { source, .. } => *source,
        }
    }

    /// Value of the wire `type` field; also used as the SSE event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SyncResult(_) => "sync_result",
            Self::RecordsSynced { .. } => "records_synced",
        }
    }

    /// JSON sent to dashboard sessions.
    ///
    /// `{"type":"sync_result","source","outcome","recordCounts","timestamp"}`,
    /// with `errorKind` added for failed cycles.
    pub fn to_wire_json(&self) -> Value {
        match self {
            Self::SyncResult(result) => {
                let counts: Map<String, Value> = result
                    .record_counts
                    .iter()
                    .map(|(entity, count)| (entity.to_string(), json!(count)))
                    .collect();
                let mut wire = json!({
                    "type": self.event_type(),
                    "source": result.source,
                    "outcome": result.outcome,
                    "recordCounts": counts,
                    "timestamp": result.finished_at.to_rfc3339(),
                });
                if let Some(error) = &result.error {
                    wire["errorKind"] = json!(error.kind);
                }
                wire
            }
            Self::RecordsSynced {
                source,
                entity_type,
                count,
                timestamp,
            } => json!({
                "type": self.event_type(),
                "source": source,
                "entityType": entity_type,
                "count": count,
                "timestamp": timestamp.to_rfc3339(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sentia_core::{ErrorKind, SyncError, SyncOutcome};
    use std::collections::BTreeMap;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn sync_result_wire_shape() {
        let mut counts = BTreeMap::new();
        counts.insert(EntityType::Orders, 5);
        counts.insert(EntityType::Inventory, 12);
        let result =
            SyncResult::from_entities(SourceName::Storefront, at(), at(), counts, Vec::new());
        let wire = SyncEvent::SyncResult(Arc::new(result)).to_wire_json();

        assert_eq!(wire["type"], "sync_result");
        assert_eq!(wire["source"], "storefront");
        assert_eq!(wire["outcome"], "success");
        assert_eq!(wire["recordCounts"]["orders"], 5);
        assert_eq!(wire["recordCounts"]["inventory"], 12);
        assert_eq!(wire["timestamp"], "2026-03-01T12:00:00+00:00");
        assert!(wire.get("errorKind").is_none());
    }

    #[test]
    fn failed_result_carries_error_kind() {
        let result = SyncResult::failed(
            SourceName::Marketplace,
            at(),
            at(),
            SyncError::rate_limited(None),
        );
        assert_eq!(result.outcome, SyncOutcome::Failed);
        let wire = SyncEvent::SyncResult(Arc::new(result)).to_wire_json();
        assert_eq!(wire["outcome"], "failed");
        assert_eq!(wire["errorKind"], json!(ErrorKind::RateLimited));
    }

    #[test]
    fn records_synced_wire_shape() {
        let event = SyncEvent::RecordsSynced {
            source: SourceName::Erp,
            entity_type: EntityType::Shipments,
            count: 7,
            timestamp: at(),
        };
        let wire = event.to_wire_json();
        assert_eq!(wire["type"], "records_synced");
        assert_eq!(wire["entityType"], "shipments");
        assert_eq!(wire["count"], 7);
        assert_eq!(event.source(), SourceName::Erp);
    }
}
