// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the coordinator, stores, clients, and gateway.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{ErrorKind, SyncError};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Source,
    Storage,
    Cache,
    Observability,
}

/// One of the four upstream systems the dashboard aggregates.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceName {
    /// Xero accounting.
    Accounting,
    /// Shopify storefront.
    Storefront,
    /// Amazon Selling-Partner marketplace.
    Marketplace,
    /// Unleashed ERP.
    Erp,
}

impl SourceName {
    pub const ALL: [SourceName; 4] = [
        SourceName::Accounting,
        SourceName::Storefront,
        SourceName::Marketplace,
        SourceName::Erp,
    ];

    /// Name of the upstream product, for operator-facing messages.
    pub fn provider(&self) -> &'static str {
        match self {
            SourceName::Accounting => "Xero",
            SourceName::Storefront => "Shopify",
            SourceName::Marketplace => "Amazon SP-API",
            SourceName::Erp => "Unleashed",
        }
    }

    /// Entity types this source knows how to sync, in fetch order.
    pub fn entity_types(&self) -> &'static [EntityType] {
        match self {
            SourceName::Accounting => &[EntityType::Invoices],
            SourceName::Storefront => &[EntityType::Orders, EntityType::Inventory],
            SourceName::Marketplace => &[EntityType::Orders, EntityType::Inventory],
            SourceName::Erp => &[
                EntityType::Inventory,
                EntityType::Orders,
                EntityType::Shipments,
            ],
        }
    }
}

/// Kind of business entity synced from a source.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityType {
    Invoices,
    Orders,
    Inventory,
    Shipments,
}

/// Static description of one upstream source, fixed at process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub name: SourceName,
    pub sync_interval: Duration,
    pub cache_ttl: Duration,
    /// Deadline for a single upstream fetch.
    pub timeout: Duration,
    pub entity_types: Vec<EntityType>,
    /// Human-readable names of absent credentials. Empty when configured.
    pub missing: Vec<String>,
}

impl SourceDescriptor {
    /// Build a descriptor with the source's standard entity types.
    /// `cache_ttl` defaults to half the sync interval.
    pub fn new(name: SourceName, sync_interval: Duration) -> Self {
        Self {
            name,
            sync_interval,
            cache_ttl: sync_interval / 2,
            timeout: Duration::from_secs(15),
            entity_types: name.entity_types().to_vec(),
            missing: Vec::new(),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_missing(mut self, missing: Vec<String>) -> Self {
        self.missing = missing;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn supports(&self, entity_type: EntityType) -> bool {
        self.entity_types.contains(&entity_type)
    }
}

/// One business record returned by a source client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedRecord {
    /// Business identifier (SKU, order number, invoice ID) unique within
    /// its source and entity type.
    pub natural_key: String,
    pub data: serde_json::Value,
}

impl SyncedRecord {
    pub fn new(natural_key: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            natural_key: natural_key.into(),
            data,
        }
    }
}

/// What a source client returns for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub records: Vec<SyncedRecord>,
    /// Aggregated figures served to the dashboard. Shape is owned by the client.
    pub aggregate: serde_json::Value,
}

/// A record as held by the persistent store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub source: SourceName,
    pub entity_type: EntityType,
    pub natural_key: String,
    pub data: serde_json::Value,
    pub first_synced_at: DateTime<Utc>,
    pub last_synced_at: DateTime<Utc>,
}

/// Outcome of one sync attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncOutcome {
    Success,
    /// Some entity types synced, others failed.
    Partial,
    Failed,
    SkippedNotConfigured,
}

/// Immutable outcome of one sync cycle for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub id: uuid::Uuid,
    pub source: SourceName,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: SyncOutcome,
    pub record_counts: BTreeMap<EntityType, u64>,
    /// Entity types that failed in a partial cycle.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<EntityType, ErrorKind>,
    /// Present iff `outcome` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncError>,
}

impl SyncResult {
    /// Assemble a result from per-entity outcomes.
    ///
    /// All entities ok yields `Success`, none ok yields `Failed` carrying the
    /// most actionable error (rate limiting first), anything else `Partial`.
    pub fn from_entities(
        source: SourceName,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        record_counts: BTreeMap<EntityType, u64>,
        errors: Vec<SyncError>,
    ) -> Self {
        let (outcome, error) = if errors.is_empty() {
            (SyncOutcome::Success, None)
        } else if record_counts.is_empty() {
            let primary = errors
                .iter()
                .find(|e| e.kind == ErrorKind::RateLimited)
                .or_else(|| errors.first())
                .cloned();
            (SyncOutcome::Failed, primary)
        } else {
            (SyncOutcome::Partial, None)
        };

        let failures = if outcome == SyncOutcome::Partial {
            errors
                .iter()
                .filter_map(|e| e.entity_type.map(|t| (t, e.kind)))
                .collect()
        } else {
            BTreeMap::new()
        };

        Self {
            id: uuid::Uuid::new_v4(),
            source,
            started_at,
            finished_at,
            outcome,
            record_counts,
            failures,
            error,
        }
    }

    /// A whole-cycle failure that never reached per-entity fetching.
    pub fn failed(
        source: SourceName,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        error: SyncError,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            source,
            started_at,
            finished_at,
            outcome: SyncOutcome::Failed,
            record_counts: BTreeMap::new(),
            failures: BTreeMap::new(),
            error: Some(error),
        }
    }

    pub fn skipped_not_configured(source: SourceName, at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            source,
            started_at: at,
            finished_at: at,
            outcome: SyncOutcome::SkippedNotConfigured,
            record_counts: BTreeMap::new(),
            failures: BTreeMap::new(),
            error: None,
        }
    }

    pub fn total_records(&self) -> u64 {
        self.record_counts.values().sum()
    }

    /// The kind that made `entity_type` unavailable in this cycle, if any.
    pub fn failure_kind_for(&self, entity_type: EntityType) -> Option<ErrorKind> {
        if let Some(kind) = self.failures.get(&entity_type) {
            return Some(*kind);
        }
        match (&self.error, self.record_counts.contains_key(&entity_type)) {
            (Some(err), _) => Some(err.kind),
            (None, false) if self.outcome == SyncOutcome::SkippedNotConfigured => {
                Some(ErrorKind::NotConfigured)
            }
            _ => None,
        }
    }
}
