// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`RecordStore`] for coordinator tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use sentia_core::{
    AdapterType, EntityType, HealthStatus, PluginAdapter, RecordStore, SentiaError, SourceName,
    StoredRecord, SyncResult, SyncedRecord,
};

type RowKey = (SourceName, EntityType, String);

/// Records and sync runs held in memory, with switchable write failures.
#[derive(Default)]
pub struct MemoryRecordStore {
    rows: Mutex<BTreeMap<RowKey, StoredRecord>>,
    runs: Mutex<Vec<SyncResult>>,
    fail_writes: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upsert fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every sync run recorded so far, oldest first.
    pub async fn runs(&self) -> Vec<SyncResult> {
        self.runs.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MemoryRecordStore {
    fn name(&self) -> &str {
        "memory-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SentiaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SentiaError> {
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn upsert(
        &self,
        source: SourceName,
        entity_type: EntityType,
        record: &SyncedRecord,
        synced_at: DateTime<Utc>,
    ) -> Result<(), SentiaError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SentiaError::Storage {
                source: "simulated write failure".into(),
            });
        }
        let key = (source, entity_type, record.natural_key.clone());
        let mut rows = self.rows.lock().await;
        let first_synced_at = rows
            .get(&key)
            .map(|existing| existing.first_synced_at)
            .unwrap_or(synced_at);
        rows.insert(
            key,
            StoredRecord {
                source,
                entity_type,
                natural_key: record.natural_key.clone(),
                data: record.data.clone(),
                first_synced_at,
                last_synced_at: synced_at,
            },
        );
        Ok(())
    }

    async fn get_record(
        &self,
        source: SourceName,
        entity_type: EntityType,
        natural_key: &str,
    ) -> Result<Option<StoredRecord>, SentiaError> {
        let key = (source, entity_type, natural_key.to_string());
        Ok(self.rows.lock().await.get(&key).cloned())
    }

    async fn count_records(
        &self,
        source: SourceName,
        entity_type: EntityType,
    ) -> Result<u64, SentiaError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .keys()
            .filter(|(s, e, _)| *s == source && *e == entity_type)
            .count() as u64)
    }

    async fn record_sync_run(&self, result: &SyncResult) -> Result<(), SentiaError> {
        self.runs.lock().await.push(result.clone());
        Ok(())
    }

    async fn recent_sync_runs(
        &self,
        source: Option<SourceName>,
        limit: usize,
    ) -> Result<Vec<SyncResult>, SentiaError> {
        let runs = self.runs.lock().await;
        Ok(runs
            .iter()
            .rev()
            .filter(|r| source.is_none_or(|s| r.source == s))
            .take(limit)
            .cloned()
            .collect())
    }
}
