// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record store trait for the persistence backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SentiaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EntityType, SourceName, StoredRecord, SyncResult, SyncedRecord};

/// Persistent store of synced records and the sync audit log.
///
/// There is at most one row per `(source, entity_type, natural_key)`; repeated
/// upserts are last-write-wins.
#[async_trait]
pub trait RecordStore: PluginAdapter {
    /// Inserts or replaces the record identified by its natural key.
    async fn upsert(
        &self,
        source: SourceName,
        entity_type: EntityType,
        record: &SyncedRecord,
        synced_at: DateTime<Utc>,
    ) -> Result<(), SentiaError>;

    /// Upserts a batch of records of one entity type, returning how many
    /// were written. Stops at the first failure.
    async fn upsert_all(
        &self,
        source: SourceName,
        entity_type: EntityType,
        records: &[SyncedRecord],
        synced_at: DateTime<Utc>,
    ) -> Result<u64, SentiaError> {
        for record in records {
            self.upsert(source, entity_type, record, synced_at).await?;
        }
        Ok(records.len() as u64)
    }

    /// Looks up one record by natural key.
    async fn get_record(
        &self,
        source: SourceName,
        entity_type: EntityType,
        natural_key: &str,
    ) -> Result<Option<StoredRecord>, SentiaError>;

    /// Number of rows held for a source and entity type.
    async fn count_records(
        &self,
        source: SourceName,
        entity_type: EntityType,
    ) -> Result<u64, SentiaError>;

    /// Appends a finished sync cycle to the audit log.
    async fn record_sync_run(&self, result: &SyncResult) -> Result<(), SentiaError>;

    /// Most recent sync cycles, newest first, optionally for one source.
    async fn recent_sync_runs(
        &self,
        source: Option<SourceName>,
        limit: usize,
    ) -> Result<Vec<SyncResult>, SentiaError>;
}
