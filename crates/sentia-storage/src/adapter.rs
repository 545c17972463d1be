// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`RecordStore`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use sentia_config::model::StorageConfig;
use sentia_core::{
    AdapterType, EntityType, HealthStatus, PluginAdapter, RecordStore, SentiaError, SourceName,
    StoredRecord, SyncResult, SyncedRecord,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed persistent store.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database named in `config`, creating and migrating it as needed.
    pub async fn open(config: &StorageConfig) -> Result<Self, SentiaError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store initialized");
        Ok(Self { db })
    }

    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SentiaError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SentiaError> {
        self.db.checkpoint().await?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn upsert(
        &self,
        source: SourceName,
        entity_type: EntityType,
        record: &SyncedRecord,
        synced_at: DateTime<Utc>,
    ) -> Result<(), SentiaError> {
        queries::records::upsert_records(
            &self.db,
            source,
            entity_type,
            vec![record.clone()],
            synced_at,
        )
        .await
        .map(|_| ())
    }

    async fn upsert_all(
        &self,
        source: SourceName,
        entity_type: EntityType,
        records: &[SyncedRecord],
        synced_at: DateTime<Utc>,
    ) -> Result<u64, SentiaError> {
        queries::records::upsert_records(&self.db, source, entity_type, records.to_vec(), synced_at)
            .await
    }

    async fn get_record(
        &self,
        source: SourceName,
        entity_type: EntityType,
        natural_key: &str,
    ) -> Result<Option<StoredRecord>, SentiaError> {
        queries::records::get_record(&self.db, source, entity_type, natural_key).await
    }

    async fn count_records(
        &self,
        source: SourceName,
        entity_type: EntityType,
    ) -> Result<u64, SentiaError> {
        queries::records::count_records(&self.db, source, entity_type).await
    }

    async fn record_sync_run(&self, result: &SyncResult) -> Result<(), SentiaError> {
        queries::sync_runs::insert_sync_run(&self.db, result).await
    }

    async fn recent_sync_runs(
        &self,
        source: Option<SourceName>,
        limit: usize,
    ) -> Result<Vec<SyncResult>, SentiaError> {
        queries::sync_runs::recent_sync_runs(&self.db, source, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_store_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = SqliteStore::open(&make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();

        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.version(), semver::Version::new(0, 1, 0));
        assert_eq!(store.adapter_type(), AdapterType::Storage);
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("persist.db");
        let config = make_config(db_path.to_str().unwrap());
        let now = Utc::now();

        {
            let store = SqliteStore::open(&config).await.unwrap();
            let records = vec![
                SyncedRecord::new("INV-1", json!({"total": 120.5})),
                SyncedRecord::new("INV-2", json!({"total": 80.0})),
            ];
            let written = store
                .upsert_all(SourceName::Accounting, EntityType::Invoices, &records, now)
                .await
                .unwrap();
            assert_eq!(written, 2);
            store.shutdown().await.unwrap();
        }

        let store = SqliteStore::open(&config).await.unwrap();
        assert_eq!(
            store
                .count_records(SourceName::Accounting, EntityType::Invoices)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn single_upsert_goes_through_trait() {
        let store = SqliteStore::from_database(Database::open_in_memory().await.unwrap());
        let now = Utc::now();
        let record = SyncedRecord::new("SHP-1", json!({"carrier": "DHL"}));
        store
            .upsert(SourceName::Erp, EntityType::Shipments, &record, now)
            .await
            .unwrap();
        store
            .upsert(SourceName::Erp, EntityType::Shipments, &record, now)
            .await
            .unwrap();
        assert_eq!(
            store
                .count_records(SourceName::Erp, EntityType::Shipments)
                .await
                .unwrap(),
            1
        );
    }
}
