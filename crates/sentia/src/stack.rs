// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the sync stack shared by `serve` and `sync`.

use std::sync::Arc;

use sentia_bus::EventNotifier;
use sentia_cache::MemoryCache;
use sentia_config::SentiaConfig;
use sentia_core::{SentiaError, SystemClock};
use sentia_storage::SqliteStore;
use sentia_sync::{DashboardQuery, SyncCoordinator};
use tracing::info;

/// Store, cache, notifier and coordinator built from one configuration.
pub struct Stack {
    pub store: Arc<SqliteStore>,
    pub cache: Arc<MemoryCache>,
    pub coordinator: SyncCoordinator,
    pub query: DashboardQuery,
}

impl Stack {
    pub async fn build(config: &SentiaConfig) -> Result<Self, SentiaError> {
        let store = Arc::new(SqliteStore::open(&config.storage).await?);
        info!(path = %config.storage.database_path, "storage opened");

        let cache = Arc::new(MemoryCache::new());
        let clients = sentia_sources::build_clients(config)?;
        let coordinator = SyncCoordinator::new(
            sentia_config::source_descriptors(config),
            clients,
            cache.clone(),
            store.clone(),
            EventNotifier::new(),
            Arc::new(SystemClock),
        );
        let configured = coordinator
            .descriptors()
            .filter(|d| d.is_configured())
            .count();
        info!(configured, "sync coordinator ready");

        let query = DashboardQuery::new(coordinator.clone());
        Ok(Self {
            store,
            cache,
            coordinator,
            query,
        })
    }

    /// Flush the WAL so the database file is self-contained.
    pub async fn close(&self) {
        if let Err(e) = self.store.database().checkpoint().await {
            tracing::warn!(error = %e, "WAL checkpoint failed");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Default configuration with the database in `dir`.
    pub(crate) fn config_in(dir: &tempfile::TempDir) -> SentiaConfig {
        let mut config = SentiaConfig::default();
        config.storage.database_path = dir.path().join("sentia.db").to_string_lossy().into();
        config
    }

    #[tokio::test]
    async fn default_config_builds_with_every_source_unconfigured() {
        let dir = tempfile::tempdir().unwrap();
        let stack = Stack::build(&config_in(&dir)).await.unwrap();

        let schedules = stack.coordinator.schedules().await;
        assert_eq!(schedules.len(), 4);
        assert!(schedules.iter().all(|s| !s.configured));
        stack.close().await;
    }
}
