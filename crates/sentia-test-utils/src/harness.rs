// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for coordinator and query integration tests.
//!
//! `TestHarness` assembles a complete sync stack: mock source clients, a
//! manual clock shared by the cache and coordinator, an in-memory or
//! temp-file SQLite record store, and a notifier whose events are captured.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sentia_bus::{EventNotifier, SubscriptionHandle, SyncEvent};
use sentia_cache::{CacheKey, CacheStore, MemoryCache};
use sentia_config::model::StorageConfig;
use sentia_core::{
    Clock, EntityType, RecordStore, SentiaError, SourceClient, SourceDescriptor, SourceName,
};
use sentia_storage::SqliteStore;
use sentia_sync::{DashboardQuery, SyncCoordinator};

use crate::clock::ManualClock;
use crate::memory_store::MemoryRecordStore;
use crate::mock_source::MockSourceClient;

enum StoreKind {
    Memory,
    Sqlite,
}

/// Builder for test environments.
pub struct TestHarnessBuilder {
    descriptors: Vec<SourceDescriptor>,
    clients: Vec<Arc<MockSourceClient>>,
    store: StoreKind,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            clients: Vec::new(),
            store: StoreKind::Memory,
        }
    }

    /// A configured source backed by `client`.
    pub fn with_source(mut self, descriptor: SourceDescriptor, client: MockSourceClient) -> Self {
        self.descriptors.push(descriptor);
        self.clients.push(Arc::new(client));
        self
    }

    /// A configured source with the given interval and a default mock client.
    pub fn with_mock(self, source: SourceName, interval: Duration) -> Self {
        self.with_source(
            SourceDescriptor::new(source, interval),
            MockSourceClient::new(source),
        )
    }

    /// A source lacking the named credentials.
    pub fn with_unconfigured(mut self, source: SourceName, missing: &[&str]) -> Self {
        self.descriptors.push(
            SourceDescriptor::new(source, Duration::from_secs(900))
                .with_missing(missing.iter().map(|m| m.to_string()).collect()),
        );
        self
    }

    /// Persist into a temp-file SQLite database instead of memory.
    pub fn with_sqlite(mut self) -> Self {
        self.store = StoreKind::Sqlite;
        self
    }

    /// Build the harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, SentiaError> {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
        let notifier = EventNotifier::new();

        let memory_store = Arc::new(MemoryRecordStore::new());
        let (store, temp_dir): (Arc<dyn RecordStore>, Option<tempfile::TempDir>) =
            match self.store {
                StoreKind::Memory => (memory_store.clone(), None),
                StoreKind::Sqlite => {
                    let temp_dir = tempfile::TempDir::new()
                        .map_err(|e| SentiaError::Storage { source: e.into() })?;
                    let config = StorageConfig {
                        database_path: temp_dir.path().join("test.db").to_string_lossy().into(),
                        wal_mode: true,
                    };
                    (Arc::new(SqliteStore::open(&config).await?), Some(temp_dir))
                }
            };

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = notifier.subscribe(move |event: &SyncEvent| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
            Ok(())
        });

        let clients: HashMap<SourceName, Arc<MockSourceClient>> = self
            .clients
            .iter()
            .map(|c| (c.source(), Arc::clone(c)))
            .collect();
        let dyn_clients: Vec<Arc<dyn SourceClient>> = self
            .clients
            .into_iter()
            .map(|c| c as Arc<dyn SourceClient>)
            .collect();

        let coordinator = SyncCoordinator::new(
            self.descriptors,
            dyn_clients,
            cache.clone(),
            store.clone(),
            notifier.clone(),
            clock.clone(),
        );
        let query = DashboardQuery::new(coordinator.clone());

        Ok(TestHarness {
            coordinator,
            query,
            clock,
            cache,
            store,
            memory_store,
            notifier,
            clients,
            events,
            _subscription: subscription,
            _temp_dir: temp_dir,
        })
    }
}

/// A fully assembled sync stack.
pub struct TestHarness {
    pub coordinator: SyncCoordinator,
    pub query: DashboardQuery,
    pub clock: Arc<ManualClock>,
    pub cache: Arc<MemoryCache>,
    pub store: Arc<dyn RecordStore>,
    /// Backing store when not using SQLite; empty otherwise.
    pub memory_store: Arc<MemoryRecordStore>,
    pub notifier: EventNotifier,
    clients: HashMap<SourceName, Arc<MockSourceClient>>,
    events: Arc<Mutex<Vec<SyncEvent>>>,
    _subscription: SubscriptionHandle,
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The mock behind a configured source.
    ///
    /// # Panics
    /// If the source was not added with a mock client.
    pub fn client(&self, source: SourceName) -> &MockSourceClient {
        match self.clients.get(&source) {
            Some(client) => client,
            None => panic!("no mock client registered for {source}"),
        }
    }

    /// Events captured so far, in publish order.
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Current cache entry, honouring expiry.
    pub async fn cached(
        &self,
        source: SourceName,
        entity_type: EntityType,
    ) -> Option<sentia_cache::CacheEntry> {
        self.cache.get(&CacheKey::new(source, entity_type)).await
    }
}
