// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock source client for deterministic coordinator tests.
//!
//! `MockSourceClient` implements `SourceClient` with per-entity queues of
//! pre-configured responses, enabling CI-runnable tests without upstream
//! APIs.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use sentia_core::{
    AdapterType, EntityType, HealthStatus, PluginAdapter, SentiaError, SourceClient, SourceName,
    SourceSummary, SyncError, SyncedRecord,
};

type Response = Result<SourceSummary, SyncError>;

/// A source client answering from queued responses.
///
/// Each entity type has its own FIFO queue. When a queue is empty the
/// client answers with [`MockSourceClient::summary`] of one record.
pub struct MockSourceClient {
    source: SourceName,
    responses: Arc<Mutex<HashMap<EntityType, VecDeque<Response>>>>,
    delay: Option<Duration>,
    panics: bool,
    fetches: AtomicUsize,
    auth_resets: AtomicUsize,
}

impl MockSourceClient {
    pub fn new(source: SourceName) -> Self {
        Self {
            source,
            responses: Arc::new(Mutex::new(HashMap::new())),
            delay: None,
            panics: false,
            fetches: AtomicUsize::new(0),
            auth_resets: AtomicUsize::new(0),
        }
    }

    /// Every fetch sleeps this long first (virtual time under `start_paused`).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every fetch panics, as a buggy client would.
    pub fn with_panic(mut self) -> Self {
        self.panics = true;
        self
    }

    /// Queue a response for the next fetch of `entity_type`.
    pub async fn push(&self, entity_type: EntityType, response: Response) {
        self.responses
            .lock()
            .await
            .entry(entity_type)
            .or_default()
            .push_back(response);
    }

    /// Queue a successful summary with `count` records.
    pub async fn push_ok(&self, entity_type: EntityType, count: usize) {
        self.push(entity_type, Ok(Self::summary(entity_type, count)))
            .await;
    }

    /// Queue a failure.
    pub async fn push_err(&self, entity_type: EntityType, error: SyncError) {
        self.push(entity_type, Err(error)).await;
    }

    /// A summary of `count` records keyed `{entity}-{n}`, with aggregate
    /// `{"count": count}`.
    pub fn summary(entity_type: EntityType, count: usize) -> SourceSummary {
        let records = (0..count)
            .map(|n| {
                SyncedRecord::new(
                    format!("{entity_type}-{n}"),
                    json!({ "n": n, "entity": entity_type }),
                )
            })
            .collect();
        SourceSummary {
            records,
            aggregate: json!({ "count": count }),
        }
    }

    /// Total `fetch_summary` calls, across entity types.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn auth_reset_count(&self) -> usize {
        self.auth_resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for MockSourceClient {
    fn name(&self) -> &str {
        "mock-source"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, SentiaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SentiaError> {
        Ok(())
    }
}

#[async_trait]
impl SourceClient for MockSourceClient {
    fn source(&self) -> SourceName {
        self.source
    }

    fn entity_types(&self) -> &[EntityType] {
        self.source.entity_types()
    }

    async fn fetch_summary(&self, entity_type: EntityType) -> Result<SourceSummary, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panics {
            panic!("mock {} client panicked fetching {entity_type}", self.source);
        }
        let queued = self
            .responses
            .lock()
            .await
            .get_mut(&entity_type)
            .and_then(VecDeque::pop_front);
        queued.unwrap_or_else(|| Ok(Self::summary(entity_type, 1)))
    }

    async fn reset_auth(&self) {
        self.auth_resets.fetch_add(1, Ordering::SeqCst);
    }
}
