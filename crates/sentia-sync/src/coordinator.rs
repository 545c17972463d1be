// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sync coordinator.
//!
//! Owns one schedule per source. A cycle fetches every entity type of a
//! source, persists the records, refreshes the cache for entity types that
//! succeeded and publishes events. At most one cycle per source runs at a
//! time: scheduled ticks that find a cycle in flight are absorbed, manual
//! triggers join it.

use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sentia_bus::{EventNotifier, SyncEvent};
use sentia_cache::{CacheKey, CacheStore};
use sentia_core::{
    Clock, EntityType, ErrorKind, RecordStore, SentiaError, SourceClient, SourceDescriptor,
    SourceName, SourceSummary, SyncError, SyncOutcome, SyncResult,
};

use crate::schedule::{InFlight, ScheduleState, SourceSchedule, TickOutcome};

/// Schedules and runs sync cycles. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    descriptors: BTreeMap<SourceName, SourceDescriptor>,
    clients: HashMap<SourceName, Arc<dyn SourceClient>>,
    schedules: HashMap<SourceName, Mutex<ScheduleState>>,
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn RecordStore>,
    notifier: EventNotifier,
    clock: Arc<dyn Clock>,
    /// Cancels the current generation of interval tasks.
    timers: StdMutex<CancellationToken>,
}

impl SyncCoordinator {
    /// Assemble a coordinator. Sources without a descriptor are unknown;
    /// configured descriptors without a client are logged and treated as
    /// unconfigured.
    pub fn new(
        descriptors: Vec<SourceDescriptor>,
        clients: Vec<Arc<dyn SourceClient>>,
        cache: Arc<dyn CacheStore>,
        store: Arc<dyn RecordStore>,
        notifier: EventNotifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let clients: HashMap<SourceName, Arc<dyn SourceClient>> =
            clients.into_iter().map(|c| (c.source(), c)).collect();

        let descriptors: BTreeMap<SourceName, SourceDescriptor> = descriptors
            .into_iter()
            .map(|d| {
                let d = if d.is_configured() && !clients.contains_key(&d.name) {
                    warn!(source = %d.name, "source is configured but has no client");
                    d.with_missing(vec!["client".to_string()])
                } else {
                    d
                };
                (d.name, d)
            })
            .collect();

        let schedules = descriptors
            .keys()
            .map(|name| (*name, Mutex::new(ScheduleState::default())))
            .collect();

        Self {
            inner: Arc::new(Inner {
                descriptors,
                clients,
                schedules,
                cache,
                store,
                notifier,
                clock,
                timers: StdMutex::new(CancellationToken::new()),
            }),
        }
    }

    pub fn descriptor(&self, source: SourceName) -> Option<&SourceDescriptor> {
        self.inner.descriptors.get(&source)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.inner.descriptors.values()
    }

    pub fn cache(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.inner.cache)
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn notifier(&self) -> &EventNotifier {
        &self.inner.notifier
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    /// Client of a configured source.
    pub fn client(&self, source: SourceName) -> Option<Arc<dyn SourceClient>> {
        self.inner.active(source).ok().map(|(_, c)| Arc::clone(c))
    }

    /// Spawn an interval task for every configured source not already running.
    ///
    /// The first tick of each source fires immediately.
    pub async fn start(&self) {
        let token = self
            .inner
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for descriptor in self.inner.descriptors.values() {
            if !descriptor.is_configured() {
                info!(
                    source = %descriptor.name,
                    provider = descriptor.name.provider(),
                    missing = %descriptor.missing.join(", "),
                    "source not configured, not scheduling"
                );
                continue;
            }
            let Some(schedule) = self.inner.schedules.get(&descriptor.name) else {
                continue;
            };
            let mut state = schedule.lock().await;
            if state.running {
                debug!(source = %descriptor.name, "schedule already running");
                continue;
            }
            state.running = true;
            state.next_run_at = Some(self.inner.clock.now());

            let this = self.clone();
            let source = descriptor.name;
            let interval = descriptor.sync_interval;
            let token = token.clone();
            tokio::spawn(async move { this.run_schedule(source, interval, token).await });
            info!(
                source = %source,
                interval_secs = interval.as_secs(),
                "sync schedule started"
            );
        }
    }

    async fn run_schedule(&self, source: SourceName, every: Duration, token: CancellationToken) {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(source = %source, "sync schedule stopped");
                    break;
                }
                _ = interval.tick() => {
                    if token.is_cancelled() {
                        break;
                    }
                    let outcome = self.tick(source).await;
                    debug!(source = %source, ?outcome, "scheduled tick");
                }
            }
        }
    }

    /// Cancel all interval tasks. In-flight cycles run to completion.
    pub async fn stop(&self) {
        let token = {
            let mut guard = self
                .inner
                .timers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, CancellationToken::new())
        };
        token.cancel();

        for schedule in self.inner.schedules.values() {
            let mut state = schedule.lock().await;
            state.running = false;
            state.next_run_at = None;
        }
        info!("sync schedules stopped");
    }

    /// Wait until no cycle is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let mut pending = Vec::new();
            for schedule in self.inner.schedules.values() {
                if let Some(in_flight) = schedule.lock().await.in_flight.clone() {
                    pending.push(in_flight);
                }
            }
            if pending.is_empty() {
                return;
            }
            debug!(count = pending.len(), "waiting for in-flight sync cycles");
            futures::future::join_all(pending).await;
        }
    }

    /// Handle one scheduled tick for `source`.
    pub async fn tick(&self, source: SourceName) -> TickOutcome {
        let Ok((descriptor, client)) = self.inner.active(source) else {
            return TickOutcome::NotConfigured;
        };
        let Some(schedule) = self.inner.schedules.get(&source) else {
            return TickOutcome::NotConfigured;
        };

        let mut state = schedule.lock().await;
        state.next_run_at = next_run(self.inner.clock.now(), descriptor.sync_interval);

        if state.in_flight.is_some() {
            debug!(source = %source, "previous cycle still in flight, tick absorbed");
            sentia_prometheus::record_skipped_tick(source, "in_flight");
            return TickOutcome::AlreadyInFlight;
        }

        if state.skip_remaining > 0 {
            state.skip_remaining -= 1;
            info!(
                source = %source,
                remaining = state.skip_remaining,
                "rate limited upstream, skipping scheduled tick"
            );
            sentia_prometheus::record_skipped_tick(source, "rate_limited");
            return TickOutcome::SkippedRateLimited {
                remaining: state.skip_remaining,
            };
        }

        self.inner
            .start_cycle(&mut state, descriptor.clone(), Arc::clone(client));
        TickOutcome::Started
    }

    /// Run a cycle now, or join the one already in flight.
    ///
    /// Ignores any rate-limit skip. Concurrent callers receive the same
    /// `Arc<SyncResult>`.
    pub async fn trigger_manual_sync(
        &self,
        source: SourceName,
    ) -> Result<Arc<SyncResult>, SentiaError> {
        let (descriptor, client) = self.inner.active(source)?;
        let schedule = self
            .inner
            .schedules
            .get(&source)
            .ok_or_else(|| SentiaError::UnknownSource(source.to_string()))?;

        let in_flight = {
            let mut state = schedule.lock().await;
            if let Some(in_flight) = state.in_flight.clone() {
                debug!(source = %source, "joining in-flight sync cycle");
                in_flight
            } else {
                info!(source = %source, "manual sync triggered");
                self.inner
                    .start_cycle(&mut state, descriptor.clone(), Arc::clone(client))
            }
        };

        Ok(in_flight.await)
    }

    /// Sync every known source once, concurrently. Unconfigured sources
    /// yield a `SkippedNotConfigured` result.
    pub async fn sync_all(&self) -> Vec<Arc<SyncResult>> {
        let runs = self.inner.descriptors.keys().map(|source| {
            let source = *source;
            async move {
                match self.trigger_manual_sync(source).await {
                    Ok(result) => result,
                    Err(SentiaError::NotConfigured { .. }) => Arc::new(
                        SyncResult::skipped_not_configured(source, self.inner.clock.now()),
                    ),
                    Err(e) => {
                        let now = self.inner.clock.now();
                        Arc::new(SyncResult::failed(
                            source,
                            now,
                            now,
                            SyncError::upstream(e.to_string()),
                        ))
                    }
                }
            }
        });
        futures::future::join_all(runs).await
    }

    /// Snapshot of every source's schedule, in source order.
    pub async fn schedules(&self) -> Vec<SourceSchedule> {
        let mut out = Vec::with_capacity(self.inner.descriptors.len());
        for (name, descriptor) in &self.inner.descriptors {
            let Some(schedule) = self.inner.schedules.get(name) else {
                continue;
            };
            let state = schedule.lock().await;
            out.push(SourceSchedule {
                source: *name,
                configured: descriptor.is_configured(),
                running: state.running,
                in_flight: state.in_flight.is_some(),
                sync_interval_secs: descriptor.sync_interval.as_secs(),
                next_run_at: state.next_run_at,
                skip_remaining: state.skip_remaining,
                last_outcome: state.last_outcome,
                last_finished_at: state.last_finished_at,
            });
        }
        out
    }
}

fn next_run(
    now: chrono::DateTime<chrono::Utc>,
    interval: Duration,
) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::Duration::from_std(interval)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
}

impl Inner {
    /// Descriptor and client of a source that may be synced.
    fn active(
        &self,
        source: SourceName,
    ) -> Result<(&SourceDescriptor, &Arc<dyn SourceClient>), SentiaError> {
        let descriptor = self
            .descriptors
            .get(&source)
            .ok_or_else(|| SentiaError::UnknownSource(source.to_string()))?;
        if !descriptor.is_configured() {
            return Err(SentiaError::NotConfigured {
                source_name: source,
                missing: descriptor.missing.clone(),
            });
        }
        let client = self
            .clients
            .get(&source)
            .ok_or_else(|| SentiaError::Internal(format!("no client registered for {source}")))?;
        Ok((descriptor, client))
    }

    /// Spawn a cycle and record it as in flight. The caller holds the
    /// schedule lock, so the cycle cannot clear its marker before it is set.
    fn start_cycle(
        self: &Arc<Self>,
        state: &mut ScheduleState,
        descriptor: SourceDescriptor,
        client: Arc<dyn SourceClient>,
    ) -> InFlight {
        let source = descriptor.name;
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let started_at = inner.clock.now();
            let timer = Instant::now();
            let (result, skip) =
                match AssertUnwindSafe(inner.run_cycle(&descriptor, client.as_ref()))
                    .catch_unwind()
                    .await
                {
                    Ok(done) => done,
                    Err(_) => {
                        error!(source = %source, "sync cycle panicked");
                        let result = Arc::new(SyncResult::failed(
                            source,
                            started_at,
                            inner.clock.now(),
                            SyncError::upstream("sync cycle panicked"),
                        ));
                        inner.conclude(&result, timer.elapsed()).await;
                        (result, 0)
                    }
                };
            inner.finish(source, &result, skip).await;
            result
        });

        let clock = Arc::clone(&self.clock);
        let in_flight = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let now = clock.now();
                    Arc::new(SyncResult::failed(
                        source,
                        now,
                        now,
                        SyncError::upstream(format!("sync task aborted: {e}")),
                    ))
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight = Some(in_flight.clone());
        in_flight
    }

    /// One full cycle. Returns the result and how many scheduled ticks to skip.
    async fn run_cycle(
        &self,
        descriptor: &SourceDescriptor,
        client: &dyn SourceClient,
    ) -> (Arc<SyncResult>, u32) {
        let source = descriptor.name;
        let started_at = self.clock.now();
        let timer = Instant::now();
        info!(source = %source, "sync cycle started");

        let mut counts = BTreeMap::new();
        let mut errors = Vec::new();
        for &entity_type in &descriptor.entity_types {
            match self.sync_entity(descriptor, client, entity_type).await {
                Ok(count) => {
                    counts.insert(entity_type, count);
                }
                Err(e) => {
                    warn!(
                        source = %source,
                        entity_type = %entity_type,
                        kind = %e.kind,
                        status = ?e.status,
                        error = %e.message,
                        "entity sync failed"
                    );
                    errors.push(e);
                }
            }
        }

        let skip = errors
            .iter()
            .map(|e| e.cycles_to_skip(descriptor.sync_interval))
            .max()
            .unwrap_or(0);
        let result = Arc::new(SyncResult::from_entities(
            source,
            started_at,
            self.clock.now(),
            counts,
            errors,
        ));

        self.conclude(&result, timer.elapsed()).await;
        (result, skip)
    }

    /// Audit, measure and publish a finished cycle.
    async fn conclude(&self, result: &Arc<SyncResult>, elapsed: Duration) {
        let source = result.source;
        if let Err(e) = self.store.record_sync_run(result).await {
            warn!(source = %source, error = %e, "failed to record sync run");
        }
        sentia_prometheus::record_sync_cycle(source, result.outcome, elapsed.as_secs_f64());
        info!(
            source = %source,
            outcome = %result.outcome,
            records = result.total_records(),
            "sync cycle finished"
        );
        self.notifier
            .publish(&SyncEvent::SyncResult(Arc::clone(result)));
    }

    /// Fetch, persist and cache one entity type. Nothing is cached unless
    /// the records were persisted.
    async fn sync_entity(
        &self,
        descriptor: &SourceDescriptor,
        client: &dyn SourceClient,
        entity_type: EntityType,
    ) -> Result<u64, SyncError> {
        let source = descriptor.name;
        let summary = self.fetch(descriptor, client, entity_type).await?;

        let synced_at = self.clock.now();
        let count = self
            .store
            .upsert_all(source, entity_type, &summary.records, synced_at)
            .await
            .map_err(|e| storage_error(entity_type, "persisting records", &e))?;

        self.cache
            .set(
                CacheKey::new(source, entity_type),
                summary.aggregate,
                descriptor.cache_ttl,
            )
            .await
            .map_err(|e| storage_error(entity_type, "caching summary", &e))?;

        sentia_prometheus::record_upserted(source, entity_type, count);
        debug!(source = %source, entity_type = %entity_type, count, "entity synced");
        self.notifier.publish(&SyncEvent::RecordsSynced {
            source,
            entity_type,
            count,
            timestamp: synced_at,
        });
        Ok(count)
    }

    /// Bounded fetch, retried once after re-authenticating if the
    /// credentials were rejected.
    async fn fetch(
        &self,
        descriptor: &SourceDescriptor,
        client: &dyn SourceClient,
        entity_type: EntityType,
    ) -> Result<SourceSummary, SyncError> {
        match fetch_bounded(descriptor.timeout, client, entity_type).await {
            Err(e) if e.kind == ErrorKind::Unauthenticated => {
                info!(
                    source = %descriptor.name,
                    entity_type = %entity_type,
                    "credentials rejected, re-authenticating once"
                );
                client.reset_auth().await;
                fetch_bounded(descriptor.timeout, client, entity_type).await
            }
            other => other,
        }
    }

    async fn finish(&self, source: SourceName, result: &SyncResult, skip: u32) {
        let Some(schedule) = self.schedules.get(&source) else {
            return;
        };
        let mut state = schedule.lock().await;
        state.in_flight = None;
        state.last_outcome = Some(result.outcome);
        state.last_finished_at = Some(result.finished_at);
        if skip > 0 {
            info!(source = %source, cycles = skip, "rate limited, skipping upcoming ticks");
            state.skip_remaining = skip;
        } else if result.outcome == SyncOutcome::Success {
            state.skip_remaining = 0;
        }
    }
}

async fn fetch_bounded(
    timeout: Duration,
    client: &dyn SourceClient,
    entity_type: EntityType,
) -> Result<SourceSummary, SyncError> {
    match tokio::time::timeout(timeout, client.fetch_summary(entity_type)).await {
        Ok(result) => result.map_err(|e| e.with_entity(entity_type)),
        Err(_) => Err(SyncError::timeout(timeout).with_entity(entity_type)),
    }
}

fn storage_error(entity_type: EntityType, action: &str, err: &SentiaError) -> SyncError {
    SyncError::new(ErrorKind::Storage, format!("{action} failed: {err}")).with_entity(entity_type)
}
