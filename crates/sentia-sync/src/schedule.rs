// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-source schedule state and its public snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use serde::Serialize;

use sentia_core::{SourceName, SyncOutcome, SyncResult};

/// A cycle in progress. Every clone resolves to the same result.
pub(crate) type InFlight = Shared<BoxFuture<'static, Arc<SyncResult>>>;

/// Mutable schedule state of one source, guarded by the coordinator.
#[derive(Default)]
pub(crate) struct ScheduleState {
    /// An interval task is ticking for this source.
    pub running: bool,
    pub in_flight: Option<InFlight>,
    pub next_run_at: Option<DateTime<Utc>>,
    /// Scheduled ticks still to skip after upstream throttling.
    pub skip_remaining: u32,
    pub last_outcome: Option<SyncOutcome>,
    pub last_finished_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of one source's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSchedule {
    pub source: SourceName,
    pub configured: bool,
    pub running: bool,
    pub in_flight: bool,
    pub sync_interval_secs: u64,
    pub next_run_at: Option<DateTime<Utc>>,
    pub skip_remaining: u32,
    pub last_outcome: Option<SyncOutcome>,
    pub last_finished_at: Option<DateTime<Utc>>,
}

/// What one scheduled tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new cycle was spawned.
    Started,
    /// A cycle was already running; the tick was absorbed.
    AlreadyInFlight,
    /// Skipped after a rate-limit response; `remaining` more ticks will be.
    SkippedRateLimited { remaining: u32 },
    /// The source has no credentials and is never scheduled.
    NotConfigured,
}
