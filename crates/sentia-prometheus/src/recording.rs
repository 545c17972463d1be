// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is
//! a no-op, so library crates call these unconditionally.

use metrics::{describe_counter, describe_gauge, describe_histogram};

use sentia_core::{EntityType, SourceName, SyncOutcome};

/// Register all Sentia metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "sentia_sync_cycles_total",
        "Completed sync cycles by source and outcome"
    );
    describe_counter!(
        "sentia_records_upserted_total",
        "Records written to the persistent store"
    );
    describe_counter!(
        "sentia_sync_ticks_skipped_total",
        "Scheduled ticks skipped while in flight or rate limited"
    );
    describe_histogram!(
        "sentia_sync_cycle_duration_seconds",
        "Wall time of one sync cycle"
    );
    describe_gauge!(
        "sentia_event_subscribers",
        "Live event notifier subscribers"
    );
}

/// Record one finished sync cycle.
pub fn record_sync_cycle(source: SourceName, outcome: SyncOutcome, seconds: f64) {
    metrics::counter!(
        "sentia_sync_cycles_total",
        "source" => source.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "sentia_sync_cycle_duration_seconds",
        "source" => source.to_string()
    )
    .record(seconds);
}

/// Record records upserted for one entity type.
pub fn record_upserted(source: SourceName, entity_type: EntityType, count: u64) {
    metrics::counter!(
        "sentia_records_upserted_total",
        "source" => source.to_string(),
        "entity_type" => entity_type.to_string()
    )
    .increment(count);
}

/// Record a scheduled tick that did not start a cycle.
pub fn record_skipped_tick(source: SourceName, reason: &'static str) {
    metrics::counter!(
        "sentia_sync_ticks_skipped_total",
        "source" => source.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// Set the number of live event subscribers.
pub fn set_event_subscribers(count: usize) {
    metrics::gauge!("sentia_event_subscribers").set(count as f64);
}
