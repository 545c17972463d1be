// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Sentia integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without upstream services.
//!
//! # Components
//!
//! - [`ManualClock`] - wall clock that moves only when advanced
//! - [`MockSourceClient`] - source client with queued per-entity responses
//! - [`MemoryRecordStore`] - record store with switchable write failures
//! - [`TestHarness`] - assembled coordinator, query façade, cache and store

pub mod clock;
pub mod harness;
pub mod memory_store;
pub mod mock_source;

pub use clock::ManualClock;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_store::MemoryRecordStore;
pub use mock_source::MockSourceClient;
