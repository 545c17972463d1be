// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync coordination for the Sentia sync service.
//!
//! - [`SyncCoordinator`] schedules per-source sync cycles with a
//!   single-flight guarantee and rate-limit adaptive skipping.
//! - [`DashboardQuery`] answers dashboard reads cache-first, never with
//!   placeholder data.

pub mod coordinator;
pub mod query;
pub mod schedule;

pub use coordinator::SyncCoordinator;
pub use query::{DashboardQuery, SummaryResponse};
pub use schedule::{SourceSchedule, TickOutcome};
