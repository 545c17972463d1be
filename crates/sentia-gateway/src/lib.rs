// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Sentia sync service.
//!
//! Dashboards read summaries through the cache-first query façade, trigger
//! manual syncs, and follow sync activity over server-sent events.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod sse;

pub use auth::AuthConfig;
pub use server::{GatewayState, HealthState, ServerConfig, router, start_server};
