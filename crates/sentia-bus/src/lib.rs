// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event Notifier for the Sentia sync service.
//!
//! [`EventNotifier::publish`] hands every event to each live subscriber,
//! synchronously and in registration order. A subscriber that returns an
//! error or panics is logged and skipped; the rest still receive the event.

pub mod event;
pub mod notifier;

pub use event::SyncEvent;
pub use notifier::{DeliveryError, EventNotifier, SubscriptionHandle, SubscriptionId};
