// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscriber registry and synchronous fan-out.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use thiserror::Error;

use crate::event::SyncEvent;

/// Opaque identifier of one registration.
pub type SubscriptionId = u64;

/// Why a subscriber could not take an event.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// The subscriber's buffer is full; this event is dropped for it.
    #[error("subscriber buffer full")]
    Full,
    /// The subscriber is gone (e.g. its connection closed).
    #[error("subscriber disconnected")]
    Disconnected,
    #[error("{0}")]
    Other(String),
}

type Deliver = Arc<dyn Fn(&SyncEvent) -> Result<(), DeliveryError> + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Deliver)>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Deliver)>> {
        // A panicking subscriber never runs under this lock, so poisoning
        // can only come from a bug here; the list itself stays consistent.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }
}

/// Process-wide publish/subscribe hub. Cheap to clone.
#[derive(Clone, Default)]
pub struct EventNotifier {
    registry: Arc<Registry>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `deliver` for every event published from now on.
    ///
    /// Dropping the returned handle unsubscribes. Use
    /// [`SubscriptionHandle::detach`] to keep the registration for the life
    /// of the notifier.
    pub fn subscribe<F>(&self, deliver: F) -> SubscriptionHandle
    where
        F: Fn(&SyncEvent) -> Result<(), DeliveryError> + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.lock().push((id, Arc::new(deliver)));
        tracing::debug!(subscription_id = id, "subscriber registered");
        SubscriptionHandle {
            id,
            registry: Arc::downgrade(&self.registry),
            detached: false,
        }
    }

    /// Removes a registration. Unknown or already-removed ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if self.registry.remove(id) {
            tracing::debug!(subscription_id = id, "subscriber removed");
        }
    }

    /// Delivers `event` to every current subscriber in registration order.
    ///
    /// Returns how many subscribers accepted it.
    pub fn publish(&self, event: &SyncEvent) -> usize {
        let snapshot: Vec<(SubscriptionId, Deliver)> = self.registry.lock().clone();
        let mut delivered = 0;

        for (id, deliver) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| deliver(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(DeliveryError::Disconnected)) => {
                    tracing::debug!(subscription_id = id, "subscriber disconnected, removing");
                    self.registry.remove(id);
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        subscription_id = id,
                        event_type = event.event_type(),
                        error = %e,
                        "event delivery failed"
                    );
                }
                Err(_) => {
                    tracing::error!(
                        subscription_id = id,
                        event_type = event.event_type(),
                        "subscriber panicked during delivery"
                    );
                }
            }
        }

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().len()
    }
}

/// One live registration. Dropping it unsubscribes.
///
/// Holds only a weak reference, so it never keeps the notifier alive and
/// removal after the notifier is gone is silently ignored.
#[must_use = "dropping the handle unsubscribes immediately"]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    registry: Weak<Registry>,
    detached: bool,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Removes the registration now. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    /// Consumes the handle without unsubscribing.
    pub fn detach(mut self) -> SubscriptionId {
        self.detached = true;
        self.id
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if !self.detached {
            self.unsubscribe();
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sentia_core::{EntityType, SourceName};
    use std::sync::atomic::AtomicUsize;

    fn event(count: u64) -> SyncEvent {
        SyncEvent::RecordsSynced {
            source: SourceName::Storefront,
            entity_type: EntityType::Orders,
            count,
            timestamp: Utc::now(),
        }
    }

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        name: &'static str,
    ) -> impl Fn(&SyncEvent) -> Result<(), DeliveryError> + Send + Sync + 'static {
        let log = log.clone();
        move |_event| {
            log.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    #[test]
    fn delivers_in_registration_order() {
        let notifier = EventNotifier::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _a = notifier.subscribe(recorder(&log, "a"));
        let _b = notifier.subscribe(recorder(&log, "b"));
        let _c = notifier.subscribe(recorder(&log, "c"));

        assert_eq!(notifier.publish(&event(1)), 3);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn failing_subscribers_do_not_block_others() {
        let notifier = EventNotifier::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _a = notifier.subscribe(recorder(&log, "a"));
        let _err = notifier.subscribe(|_| Err(DeliveryError::Other("boom".into())));
        let _panics = notifier.subscribe(|_| panic!("subscriber bug"));
        let _b = notifier.subscribe(recorder(&log, "b"));

        assert_eq!(notifier.publish(&event(1)), 2);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert!(logs_contain("event delivery failed"));
        assert!(logs_contain("subscriber panicked during delivery"));

        // The notifier keeps working after a panic.
        assert_eq!(notifier.publish(&event(2)), 2);
        assert_eq!(notifier.subscriber_count(), 4);
    }

    #[test]
    fn no_replay_for_late_subscribers() {
        let notifier = EventNotifier::new();
        notifier.publish(&event(1));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let _h = notifier.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        notifier.publish(&event(2));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let notifier = EventNotifier::new();
        let handle = notifier.subscribe(|_| Ok(()));
        let id = handle.id();
        handle.unsubscribe();
        handle.unsubscribe();
        notifier.unsubscribe(id);
        notifier.unsubscribe(9_999);
        assert_eq!(notifier.subscriber_count(), 0);
        drop(handle);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn dropping_handle_unsubscribes() {
        let notifier = EventNotifier::new();
        let handle = notifier.subscribe(|_| Ok(()));
        assert_eq!(notifier.subscriber_count(), 1);
        drop(handle);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn detached_handle_stays_registered() {
        let notifier = EventNotifier::new();
        let id = notifier.subscribe(|_| Ok(())).detach();
        assert_eq!(notifier.subscriber_count(), 1);
        notifier.unsubscribe(id);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn handle_outliving_notifier_is_harmless() {
        let notifier = EventNotifier::new();
        let handle = notifier.subscribe(|_| Ok(()));
        drop(notifier);
        handle.unsubscribe();
        drop(handle);
    }

    #[test]
    fn disconnected_subscribers_are_pruned() {
        let notifier = EventNotifier::new();
        let _gone = notifier.subscribe(|_| Err(DeliveryError::Disconnected));
        let _live = notifier.subscribe(|_| Ok(()));
        assert_eq!(notifier.publish(&event(1)), 1);
        assert_eq!(notifier.subscriber_count(), 1);
    }

    #[test]
    fn subscriber_may_unsubscribe_during_publish() {
        let notifier = EventNotifier::new();
        let inner = notifier.clone();
        let target = Arc::new(AtomicU64::new(u64::MAX));
        let target_in = target.clone();
        let _h = notifier.subscribe(move |_| {
            inner.unsubscribe(target_in.load(Ordering::SeqCst));
            Ok(())
        });
        let victim = notifier.subscribe(|_| Ok(()));
        target.store(victim.id(), Ordering::SeqCst);

        // Snapshot semantics: the victim still receives this event.
        assert_eq!(notifier.publish(&event(1)), 2);
        assert_eq!(notifier.subscriber_count(), 1);
    }
}
