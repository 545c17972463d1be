// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events stream for `GET /events`.
//!
//! Each connection registers a notifier subscriber feeding a bounded
//! channel. A slow client loses events (`Full`) rather than stalling the
//! publisher; a closed connection is reported as `Disconnected` and the
//! subscription is removed.
//!
//! SSE event format:
//! ```text
//! event: sync_result
//! data: {"type":"sync_result","source":"storefront","outcome":"success",...}
//! ```

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use tokio::sync::mpsc::{self, error::TrySendError};

use sentia_bus::{DeliveryError, EventNotifier, SubscriptionHandle, SyncEvent};

use crate::server::GatewayState;

/// Keeps the subscription alive for as long as the response stream.
struct StreamGuard {
    subscription: SubscriptionHandle,
    notifier: EventNotifier,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
        sentia_prometheus::set_event_subscribers(self.notifier.subscriber_count());
        tracing::debug!(subscription_id = self.subscription.id(), "event stream closed");
    }
}

fn to_sse(event: &SyncEvent) -> Event {
    Event::default()
        .event(event.event_type())
        .data(event.to_wire_json().to_string())
}

/// GET /events
pub async fn stream_events(
    State(state): State<GatewayState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let notifier = state.query.coordinator().notifier().clone();
    let (tx, rx) = mpsc::channel::<SyncEvent>(state.event_buffer.max(1));

    let subscription = notifier.subscribe(move |event: &SyncEvent| {
        match tx.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DeliveryError::Full),
            Err(TrySendError::Closed(_)) => Err(DeliveryError::Disconnected),
        }
    });
    sentia_prometheus::set_event_subscribers(notifier.subscriber_count());
    tracing::debug!(subscription_id = subscription.id(), "event stream opened");

    let guard = StreamGuard {
        subscription,
        notifier,
    };
    let events = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let event = rx.recv().await?;
        Some((Ok(to_sse(&event)), (rx, guard)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
