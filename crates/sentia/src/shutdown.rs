// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! SIGTERM and SIGINT (Ctrl+C) cancel a [`CancellationToken`] that the
//! gateway, the cache janitor and `serve` itself watch. In-flight sync
//! cycles are then drained for up to the configured grace period.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sentia_sync::SyncCoordinator;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        "failed to install SIGTERM handler, only Ctrl+C stops the service"
                    );
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Stops scheduling and waits up to `grace` for in-flight cycles.
///
/// Returns `false` if cycles were still running when the grace period ran out.
pub async fn drain_coordinator(coordinator: &SyncCoordinator, grace: Duration) -> bool {
    coordinator.stop().await;
    match tokio::time::timeout(grace, coordinator.wait_idle()).await {
        Ok(()) => {
            info!("all in-flight sync cycles completed");
            true
        }
        Err(_) => {
            warn!(
                grace_secs = grace.as_secs(),
                "sync cycles still running after grace period, exiting anyway"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use sentia_bus::EventNotifier;
    use sentia_cache::MemoryCache;
    use sentia_core::{SourceName, SystemClock};
    use sentia_storage::SqliteStore;

    async fn idle_coordinator() -> SyncCoordinator {
        let store = SqliteStore::from_database(
            sentia_storage::Database::open_in_memory().await.unwrap(),
        );
        SyncCoordinator::new(
            vec![
                sentia_core::SourceDescriptor::new(
                    SourceName::Erp,
                    Duration::from_secs(900),
                )
                .with_missing(vec!["API key".into()]),
            ],
            Vec::new(),
            Arc::new(MemoryCache::new()),
            Arc::new(store),
            EventNotifier::new(),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn drain_of_idle_coordinator_completes() {
        let coordinator = idle_coordinator().await;
        assert!(drain_coordinator(&coordinator, Duration::from_secs(1)).await);
        assert!(!coordinator.schedules().await[0].running);
    }

    #[tokio::test]
    async fn token_starts_uncancelled() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
    }
}
