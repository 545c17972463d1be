// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sentia serve` command implementation.
//!
//! Opens storage, builds the source clients and the sync coordinator,
//! starts every configured schedule, and serves the HTTP gateway until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use sentia_cache::{CacheStore, MemoryCache};
use sentia_config::SentiaConfig;
use sentia_core::SentiaError;
use sentia_gateway::{AuthConfig, GatewayState, HealthState, ServerConfig};
use sentia_prometheus::PrometheusExporter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::shutdown;
use crate::stack::Stack;

/// Runs the `sentia serve` command.
pub async fn run_serve(config: SentiaConfig) -> Result<(), SentiaError> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting sentia serve");

    let exporter = if config.prometheus.enabled {
        match PrometheusExporter::install() {
            Ok(exporter) => Some(exporter),
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        debug!("prometheus metrics disabled by configuration");
        None
    };
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> =
        exporter.map(|exporter| {
            let render: Arc<dyn Fn() -> String + Send + Sync> =
                Arc::new(move || exporter.render());
            render
        });

    let stack = Stack::build(&config).await?;
    for descriptor in stack.coordinator.descriptors() {
        if !descriptor.is_configured() {
            info!(
                source = %descriptor.name,
                provider = descriptor.name.provider(),
                missing = %descriptor.missing.join(", "),
                "dashboard will ask for setup"
            );
        }
    }

    let cancel = shutdown::install_signal_handler();
    stack.coordinator.start().await;

    let janitor = spawn_cache_janitor(
        stack.cache.clone(),
        Duration::from_secs(config.sync.cache_purge_interval_secs.max(1)),
        cancel.clone(),
    );

    let state = GatewayState {
        query: stack.query.clone(),
        auth: AuthConfig {
            bearer_token: config.server.bearer_token.clone(),
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render,
        },
        event_buffer: config.server.event_buffer,
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let gateway_cancel = cancel.clone();
    let mut gateway = tokio::spawn(async move {
        sentia_gateway::start_server(&server_config, state, gateway_cancel).await
    });

    let mut gateway_result = None;
    tokio::select! {
        _ = cancel.cancelled() => {}
        result = &mut gateway => {
            gateway_result = Some(result);
            cancel.cancel();
        }
    }

    info!("shutting down");
    let grace = Duration::from_secs(config.sync.shutdown_grace_secs);
    shutdown::drain_coordinator(&stack.coordinator, grace).await;
    if let Err(e) = janitor.await {
        warn!(error = %e, "cache janitor task failed");
    }
    let gateway_result = match gateway_result {
        Some(result) => result,
        None => gateway.await,
    };
    stack.close().await;

    match gateway_result {
        Ok(Ok(())) => {
            info!("sentia stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "gateway failed");
            Err(e)
        }
        Err(e) => Err(SentiaError::Internal(format!("gateway task failed: {e}"))),
    }
}

/// Periodically evicts expired cache entries until `cancel` fires.
fn spawn_cache_janitor(
    cache: Arc<MemoryCache>,
    every: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = cache.purge_expired().await;
                    if removed > 0 {
                        debug!(removed, "expired cache entries purged");
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("cache janitor shutting down");
                    break;
                }
            }
        }
    })
}

/// Initialize the global tracing subscriber. `RUST_LOG` overrides `level`.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sentia={level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init();
}
