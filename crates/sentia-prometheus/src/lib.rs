// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the Sentia sync service.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Metrics are
//! rendered as Prometheus text through the gateway's `/metrics` endpoint.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use sentia_core::{AdapterType, HealthStatus, PluginAdapter, SentiaError};

pub use recording::{
    record_skipped_tick, record_sync_cycle, record_upserted, register_metrics,
    set_event_subscribers,
};

/// Installed Prometheus recorder.
#[derive(Clone)]
pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Install the Prometheus recorder globally and describe all metrics.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn install() -> Result<Self, SentiaError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            SentiaError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Wrap an existing handle, e.g. from a locally built recorder.
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusExporter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, SentiaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SentiaError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exporter_reports_healthy_observability_adapter() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let exporter = PrometheusExporter::from_handle(recorder.handle());
        assert_eq!(exporter.name(), "prometheus");
        assert_eq!(exporter.adapter_type(), AdapterType::Observability);
        assert_eq!(exporter.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[test]
    fn render_is_empty_before_anything_is_recorded() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let exporter = PrometheusExporter::from_handle(recorder.handle());
        assert!(exporter.render().trim().is_empty());
    }
}
