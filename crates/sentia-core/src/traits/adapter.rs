// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and health probing shared by upstream clients, stores and the
//! metrics exporter.

use async_trait::async_trait;

use crate::error::SentiaError;
use crate::types::{AdapterType, HealthStatus};

/// Something the sync service talks to that can be named and probed.
///
/// Source clients answer `health_check` by reaching their upstream API
/// (`sentia config check --probe`); stores by touching their backing
/// database.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short name used in logs, e.g. `xero`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    /// Whether this is a source, a store, a cache or an exporter.
    fn adapter_type(&self) -> AdapterType;

    /// Reachability of whatever sits behind the adapter. An `Err` means the
    /// probe itself could not run.
    async fn health_check(&self) -> Result<HealthStatus, SentiaError>;

    /// Release connections. Called once, at process exit.
    async fn shutdown(&self) -> Result<(), SentiaError>;

    /// `source xero 0.1.0`, for probe output.
    fn label(&self) -> String {
        format!(
            "{} {} {}",
            self.adapter_type().to_string().to_lowercase(),
            self.name(),
            self.version()
        )
    }
}
