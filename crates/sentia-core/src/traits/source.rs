// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source client trait for upstream SaaS systems.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EntityType, SourceName, SourceSummary};

/// Client for one upstream system (accounting, storefront, marketplace, ERP).
///
/// Each implementation owns its authentication handshake and reports
/// failures as a [`SyncError`] whose `kind` is all the coordinator inspects.
#[async_trait]
pub trait SourceClient: PluginAdapter {
    /// The source this client talks to.
    fn source(&self) -> SourceName;

    /// Entity types this client can fetch.
    fn entity_types(&self) -> &[EntityType];

    /// Fetches the current records and aggregate for one entity type.
    async fn fetch_summary(&self, entity_type: EntityType) -> Result<SourceSummary, SyncError>;

    /// Drops any cached credentials so the next fetch re-authenticates.
    async fn reset_auth(&self) {}
}
