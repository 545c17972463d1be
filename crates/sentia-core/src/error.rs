// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sentia sync service.
//!
//! Two layers exist:
//! - [`SyncError`] is a value: the structured failure of one upstream fetch,
//!   carried inside failed [`SyncResult`](crate::SyncResult)s and events.
//! - [`SentiaError`] is the crate-wide error returned from fallible operations.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::{EntityType, SourceName};

/// Machine-readable classification of a sync failure.
///
/// The coordinator reacts to the kind only, never to which provider raised it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Credentials are absent. Recovered by operator action only.
    NotConfigured,
    /// Credentials are present but were rejected upstream.
    Unauthenticated,
    /// Upstream throttling.
    RateLimited,
    /// A bounded call exceeded its deadline.
    Timeout,
    /// Any other non-success upstream response or malformed payload.
    UpstreamError,
    /// Persisting synced records failed.
    Storage,
}

/// Structured failure of one fetch against an upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct SyncError {
    pub kind: ErrorKind,
    pub message: String,
    /// Entity type being fetched when the failure happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    /// Upstream HTTP status, when there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Advertised retry-after delay in seconds (rate limiting).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    /// Advertised retry-after expressed directly in scheduler cycles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_cycles: Option<u32>,
}

impl SyncError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            entity_type: None,
            status: None,
            retry_after_secs: None,
            retry_after_cycles: None,
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamError, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("upstream call exceeded {}s deadline", after.as_secs()),
        )
    }

    /// A rate-limit error with an optional advertised `Retry-After`.
    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        let mut err = Self::new(ErrorKind::RateLimited, "upstream rate limit reached");
        err.retry_after_secs = retry_after.map(|d| d.as_secs());
        err
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_entity(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn with_retry_after_cycles(mut self, cycles: u32) -> Self {
        self.retry_after_cycles = Some(cycles);
        self
    }

    /// Number of scheduled cycles to skip after this error, given the
    /// source's sync interval. Zero for anything but rate limiting.
    pub fn cycles_to_skip(&self, interval: Duration) -> u32 {
        if self.kind != ErrorKind::RateLimited {
            return 0;
        }
        if let Some(cycles) = self.retry_after_cycles {
            return cycles;
        }
        match self.retry_after_secs {
            Some(secs) if !interval.is_zero() => {
                let interval_secs = interval.as_secs().max(1);
                u32::try_from(secs.div_ceil(interval_secs).max(1)).unwrap_or(u32::MAX)
            }
            _ => 1,
        }
    }
}

/// The primary error type used across the Sentia workspace.
#[derive(Debug, Error)]
pub enum SentiaError {
    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistent store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The requested source has no usable credentials.
    #[error("source {source_name} is not configured (missing: {})", .missing.join(", "))]
    NotConfigured {
        source_name: SourceName,
        missing: Vec<String>,
    },

    /// A caller supplied an argument outside the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The named source does not exist.
    #[error("unknown source `{0}`")]
    UnknownSource(String),

    /// The source exists but does not sync this entity type.
    #[error("source {source_name} has no entity type `{entity_type}`")]
    UnknownEntity {
        source_name: SourceName,
        entity_type: String,
    },

    /// A sync attempt failed upstream.
    #[error("sync failed: {0}")]
    Sync(#[from] SyncError),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
