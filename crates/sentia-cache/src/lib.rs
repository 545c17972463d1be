// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache Store for the Sentia sync service.
//!
//! Holds the most recent successfully fetched summary per
//! (source, entity type) with a per-key time-to-live. Expired entries are
//! never returned; [`CacheStore::purge_expired`] removes them actively.

pub mod memory;

pub use memory::MemoryCache;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentia_core::{EntityType, SentiaError, SourceName};
use serde::{Deserialize, Serialize};

/// Composite key of one cached summary. Displays as `source:entity_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub source: SourceName,
    pub entity_type: EntityType,
}

impl CacheKey {
    pub fn new(source: SourceName, entity_type: EntityType) -> Self {
        Self {
            source,
            entity_type,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.entity_type)
    }
}

/// One cached summary. `expires_at` is always strictly after `cached_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: serde_json::Value,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Valid only while `now < expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Age of the entry at `now`, clamped at zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.cached_at).to_std().unwrap_or_default()
    }
}

/// Key-value store with per-key TTL.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// The entry for `key` if present and unexpired. Unknown keys are `None`.
    async fn get(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Overwrites any existing entry. Fails with `InvalidArgument` for a zero TTL.
    async fn set(
        &self,
        key: CacheKey,
        payload: serde_json::Value,
        ttl: Duration,
    ) -> Result<CacheEntry, SentiaError>;

    /// Removes the entry if present.
    async fn invalidate(&self, key: &CacheKey);

    /// Drops every expired entry, returning how many were removed.
    async fn purge_expired(&self) -> usize;

    /// Number of stored entries, expired or not.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn key_displays_source_and_entity() {
        let key = CacheKey::new(SourceName::Storefront, EntityType::Orders);
        assert_eq!(key.to_string(), "storefront:orders");
    }

    #[test]
    fn entry_age_and_validity() {
        let cached_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let entry = CacheEntry {
            key: CacheKey::new(SourceName::Erp, EntityType::Inventory),
            payload: serde_json::json!({"skus": 3}),
            cached_at,
            expires_at: cached_at + chrono::Duration::seconds(60),
        };
        let later = cached_at + chrono::Duration::seconds(30);
        assert_eq!(entry.age_at(later), Duration::from_secs(30));
        assert!(entry.is_valid_at(later));
        assert!(!entry.is_valid_at(cached_at + chrono::Duration::seconds(60)));
        assert_eq!(
            entry.age_at(cached_at - chrono::Duration::seconds(5)),
            Duration::ZERO
        );
    }
}
