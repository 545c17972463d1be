// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`CacheStore`] backed by `DashMap`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use sentia_core::{Clock, SentiaError, SystemClock};

use crate::{CacheEntry, CacheKey, CacheStore};

/// Process-wide cache. Expiry is checked against the injected clock on read.
pub struct MemoryCache {
    entries: DashMap<CacheKey, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        if entry.is_valid_at(now) {
            Some(entry.clone())
        } else {
            None
        }
    }

    async fn set(
        &self,
        key: CacheKey,
        payload: serde_json::Value,
        ttl: Duration,
    ) -> Result<CacheEntry, SentiaError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| SentiaError::InvalidArgument(format!("cache ttl out of range: {e}")))?;
        if ttl <= chrono::Duration::zero() {
            return Err(SentiaError::InvalidArgument(format!(
                "cache ttl for {key} must be positive"
            )));
        }

        let cached_at = self.clock.now();
        let expires_at = cached_at.checked_add_signed(ttl).ok_or_else(|| {
            SentiaError::InvalidArgument(format!("cache ttl for {key} is out of range"))
        })?;
        let entry = CacheEntry {
            key,
            payload,
            cached_at,
            expires_at,
        };
        self.entries.insert(key, entry.clone());
        tracing::debug!(key = %key, expires_at = %entry.expires_at, "cache entry stored");
        Ok(entry)
    }

    async fn invalidate(&self, key: &CacheKey) {
        if self.entries.remove(key).is_some() {
            tracing::debug!(key = %key, "cache entry invalidated");
        }
    }

    async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_valid_at(now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            tracing::debug!(purged, "expired cache entries purged");
        }
        purged
    }

    async fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentia_core::{EntityType, SourceName};
    use sentia_test_utils::ManualClock;
    use serde_json::json;

    fn key() -> CacheKey {
        CacheKey::new(SourceName::Storefront, EntityType::Orders)
    }

    fn cache() -> (Arc<ManualClock>, MemoryCache) {
        let clock = Arc::new(ManualClock::default());
        let cache = MemoryCache::with_clock(clock.clone());
        (clock, cache)
    }

    #[tokio::test]
    async fn unknown_key_is_absent() {
        let (_, cache) = cache();
        assert!(cache.get(&key()).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn entry_is_served_until_expiry() {
        let (clock, cache) = cache();
        let stored = cache
            .set(key(), json!({"orders": 5}), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(stored.expires_at > stored.cached_at);

        clock.advance(Duration::from_secs(59));
        let hit = cache.get(&key()).await.unwrap();
        assert_eq!(hit.payload, json!({"orders": 5}));
        assert!(clock.now() < hit.expires_at);

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&key()).await.is_none());
        // Passive expiry leaves the row until purged.
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn zero_ttl_is_invalid_argument() {
        let (_, cache) = cache();
        let err = cache.set(key(), json!({}), Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, SentiaError::InvalidArgument(_)));
        assert!(cache.get(&key()).await.is_none());
    }

    #[tokio::test]
    async fn huge_ttl_is_invalid_argument() {
        let (_, cache) = cache();
        let err = cache
            .set(key(), json!({}), Duration::from_secs(10_000_000_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, SentiaError::InvalidArgument(_)));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn set_overwrites_existing_entry() {
        let (clock, cache) = cache();
        cache
            .set(key(), json!({"orders": 1}), Duration::from_secs(60))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(10));
        let second = cache
            .set(key(), json!({"orders": 2}), Duration::from_secs(60))
            .await
            .unwrap();

        let hit = cache.get(&key()).await.unwrap();
        assert_eq!(hit, second);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn invalidate_is_a_noop_when_absent() {
        let (_, cache) = cache();
        cache.invalidate(&key()).await;
        cache
            .set(key(), json!({"orders": 1}), Duration::from_secs(60))
            .await
            .unwrap();
        cache.invalidate(&key()).await;
        cache.invalidate(&key()).await;
        assert!(cache.get(&key()).await.is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_expired() {
        let (clock, cache) = cache();
        let other = CacheKey::new(SourceName::Erp, EntityType::Shipments);
        cache
            .set(key(), json!(1), Duration::from_secs(10))
            .await
            .unwrap();
        cache
            .set(other, json!(2), Duration::from_secs(100))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(50));
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get(&other).await.is_some());
    }

    mod ttl_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            /// A read returns the entry exactly while `now < expires_at`.
            #[test]
            fn get_honours_expiry(ttl_secs in 1u64..10_000, elapsed_secs in 0u64..20_000) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .unwrap();
                let (clock, cache) = cache();
                runtime.block_on(async {
                    cache
                        .set(key(), json!({"orders": 1}), Duration::from_secs(ttl_secs))
                        .await
                        .unwrap();
                });
                clock.advance(Duration::from_secs(elapsed_secs));

                let hit = runtime.block_on(cache.get(&key()));
                prop_assert_eq!(hit.is_some(), elapsed_secs < ttl_secs);
                if let Some(entry) = hit {
                    prop_assert!(clock.now() < entry.expires_at);
                }
            }
        }
    }
}
