// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cached OAuth access token shared by the Xero and Amazon clients.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use sentia_core::SyncError;

/// Tokens are refreshed this long before their advertised expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Advertised lifetimes beyond this are treated as this long.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Standard OAuth2 token response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    1800
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Holds at most one access token. Concurrent callers wait on one refresh.
#[derive(Default)]
pub struct TokenCache {
    inner: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token, or a fresh one obtained from `fetch`.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenResponse, SyncError>>,
    {
        let mut guard = self.inner.lock().await;
        if let Some(token) = guard.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let response = fetch().await?;
        let lifetime = Duration::from_secs(response.expires_in).min(MAX_TOKEN_LIFETIME);
        let now = Instant::now();
        let refresh_at = now
            .checked_add(lifetime.saturating_sub(REFRESH_MARGIN))
            .unwrap_or(now);
        tracing::debug!(expires_in = response.expires_in, "access token refreshed");
        *guard = Some(CachedToken {
            value: response.access_token.clone(),
            refresh_at,
        });
        Ok(response.access_token)
    }

    /// Forget the cached token so the next call fetches a new one.
    pub async fn clear(&self) {
        self.inner.lock().await.take();
    }
}

/// Token endpoints answer bad client credentials or a revoked refresh token
/// with 400 (`invalid_client`, `invalid_grant`).
pub fn token_error(err: SyncError) -> SyncError {
    match err.status {
        Some(400) => SyncError::unauthenticated("token endpoint rejected credentials")
            .with_status(400),
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn token(value: &str, expires_in: u64) -> TokenResponse {
        TokenResponse {
            access_token: value.to_string(),
            expires_in,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn token_is_reused_until_refresh_margin() {
        let cache = TokenCache::new();
        let calls = AtomicUsize::new(0);
        let fetch = |calls: &AtomicUsize| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(token(&format!("t{n}"), 600)) }
        };

        assert_eq!(cache.get_or_fetch(|| fetch(&calls)).await.unwrap(), "t0");
        tokio::time::advance(Duration::from_secs(500)).await;
        assert_eq!(cache.get_or_fetch(|| fetch(&calls)).await.unwrap(), "t0");
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.get_or_fetch(|| fetch(&calls)).await.unwrap(), "t1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_expires_in_is_capped() {
        let cache = TokenCache::new();
        assert_eq!(
            cache
                .get_or_fetch(|| async { Ok(token("long", u64::MAX)) })
                .await
                .unwrap(),
            "long"
        );
        tokio::time::advance(MAX_TOKEN_LIFETIME).await;
        let next = cache
            .get_or_fetch(|| async { Ok(token("next", 3600)) })
            .await
            .unwrap();
        assert_eq!(next, "next");
    }

    #[tokio::test]
    async fn clear_forces_refetch() {
        let cache = TokenCache::new();
        cache
            .get_or_fetch(|| async { Ok(token("old", 3600)) })
            .await
            .unwrap();
        cache.clear().await;
        let fresh = cache
            .get_or_fetch(|| async { Ok(token("new", 3600)) })
            .await
            .unwrap();
        assert_eq!(fresh, "new");
    }

    #[tokio::test]
    async fn fetch_failure_caches_nothing() {
        let cache = TokenCache::new();
        let err = cache
            .get_or_fetch(|| async { Err(SyncError::unauthenticated("bad secret")) })
            .await
            .unwrap_err();
        assert_eq!(err.kind, sentia_core::ErrorKind::Unauthenticated);
        let ok = cache
            .get_or_fetch(|| async { Ok(token("later", 3600)) })
            .await
            .unwrap();
        assert_eq!(ok, "later");
    }
}
