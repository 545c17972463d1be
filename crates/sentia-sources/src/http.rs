// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP plumbing: client construction and mapping of upstream
//! responses onto [`ErrorKind`](sentia_core::ErrorKind)s.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use sentia_core::{SentiaError, SyncError};
use serde::de::DeserializeOwned;

/// Longest upstream body excerpt kept in error messages.
const BODY_EXCERPT: usize = 200;

/// Build a client whose own deadline matches the per-fetch timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, SentiaError> {
    reqwest::Client::builder()
        .user_agent(concat!("sentia-sync/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .build()
        .map_err(|e| SentiaError::Internal(format!("failed to build HTTP client: {e}")))
}

/// Map a transport failure (no response received).
pub fn send_error(e: reqwest::Error, timeout: Duration) -> SyncError {
    if e.is_timeout() {
        SyncError::timeout(timeout)
    } else {
        SyncError::upstream(format!("request failed: {e}"))
    }
}

/// Map a non-success status onto an error kind.
///
/// 401/403 are credential problems, 429 is throttling (honouring
/// `Retry-After` seconds), everything else is an upstream error.
pub fn status_error(status: StatusCode, retry_after: Option<Duration>, body: &str) -> SyncError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SyncError::unauthenticated(format!("upstream rejected credentials ({status})"))
                .with_status(status.as_u16())
        }
        StatusCode::TOO_MANY_REQUESTS => {
            SyncError::rate_limited(retry_after).with_status(status.as_u16())
        }
        _ => SyncError::upstream(format!("upstream returned {status}: {}", excerpt(body)))
            .with_status(status.as_u16()),
    }
}

/// Send a request and decode a JSON success body.
pub async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<(T, reqwest::header::HeaderMap), SyncError> {
    let response = request.send().await.map_err(|e| send_error(e, timeout))?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.map_err(|e| send_error(e, timeout))?;

    if !status.is_success() {
        let retry_after = parse_retry_after(&headers);
        return Err(status_error(status, retry_after, &body));
    }

    let decoded = serde_json::from_str(&body).map_err(|e| {
        SyncError::upstream(format!("malformed upstream body: {e}")).with_status(status.as_u16())
    })?;
    Ok((decoded, headers))
}

/// `Retry-After` as delta-seconds, rounded up (Shopify sends `2.0`).
/// HTTP-date values are ignored.
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Duration::from_secs(secs.ceil() as u64))
}

fn excerpt(body: &str) -> &str {
    let body = body.trim();
    if body.len() <= BODY_EXCERPT {
        return body;
    }
    let mut end = BODY_EXCERPT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Join a base URL and a path without doubling or dropping slashes.
pub fn join_url(base: &str, path: &str) -> Result<reqwest::Url, SyncError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    reqwest::Url::parse(&joined)
        .map_err(|e| SyncError::upstream(format!("invalid upstream URL `{joined}`: {e}")))
}

/// Money and quantities arrive as numbers or numeric strings depending on
/// the provider; accept both.
pub mod amount {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null,
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) if s.trim().is_empty() => Ok(0.0),
            Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
            Raw::Null => Ok(0.0),
        }
    }

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(*value)
    }
}

/// Round a currency total to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};
    use sentia_core::ErrorKind;

    #[test]
    fn auth_statuses_map_to_unauthenticated() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = status_error(status, None, "");
            assert_eq!(err.kind, ErrorKind::Unauthenticated);
            assert_eq!(err.status, Some(status.as_u16()));
        }
    }

    #[test]
    fn throttling_keeps_retry_after() {
        let err = status_error(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(90)),
            "",
        );
        assert_eq!(err.kind, ErrorKind::RateLimited);
        assert_eq!(err.retry_after_secs, Some(90));
    }

    #[test]
    fn other_statuses_are_upstream_errors_with_context() {
        let err = status_error(StatusCode::BAD_GATEWAY, None, "gateway down");
        assert_eq!(err.kind, ErrorKind::UpstreamError);
        assert_eq!(err.status, Some(502));
        assert!(err.message.contains("gateway down"));
    }

    #[test]
    fn retry_after_parses_delta_seconds_only() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(120)));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("2.0"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(2)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "é".repeat(300);
        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, None, &body);
        assert!(err.message.len() < 260);
    }

    #[test]
    fn join_url_normalizes_slashes() {
        let url = join_url("https://api.example.com/", "/admin/orders.json").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/admin/orders.json");
    }

    #[test]
    fn amounts_accept_strings_and_numbers() {
        #[derive(serde::Deserialize)]
        struct Row {
            #[serde(with = "amount")]
            a: f64,
            #[serde(with = "amount")]
            b: f64,
            #[serde(with = "amount")]
            c: f64,
        }
        let row: Row = serde_json::from_str(r#"{"a": "12.50", "b": 3, "c": null}"#).unwrap();
        assert_eq!((row.a, row.b, row.c), (12.5, 3.0, 0.0));
    }
}
