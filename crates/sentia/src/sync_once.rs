// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sentia sync` command implementation.
//!
//! Runs one sync cycle for a source (or all of them) in the foreground,
//! persisting records and the run itself exactly as the service would.

use std::sync::Arc;

use sentia_config::SentiaConfig;
use sentia_core::{SentiaError, SourceName, SyncOutcome, SyncResult};

use crate::stack::Stack;

/// What to sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    One(SourceName),
    All,
}

/// Runs the `sentia sync` command, printing one line (or JSON object) per
/// source. Fails when any configured source failed outright.
pub async fn run_sync(
    config: &SentiaConfig,
    target: SyncTarget,
    json: bool,
) -> Result<(), SentiaError> {
    let stack = Stack::build(config).await?;
    let results = collect(&stack, target).await?;
    stack.close().await;

    for result in &results {
        if json {
            let line = serde_json::to_string(result.as_ref())
                .map_err(|e| SentiaError::Internal(format!("failed to encode result: {e}")))?;
            println!("{line}");
        } else {
            println!("{}", format_result(result));
        }
    }

    let failed = results
        .iter()
        .filter(|r| r.outcome == SyncOutcome::Failed)
        .count();
    if failed > 0 {
        return Err(SentiaError::Internal(format!(
            "{failed} source(s) failed to sync"
        )));
    }
    Ok(())
}

async fn collect(stack: &Stack, target: SyncTarget) -> Result<Vec<Arc<SyncResult>>, SentiaError> {
    match target {
        SyncTarget::All => Ok(stack.coordinator.sync_all().await),
        SyncTarget::One(source) => {
            let result = stack.coordinator.trigger_manual_sync(source).await?;
            Ok(vec![result])
        }
    }
}

/// `accounting  success  invoices=12  (1.4s)`
pub fn format_result(result: &SyncResult) -> String {
    let counts: Vec<String> = result
        .record_counts
        .iter()
        .map(|(entity, count)| format!("{entity}={count}"))
        .collect();
    let elapsed = (result.finished_at - result.started_at)
        .to_std()
        .unwrap_or_default();

    let mut line = format!(
        "{:<12} {:<22} {}",
        result.source.to_string(),
        result.outcome.to_string(),
        counts.join(" ")
    );
    if result.outcome != SyncOutcome::SkippedNotConfigured {
        line.push_str(&format!(" ({:.1}s)", elapsed.as_secs_f64()));
    }
    for (entity, kind) in &result.failures {
        line.push_str(&format!(" {entity}:{kind}"));
    }
    if let Some(error) = &result.error {
        line.push_str(&format!(" error={error}"));
    }
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use sentia_core::{EntityType, SyncError};

    use crate::stack::tests::config_in;

    #[test]
    fn formats_partial_result() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let result = SyncResult::from_entities(
            SourceName::Storefront,
            at,
            at + chrono::Duration::milliseconds(1500),
            BTreeMap::from([(EntityType::Orders, 12)]),
            vec![SyncError::upstream("HTTP 502").with_entity(EntityType::Inventory)],
        );
        let line = format_result(&result);
        assert!(line.starts_with("storefront"));
        assert!(line.contains("partial"));
        assert!(line.contains("orders=12"));
        assert!(line.contains("(1.5s)"));
        assert!(line.contains("inventory:upstream_error"));
    }

    #[test]
    fn formats_failed_result_with_error() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let result = SyncResult::failed(
            SourceName::Accounting,
            at,
            at,
            SyncError::unauthenticated("token endpoint rejected credentials"),
        );
        let line = format_result(&result);
        assert!(line.contains("failed"));
        assert!(line.contains("error=unauthenticated: token endpoint rejected credentials"));
    }

    #[tokio::test]
    async fn sync_all_with_no_credentials_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        run_sync(&config, SyncTarget::All, true).await.unwrap();
    }

    #[tokio::test]
    async fn sync_of_unconfigured_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let err = run_sync(&config, SyncTarget::One(SourceName::Erp), false)
            .await
            .unwrap_err();
        assert!(matches!(err, SentiaError::NotConfigured { .. }));
    }
}
