// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sentia status` command implementation.
//!
//! Reads the most recent sync runs from the audit log in the database and
//! shows, per source, whether it is configured and how its last runs went.
//! Works whether or not the service is running.

use sentia_config::SentiaConfig;
use sentia_core::{RecordStore, SentiaError, SourceName, SyncResult};
use sentia_storage::SqliteStore;
use serde::Serialize;

use crate::sync_once::format_result;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub sources: Vec<SourceStatus>,
    pub recent_runs: Vec<SyncResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub source: SourceName,
    pub provider: &'static str,
    pub configured: bool,
    pub missing: Vec<String>,
    pub sync_interval_secs: u64,
}

/// Assemble the report without printing it.
pub async fn collect_status(
    config: &SentiaConfig,
    source: Option<SourceName>,
    limit: usize,
) -> Result<StatusReport, SentiaError> {
    let store = SqliteStore::open(&config.storage).await?;
    let recent_runs = store.recent_sync_runs(source, limit).await?;

    let sources = sentia_config::source_descriptors(config)
        .into_iter()
        .filter(|d| source.is_none_or(|s| s == d.name))
        .map(|d| SourceStatus {
            source: d.name,
            provider: d.name.provider(),
            configured: d.is_configured(),
            missing: d.missing.clone(),
            sync_interval_secs: d.sync_interval.as_secs(),
        })
        .collect();

    Ok(StatusReport {
        sources,
        recent_runs,
    })
}

/// Runs the `sentia status` command.
pub async fn run_status(
    config: &SentiaConfig,
    source: Option<SourceName>,
    limit: usize,
    json: bool,
) -> Result<(), SentiaError> {
    let report = collect_status(config, source, limit).await?;

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| SentiaError::Internal(format!("failed to encode status: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    println!("Sources:");
    for s in &report.sources {
        if s.configured {
            println!(
                "  {:<12} {:<14} every {}s",
                s.source.to_string(),
                s.provider,
                s.sync_interval_secs
            );
        } else {
            println!(
                "  {:<12} {:<14} not configured (missing: {})",
                s.source.to_string(),
                s.provider,
                s.missing.join(", ")
            );
        }
    }

    println!();
    if report.recent_runs.is_empty() {
        println!("No sync runs recorded yet.");
    } else {
        println!("Recent runs:");
        for run in &report.recent_runs {
            println!(
                "  {}  {}",
                run.finished_at.format("%Y-%m-%d %H:%M:%S"),
                format_result(run)
            );
        }
    }
    Ok(())
}
