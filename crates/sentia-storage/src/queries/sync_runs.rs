// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit log of finished sync cycles.

use rusqlite::params;
use sentia_core::{SentiaError, SourceName, SyncResult};

use crate::database::{Database, map_tr_err};
use crate::queries::{parse_json, parse_text, parse_ts, to_json, ts};

/// Append one finished cycle. Re-recording the same id replaces the row.
pub async fn insert_sync_run(db: &Database, result: &SyncResult) -> Result<(), SentiaError> {
    let id = result.id.to_string();
    let source = result.source.to_string();
    let started_at = ts(result.started_at);
    let finished_at = ts(result.finished_at);
    let outcome = result.outcome.to_string();
    let record_counts = result.record_counts.clone();
    let failures = result.failures.clone();
    let error = result.error.clone();

    db.connection()
        .call(move |conn| {
            let error_json = error.as_ref().map(to_json).transpose()?;
            conn.execute(
                "INSERT OR REPLACE INTO sync_runs
                    (id, source, started_at, finished_at, outcome, record_counts, failures, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    source,
                    started_at,
                    finished_at,
                    outcome,
                    to_json(&record_counts)?,
                    to_json(&failures)?,
                    error_json,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent cycles, newest first, optionally for one source.
pub async fn recent_sync_runs(
    db: &Database,
    source: Option<SourceName>,
    limit: usize,
) -> Result<Vec<SyncResult>, SentiaError> {
    let source = source.map(|s| s.to_string());
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, source, started_at, finished_at, outcome, record_counts, failures, error
                 FROM sync_runs
                 WHERE ?1 IS NULL OR source = ?1
                 ORDER BY finished_at DESC, started_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![source, limit], |row| {
                let id: String = row.get(0)?;
                let source: String = row.get(1)?;
                let started_at: String = row.get(2)?;
                let finished_at: String = row.get(3)?;
                let outcome: String = row.get(4)?;
                let record_counts: String = row.get(5)?;
                let failures: String = row.get(6)?;
                let error: Option<String> = row.get(7)?;
                Ok(SyncResult {
                    id: parse_text(0, &id)?,
                    source: parse_text(1, &source)?,
                    started_at: parse_ts(2, &started_at)?,
                    finished_at: parse_ts(3, &finished_at)?,
                    outcome: parse_text(4, &outcome)?,
                    record_counts: parse_json(5, &record_counts)?,
                    failures: parse_json(6, &failures)?,
                    error: error.as_deref().map(|e| parse_json(7, e)).transpose()?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
