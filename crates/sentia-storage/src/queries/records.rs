// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synced record upserts and lookups.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use sentia_core::{EntityType, SentiaError, SourceName, StoredRecord, SyncedRecord};

use crate::database::{Database, map_tr_err};
use crate::queries::{parse_json, parse_text, parse_ts, to_json, ts};

const UPSERT_SQL: &str = "INSERT INTO synced_records
        (source, entity_type, natural_key, data, first_synced_at, last_synced_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
     ON CONFLICT(source, entity_type, natural_key) DO UPDATE SET
        data = excluded.data,
        last_synced_at = excluded.last_synced_at";

/// Insert or replace records in one transaction. Last write wins per key.
pub async fn upsert_records(
    db: &Database,
    source: SourceName,
    entity_type: EntityType,
    records: Vec<SyncedRecord>,
    synced_at: DateTime<Utc>,
) -> Result<u64, SentiaError> {
    let source = source.to_string();
    let entity_type = entity_type.to_string();
    let synced_at = ts(synced_at);

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(UPSERT_SQL)?;
                for record in &records {
                    stmt.execute(params![
                        source,
                        entity_type,
                        record.natural_key,
                        to_json(&record.data)?,
                        synced_at,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(records.len() as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one record by its natural key.
pub async fn get_record(
    db: &Database,
    source: SourceName,
    entity_type: EntityType,
    natural_key: &str,
) -> Result<Option<StoredRecord>, SentiaError> {
    let natural_key = natural_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT source, entity_type, natural_key, data, first_synced_at, last_synced_at
                 FROM synced_records
                 WHERE source = ?1 AND entity_type = ?2 AND natural_key = ?3",
                params![source.to_string(), entity_type.to_string(), natural_key],
                |row| {
                    let source: String = row.get(0)?;
                    let entity_type: String = row.get(1)?;
                    let data: String = row.get(3)?;
                    let first: String = row.get(4)?;
                    let last: String = row.get(5)?;
                    Ok(StoredRecord {
                        source: parse_text(0, &source)?,
                        entity_type: parse_text(1, &entity_type)?,
                        natural_key: row.get(2)?,
                        data: parse_json(3, &data)?,
                        first_synced_at: parse_ts(4, &first)?,
                        last_synced_at: parse_ts(5, &last)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Number of rows held for a source and entity type.
pub async fn count_records(
    db: &Database,
    source: SourceName,
    entity_type: EntityType,
) -> Result<u64, SentiaError> {
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM synced_records WHERE source = ?1 AND entity_type = ?2",
                params![source.to_string(), entity_type.to_string()],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
        .map_err(map_tr_err)
}
