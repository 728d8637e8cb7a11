#![forbid(unsafe_code)]

use super::{KeyValueStore, QUOTA_BYTES, QUOTA_BYTES_PER_ITEM, StorageChange, check_quota, decode_stored, item_size};
use crate::clock::now_ms;
use crate::error::StoreError;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const DB_FILE: &str = "linktree.db";
const SCHEMA_VERSION: i64 = 1;
/// Change rows kept behind the newest one. Devices further behind than this miss writes.
const CHANGE_LOG_RETAIN: i64 = 1_024;

/// Store backed by a SQLite file. Every process that opens the same directory under a
/// different device name is another synchronized device.
#[derive(Debug)]
pub struct SqliteKvStore {
    conn: Connection,
    device: String,
    cursor: i64,
}

impl SqliteKvStore {
    pub fn open(storage_dir: impl AsRef<Path>, device: impl Into<String>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref();
        std::fs::create_dir_all(storage_dir)?;

        let db_path = storage_dir.join(DB_FILE);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        install_schema(&conn)?;
        let cursor = conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM changes", [], |row| {
            row.get::<_, i64>(0)
        })?;

        let device = device.into();
        debug!(dir = %storage_dir.display(), device = %device, cursor, "sqlite store opened");
        Ok(Self { conn, device, cursor })
    }
}

impl KeyValueStore for SqliteKvStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let encoded = self
            .conn
            .query_row("SELECT value FROM items WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        encoded.map(|encoded| decode_stored(key, &encoded)).transpose()
    }

    fn save(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value)?;
        let now_ms = now_ms();

        let tx = self.conn.transaction()?;
        let old: Option<String> = tx
            .query_row("SELECT value FROM items WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        if old.as_deref() == Some(encoded.as_str()) {
            return Ok(());
        }

        let other_bytes: i64 = tx.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0) \
             FROM items WHERE key <> ?1",
            params![key],
            |row| row.get(0),
        )?;
        check_quota(
            key,
            item_size(key, &encoded),
            usize::try_from(other_bytes).unwrap_or(usize::MAX),
            QUOTA_BYTES_PER_ITEM,
            QUOTA_BYTES,
        )?;

        tx.execute(
            "INSERT INTO items(key, value, device, updated_at_ms) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, device = excluded.device, \
             updated_at_ms = excluded.updated_at_ms",
            params![key, encoded, self.device, now_ms],
        )?;
        tx.execute(
            "INSERT INTO changes(key, old_value, new_value, device, ts_ms) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![key, old, encoded, self.device, now_ms],
        )?;
        tx.execute(
            "DELETE FROM changes WHERE seq <= (SELECT MAX(seq) FROM changes) - ?1",
            params![CHANGE_LOG_RETAIN],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn bytes_in_use(&self, key: Option<&str>) -> Result<usize, StoreError> {
        let bytes: i64 = match key {
            Some(key) => self.conn.query_row(
                "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0) \
                 FROM items WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0) \
                 FROM items",
                [],
                |row| row.get(0),
            )?,
        };
        Ok(usize::try_from(bytes).unwrap_or(0))
    }

    fn poll_changes(&mut self) -> Result<Vec<StorageChange>, StoreError> {
        let rows = {
            let mut stmt = self.conn.prepare(
                "SELECT seq, key, old_value, new_value, device, ts_ms FROM changes \
                 WHERE seq > ?1 ORDER BY seq ASC",
            )?;
            let mapped = stmt.query_map(params![self.cursor], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?;
            mapped.collect::<Result<Vec<_>, _>>()?
        };

        if let Some((first_seq, ..)) = rows.first()
            && *first_seq > self.cursor + 1
        {
            warn!(
                cursor = self.cursor,
                first_seq, "change log was pruned past this device; some writes were missed"
            );
        }

        let mut changes = Vec::new();
        for (seq, key, old_value, new_value, device, ts_ms) in rows {
            self.cursor = seq;
            if device == self.device {
                continue;
            }
            let (old_value, new_value) = match decode_pair(&key, old_value, new_value) {
                Ok(values) => values,
                Err(err) => {
                    warn!(seq, key = %key, origin = %device, error = %err, "skipping unreadable change row");
                    continue;
                }
            };
            changes.push(StorageChange {
                old_value,
                new_value,
                key,
                origin: device,
                ts_ms,
            });
        }
        Ok(changes)
    }
}

fn decode_pair(
    key: &str,
    old_value: Option<String>,
    new_value: Option<String>,
) -> Result<(Option<Value>, Option<Value>), StoreError> {
    let decode = |encoded: String| decode_stored(key, &encoded);
    Ok((old_value.map(decode).transpose()?, new_value.map(decode).transpose()?))
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS items (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL,
          device TEXT NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS changes (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          key TEXT NOT NULL,
          old_value TEXT,
          new_value TEXT,
          device TEXT NOT NULL,
          ts_ms INTEGER NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO store_state(singleton, schema_version, created_at_ms) VALUES (1, ?1, ?2)",
        params![SCHEMA_VERSION, now_ms()],
    )?;
    let version: i64 = conn.query_row(
        "SELECT schema_version FROM store_state WHERE singleton = 1",
        [],
        |row| row.get(0),
    )?;
    if version != SCHEMA_VERSION {
        return Err(StoreError::Unavailable(format!(
            "unsupported schema version {version} (expected {SCHEMA_VERSION})"
        )));
    }
    Ok(())
}
