//! Key-value metadata store for LinkTrove.
//!
//! Generic get/set of JSON-encoded values by string key over the `meta`
//! table. Order snapshots, the selected-collection memory and the sync
//! status record all live here.

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::errors::MetaError;

/// Trait defining key-value metadata operations.
pub trait MetaStoreTrait {
    fn get_raw(&self, key: &str) -> Result<Option<String>, MetaError>;
    fn set_raw(&self, key: &str, value: &str) -> Result<(), MetaError>;
    fn remove(&self, key: &str) -> Result<(), MetaError>;
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, MetaError>;
}

/// Metadata store backed by a SQLite connection.
pub struct MetaStore<'a> {
    conn: &'a Connection,
}

impl<'a> MetaStore<'a> {
    /// Creates a new `MetaStore` using the provided database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Returns the current UNIX timestamp in seconds.
    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// Reads a value and deserializes it from JSON.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, MetaError> {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serializes a value to JSON and writes it under `key`.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), MetaError> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw)
    }
}

impl<'a> MetaStoreTrait for MetaStore<'a> {
    fn get_raw(&self, key: &str) -> Result<Option<String>, MetaError> {
        let value = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), MetaError> {
        self.conn.execute(
            "INSERT INTO meta (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Self::now()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MetaError> {
        self.conn
            .execute("DELETE FROM meta WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Lists keys beginning with `prefix`, sorted. Used to enumerate
    /// per-group order snapshots for export.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, MetaError> {
        let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM meta WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key")?;
        let rows = stmt.query_map(params![pattern], |row| row.get(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}
