//! Whole-value snapshot get/set.

use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Database, DbResult};

/// Result of loading a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot<T> {
    /// Nothing stored under the key yet
    Missing,
    /// Stored value could not be decoded
    Malformed,
    Loaded(T),
}

impl Database {
    /// Raw snapshot text for a key.
    pub fn get_snapshot_raw(&self, key: &str) -> DbResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_snapshots WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Replace the raw snapshot text for a key.
    pub fn set_snapshot_raw(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO local_snapshots (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Load and decode a snapshot. Decode failures are reported as
    /// [`Snapshot::Malformed`], never as errors.
    pub fn load_snapshot<T: DeserializeOwned>(&self, key: &str) -> DbResult<Snapshot<T>> {
        let Some(raw) = self.get_snapshot_raw(key)? else {
            return Ok(Snapshot::Missing);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Snapshot::Loaded(value)),
            Err(e) => {
                log::warn!("Ignoring malformed snapshot '{}': {}", key, e);
                Ok(Snapshot::Malformed)
            }
        }
    }

    /// Serialize and store a snapshot, replacing the previous value.
    pub fn store_snapshot<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> DbResult<()> {
        let json = serde_json::to_string(value)?;
        self.set_snapshot_raw(key, &json)
    }

    /// Delete a snapshot.
    pub fn delete_snapshot(&self, key: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM local_snapshots WHERE key = ?", [key])?;
        Ok(rows_affected > 0)
    }
}
