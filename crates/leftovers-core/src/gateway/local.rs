//! Local fallback store: one JSON snapshot per collection.

use std::sync::Mutex;

use crate::db::{Database, DbResult, Snapshot};
use crate::models::Record;

/// Snapshot persistence for demo / offline mode.
///
/// Every mutation rewrites the whole collection under its well-known key.
pub struct LocalFallbackStore {
    db: Mutex<Database>,
}

impl LocalFallbackStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Load a collection. Malformed snapshots read as empty.
    pub fn load<R: Record>(&self) -> DbResult<Snapshot<Vec<R>>> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        db.load_snapshot(R::COLLECTION.snapshot_key())
    }

    /// Replace the stored collection.
    pub fn persist<R: Record>(&self, records: &[R]) -> DbResult<()> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        db.store_snapshot(R::COLLECTION.snapshot_key(), records)?;
        log::debug!(
            "Persisted {} records to '{}'",
            records.len(),
            R::COLLECTION.snapshot_key()
        );
        Ok(())
    }

    /// Raw snapshot text, for inspection.
    pub fn raw_snapshot<R: Record>(&self) -> DbResult<Option<String>> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        db.get_snapshot_raw(R::COLLECTION.snapshot_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Medication, NewMedication};
    use chrono::Utc;

    #[test]
    fn test_persist_then_load() {
        let store = LocalFallbackStore::new(Database::open_in_memory().unwrap());
        let meds = vec![Medication::from_draft(
            NewMedication::new("Mesna 400mg"),
            "m1".into(),
            Utc::now(),
        )];

        store.persist(&meds).unwrap();

        match store.load::<Medication>().unwrap() {
            Snapshot::Loaded(loaded) => assert_eq!(loaded, meds),
            other => panic!("unexpected snapshot: {:?}", other),
        }
    }
}
