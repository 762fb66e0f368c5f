//! In-memory collections held by the gateway for the session.

use tokio::sync::{Mutex, MutexGuard};

use crate::models::{LeftoverPreparation, Medication, PurchaseEntry, Record};

/// One collection behind its own async lock.
///
/// The lock is held across build → persist → swap, which serializes
/// mutations of the same collection.
pub struct RecordSet<R> {
    rows: Mutex<Vec<R>>,
}

impl<R: Record> RecordSet<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, Vec<R>> {
        self.rows.lock().await
    }

    /// Clone of the current rows matching `keep`.
    pub async fn filtered(&self, keep: impl Fn(&R) -> bool) -> Vec<R> {
        self.rows
            .lock()
            .await
            .iter()
            .filter(|r| keep(r))
            .cloned()
            .collect()
    }

    pub async fn replace(&self, rows: Vec<R>) {
        *self.rows.lock().await = rows;
    }

    /// Upsert `fresh` by id, keeping rows it does not mention.
    pub async fn merge(&self, fresh: &[R]) {
        let mut rows = self.rows.lock().await;
        for row in fresh {
            match rows.iter_mut().find(|r| r.id() == row.id()) {
                Some(known) => *known = row.clone(),
                None => rows.push(row.clone()),
            }
        }
    }
}

/// How a successful remote read updates the in-memory collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// The read returned the whole collection.
    Replace,
    /// The read was filtered; only the returned rows are updated.
    Merge,
}

impl<R: Record> Default for RecordSet<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// The three collections.
#[derive(Default)]
pub struct RecordSets {
    leftovers: RecordSet<LeftoverPreparation>,
    medications: RecordSet<Medication>,
    purchases: RecordSet<PurchaseEntry>,
}

impl RecordSets {
    pub fn new(
        leftovers: Vec<LeftoverPreparation>,
        medications: Vec<Medication>,
        purchases: Vec<PurchaseEntry>,
    ) -> Self {
        Self {
            leftovers: RecordSet::new(leftovers),
            medications: RecordSet::new(medications),
            purchases: RecordSet::new(purchases),
        }
    }
}

/// A record type the gateway keeps an in-memory collection for.
pub trait Stored: Record {
    fn set(sets: &RecordSets) -> &RecordSet<Self>;
}

impl Stored for LeftoverPreparation {
    fn set(sets: &RecordSets) -> &RecordSet<Self> {
        &sets.leftovers
    }
}

impl Stored for Medication {
    fn set(sets: &RecordSets) -> &RecordSet<Self> {
        &sets.medications
    }
}

impl Stored for PurchaseEntry {
    fn set(sets: &RecordSets) -> &RecordSet<Self> {
        &sets.purchases
    }
}
