//! Domain models for the pharmacy leftovers system.

mod leftover;
mod medication;
mod purchase;

pub use leftover::*;
pub use medication::*;
pub use purchase::*;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// The three persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Leftovers,
    Medications,
    Purchases,
}

impl Collection {
    /// Remote table name.
    pub fn table(self) -> &'static str {
        match self {
            Collection::Leftovers => "leftover_preparations",
            Collection::Medications => "medications",
            Collection::Purchases => "purchase_entries",
        }
    }

    /// Well-known key of the local fallback snapshot.
    pub fn snapshot_key(self) -> &'static str {
        match self {
            Collection::Leftovers => "pharmacy_leftovers",
            Collection::Medications => "pharmacy_medications",
            Collection::Purchases => "pharmacy_purchases",
        }
    }
}

/// A required field was missing or blank on create.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Required field is empty: {field}")]
pub struct ValidationError {
    pub field: &'static str,
}

pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError { field })
    } else {
        Ok(())
    }
}

/// A persisted entity with an insert payload and a partial-update shape.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Insert payload (everything except `id` and `created_at`).
    type Draft: Serialize + Clone + Send + Sync;
    /// Partial update; absent fields are left untouched.
    type Patch: Serialize + Send + Sync;

    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    /// Check required fields before anything reaches a backing store.
    fn validate(draft: &Self::Draft) -> Result<(), ValidationError>;

    /// Materialize a draft with a locally generated identity.
    fn from_draft(draft: Self::Draft, id: String, created_at: DateTime<Utc>) -> Self;

    /// Merge a partial update into this record.
    fn apply(&mut self, patch: &Self::Patch);
}

/// Sort newest first, the default listing order of every collection.
pub fn sort_newest_first<R: Record>(records: &mut [R]) {
    records.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_keys_are_distinct() {
        let all = [Collection::Leftovers, Collection::Medications, Collection::Purchases];
        for a in all {
            for b in all {
                if a != b {
                    assert_ne!(a.table(), b.table());
                    assert_ne!(a.snapshot_key(), b.snapshot_key());
                }
            }
        }
    }

    #[test]
    fn test_require() {
        assert!(require("name", "Cisplatin").is_ok());
        assert_eq!(require("name", " \t").unwrap_err().field, "name");
    }
}
