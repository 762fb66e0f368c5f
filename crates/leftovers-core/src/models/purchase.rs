//! Purchase / stock entry models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{require, Collection, Medication, Record, ValidationError};

/// A stock check for one medication, optionally flagged as ordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseEntry {
    pub id: String,
    /// Weak reference to the catalog entry; may dangle after catalog deletes
    pub medication_id: Option<String>,
    /// Name copied from the catalog at creation time
    pub medication_name: String,
    pub current_stock: u32,
    pub ordered: bool,
    pub order_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a purchase entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPurchaseEntry {
    pub medication_id: Option<String>,
    pub medication_name: String,
    pub current_stock: u32,
    pub ordered: bool,
    pub order_date: NaiveDate,
}

/// Partial update for a purchase entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PurchasePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,
}

impl NewPurchaseEntry {
    /// Stock entry for a catalog medication, not yet ordered, dated `today`.
    pub fn for_medication(medication: &Medication, current_stock: u32, today: NaiveDate) -> Self {
        Self {
            medication_id: Some(medication.id.clone()),
            medication_name: medication.name.clone(),
            current_stock,
            ordered: false,
            order_date: today,
        }
    }
}

impl PurchasePatch {
    pub fn ordered(ordered: bool) -> Self {
        Self {
            ordered: Some(ordered),
            ..Self::default()
        }
    }
}

impl Record for PurchaseEntry {
    type Draft = NewPurchaseEntry;
    type Patch = PurchasePatch;

    const COLLECTION: Collection = Collection::Purchases;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate(draft: &Self::Draft) -> Result<(), ValidationError> {
        require("medication_name", &draft.medication_name)
    }

    fn from_draft(draft: Self::Draft, id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            medication_id: draft.medication_id,
            medication_name: draft.medication_name,
            current_stock: draft.current_stock,
            ordered: draft.ordered,
            order_date: draft.order_date,
            created_at,
        }
    }

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(stock) = patch.current_stock {
            self.current_stock = stock;
        }
        if let Some(ordered) = patch.ordered {
            self.ordered = ordered;
        }
    }
}
