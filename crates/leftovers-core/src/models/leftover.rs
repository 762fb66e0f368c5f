//! Leftover preparation models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{require, Collection, Record, ValidationError};

/// A compounded preparation left over after administration, tracked until
/// it is used or administratively resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeftoverPreparation {
    /// Backing-store identifier
    pub id: String,
    /// Preparation name (e.g., "Paclitaxel 175mg/m²")
    pub preparation_name: String,
    /// Dose description (e.g., "300mg in 500ml NS")
    pub dose: String,
    /// Expiry date, no time component
    pub expiry_date: NaiveDate,
    /// Reused for another patient
    pub used: bool,
    /// Administratively closed out
    pub resolved: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a leftover preparation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLeftoverPreparation {
    pub preparation_name: String,
    pub dose: String,
    pub expiry_date: NaiveDate,
    pub used: bool,
    pub resolved: bool,
}

/// Partial update for a leftover preparation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LeftoverPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preparation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
}

/// Expiry badge relative to a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    Expired,
    Today,
    Tomorrow,
    Later,
}

impl NewLeftoverPreparation {
    /// Create an unused, unresolved leftover.
    pub fn new(preparation_name: String, dose: String, expiry_date: NaiveDate) -> Self {
        Self {
            preparation_name,
            dose,
            expiry_date,
            used: false,
            resolved: false,
        }
    }
}

impl LeftoverPatch {
    pub fn used(used: bool) -> Self {
        Self {
            used: Some(used),
            ..Self::default()
        }
    }

    pub fn resolved(resolved: bool) -> Self {
        Self {
            resolved: Some(resolved),
            ..Self::default()
        }
    }
}

impl LeftoverPreparation {
    /// Whether the record belongs on the primary worklist.
    pub fn is_open(&self) -> bool {
        !self.used && !self.resolved
    }

    /// Drug family: first whitespace-delimited token of the preparation name.
    pub fn drug_family(&self) -> &str {
        self.preparation_name.split_whitespace().next().unwrap_or("")
    }

    /// Expiry badge for the given day.
    pub fn expiry_status(&self, today: NaiveDate) -> ExpiryStatus {
        if self.expiry_date < today {
            ExpiryStatus::Expired
        } else if self.expiry_date == today {
            ExpiryStatus::Today
        } else if today.succ_opt() == Some(self.expiry_date) {
            ExpiryStatus::Tomorrow
        } else {
            ExpiryStatus::Later
        }
    }
}

impl Record for LeftoverPreparation {
    type Draft = NewLeftoverPreparation;
    type Patch = LeftoverPatch;

    const COLLECTION: Collection = Collection::Leftovers;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate(draft: &Self::Draft) -> Result<(), ValidationError> {
        require("preparation_name", &draft.preparation_name)?;
        require("dose", &draft.dose)
    }

    fn from_draft(draft: Self::Draft, id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            preparation_name: draft.preparation_name,
            dose: draft.dose,
            expiry_date: draft.expiry_date,
            used: draft.used,
            resolved: draft.resolved,
            created_at,
        }
    }

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(name) = &patch.preparation_name {
            self.preparation_name = name.clone();
        }
        if let Some(dose) = &patch.dose {
            self.dose = dose.clone();
        }
        if let Some(expiry) = patch.expiry_date {
            self.expiry_date = expiry;
        }
        if let Some(used) = patch.used {
            self.used = used;
        }
        if let Some(resolved) = patch.resolved {
            self.resolved = resolved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leftover(name: &str) -> LeftoverPreparation {
        LeftoverPreparation::from_draft(
            NewLeftoverPreparation::new(
                name.into(),
                "150mg in 1000ml NS".into(),
                NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            ),
            "1".into(),
            Utc::now(),
        )
    }

    #[test]
    fn test_drug_family() {
        assert_eq!(leftover("Cisplatin 75mg/m²").drug_family(), "Cisplatin");
        assert_eq!(leftover("  Docetaxel").drug_family(), "Docetaxel");
        assert_eq!(leftover("").drug_family(), "");
    }

    #[test]
    fn test_patch_merges_only_present_fields() {
        let mut item = leftover("Cisplatin 75mg/m²");
        item.apply(&LeftoverPatch::used(true));
        assert!(item.used);
        assert!(!item.resolved);
        assert_eq!(item.dose, "150mg in 1000ml NS");

        item.apply(&LeftoverPatch::resolved(true));
        assert!(item.used && item.resolved);
        assert!(!item.is_open());
    }

    #[test]
    fn test_patch_serializes_sparse() {
        let json = serde_json::to_string(&LeftoverPatch::resolved(true)).unwrap();
        assert_eq!(json, r#"{"resolved":true}"#);
    }

    #[test]
    fn test_validation_rejects_blank_fields() {
        let mut draft = NewLeftoverPreparation::new(
            "   ".into(),
            "1mg".into(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        let err = LeftoverPreparation::validate(&draft).unwrap_err();
        assert_eq!(err.field, "preparation_name");

        draft.preparation_name = "Etoposide".into();
        draft.dose = String::new();
        assert_eq!(LeftoverPreparation::validate(&draft).unwrap_err().field, "dose");
    }

    #[test]
    fn test_expiry_status() {
        let item = leftover("Cisplatin");
        let expiry = item.expiry_date;
        assert_eq!(item.expiry_status(expiry.succ_opt().unwrap()), ExpiryStatus::Expired);
        assert_eq!(item.expiry_status(expiry), ExpiryStatus::Today);
        assert_eq!(item.expiry_status(expiry.pred_opt().unwrap()), ExpiryStatus::Tomorrow);
        assert_eq!(
            item.expiry_status(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            ExpiryStatus::Later
        );
    }
}
