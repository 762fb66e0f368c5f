//! Medication catalog models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require, Collection, Record, ValidationError};

/// A catalog medication. Unique by `id`; names are not deduplicated here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a catalog medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMedication {
    pub name: String,
}

/// Partial update for a catalog medication.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MedicationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl NewMedication {
    /// Names are stored trimmed.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
        }
    }
}

impl Medication {
    /// Case-insensitive substring match on the name.
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
    }
}

impl Record for Medication {
    type Draft = NewMedication;
    type Patch = MedicationPatch;

    const COLLECTION: Collection = Collection::Medications;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate(draft: &Self::Draft) -> Result<(), ValidationError> {
        require("name", &draft.name)
    }

    fn from_draft(draft: Self::Draft, id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            created_at,
        }
    }

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_medication_trims() {
        assert_eq!(NewMedication::new("  Ondansetron 8mg ").name, "Ondansetron 8mg");
    }

    #[test]
    fn test_matches_is_case_insensitive_substring() {
        let med = Medication::from_draft(
            NewMedication::new("Paracetamol 1g"),
            "m1".into(),
            Utc::now(),
        );
        assert!(med.matches("para"));
        assert!(med.matches("cetamol"));
        assert!(med.matches("1g"));
        assert!(!med.matches("ibup"));
    }
}
