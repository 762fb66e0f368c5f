//! Example leftovers for a fresh demo store.

use chrono::{DateTime, Days, Utc};

use crate::models::{LeftoverPreparation, NewLeftoverPreparation, Record};

/// Three open leftovers: one expiring in two days, one expired yesterday,
/// one expiring in five days.
pub fn demo_leftovers(now: DateTime<Utc>) -> Vec<LeftoverPreparation> {
    let today = now.date_naive();
    let samples = [
        ("Paclitaxel 175mg/m²", "300mg in 500ml NS", today.checked_add_days(Days::new(2))),
        ("Cisplatin 75mg/m²", "150mg in 1000ml NS", today.checked_sub_days(Days::new(1))),
        ("Doxorubicin 60mg/m²", "120mg in 250ml D5W", today.checked_add_days(Days::new(5))),
    ];

    samples
        .into_iter()
        .map(|(name, dose, expiry)| {
            LeftoverPreparation::from_draft(
                NewLeftoverPreparation::new(name.into(), dose.into(), expiry.unwrap_or(today)),
                uuid::Uuid::new_v4().to_string(),
                now,
            )
        })
        .collect()
}
