//! Leftover statistics over a time window.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use super::window::{TimeRange, Window};
use crate::models::LeftoverPreparation;

/// Families kept in the distribution projection.
pub const TOP_FAMILIES: usize = 10;

/// Status counters over a set of leftovers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub used: usize,
    pub resolved: usize,
    /// Open and past expiry
    pub expired: usize,
    /// Open and not yet expired
    pub pending: usize,
}

impl StatusCounts {
    /// Alias of `used` for the headline figure.
    pub fn utilized(&self) -> usize {
        self.used
    }

    /// Percentage of `count` over `total`, one decimal, 0 for an empty set.
    pub fn share(&self, count: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        round1(count as f64 / self.total as f64 * 100.0)
    }

    /// Utilization rate in percent.
    pub fn utilization_rate(&self) -> f64 {
        self.share(self.utilized())
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Records created on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendBucket {
    pub date: NaiveDate,
    pub total: usize,
    pub used: usize,
    pub resolved: usize,
}

/// Records of one drug family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyBucket {
    pub name: String,
    pub total: usize,
    pub used: usize,
}

/// One non-empty slice of the status overview chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewSlice {
    pub label: String,
    pub value: usize,
}

/// A record inside the window with its creation time in local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludedRecord {
    #[serde(flatten)]
    pub record: LeftoverPreparation,
    pub created_local: NaiveDateTime,
}

/// Everything the dashboard and exports need for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub range: TimeRange,
    pub window: Window,
    pub generated_at: NaiveDateTime,
    pub counts: StatusCounts,
    pub trend: Vec<TrendBucket>,
    pub distribution: Vec<FamilyBucket>,
    pub records: Vec<IncludedRecord>,
}

impl StatisticsReport {
    /// Build the report for `range` as seen at `now`; `now`'s time zone is
    /// used for windows, days and expiry.
    pub fn build<Tz: TimeZone>(
        records: &[LeftoverPreparation],
        range: &TimeRange,
        now: &DateTime<Tz>,
    ) -> Self {
        let local_now = now.naive_local();
        let window = range.resolve(local_now);
        let today = local_now.date();
        let tz = now.timezone();

        let included: Vec<IncludedRecord> = records
            .iter()
            .map(|r| IncludedRecord {
                record: r.clone(),
                created_local: r.created_at.with_timezone(&tz).naive_local(),
            })
            .filter(|r| window.contains(r.created_local))
            .collect();

        Self {
            range: range.clone(),
            window,
            generated_at: local_now,
            counts: count_statuses(included.iter().map(|r| &r.record), today),
            trend: daily_trend(&included),
            distribution: family_distribution(included.iter().map(|r| &r.record)),
            records: included,
        }
    }

    /// Overview chart slices, empty ones dropped.
    pub fn overview(&self) -> Vec<OverviewSlice> {
        [
            ("Utilized", self.counts.utilized()),
            ("Resolved", self.counts.resolved),
            ("Pending", self.counts.pending),
            ("Expired", self.counts.expired),
        ]
        .into_iter()
        .filter(|(_, value)| *value > 0)
        .map(|(label, value)| OverviewSlice {
            label: label.to_string(),
            value,
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.total == 0
    }
}

/// Count statuses; expiry is compared by date against `today`.
pub fn count_statuses<'a>(
    records: impl IntoIterator<Item = &'a LeftoverPreparation>,
    today: NaiveDate,
) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for r in records {
        counts.total += 1;
        if r.used {
            counts.used += 1;
        }
        if r.resolved {
            counts.resolved += 1;
        }
        if r.is_open() {
            if r.expiry_date < today {
                counts.expired += 1;
            } else {
                counts.pending += 1;
            }
        }
    }
    counts
}

/// One bucket per creation day, ascending.
pub fn daily_trend(records: &[IncludedRecord]) -> Vec<TrendBucket> {
    let mut days: BTreeMap<NaiveDate, TrendBucket> = BTreeMap::new();
    for r in records {
        let date = r.created_local.date();
        let bucket = days.entry(date).or_insert_with(|| TrendBucket {
            date,
            total: 0,
            used: 0,
            resolved: 0,
        });
        bucket.total += 1;
        if r.record.used {
            bucket.used += 1;
        }
        if r.record.resolved {
            bucket.resolved += 1;
        }
    }
    days.into_values().collect()
}

/// Per drug family totals, largest first, at most [`TOP_FAMILIES`].
/// Families with equal totals keep first-appearance order.
pub fn family_distribution<'a>(
    records: impl IntoIterator<Item = &'a LeftoverPreparation>,
) -> Vec<FamilyBucket> {
    let mut buckets: Vec<FamilyBucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for r in records {
        let family = r.drug_family();
        let slot = *index.entry(family.to_string()).or_insert_with(|| {
            buckets.push(FamilyBucket {
                name: family.to_string(),
                total: 0,
                used: 0,
            });
            buckets.len() - 1
        });
        buckets[slot].total += 1;
        if r.used {
            buckets[slot].used += 1;
        }
    }

    buckets.sort_by(|a, b| b.total.cmp(&a.total));
    buckets.truncate(TOP_FAMILIES);
    buckets
}
