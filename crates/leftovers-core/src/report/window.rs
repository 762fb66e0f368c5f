//! Reporting time windows.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Period selector for the statistics dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    /// Current calendar week, Monday through Sunday
    Week,
    /// Current calendar month
    Month,
    /// Trailing three months ending now (not quarter-aligned)
    Quarter,
    /// Current calendar year
    Year,
    /// Caller-supplied days, both bounds at 00:00; a missing start means
    /// 30 days ago, a missing end means now
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

/// Inclusive window in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

/// Last millisecond of the day.
fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
}

impl TimeRange {
    /// Resolve to concrete bounds relative to `now` (local wall-clock time).
    pub fn resolve(&self, now: NaiveDateTime) -> Window {
        let today = now.date();

        match self {
            TimeRange::Week => {
                let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                Window {
                    start: start_of_day(monday),
                    end: end_of_day(monday + Duration::days(6)),
                }
            }
            TimeRange::Month => {
                let first = today - Duration::days(today.day0() as i64);
                Window {
                    start: start_of_day(first),
                    end: end_of_day(first + Months::new(1) - Duration::days(1)),
                }
            }
            TimeRange::Quarter => Window {
                start: now - Months::new(3),
                end: now,
            },
            TimeRange::Year => {
                let first = today - Duration::days(today.ordinal0() as i64);
                Window {
                    start: start_of_day(first),
                    end: end_of_day(first + Months::new(12) - Duration::days(1)),
                }
            }
            TimeRange::Custom { start, end } => Window {
                start: start
                    .map(start_of_day)
                    .unwrap_or_else(|| now - Duration::days(30)),
                end: end.map(start_of_day).unwrap_or(now),
            },
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::Week => write!(f, "week"),
            TimeRange::Month => write!(f, "month"),
            TimeRange::Quarter => write!(f, "quarter"),
            TimeRange::Year => write!(f, "year"),
            TimeRange::Custom { .. } => write!(f, "custom"),
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    /// Parses the selector name; `custom` starts with no bounds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            "quarter" => Ok(TimeRange::Quarter),
            "year" => Ok(TimeRange::Year),
            "custom" => Ok(TimeRange::Custom {
                start: None,
                end: None,
            }),
            other => Err(format!("unknown time range: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn last_ms(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap()
    }

    #[test]
    fn test_week_starts_monday() {
        // Thursday 2024-03-14
        let window = TimeRange::Week.resolve(at(2024, 3, 14, 15, 30));
        assert_eq!(window.start, at(2024, 3, 11, 0, 0));
        assert_eq!(window.end, last_ms(2024, 3, 17));
    }

    #[test]
    fn test_week_on_sunday_belongs_to_previous_monday() {
        let window = TimeRange::Week.resolve(at(2024, 3, 17, 9, 0));
        assert_eq!(window.start, at(2024, 3, 11, 0, 0));
    }

    #[test]
    fn test_month_handles_leap_february() {
        let window = TimeRange::Month.resolve(at(2024, 2, 10, 8, 0));
        assert_eq!(window.start, at(2024, 2, 1, 0, 0));
        assert_eq!(window.end, last_ms(2024, 2, 29));
    }

    #[test]
    fn test_quarter_is_trailing_three_months() {
        let now = at(2024, 5, 31, 12, 0);
        let window = TimeRange::Quarter.resolve(now);
        // Feb has no 31st; clamps to the end of the month
        assert_eq!(window.start, at(2024, 2, 29, 12, 0));
        assert_eq!(window.end, now);
    }

    #[test]
    fn test_year() {
        let window = TimeRange::Year.resolve(at(2023, 7, 4, 0, 0));
        assert_eq!(window.start, at(2023, 1, 1, 0, 0));
        assert_eq!(window.end, last_ms(2023, 12, 31));
    }

    #[test]
    fn test_custom_defaults_to_trailing_thirty_days() {
        let now = at(2024, 3, 31, 10, 0);
        let window = TimeRange::Custom {
            start: None,
            end: None,
        }
        .resolve(now);
        assert_eq!(window.start, at(2024, 3, 1, 10, 0));
        assert_eq!(window.end, now);
    }

    #[test]
    fn test_custom_end_stops_at_midnight_of_end_day() {
        let window = TimeRange::Custom {
            start: NaiveDate::from_ymd_opt(2024, 1, 5),
            end: NaiveDate::from_ymd_opt(2024, 1, 6),
        }
        .resolve(at(2024, 3, 31, 10, 0));
        assert_eq!(window.end, at(2024, 1, 6, 0, 0));
        assert!(window.contains(at(2024, 1, 5, 0, 0)));
        assert!(window.contains(at(2024, 1, 5, 23, 59)));
        assert!(window.contains(at(2024, 1, 6, 0, 0)));
        assert!(!window.contains(at(2024, 1, 6, 10, 0)));
    }

    #[test]
    fn test_parse_round_trip() {
        for name in ["week", "month", "quarter", "year", "custom"] {
            let range: TimeRange = name.parse().unwrap();
            assert_eq!(range.to_string(), name);
        }
        assert!("fortnight".parse::<TimeRange>().is_err());
    }
}
