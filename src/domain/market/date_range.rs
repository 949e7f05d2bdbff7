use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open calendar range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Range covering both `first` and `last`.
    pub fn inclusive(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: first,
            end: last + Duration::days(1),
        }
    }

    /// `[year-01-01, (year + years)-01-01)`, or `None` if either year is out of range.
    pub fn years(year: i32, years: i32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let end = NaiveDate::from_ymd_opt(year.checked_add(years)?, 1, 1)?;
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
