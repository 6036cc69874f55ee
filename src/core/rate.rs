//! Raw rate observations
//!
//! A `RatePoint` is one daily close of a 10-year government bond yield, in
//! percent, as published by a single upstream source.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{RateError, RateResult};

/// Which yield curve a series comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// US Treasury 10Y constant maturity
    Us10y,
    /// Korea Treasury Bond 10Y
    Kr10y,
}

impl RateSource {
    /// Stable identifier used in logs and cache keys
    pub fn id(&self) -> &'static str {
        match self {
            RateSource::Us10y => "us10y",
            RateSource::Kr10y => "kr10y",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            RateSource::Us10y => "US 10Y",
            RateSource::Kr10y => "KR 10Y",
        }
    }
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Single dated yield observation (value in percent, e.g. 4.25)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl RatePoint {
    /// Create a point, rejecting NaN and infinities
    pub fn new(date: NaiveDate, value: f64) -> RateResult<Self> {
        if !value.is_finite() {
            return Err(RateError::invalid_input(format!(
                "non-finite rate {} on {}",
                value, date
            )));
        }
        Ok(Self { date, value })
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> RateResult<Self> {
        if start > end {
            return Err(RateError::invalid_input(format!(
                "range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` calendar days ending at (and including) `end`.
    ///
    /// Saturates at the earliest representable date.
    pub fn lookback(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start: end
                .checked_sub_signed(Duration::days(span))
                .unwrap_or(NaiveDate::MIN),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered, inclusive
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_rate_point_rejects_non_finite() {
        assert!(RatePoint::new(d(2024, 1, 2), f64::NAN).is_err());
        assert!(RatePoint::new(d(2024, 1, 2), f64::INFINITY).is_err());
        assert!(RatePoint::new(d(2024, 1, 2), 4.25).is_ok());
    }

    #[test]
    fn test_lookback_range() {
        let range = DateRange::lookback(d(2024, 3, 31), 90);
        assert_eq!(range.num_days(), 90);
        assert_eq!(range.start, d(2024, 1, 2));
        assert!(range.contains(d(2024, 3, 31)));
        assert!(!range.contains(d(2024, 1, 1)));

        assert_eq!(DateRange::lookback(d(2024, 3, 31), 1).num_days(), 1);
    }

    #[test]
    fn test_lookback_saturates() {
        let range = DateRange::lookback(d(2024, 3, 31), u32::MAX);
        assert_eq!(range.start, NaiveDate::MIN);
        assert!(range.contains(d(1900, 1, 1)));
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(DateRange::new(d(2024, 2, 1), d(2024, 1, 1)).is_err());
    }
}
