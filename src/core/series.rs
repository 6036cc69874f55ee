//! Derived series types
//!
//! Aligned US/KR rows and the metrics computed from them. Missing values are
//! `Option::None` end to end; nothing here ever substitutes zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One date on the common axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub date: NaiveDate,
    /// US 10Y in percent, `None` if no observation exists yet
    pub us_value: Option<f64>,
    /// KR 10Y in percent, `None` if no observation exists yet
    pub kr_value: Option<f64>,
}

impl AlignedRow {
    /// Both sides present
    pub fn pair(&self) -> Option<(f64, f64)> {
        match (self.us_value, self.kr_value) {
            (Some(us), Some(kr)) => Some((us, kr)),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pair().is_some()
    }
}

/// US/KR rows on a shared, strictly increasing date axis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    rows: Vec<AlignedRow>,
}

impl AlignedSeries {
    /// Build from rows already sorted with unique dates.
    ///
    /// Only the aligner constructs these from raw observations, so ordering
    /// is checked in debug builds only.
    pub(crate) fn from_sorted_rows(rows: Vec<AlignedRow>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
        Self { rows }
    }

    pub fn rows(&self) -> &[AlignedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Most recent row where both rates are known
    pub fn latest_complete(&self) -> Option<&AlignedRow> {
        self.rows.iter().rev().find(|r| r.is_complete())
    }

    /// Rows whose date falls in `[start, end]`
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> &[AlignedRow] {
        let lo = self.rows.partition_point(|r| r.date < start);
        let hi = self.rows.partition_point(|r| r.date <= end);
        if lo >= hi {
            &[]
        } else {
            &self.rows[lo..hi]
        }
    }

    /// Last `n` rows, as an owned series
    pub fn tail(&self, n: usize) -> Self {
        let skip = self.rows.len().saturating_sub(n);
        Self {
            rows: self.rows[skip..].to_vec(),
        }
    }
}

/// Point-wise KR minus US spread in basis points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    pub date: NaiveDate,
    pub spread_bp: Option<f64>,
}

/// Pearson correlation over one rolling window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationWindow {
    pub period_label: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// `None` when fewer than two complete rows fall in the window
    pub correlation: Option<f64>,
}
