//! JSON payloads consumed by the chart and summary layers
//!
//! Field names are part of the external contract. Missing values serialize
//! as `null` and are shown as `--` by [`display`], never as zero.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::spread::{round_to, spread_bp};
use crate::analytics::DurationResult;
use crate::core::{AlignedRow, CorrelationWindow, RateError, SpreadPoint};

/// Text shown in place of a missing value
pub const MISSING: &str = "--";

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// `{status, timestamp, data?, error?}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: Status,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            timestamp: Utc::now(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(err: &RateError) -> Self {
        Self {
            status: Status::Error,
            timestamp: Utc::now(),
            data: None,
            error: Some(err.message()),
        }
    }

    /// Wrap a service result
    pub fn from_result(result: Result<T, RateError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => {
                tracing::error!("Request failed: {}", e);
                Self::error(&e)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// One chart row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRow {
    pub date: NaiveDate,
    pub us_rate: Option<f64>,
    pub kr_rate: Option<f64>,
    pub spread: Option<f64>,
}

impl From<&AlignedRow> for RateRow {
    fn from(row: &AlignedRow) -> Self {
        Self {
            date: row.date,
            us_rate: row.us_value.map(|v| round_to(v, 3)),
            kr_rate: row.kr_value.map(|v| round_to(v, 3)),
            spread: spread_bp(row),
        }
    }
}

/// `rates(days)` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatesPayload {
    pub rates: Vec<RateRow>,
    /// Latest non-null spread
    pub spread: Option<SpreadPoint>,
    pub count: usize,
    pub period_days: u32,
    /// One of the two sources returned nothing; its column is all `null`
    pub insufficient_data: bool,
}

/// `correlation(days, window)` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPayload {
    pub correlations: Vec<CorrelationWindow>,
    pub overall_correlation: Option<f64>,
    pub period_days: u32,
    pub window_days: u32,
    pub step_days: u32,
    pub insufficient_data: bool,
}

/// Most recent complete quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestRates {
    pub date: NaiveDate,
    pub us_rate: f64,
    pub kr_rate: f64,
    /// KR minus US, bp
    pub spread: f64,
}

/// Bounded numeric context for a downstream summarizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub data_date: NaiveDate,
    pub period_days: u32,
    pub latest: LatestRates,
    /// Change from the first complete row in the window, bp
    pub us_change_bp: Option<f64>,
    pub kr_change_bp: Option<f64>,
    pub spread_change_bp: Option<f64>,
    pub spread_min_bp: Option<f64>,
    pub spread_max_bp: Option<f64>,
    pub overall_correlation: Option<f64>,
    /// Most recent rows, at most the configured point limit
    pub rows: Vec<RateRow>,
}

/// Duration series for one rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationPayload {
    pub series: Vec<Option<f64>>,
    pub summary: Option<f64>,
}

impl From<DurationResult> for DurationPayload {
    fn from(result: DurationResult) -> Self {
        Self {
            series: result.series,
            summary: result.summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationPair {
    pub us10y: DurationPayload,
    pub kr10y: DurationPayload,
}

/// Insurer equity duration analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsurerAnalysis {
    pub company: String,
    pub quarters: Vec<NaiveDate>,
    /// 억원
    pub equity_level: Vec<Option<f64>>,
    pub asset_level: Vec<Option<f64>>,
    pub liability_level: Vec<Option<f64>>,
    /// Percent
    pub us10y_level: Vec<Option<f64>>,
    pub kr10y_level: Vec<Option<f64>>,
    pub equity_qoq: Vec<Option<f64>>,
    /// Decimal (0.0001 = 1bp)
    pub us10y_change: Vec<Option<f64>>,
    pub kr10y_change: Vec<Option<f64>>,
    pub duration: DurationPair,
    pub analysis_count: usize,
}

/// `{id, name}` entry for the company picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub id: String,
    pub name: String,
}

/// Format an optional value for display
pub fn display(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => MISSING.to_string(),
    }
}
