//! FRED data fetcher
//!
//! US 10-Year Treasury constant maturity yield (series `DGS10`) from the
//! St. Louis Fed. Holidays come back as `"."` and are skipped.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::core::{DateRange, RateError, RatePoint, RateResult};

use super::provider::{finish_series, get_text, http_client, parse_value};

const SOURCE_ID: &str = "FRED";
const SERIES_ID: &str = "DGS10";

/// FRED API client
pub struct FredClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl FredClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> RateResult<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: "https://api.stlouisfed.org/fred".to_string(),
            api_key: api_key.into(),
        })
    }

    /// Point at a different host (mirrors, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Daily DGS10 observations in `range`
    pub fn fetch_range(&self, range: DateRange) -> RateResult<Vec<RatePoint>> {
        if self.api_key.is_empty() {
            return Err(RateError::config("FRED_API_KEY is not set"));
        }

        let url = format!("{}/series/observations", self.base_url);
        let query = [
            ("series_id", SERIES_ID.to_string()),
            ("api_key", self.api_key.clone()),
            ("file_type", "json".to_string()),
            ("observation_start", range.start.format("%Y-%m-%d").to_string()),
            ("observation_end", range.end.format("%Y-%m-%d").to_string()),
        ];

        let body = get_text(&self.client, SOURCE_ID, &url, &query)?;
        let points = parse_observations(&body)?;

        tracing::info!(
            "Fetched {} {} observations ({} to {})",
            points.len(),
            SERIES_ID,
            range.start,
            range.end
        );
        Ok(points)
    }
}

/// Decode a FRED `series/observations` body
pub fn parse_observations(body: &str) -> RateResult<Vec<RatePoint>> {
    let response: FredObservationsResponse = serde_json::from_str(body)
        .map_err(|e| RateError::format(SOURCE_ID, format!("Failed to parse observations: {}", e)))?;

    let mut points = Vec::with_capacity(response.observations.len());
    for obs in response.observations {
        let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
            .map_err(|_| RateError::format(SOURCE_ID, format!("bad date {:?}", obs.date)))?;
        if let Some(value) = parse_value(SOURCE_ID, &obs.value)? {
            points.push(RatePoint { date, value });
        }
    }

    finish_series(SOURCE_ID, points)
}

// FRED API response structures

#[derive(Debug, Deserialize)]
struct FredObservationsResponse {
    observations: Vec<FredObservation>,
}

#[derive(Debug, Deserialize)]
struct FredObservation {
    date: String,
    value: String,
}
