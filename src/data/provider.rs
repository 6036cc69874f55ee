//! Upstream rate provider abstraction
//!
//! The aggregation layer only sees [`RateProvider`]. Concrete adapters map
//! transport failures to `UpstreamUnavailable` and undecodable bodies to
//! `UpstreamFormat`, and must enforce a request timeout.

use std::time::Duration;

use chrono::{NaiveDate, Utc};

use crate::core::{DateRange, RateError, RateResult, RatePoint, RateSource};

use super::ecos::EcosClient;
use super::fred::FredClient;

/// Fetches a daily yield series for one source
pub trait RateProvider: Send + Sync {
    /// Observations over the last `lookback_days` calendar days, ascending
    fn fetch_series(&self, source: RateSource, lookback_days: u32) -> RateResult<Vec<RatePoint>>;

    /// Observations inside an explicit date range, ascending
    fn fetch_range(&self, source: RateSource, range: DateRange) -> RateResult<Vec<RatePoint>>;
}

/// Routes US requests to FRED and KR requests to ECOS
pub struct MarketDataClient {
    fred: FredClient,
    ecos: EcosClient,
}

impl MarketDataClient {
    pub fn new(fred: FredClient, ecos: EcosClient) -> Self {
        Self { fred, ecos }
    }

    /// Both clients from one config
    pub fn from_config(config: &crate::config::ProviderConfig) -> RateResult<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        Ok(Self {
            fred: FredClient::new(config.fred_api_key.clone(), timeout)?,
            ecos: EcosClient::new(config.ecos_api_key.clone(), timeout)?,
        })
    }
}

impl RateProvider for MarketDataClient {
    fn fetch_series(&self, source: RateSource, lookback_days: u32) -> RateResult<Vec<RatePoint>> {
        self.fetch_range(source, DateRange::lookback(today(), lookback_days))
    }

    fn fetch_range(&self, source: RateSource, range: DateRange) -> RateResult<Vec<RatePoint>> {
        match source {
            RateSource::Us10y => self.fred.fetch_range(range),
            RateSource::Kr10y => self.ecos.fetch_range(range),
        }
    }
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Blocking client with the given timeout
pub(crate) fn http_client(timeout: Duration) -> RateResult<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("rate-monitor/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| RateError::config(format!("Failed to create HTTP client: {}", e)))
}

/// GET `url` and return the body, classifying transport and status errors
pub(crate) fn get_text(
    client: &reqwest::blocking::Client,
    source_id: &str,
    url: &str,
    query: &[(&str, String)],
) -> RateResult<String> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .map_err(|e| RateError::unavailable(source_id, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RateError::unavailable(
            source_id,
            format!("HTTP {}", status),
        ));
    }

    response
        .text()
        .map_err(|e| RateError::unavailable(source_id, format!("Failed to read body: {}", e)))
}

/// Parse a decimal string; returns `Ok(None)` for the upstream "no value" markers
pub(crate) fn parse_value(source_id: &str, raw: &str) -> RateResult<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == "-" {
        return Ok(None);
    }
    let value: f64 = trimmed
        .replace(',', "")
        .parse()
        .map_err(|_| RateError::format(source_id, format!("unparsable value {:?}", raw)))?;
    if !value.is_finite() {
        return Err(RateError::format(source_id, format!("non-finite value {:?}", raw)));
    }
    Ok(Some(value))
}

/// Sort ascending and reject repeated dates
pub(crate) fn finish_series(source_id: &str, mut points: Vec<RatePoint>) -> RateResult<Vec<RatePoint>> {
    points.sort_by_key(|p| p.date);
    if let Some(w) = points.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(RateError::format(
            source_id,
            format!("duplicate observation for {}", w[0].date),
        ));
    }
    Ok(points)
}
