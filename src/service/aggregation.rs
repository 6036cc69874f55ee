//! AggregationService - fetch, align, derive, cache
//!
//! Every call computes a cache key from its (clamped) parameters and serves
//! the cached JSON when fresh. On a miss it fetches both upstream series in
//! parallel, aligns them and builds the payload.
//!
//! Failure policy:
//! - `UpstreamUnavailable`: serve the expired payload if it is still within
//!   the stale grace period, otherwise propagate
//! - `UpstreamFormat`: propagate, never retried or papered over
//! - one empty source: payload with that column all `null` and
//!   `insufficient_data: true`, not cached
//! - both empty: `NoData`

use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::{align_in_range, correlation, merge_with_gaps, spread};
use crate::config::MonitorConfig;
use crate::core::{
    AlignedRow, AlignedSeries, DateRange, RateError, RatePoint, RateResult, RateSource,
};
use crate::data::{PayloadCache, RateProvider};

use super::payload::{
    AnalysisContext, CorrelationPayload, LatestRates, RateRow, RatesPayload,
};

/// Main entry point for rate payloads
pub struct AggregationService {
    provider: Arc<dyn RateProvider>,
    cache: Arc<PayloadCache>,
    config: MonitorConfig,
}

impl AggregationService {
    pub fn new(provider: Arc<dyn RateProvider>, cache: Arc<PayloadCache>, config: MonitorConfig) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<PayloadCache> {
        &self.cache
    }

    pub fn rates_key(days: u32) -> String {
        format!("rates:{}d", days)
    }

    pub fn correlation_key(days: u32, window_days: u32) -> String {
        format!("correlation:{}d:{}w", days, window_days)
    }

    /// Serialized `rates(days)` payload, exactly as cached
    pub fn rates_json(&self, days: u32) -> RateResult<String> {
        let days = self.config.rates.clamp_days(days);
        self.cached(
            &Self::rates_key(days),
            self.config.cache.rates_ttl_secs,
            || self.build_rates(days),
        )
    }

    /// Aligned rates with the latest spread
    pub fn get_rates(&self, days: u32) -> RateResult<RatesPayload> {
        Ok(serde_json::from_str(&self.rates_json(days)?)?)
    }

    /// Serialized `correlation(days, window)` payload, exactly as cached
    pub fn correlation_json(&self, days: u32, window_days: u32) -> RateResult<String> {
        let days = self.config.rates.clamp_days(days);
        let window_days = self.config.correlation.clamp_window(window_days, days);
        self.cached(
            &Self::correlation_key(days, window_days),
            self.config.cache.correlation_ttl_secs,
            || self.build_correlation(days, window_days),
        )
    }

    /// Rolling and overall correlation
    pub fn get_correlation(&self, days: u32, window_days: u32) -> RateResult<CorrelationPayload> {
        Ok(serde_json::from_str(&self.correlation_json(days, window_days)?)?)
    }

    /// Most recent date on which both rates are known
    pub fn get_latest(&self) -> RateResult<LatestRates> {
        let payload = self.get_rates(self.config.rates.latest_lookback_days)?;
        latest_complete(&payload.rates)
            .ok_or_else(|| RateError::no_data("No date with both rates in the latest window"))
    }

    /// Bounded numeric summary of the recent window for a summarizer
    pub fn get_analysis_context(&self) -> RateResult<AnalysisContext> {
        let days = self.config.rates.context_days;
        let payload = self.get_rates(days)?;
        let latest = latest_complete(&payload.rates)
            .ok_or_else(|| RateError::insufficient_data("Insufficient rate data for analysis"))?;

        let first = payload
            .rates
            .iter()
            .find(|r| r.us_rate.is_some() && r.kr_rate.is_some());
        let change_bp = |from: Option<f64>, to: f64| from.map(|from| spread::round_to((to - from) * 100.0, 1));

        let spreads: Vec<f64> = payload.rates.iter().filter_map(|r| r.spread).collect();
        let spread_min_bp = spreads.iter().copied().reduce(f64::min);
        let spread_max_bp = spreads.iter().copied().reduce(f64::max);
        let spread_change_bp = first
            .and_then(|r| r.spread)
            .map(|from| spread::round_to(latest.spread - from, 1));

        let aligned: Vec<AlignedRow> = payload
            .rates
            .iter()
            .map(|r| AlignedRow {
                date: r.date,
                us_value: r.us_rate,
                kr_value: r.kr_rate,
            })
            .collect();

        let max_points = self.config.rates.context_max_points;
        let skip = payload.rates.len().saturating_sub(max_points);

        Ok(AnalysisContext {
            data_date: latest.date,
            period_days: payload.period_days,
            us_change_bp: change_bp(first.and_then(|r| r.us_rate), latest.us_rate),
            kr_change_bp: change_bp(first.and_then(|r| r.kr_rate), latest.kr_rate),
            spread_change_bp,
            spread_min_bp,
            spread_max_bp,
            overall_correlation: correlation::pearson(&aligned),
            rows: payload.rates[skip..].to_vec(),
            latest,
        })
    }

    /// Drop every cached payload
    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("Rate caches cleared");
    }

    fn today(&self) -> NaiveDate {
        self.cache.now().date_naive()
    }

    fn build_rates(&self, days: u32) -> RateResult<(RatesPayload, bool)> {
        let (aligned, insufficient) = self.fetch_aligned(days)?;
        let rates: Vec<RateRow> = aligned.rows().iter().map(RateRow::from).collect();

        let payload = RatesPayload {
            count: rates.len(),
            spread: spread::latest(&aligned),
            rates,
            period_days: days,
            insufficient_data: insufficient,
        };
        Ok((payload, !insufficient))
    }

    fn build_correlation(&self, days: u32, window_days: u32) -> RateResult<(CorrelationPayload, bool)> {
        let (aligned, insufficient) = self.fetch_aligned(days)?;
        let step_days = self.config.correlation.step_for(window_days);

        let payload = CorrelationPayload {
            correlations: correlation::compute(&aligned, window_days, step_days)?,
            overall_correlation: correlation::overall(&aligned),
            period_days: days,
            window_days,
            step_days,
            insufficient_data: insufficient,
        };
        Ok((payload, !insufficient))
    }

    /// Fetch both sources and align them over the last `days` days.
    ///
    /// The flag is set when one side came back empty.
    fn fetch_aligned(&self, days: u32) -> RateResult<(AlignedSeries, bool)> {
        let (us, kr) = self.fetch_pair(days);
        let (us, kr) = (us?, kr?);
        let range = DateRange::lookback(self.today(), days);

        let (aligned, insufficient) = match align_in_range(&us, &kr, Some(range)) {
            Ok(aligned) => (aligned, false),
            Err(RateError::InsufficientData(msg)) => {
                if us.is_empty() && kr.is_empty() {
                    tracing::warn!("No rate data for {}d: {}", days, msg);
                    return Err(RateError::no_data("No rate data available"));
                }
                tracing::warn!("Partial rate data for {}d: {}", days, msg);
                (merge_with_gaps(&us, &kr, Some(range))?, true)
            }
            Err(e) => return Err(e),
        };

        if aligned.is_empty() {
            return Err(RateError::no_data(format!(
                "No rate data available between {} and {}",
                range.start, range.end
            )));
        }

        tracing::info!(
            "Aligned {} rows for {}d (us {}, kr {})",
            aligned.len(),
            days,
            us.len(),
            kr.len()
        );
        Ok((aligned, insufficient))
    }

    /// US and KR fetched concurrently; order between them is irrelevant
    fn fetch_pair(&self, days: u32) -> (RateResult<Vec<RatePoint>>, RateResult<Vec<RatePoint>>) {
        let provider = &self.provider;
        thread::scope(|s| {
            let kr = s.spawn(|| provider.fetch_series(RateSource::Kr10y, days));
            let us = provider.fetch_series(RateSource::Us10y, days);
            let kr = kr.join().unwrap_or_else(|_| {
                Err(RateError::unavailable(RateSource::Kr10y.id(), "fetch thread panicked"))
            });
            (us, kr)
        })
    }

    /// Serve `key` from cache or build, store and serve it
    fn cached<T: Serialize>(
        &self,
        key: &str,
        ttl_seconds: u64,
        build: impl FnOnce() -> RateResult<(T, bool)>,
    ) -> RateResult<String> {
        if let Some(json) = self.cache.get(key) {
            return Ok(json);
        }

        match build() {
            Ok((payload, true)) => self.cache.set_json(key, &payload, ttl_seconds),
            Ok((payload, false)) => Ok(serde_json::to_string(&payload)?),
            Err(e @ RateError::UpstreamUnavailable { .. }) => match self.cache.get_stale(key) {
                Some(stale) => {
                    tracing::warn!("Serving stale {} while upstream is down: {}", key, e);
                    Ok(stale)
                }
                None => Err(e),
            },
            Err(e @ RateError::UpstreamFormat { .. }) => {
                tracing::error!("Malformed upstream data for {}: {}", key, e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

fn latest_complete(rows: &[RateRow]) -> Option<LatestRates> {
    rows.iter().rev().find_map(|r| {
        Some(LatestRates {
            date: r.date,
            us_rate: r.us_rate?,
            kr_rate: r.kr_rate?,
            spread: r.spread?,
        })
    })
}
