//! Insurer equity duration analysis
//!
//! Joins quarterly DART balance sheets with the US and KR 10Y yields at
//! each quarter end and reports the equity duration to each rate.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use chrono::{Duration, NaiveDate};

use crate::analytics::duration::{equity_qoq, rate_changes, to_eok};
use crate::analytics::spread::round_to;
use crate::analytics::{calculate_duration, EquityObservation};
use crate::config::MonitorConfig;
use crate::core::{DateRange, RateError, RatePoint, RateResult, RateSource};
use crate::data::{find_company, Company, EquityProvider, PayloadCache, RateProvider, COMPANIES};

use super::payload::{CompanyInfo, DurationPair, InsurerAnalysis};

pub struct InsurerAnalysisService {
    equity: Arc<dyn EquityProvider>,
    rates: Arc<dyn RateProvider>,
    cache: Arc<PayloadCache>,
    config: MonitorConfig,
}

impl InsurerAnalysisService {
    pub fn new(
        equity: Arc<dyn EquityProvider>,
        rates: Arc<dyn RateProvider>,
        cache: Arc<PayloadCache>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            equity,
            rates,
            cache,
            config,
        }
    }

    /// Companies available for analysis
    pub fn company_list() -> Vec<CompanyInfo> {
        COMPANIES
            .iter()
            .map(|c| CompanyInfo {
                id: c.id.to_string(),
                name: c.name.to_string(),
            })
            .collect()
    }

    /// Serialized analysis, served from cache when fresh
    pub fn analysis_json(&self, company_id: &str, year_count: u32) -> RateResult<String> {
        let company = find_company(company_id).ok_or_else(|| {
            let ids: Vec<&str> = COMPANIES.iter().map(|c| c.id).collect();
            RateError::invalid_input(format!(
                "Invalid company_id. Must be one of: {}",
                ids.join(", ")
            ))
        })?;
        let year_count = year_count.clamp(1, self.config.insurer.max_year_count);
        let key = format!("insurer:{}:{}y", company.id, year_count);

        if let Some(json) = self.cache.get(&key) {
            return Ok(json);
        }

        let analysis = self.build(company, year_count)?;
        self.cache
            .set_json(&key, &analysis, self.config.cache.insurer_ttl_secs)
    }

    pub fn analyze(&self, company_id: &str, year_count: u32) -> RateResult<InsurerAnalysis> {
        Ok(serde_json::from_str(&self.analysis_json(company_id, year_count)?)?)
    }

    fn build(&self, company: &Company, year_count: u32) -> RateResult<InsurerAnalysis> {
        let today = self.cache.now().date_naive();
        tracing::info!("Fetching equity data for {}, {} years", company.id, year_count);

        let equity = self.equity.fetch_equity(company, year_count, today)?;
        if equity.len() < 2 {
            return Err(RateError::insufficient_data(format!(
                "Insufficient equity data for {} (minimum 2 quarters required, got {})",
                company.id,
                equity.len()
            )));
        }

        let lookback = Duration::days(i64::from(self.config.insurer.quarter_rate_lookback_days));
        let quarters: Vec<NaiveDate> = equity.iter().map(|e| e.quarter).collect();
        let (us_at, kr_at) = self.quarter_end_rates(&quarters, lookback)?;

        let us_duration = calculate_duration(&equity, &us_at);
        let kr_duration = calculate_duration(&equity, &kr_at);
        let analysis_count = us_duration.valid_count();

        let levels = |map: &BTreeMap<NaiveDate, f64>| -> Vec<Option<f64>> {
            quarters.iter().map(|q| map.get(q).copied()).collect()
        };
        let us10y_level = levels(&us_at);
        let kr10y_level = levels(&kr_at);

        let equity_levels: Vec<Option<i64>> = equity.iter().map(|e| Some(e.equity)).collect();

        Ok(InsurerAnalysis {
            company: company.name.to_string(),
            equity_level: equity.iter().map(|e| to_eok(Some(e.equity))).collect(),
            asset_level: equity.iter().map(|e| to_eok(e.asset)).collect(),
            liability_level: equity.iter().map(|e| to_eok(e.liability)).collect(),
            equity_qoq: round_all(equity_qoq(&equity_levels), 6),
            us10y_change: round_all(rate_changes(&us10y_level), 6),
            kr10y_change: round_all(rate_changes(&kr10y_level), 6),
            us10y_level,
            kr10y_level,
            duration: DurationPair {
                us10y: us_duration.into(),
                kr10y: kr_duration.into(),
            },
            analysis_count,
            quarters,
        })
    }

    /// Last known US and KR rate within `lookback` of each quarter end
    fn quarter_end_rates(
        &self,
        quarters: &[NaiveDate],
        lookback: Duration,
    ) -> RateResult<(BTreeMap<NaiveDate, f64>, BTreeMap<NaiveDate, f64>)> {
        let (first, last) = match (quarters.first(), quarters.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Ok((BTreeMap::new(), BTreeMap::new())),
        };
        let start = first.checked_sub_signed(lookback).unwrap_or(NaiveDate::MIN);
        let range = DateRange::new(start, last)?;

        let rates = &self.rates;
        let (us, kr) = thread::scope(|s| {
            let kr = s.spawn(|| rates.fetch_range(RateSource::Kr10y, range));
            let us = rates.fetch_range(RateSource::Us10y, range);
            let kr = kr.join().unwrap_or_else(|_| {
                Err(RateError::unavailable(RateSource::Kr10y.id(), "fetch thread panicked"))
            });
            (us, kr)
        });
        let (mut us, mut kr): (Vec<RatePoint>, Vec<RatePoint>) = (us?, kr?);
        us.sort_by_key(|p| p.date);
        kr.sort_by_key(|p| p.date);

        let mut us_at = BTreeMap::new();
        let mut kr_at = BTreeMap::new();
        for &quarter in quarters {
            let window_start = quarter.checked_sub_signed(lookback).unwrap_or(NaiveDate::MIN);
            let us_rate = last_within(&us, window_start, quarter);
            let kr_rate = last_within(&kr, window_start, quarter);
            if let Some(v) = us_rate {
                us_at.insert(quarter, v);
            }
            if let Some(v) = kr_rate {
                kr_at.insert(quarter, v);
            }
            if us_rate.is_none() || kr_rate.is_none() {
                tracing::warn!("Missing rate near quarter end {}", quarter);
            }
        }
        Ok((us_at, kr_at))
    }
}

/// Value of the last point dated in `[start, end]`; `points` must be sorted.
///
/// Only quotes inside the window count, nothing is carried in from before it.
fn last_within(points: &[RatePoint], start: NaiveDate, end: NaiveDate) -> Option<f64> {
    let upto = points.partition_point(|p| p.date <= end);
    points[..upto]
        .last()
        .filter(|p| p.date >= start)
        .map(|p| p.value)
}

fn round_all(values: Vec<Option<f64>>, decimals: i32) -> Vec<Option<f64>> {
    values
        .into_iter()
        .map(|v| v.map(|v| round_to(v, decimals)))
        .collect()
}
