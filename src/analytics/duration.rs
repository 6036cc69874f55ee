//! Insurer equity duration against 10Y rates
//!
//! Duration here is the empirical sensitivity of an insurer's book equity to
//! rate moves, measured quarter over quarter:
//!
//! ```text
//! D_t = (E_t / E_{t-1} - 1) / (r_t / 100 - r_{t-1} / 100)
//! ```
//!
//! Quarters with a missing input or an unchanged rate have no duration.
//! Single-quarter values are clipped to ±100 and summarised by their median,
//! which keeps one noisy quarter from dominating.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};

use super::spread::round_to;

/// Clip bound for a single quarter's duration
pub const DURATION_CLIP: f64 = 100.0;

/// KRW per 억원 (hundred million won)
pub const KRW_PER_EOK: f64 = 100_000_000.0;

/// One quarter-end balance sheet snapshot (amounts in KRW)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityObservation {
    pub quarter: NaiveDate,
    pub equity: i64,
    pub asset: Option<i64>,
    pub liability: Option<i64>,
}

/// Per-quarter durations plus their median
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationResult {
    pub series: Vec<Option<f64>>,
    pub summary: Option<f64>,
}

impl DurationResult {
    /// Quarters that produced a usable duration
    pub fn valid_count(&self) -> usize {
        self.series.iter().filter(|d| d.is_some()).count()
    }
}

/// Quarter-over-quarter equity growth; first quarter is always `None`
pub fn equity_qoq(levels: &[Option<i64>]) -> Vec<Option<f64>> {
    changes(levels, |prev, cur| {
        let (prev, cur) = (prev? as f64, cur? as f64);
        (prev != 0.0).then(|| cur / prev - 1.0)
    })
}

/// Quarter-over-quarter rate change in decimal (1bp = 0.0001)
pub fn rate_changes(levels: &[Option<f64>]) -> Vec<Option<f64>> {
    changes(levels, |prev, cur| Some(cur? / 100.0 - prev? / 100.0))
}

fn changes<T: Copy>(levels: &[T], f: impl Fn(T, T) -> Option<f64>) -> Vec<Option<f64>> {
    if levels.is_empty() {
        return Vec::new();
    }
    std::iter::once(None)
        .chain(levels.windows(2).map(|w| f(w[0], w[1])))
        .collect()
}

/// Duration of equity to the rate observed at each quarter end.
///
/// `rates` maps quarter-end dates to the rate level in percent.
pub fn calculate_duration(
    equity: &[EquityObservation],
    rates: &BTreeMap<NaiveDate, f64>,
) -> DurationResult {
    if equity.len() < 2 {
        return DurationResult {
            series: Vec::new(),
            summary: None,
        };
    }

    let equity_levels: Vec<Option<i64>> = equity.iter().map(|e| Some(e.equity)).collect();
    let rate_levels: Vec<Option<f64>> = equity.iter().map(|e| rates.get(&e.quarter).copied()).collect();

    let equity_change = equity_qoq(&equity_levels);
    let rate_change = rate_changes(&rate_levels);

    let mut valid = Vec::new();
    let series: Vec<Option<f64>> = equity_change
        .iter()
        .zip(&rate_change)
        .map(|(eq, rate)| match (eq, rate) {
            (Some(eq), Some(rate)) if *rate != 0.0 => {
                let d = (eq / rate).clamp(-DURATION_CLIP, DURATION_CLIP);
                valid.push(d);
                Some(round_to(d, 2))
            }
            _ => None,
        })
        .collect();

    let summary = if valid.is_empty() {
        None
    } else {
        Some(round_to(Data::new(valid).median(), 2))
    };

    DurationResult { series, summary }
}

/// KRW amount to 억원, one decimal; zero and missing both map to `None`
pub fn to_eok(amount: Option<i64>) -> Option<f64> {
    amount
        .filter(|&a| a != 0)
        .map(|a| round_to(a as f64 / KRW_PER_EOK, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(quarter: NaiveDate, equity: i64) -> EquityObservation {
        EquityObservation {
            quarter,
            equity,
            asset: None,
            liability: None,
        }
    }

    #[test]
    fn test_duration_basic() {
        let quarters = [q(2024, 3, 31), q(2024, 6, 30), q(2024, 9, 30)];
        let equity = vec![
            obs(quarters[0], 1_000_000),
            obs(quarters[1], 1_050_000), // +5%
            obs(quarters[2], 1_050_000), // flat
        ];
        let rates: BTreeMap<_, _> = [(quarters[0], 3.50), (quarters[1], 3.00), (quarters[2], 3.25)]
            .into_iter()
            .collect();

        let result = calculate_duration(&equity, &rates);

        assert_eq!(result.series.len(), 3);
        assert_eq!(result.series[0], None);
        // +5% equity on -50bp: 0.05 / -0.005 = -10
        assert_eq!(result.series[1], Some(-10.0));
        assert_eq!(result.series[2], Some(0.0));
        assert_eq!(result.valid_count(), 2);
        assert_eq!(result.summary, Some(-5.0));
    }

    #[test]
    fn test_duration_clipped_and_unchanged_rate_is_null() {
        let quarters = [q(2023, 12, 31), q(2024, 3, 31), q(2024, 6, 30)];
        let equity = vec![
            obs(quarters[0], 100),
            obs(quarters[1], 200), // +100% on 1bp move
            obs(quarters[2], 300),
        ];
        let rates: BTreeMap<_, _> = [(quarters[0], 3.00), (quarters[1], 3.01), (quarters[2], 3.01)]
            .into_iter()
            .collect();

        let result = calculate_duration(&equity, &rates);
        assert_eq!(result.series[1], Some(100.0));
        assert_eq!(result.series[2], None);
        assert_eq!(result.summary, Some(100.0));
    }

    #[test]
    fn test_missing_rate_quarter_is_null() {
        let quarters = [q(2024, 3, 31), q(2024, 6, 30)];
        let equity = vec![obs(quarters[0], 100), obs(quarters[1], 110)];
        let rates: BTreeMap<_, _> = [(quarters[0], 3.0)].into_iter().collect();

        let result = calculate_duration(&equity, &rates);
        assert_eq!(result.series, vec![None, None]);
        assert_eq!(result.summary, None);
    }

    #[test]
    fn test_too_few_quarters() {
        let result = calculate_duration(&[obs(q(2024, 3, 31), 100)], &BTreeMap::new());
        assert!(result.series.is_empty());
        assert_eq!(result.summary, None);
    }

    #[test]
    fn test_equity_qoq_zero_base() {
        let qoq = equity_qoq(&[Some(0), Some(100), Some(150)]);
        assert_eq!(qoq[0], None);
        assert_eq!(qoq[1], None);
        assert!((qoq[2].unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_to_eok() {
        assert_eq!(to_eok(Some(12_345_678_900_000)), Some(123_456.8));
        assert_eq!(to_eok(Some(0)), None);
        assert_eq!(to_eok(None), None);
    }
}
