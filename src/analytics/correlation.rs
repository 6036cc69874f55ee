//! Rolling Pearson correlation between US and KR yields
//!
//! Windows span `window_days` calendar days and are anchored on the most
//! recent date, stepping back by `step_days`, so the latest window always
//! contains the latest data. Output is oldest first.
//!
//! Rows where either rate is missing are excluded from a window. A window
//! with fewer than two complete rows, or with a constant side, has an
//! undefined correlation and reports `None` rather than zero.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use statrs::statistics::Statistics;

use crate::core::{AlignedRow, AlignedSeries, CorrelationWindow, RateError, RateResult};

use super::spread::round_to;

/// Decimal places kept on reported coefficients
const CORRELATION_DECIMALS: i32 = 4;

/// Step sizes at or above this are labelled by month
const MONTHLY_LABEL_MIN_STEP: u32 = 28;

const MONTH_LABEL: &str = "%b %Y";
const DAY_LABEL: &str = "%Y-%m-%d";

/// Rolling correlation windows, oldest first
pub fn compute(
    aligned: &AlignedSeries,
    window_days: u32,
    step_days: u32,
) -> RateResult<Vec<CorrelationWindow>> {
    if window_days == 0 || step_days == 0 {
        return Err(RateError::invalid_input(format!(
            "window ({}) and step ({}) must be at least one day",
            window_days, step_days
        )));
    }

    let (first, last) = match (aligned.first_date(), aligned.last_date()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Ok(Vec::new()),
    };

    let span = Duration::days(i64::from(window_days) - 1);
    let step = Duration::days(i64::from(step_days));

    // A start before the earliest representable date is also before `first`
    let mut windows = Vec::new();
    let mut end = last;
    while let Some(start) = end.checked_sub_signed(span).filter(|s| *s >= first) {
        windows.push(window(aligned.between(start, end), start, end, step_days));
        match end.checked_sub_signed(step) {
            Some(prev) => end = prev,
            None => break,
        }
    }

    // Series shorter than one window: report it as a single partial window
    if windows.is_empty() {
        windows.push(window(aligned.rows(), first, last, step_days));
    }

    windows.reverse();
    disambiguate_labels(&mut windows);
    Ok(windows)
}

/// Windows sharing a month label are relabelled by their start date.
///
/// Start dates are distinct, so labels end up unique.
fn disambiguate_labels(windows: &mut [CorrelationWindow]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for w in windows.iter() {
        *counts.entry(w.period_label.clone()).or_default() += 1;
    }
    for w in windows.iter_mut() {
        if counts.get(&w.period_label).copied().unwrap_or(0) > 1 {
            w.period_label = w.period_start.format(DAY_LABEL).to_string();
        }
    }
}

/// Correlation over the whole series
pub fn overall(aligned: &AlignedSeries) -> Option<f64> {
    pearson(aligned.rows())
}

/// Pearson coefficient over the complete rows of `rows`, clamped to [-1, 1]
pub fn pearson(rows: &[AlignedRow]) -> Option<f64> {
    let (us, kr): (Vec<f64>, Vec<f64>) = rows.iter().filter_map(AlignedRow::pair).unzip();
    if us.len() < 2 {
        return None;
    }

    let var_us = us.iter().variance();
    let var_kr = kr.iter().variance();
    if !(var_us > 0.0 && var_kr > 0.0) {
        return None;
    }

    let cov = us.iter().covariance(kr.iter());
    let r = cov / (var_us.sqrt() * var_kr.sqrt());
    if !r.is_finite() {
        return None;
    }

    Some(round_to(r.clamp(-1.0, 1.0), CORRELATION_DECIMALS))
}

fn window(rows: &[AlignedRow], start: NaiveDate, end: NaiveDate, step_days: u32) -> CorrelationWindow {
    CorrelationWindow {
        period_label: period_label(start, step_days),
        period_start: start,
        period_end: end,
        correlation: pearson(rows),
    }
}

/// "Mar 2024" for monthly-or-coarser steps, "2024-03-14" otherwise
pub fn period_label(start: NaiveDate, step_days: u32) -> String {
    if step_days >= MONTHLY_LABEL_MIN_STEP {
        start.format(MONTH_LABEL).to_string()
    } else {
        start.format(DAY_LABEL).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::align;
    use crate::core::RatePoint;

    fn date(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    fn series(values: &[(i64, f64)]) -> Vec<RatePoint> {
        values
            .iter()
            .map(|&(offset, value)| RatePoint {
                date: date(offset),
                value,
            })
            .collect()
    }

    #[test]
    fn test_perfect_correlation_is_exactly_one() {
        let us: Vec<_> = (0..60).map(|i| (i, 4.0 + 0.013 * i as f64)).collect();
        let kr: Vec<_> = (0..60).map(|i| (i, 3.1 + 0.026 * i as f64)).collect();
        let aligned = align(&series(&us), &series(&kr)).unwrap();

        assert_eq!(overall(&aligned), Some(1.0));
    }

    #[test]
    fn test_perfect_anticorrelation_is_exactly_minus_one() {
        let us: Vec<_> = (0..30).map(|i| (i, 4.0 + 0.01 * i as f64)).collect();
        let kr: Vec<_> = (0..30).map(|i| (i, 3.5 - 0.03 * i as f64)).collect();
        let aligned = align(&series(&us), &series(&kr)).unwrap();

        assert_eq!(overall(&aligned), Some(-1.0));
    }

    #[test]
    fn test_single_point_window_is_null() {
        let aligned = align(&series(&[(0, 4.0)]), &series(&[(0, 3.0)])).unwrap();

        assert_eq!(overall(&aligned), None);
        let windows = compute(&aligned, 30, 30).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].correlation, None);
    }

    #[test]
    fn test_constant_side_is_null() {
        let us: Vec<_> = (0..10).map(|i| (i, 4.0)).collect();
        let kr: Vec<_> = (0..10).map(|i| (i, 3.0 + 0.1 * i as f64)).collect();
        let aligned = align(&series(&us), &series(&kr)).unwrap();

        assert_eq!(overall(&aligned), None);
    }

    #[test]
    fn test_null_rows_are_excluded() {
        // KR starts on day 5, so days 0..5 have kr = None
        let us: Vec<_> = (0..10).map(|i| (i, 4.0 + 0.1 * i as f64)).collect();
        let kr: Vec<_> = (5..10).map(|i| (i, 3.0 + 0.2 * i as f64)).collect();
        let aligned = align(&series(&us), &series(&kr)).unwrap();

        assert_eq!(overall(&aligned), Some(1.0));
    }

    #[test]
    fn test_windows_anchor_on_latest_date() {
        let us: Vec<_> = (0..120).map(|i| (i, 4.0 + (i as f64 * 0.3).sin())).collect();
        let kr: Vec<_> = (0..120).map(|i| (i, 3.0 + (i as f64 * 0.2).cos())).collect();
        let aligned = align(&series(&us), &series(&kr)).unwrap();

        let windows = compute(&aligned, 60, 30).unwrap();
        // ends at day 119, 89, 59 (day 29 would start before day 0)
        assert_eq!(windows.len(), 3);
        assert_eq!(windows.last().unwrap().period_end, date(119));
        assert_eq!(windows[0].period_start, date(0));
        assert!(windows.windows(2).all(|w| w[0].period_start < w[1].period_start));

        for w in &windows {
            assert_eq!((w.period_end - w.period_start).num_days(), 59);
            let r = w.correlation.unwrap();
            assert!((-1.0..=1.0).contains(&r));
        }
    }

    #[test]
    fn test_window_labels_are_unique() {
        let us: Vec<_> = (0..120).map(|i| (i, 4.0 + (i as f64 * 0.3).sin())).collect();
        let kr: Vec<_> = (0..120).map(|i| (i, 3.0 + (i as f64 * 0.2).cos())).collect();
        let aligned = align(&series(&us), &series(&kr)).unwrap();

        let windows = compute(&aligned, 60, 30).unwrap();
        let labels: Vec<&str> = windows.iter().map(|w| w.period_label.as_str()).collect();

        // Jan 1 and Jan 31 share a month; Mar 1 stands alone
        assert_eq!(labels, vec!["2024-01-01", "2024-01-31", "Mar 2024"]);
    }

    #[test]
    fn test_huge_window_is_single_partial_window() {
        let us: Vec<_> = (0..10).map(|i| (i, 4.0 + 0.1 * i as f64)).collect();
        let kr: Vec<_> = (0..10).map(|i| (i, 3.0 + 0.2 * i as f64)).collect();
        let aligned = align(&series(&us), &series(&kr)).unwrap();

        let windows = compute(&aligned, u32::MAX, 30).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].period_start, date(0));
        assert_eq!(windows[0].period_end, date(9));
        assert_eq!(windows[0].correlation, Some(1.0));

        assert_eq!(compute(&aligned, 5, u32::MAX).unwrap().len(), 1);
    }

    #[test]
    fn test_zero_window_rejected() {
        let aligned = align(&series(&[(0, 4.0)]), &series(&[(0, 3.0)])).unwrap();
        assert!(compute(&aligned, 0, 30).is_err());
        assert!(compute(&aligned, 30, 0).is_err());
    }

    #[test]
    fn test_period_label() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        assert_eq!(period_label(start, 30), "Mar 2024");
        assert_eq!(period_label(start, 7), "2024-03-14");
    }
}
