//! KR minus US yield spread
//!
//! `spread_bp = (kr - us) * 100`, rounded to 0.1bp.

use crate::core::{AlignedRow, AlignedSeries, SpreadPoint};

/// Spread for a single row, `None` if either side is missing
pub fn spread_bp(row: &AlignedRow) -> Option<f64> {
    row.pair().map(|(us, kr)| round_to((kr - us) * 100.0, 1))
}

/// Spread for every aligned row
pub fn compute(aligned: &AlignedSeries) -> Vec<SpreadPoint> {
    aligned
        .rows()
        .iter()
        .map(|row| SpreadPoint {
            date: row.date,
            spread_bp: spread_bp(row),
        })
        .collect()
}

/// Most recent non-null spread
pub fn latest(aligned: &AlignedSeries) -> Option<SpreadPoint> {
    aligned.latest_complete().map(|row| SpreadPoint {
        date: row.date,
        spread_bp: spread_bp(row),
    })
}

/// Round half away from zero to `decimals` places
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // Avoid emitting -0.0
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::align;
    use crate::core::RatePoint;
    use chrono::NaiveDate;

    fn p(day: u32, value: f64) -> RatePoint {
        RatePoint {
            date: NaiveDate::from_ymd_opt(2024, 9, day).unwrap(),
            value,
        }
    }

    #[test]
    fn test_spread_fixture() {
        let aligned = align(&[p(2, 4.250)], &[p(2, 3.050)]).unwrap();
        let spreads = compute(&aligned);

        assert_eq!(spreads.len(), 1);
        assert_eq!(spreads[0].spread_bp, Some(-120.0));
    }

    #[test]
    fn test_null_propagates() {
        let aligned = align(&[p(2, 4.25), p(3, 4.3)], &[p(3, 3.0)]).unwrap();
        let spreads = compute(&aligned);

        assert_eq!(spreads[0].spread_bp, None);
        assert_eq!(spreads[1].spread_bp, Some(-130.0));
    }

    #[test]
    fn test_latest_uses_last_complete_row() {
        let aligned = align(&[p(2, 4.0), p(3, 4.1)], &[p(2, 3.5), p(3, 3.55)]).unwrap();
        let latest = latest(&aligned).unwrap();

        assert_eq!(latest.date, NaiveDate::from_ymd_opt(2024, 9, 3).unwrap());
        assert_eq!(latest.spread_bp, Some(-55.0));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(-120.00000000000003, 1), -120.0);
        assert_eq!(round_to(12.346, 2), 12.35);
        assert_eq!(round_to(-0.04, 1), 0.0);
        assert!(round_to(-0.04, 1).is_sign_positive());
    }
}
