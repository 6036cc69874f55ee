//! Series alignment
//!
//! US and KR markets observe different holidays, so their daily series have
//! different date sets. Alignment puts both on the union of their dates and
//! fills gaps by carrying the last observation forward (LOCF). A date that
//! precedes a series' first observation stays `None`.

use std::collections::BTreeSet;

use crate::core::{AlignedRow, AlignedSeries, DateRange, RatePoint, RateError, RateResult};

/// Align two series over all of their dates.
///
/// Fails with `InsufficientData` if either input is empty.
pub fn align(us: &[RatePoint], kr: &[RatePoint]) -> RateResult<AlignedSeries> {
    align_in_range(us, kr, None)
}

/// Align two series, keeping only dates inside `range`.
///
/// Observations before `range.start` still seed the carry-forward value so
/// the first in-range row is not artificially `None`.
pub fn align_in_range(
    us: &[RatePoint],
    kr: &[RatePoint],
    range: Option<DateRange>,
) -> RateResult<AlignedSeries> {
    if us.is_empty() || kr.is_empty() {
        return Err(RateError::insufficient_data(format!(
            "Insufficient rate data: us has {} points, kr has {} points",
            us.len(),
            kr.len()
        )));
    }
    merge_with_gaps(us, kr, range)
}

/// Same as [`align_in_range`] but tolerates an empty side, which then stays
/// `None` on every row. Used to build an explicitly flagged partial payload.
pub fn merge_with_gaps(
    us: &[RatePoint],
    kr: &[RatePoint],
    range: Option<DateRange>,
) -> RateResult<AlignedSeries> {
    let us = sorted_unique(us, "us")?;
    let kr = sorted_unique(kr, "kr")?;

    let in_range = |p: &&RatePoint| range.map_or(true, |r| r.contains(p.date));
    let dates: BTreeSet<_> = us
        .iter()
        .filter(in_range)
        .chain(kr.iter().filter(in_range))
        .map(|p| p.date)
        .collect();

    let mut us_cursor = Carry::new(&us);
    let mut kr_cursor = Carry::new(&kr);

    let rows = dates
        .into_iter()
        .map(|date| AlignedRow {
            date,
            us_value: us_cursor.value_at(date),
            kr_value: kr_cursor.value_at(date),
        })
        .collect();

    Ok(AlignedSeries::from_sorted_rows(rows))
}

/// Copy, sort ascending and reject duplicate dates or non-finite values
fn sorted_unique(points: &[RatePoint], label: &str) -> RateResult<Vec<RatePoint>> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.date);

    if let Some(bad) = sorted.iter().find(|p| !p.value.is_finite()) {
        return Err(RateError::invalid_input(format!(
            "{} series has non-finite value on {}",
            label, bad.date
        )));
    }
    if let Some(w) = sorted.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(RateError::invalid_input(format!(
            "{} series has duplicate date {}",
            label, w[0].date
        )));
    }
    Ok(sorted)
}

/// Forward-only cursor implementing last-observation-carried-forward
struct Carry<'a> {
    points: &'a [RatePoint],
    next: usize,
    last: Option<f64>,
}

impl<'a> Carry<'a> {
    fn new(points: &'a [RatePoint]) -> Self {
        Self {
            points,
            next: 0,
            last: None,
        }
    }

    /// Value at `date`; dates must be requested in ascending order
    fn value_at(&mut self, date: chrono::NaiveDate) -> Option<f64> {
        while let Some(p) = self.points.get(self.next) {
            if p.date > date {
                break;
            }
            self.last = Some(p.value);
            self.next += 1;
        }
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    fn p(day: u32, value: f64) -> RatePoint {
        RatePoint { date: d(day), value }
    }

    #[test]
    fn test_kr_gap_is_carried_forward() {
        let us = vec![p(1, 4.25), p(2, 4.30), p(3, 4.28)];
        let kr = vec![p(1, 3.05), p(3, 3.10)];

        let aligned = align(&us, &kr).unwrap();
        let rows = aligned.rows();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].date, d(2));
        assert_eq!(rows[1].kr_value, Some(3.05));
        assert_eq!(rows[1].us_value, Some(4.30));
        assert_eq!(rows[2].kr_value, Some(3.10));
    }

    #[test]
    fn test_leading_gap_is_null_not_zero() {
        let us = vec![p(1, 4.25), p(2, 4.30)];
        let kr = vec![p(2, 3.05)];

        let aligned = align(&us, &kr).unwrap();
        assert_eq!(aligned.rows()[0].kr_value, None);
        assert_eq!(aligned.rows()[1].kr_value, Some(3.05));
    }

    #[test]
    fn test_union_is_strictly_increasing_and_covers_inputs() {
        // Unsorted input with disjoint holidays
        let us = vec![p(5, 4.1), p(1, 4.0), p(8, 4.2), p(3, 4.05)];
        let kr = vec![p(2, 3.0), p(4, 3.1), p(8, 3.2), p(9, 3.3), p(10, 3.25)];

        let aligned = align(&us, &kr).unwrap();
        assert!(aligned.len() >= us.len().max(kr.len()));
        assert_eq!(aligned.len(), 8);
        assert!(aligned.rows().windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_empty_input_is_insufficient_data() {
        let us = vec![p(1, 4.25)];
        assert!(matches!(
            align(&us, &[]),
            Err(RateError::InsufficientData(_))
        ));
        assert!(matches!(
            align(&[], &us),
            Err(RateError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_range_filter_seeds_carry_from_earlier_points() {
        let us = vec![p(1, 4.0), p(5, 4.1), p(6, 4.2)];
        let kr = vec![p(2, 3.0), p(6, 3.1)];
        let range = DateRange::new(d(5), d(6)).unwrap();

        let aligned = align_in_range(&us, &kr, Some(range)).unwrap();
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned.rows()[0].date, d(5));
        assert_eq!(aligned.rows()[0].kr_value, Some(3.0));
    }

    #[test]
    fn test_duplicate_dates_rejected() {
        let us = vec![p(1, 4.0), p(1, 4.1)];
        let kr = vec![p(1, 3.0)];
        assert!(matches!(
            align(&us, &kr),
            Err(RateError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_merge_with_gaps_keeps_empty_side_null() {
        let us = vec![p(1, 4.0), p(2, 4.1)];
        let merged = merge_with_gaps(&us, &[], None).unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged.rows().iter().all(|r| r.kr_value.is_none()));
    }
}
