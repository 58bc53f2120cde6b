//! Pure statistics over timestamped samples.
//!
//! Empty input yields `0` everywhere instead of an error, matching the
//! "no data" display of aggregate views. NaN and Inf are propagated, never
//! clamped; callers that need clamping do it themselves.

use gridwatch_core::Reading;
use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// One sample of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub value: f64,
    /// Unix seconds.
    pub timestamp: i64,
}

impl Point {
    pub fn new(value: f64, timestamp: i64) -> Self {
        Self { value, timestamp }
    }

    /// Power sample of a reading.
    pub fn power(reading: &Reading) -> Self {
        Self::new(reading.power_kw, reading.timestamp)
    }
}

/// Q1, median and Q3 of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl Quartiles {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Tukey fences `[Q1 - k*IQR, Q3 + k*IQR]`.
    pub fn fences(&self, k: f64) -> (f64, f64) {
        let iqr = self.iqr();
        (self.q1 - k * iqr, self.q3 + k * iqr)
    }
}

pub fn sum(points: &[Point]) -> f64 {
    points.iter().map(|p| p.value).sum()
}

/// Arithmetic mean, `0` for empty input.
pub fn average(points: &[Point]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    sum(points) / points.len() as f64
}

/// Trailing moving average with a shrinking prefix window.
///
/// The output has the same length as `points`. Element `i` is the mean of
/// `points[i+1-window ..= i]`, or of `points[..= i]` while fewer than
/// `window` points exist.
pub fn moving_average(points: &[Point], window: usize) -> Result<Vec<f64>, ComputeError> {
    if window == 0 {
        return Err(ComputeError::InvalidArgument(
            "moving average window must be positive".into(),
        ));
    }

    let out = (0..points.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            average(&points[start..=i])
        })
        .collect();
    Ok(out)
}

/// Population standard deviation around `mean`, `0` for empty input.
pub fn std_dev(points: &[Point], mean: f64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let variance = points
        .iter()
        .map(|p| (p.value - mean).powi(2))
        .sum::<f64>()
        / points.len() as f64;
    variance.sqrt()
}

/// `(min, max)` seeded from the first element; `(0, 0)` for empty input.
///
/// A NaN anywhere in the series makes both results NaN.
pub fn extremes(points: &[Point]) -> (f64, f64) {
    let Some(first) = points.first() else {
        return (0.0, 0.0);
    };

    let mut min = first.value;
    let mut max = first.value;
    for p in points {
        if p.value.is_nan() {
            return (f64::NAN, f64::NAN);
        }
        if p.value > max {
            max = p.value;
        }
        if p.value < min {
            min = p.value;
        }
    }
    (min, max)
}

pub fn min(points: &[Point]) -> f64 {
    extremes(points).0
}

pub fn max(points: &[Point]) -> f64 {
    extremes(points).1
}

/// Mean of raw values, `0` for empty input.
pub fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation of raw values, `0` for empty input.
pub fn std_dev_of(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Quartiles by linear interpolation between closest ranks
/// (`pos = p * (n - 1)` on the sorted sample). `None` for empty input.
pub fn quartiles(values: &[f64]) -> Option<Quartiles> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Some(Quartiles {
        q1: percentile_sorted(&sorted, 0.25),
        median: percentile_sorted(&sorted, 0.5),
        q3: percentile_sorted(&sorted, 0.75),
    })
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Round half away from zero to `places` decimals.
pub fn round_to(x: f64, places: i32) -> f64 {
    let k = 10f64.powi(places);
    (x * k).round() / k
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(values: &[f64]) -> Vec<Point> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Point::new(v, 1_700_000_000 + i as i64 * 300))
            .collect()
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(sum(&[]), 0.0);
        assert_eq!(average(&[]), 0.0);
        assert_eq!(std_dev(&[], 3.0), 0.0);
        assert_eq!(extremes(&[]), (0.0, 0.0));
        assert!(moving_average(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn average_is_sum_over_len() {
        let series = [
            vec![1.0],
            vec![1.0, 2.0, 3.0, 4.0],
            vec![-5.0, 12.5, 0.25],
            vec![100.0, 100.0, 250.0, 3.0, 7.5],
        ];
        for values in &series {
            let p = pts(values);
            assert!((average(&p) - sum(&p) / p.len() as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_series_has_zero_std_dev() {
        let p = pts(&[7.5; 10]);
        assert_eq!(std_dev(&p, average(&p)), 0.0);
    }

    #[test]
    fn std_dev_is_population() {
        let p = pts(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((std_dev(&p, average(&p)) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn moving_average_uses_shrinking_prefix() {
        let p = pts(&[2.0, 4.0, 6.0, 8.0]);
        let ma = moving_average(&p, 2).unwrap();
        assert_eq!(ma, vec![2.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn moving_average_tail_equals_average_for_wide_window() {
        let p = pts(&[3.0, 9.0, 1.0, 4.0, 8.0]);
        for window in [5, 6, 100] {
            let ma = moving_average(&p, window).unwrap();
            assert_eq!(ma.len(), p.len());
            assert!((ma[ma.len() - 1] - average(&p)).abs() < 1e-12);
        }
    }

    #[test]
    fn moving_average_never_looks_ahead() {
        let p = pts(&[1.0, 1.0, 1000.0]);
        let ma = moving_average(&p, 3).unwrap();
        assert_eq!(ma[0], 1.0);
        assert_eq!(ma[1], 1.0);
    }

    #[test]
    fn zero_window_is_invalid() {
        let err = moving_average(&pts(&[1.0]), 0).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidArgument(_)));
    }

    #[test]
    fn extremes_are_first_element_seeded() {
        let p = pts(&[-3.0, -7.5, -1.25]);
        assert_eq!(extremes(&p), (-7.5, -1.25));
        assert_eq!(max(&pts(&[-2.0])), -2.0);
        assert_eq!(min(&pts(&[5.0, 9.0])), 5.0);
    }

    #[test]
    fn nan_propagates() {
        let p = pts(&[1.0, f64::NAN, 3.0]);
        assert!(average(&p).is_nan());
        assert!(max(&p).is_nan());
        assert!(min(&p).is_nan());
        let ma = moving_average(&p, 2).unwrap();
        assert_eq!(ma[0], 1.0);
        assert!(ma[1].is_nan());
        assert!(ma[2].is_nan());
    }

    #[test]
    fn infinity_propagates() {
        let p = pts(&[1.0, f64::INFINITY]);
        assert_eq!(sum(&p), f64::INFINITY);
        assert_eq!(max(&p), f64::INFINITY);
    }

    #[test]
    fn quartiles_interpolate() {
        let q = quartiles(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        assert!((q.q1 - 2.75).abs() < 1e-12);
        assert!((q.median - 4.5).abs() < 1e-12);
        assert!((q.q3 - 6.25).abs() < 1e-12);
        assert!((q.iqr() - 3.5).abs() < 1e-12);

        let (lo, hi) = q.fences(1.5);
        assert!((lo - (2.75 - 5.25)).abs() < 1e-12);
        assert!((hi - (6.25 + 5.25)).abs() < 1e-12);
    }

    #[test]
    fn quartiles_ignore_input_order() {
        let a = quartiles(&[9.0, 1.0, 5.0, 3.0]).unwrap();
        let b = quartiles(&[1.0, 3.0, 5.0, 9.0]).unwrap();
        assert_eq!(a, b);
        assert_eq!(quartiles(&[]), None);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_to(2.345, 2), 2.35);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(0.0705, 3), 0.071);
        assert_eq!(round_to(12.0, 2), 12.0);
    }
}
