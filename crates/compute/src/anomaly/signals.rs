//! Point-level anomaly signals.
//!
//! Each scorer looks only at the last element of `series` (the current
//! point) and its trailing predecessors, so a signal never depends on data
//! recorded after the point it judges.

use gridwatch_core::Severity;

use crate::stats::{mean_of, quartiles, std_dev_of};

/// Tukey fence multiplier for the interquartile-range rule.
pub const IQR_FENCE: f64 = 1.5;

/// Minimum predecessors for the spike test to have a baseline.
pub const MIN_SPIKE_BASELINE: usize = 2;

/// Minimum points (current included) for the outlier test.
pub const MIN_OUTLIER_POINTS: usize = 4;

/// Severity ratios against the historical mean.
pub const CRITICAL_RATIO: f64 = 2.0;
pub const HIGH_RATIO: f64 = 1.5;
pub const MEDIUM_RATIO: f64 = 1.25;

/// Verdict of the spike test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeSignal {
    pub fired: bool,
    /// z-score of the current point against its trailing window; 0 when the
    /// window is too short or has no spread.
    pub z_score: f64,
}

/// z-score of `value` against `mean`/`std`, or `None` when the spread is
/// effectively zero.
pub fn z_score(value: f64, mean: f64, std: f64) -> Option<f64> {
    if std <= f64::EPSILON || !std.is_finite() {
        None
    } else {
        Some((value - mean) / std)
    }
}

/// Spike test for the last point of `series`.
///
/// Baseline is the `window` points immediately before it. Fires when the
/// point lies more than `sigma` standard deviations from that baseline's
/// mean, in either direction.
pub fn detect_spike(series: &[f64], window: usize, sigma: f64) -> SpikeSignal {
    let quiet = SpikeSignal { fired: false, z_score: 0.0 };
    let Some((&current, before)) = series.split_last() else {
        return quiet;
    };

    let start = before.len().saturating_sub(window);
    let baseline = &before[start..];
    if baseline.len() < MIN_SPIKE_BASELINE {
        return quiet;
    }

    let mean = mean_of(baseline);
    let std = std_dev_of(baseline, mean);
    match z_score(current, mean, std) {
        Some(z) if z.is_finite() => SpikeSignal {
            fired: z.abs() > sigma,
            z_score: z,
        },
        _ => quiet,
    }
}

/// Interquartile-range test for the last point of `series`.
///
/// Quartiles are taken over the trailing `window + 1` points, the current
/// one included.
pub fn detect_outlier(series: &[f64], window: usize) -> bool {
    let Some(&current) = series.last() else {
        return false;
    };
    if !current.is_finite() {
        return false;
    }

    let start = series.len().saturating_sub(window.saturating_add(1));
    let sample = &series[start..];
    if sample.len() < MIN_OUTLIER_POINTS {
        return false;
    }

    match quartiles(sample) {
        Some(q) => {
            let (lo, hi) = q.fences(IQR_FENCE);
            current < lo || current > hi
        }
        None => false,
    }
}

/// Ratio-to-mean severity ladder. Without a positive mean everything is low.
pub fn classify_severity(power: f64, mean: f64) -> Severity {
    if !mean.is_finite() || mean <= 0.0 {
        return Severity::Low;
    }
    if power >= mean * CRITICAL_RATIO {
        Severity::Critical
    } else if power >= mean * HIGH_RATIO {
        Severity::High
    } else if power >= mean * MEDIUM_RATIO {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_score_needs_spread() {
        assert_eq!(z_score(5.0, 5.0, 0.0), None);
        assert_eq!(z_score(7.0, 5.0, 1.0), Some(2.0));
    }

    #[test]
    fn spike_fires_on_large_jump() {
        let series = [10.0, 11.0, 9.0, 10.0, 10.5, 9.5, 40.0];
        let s = detect_spike(&series, 24, 2.0);
        assert!(s.fired);
        assert!(s.z_score > 2.0);
    }

    #[test]
    fn spike_ignores_points_outside_window() {
        // A wild value three points back falls outside a window of two.
        let series = [10.0, 1000.0, 10.0, 12.0, 11.0];
        let s = detect_spike(&series, 2, 2.0);
        assert!(!s.fired);
        assert!((s.z_score - 0.0).abs() < 1e-12);
    }

    #[test]
    fn spike_needs_a_baseline() {
        assert!(!detect_spike(&[], 24, 2.0).fired);
        assert!(!detect_spike(&[10.0, 500.0], 24, 2.0).fired);
        // Flat baseline has no spread, so no z-score.
        assert!(!detect_spike(&[10.0, 10.0, 10.0, 500.0], 24, 2.0).fired);
    }

    #[test]
    fn outlier_uses_fences() {
        let flat_then_jump = [10.0, 10.0, 10.0, 10.0, 200.0];
        assert!(detect_outlier(&flat_then_jump, 24));

        let steady = [10.0, 12.0, 11.0, 13.0, 12.0];
        assert!(!detect_outlier(&steady, 24));

        let drop = [50.0, 51.0, 49.0, 50.0, 52.0, 0.0];
        assert!(detect_outlier(&drop, 24));
    }

    #[test]
    fn outlier_needs_four_points() {
        assert!(!detect_outlier(&[10.0, 10.0, 200.0], 24));
        // Window of 2 leaves only three points in the sample.
        assert!(!detect_outlier(&[10.0, 10.0, 10.0, 10.0, 200.0], 2));
    }

    #[test]
    fn severity_ladder() {
        assert_eq!(classify_severity(200.0, 10.0), Severity::Critical);
        assert_eq!(classify_severity(20.0, 10.0), Severity::Critical);
        assert_eq!(classify_severity(15.0, 10.0), Severity::High);
        assert_eq!(classify_severity(12.5, 10.0), Severity::Medium);
        assert_eq!(classify_severity(12.4, 10.0), Severity::Low);
        assert_eq!(classify_severity(5.0, 0.0), Severity::Low);
        assert_eq!(classify_severity(5.0, -3.0), Severity::Low);
        assert_eq!(classify_severity(5.0, f64::NAN), Severity::Low);
    }
}
