//! Per-reading anomaly classification.
//!
//! Combines two point-level signals from [`signals`] over the series
//! `historical + [current]`:
//! - spike: z-score of the current point against its trailing window
//! - outlier: interquartile-range fences over the trailing window
//!
//! Severity is graded separately from the verdict, by the ratio of the
//! current power to the historical mean.

pub mod signals;

use gridwatch_core::config::AnomalyConfig;
use gridwatch_core::{AnomalyResult, Reading, Severity};
use tracing::debug;

use crate::stats::{mean_of, std_dev_of};

pub use signals::{classify_severity, detect_outlier, detect_spike, SpikeSignal};

/// Default number of trailing points used by the signals.
pub const DEFAULT_WINDOW_SIZE: usize = 24;

/// Default z-score multiplier.
pub const DEFAULT_SIGMA: f64 = 2.0;

/// Stateless detector; the historical window is supplied on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    window_size: usize,
    sigma: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            sigma: DEFAULT_SIGMA,
        }
    }
}

impl AnomalyDetector {
    /// Non-positive or non-finite tunables fall back to the defaults.
    pub fn new(window_size: usize, sigma: f64) -> Self {
        Self {
            window_size: if window_size == 0 { DEFAULT_WINDOW_SIZE } else { window_size },
            sigma: if sigma.is_finite() && sigma > 0.0 { sigma } else { DEFAULT_SIGMA },
        }
    }

    pub fn with_config(config: &AnomalyConfig) -> Self {
        Self::new(config.window_size, config.sigma)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Classify `current` against `historical` (chronological order).
    ///
    /// Never fails: non-finite historical values are left out of the
    /// baseline statistics and every derived number is clamped to a finite
    /// value.
    pub fn detect(&self, current: &Reading, historical: &[Reading]) -> AnomalyResult {
        let power = current.power_kw;

        let baseline: Vec<f64> = historical
            .iter()
            .map(|r| r.power_kw)
            .filter(|v| v.is_finite())
            .collect();
        let mean = mean_of(&baseline);
        let std_dev = std_dev_of(&baseline, mean);

        let threshold = finite_or_zero(mean + std_dev * self.sigma);
        let deviation_percent = if mean != 0.0 {
            finite_or_zero((power - mean) / mean * 100.0)
        } else {
            0.0
        };

        let mut series = baseline;
        series.push(power);
        let spike = detect_spike(&series, self.window_size, self.sigma);
        let outlier = detect_outlier(&series, self.window_size);

        let mut is_anomaly = spike.fired || outlier;
        let mut severity = classify_severity(power, mean);
        let reason = if historical.is_empty() && power > 0.0 {
            // No baseline at all: flag rather than stay silent.
            is_anomaly = true;
            severity = Severity::Low;
            "no historical baseline".to_string()
        } else {
            describe(spike.fired, outlier, self.window_size, self.sigma)
        };

        debug!(
            meter_id = %current.meter_id,
            power,
            mean,
            std_dev,
            z = spike.z_score,
            spike = spike.fired,
            outlier,
            is_anomaly,
            severity = %severity,
            "anomaly evaluation"
        );

        AnomalyResult {
            is_anomaly,
            current_power: power,
            mean,
            std_dev,
            threshold,
            deviation_percent,
            severity,
            reason,
            spike: spike.fired,
            outlier,
            z_score: spike.z_score,
        }
    }
}

fn describe(spike: bool, outlier: bool, window: usize, sigma: f64) -> String {
    let verdict = match (spike, outlier) {
        (true, true) => "spike and iqr outlier",
        (true, false) => "spike",
        (false, true) => "iqr outlier",
        (false, false) => "within baseline",
    };
    format!("{verdict} (window={window}, sigma={sigma:.2})")
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}
