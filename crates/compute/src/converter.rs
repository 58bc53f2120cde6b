//! Energy unit conversion and tariff helpers.

use serde::{Deserialize, Serialize};

/// Tier label for the peak share of a day's consumption.
pub const PEAK_TIER: &str = "peak";
/// Tier label for the remainder.
pub const OFFPEAK_TIER: &str = "offpeak";

/// Cost of one tariff tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCost {
    pub tier: String,
    pub kwh: f64,
    pub cost: f64,
}

pub fn kwh_to_mwh(kwh: f64) -> f64 {
    kwh / 1000.0
}

/// `kwh * rate`. The tier label does not affect the amount.
pub fn calculate_cost(kwh: f64, rate: f64, tier: &str) -> TierCost {
    TierCost {
        tier: tier.to_string(),
        kwh,
        cost: kwh * rate,
    }
}

/// Split `total_kwh` into peak and off-peak tiers.
///
/// `peak_share` is clamped to `[0, 1]`; the off-peak tier receives the rest.
pub fn split_cost(total_kwh: f64, peak_share: f64, rate: f64) -> (TierCost, TierCost) {
    let share = if peak_share.is_finite() {
        peak_share.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (
        calculate_cost(total_kwh * share, rate, PEAK_TIER),
        calculate_cost(total_kwh * (1.0 - share), rate, OFFPEAK_TIER),
    )
}

/// Power factor: `real / apparent`.
///
/// Returns `0` when apparent power is not positive or when the ratio is not
/// finite, so callers never see NaN or Inf.
pub fn calculate_efficiency(apparent_power: f64, real_power: f64) -> f64 {
    if apparent_power.is_nan() || apparent_power <= 0.0 {
        return 0.0;
    }
    let ratio = real_power / apparent_power;
    if ratio.is_finite() { ratio } else { 0.0 }
}
