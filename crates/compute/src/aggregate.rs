//! Daily aggregation of one facility's readings.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gridwatch_core::config::AggregationConfig;
use gridwatch_core::{DailyAnalytics, HourlyBucket, Priority, Reading, Recommendation};
use tracing::debug;

use crate::converter::{calculate_efficiency, kwh_to_mwh, split_cost};
use crate::error::ComputeError;
use crate::stats::{self, round_to, Point};

/// Average power above which load shifting is suggested, in kW.
pub const HIGH_AVERAGE_POWER_KW: f64 = 50.0;
/// Power factor below which correction equipment is suggested.
pub const LOW_POWER_FACTOR: f64 = 0.85;
/// Voltage standard deviation above which the supply is flagged.
pub const HIGH_VOLTAGE_STDDEV: f64 = 10.0;
/// Business hours (inclusive) in which a daily peak is worth shifting.
pub const BUSINESS_HOURS: std::ops::RangeInclusive<u32> = 9..=17;

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;

/// Builds [`DailyAnalytics`] records. Holds only tunables.
#[derive(Debug, Clone)]
pub struct DailyAggregator {
    moving_average_window: usize,
    peak_share: f64,
    rate_per_kwh: f64,
    utc_offset_minutes: i32,
}

impl Default for DailyAggregator {
    fn default() -> Self {
        Self::with_config(&AggregationConfig::default())
    }
}

impl DailyAggregator {
    pub fn with_config(config: &AggregationConfig) -> Self {
        Self {
            moving_average_window: config.moving_average_window,
            peak_share: config.peak_share,
            rate_per_kwh: config.rate_per_kwh,
            utc_offset_minutes: config.utc_offset_minutes,
        }
    }

    /// Summarize one day of readings.
    ///
    /// Readings are ordered by timestamp first, so the result does not depend
    /// on the order the store delivered them in. Only `created_at` depends on
    /// `now`.
    pub fn aggregate(
        &self,
        facility_id: &str,
        date: &str,
        readings: &[Reading],
        now: DateTime<Utc>,
    ) -> Result<DailyAnalytics, ComputeError> {
        if readings.is_empty() {
            return Err(ComputeError::EmptyInput {
                facility_id: facility_id.to_string(),
                date: date.to_string(),
            });
        }

        let mut ordered: Vec<&Reading> = readings.iter().collect();
        ordered.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.meter_id.cmp(&b.meter_id))
                .then_with(|| a.power_kw.total_cmp(&b.power_kw))
        });

        let points: Vec<Point> = ordered.iter().map(|r| Point::power(r)).collect();
        let total = stats::sum(&points);
        let average = stats::average(&points);
        let moving = stats::moving_average(&points, self.moving_average_window)?;
        let (min_power, peak_power) = stats::extremes(&points);

        let (peak_cost, offpeak_cost) = split_cost(total, self.peak_share, self.rate_per_kwh);
        let estimated_cost = peak_cost.cost + offpeak_cost.cost;

        let voltages: Vec<f64> = ordered.iter().map(|r| r.voltage).collect();
        let currents: Vec<f64> = ordered.iter().map(|r| r.current).collect();
        let avg_voltage = stats::mean_of(&voltages);
        let avg_current = stats::mean_of(&currents);
        let voltage_stddev = stats::std_dev_of(&voltages, avg_voltage);

        let apparent = apparent_power(avg_voltage, avg_current);
        let power_factor = if apparent > 0.0 {
            calculate_efficiency(apparent, average)
        } else {
            0.0
        };

        let hourly_data = self.hourly_buckets(&ordered);
        let peak_hour = peak_hour(&hourly_data).unwrap_or_default();

        debug!(
            facility_id,
            date,
            readings = readings.len(),
            total_kwh = total,
            peak_hour = %peak_hour,
            "daily aggregate computed"
        );

        Ok(DailyAnalytics {
            facility_id: facility_id.to_string(),
            date: date.to_string(),
            reading_count: readings.len(),
            total_consumption: round_to(total, 2),
            total_consumption_mwh: round_to(kwh_to_mwh(total), 3),
            average_power: round_to(average, 2),
            peak_power: round_to(peak_power, 2),
            min_power: round_to(min_power, 2),
            moving_average: moving.into_iter().map(|v| round_to(v, 2)).collect(),
            estimated_cost: round_to(estimated_cost, 2),
            cost_breakdown: BTreeMap::from([
                (peak_cost.tier, round_to(peak_cost.cost, 2)),
                (offpeak_cost.tier, round_to(offpeak_cost.cost, 2)),
            ]),
            avg_voltage: round_to(avg_voltage, 2),
            voltage_stddev: round_to(voltage_stddev, 3),
            avg_current: round_to(avg_current, 2),
            power_factor: round_to(power_factor, 3),
            peak_hour,
            hourly_data,
            created_at: now.timestamp(),
        })
    }

    /// Hour-of-day (in the configured offset) of a unix timestamp.
    pub fn hour_of_day(&self, timestamp: i64) -> u32 {
        let local = timestamp + i64::from(self.utc_offset_minutes) * 60;
        (local.rem_euclid(SECONDS_PER_DAY) / SECONDS_PER_HOUR) as u32
    }

    /// Group readings by hour-of-day. Only hours with readings get a bucket.
    pub fn hourly_buckets(&self, readings: &[&Reading]) -> BTreeMap<String, HourlyBucket> {
        let mut buckets: BTreeMap<String, HourlyBucket> = BTreeMap::new();
        for reading in readings {
            let key = format!("{:02}", self.hour_of_day(reading.timestamp));
            let power = reading.power_kw;
            let bucket = buckets.entry(key).or_insert_with(|| HourlyBucket {
                max_power: power,
                ..HourlyBucket::default()
            });
            bucket.count += 1;
            bucket.total_power += power;
            if power > bucket.max_power {
                bucket.max_power = power;
            }
        }
        for bucket in buckets.values_mut() {
            bucket.avg_power = bucket.total_power / bucket.count as f64;
        }
        buckets
    }
}

/// Hour with the highest max power; ties go to the earliest hour.
pub fn peak_hour(buckets: &BTreeMap<String, HourlyBucket>) -> Option<String> {
    let mut ranked: Vec<(&String, f64)> = buckets.iter().map(|(h, b)| (h, b.max_power)).collect();
    ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(b.0),
        other => other,
    });
    ranked.first().map(|(hour, _)| (*hour).clone())
}

/// Apparent power `V * I`. Negative or non-finite products clamp to 0.
pub fn apparent_power(avg_voltage: f64, avg_current: f64) -> f64 {
    let va = avg_voltage * avg_current;
    if va.is_finite() && va > 0.0 { va } else { 0.0 }
}

/// Advice for a daily summary. Each rule contributes at most one entry, in a
/// fixed order.
pub fn recommendations(analytics: &DailyAnalytics) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if analytics.average_power > HIGH_AVERAGE_POWER_KW {
        recs.push(Recommendation::new(
            Priority::High,
            "consumption",
            "Average power is high. Consider load shifting and efficiency measures.",
        ));
    }

    if analytics.power_factor > 0.0 && analytics.power_factor < LOW_POWER_FACTOR {
        recs.push(Recommendation::new(
            Priority::Medium,
            "efficiency",
            format!(
                "Low power factor ({:.3}). Evaluate correction equipment.",
                analytics.power_factor
            ),
        ));
    }

    if analytics.voltage_stddev > HIGH_VOLTAGE_STDDEV {
        recs.push(Recommendation::new(
            Priority::High,
            "quality",
            "High voltage variability detected. Inspect electrical infrastructure.",
        ));
    }

    if let Ok(hour) = analytics.peak_hour.parse::<u32>() {
        if BUSINESS_HOURS.contains(&hour) {
            recs.push(Recommendation::new(
                Priority::Low,
                "optimization",
                format!(
                    "Peak at {}:00. Shift non-critical loads to off-peak hours.",
                    analytics.peak_hour
                ),
            ));
        }
    }

    recs
}
