use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-hour aggregate within one day, keyed by `"00".."23"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub count: usize,
    pub total_power: f64,
    /// `total_power / count`.
    pub avg_power: f64,
    pub max_power: f64,
}

/// Immutable daily summary for one facility and date.
///
/// Maps are ordered so that two aggregations of the same readings
/// serialize to identical bytes apart from `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAnalytics {
    pub facility_id: String,
    pub date: String,
    pub reading_count: usize,
    /// Sum of sampled power, reported as kWh.
    pub total_consumption: f64,
    pub total_consumption_mwh: f64,
    pub average_power: f64,
    pub peak_power: f64,
    pub min_power: f64,
    pub moving_average: Vec<f64>,
    pub estimated_cost: f64,
    pub cost_breakdown: BTreeMap<String, f64>,
    pub avg_voltage: f64,
    pub voltage_stddev: f64,
    pub avg_current: f64,
    pub power_factor: f64,
    /// Two-digit hour of the bucket with the highest max power; empty when
    /// there are no buckets.
    pub peak_hour: String,
    pub hourly_data: BTreeMap<String, HourlyBucket>,
    /// Unix seconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Human-readable advice derived from a daily summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub message: String,
}

impl Recommendation {
    pub fn new(priority: Priority, category: &str, message: impl Into<String>) -> Self {
        Self {
            priority,
            category: category.to_string(),
            message: message.into(),
        }
    }
}
