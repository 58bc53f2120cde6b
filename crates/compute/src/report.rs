//! Report blob built from a [`DailyAnalytics`] record.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use gridwatch_core::{DailyAnalytics, HourlyBucket, Recommendation};
use serde::{Deserialize, Serialize};

use crate::aggregate::recommendations;
use crate::error::ComputeError;

pub const REPORT_CONTENT_TYPE: &str = "application/json";

/// Human-oriented summary with formatted quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_consumption: String,
    pub average_power: String,
    pub peak_power: String,
    pub peak_hour: String,
    pub power_factor: f64,
    pub reading_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub title: String,
    pub date: String,
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    pub summary: ReportSummary,
    pub hourly_breakdown: BTreeMap<String, HourlyBucket>,
    pub recommendations: Vec<Recommendation>,
}

impl DailyReport {
    pub fn build(analytics: &DailyAnalytics, now: DateTime<Utc>) -> Self {
        let peak_hour = if analytics.peak_hour.is_empty() {
            String::new()
        } else {
            format!("{}:00", analytics.peak_hour)
        };

        Self {
            title: format!("Daily Energy Report - {}", analytics.facility_id),
            date: analytics.date.clone(),
            generated_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            summary: ReportSummary {
                total_consumption: format!("{:.2} kWh", analytics.total_consumption),
                average_power: format!("{:.2} kW", analytics.average_power),
                peak_power: format!("{:.2} kW", analytics.peak_power),
                peak_hour,
                power_factor: analytics.power_factor,
                reading_count: analytics.reading_count,
            },
            hourly_breakdown: analytics.hourly_data.clone(),
            recommendations: recommendations(analytics),
        }
    }

    /// Object key: `reports/{facility}/{date}-analytics.json`.
    pub fn key(&self, facility_id: &str) -> String {
        report_key(facility_id, &self.date)
    }

    /// Object metadata attached on upload.
    pub fn metadata(&self, facility_id: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("facility-id".to_string(), facility_id.to_string()),
            ("report-date".to_string(), self.date.clone()),
            ("generated-at".to_string(), self.generated_at.clone()),
        ])
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ComputeError> {
        serde_json::to_vec_pretty(self).map_err(|e| ComputeError::Core(e.into()))
    }
}

pub fn report_key(facility_id: &str, date: &str) -> String {
    format!("reports/{}/{}-analytics.json", safe_segment(facility_id), safe_segment(date))
}

/// Keep a key segment to `[A-Za-z0-9._-]` so it can never introduce a new
/// path level.
fn safe_segment(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}
