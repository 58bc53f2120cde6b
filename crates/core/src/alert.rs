use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::reading::Reading;

/// Alert severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(CoreError::InvalidSeverity(other.to_string())),
        }
    }
}

/// Outcome of evaluating one reading against its historical window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    pub current_power: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub threshold: f64,
    pub deviation_percent: f64,
    pub severity: Severity,
    pub reason: String,
    /// Spike sub-detector fired for the current point.
    pub spike: bool,
    /// IQR sub-detector fired for the current point.
    pub outlier: bool,
    /// z-score of the current point against its trailing window, 0 when undefined.
    pub z_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Anomaly,
    Maintenance,
    Manual,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Anomaly => write!(f, "anomaly"),
            AlertKind::Maintenance => write!(f, "maintenance"),
            AlertKind::Manual => write!(f, "manual"),
        }
    }
}

/// Durable alert record. Only `acknowledged` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "alertId")]
    pub id: String,
    pub facility_id: String,
    pub equipment_id: String,
    /// Unix seconds at creation.
    pub timestamp: i64,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Alert {
    pub fn new(
        facility_id: impl Into<String>,
        equipment_id: impl Into<String>,
        severity: Severity,
        kind: AlertKind,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("alert-{}", Uuid::new_v4()),
            facility_id: facility_id.into(),
            equipment_id: equipment_id.into(),
            timestamp: now.timestamp(),
            severity,
            kind,
            message: message.into(),
            acknowledged: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Build the anomaly alert raised for `reading`, carrying the
    /// originating statistics as metadata.
    pub fn from_anomaly(reading: &Reading, result: &AnomalyResult, now: DateTime<Utc>) -> Self {
        let direction = if result.deviation_percent < 0.0 { "below" } else { "above" };
        let message = format!(
            "Abnormal power consumption: {:.2} kW ({:.1}% {direction} average)",
            result.current_power,
            result.deviation_percent.abs()
        );
        let mut alert = Self::new(
            reading.facility_id.clone(),
            reading.meter_id.clone(),
            result.severity,
            AlertKind::Anomaly,
            message,
            now,
        );
        alert.metadata = BTreeMap::from([
            ("current_power".to_string(), json_number(result.current_power)),
            ("average_power".to_string(), json_number(result.mean)),
            ("std_dev".to_string(), json_number(result.std_dev)),
            ("threshold".to_string(), json_number(result.threshold)),
            ("deviation_percent".to_string(), json_number(result.deviation_percent)),
            ("reading_timestamp".to_string(), serde_json::Value::from(reading.timestamp)),
            ("reason".to_string(), serde_json::Value::from(result.reason.clone())),
        ]);
        alert
    }
}

/// Non-finite floats have no JSON representation; they are stored as null.
fn json_number(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
