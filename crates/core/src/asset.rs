use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Reliability profile used by the failure-risk model.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetHealth {
    pub hours_run: f64,
    pub failure_rate_per_year: f64,
    pub last_service: DateTime<Utc>,
    pub service_interval: Duration,
}

/// Equipment record as kept by the equipment collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentProfile {
    pub equipment_id: String,
    pub facility_id: String,
    /// 0..=100.
    pub health_score: f64,
    /// Unix seconds.
    pub install_date: i64,
    /// Unix seconds.
    pub last_maintenance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePrediction {
    pub equipment_id: String,
    pub current_health: f64,
    /// Percent.
    pub failure_risk_30_days: f64,
    /// Percent.
    pub failure_risk_90_days: f64,
    pub next_service_date: DateTime<Utc>,
    pub days_until_service: i64,
    pub recommendation: String,
}
