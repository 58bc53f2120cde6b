//! Failure-risk model and service scheduling for metered equipment.

use chrono::{DateTime, Duration, Utc};
use gridwatch_core::config::MaintenanceConfig;
use gridwatch_core::{AssetHealth, EquipmentProfile, MaintenancePrediction};
use tracing::debug;

use crate::error::ComputeError;

const SECONDS_PER_YEAR: f64 = 365.0 * 86_400.0;

/// Probability of at least one failure within `horizon` under a constant
/// annual failure rate: `1 - exp(-rate * horizon / year)`.
pub fn failure_risk(annual_rate: f64, horizon: Duration) -> f64 {
    let years = horizon.num_seconds() as f64 / SECONDS_PER_YEAR;
    1.0 - (-annual_rate * years).exp()
}

/// Fails when the date falls outside the representable range.
pub fn next_service_date(asset: &AssetHealth) -> Result<DateTime<Utc>, ComputeError> {
    asset
        .last_service
        .checked_add_signed(asset.service_interval)
        .ok_or_else(|| ComputeError::InvalidArgument(format!("service interval out of range: {}", asset.service_interval)))
}

/// Operating hours since installation at a fixed daily duty cycle.
pub fn estimate_hours_run(install: DateTime<Utc>, now: DateTime<Utc>, hours_per_day: f64) -> f64 {
    let days = (now - install).num_seconds() as f64 / 86_400.0;
    days.max(0.0) * hours_per_day
}

/// Advice ladder over the 30-day risk (a fraction) and health score.
pub fn recommendation(risk_30_days: f64, health: f64) -> &'static str {
    if risk_30_days > 0.5 || health < 60.0 {
        "URGENT: Schedule immediate maintenance inspection"
    } else if risk_30_days > 0.3 || health < 75.0 {
        "Schedule maintenance within next 30 days"
    } else if risk_30_days > 0.15 || health < 85.0 {
        "Plan maintenance within next 90 days"
    } else {
        "Equipment operating normally"
    }
}

/// Whether a prediction warrants a maintenance alert.
pub fn needs_alert(risk_30_days: f64, health: f64) -> bool {
    risk_30_days > 0.5 || health < 75.0
}

/// Reliability profile of `equipment` as of `now`.
pub fn asset_health(
    equipment: &EquipmentProfile,
    config: &MaintenanceConfig,
    now: DateTime<Utc>,
) -> Result<AssetHealth, ComputeError> {
    let service_interval = Duration::try_days(config.service_interval_days).ok_or_else(|| {
        ComputeError::InvalidArgument(format!("service interval out of range: {} days", config.service_interval_days))
    })?;
    let install = DateTime::from_timestamp(equipment.install_date, 0).unwrap_or(now);
    let last_service = DateTime::from_timestamp(equipment.last_maintenance, 0).unwrap_or(now);
    Ok(AssetHealth {
        hours_run: estimate_hours_run(install, now, config.operating_hours_per_day),
        failure_rate_per_year: config.failure_rate_per_year,
        last_service,
        service_interval,
    })
}

/// Maintenance outlook for one piece of equipment. Risks are reported in
/// percent.
pub fn predict(
    equipment: &EquipmentProfile,
    config: &MaintenanceConfig,
    now: DateTime<Utc>,
) -> Result<MaintenancePrediction, ComputeError> {
    let asset = asset_health(equipment, config, now)?;
    let risk_30 = failure_risk(asset.failure_rate_per_year, Duration::days(30));
    let risk_90 = failure_risk(asset.failure_rate_per_year, Duration::days(90));
    let next_service = next_service_date(&asset)?;

    debug!(
        equipment_id = %equipment.equipment_id,
        hours_run = asset.hours_run,
        risk_30,
        health = equipment.health_score,
        "maintenance prediction"
    );

    Ok(MaintenancePrediction {
        equipment_id: equipment.equipment_id.clone(),
        current_health: equipment.health_score,
        failure_risk_30_days: risk_30 * 100.0,
        failure_risk_90_days: risk_90 * 100.0,
        next_service_date: next_service,
        days_until_service: (next_service - now).num_days(),
        recommendation: recommendation(risk_30, equipment.health_score).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-06-01T00:00:00Z
    const NOW: i64 = 1_717_200_000;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(NOW, 0).unwrap()
    }

    fn equipment(health: f64, last_maintenance_days_ago: i64) -> EquipmentProfile {
        EquipmentProfile {
            equipment_id: "transformer-3".into(),
            facility_id: "facility-001".into(),
            health_score: health,
            install_date: NOW - 1_000 * 86_400,
            last_maintenance: NOW - last_maintenance_days_ago * 86_400,
        }
    }

    #[test]
    fn ninety_day_risk_at_default_rate() {
        let risk = failure_risk(0.3, Duration::days(90));
        assert!((risk - 0.0713).abs() < 1e-3, "risk = {risk}");
        assert!((risk - (1.0 - (-0.3f64 * 90.0 / 365.0).exp())).abs() < 1e-12);
    }

    #[test]
    fn zero_horizon_has_no_risk() {
        assert_eq!(failure_risk(0.3, Duration::zero()), 0.0);
        assert!(failure_risk(0.3, Duration::days(30)) < failure_risk(0.3, Duration::days(90)));
    }

    #[test]
    fn next_service_adds_interval() {
        let asset = AssetHealth {
            hours_run: 0.0,
            failure_rate_per_year: 0.3,
            last_service: now(),
            service_interval: Duration::days(365),
        };
        assert_eq!(next_service_date(&asset).unwrap(), now() + Duration::days(365));
    }

    #[test]
    fn service_date_past_calendar_range_is_an_error() {
        let asset = AssetHealth {
            hours_run: 0.0,
            failure_rate_per_year: 0.3,
            last_service: DateTime::<Utc>::MAX_UTC - Duration::days(1),
            service_interval: Duration::days(365),
        };
        assert!(matches!(next_service_date(&asset), Err(ComputeError::InvalidArgument(_))));
    }

    #[test]
    fn huge_service_interval_is_an_error() {
        let config = MaintenanceConfig {
            service_interval_days: i64::MAX,
            ..MaintenanceConfig::default()
        };
        assert!(predict(&equipment(90.0, 10), &config, now()).is_err());

        let config = MaintenanceConfig {
            service_interval_days: 100_000_000,
            ..MaintenanceConfig::default()
        };
        assert!(matches!(
            predict(&equipment(90.0, 10), &config, now()),
            Err(ComputeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn hours_run_uses_duty_cycle() {
        let install = now() - Duration::days(10);
        assert_eq!(estimate_hours_run(install, now(), 20.0), 200.0);
        assert_eq!(estimate_hours_run(now() + Duration::days(1), now(), 20.0), 0.0);
    }

    #[test]
    fn recommendation_ladder() {
        assert_eq!(recommendation(0.6, 95.0), "URGENT: Schedule immediate maintenance inspection");
        assert_eq!(recommendation(0.02, 55.0), "URGENT: Schedule immediate maintenance inspection");
        assert_eq!(recommendation(0.02, 70.0), "Schedule maintenance within next 30 days");
        assert_eq!(recommendation(0.35, 95.0), "Schedule maintenance within next 30 days");
        assert_eq!(recommendation(0.02, 80.0), "Plan maintenance within next 90 days");
        assert_eq!(recommendation(0.02, 90.0), "Equipment operating normally");
    }

    #[test]
    fn alert_threshold() {
        assert!(needs_alert(0.6, 95.0));
        assert!(needs_alert(0.02, 74.9));
        assert!(!needs_alert(0.02, 75.0));
    }

    #[test]
    fn prediction_reports_percent_and_days() {
        let p = predict(&equipment(72.0, 300), &MaintenanceConfig::default(), now()).unwrap();
        assert_eq!(p.equipment_id, "transformer-3");
        assert_eq!(p.current_health, 72.0);
        assert!((p.failure_risk_30_days - 2.435).abs() < 0.01);
        assert!((p.failure_risk_90_days - 7.13).abs() < 0.01);
        assert_eq!(p.days_until_service, 65);
        assert_eq!(p.next_service_date, now() + Duration::days(65));
        assert_eq!(p.recommendation, "Schedule maintenance within next 30 days");
    }

    #[test]
    fn overdue_service_is_negative() {
        let p = predict(&equipment(90.0, 400), &MaintenanceConfig::default(), now()).unwrap();
        assert_eq!(p.days_until_service, -35);
        assert_eq!(p.recommendation, "Equipment operating normally");
    }

    #[test]
    fn prediction_serializes_camel_case() {
        let p = predict(&equipment(90.0, 10), &MaintenanceConfig::default(), now()).unwrap();
        let value = serde_json::to_value(&p).unwrap();
        assert_eq!(value["equipmentId"], "transformer-3");
        assert!(value.get("failureRisk30Days").is_some());
        assert_eq!(value["daysUntilService"], 355);
    }
}
