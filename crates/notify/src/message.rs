//! Subject and body text for grid notifications.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use gridwatch_core::{Alert, AnomalyResult, MaintenancePrediction, Reading, Severity};

use crate::traits::Notification;

/// Subject lines are cut to this many characters.
pub const MAX_SUBJECT_LEN: usize = 100;

fn truncate_subject(subject: String) -> String {
    match subject.char_indices().nth(MAX_SUBJECT_LEN) {
        Some((cut, _)) => subject[..cut].to_string(),
        None => subject,
    }
}

/// Notification for an anomalous reading.
pub fn anomaly_notification(
    reading: &Reading,
    result: &AnomalyResult,
    alert_id: &str,
    now: DateTime<Utc>,
) -> Notification {
    let subject = format!(
        "[{}] Energy Grid Anomaly - {}",
        result.severity, reading.facility_id
    );
    let body = format!(
        "Energy Grid Anomaly Detected\n\n\
         Facility: {}\n\
         Meter: {}\n\
         Severity: {}\n\n\
         Current Power: {:.2} kW\n\
         Average Power: {:.2} kW\n\
         Deviation: {:.1}%\n\n\
         Threshold: {:.2} kW\n\
         Time: {}\n\n\
         Reason: {}\n\n\
         Action Required: Please investigate immediately.",
        reading.facility_id,
        reading.meter_id,
        result.severity,
        result.current_power,
        result.mean,
        result.deviation_percent,
        result.threshold,
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
        result.reason,
    );

    Notification {
        subject: truncate_subject(subject),
        body,
        severity: result.severity,
        metadata: HashMap::from([
            ("facility_id".to_string(), reading.facility_id.clone()),
            ("meter_id".to_string(), reading.meter_id.clone()),
            ("alert_id".to_string(), alert_id.to_string()),
        ]),
    }
}

/// Notification for equipment that needs service.
pub fn maintenance_notification(
    facility_id: &str,
    prediction: &MaintenancePrediction,
    severity: Severity,
) -> Notification {
    let body = format!(
        "Equipment Maintenance Required\n\n\
         Equipment ID: {}\n\
         Current Health Score: {:.2}%\n\
         30-Day Failure Risk: {:.2}%\n\
         Predicted Maintenance Date: {}\n\n\
         {}\n\n\
         Please schedule maintenance to prevent failures.",
        prediction.equipment_id,
        prediction.current_health,
        prediction.failure_risk_30_days,
        prediction.next_service_date.format("%Y-%m-%d"),
        prediction.recommendation,
    );

    Notification {
        subject: truncate_subject(format!("Predictive Maintenance Alert - {facility_id}")),
        body,
        severity,
        metadata: HashMap::from([
            ("facility_id".to_string(), facility_id.to_string()),
            ("equipment_id".to_string(), prediction.equipment_id.clone()),
        ]),
    }
}

/// Notification for an alert raised by an operator.
pub fn alert_notification(alert: &Alert) -> Notification {
    let subject = format!("[{}] Energy Grid Alert - {}", alert.severity, alert.facility_id);
    let body = format!(
        "Facility: {}\nEquipment: {}\nType: {}\nSeverity: {}\n\n{}",
        alert.facility_id, alert.equipment_id, alert.kind, alert.severity, alert.message
    );

    Notification {
        subject: truncate_subject(subject),
        body,
        severity: alert.severity,
        metadata: HashMap::from([
            ("facility_id".to_string(), alert.facility_id.clone()),
            ("equipment_id".to_string(), alert.equipment_id.clone()),
            ("alert_id".to_string(), alert.id.clone()),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gridwatch_core::AlertKind;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_705_320_000, 0).unwrap()
    }

    fn result(severity: Severity) -> AnomalyResult {
        AnomalyResult {
            is_anomaly: true,
            current_power: 200.0,
            mean: 10.0,
            std_dev: 0.5,
            threshold: 11.0,
            deviation_percent: 1900.0,
            severity,
            reason: "spike (window=24, sigma=2.00)".into(),
            spike: true,
            outlier: true,
            z_score: 380.0,
        }
    }

    #[test]
    fn anomaly_subject_and_body() {
        let reading = Reading::new("facility-001", "meter-7", 1_705_319_990, 230.0, 5.0, 200.0);
        let n = anomaly_notification(&reading, &result(Severity::Critical), "alert-1", now());

        assert_eq!(n.subject, "[critical] Energy Grid Anomaly - facility-001");
        assert_eq!(n.severity, Severity::Critical);
        assert!(n.body.contains("Meter: meter-7"));
        assert!(n.body.contains("Current Power: 200.00 kW"));
        assert!(n.body.contains("Deviation: 1900.0%"));
        assert!(n.body.contains("Time: 2024-01-15T12:00:00Z"));
        assert!(n.body.ends_with("Action Required: Please investigate immediately."));
        assert_eq!(n.metadata["alert_id"], "alert-1");
    }

    #[test]
    fn long_subject_is_truncated() {
        let facility = "f".repeat(150);
        let reading = Reading::new(facility, "m", 1, 230.0, 5.0, 200.0);
        let n = anomaly_notification(&reading, &result(Severity::High), "a", now());
        assert_eq!(n.subject.chars().count(), MAX_SUBJECT_LEN);
        assert!(n.subject.starts_with("[high] Energy Grid Anomaly - fff"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "é".repeat(120);
        assert_eq!(truncate_subject(s).chars().count(), MAX_SUBJECT_LEN);
        assert_eq!(truncate_subject("short".into()), "short");
    }

    #[test]
    fn maintenance_body_mentions_date() {
        let prediction = MaintenancePrediction {
            equipment_id: "transformer-3".into(),
            current_health: 58.0,
            failure_risk_30_days: 2.44,
            failure_risk_90_days: 7.13,
            next_service_date: now() + Duration::days(10),
            days_until_service: 10,
            recommendation: "URGENT: Schedule immediate maintenance inspection".into(),
        };
        let n = maintenance_notification("facility-001", &prediction, Severity::Critical);
        assert_eq!(n.subject, "Predictive Maintenance Alert - facility-001");
        assert!(n.body.contains("Current Health Score: 58.00%"));
        assert!(n.body.contains("Predicted Maintenance Date: 2024-01-25"));
        assert!(n.body.contains("URGENT"));
    }

    #[test]
    fn manual_alert_notification() {
        let alert = Alert::new("facility-001", "panel-2", Severity::Medium, AlertKind::Manual, "Breaker tripped", now());
        let n = alert_notification(&alert);
        assert_eq!(n.subject, "[medium] Energy Grid Alert - facility-001");
        assert!(n.body.contains("Type: manual"));
        assert!(n.body.ends_with("Breaker tripped"));
    }
}
