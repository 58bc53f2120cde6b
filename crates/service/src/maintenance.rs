//! Maintenance outlook for registered equipment.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gridwatch_compute::maintenance;
use gridwatch_core::config::MaintenanceConfig;
use gridwatch_core::{Alert, AlertKind, MaintenancePrediction, Severity};
use gridwatch_notify::message::maintenance_notification;
use gridwatch_notify::Dispatcher;
use gridwatch_storage::{AlertStore, EquipmentStore};
use tracing::info;

use crate::error::ServiceError;

/// Prediction plus the alert raised for it, if any.
#[derive(Debug, Clone)]
pub struct MaintenanceOutcome {
    pub prediction: MaintenancePrediction,
    pub alert: Option<Alert>,
}

pub struct MaintenanceService {
    equipment: Arc<dyn EquipmentStore>,
    alerts: Arc<dyn AlertStore>,
    dispatcher: Arc<Dispatcher>,
    config: MaintenanceConfig,
}

impl MaintenanceService {
    pub fn new(
        equipment: Arc<dyn EquipmentStore>,
        alerts: Arc<dyn AlertStore>,
        dispatcher: Arc<Dispatcher>,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            equipment,
            alerts,
            dispatcher,
            config,
        }
    }

    /// Predict the outlook for one piece of equipment and raise a
    /// maintenance alert when the 30-day risk or the health score call for it.
    pub async fn predict(
        &self,
        facility_id: &str,
        equipment_id: &str,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceOutcome, ServiceError> {
        let profile = self
            .equipment
            .get_equipment(facility_id, equipment_id)
            .await?
            .ok_or_else(|| ServiceError::EquipmentNotFound {
                facility_id: facility_id.to_string(),
                equipment_id: equipment_id.to_string(),
            })?;

        let prediction = maintenance::predict(&profile, &self.config, now)?;
        let risk_30 = prediction.failure_risk_30_days / 100.0;
        if !maintenance::needs_alert(risk_30, prediction.current_health) {
            return Ok(MaintenanceOutcome { prediction, alert: None });
        }

        let severity = if risk_30 > 0.5 || prediction.current_health < 60.0 {
            Severity::Critical
        } else {
            Severity::High
        };
        let mut alert = Alert::new(
            facility_id,
            equipment_id,
            severity,
            AlertKind::Maintenance,
            format!("{} (health {:.1}%)", prediction.recommendation, prediction.current_health),
            now,
        );
        alert.metadata = BTreeMap::from([
            ("health_score".to_string(), serde_json::Value::from(prediction.current_health)),
            ("failure_risk_30_days".to_string(), serde_json::Value::from(prediction.failure_risk_30_days)),
            ("days_until_service".to_string(), serde_json::Value::from(prediction.days_until_service)),
        ]);
        self.alerts.put_alert(&alert).await?;
        info!(
            facility_id,
            equipment_id,
            alert_id = %alert.id,
            severity = %severity,
            health = prediction.current_health,
            "maintenance alert raised"
        );

        let notification = maintenance_notification(facility_id, &prediction, severity);
        self.dispatcher.dispatch(&notification).await;

        Ok(MaintenanceOutcome {
            prediction,
            alert: Some(alert),
        })
    }
}
