//! Operator-facing alert operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gridwatch_core::{Alert, AlertKind, CoreError, Severity};
use gridwatch_notify::message::alert_notification;
use gridwatch_notify::Dispatcher;
use gridwatch_storage::AlertStore;
use tracing::info;

use crate::error::ServiceError;

pub struct AlertService {
    alerts: Arc<dyn AlertStore>,
    dispatcher: Arc<Dispatcher>,
}

impl AlertService {
    pub fn new(alerts: Arc<dyn AlertStore>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { alerts, dispatcher }
    }

    /// Record a manual alert and publish it.
    pub async fn create(
        &self,
        facility_id: &str,
        equipment_id: &str,
        severity: Severity,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<Alert, ServiceError> {
        if facility_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("facility id is required".into()).into());
        }
        if message.trim().is_empty() {
            return Err(CoreError::InvalidInput("alert message is required".into()).into());
        }

        let alert = Alert::new(facility_id, equipment_id, severity, AlertKind::Manual, message, now);
        self.alerts.put_alert(&alert).await?;
        info!(alert_id = %alert.id, facility_id, severity = %severity, "manual alert created");

        self.dispatcher.dispatch(&alert_notification(&alert)).await;
        Ok(alert)
    }

    /// Newest first, optionally restricted to one severity.
    pub async fn list(&self, facility_id: &str, severity: Option<Severity>) -> Result<Vec<Alert>, ServiceError> {
        Ok(self.alerts.list_alerts(facility_id, severity).await?)
    }

    pub async fn acknowledge(&self, alert_id: &str) -> Result<Alert, ServiceError> {
        let alert = self.alerts.acknowledge(alert_id).await?;
        info!(alert_id, facility_id = %alert.facility_id, "alert acknowledged");
        Ok(alert)
    }
}
