//! Per-reading anomaly evaluation against the stored history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gridwatch_compute::AnomalyDetector;
use gridwatch_core::config::AnomalyConfig;
use gridwatch_core::{Alert, AnomalyResult, Reading};
use gridwatch_notify::message::anomaly_notification;
use gridwatch_notify::Dispatcher;
use gridwatch_storage::{fetch_window, AlertStore, FetchLimits, ReadingQuery, ReadingStore, SortOrder};
use tracing::{debug, info};

use crate::error::ServiceError;

/// Outcome of one evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub result: AnomalyResult,
    /// Persisted alert when the reading was anomalous.
    pub alert: Option<Alert>,
    pub history_len: usize,
}

pub struct AnomalyService {
    readings: Arc<dyn ReadingStore>,
    alerts: Arc<dyn AlertStore>,
    dispatcher: Arc<Dispatcher>,
    detector: AnomalyDetector,
    config: AnomalyConfig,
}

impl AnomalyService {
    pub fn new(
        readings: Arc<dyn ReadingStore>,
        alerts: Arc<dyn AlertStore>,
        dispatcher: Arc<Dispatcher>,
        config: AnomalyConfig,
    ) -> Self {
        Self {
            readings,
            alerts,
            dispatcher,
            detector: AnomalyDetector::with_config(&config),
            config,
        }
    }

    /// Query for the trailing window before `reading`: same facility and
    /// meter, `[ts - hours, ts)`, newest first so the cap keeps the latest.
    pub fn history_query(&self, reading: &Reading) -> ReadingQuery {
        let start = reading.timestamp - self.config.historical_hours.max(0) * 3_600;
        ReadingQuery::new(reading.facility_id.clone(), start, reading.timestamp)
            .with_meter(reading.meter_id.clone())
            .with_order(SortOrder::Descending)
            .with_limit(self.config.historical_limit.max(1))
    }

    /// Load one history snapshot, classify `reading`, and raise an alert
    /// when it is anomalous. Notification failures are logged by the
    /// dispatcher and never fail the evaluation.
    pub async fn evaluate(&self, reading: &Reading, now: DateTime<Utc>) -> Result<Evaluation, ServiceError> {
        reading.validate()?;

        let query = self.history_query(reading);
        let limits = FetchLimits::pages(self.config.historical_max_pages)
            .with_max_readings(self.config.historical_limit.max(1));
        let window = fetch_window(self.readings.as_ref(), &query, limits).await?;

        let result = self.detector.detect(reading, &window.readings);
        if !result.is_anomaly {
            debug!(
                facility_id = %reading.facility_id,
                meter_id = %reading.meter_id,
                history = window.readings.len(),
                "reading within baseline"
            );
            return Ok(Evaluation {
                result,
                alert: None,
                history_len: window.readings.len(),
            });
        }

        let alert = Alert::from_anomaly(reading, &result, now);
        self.alerts.put_alert(&alert).await?;
        info!(
            facility_id = %reading.facility_id,
            meter_id = %reading.meter_id,
            alert_id = %alert.id,
            severity = %result.severity,
            power = result.current_power,
            mean = result.mean,
            "anomaly detected"
        );

        let notification = anomaly_notification(reading, &result, &alert.id, now);
        self.dispatcher.dispatch(&notification).await;

        Ok(Evaluation {
            result,
            alert: Some(alert),
            history_len: window.readings.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_core::Severity;
    use gridwatch_storage::MemoryStore;

    const T0: i64 = 1_705_276_800;

    fn service(store: &Arc<MemoryStore>, config: AnomalyConfig) -> AnomalyService {
        AnomalyService::new(store.clone(), store.clone(), Arc::new(Dispatcher::empty()), config)
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(T0 + 86_400, 0).unwrap()
    }

    async fn seed(store: &MemoryStore, meter: &str, count: i64, power: f64) {
        for i in 0..count {
            let r = Reading::new("facility-001", meter, T0 + i * 300, 230.0, 10.0, power);
            store.put_reading(&r).await.unwrap();
        }
    }

    #[tokio::test]
    async fn spike_raises_persisted_alert() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "m1", 24, 10.0).await;
        let current = Reading::new("facility-001", "m1", T0 + 24 * 300, 230.0, 10.0, 200.0);
        store.put_reading(&current).await.unwrap();

        let eval = service(&store, AnomalyConfig::default()).evaluate(&current, now()).await.unwrap();
        assert!(eval.result.is_anomaly);
        assert_eq!(eval.result.severity, Severity::Critical);
        assert_eq!(eval.history_len, 24);

        let alerts = store.list_alerts("facility-001", None).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, eval.alert.unwrap().id);
        assert_eq!(alerts[0].timestamp, now().timestamp());
    }

    #[tokio::test]
    async fn history_is_per_meter_and_excludes_current() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "m1", 10, 10.0).await;
        seed(&store, "m2", 10, 500.0).await;
        let current = Reading::new("facility-001", "m1", T0 + 10 * 300, 230.0, 10.0, 10.0);
        store.put_reading(&current).await.unwrap();

        let eval = service(&store, AnomalyConfig::default()).evaluate(&current, now()).await.unwrap();
        assert_eq!(eval.history_len, 10);
        assert_eq!(eval.result.mean, 10.0);
        assert!(!eval.result.is_anomaly);
        assert!(store.list_alerts("facility-001", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_cap_keeps_latest_readings() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "m1", 30, 10.0).await;
        let config = AnomalyConfig { historical_limit: 5, ..AnomalyConfig::default() };
        let current = Reading::new("facility-001", "m1", T0 + 30 * 300, 230.0, 10.0, 11.0);

        let svc = service(&store, config);
        let query = svc.history_query(&current);
        assert_eq!(query.end, current.timestamp);
        assert_eq!(query.order, SortOrder::Descending);

        let eval = svc.evaluate(&current, now()).await.unwrap();
        assert_eq!(eval.history_len, 5);
    }

    #[tokio::test]
    async fn first_reading_for_meter_is_flagged_low() {
        let store = Arc::new(MemoryStore::new());
        let current = Reading::new("facility-001", "new-meter", T0, 230.0, 10.0, 5.0);
        let eval = service(&store, AnomalyConfig::default()).evaluate(&current, now()).await.unwrap();
        assert!(eval.result.is_anomaly);
        assert_eq!(eval.result.severity, Severity::Low);
        assert!(eval.alert.is_some());
    }

    #[tokio::test]
    async fn invalid_reading_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let current = Reading::new("facility-001", "", T0, 230.0, 10.0, 5.0);
        let err = service(&store, AnomalyConfig::default()).evaluate(&current, now()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(_)));
    }
}
