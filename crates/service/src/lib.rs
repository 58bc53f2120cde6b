//! Service layer: wires the analytics engine to its collaborators.

pub mod alerts;
pub mod anomaly;
pub mod daily_report;
pub mod error;
pub mod ingest;
pub mod maintenance;
pub mod queue;

use std::sync::Arc;

use gridwatch_core::Config;
use gridwatch_notify::Dispatcher;
use gridwatch_storage::{AlertStore, AnalyticsStore, EquipmentStore, ReadingStore, ReportSink};
use tokio::task::JoinHandle;

pub use alerts::AlertService;
pub use anomaly::{AnomalyService, Evaluation};
pub use daily_report::{DailyOutcome, DailyReportService, DailyRun};
pub use error::ServiceError;
pub use ingest::{IngestService, Ingested};
pub use maintenance::{MaintenanceOutcome, MaintenanceService};
pub use queue::{AnomalyQueue, WorkerStats, DEFAULT_QUEUE_CAPACITY};

/// Collaborators shared by every service.
#[derive(Clone)]
pub struct Stores {
    pub readings: Arc<dyn ReadingStore>,
    pub alerts: Arc<dyn AlertStore>,
    pub analytics: Arc<dyn AnalyticsStore>,
    pub equipment: Arc<dyn EquipmentStore>,
    pub reports: Arc<dyn ReportSink>,
}

impl Stores {
    /// Every record collaborator backed by one store, reports by `reports`.
    pub fn shared<S>(store: Arc<S>, reports: Arc<dyn ReportSink>) -> Self
    where
        S: ReadingStore + AlertStore + AnalyticsStore + EquipmentStore + 'static,
    {
        Self {
            readings: store.clone(),
            alerts: store.clone(),
            analytics: store.clone(),
            equipment: store,
            reports,
        }
    }
}

/// Fully wired service set with a running anomaly worker.
pub struct Services {
    pub ingest: IngestService,
    pub anomaly: Arc<AnomalyService>,
    pub daily: DailyReportService,
    pub alerts: AlertService,
    pub maintenance: MaintenanceService,
    /// Completes once `ingest` (and every other queue handle) is dropped.
    pub worker: JoinHandle<WorkerStats>,
}

impl Services {
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config, stores: Stores, dispatcher: Arc<Dispatcher>, queue_capacity: usize) -> Self {
        let anomaly = Arc::new(AnomalyService::new(
            stores.readings.clone(),
            stores.alerts.clone(),
            dispatcher.clone(),
            config.anomaly.clone(),
        ));
        let (queue, worker) = AnomalyQueue::spawn(anomaly.clone(), queue_capacity);

        Self {
            ingest: IngestService::new(
                stores.readings.clone(),
                queue,
                config.aggregation.default_facility.clone(),
            ),
            anomaly,
            daily: DailyReportService::new(
                stores.readings,
                stores.analytics,
                stores.reports,
                config.aggregation.clone(),
            ),
            alerts: AlertService::new(stores.alerts.clone(), dispatcher.clone()),
            maintenance: MaintenanceService::new(
                stores.equipment,
                stores.alerts,
                dispatcher,
                config.maintenance.clone(),
            ),
            worker,
        }
    }
}
