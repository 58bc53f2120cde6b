use gridwatch_compute::ComputeError;
use gridwatch_core::CoreError;
use gridwatch_notify::NotifyError;
use gridwatch_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// Failure while producing a daily report, with the key needed to retry.
    #[error("daily report for {facility_id} on {date} failed: {source}")]
    DailyReport {
        facility_id: String,
        date: String,
        #[source]
        source: Box<ServiceError>,
    },

    #[error("equipment {equipment_id} not found for facility {facility_id}")]
    EquipmentNotFound {
        facility_id: String,
        equipment_id: String,
    },

    #[error("anomaly queue is full")]
    QueueFull,

    #[error("anomaly queue is closed")]
    QueueClosed,
}

impl ServiceError {
    pub fn daily(facility_id: &str, date: &str, source: impl Into<ServiceError>) -> Self {
        ServiceError::DailyReport {
            facility_id: facility_id.to_string(),
            date: date.to_string(),
            source: Box::new(source.into()),
        }
    }
}
