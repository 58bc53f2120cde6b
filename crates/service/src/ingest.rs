//! Inbound reading path: decode, persist, hand off for evaluation.

use std::sync::Arc;

use gridwatch_core::Reading;
use gridwatch_storage::ReadingStore;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::queue::AnomalyQueue;

/// Result of ingesting one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub reading: Reading,
    /// False when the anomaly queue rejected the hand-off. The reading is
    /// stored either way.
    pub queued: bool,
}

pub struct IngestService {
    readings: Arc<dyn ReadingStore>,
    queue: AnomalyQueue,
    default_facility: String,
}

impl IngestService {
    pub fn new(readings: Arc<dyn ReadingStore>, queue: AnomalyQueue, default_facility: impl Into<String>) -> Self {
        Self {
            readings,
            queue,
            default_facility: default_facility.into(),
        }
    }

    /// Decode a raw JSON payload and ingest it.
    pub async fn ingest_payload(&self, payload: &[u8]) -> Result<Ingested, ServiceError> {
        let reading = Reading::from_payload(payload, &self.default_facility)?;
        self.ingest(reading).await
    }

    /// Persist `reading` and submit it to the anomaly worker without waiting
    /// for the evaluation.
    pub async fn ingest(&self, reading: Reading) -> Result<Ingested, ServiceError> {
        reading.validate()?;
        self.readings.put_reading(&reading).await?;

        let queued = match self.queue.submit(reading.clone()) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    facility_id = %reading.facility_id,
                    meter_id = %reading.meter_id,
                    error = %e,
                    "reading stored but not queued for anomaly evaluation"
                );
                false
            }
        };

        debug!(
            facility_id = %reading.facility_id,
            meter_id = %reading.meter_id,
            timestamp = reading.timestamp,
            queued,
            "reading ingested"
        );
        Ok(Ingested { reading, queued })
    }
}
