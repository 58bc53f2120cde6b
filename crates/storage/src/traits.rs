//! Collaborator contracts consumed by the services.
//!
//! Every store is an injected trait object (`Arc<dyn ...>`), so the same
//! service code runs against the in-memory store in tests and a real
//! backend in deployment.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use gridwatch_core::{Alert, DailyAnalytics, EquipmentProfile, Reading, Severity};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Key-range query over one facility's readings.
///
/// The time range is half-open: `start <= timestamp < end`, unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingQuery {
    pub facility_id: String,
    pub meter_id: Option<String>,
    pub start: i64,
    pub end: i64,
    pub order: SortOrder,
    /// Maximum readings per page.
    pub limit: usize,
}

impl ReadingQuery {
    pub fn new(facility_id: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            facility_id: facility_id.into(),
            meter_id: None,
            start,
            end,
            order: SortOrder::Ascending,
            limit: 1000,
        }
    }

    pub fn with_meter(mut self, meter_id: impl Into<String>) -> Self {
        self.meter_id = Some(meter_id.into());
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// One page of a reading query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingPage {
    pub readings: Vec<Reading>,
    /// Present when more readings match the query.
    pub next_token: Option<String>,
}

#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Store a reading. A reading with the same facility, meter and
    /// timestamp replaces the earlier one.
    async fn put_reading(&self, reading: &Reading) -> Result<(), StorageError>;

    async fn query_page(
        &self,
        query: &ReadingQuery,
        token: Option<&str>,
    ) -> Result<ReadingPage, StorageError>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn put_alert(&self, alert: &Alert) -> Result<(), StorageError>;

    /// Alerts for a facility, newest first, optionally limited to one severity.
    async fn list_alerts(
        &self,
        facility_id: &str,
        severity: Option<Severity>,
    ) -> Result<Vec<Alert>, StorageError>;

    /// Mark an alert acknowledged. `NotFound` when no such alert exists.
    async fn acknowledge(&self, alert_id: &str) -> Result<Alert, StorageError>;
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Store a daily record, replacing any earlier one for the same
    /// facility and date.
    async fn put_daily(&self, analytics: &DailyAnalytics) -> Result<(), StorageError>;

    async fn get_daily(
        &self,
        facility_id: &str,
        date: &str,
    ) -> Result<Option<DailyAnalytics>, StorageError>;
}

#[async_trait]
pub trait EquipmentStore: Send + Sync {
    async fn get_equipment(
        &self,
        facility_id: &str,
        equipment_id: &str,
    ) -> Result<Option<EquipmentProfile>, StorageError>;

    async fn put_equipment(&self, equipment: &EquipmentProfile) -> Result<(), StorageError>;
}

/// "Put blob, get retrieval URL".
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn put_report(
        &self,
        key: &str,
        body: Bytes,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, StorageError>;
}
