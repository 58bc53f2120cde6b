//! In-process store implementing every collaborator trait.
//!
//! Used by tests and the replay tool. Collections are ordered maps guarded
//! by tokio `RwLock`s; continuation tokens are offsets into the filtered
//! result set.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use gridwatch_core::{Alert, DailyAnalytics, EquipmentProfile, Reading, Severity};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageError;
use crate::traits::{
    AlertStore, AnalyticsStore, EquipmentStore, ReadingPage, ReadingQuery, ReadingStore,
    ReportSink, SortOrder,
};

/// Stored report object.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReport {
    pub body: Bytes,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct MemoryStore {
    /// facility id → readings ordered by (timestamp, meter id).
    readings: RwLock<BTreeMap<String, Vec<Reading>>>,
    alerts: RwLock<BTreeMap<String, Alert>>,
    analytics: RwLock<BTreeMap<(String, String), DailyAnalytics>>,
    equipment: RwLock<BTreeMap<(String, String), EquipmentProfile>>,
    reports: RwLock<BTreeMap<String, StoredReport>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reading_count(&self) -> usize {
        self.readings.read().await.values().map(Vec::len).sum()
    }

    pub async fn report(&self, key: &str) -> Option<StoredReport> {
        self.reports.read().await.get(key).cloned()
    }

    pub async fn report_keys(&self) -> Vec<String> {
        self.reports.read().await.keys().cloned().collect()
    }
}

/// Continuation tokens name the `(timestamp, meter_id)` of the last reading
/// returned, so pages stay stable while readings are written between calls.
fn encode_token(reading: &Reading) -> String {
    format!("{}:{}", reading.timestamp, reading.meter_id)
}

fn parse_token(token: &str) -> Result<(i64, &str), StorageError> {
    let invalid = || StorageError::InvalidToken(token.to_string());
    let (ts, meter) = token.split_once(':').ok_or_else(invalid)?;
    let ts = ts.parse::<i64>().map_err(|_| invalid())?;
    Ok((ts, meter))
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn put_reading(&self, reading: &Reading) -> Result<(), StorageError> {
        let mut readings = self.readings.write().await;
        let series = readings.entry(reading.facility_id.clone()).or_default();
        let key = (reading.timestamp, reading.meter_id.as_str());
        let pos = series.partition_point(|r| (r.timestamp, r.meter_id.as_str()) < key);
        let replaces = series
            .get(pos)
            .is_some_and(|r| r.timestamp == reading.timestamp && r.meter_id == reading.meter_id);
        if replaces {
            series[pos] = reading.clone();
        } else {
            series.insert(pos, reading.clone());
        }
        Ok(())
    }

    async fn query_page(
        &self,
        query: &ReadingQuery,
        token: Option<&str>,
    ) -> Result<ReadingPage, StorageError> {
        let after = token.map(parse_token).transpose()?;
        let limit = query.limit.max(1);

        let readings = self.readings.read().await;
        let Some(series) = readings.get(&query.facility_id) else {
            return Ok(ReadingPage::default());
        };

        let mut matching: Vec<&Reading> = series
            .iter()
            .filter(|r| r.timestamp >= query.start && r.timestamp < query.end)
            .filter(|r| query.meter_id.as_ref().map_or(true, |m| &r.meter_id == m))
            .collect();
        if let Some(key) = after {
            matching.retain(|r| {
                let own = (r.timestamp, r.meter_id.as_str());
                match query.order {
                    SortOrder::Ascending => own > key,
                    SortOrder::Descending => own < key,
                }
            });
        }
        if query.order == SortOrder::Descending {
            matching.reverse();
        }

        let page: Vec<Reading> = matching.iter().take(limit).map(|r| (*r).clone()).collect();
        let next_token = if matching.len() > page.len() {
            page.last().map(encode_token)
        } else {
            None
        };

        debug!(
            facility_id = %query.facility_id,
            resumed = after.is_some(),
            returned = page.len(),
            more = next_token.is_some(),
            "memory reading page"
        );

        Ok(ReadingPage { readings: page, next_token })
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn put_alert(&self, alert: &Alert) -> Result<(), StorageError> {
        self.alerts.write().await.insert(alert.id.clone(), alert.clone());
        Ok(())
    }

    async fn list_alerts(
        &self,
        facility_id: &str,
        severity: Option<Severity>,
    ) -> Result<Vec<Alert>, StorageError> {
        let alerts = self.alerts.read().await;
        let mut out: Vec<Alert> = alerts
            .values()
            .filter(|a| a.facility_id == facility_id)
            .filter(|a| severity.map_or(true, |s| a.severity == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn acknowledge(&self, alert_id: &str) -> Result<Alert, StorageError> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(alert_id)
            .ok_or_else(|| StorageError::NotFound(format!("alert {alert_id}")))?;
        alert.acknowledged = true;
        Ok(alert.clone())
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn put_daily(&self, analytics: &DailyAnalytics) -> Result<(), StorageError> {
        let key = (analytics.facility_id.clone(), analytics.date.clone());
        self.analytics.write().await.insert(key, analytics.clone());
        Ok(())
    }

    async fn get_daily(
        &self,
        facility_id: &str,
        date: &str,
    ) -> Result<Option<DailyAnalytics>, StorageError> {
        let key = (facility_id.to_string(), date.to_string());
        Ok(self.analytics.read().await.get(&key).cloned())
    }
}

#[async_trait]
impl EquipmentStore for MemoryStore {
    async fn get_equipment(
        &self,
        facility_id: &str,
        equipment_id: &str,
    ) -> Result<Option<EquipmentProfile>, StorageError> {
        let key = (facility_id.to_string(), equipment_id.to_string());
        Ok(self.equipment.read().await.get(&key).cloned())
    }

    async fn put_equipment(&self, equipment: &EquipmentProfile) -> Result<(), StorageError> {
        let key = (equipment.facility_id.clone(), equipment.equipment_id.clone());
        self.equipment.write().await.insert(key, equipment.clone());
        Ok(())
    }
}

#[async_trait]
impl ReportSink for MemoryStore {
    async fn put_report(
        &self,
        key: &str,
        body: Bytes,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, StorageError> {
        self.reports.write().await.insert(
            key.to_string(),
            StoredReport { body, metadata: metadata.clone() },
        );
        Ok(format!("memory:///{key}"))
    }
}
