//! Daily report job: fetch a day of readings, aggregate, persist, publish.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use gridwatch_compute::{DailyAggregator, DailyReport};
use gridwatch_core::config::AggregationConfig;
use gridwatch_core::{parse_day, DailyAnalytics, Recommendation};
use gridwatch_storage::{fetch_window, AnalyticsStore, FetchLimits, ReadingQuery, ReadingStore, ReportSink};
use tracing::{info, warn};

use crate::error::ServiceError;

/// Successful daily run.
#[derive(Debug, Clone)]
pub struct DailyRun {
    pub analytics: DailyAnalytics,
    pub recommendations: Vec<Recommendation>,
    /// `None` when the upload failed; the failure is logged.
    pub report_url: Option<String>,
    /// The reading fetch hit its page guardrail.
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub enum DailyOutcome {
    /// No readings for the facility on that day.
    NoData { facility_id: String, date: String },
    Processed(Box<DailyRun>),
}

pub struct DailyReportService {
    readings: Arc<dyn ReadingStore>,
    analytics: Arc<dyn AnalyticsStore>,
    reports: Arc<dyn ReportSink>,
    aggregator: DailyAggregator,
    config: AggregationConfig,
}

impl DailyReportService {
    pub fn new(
        readings: Arc<dyn ReadingStore>,
        analytics: Arc<dyn AnalyticsStore>,
        reports: Arc<dyn ReportSink>,
        config: AggregationConfig,
    ) -> Self {
        Self {
            readings,
            analytics,
            reports,
            aggregator: DailyAggregator::with_config(&config),
            config,
        }
    }

    /// Half-open `[start, end)` bounds of `day` in the configured offset.
    pub fn day_bounds(&self, day: NaiveDate) -> (i64, i64) {
        let midnight = day.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp()).unwrap_or_default();
        let start = midnight - i64::from(self.config.utc_offset_minutes) * 60;
        (start, start + 86_400)
    }

    /// Day before `now` in the configured offset, as `YYYY-MM-DD`.
    pub fn default_date(&self, now: DateTime<Utc>) -> String {
        let local = now + Duration::minutes(i64::from(self.config.utc_offset_minutes));
        (local - Duration::days(1)).format("%Y-%m-%d").to_string()
    }

    /// Run the report for `facility_id` on `date`, defaulting to the
    /// configured facility and to yesterday.
    ///
    /// Persisting the analytics and uploading the report are best effort:
    /// failures are logged and the computed analytics are still returned.
    pub async fn run(
        &self,
        facility_id: Option<&str>,
        date: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DailyOutcome, ServiceError> {
        let facility_id = facility_id
            .filter(|f| !f.is_empty())
            .unwrap_or(self.config.default_facility.as_str())
            .to_string();
        let date = match date.filter(|d| !d.is_empty()) {
            Some(d) => d.to_string(),
            None => self.default_date(now),
        };
        let day = parse_day(&date)?;
        // Store and report keys use the zero-padded form.
        let date = day.format("%Y-%m-%d").to_string();

        let (start, end) = self.day_bounds(day);
        let query = ReadingQuery::new(facility_id.clone(), start, end).with_limit(self.config.page_limit.max(1));
        let window = fetch_window(self.readings.as_ref(), &query, FetchLimits::pages(self.config.max_pages))
            .await
            .map_err(|e| ServiceError::daily(&facility_id, &date, e))?;

        if window.readings.is_empty() {
            info!(facility_id = %facility_id, date = %date, "no readings for day");
            return Ok(DailyOutcome::NoData { facility_id, date });
        }
        if window.truncated {
            warn!(
                facility_id = %facility_id,
                date = %date,
                readings = window.readings.len(),
                "daily aggregate computed from a truncated reading set"
            );
        }

        let analytics = self
            .aggregator
            .aggregate(&facility_id, &date, &window.readings, now)
            .map_err(|e| ServiceError::daily(&facility_id, &date, e))?;

        if let Err(e) = self.analytics.put_daily(&analytics).await {
            warn!(facility_id = %facility_id, date = %date, error = %e, "failed to persist daily analytics");
        }

        let report = DailyReport::build(&analytics, now);
        let report_url = match self.upload(&facility_id, &report).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(facility_id = %facility_id, date = %date, error = %e, "failed to upload daily report");
                None
            }
        };

        info!(
            facility_id = %facility_id,
            date = %date,
            readings = analytics.reading_count,
            total_kwh = analytics.total_consumption,
            peak_hour = %analytics.peak_hour,
            report = report_url.as_deref().unwrap_or("(none)"),
            "daily report processed"
        );

        Ok(DailyOutcome::Processed(Box::new(DailyRun {
            recommendations: report.recommendations,
            analytics,
            report_url,
            truncated: window.truncated,
        })))
    }

    async fn upload(&self, facility_id: &str, report: &DailyReport) -> Result<String, ServiceError> {
        let body = report.to_json_bytes()?;
        let url = self
            .reports
            .put_report(&report.key(facility_id), Bytes::from(body), &report.metadata(facility_id))
            .await?;
        Ok(url)
    }
}
