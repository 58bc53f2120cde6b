use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::alert::Severity;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse a profiled env var, falling back to `default` when unset or malformed.
fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub anomaly: AnomalyConfig,
    pub aggregation: AggregationConfig,
    pub report: ReportConfig,
    pub notify: NotifyConfig,
    pub maintenance: MaintenanceConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `GRIDWATCH_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("GRIDWATCH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            anomaly: AnomalyConfig::from_env_profiled(p),
            aggregation: AggregationConfig::from_env_profiled(p),
            report: ReportConfig::from_env_profiled(p),
            notify: NotifyConfig::from_env_profiled(p),
            maintenance: MaintenanceConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        let a = &self.anomaly;
        let g = &self.aggregation;
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  anomaly:     hours={}, window={}, sigma={}, limit={}",
            a.historical_hours, a.window_size, a.sigma, a.historical_limit
        );
        tracing::info!(
            "  aggregation: ma_window={}, peak_share={}, rate={}, utc_offset_min={}",
            g.moving_average_window, g.peak_share, g.rate_per_kwh, g.utc_offset_minutes
        );
        tracing::info!(
            "  report:      dir={}, bucket={}",
            self.report.local_dir.display(),
            self.report.s3_bucket.as_deref().unwrap_or("(none)")
        );
        tracing::info!(
            "  notify:      webhook={}, min_severity={}",
            if self.notify.webhook_url.is_some() { "set" } else { "(none)" },
            self.notify.min_severity
        );
    }
}

// ── Anomaly detection ─────────────────────────────────────────

/// Tunables for per-reading anomaly evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyConfig {
    /// Trailing duration of the historical window, in hours.
    pub historical_hours: i64,
    /// Number of trailing points used by the spike and outlier tests.
    pub window_size: usize,
    /// z-score multiplier.
    pub sigma: f64,
    /// Maximum readings per history page.
    pub historical_limit: usize,
    /// Page guardrail for history queries.
    pub historical_max_pages: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            historical_hours: 24,
            window_size: 24,
            sigma: 2.0,
            historical_limit: 200,
            historical_max_pages: 5,
        }
    }
}

impl AnomalyConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            historical_hours: profiled_env_parse(p, "HISTORICAL_HOURS", d.historical_hours),
            window_size: profiled_env_parse(p, "ANOMALY_WINDOW", d.window_size),
            sigma: profiled_env_parse(p, "ANOMALY_THRESHOLD_SIGMA", d.sigma),
            historical_limit: profiled_env_parse(p, "HISTORICAL_LIMIT", d.historical_limit),
            historical_max_pages: profiled_env_parse(p, "HISTORICAL_MAX_PAGES", d.historical_max_pages),
        }
    }
}

// ── Daily aggregation ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregationConfig {
    pub moving_average_window: usize,
    /// Share of consumption billed at the peak tier; the rest is off-peak.
    pub peak_share: f64,
    /// Currency units per kWh.
    pub rate_per_kwh: f64,
    /// Offset applied before bucketing readings by hour-of-day.
    pub utc_offset_minutes: i32,
    pub page_limit: usize,
    pub max_pages: usize,
    pub default_facility: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            moving_average_window: 12,
            peak_share: 0.4,
            rate_per_kwh: 0.20,
            utc_offset_minutes: 0,
            page_limit: 2000,
            max_pages: 50,
            default_facility: "facility-001".to_string(),
        }
    }
}

impl AggregationConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            moving_average_window: profiled_env_parse(p, "MOVING_AVERAGE_WINDOW", d.moving_average_window),
            peak_share: profiled_env_parse(p, "PEAK_SHARE", d.peak_share),
            rate_per_kwh: profiled_env_parse(p, "RATE_PER_KWH", d.rate_per_kwh),
            utc_offset_minutes: profiled_env_parse(p, "UTC_OFFSET_MINUTES", d.utc_offset_minutes),
            page_limit: profiled_env_parse(p, "READINGS_PAGE_LIMIT", d.page_limit),
            max_pages: profiled_env_parse(p, "READINGS_MAX_PAGES", d.max_pages),
            default_facility: profiled_env_or(p, "DEFAULT_FACILITY", &d.default_facility),
        }
    }
}

// ── Reports ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Local directory used when no bucket is configured.
    pub local_dir: PathBuf,
    /// Base of the retrieval URL handed back for uploaded reports.
    pub base_url: Option<String>,
    pub s3_bucket: Option<String>,
    pub region: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from("data/reports"),
            base_url: None,
            s3_bucket: None,
            region: "us-east-1".to_string(),
        }
    }
}

impl ReportConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            local_dir: PathBuf::from(profiled_env_or(p, "REPORTS_DIR", "data/reports")),
            base_url: profiled_env_opt(p, "REPORTS_BASE_URL"),
            s3_bucket: profiled_env_opt(p, "S3_BUCKET"),
            region: profiled_env_or(p, "AWS_REGION", "us-east-1"),
        }
    }

    /// Retrieval URL base: explicit setting, else the bucket's virtual-hosted URL.
    pub fn resolved_base_url(&self) -> Option<String> {
        self.base_url.clone().or_else(|| {
            self.s3_bucket
                .as_ref()
                .map(|b| format!("https://{}.s3.amazonaws.com", b))
        })
    }
}

// ── Notifications ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    /// Alerts below this severity are stored but not published.
    pub min_severity: Severity,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            min_severity: Severity::Low,
        }
    }
}

impl NotifyConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            webhook_url: profiled_env_opt(p, "ALERT_WEBHOOK_URL"),
            min_severity: profiled_env_parse(p, "NOTIFY_MIN_SEVERITY", Severity::Low),
        }
    }
}

// ── Maintenance ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceConfig {
    pub failure_rate_per_year: f64,
    pub service_interval_days: i64,
    pub operating_hours_per_day: f64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            failure_rate_per_year: 0.3,
            service_interval_days: 365,
            operating_hours_per_day: 20.0,
        }
    }
}

impl MaintenanceConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            failure_rate_per_year: profiled_env_parse(p, "FAILURE_RATE_PER_YEAR", d.failure_rate_per_year),
            service_interval_days: profiled_env_parse(p, "SERVICE_INTERVAL_DAYS", d.service_interval_days),
            operating_hours_per_day: profiled_env_parse(p, "OPERATING_HOURS_PER_DAY", d.operating_hours_per_day),
        }
    }
}
