//! gridwatch-replay: run a file of meter readings through the full pipeline.
//!
//! Each line of the input is one JSON reading payload. Readings are stored
//! and evaluated for anomalies, then a daily report is produced for every
//! (facility, day) seen in the input. Reports go to the configured report
//! backend (local directory unless `S3_BUCKET` is set).

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{info, warn};

use gridwatch_core::config::load_dotenv;
use gridwatch_core::{Config, EquipmentProfile};
use gridwatch_notify::Dispatcher;
use gridwatch_service::{DailyOutcome, Services, Stores};
use gridwatch_storage::{EquipmentStore, MemoryStore, ObjectStoreReportSink};

/// Replay recorded meter readings through anomaly detection and daily reporting.
#[derive(Parser, Debug)]
#[command(name = "gridwatch-replay", version, about)]
struct Cli {
    /// Newline-delimited JSON readings.
    #[arg(long)]
    input: PathBuf,

    /// JSON array of equipment profiles to run maintenance predictions for.
    #[arg(long)]
    equipment: Option<PathBuf>,

    /// Override the report directory.
    #[arg(long, env = "REPORTS_DIR")]
    reports_dir: Option<PathBuf>,

    /// Only report on this day (YYYY-MM-DD).
    #[arg(long)]
    date: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(dir) = cli.reports_dir.clone() {
        config.report.local_dir = dir;
    }
    config.log_summary();

    let raw = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    info!(path = %cli.input.display(), lines = lines.len(), "replaying readings");

    let store = Arc::new(MemoryStore::new());
    let sink = ObjectStoreReportSink::from_config(&config.report).context("report backend")?;
    let dispatcher = Arc::new(Dispatcher::from_config(&config.notify).context("notification channels")?);
    info!(channels = ?dispatcher.channel_names(), "notification channels ready");

    let profiles: Vec<EquipmentProfile> = match cli.equipment.as_ref() {
        Some(path) => {
            let body = tokio::fs::read(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_slice(&body).context("equipment profiles")?
        }
        None => Vec::new(),
    };
    for profile in &profiles {
        store.put_equipment(profile).await?;
    }

    // Size the queue to the input so replay never drops evaluations.
    let services = Services::start(
        &config,
        Stores::shared(store.clone(), Arc::new(sink)),
        dispatcher,
        lines.len(),
    );
    let Services { ingest, daily, maintenance, worker, .. } = services;

    let mut days: BTreeSet<(String, String)> = BTreeSet::new();
    let mut rejected = 0usize;
    for (n, line) in lines.iter().enumerate() {
        match ingest.ingest_payload(line.as_bytes()).await {
            Ok(ingested) => {
                let day = local_day(ingested.reading.timestamp, config.aggregation.utc_offset_minutes);
                days.insert((ingested.reading.facility_id, day));
            }
            Err(e) => {
                rejected += 1;
                warn!(line = n + 1, error = %e, "rejected reading");
            }
        }
    }

    drop(ingest);
    let stats = worker.await.context("anomaly worker")?;
    info!(
        rejected,
        evaluated = stats.processed,
        anomalies = stats.anomalies,
        failed = stats.failed,
        "ingest complete"
    );

    let now = Utc::now();
    for (facility_id, day) in &days {
        if cli.date.as_deref().is_some_and(|d| d != day) {
            continue;
        }
        match daily.run(Some(facility_id), Some(day), now).await {
            Ok(DailyOutcome::Processed(run)) => {
                for rec in &run.recommendations {
                    info!(facility_id = %facility_id, date = %day, priority = ?rec.priority, category = %rec.category, "{}", rec.message);
                }
            }
            Ok(DailyOutcome::NoData { .. }) => {}
            Err(e) => warn!(facility_id = %facility_id, date = %day, error = %e, "daily report failed"),
        }
    }

    for profile in &profiles {
        match maintenance.predict(&profile.facility_id, &profile.equipment_id, now).await {
            Ok(outcome) => info!(
                equipment_id = %profile.equipment_id,
                risk_30_days = outcome.prediction.failure_risk_30_days,
                days_until_service = outcome.prediction.days_until_service,
                alert = outcome.alert.is_some(),
                "{}",
                outcome.prediction.recommendation
            ),
            Err(e) => warn!(equipment_id = %profile.equipment_id, error = %e, "maintenance prediction failed"),
        }
    }

    Ok(())
}

/// Calendar day of `timestamp` in the reporting offset.
fn local_day(timestamp: i64, utc_offset_minutes: i32) -> String {
    let local = timestamp + i64::from(utc_offset_minutes) * 60;
    DateTime::<Utc>::from_timestamp(local, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string()
}
