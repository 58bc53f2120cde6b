pub mod aggregate;
pub mod anomaly;
pub mod converter;
pub mod error;
pub mod maintenance;
pub mod report;
pub mod stats;

pub use aggregate::{recommendations, DailyAggregator};
pub use anomaly::AnomalyDetector;
pub use converter::TierCost;
pub use error::ComputeError;
pub use report::{report_key, DailyReport, ReportSummary};
pub use stats::{Point, Quartiles};
