pub mod backend;
pub mod error;
pub mod history;
pub mod memory;
pub mod traits;

pub use backend::{BackendKind, ObjectStoreReportSink};
pub use error::StorageError;
pub use history::{fetch_window, FetchLimits, WindowFetch};
pub use memory::{MemoryStore, StoredReport};
pub use traits::{
    AlertStore, AnalyticsStore, EquipmentStore, ReadingPage, ReadingQuery, ReadingStore,
    ReportSink, SortOrder,
};
