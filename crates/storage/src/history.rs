//! Paginated history fetch with a page guardrail.

use gridwatch_core::Reading;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::traits::{ReadingQuery, ReadingStore, SortOrder};

/// Bounds on a paginated fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// Pages requested before giving up on the remainder.
    pub max_pages: usize,
    /// Stop once this many readings are collected.
    pub max_readings: Option<usize>,
}

impl FetchLimits {
    pub fn pages(max_pages: usize) -> Self {
        Self { max_pages, max_readings: None }
    }

    pub fn with_max_readings(mut self, max: usize) -> Self {
        self.max_readings = Some(max);
        self
    }
}

/// Result of [`fetch_window`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowFetch {
    /// Chronological (ascending by timestamp) regardless of query order.
    pub readings: Vec<Reading>,
    /// The page guardrail stopped the fetch while more data remained.
    pub truncated: bool,
    pub pages: usize,
}

/// Follow continuation tokens until the data or the limits run out.
///
/// Descending queries collect the newest readings first and are reversed
/// before returning, so callers always see chronological order.
pub async fn fetch_window(
    store: &dyn ReadingStore,
    query: &ReadingQuery,
    limits: FetchLimits,
) -> Result<WindowFetch, StorageError> {
    let max_pages = limits.max_pages.max(1);
    let mut readings: Vec<Reading> = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;
    let mut truncated = false;

    loop {
        let page = store.query_page(query, token.as_deref()).await?;
        pages += 1;
        readings.extend(page.readings);

        if let Some(max) = limits.max_readings {
            if readings.len() >= max {
                readings.truncate(max);
                break;
            }
        }

        match page.next_token {
            None => break,
            Some(next) if pages >= max_pages => {
                warn!(
                    facility_id = %query.facility_id,
                    pages,
                    readings = readings.len(),
                    next_token = %next,
                    "pagination stopped at page limit; window is truncated"
                );
                truncated = true;
                break;
            }
            Some(next) => token = Some(next),
        }
    }

    if query.order == SortOrder::Descending {
        readings.reverse();
    }

    debug!(
        facility_id = %query.facility_id,
        pages,
        readings = readings.len(),
        truncated,
        "history window fetched"
    );

    Ok(WindowFetch { readings, truncated, pages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    const T0: i64 = 1_705_276_800;

    async fn store_with(n: i64) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            let r = Reading::new("facility-001", "m1", T0 + i * 60, 230.0, 10.0, i as f64);
            store.put_reading(&r).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn collects_every_page() {
        let store = store_with(7).await;
        let query = ReadingQuery::new("facility-001", T0, T0 + 86_400).with_limit(3);
        let fetched = fetch_window(&store, &query, FetchLimits::pages(10)).await.unwrap();
        assert_eq!(fetched.readings.len(), 7);
        assert_eq!(fetched.pages, 3);
        assert!(!fetched.truncated);
    }

    #[tokio::test]
    async fn page_guardrail_marks_truncation() {
        let store = store_with(7).await;
        let query = ReadingQuery::new("facility-001", T0, T0 + 86_400).with_limit(3);
        let fetched = fetch_window(&store, &query, FetchLimits::pages(2)).await.unwrap();
        assert_eq!(fetched.readings.len(), 6);
        assert!(fetched.truncated);
    }

    #[tokio::test]
    async fn descending_fetch_returns_latest_in_chronological_order() {
        let store = store_with(10).await;
        let query = ReadingQuery::new("facility-001", T0, T0 + 86_400)
            .with_order(SortOrder::Descending)
            .with_limit(4);
        let limits = FetchLimits::pages(5).with_max_readings(4);
        let fetched = fetch_window(&store, &query, limits).await.unwrap();

        let powers: Vec<f64> = fetched.readings.iter().map(|r| r.power_kw).collect();
        assert_eq!(powers, vec![6.0, 7.0, 8.0, 9.0]);
        assert!(!fetched.truncated);
    }

    #[tokio::test]
    async fn empty_range_is_empty() {
        let store = store_with(3).await;
        let query = ReadingQuery::new("facility-001", T0 - 100, T0);
        let fetched = fetch_window(&store, &query, FetchLimits::pages(5)).await.unwrap();
        assert!(fetched.readings.is_empty());
        assert_eq!(fetched.pages, 1);
    }
}
