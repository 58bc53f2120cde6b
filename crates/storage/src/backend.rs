use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions};
use tracing::info;
use url::Url;

use gridwatch_core::config::ReportConfig;

use crate::error::StorageError;
use crate::traits::ReportSink;

/// Where report blobs are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Local,
    S3,
}

/// Report sink over any `object_store` backend.
///
/// The retrieval URL is `base_url` joined with the object key, one path
/// segment per key component.
pub struct ObjectStoreReportSink {
    store: Arc<dyn ObjectStore>,
    base_url: Url,
    kind: BackendKind,
}

impl ObjectStoreReportSink {
    /// S3 when a bucket is configured, otherwise the local report directory.
    pub fn from_config(config: &ReportConfig) -> Result<Self, StorageError> {
        match config.s3_bucket.as_deref() {
            Some(bucket) => Self::s3(bucket, &config.region, config.resolved_base_url()),
            None => Self::local(&config.local_dir, config.base_url.as_deref()),
        }
    }

    pub fn memory(base_url: &str) -> Result<Self, StorageError> {
        Ok(Self {
            store: Arc::new(InMemory::new()),
            base_url: Url::parse(base_url)?,
            kind: BackendKind::Memory,
        })
    }

    pub fn local(dir: &Path, base_url: Option<&str>) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let canonical = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let store = LocalFileSystem::new_with_prefix(&canonical)
            .map_err(|e| StorageError::Other(format!("local filesystem error: {e}")))?;

        let base_url = match base_url {
            Some(u) => Url::parse(u)?,
            None => Url::from_directory_path(&canonical).map_err(|_| {
                StorageError::Other(format!("not an absolute path: {}", canonical.display()))
            })?,
        };

        info!("Reports: local backend at {}", canonical.display());
        Ok(Self {
            store: Arc::new(store),
            base_url,
            kind: BackendKind::Local,
        })
    }

    pub fn s3(bucket: &str, region: &str, base_url: Option<String>) -> Result<Self, StorageError> {
        let store = AmazonS3Builder::from_env()
            .with_region(region)
            .with_url(format!("s3://{}", bucket))
            .build()?;

        let base = base_url.unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", bucket));
        info!("Reports: S3 backend s3://{} (region: {})", bucket, region);

        Ok(Self {
            store: Arc::new(store),
            base_url: Url::parse(&base)?,
            kind: BackendKind::S3,
        })
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// Retrieval URL for `key`. Each key component is percent-encoded as
    /// its own path segment.
    pub fn url_for(&self, key: &str) -> Result<String, StorageError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::NotConfigured(format!("base url {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(key.split('/').filter(|s| !s.is_empty()));
        Ok(url.to_string())
    }
}

#[async_trait]
impl ReportSink for ObjectStoreReportSink {
    async fn put_report(
        &self,
        key: &str,
        body: Bytes,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, StorageError> {
        let path = object_store::path::Path::from(key);
        let size = body.len();

        // The local filesystem store does not persist attributes.
        let opts = match self.kind {
            BackendKind::Local => PutOptions::default(),
            BackendKind::Memory | BackendKind::S3 => {
                let mut attributes = Attributes::new();
                attributes.insert(Attribute::ContentType, "application/json".into());
                for (name, value) in metadata {
                    attributes.insert(Attribute::Metadata(name.clone().into()), value.clone().into());
                }
                PutOptions { attributes, ..PutOptions::default() }
            }
        };
        self.store.put_opts(&path, body.into(), opts).await?;

        let url = self.url_for(key)?;
        info!(
            key,
            bytes = size,
            facility_id = metadata.get("facility-id").map(String::as_str).unwrap_or(""),
            report_date = metadata.get("report-date").map(String::as_str).unwrap_or(""),
            "report uploaded"
        );
        Ok(url)
    }
}
