//! Turning a store URL into a live store.
//!
//! Tile requests cross the worker boundary as plain data, so they carry the
//! store URL rather than a store handle. A [`StoreConnector`] lives inside each
//! worker and resolves that URL.

use std::collections::HashMap;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::http::HttpBuilder;
use object_store::prefix::PrefixStore;
use object_store::ObjectStore;
use parking_lot::RwLock;
use zarrs_object_store::AsyncObjectStore;
use zarrs_storage::storage_adapter::async_to_sync::{
    AsyncToSyncBlockOn, AsyncToSyncStorageAdapter,
};

use crate::error::{Result, StoreError};
use crate::traits::ArrayStore;
use crate::zarr::ZarrArrayStore;

/// Resolves store URLs to stores.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, url: &str) -> Result<Arc<dyn ArrayStore>>;
}

/// Blocking executor that drives object-store futures from sync zarrs calls.
///
/// Uses `block_in_place` so it is safe on a multi-threaded runtime worker as
/// well as on the blocking pool.
#[derive(Clone, Copy)]
pub struct TokioBlockOn;

impl AsyncToSyncBlockOn for TokioBlockOn {
    fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

/// Credentials and endpoint for `s3://` URLs.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Custom endpoint (MinIO and friends). `None` uses AWS.
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: String,
    pub allow_http: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            region: "us-east-1".to_string(),
            allow_http: false,
        }
    }
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("S3_ENDPOINT").ok(),
            access_key_id: std::env::var("S3_ACCESS_KEY").ok(),
            secret_access_key: std::env::var("S3_SECRET_KEY").ok(),
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            allow_http: std::env::var("S3_ALLOW_HTTP")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Where a URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    S3 { bucket: String, prefix: String },
    Http(String),
    Filesystem(String),
}

impl StoreLocation {
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(rest) = url.strip_prefix("s3://") {
            let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(StoreError::connect_failed(url, "missing bucket name"));
            }
            return Ok(Self::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.trim_matches('/').to_string(),
            });
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(Self::Http(url.trim_end_matches('/').to_string()));
        }
        let path = url.strip_prefix("file://").unwrap_or(url);
        if path.is_empty() {
            return Err(StoreError::connect_failed(url, "empty store location"));
        }
        Ok(Self::Filesystem(path.to_string()))
    }
}

/// Connector for zarr stores on the filesystem, S3 or plain HTTP.
#[derive(Debug, Clone, Default)]
pub struct ZarrStoreConnector {
    s3: S3Config,
}

impl ZarrStoreConnector {
    pub fn new(s3: S3Config) -> Self {
        Self { s3 }
    }

    pub fn from_env() -> Self {
        Self::new(S3Config::from_env())
    }

    fn s3_store(&self, url: &str, bucket: &str, prefix: &str) -> Result<Arc<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.s3.region)
            .with_allow_http(self.s3.allow_http);
        if let Some(endpoint) = &self.s3.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let (Some(key), Some(secret)) = (&self.s3.access_key_id, &self.s3.secret_access_key) {
            builder = builder
                .with_access_key_id(key)
                .with_secret_access_key(secret);
        } else {
            builder = builder.with_skip_signature(true);
        }
        let s3 = builder
            .build()
            .map_err(|e| StoreError::connect_failed(url, format!("failed to create S3 client: {e}")))?;

        if prefix.is_empty() {
            Ok(Arc::new(s3))
        } else {
            Ok(Arc::new(PrefixStore::new(s3, prefix)))
        }
    }
}

fn wrap_object_store(store: Arc<dyn ObjectStore>) -> Arc<dyn ArrayStore> {
    let async_store = Arc::new(AsyncObjectStore::new(store));
    let sync_store = AsyncToSyncStorageAdapter::new(async_store, TokioBlockOn);
    Arc::new(ZarrArrayStore::new(Arc::new(sync_store)))
}

impl StoreConnector for ZarrStoreConnector {
    fn connect(&self, url: &str) -> Result<Arc<dyn ArrayStore>> {
        let location = StoreLocation::parse(url)?;
        tracing::debug!(url = %url, location = ?location, "Connecting to zarr store");

        match location {
            StoreLocation::S3 { bucket, prefix } => {
                Ok(wrap_object_store(self.s3_store(url, &bucket, &prefix)?))
            }
            StoreLocation::Http(base) => {
                let http = HttpBuilder::new()
                    .with_url(base)
                    .build()
                    .map_err(|e| StoreError::connect_failed(url, e.to_string()))?;
                Ok(wrap_object_store(Arc::new(http)))
            }
            StoreLocation::Filesystem(path) => Ok(Arc::new(ZarrArrayStore::filesystem(path)?)),
        }
    }
}

/// Connector that hands out pre-registered stores by URL.
#[derive(Clone, Default)]
pub struct StaticStoreConnector {
    stores: Arc<RwLock<HashMap<String, Arc<dyn ArrayStore>>>>,
}

impl StaticStoreConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store, replacing any previous store under the same URL.
    pub fn register(&self, url: impl Into<String>, store: Arc<dyn ArrayStore>) {
        self.stores.write().insert(url.into(), store);
    }

    /// Convenience: a connector with a single registered store.
    pub fn single(url: impl Into<String>, store: Arc<dyn ArrayStore>) -> Self {
        let connector = Self::new();
        connector.register(url, store);
        connector
    }
}

impl StoreConnector for StaticStoreConnector {
    fn connect(&self, url: &str) -> Result<Arc<dyn ArrayStore>> {
        self.stores
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| StoreError::connect_failed(url, "no store registered for this url"))
    }
}
