//! Object storage collaborator.
//!
//! `BlobStore` is the narrow surface the service needs. `ObjectStoreBlobs`
//! implements it on top of any `object_store` backend: Google Cloud Storage
//! in production, `InMemory` for local runs and tests.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use thiserror::Error;

use crate::resilience::timeouts::DeadlineExceeded;

/// Errors from the object storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("stored object is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),

    #[error("{0}")]
    Backend(String),
}

/// Object storage operations used by the service.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` at `path`, returning the stored object name.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, StorageError>;

    /// Full names of every object under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Object contents, or `None` if it does not exist.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete an object. Returns `false` if it did not exist.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;
}

/// `BlobStore` over an `object_store` backend.
pub struct ObjectStoreBlobs {
    store: Arc<dyn ObjectStore>,
    root: String,
}

impl ObjectStoreBlobs {
    /// `root` is the URL prefix used when describing locations, such as
    /// `gs://bucket/`. A trailing `/` is added when missing.
    pub fn new(store: Arc<dyn ObjectStore>, root: impl Into<String>) -> Self {
        let mut root = root.into();
        if !root.ends_with('/') {
            root.push('/');
        }
        Self { store, root }
    }

    /// Google Cloud Storage bucket. Credentials come from the environment
    /// (`GOOGLE_SERVICE_ACCOUNT`, application default credentials, or the
    /// metadata server).
    pub fn gcs(bucket: &str) -> Result<Self, StorageError> {
        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()?;
        Ok(Self::new(Arc::new(store), format!("gs://{bucket}")))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), "memory://")
    }

    /// Human-readable location of `path`, for logs.
    pub fn describe(&self, path: &str) -> String {
        format!("{}{}", self.root, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBlobs {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let location = Path::from(path);
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&location, PutPayload::from(bytes), opts)
            .await?;
        tracing::debug!(location = %self.describe(location.as_ref()), "Object written");
        Ok(location.to_string())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = Path::from(prefix);
        let names = self
            .store
            .list(Some(&prefix))
            .map_ok(|meta| meta.location.to_string())
            .try_collect::<Vec<_>>()
            .await?;
        Ok(names)
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self.store.get(&Path::from(path)).await {
            Ok(result) => Ok(Some(result.bytes().await?.to_vec())),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let location = Path::from(path);
        match self.store.head(&location).await {
            Ok(_) => {}
            Err(object_store::Error::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        self.store.delete(&location).await?;
        Ok(true)
    }
}
