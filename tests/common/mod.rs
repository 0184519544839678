//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

use cloud_demo_api::backends::activity_log::{EndpointCount, EndpointLatency};
use cloud_demo_api::backends::{
    ActivityLog, ActivityLogStore, BlobStore, DatabaseError, Document, DocumentError,
    DocumentStore, Filter, MemoryActivityLogStore, MemoryDocumentStore, NewActivityLog,
    ObjectStoreBlobs, Query, StorageError,
};
use cloud_demo_api::config::{AppConfig, TimeoutConfig};
use cloud_demo_api::http::{build_router, AppState, HttpServer};
use cloud_demo_api::lifecycle::Shutdown;
use cloud_demo_api::observability::InfoAggregator;
use cloud_demo_api::services::{CloudStorageService, FirestoreService};

pub const BACKEND_DEADLINE: Duration = Duration::from_secs(2);

/// In-memory collaborators with handles for inspecting what was written.
pub struct Backends {
    pub blobs: Arc<dyn BlobStore>,
    pub documents: Arc<MemoryDocumentStore>,
    pub activity_logs: Arc<dyn ActivityLogStore>,
}

impl Default for Backends {
    fn default() -> Self {
        Self {
            blobs: Arc::new(ObjectStoreBlobs::in_memory()),
            documents: Arc::new(MemoryDocumentStore::new()),
            activity_logs: Arc::new(MemoryActivityLogStore::new()),
        }
    }
}

impl Backends {
    pub fn with_blobs(mut self, blobs: impl BlobStore + 'static) -> Self {
        self.blobs = Arc::new(blobs);
        self
    }

    pub fn with_activity_logs(mut self, logs: Arc<dyn ActivityLogStore>) -> Self {
        self.activity_logs = logs;
        self
    }

    pub fn state(&self) -> AppState {
        self.state_with_documents(self.documents.clone())
    }

    pub fn state_with_documents(&self, documents: Arc<dyn DocumentStore>) -> AppState {
        let app = AppConfig {
            name: "cloud-demo-api".into(),
            version: "9.9.9".into(),
            environment: "test".into(),
            memory_limit_mb: Some(256),
        };
        AppState {
            info: Arc::new(InfoAggregator::new(&app)),
            storage: Arc::new(CloudStorageService::new(self.blobs.clone(), BACKEND_DEADLINE)),
            firestore: Arc::new(FirestoreService::new(documents, "test", BACKEND_DEADLINE)),
            activity_logs: self.activity_logs.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    build_router(&TimeoutConfig::default(), state)
}

/// Drive one request through `router` and decode the JSON envelope.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

pub fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

/// Serve `state` on an ephemeral port. Trigger the returned `Shutdown` to stop.
pub async fn start_server(state: AppState) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(&TimeoutConfig::default(), state);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Blob store whose every call fails with a fixed message.
pub struct FailingBlobStore(pub &'static str);

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn put(&self, _: &str, _: Vec<u8>, _: &str) -> Result<String, StorageError> {
        Err(StorageError::Backend(self.0.to_string()))
    }

    async fn list(&self, _: &str) -> Result<Vec<String>, StorageError> {
        Err(StorageError::Backend(self.0.to_string()))
    }

    async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Err(StorageError::Backend(self.0.to_string()))
    }

    async fn delete(&self, _: &str) -> Result<bool, StorageError> {
        Err(StorageError::Backend(self.0.to_string()))
    }
}

/// Blob store that never answers within any reasonable deadline.
pub struct HangingBlobStore;

#[async_trait]
impl BlobStore for HangingBlobStore {
    async fn put(&self, _: &str, _: Vec<u8>, _: &str) -> Result<String, StorageError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }

    async fn list(&self, _: &str) -> Result<Vec<String>, StorageError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, StorageError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }

    async fn delete(&self, _: &str) -> Result<bool, StorageError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(false)
    }
}

/// Blob store that panics on writes.
pub struct PanickingBlobStore;

#[async_trait]
impl BlobStore for PanickingBlobStore {
    async fn put(&self, _: &str, _: Vec<u8>, _: &str) -> Result<String, StorageError> {
        panic!("blob store exploded");
    }

    async fn list(&self, _: &str) -> Result<Vec<String>, StorageError> {
        Ok(Vec::new())
    }

    async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(None)
    }

    async fn delete(&self, _: &str) -> Result<bool, StorageError> {
        Ok(false)
    }
}

/// Document store that fails every call.
pub struct FailingDocumentStore(pub &'static str);

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn upsert(&self, _: &str, _: &str, _: Document) -> Result<(), DocumentError> {
        Err(DocumentError::Backend(self.0.to_string()))
    }

    async fn update(&self, _: &str, _: &str, _: Document) -> Result<(), DocumentError> {
        Err(DocumentError::Backend(self.0.to_string()))
    }

    async fn query(&self, _: &str, _: &Query) -> Result<Vec<Document>, DocumentError> {
        Err(DocumentError::Backend(self.0.to_string()))
    }

    async fn count(&self, _: &str, _: Option<&Filter>) -> Result<u64, DocumentError> {
        Err(DocumentError::Backend(self.0.to_string()))
    }
}

/// Document store where counting fails but everything else works.
pub struct CountFailingDocumentStore(pub MemoryDocumentStore);

#[async_trait]
impl DocumentStore for CountFailingDocumentStore {
    async fn upsert(&self, c: &str, id: &str, fields: Document) -> Result<(), DocumentError> {
        self.0.upsert(c, id, fields).await
    }

    async fn update(&self, c: &str, id: &str, fields: Document) -> Result<(), DocumentError> {
        self.0.update(c, id, fields).await
    }

    async fn query(&self, c: &str, query: &Query) -> Result<Vec<Document>, DocumentError> {
        self.0.query(c, query).await
    }

    async fn count(&self, _: &str, _: Option<&Filter>) -> Result<u64, DocumentError> {
        Err(DocumentError::Backend("aggregation quota exceeded".into()))
    }
}

/// Relational store that fails every call and counts attempts.
#[derive(Default)]
pub struct FailingActivityLogStore {
    pub calls: AtomicUsize,
}

impl FailingActivityLogStore {
    fn fail<T>(&self) -> Result<T, DatabaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DatabaseError::Backend("connection refused".into()))
    }
}

#[async_trait]
impl ActivityLogStore for FailingActivityLogStore {
    async fn insert(&self, _: NewActivityLog) -> Result<ActivityLog, DatabaseError> {
        self.fail()
    }

    async fn recent(&self, _: usize) -> Result<Vec<ActivityLog>, DatabaseError> {
        self.fail()
    }

    async fn requests_per_endpoint_since(
        &self,
        _: DateTime<Utc>,
    ) -> Result<Vec<EndpointCount>, DatabaseError> {
        self.fail()
    }

    async fn average_execution_time(&self) -> Result<Vec<EndpointLatency>, DatabaseError> {
        self.fail()
    }
}
