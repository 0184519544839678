//! Startup orchestration.
//!
//! # Responsibilities
//! - Choose a collaborator implementation per backend from config
//! - Connect to the database and apply migrations
//! - Assemble the shared application state
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Backends initialize in order, not concurrently

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::backends::documents::auth::{MetadataServerToken, StaticToken, TokenSource};
use crate::backends::{
    ActivityLogStore, BlobStore, DatabaseError, DocumentStore, FirestoreClient,
    MemoryActivityLogStore, MemoryDocumentStore, ObjectStoreBlobs, PgActivityLogStore,
    StorageError,
};
use crate::config::{
    DatabaseProvider, FirestoreConfig, FirestoreProvider, ServiceConfig, StorageProvider,
};
use crate::http::AppState;
use crate::observability::InfoAggregator;
use crate::services::{CloudStorageService, FirestoreService};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("object storage: {0}")]
    Storage(#[from] StorageError),

    #[error("database: {0}")]
    Database(#[from] DatabaseError),

    #[error("HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Build the application state described by `config`.
pub async fn build_state(config: &ServiceConfig) -> Result<AppState, StartupError> {
    let deadline = Duration::from_secs(config.timeouts.backend_secs);

    let blobs: Arc<dyn BlobStore> = match config.storage.provider {
        StorageProvider::Gcs => Arc::new(ObjectStoreBlobs::gcs(&config.storage.bucket_name)?),
        StorageProvider::Memory => Arc::new(ObjectStoreBlobs::in_memory()),
    };

    let documents: Arc<dyn DocumentStore> = match config.firestore.provider {
        FirestoreProvider::Firestore => Arc::new(firestore_client(&config.firestore, deadline)?),
        FirestoreProvider::Memory => Arc::new(MemoryDocumentStore::new()),
    };

    let activity_logs: Arc<dyn ActivityLogStore> = match config.database.provider {
        DatabaseProvider::Postgres => {
            Arc::new(PgActivityLogStore::connect(&config.database, deadline).await?)
        }
        DatabaseProvider::Memory => Arc::new(MemoryActivityLogStore::new()),
    };

    tracing::info!(
        storage = ?config.storage.provider,
        firestore = ?config.firestore.provider,
        database = ?config.database.provider,
        backend_timeout_secs = config.timeouts.backend_secs,
        "Backends initialized"
    );

    Ok(AppState {
        info: Arc::new(InfoAggregator::new(&config.app)),
        storage: Arc::new(CloudStorageService::new(blobs, deadline)),
        firestore: Arc::new(FirestoreService::new(
            documents,
            config.app.environment.clone(),
            deadline,
        )),
        activity_logs,
    })
}

fn firestore_client(
    config: &FirestoreConfig,
    deadline: Duration,
) -> Result<FirestoreClient, StartupError> {
    let http = reqwest::Client::builder().timeout(deadline).build()?;

    let tokens: Arc<dyn TokenSource> = match (&config.emulator_host, &config.access_token) {
        (Some(_), _) => Arc::new(StaticToken::anonymous()),
        (None, Some(token)) => Arc::new(StaticToken::new(token.clone())),
        (None, None) => Arc::new(MetadataServerToken::new(http.clone())),
    };

    let client = FirestoreClient::new(http, config, tokens);
    tracing::debug!(url = client.documents_url(), "Firestore client ready");
    Ok(client)
}
