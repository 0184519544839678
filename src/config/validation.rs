//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every selected cloud backend has what it needs to connect
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Request timeout must be longer than the backend deadline
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{DatabaseProvider, FirestoreProvider, ServiceConfig, StorageProvider};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("{field} is required when {section}.provider = \"{provider}\"")]
    MissingForProvider {
        field: &'static str,
        section: &'static str,
        provider: &'static str,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error(
        "timeouts.request_secs ({request_secs}) must be greater than timeouts.backend_secs ({backend_secs})"
    )]
    RequestTimeoutNotAboveBackend { request_secs: u64, backend_secs: u64 },

    #[error("firestore.emulator_host: '{0}' is not a valid host:port")]
    InvalidEmulatorHost(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.app.name.trim().is_empty() {
        errors.push(ValidationError::Empty("app.name"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::NotPositive("timeouts.request_secs"));
    }
    if config.timeouts.backend_secs == 0 {
        errors.push(ValidationError::NotPositive("timeouts.backend_secs"));
    }
    // A backend deadline must fire before the request timeout can.
    if config.timeouts.backend_secs > 0
        && config.timeouts.request_secs > 0
        && config.timeouts.request_secs <= config.timeouts.backend_secs
    {
        errors.push(ValidationError::RequestTimeoutNotAboveBackend {
            request_secs: config.timeouts.request_secs,
            backend_secs: config.timeouts.backend_secs,
        });
    }

    if config.storage.provider == StorageProvider::Gcs && config.storage.bucket_name.is_empty() {
        errors.push(ValidationError::MissingForProvider {
            field: "storage.bucket_name",
            section: "storage",
            provider: "gcs",
        });
    }

    if config.firestore.provider == FirestoreProvider::Firestore {
        if config.firestore.project_id.is_empty() {
            errors.push(ValidationError::MissingForProvider {
                field: "firestore.project_id",
                section: "firestore",
                provider: "firestore",
            });
        }
        if config.firestore.database.is_empty() {
            errors.push(ValidationError::Empty("firestore.database"));
        }
        if let Some(host) = &config.firestore.emulator_host {
            let valid = Url::parse(&format!("http://{host}"))
                .map(|url| url.host_str().is_some() && url.path() == "/")
                .unwrap_or(false);
            if !valid {
                errors.push(ValidationError::InvalidEmulatorHost(host.clone()));
            }
        }
    }

    if config.database.provider == DatabaseProvider::Postgres {
        if config.database.url.is_empty() {
            errors.push(ValidationError::MissingForProvider {
                field: "database.url",
                section: "database",
                provider: "postgres",
            });
        }
        if config.database.max_connections == 0 {
            errors.push(ValidationError::NotPositive("database.max_connections"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
