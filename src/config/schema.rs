//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Application identity reported by the info endpoints.
    pub app: AppConfig,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Object storage backend.
    pub storage: StorageConfig,

    /// Document store backend.
    pub firestore: FirestoreConfig,

    /// Relational store backend.
    pub database: DatabaseConfig,
}

/// Application identity, injected once at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name.
    pub name: String,

    /// Application version.
    pub version: String,

    /// Deployment environment (development, staging, production...).
    pub environment: String,

    /// Memory ceiling reported as `memoryMaxMB`. Falls back to total system
    /// memory when unset.
    pub memory_limit_mb: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            memory_limit_mb: None,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request backstop in seconds.
    pub request_secs: u64,

    /// Deadline for a single backend call in seconds.
    pub backend_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            backend_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Which object store implementation to use.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Gcs,
    Memory,
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub provider: StorageProvider,

    /// Bucket name, required for `gcs`.
    pub bucket_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Memory,
            bucket_name: String::new(),
        }
    }
}

/// Which document store implementation to use.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FirestoreProvider {
    Firestore,
    Memory,
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FirestoreConfig {
    pub provider: FirestoreProvider,

    /// GCP project id, required for `firestore`.
    pub project_id: String,

    /// Database id.
    pub database: String,

    /// `host:port` of a Firestore emulator. Disables authentication.
    pub emulator_host: Option<String>,

    /// Static OAuth access token. When unset, tokens come from the
    /// GCE metadata server.
    pub access_token: Option<String>,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            provider: FirestoreProvider::Memory,
            project_id: String::new(),
            database: "(default)".to_string(),
            emulator_host: None,
            access_token: None,
        }
    }
}

/// Which relational store implementation to use.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseProvider {
    Postgres,
    Memory,
}

/// Relational store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub provider: DatabaseProvider,

    /// Connection string, required for `postgres`.
    pub url: String,

    /// Connection pool size.
    pub max_connections: u32,

    /// Apply embedded migrations at startup.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            provider: DatabaseProvider::Memory,
            url: String::new(),
            max_connections: 10,
            run_migrations: true,
        }
    }
}
