//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{DatabaseProvider, FirestoreProvider, ServiceConfig, StorageProvider};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides, then
/// validation.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML file without validating it.
pub fn parse_file(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay well-known environment variables onto `config`.
///
/// Setting a backend's connection variable (`GCS_BUCKET`, `DATABASE_URL`,
/// `GOOGLE_CLOUD_PROJECT`) also switches that backend away from the
/// in-memory provider.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        let port: u16 = port.parse().map_err(|_| ConfigError::InvalidEnv {
            key: "PORT",
            value: port.clone(),
        })?;
        config.listener.bind_address = format!("0.0.0.0:{port}");
    }

    if let Some(name) = lookup("APP_NAME") {
        config.app.name = name;
    }
    if let Some(environment) = lookup("APP_ENVIRONMENT") {
        config.app.environment = environment;
    }

    if let Some(bucket) = lookup("GCS_BUCKET") {
        config.storage.bucket_name = bucket;
        config.storage.provider = StorageProvider::Gcs;
    }

    if let Some(project) = lookup("GOOGLE_CLOUD_PROJECT") {
        config.firestore.project_id = project;
        config.firestore.provider = FirestoreProvider::Firestore;
    }
    if let Some(host) = lookup("FIRESTORE_EMULATOR_HOST") {
        config.firestore.emulator_host = Some(host);
    }

    if let Some(url) = lookup("DATABASE_URL") {
        config.database.url = url;
        config.database.provider = DatabaseProvider::Postgres;
    }

    Ok(())
}
