//! Process-wide request counter, uptime and host identity.
//!
//! Nothing here performs I/O against the cloud backends. Host identity is
//! resolved best-effort and degrades to `"unknown"`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::{MemoryRefreshKind, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::config::AppConfig;

/// Returned when the host name or address cannot be resolved.
pub const UNKNOWN: &str = "unknown";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Snapshot of the running process, derived fresh on every call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInfo {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub hostname: String,
    pub ip_address: String,
    pub runtime_version: String,
    pub total_requests: u64,
    pub uptime_seconds: u64,
    #[serde(rename = "memoryUsedMB")]
    pub memory_used_mb: u64,
    #[serde(rename = "memoryMaxMB")]
    pub memory_max_mb: u64,
    pub processors_available: usize,
    pub timestamp: DateTime<Utc>,
}

/// Aggregates live process metadata for the info endpoints.
///
/// Shared via `Arc` between the request logging middleware (which bumps the
/// counter) and the handlers (which only read it).
#[derive(Debug)]
pub struct InfoAggregator {
    name: String,
    version: String,
    environment: String,
    memory_limit_mb: Option<u64>,
    request_count: AtomicU64,
    started_at: Instant,
}

impl InfoAggregator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version.clone(),
            environment: config.environment.clone(),
            memory_limit_mb: config.memory_limit_mb,
            request_count: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Increment the request counter and return the new value.
    pub fn increment_request_count(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Whole seconds since construction. Uses a monotonic clock.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn hostname(&self) -> String {
        match System::host_name() {
            Some(name) if !name.is_empty() => name,
            _ => {
                tracing::warn!("Could not determine hostname");
                UNKNOWN.to_string()
            }
        }
    }

    /// First non-loopback address the hostname resolves to.
    pub async fn ip_address(&self) -> String {
        let host = self.hostname();
        if host == UNKNOWN {
            return UNKNOWN.to_string();
        }

        let lookup = tokio::net::lookup_host((host.as_str(), 0)).await;
        match lookup {
            Ok(addrs) => {
                let addrs: Vec<SocketAddr> = addrs.collect();
                addrs
                    .iter()
                    .find(|addr| !addr.ip().is_loopback())
                    .or_else(|| addrs.first())
                    .map(|addr| addr.ip().to_string())
                    .unwrap_or_else(|| UNKNOWN.to_string())
            }
            Err(e) => {
                tracing::warn!(host = %host, error = %e, "Could not resolve local address");
                UNKNOWN.to_string()
            }
        }
    }

    /// Assemble a full snapshot. Every field has a fallback, so this never fails.
    pub async fn application_info(&self) -> ApplicationInfo {
        let (memory_used_mb, memory_max_mb) = self.memory_usage_mb();

        ApplicationInfo {
            name: self.name.clone(),
            version: self.version.clone(),
            environment: self.environment.clone(),
            hostname: self.hostname(),
            ip_address: self.ip_address().await,
            runtime_version: runtime_version(),
            total_requests: self.request_count(),
            uptime_seconds: self.uptime_seconds(),
            memory_used_mb,
            memory_max_mb,
            processors_available: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            timestamp: Utc::now(),
        }
    }

    /// Resident memory of this process and the configured (or physical) ceiling.
    fn memory_usage_mb(&self) -> (u64, u64) {
        let mut system = System::new();

        let used = match sysinfo::get_current_pid() {
            Ok(pid) => {
                system.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    false,
                    ProcessRefreshKind::new().with_memory(),
                );
                system
                    .process(pid)
                    .map(|process| process.memory() / BYTES_PER_MB)
                    .unwrap_or(0)
            }
            Err(e) => {
                tracing::warn!(error = e, "Could not determine current pid");
                0
            }
        };

        let max = match self.memory_limit_mb {
            Some(limit) => limit,
            None => {
                system.refresh_memory_specifics(MemoryRefreshKind::new().with_ram());
                system.total_memory() / BYTES_PER_MB
            }
        };

        (used, max)
    }
}

fn runtime_version() -> String {
    format!(
        "rust {} ({}/{})",
        env!("CARGO_PKG_RUST_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
