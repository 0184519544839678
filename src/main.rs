//! Cloud demo API
//!
//! A small REST service exercising object storage, a document store and a
//! relational database behind a uniform JSON envelope.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request id, trace, request_logging,
//!                                   timeout, catch-panic)
//!                         │
//!                         ▼
//!                     api handlers ──▶ services ──▶ backends
//!                         │              (deadline)   ├─ BlobStore      (GCS / memory)
//!                         │                           ├─ DocumentStore  (Firestore / memory)
//!                         │                           └─ ActivityLogStore (Postgres / memory)
//!                         ▼
//!     Client Response ◀── ApiResponse envelope
//!
//!     Cross-cutting: config, observability (info, logging, metrics),
//!                    resilience (deadlines), lifecycle (startup/shutdown)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use cloud_demo_api::config::load_config;
use cloud_demo_api::http::HttpServer;
use cloud_demo_api::lifecycle::{build_state, signals::shutdown_signal, Shutdown};
use cloud_demo_api::observability::{logging::init_logging, metrics::init_metrics};

#[derive(Parser)]
#[command(name = "cloud-demo-api", version)]
#[command(about = "Demo REST service over cloud storage, Firestore and PostgreSQL", long_about = None)]
struct Cli {
    /// TOML configuration file. Every setting has a default.
    #[arg(short, long, env = "CLOUD_DEMO_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    if cli.check_config {
        println!("Configuration is valid");
        return Ok(());
    }

    init_logging(&config.observability)?;

    tracing::info!(
        name = %config.app.name,
        version = %config.app.version,
        environment = %config.app.environment,
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let state = build_state(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on(shutdown_signal());

    HttpServer::new(&config.timeouts, state)
        .run(listener, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
