//! `user-fields` — service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Parse the field encryption key; refuse to start if it is malformed.
//! 4. Open the storage backend.
//! 5. Load the membership directory and spawn its refresh task.
//! 6. Build the Axum router and start the HTTP server.
//!
//! `user-fields generate-key` prints a fresh ASCII-safe key and exits.

mod config;
mod crypto;
mod fields;
mod policy;
mod server;
mod store;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use config::Config;
use crypto::FieldKey;
use policy::MembershipDirectory;
use server::state::AppState;
use store::{Backend, FileBackend, MemoryBackend};

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().nth(1).as_deref() == Some("generate-key") {
        println!("{}", FieldKey::generate().to_ascii_safe());
        return Ok(());
    }

    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        active_group = %cfg.active_group,
        "user-fields starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key
    // -----------------------------------------------------------------------
    let key = Arc::new(cfg.field_key()?);

    // -----------------------------------------------------------------------
    // 4. Storage backend
    // -----------------------------------------------------------------------
    let backend: Arc<dyn Backend> = match &cfg.storage_path {
        Some(path) => Arc::new(
            FileBackend::open(path)
                .with_context(|| format!("failed to open storage at {}", path.display()))?,
        ),
        None => {
            info!("no STORAGE_PATH configured; field values are kept in memory only");
            Arc::new(MemoryBackend::new())
        }
    };

    // -----------------------------------------------------------------------
    // 5. Membership directory
    // -----------------------------------------------------------------------
    let directory = MembershipDirectory::new();
    let _membership_refresh = match &cfg.membership_path {
        Some(path) => {
            policy::load_from_file(path, &directory).await?;
            Some(policy::refresh_task(
                path.clone(),
                cfg.membership_refresh_interval_secs,
                directory.clone(),
            ))
        }
        None => {
            tracing::warn!("no MEMBERSHIP_PATH configured; every field access will be denied");
            None
        }
    };

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(
        key,
        backend,
        directory,
        cfg.active_group.clone(),
        cfg.actor_header_name.clone(),
    );
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
