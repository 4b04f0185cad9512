//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration, build the first snapshot
//! - Start background tasks (config watcher, store writer, metrics, signals)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: an invalid initial configuration is fatal
//! - Listener binds last (traffic only when ready)
//! - The store writer gets a final flush after the server stopped

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{load_config, ChangeCounter, ConfigError, ConfigWatcher, FileConfigSource, ReloadGate};
use crate::forward::Forwarder;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::watch_signals;
use crate::observability::{logging, metrics};
use crate::storage::{FileStore, LazyWriter, SaveSetStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot open storage: {0}")]
    Store(#[from] StoreError),

    #[error("cannot watch configuration: {0}")]
    Watch(#[from] notify::Error),

    #[error("invalid bind address [{0}]")]
    Bind(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What to start.
#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub config_path: PathBuf,
    /// Overrides `server.bind_address`.
    pub bind: Option<String>,
}

/// Run the gateway until a shutdown signal arrives.
pub async fn run(options: StartupOptions) -> Result<(), StartupError> {
    let config = load_config(&options.config_path);
    let level = config
        .as_ref()
        .map(|c| c.observability.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    logging::init_logging(&level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        settings = ?options.config_path,
        "ajax-gateway starting"
    );
    let config = config?;

    let changes = ChangeCounter::new();
    let source = FileConfigSource::new(&options.config_path);
    let templates_dir = source.root().join(&config.templates.dir);
    let gate = Arc::new(ReloadGate::new(source, changes.clone())?);
    let snapshot = gate.loaded();

    let _watcher = ConfigWatcher::new(&options.config_path, changes.clone())
        .with_templates(&templates_dir)
        .run()?;

    let store: Arc<dyn SaveSetStore> = Arc::new(FileStore::open(&snapshot.storage.dir)?);
    tracing::info!(
        dir = ?snapshot.storage.dir,
        lazy_interval_secs = snapshot.storage.lazy_interval.as_secs_f64(),
        "Store ready"
    );

    let shutdown = Shutdown::new();
    let writer = LazyWriter::new(store.clone(), snapshot.storage.lazy_interval);
    let writer_task = tokio::spawn(writer.run(shutdown.subscribe()));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind = options.bind.unwrap_or_else(|| config.server.bind_address.clone());
    let bind_addr: SocketAddr = bind.parse().map_err(|_| StartupError::Bind(bind.clone()))?;
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        endpoints = snapshot.registry.endpoints().len(),
        resolvers = snapshot.resolver.rules().len(),
        default_timeout = %snapshot.default_timeout,
        "Listening for connections"
    );

    tokio::spawn(watch_signals(shutdown.clone(), changes));

    let server = HttpServer::new(AppState {
        forwarder: Forwarder::new(gate),
        store,
    });
    let served = server.run(listener, shutdown.subscribe()).await;

    shutdown.trigger();
    if let Err(e) = writer_task.await {
        tracing::error!(error = %e, "Store writer task failed");
    }
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}
