//! Configuration reload gate.
//!
//! # Responsibilities
//! - Hand out the current `GatewaySnapshot`
//! - Rebuild it when the change counter has moved past the last attempt
//!
//! # Data Flow
//! ```text
//! current()
//!     → attempted == latest change id? → return cached snapshot
//!     → else lock rebuild mutex
//!         → re-check (another caller may have rebuilt already)
//!         → source.build(latest) → swap in on success, keep old on failure
//!         → record latest as attempted
//! ```
//!
//! # Design Decisions
//! - Readers never block on the fast path (`arc-swap` load)
//! - One writer at a time; a caller that lost the race reuses the winner's result
//! - A failed build is not retried until the change id moves again

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::config::loader::{load_config, ConfigError};
use crate::config::snapshot::{build_snapshot, GatewaySnapshot};
use crate::observability::metrics;
use crate::resolver::{HostProbe, SystemProbe};

/// Monotonic counter bumped whenever the configuration source changes.
#[derive(Debug, Clone, Default)]
pub struct ChangeCounter(Arc<AtomicU64>);

impl ChangeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Advance the counter, returning the new id.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Something a snapshot can be built from.
pub trait ConfigSource: Send + Sync {
    fn build(&self, change_id: u64) -> Result<GatewaySnapshot, ConfigError>;
}

/// Settings file on disk. Relative directories resolve against the file's directory.
#[derive(Debug)]
pub struct FileConfigSource {
    path: PathBuf,
    probe: Arc<dyn HostProbe>,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_probe(path, Arc::new(SystemProbe))
    }

    pub fn with_probe(path: impl Into<PathBuf>, probe: Arc<dyn HostProbe>) -> Self {
        Self {
            path: path.into(),
            probe,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative paths in the settings file resolve against.
    pub fn root(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl ConfigSource for FileConfigSource {
    fn build(&self, change_id: u64) -> Result<GatewaySnapshot, ConfigError> {
        let config = load_config(&self.path)?;
        build_snapshot(&config, self.root(), change_id, self.probe.clone())
    }
}

/// Holds the current snapshot and rebuilds it when it goes stale.
pub struct ReloadGate {
    source: Box<dyn ConfigSource>,
    changes: ChangeCounter,
    snapshot: ArcSwap<GatewaySnapshot>,
    attempted: AtomicU64,
    rebuild: Mutex<()>,
}

impl ReloadGate {
    /// Build the first snapshot. Fails if the initial configuration is invalid.
    pub fn new(source: impl ConfigSource + 'static, changes: ChangeCounter) -> Result<Self, ConfigError> {
        let change_id = changes.current();
        let snapshot = source.build(change_id)?;
        metrics::record_config_reload(true);
        Ok(Self {
            source: Box::new(source),
            changes,
            snapshot: ArcSwap::from_pointee(snapshot),
            attempted: AtomicU64::new(change_id),
            rebuild: Mutex::new(()),
        })
    }

    /// Current snapshot, rebuilt first if the configuration changed.
    ///
    /// May block while a rebuild runs; call it off the async reactor.
    pub fn current(&self) -> Arc<GatewaySnapshot> {
        if self.attempted.load(Ordering::Acquire) == self.changes.current() {
            return self.snapshot.load_full();
        }

        let _guard = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        let latest = self.changes.current();
        if self.attempted.load(Ordering::Acquire) != latest {
            match self.source.build(latest) {
                Ok(snapshot) => {
                    tracing::info!(change_id = latest, "Configuration reloaded");
                    metrics::record_config_reload(true);
                    self.snapshot.store(Arc::new(snapshot));
                }
                Err(e) => {
                    tracing::error!(
                        change_id = latest,
                        error = %e,
                        "Failed to reload configuration. Keeping current configuration."
                    );
                    metrics::record_config_reload(false);
                }
            }
            self.attempted.store(latest, Ordering::Release);
        }
        self.snapshot.load_full()
    }

    /// The snapshot currently held, without checking for changes.
    pub fn loaded(&self) -> Arc<GatewaySnapshot> {
        self.snapshot.load_full()
    }
}

impl std::fmt::Debug for ReloadGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadGate")
            .field("change_id", &self.snapshot.load().change_id)
            .field("attempted", &self.attempted.load(Ordering::Relaxed))
            .finish()
    }
}
