//! Settings and template file watcher for hot reload.
//!
//! The watcher does not load anything itself. It only bumps the shared
//! `ChangeCounter`; the `ReloadGate` rebuilds on the next request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::reload::ChangeCounter;
use crate::templates::is_template_file;

/// Watches the settings file and the templates directory.
pub struct ConfigWatcher {
    settings: PathBuf,
    templates: Option<PathBuf>,
    changes: ChangeCounter,
}

impl ConfigWatcher {
    pub fn new(settings: &Path, changes: ChangeCounter) -> Self {
        Self {
            settings: settings.to_path_buf(),
            templates: None,
            changes,
        }
    }

    /// Also watch a templates directory (if it exists when `run` is called).
    pub fn with_templates(mut self, dir: &Path) -> Self {
        self.templates = Some(dir.to_path_buf());
        self
    }

    /// Start watching in a background thread. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let changes = self.changes.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_relevant(&event) {
                        let id = changes.bump();
                        tracing::info!(change_id = id, paths = ?event.paths, "Configuration change detected");
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.settings, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.settings, "Config watcher started");

        if let Some(dir) = self.templates.as_ref().filter(|d| d.is_dir()) {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            tracing::info!(path = ?dir, "Template watcher started");
        }

        Ok(watcher)
    }
}

fn is_relevant(event: &Event) -> bool {
    let kind = &event.kind;
    if !(kind.is_modify() || kind.is_create() || kind.is_remove()) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|p| p.extension().and_then(|e| e.to_str()) == Some("toml") || is_template_file(p))
}
