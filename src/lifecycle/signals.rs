//! OS signal handling.
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGINT/SIGTERM trigger graceful shutdown
//! - SIGHUP marks the configuration as changed, it does not shut down

use crate::config::ChangeCounter;
use crate::lifecycle::shutdown::Shutdown;

/// Wait for a termination signal, then trigger `shutdown`.
///
/// On unix, SIGHUP bumps `changes` so the next request rebuilds the configuration.
pub async fn watch_signals(shutdown: Shutdown, changes: ChangeCounter) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut term, mut hup) = match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(term), Ok(hup)) => (term, hup),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Cannot install unix signal handlers, using Ctrl+C only");
                wait_for_ctrl_c().await;
                shutdown.trigger();
                return;
            }
        };

        loop {
            tokio::select! {
                _ = wait_for_ctrl_c() => break,
                _ = term.recv() => break,
                _ = hup.recv() => {
                    let id = changes.bump();
                    tracing::info!(change_id = id, "SIGHUP received, configuration marked as changed");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = &changes;
        wait_for_ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
