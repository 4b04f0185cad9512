//! Lazy write-behind task for the save-set store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::storage::store::SaveSetStore;

/// How often the writer checks for work.
pub const WRITER_TICK: Duration = Duration::from_secs(5);

/// Flushes the store once `interval` has passed since the last change,
/// and one final time on shutdown.
pub struct LazyWriter {
    store: Arc<dyn SaveSetStore>,
    interval: Duration,
    tick: Duration,
}

impl LazyWriter {
    pub fn new(store: Arc<dyn SaveSetStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            tick: WRITER_TICK,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run until `shutdown` fires (or its sender is dropped).
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            "Store writer started"
        );
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let due = self
                        .store
                        .last_change()
                        .is_some_and(|at| at.elapsed() >= self.interval);
                    if due {
                        self.flush().await;
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Store writer stopping, writing unsaved data");
                    self.flush().await;
                    return;
                }
            }
        }
    }

    async fn flush(&self) {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.flush_if_dirty()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Error in store writer"),
            Err(e) => tracing::error!(error = %e, "Store writer task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::FileStore;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_flushes_after_interval() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let (tx, rx) = broadcast::channel(1);

        let writer = LazyWriter::new(store.clone(), Duration::from_millis(20))
            .with_tick(Duration::from_millis(10));
        let handle = tokio::spawn(writer.run(rx));

        store.save("a", Bytes::from_static(b"{}")).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(dir.path().join("ss_a.json").exists());

        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_final_flush_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let (tx, rx) = broadcast::channel(1);

        let writer = LazyWriter::new(store.clone(), Duration::from_secs(3600));
        let handle = tokio::spawn(writer.run(rx));

        store.save("late", Bytes::from_static(b"{}")).unwrap();
        tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(dir.path().join("ss_late.json").exists());
    }
}
