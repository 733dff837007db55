//! Expiration Reaper Task
//!
//! Background task that periodically sweeps expired entries out of both
//! cache tiers. Purely an optimization — fetch already re-validates lazily —
//! but it bounds growth from entries that are stored and never re-fetched.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::AnalysisCache;

// == Reaper Handle ==
/// Controls a running reaper. Dropping the handle also stops the task, so a
/// forgotten reaper never outlives its owner.
#[derive(Debug)]
pub struct ReaperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Signals the reaper to stop and waits for it to finish its current
    /// sweep, releasing the timer.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }

    /// True once the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// == Spawn Reaper ==
/// Spawns the periodic expiration sweep.
///
/// The reaper competes for the same table lock as foreground callers; each
/// sweep holds it only for the memory scan, so callers wait at most one
/// critical section. The interval is taken from the caller rather than the
/// cache so tests can run tight loops.
pub fn spawn_reaper<T>(cache: AnalysisCache<T>, interval_secs: u64) -> ReaperHandle
where
    T: Send + Sync + 'static,
{
    let (shutdown, mut signal) = watch::channel(false);
    let interval = Duration::from_secs(interval_secs.max(1));

    let task = tokio::spawn(async move {
        info!(interval_secs, "reaper started");
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately; skip it
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = cache.clear_expired().await;
                    if removed > 0 {
                        info!(removed, "reaper removed expired entries");
                    } else {
                        debug!("reaper found no expired entries");
                    }
                }
                changed = signal.changed() => {
                    // a send or a dropped handle both end the loop
                    if changed.is_err() || *signal.borrow() {
                        info!("reaper shutting down");
                        break;
                    }
                }
            }
        }
    });

    ReaperHandle { shutdown, task }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    fn memory_only_cache() -> AnalysisCache<String> {
        AnalysisCache::new(CacheConfig {
            enable_file_tier: false,
            ..CacheConfig::default()
        })
    }

    #[tokio::test]
    async fn test_reaper_removes_expired_entries() {
        let cache = memory_only_cache();
        cache.store("expire_soon", "value".to_string(), Some(1)).await;

        let handle = spawn_reaper(cache.clone(), 1);

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(cache.stats().await.entries, 0);
        assert!(cache.stats().await.expired_cleanups >= 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reaper_preserves_live_entries() {
        let cache = memory_only_cache();
        cache.store("long_lived", "value".to_string(), Some(3600)).await;

        let handle = spawn_reaper(cache.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.fetch("long_lived").await.as_deref(), Some("value"));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reaper_shutdown_finishes_task() {
        let cache = memory_only_cache();

        let handle = spawn_reaper(cache, 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_reaper() {
        let cache = memory_only_cache();

        let handle = spawn_reaper(cache, 1);
        let task_probe = handle.task.abort_handle();
        drop(handle);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(task_probe.is_finished());
    }
}
