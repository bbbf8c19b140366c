use crate::services::cache_store::CacheStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn the periodic cache flush. A zero interval disables it and returns `None`.
///
/// Readers holding a library already keep it; the next lookup after a flush
/// is a miss and refetches.
pub fn spawn_cache_reset(store: Arc<dyn CacheStore>, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        tracing::info!("Cache reset disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        tracing::info!("Cache reset task started, flushing every {}s", interval.as_secs_f64());

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.flush_all().await {
                Ok(()) => tracing::info!("Cache flushed"),
                Err(e) => tracing::error!("Cache reset failed: {}", e),
            }
        }
    }))
}
