use crate::error::Result;
use crate::models::{CachedLibrary, Track};
use crate::services::cache_store::CacheStore;
use crate::services::gateway::RemoteLibraryGateway;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cache-aside access to a user's full saved-track library.
///
/// Entries are written last-writer-wins with no locking: two concurrent
/// misses for the same owner both fetch upstream and the later write sticks.
/// The periodic flush in [`crate::services::cache_reset`] may drop entries at
/// any time; the next read simply misses.
#[derive(Clone)]
pub struct LibraryCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl LibraryCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn cache_key(owner_id: &str) -> String {
        format!("library:{}", owner_id)
    }

    pub async fn get_library(
        &self,
        gateway: &dyn RemoteLibraryGateway,
        owner_id: &str,
    ) -> Result<CachedLibrary> {
        let key = Self::cache_key(owner_id);

        if let Some(library) = self.read(&key).await {
            debug!("Library cache hit for {} ({} tracks)", owner_id, library.tracks.len());
            return Ok(library);
        }

        info!("Library cache miss for {}, fetching from upstream", owner_id);
        let tracks = fetch_all_tracks(gateway, owner_id).await?;

        let library = CachedLibrary {
            owner_id: owner_id.to_string(),
            tracks,
            fetched_at: Utc::now(),
            ttl_secs: self.ttl.as_secs(),
        };

        match serde_json::to_vec(&library) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(&key, bytes, self.ttl).await {
                    warn!("Failed to cache library for {}: {}", owner_id, e);
                }
            }
            Err(e) => warn!("Failed to serialize library for {}: {}", owner_id, e),
        }

        Ok(library)
    }

    pub async fn invalidate(&self, owner_id: &str) -> Result<()> {
        info!("Invalidating cached library for {}", owner_id);
        self.store.delete(&Self::cache_key(owner_id)).await
    }

    /// Store errors and unreadable or stale entries all count as a miss.
    async fn read(&self, key: &str) -> Option<CachedLibrary> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read for {} failed, treating as miss: {}", key, e);
                return None;
            }
        };

        let library: CachedLibrary = match serde_json::from_slice(&bytes) {
            Ok(library) => library,
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", key, e);
                return None;
            }
        };

        if library.is_expired(Utc::now()) {
            debug!("Cache entry {} outlived its TTL", key);
            return None;
        }

        Some(library)
    }
}

/// Walks every page of the saved-tracks listing.
pub async fn fetch_all_tracks(gateway: &dyn RemoteLibraryGateway, owner_id: &str) -> Result<Vec<Track>> {
    let mut tracks = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = gateway
            .list_library_tracks(owner_id, page_token.as_deref())
            .await?;
        pages += 1;
        tracks.extend(page.tracks);

        match page.next_page_token {
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    info!("Fetched {} tracks in {} pages for {}", tracks.len(), pages, owner_id);
    Ok(tracks)
}
