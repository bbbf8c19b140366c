//! In-memory stand-ins for the streaming service and the cache store.

use crate::error::{AppError, Result};
use crate::models::{Artist, LibraryPage, Playlist, Track};
use crate::services::cache_store::CacheStore;
use crate::services::gateway::{GatewayProvider, RemoteLibraryGateway, Session};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const VALID_TOKEN: &str = "valid-token";

pub fn track(id: &str, popularity: u8, artist_ids: &[&str]) -> Track {
    Track {
        id: id.to_string(),
        uri: format!("spotify:track:{}", id),
        popularity: Some(popularity),
        artists: artist_ids
            .iter()
            .map(|artist_id| Artist {
                id: artist_id.to_string(),
                name: format!("Artist {}", artist_id),
            })
            .collect(),
    }
}

#[derive(Debug, Clone)]
pub struct FakePlaylist {
    pub id: String,
    pub name: String,
    pub items: Vec<String>,
}

#[derive(Default)]
struct FakeState {
    library: Vec<Track>,
    page_size: usize,
    fail_library: bool,
    library_pages_served: usize,
    library_listings: usize,
    playlists: Vec<FakePlaylist>,
    artists: HashMap<String, Artist>,
    add_calls: Vec<(String, usize)>,
    failing_batches: HashMap<String, usize>,
    failing_clears: HashSet<String>,
    cleared: Vec<String>,
    created: Vec<String>,
    next_playlist: usize,
}

pub struct FakeGateway {
    owner_id: String,
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            state: Mutex::new(FakeState {
                page_size: 50,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with_tracks(self, tracks: Vec<Track>) -> Self {
        self.state().library = tracks;
        self
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state().page_size = page_size;
        self
    }

    pub fn with_playlist(self, id: &str, name: &str, items: &[&str]) -> Self {
        self.state().playlists.push(FakePlaylist {
            id: id.to_string(),
            name: name.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_artist(self, id: &str, name: &str) -> Self {
        self.state().artists.insert(
            id.to_string(),
            Artist {
                id: id.to_string(),
                name: name.to_string(),
            },
        );
        self
    }

    /// The `batch`-th insertion (1-based) into `playlist_id` returns an empty snapshot.
    pub fn fail_batch(&self, playlist_id: &str, batch: usize) {
        self.state().failing_batches.insert(playlist_id.to_string(), batch);
    }

    pub fn fail_clear(&self, playlist_id: &str) {
        self.state().failing_clears.insert(playlist_id.to_string());
    }

    pub fn set_library_failure(&self, fail: bool) {
        self.state().fail_library = fail;
    }

    /// Number of full library listings started (first-page requests).
    pub fn library_listings(&self) -> usize {
        self.state().library_listings
    }

    pub fn library_pages_served(&self) -> usize {
        self.state().library_pages_served
    }

    pub fn add_calls(&self) -> Vec<(String, usize)> {
        self.state().add_calls.clone()
    }

    pub fn add_calls_for(&self, playlist_id: &str) -> Vec<usize> {
        self.state()
            .add_calls
            .iter()
            .filter(|(id, _)| id == playlist_id)
            .map(|(_, len)| *len)
            .collect()
    }

    pub fn cleared(&self) -> Vec<String> {
        self.state().cleared.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.state().created.clone()
    }

    pub fn playlist(&self, id: &str) -> Option<FakePlaylist> {
        self.state().playlists.iter().find(|p| p.id == id).cloned()
    }

    pub fn playlist_named(&self, name: &str) -> Option<FakePlaylist> {
        self.state().playlists.iter().find(|p| p.name == name).cloned()
    }

    pub fn empty_playlist(&self, id: &str) {
        if let Some(playlist) = self.state().playlists.iter_mut().find(|p| p.id == id) {
            playlist.items.clear();
        }
    }

    pub fn session(self: &Arc<Self>) -> Session {
        Session {
            owner_id: self.owner_id.clone(),
            gateway: self.clone(),
        }
    }
}

fn to_playlist(playlist: &FakePlaylist) -> Playlist {
    Playlist {
        id: playlist.id.clone(),
        name: playlist.name.clone(),
        track_count: playlist.items.len() as u32,
    }
}

#[async_trait]
impl RemoteLibraryGateway for FakeGateway {
    async fn current_user_id(&self) -> Result<String> {
        Ok(self.owner_id.clone())
    }

    async fn list_library_tracks(&self, _owner_id: &str, page_token: Option<&str>) -> Result<LibraryPage> {
        let mut state = self.state();
        if state.fail_library {
            return Err(AppError::UpstreamFetch("library unavailable".to_string()));
        }

        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| AppError::Validation(format!("bad page token {}", token)))?,
            None => {
                state.library_listings += 1;
                0
            }
        };
        state.library_pages_served += 1;

        let end = (offset + state.page_size).min(state.library.len());
        let tracks = state.library[offset.min(end)..end].to_vec();
        let next_page_token = (end < state.library.len()).then(|| end.to_string());

        Ok(LibraryPage {
            tracks,
            next_page_token,
        })
    }

    async fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>> {
        Ok(self
            .state()
            .playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .map(to_playlist))
    }

    async fn list_user_playlists(&self, _owner_id: &str) -> Result<Vec<Playlist>> {
        Ok(self.state().playlists.iter().map(to_playlist).collect())
    }

    async fn create_playlist(&self, _owner_id: &str, name: &str) -> Result<Playlist> {
        let mut state = self.state();
        state.next_playlist += 1;
        let playlist = FakePlaylist {
            id: format!("created-{}", state.next_playlist),
            name: name.to_string(),
            items: Vec::new(),
        };
        state.created.push(name.to_string());
        state.playlists.push(playlist.clone());
        Ok(to_playlist(&playlist))
    }

    async fn add_items(&self, playlist_id: &str, uris: &[String]) -> Result<String> {
        let mut state = self.state();
        state.add_calls.push((playlist_id.to_string(), uris.len()));
        let batch = state
            .add_calls
            .iter()
            .filter(|(id, _)| id == playlist_id)
            .count();

        if state.failing_batches.get(playlist_id) == Some(&batch) {
            return Ok(String::new());
        }

        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| AppError::PlaylistNotFound(playlist_id.to_string()))?;
        playlist.items.extend(uris.iter().cloned());
        Ok(format!("snapshot-{}-{}", playlist_id, batch))
    }

    async fn remove_all_items(&self, playlist_id: &str) -> Result<bool> {
        let mut state = self.state();
        if state.failing_clears.contains(playlist_id) {
            return Ok(false);
        }
        state.cleared.push(playlist_id.to_string());
        match state.playlists.iter_mut().find(|p| p.id == playlist_id) {
            Some(playlist) => {
                playlist.items.clear();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_artist(&self, artist_id: &str) -> Result<Artist> {
        self.state()
            .artists
            .get(artist_id)
            .cloned()
            .ok_or_else(|| AppError::UpstreamFetch(format!("unknown artist {}", artist_id)))
    }
}

pub struct FakeGatewayProvider {
    gateway: Arc<FakeGateway>,
}

impl FakeGatewayProvider {
    pub fn new(gateway: Arc<FakeGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl GatewayProvider for FakeGatewayProvider {
    async fn connect(&self, access_token: &str) -> Result<Arc<dyn RemoteLibraryGateway>> {
        if access_token != VALID_TOKEN {
            return Err(AppError::Unauthorized);
        }
        Ok(self.gateway.clone())
    }
}

#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
    writes: Mutex<usize>,
}

impl InMemoryCacheStore {
    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn insert_raw(&self, key: &str, value: Vec<u8>) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, Instant::now() + Duration::from_secs(3600)));
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        *self.writes.lock().unwrap() += 1;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn flush_all(&self) -> Result<()> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}
