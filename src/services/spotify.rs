use crate::error::{AppError, Result};
use crate::models::{Artist, LibraryPage, Playlist, Track};
use crate::services::gateway::{GatewayProvider, RemoteLibraryGateway};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const PAGE_LIMIT: u32 = 50;

/// Spotify Web API client bound to a single user's access token.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    base_url: String,
    access_token: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SavedTrackObject {
    track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: Option<String>,
    uri: String,
    popularity: Option<u8>,
    #[serde(default)]
    artists: Vec<ArtistObject>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistObject {
    id: String,
    name: String,
    tracks: Option<PlaylistTracksRef>,
    #[serde(default)]
    owner: Option<OwnerObject>,
}

#[derive(Debug, Deserialize)]
struct OwnerObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistTracksRef {
    total: u32,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    #[serde(default)]
    snapshot_id: String,
}

#[derive(Debug, Deserialize)]
struct UserObject {
    id: String,
}

impl From<PlaylistObject> for Playlist {
    fn from(playlist: PlaylistObject) -> Self {
        Playlist {
            id: playlist.id,
            name: playlist.name,
            track_count: playlist.tracks.map(|t| t.total).unwrap_or(0),
        }
    }
}

impl TrackObject {
    /// Local files have no id and cannot be added to playlists.
    fn into_track(self) -> Option<Track> {
        let id = self.id?;
        Some(Track {
            id,
            uri: self.uri,
            popularity: self.popularity,
            artists: self
                .artists
                .into_iter()
                .filter_map(|artist| {
                    artist.id.map(|id| Artist {
                        id,
                        name: artist.name,
                    })
                })
                .collect(),
        })
    }
}

impl SpotifyClient {
    pub fn new(base_url: String, access_token: String, client: Client) -> Self {
        Self {
            base_url,
            access_token,
            client,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::UpstreamFetch(format!("Request failed: {}", e)))?;

        Self::decode(Self::check(response).await?).await
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("Spotify API error: {} - {}", status, body);
        Err(AppError::UpstreamFetch(format!(
            "API returned status: {} - {}",
            status,
            body.chars().take(200).collect::<String>()
        )))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::UpstreamFetch(format!("Failed to parse response: {}", e)))
    }

    /// Page tokens must point at the configured API origin and stay under its path.
    fn ensure_api_url<'a>(&self, url: &'a str) -> Result<&'a str> {
        let unexpected = || AppError::Validation(format!("Unexpected page token: {}", url));

        let base = Url::parse(&self.base_url).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Invalid API base URL {}: {}", self.base_url, e))
        })?;
        let candidate = Url::parse(url).map_err(|_| unexpected())?;

        let same_origin = candidate.scheme() == base.scheme()
            && candidate.host_str() == base.host_str()
            && candidate.port_or_known_default() == base.port_or_known_default();

        let base_path = base.path().trim_end_matches('/');
        let under_base = base_path.is_empty()
            || candidate.path() == base_path
            || candidate.path().starts_with(&format!("{}/", base_path));

        if same_origin && under_base {
            Ok(url)
        } else {
            Err(unexpected())
        }
    }
}

/// `/users/{id}/playlists` also returns playlists the user only follows.
fn owned_playlists(items: Vec<PlaylistObject>, owner_id: &str) -> Vec<Playlist> {
    items
        .into_iter()
        .filter(|p| p.owner.as_ref().map(|o| o.id == owner_id).unwrap_or(false))
        .map(Playlist::from)
        .collect()
}

#[async_trait]
impl RemoteLibraryGateway for SpotifyClient {
    async fn current_user_id(&self) -> Result<String> {
        let user: UserObject = self.get_json(&format!("{}/me", self.base_url)).await?;
        Ok(user.id)
    }

    async fn list_library_tracks(&self, _owner_id: &str, page_token: Option<&str>) -> Result<LibraryPage> {
        // Saved tracks are always the token holder's; the owner id only keys the cache.
        let url = match page_token {
            Some(token) => self.ensure_api_url(token)?.to_string(),
            None => format!("{}/me/tracks?limit={}", self.base_url, PAGE_LIMIT),
        };

        let page: Paging<SavedTrackObject> = self.get_json(&url).await?;

        Ok(LibraryPage {
            tracks: page
                .items
                .into_iter()
                .filter_map(|saved| saved.track.and_then(TrackObject::into_track))
                .collect(),
            next_page_token: page.next,
        })
    }

    async fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>> {
        let url = format!(
            "{}/playlists/{}?fields=id,name,tracks.total",
            self.base_url, playlist_id
        );
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::UpstreamFetch(format!("Request failed: {}", e)))?;

        // Malformed ids come back as 400 rather than 404.
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST) {
            return Ok(None);
        }

        let playlist: PlaylistObject = Self::decode(Self::check(response).await?).await?;
        Ok(Some(playlist.into()))
    }

    async fn list_user_playlists(&self, owner_id: &str) -> Result<Vec<Playlist>> {
        let mut playlists = Vec::new();
        let mut next = Some(format!(
            "{}/users/{}/playlists?limit={}",
            self.base_url, owner_id, PAGE_LIMIT
        ));

        while let Some(url) = next {
            let page: Paging<PlaylistObject> = self.get_json(self.ensure_api_url(&url)?).await?;
            playlists.extend(owned_playlists(page.items, owner_id));
            next = page.next;
        }

        Ok(playlists)
    }

    async fn create_playlist(&self, owner_id: &str, name: &str) -> Result<Playlist> {
        let url = format!("{}/users/{}/playlists", self.base_url, owner_id);
        tracing::debug!("POST {} ({})", url, name);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "name": name, "public": false }))
            .send()
            .await
            .map_err(|e| AppError::UpstreamFetch(format!("Request failed: {}", e)))?;

        let playlist: PlaylistObject = Self::decode(Self::check(response).await?).await?;
        Ok(playlist.into())
    }

    async fn add_items(&self, playlist_id: &str, uris: &[String]) -> Result<String> {
        let url = format!("{}/playlists/{}/tracks", self.base_url, playlist_id);
        tracing::debug!("POST {} ({} items)", url, uris.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "uris": uris }))
            .send()
            .await
            .map_err(|e| AppError::UpstreamFetch(format!("Request failed: {}", e)))?;

        let snapshot: SnapshotResponse = Self::decode(Self::check(response).await?).await?;
        Ok(snapshot.snapshot_id)
    }

    async fn remove_all_items(&self, playlist_id: &str) -> Result<bool> {
        // Replacing the item list with nothing empties the playlist in one call.
        let url = format!("{}/playlists/{}/tracks", self.base_url, playlist_id);
        tracing::debug!("PUT {} (clear)", url);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "uris": [] }))
            .send()
            .await
            .map_err(|e| AppError::UpstreamFetch(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized);
        }
        if !status.is_success() {
            tracing::warn!("Clearing playlist {} returned {}", playlist_id, status);
        }
        Ok(status.is_success())
    }

    async fn get_artist(&self, artist_id: &str) -> Result<Artist> {
        let artist: ArtistObject = self
            .get_json(&format!("{}/artists/{}", self.base_url, artist_id))
            .await?;

        Ok(Artist {
            id: artist.id.unwrap_or_else(|| artist_id.to_string()),
            name: artist.name,
        })
    }
}

/// Hands out [`SpotifyClient`]s that share one connection pool.
#[derive(Debug, Clone)]
pub struct SpotifyGatewayProvider {
    base_url: String,
    client: Client,
}

impl SpotifyGatewayProvider {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl GatewayProvider for SpotifyGatewayProvider {
    async fn connect(&self, access_token: &str) -> Result<Arc<dyn RemoteLibraryGateway>> {
        if access_token.trim().is_empty() {
            return Err(AppError::Unauthorized);
        }

        Ok(Arc::new(SpotifyClient::new(
            self.base_url.clone(),
            access_token.to_string(),
            self.client.clone(),
        )))
    }
}
