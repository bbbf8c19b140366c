use crate::error::Result;
use crate::models::{Artist, LibraryPage, Playlist};
use async_trait::async_trait;
use std::sync::Arc;

/// Capabilities the sync engine needs from the streaming service.
#[async_trait]
pub trait RemoteLibraryGateway: Send + Sync {
    async fn current_user_id(&self) -> Result<String>;

    /// Pass `None` for the first page, then the returned token until it is `None`.
    async fn list_library_tracks(&self, owner_id: &str, page_token: Option<&str>) -> Result<LibraryPage>;

    async fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>>;

    async fn list_user_playlists(&self, owner_id: &str) -> Result<Vec<Playlist>>;

    async fn create_playlist(&self, owner_id: &str, name: &str) -> Result<Playlist>;

    /// Returns the confirmation (snapshot) token. An empty token means the
    /// remote did not accept the batch.
    async fn add_items(&self, playlist_id: &str, uris: &[String]) -> Result<String>;

    async fn remove_all_items(&self, playlist_id: &str) -> Result<bool>;

    async fn get_artist(&self, artist_id: &str) -> Result<Artist>;
}

/// Builds a gateway bound to one caller's access token.
#[async_trait]
pub trait GatewayProvider: Send + Sync {
    async fn connect(&self, access_token: &str) -> Result<Arc<dyn RemoteLibraryGateway>>;
}

/// An authenticated caller: the owner id and the gateway acting on their behalf.
#[derive(Clone)]
pub struct Session {
    pub owner_id: String,
    pub gateway: Arc<dyn RemoteLibraryGateway>,
}

impl Session {
    pub async fn open(gateway: Arc<dyn RemoteLibraryGateway>) -> Result<Self> {
        let owner_id = gateway.current_user_id().await?;
        Ok(Self { owner_id, gateway })
    }
}
