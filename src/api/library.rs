use crate::api::middleware::RequireSession;
use crate::api::AppState;
use crate::error::Result;
use crate::models::{ArtistSummary, LibraryInfo, Playlist};
use crate::services::classifier::artist_summary;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub fn library_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/library", get(library_info))
        .route("/library/artists", get(library_artists))
        .route("/library/cache", delete(invalidate_cache))
        .route("/playlists", get(list_playlists))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn library_info(
    State(state): State<Arc<AppState>>,
    RequireSession(session): RequireSession,
) -> Result<Json<LibraryInfo>> {
    let library = state
        .library
        .get_library(session.gateway.as_ref(), &session.owner_id)
        .await?;

    Ok(Json(LibraryInfo::from(&library)))
}

async fn library_artists(
    State(state): State<Arc<AppState>>,
    RequireSession(session): RequireSession,
) -> Result<Json<Vec<ArtistSummary>>> {
    let library = state
        .library
        .get_library(session.gateway.as_ref(), &session.owner_id)
        .await?;

    Ok(Json(artist_summary(&library.tracks)))
}

async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    RequireSession(session): RequireSession,
) -> Result<StatusCode> {
    state.library.invalidate(&session.owner_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Playlists owned by the caller.
async fn list_playlists(RequireSession(session): RequireSession) -> Result<Json<Vec<Playlist>>> {
    let playlists = session.gateway.list_user_playlists(&session.owner_id).await?;
    Ok(Json(playlists))
}
