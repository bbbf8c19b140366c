use crate::api::middleware::RequireSession;
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{SyncReport, SyncScope};
use crate::services::Session;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use std::sync::Arc;

pub fn sync_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync/global", post(sync_global))
        .route("/sync/global/:label", post(sync_global_bucket))
        .route("/sync/artist/:artist_id", post(sync_artist))
        .route("/sync/minor", post(sync_minor))
}

async fn sync_global(
    State(state): State<Arc<AppState>>,
    RequireSession(session): RequireSession,
) -> Result<(StatusCode, Json<SyncReport>)> {
    run(&state, &session, SyncScope::Global).await
}

async fn sync_global_bucket(
    State(state): State<Arc<AppState>>,
    RequireSession(session): RequireSession,
    Path(label): Path<String>,
) -> Result<(StatusCode, Json<SyncReport>)> {
    run(&state, &session, SyncScope::GlobalBucket { label }).await
}

async fn sync_artist(
    State(state): State<Arc<AppState>>,
    RequireSession(session): RequireSession,
    Path(artist_id): Path<String>,
) -> Result<(StatusCode, Json<SyncReport>)> {
    let artist_id = artist_id.trim().to_string();
    if artist_id.is_empty() {
        return Err(AppError::Validation("artist id must not be empty".to_string()));
    }

    run(&state, &session, SyncScope::Artist { artist_id }).await
}

async fn sync_minor(
    State(state): State<Arc<AppState>>,
    RequireSession(session): RequireSession,
) -> Result<(StatusCode, Json<SyncReport>)> {
    run(&state, &session, SyncScope::MinorArtists).await
}

/// 200 when every bucket succeeded, 207 when some failed.
async fn run(
    state: &AppState,
    session: &Session,
    scope: SyncScope,
) -> Result<(StatusCode, Json<SyncReport>)> {
    let report = state.synchronizer.sync(session, &scope).await?;
    let status = if report.overall_success {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };

    Ok((status, Json(report)))
}
