pub mod library;
pub mod middleware;
pub mod sync;

pub use library::library_routes;
pub use sync::sync_routes;

use crate::services::{GatewayProvider, LibraryCache, PlaylistSynchronizer};
use axum::Router;
use std::sync::Arc;

pub struct AppState {
    pub library: LibraryCache,
    pub synchronizer: Arc<PlaylistSynchronizer>,
    pub gateways: Arc<dyn GatewayProvider>,
}

/// All API routes, mounted under `/api/v1`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new().nest(
        "/api/v1",
        Router::new()
            .merge(sync_routes())
            .merge(library_routes())
            .with_state(state),
    )
}
