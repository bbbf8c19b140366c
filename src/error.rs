use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid popularity range: {0}")]
    InvalidRange(String),

    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),

    #[error("Playlist is not empty: {0}")]
    PlaylistNotEmpty(String),

    #[error("Sync already in progress for {0}")]
    SyncInProgress(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRange(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamFetch(_) => StatusCode::BAD_GATEWAY,
            AppError::PlaylistNotFound(_) => StatusCode::NOT_FOUND,
            AppError::PlaylistNotEmpty(_) | AppError::SyncInProgress(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Redis(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {:?}", e);
                "Cache error".to_string()
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::UpstreamFetch(ref msg) => {
                tracing::warn!("Upstream error: {}", msg);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
