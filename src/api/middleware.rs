use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::services::Session;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

/// The caller's session, built from their bearer token.
pub struct RequireSession(pub Session);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let gateway = state.gateways.connect(token).await?;
        let session = Session::open(gateway).await?;

        Ok(RequireSession(session))
    }
}
