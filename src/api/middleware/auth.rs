use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;
use uuid::Uuid;

use super::session::{AppState, SESSION_KEY_ADMIN_ID};
use crate::error::AppError;
use crate::models::Admin;

fn session_error(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(anyhow::anyhow!("Session error: {}", e))
}

/// Middleware that requires an admin to be logged in
pub async fn require_auth(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let admin_id: Option<Uuid> = session
        .get(SESSION_KEY_ADMIN_ID)
        .await
        .map_err(session_error)?;

    if admin_id.is_none() {
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// The logged-in admin together with the admin ids whose records they may see
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub admin: Admin,
    pub scope: Vec<Uuid>,
}

impl CurrentAdmin {
    pub fn id(&self) -> Uuid {
        self.admin.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| session_error(msg))?;

        let admin_id: Uuid = session
            .get(SESSION_KEY_ADMIN_ID)
            .await
            .map_err(session_error)?
            .ok_or(AppError::Unauthorized)?;

        // Admin may have been deleted since logging in
        let admin = Admin::find_by_id(&state.pool, admin_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let scope = Admin::scope_ids(&state.pool, &admin).await?;

        Ok(CurrentAdmin { admin, scope })
    }
}
