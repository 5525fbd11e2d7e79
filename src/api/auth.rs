use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::middleware::auth::CurrentAdmin;
use crate::api::middleware::session::{AppState, SESSION_KEY_ADMIN_ID, SESSION_KEY_LOGGED_IN_AT};
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::Admin;
use crate::services::password;
use crate::services::validation::FormValidator;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Logs an admin in with email and password
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<ApiResponse<Admin>> {
    FormValidator::new()
        .required("Email", &req.email)
        .required("Password", &req.password)
        .finish()?;

    let pepper = state
        .config
        .password_pepper
        .as_ref()
        .map(|p| p.expose_secret().as_str());

    let Some(admin) = Admin::find_by_email(&state.pool, req.email.trim()).await? else {
        password::simulate_verify(&req.password, pepper);
        tracing::warn!("Login rejected: unknown account");
        return Err(AppError::Unauthorized);
    };

    let valid = password::verify_password(&req.password, pepper, &admin.password_hash)
        .map_err(|e| AppError::Internal(e.into()))?;

    if !valid {
        tracing::warn!(admin_id = %admin.id, "Login rejected: wrong password");
        return Err(AppError::Unauthorized);
    }

    // New session id on login
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session error: {}", e)))?;
    session
        .insert(SESSION_KEY_ADMIN_ID, admin.id)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session error: {}", e)))?;
    session
        .insert(SESSION_KEY_LOGGED_IN_AT, Utc::now().timestamp())
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session error: {}", e)))?;

    tracing::info!(admin_id = %admin.id, role = %admin.role, "Admin logged in");

    Ok(ApiResponse::ok("Login successful", admin))
}

async fn logout(session: Session) -> Result<ApiResponse<()>> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session error: {}", e)))?;

    Ok(ApiResponse::message_only("Logged out"))
}

async fn me(current: CurrentAdmin) -> Result<ApiResponse<Admin>> {
    Ok(ApiResponse::ok("Admin profile fetched", current.admin))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/auth/login", post(login))
        .route("/api/admin/auth/logout", post(logout))
        .route("/api/admin/auth/me", get(me))
}
