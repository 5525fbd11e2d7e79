use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::CurrentAdmin;
use crate::api::middleware::session::AppState;
use crate::api::response::ApiResponse;
use crate::db::is_unique_violation;
use crate::error::{AppError, Result};
use crate::models::admin::{Admin, CreateAdminData, UpdateAdminData, ROLES};
use crate::services::password;
use crate::services::validation::{trimmed, FormValidator};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdminRequest {
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

fn hash(state: &AppState, plain: &str) -> Result<String> {
    let pepper = state
        .config
        .password_pepper
        .as_ref()
        .map(|p| p.expose_secret().as_str());
    password::hash_password(plain, pepper).map_err(|e| AppError::Internal(e.into()))
}

fn email_taken(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("An admin with this email already exists".to_string())
    } else {
        AppError::Database(e)
    }
}

async fn find_visible(state: &AppState, current: &CurrentAdmin, id: Uuid) -> Result<Admin> {
    Admin::find_by_id(&state.pool, id)
        .await?
        .filter(|a| a.scope_root() == current.admin.scope_root())
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))
}

async fn list_admins(
    State(state): State<AppState>,
    current: CurrentAdmin,
) -> Result<ApiResponse<Vec<Admin>>> {
    let admins = Admin::list_in_scope(&state.pool, current.admin.scope_root()).await?;
    Ok(ApiResponse::ok("Admins fetched", admins))
}

async fn get_admin(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Admin>> {
    let admin = find_visible(&state, &current, id).await?;
    Ok(ApiResponse::ok("Admin fetched", admin))
}

async fn create_admin(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Json(req): Json<CreateAdminRequest>,
) -> Result<ApiResponse<Admin>> {
    if !current.admin.can_manage_admins() {
        return Err(AppError::Forbidden(
            "Only super admins can create admins".to_string(),
        ));
    }

    FormValidator::new()
        .required("First name", &req.first_name)
        .required("Last name", &req.last_name)
        .required("Email", &req.email)
        .email("Email", &req.email)
        .one_of("Role", &req.role, ROLES)
        .check(
            req.password.chars().count() >= MIN_PASSWORD_LEN,
            "Password must be at least 8 characters",
        )
        .finish()?;

    let admin = Admin::create(
        &state.pool,
        CreateAdminData {
            super_admin_id: Some(current.admin.scope_root()),
            role: req.role,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email: req.email.trim().to_string(),
            phone: trimmed(req.phone),
            password_hash: hash(&state, &req.password)?,
        },
    )
    .await
    .map_err(email_taken)?;

    tracing::info!(admin_id = %admin.id, created_by = %current.id(), "Admin created");

    Ok(ApiResponse::created("Admin created", admin))
}

async fn update_admin(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAdminRequest>,
) -> Result<ApiResponse<Admin>> {
    let target = find_visible(&state, &current, id).await?;

    if target.id != current.id() && !current.admin.can_manage_admins() {
        return Err(AppError::Forbidden(
            "You can only edit your own profile".to_string(),
        ));
    }

    let mut v = FormValidator::new();
    if let Some(role) = &req.role {
        v.one_of("Role", role, ROLES);
        // Role changes are an admin-management action
        v.check(
            current.admin.can_manage_admins(),
            "Only super admins can change roles",
        );
    }
    if let Some(email) = &req.email {
        v.email("Email", email);
    }
    if let Some(pw) = &req.password {
        v.check(
            pw.chars().count() >= MIN_PASSWORD_LEN,
            "Password must be at least 8 characters",
        );
    }
    v.finish()?;

    let password_hash = match &req.password {
        Some(pw) => Some(hash(&state, pw)?),
        None => None,
    };

    let admin = Admin::update(
        &state.pool,
        target.id,
        UpdateAdminData {
            role: req.role,
            first_name: trimmed(req.first_name),
            last_name: trimmed(req.last_name),
            email: trimmed(req.email),
            phone: trimmed(req.phone),
            password_hash,
        },
    )
    .await
    .map_err(email_taken)?;

    tracing::info!(admin_id = %admin.id, updated_by = %current.id(), "Admin updated");

    Ok(ApiResponse::ok("Admin updated", admin))
}

async fn delete_admin(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    if !current.admin.can_manage_admins() {
        return Err(AppError::Forbidden(
            "Only super admins can delete admins".to_string(),
        ));
    }
    if id == current.id() {
        return Err(AppError::Conflict("You cannot delete yourself".to_string()));
    }

    let target = find_visible(&state, &current, id).await?;
    if target.super_admin_id.is_none() {
        return Err(AppError::Forbidden(
            "The account owner cannot be deleted".to_string(),
        ));
    }

    Admin::soft_delete(&state.pool, target.id, current.id()).await?;
    tracing::info!(admin_id = %target.id, deleted_by = %current.id(), "Admin deleted");

    Ok(ApiResponse::message_only("Admin deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/admins", get(list_admins).post(create_admin))
        .route(
            "/api/admin/admins/:id",
            get(get_admin).put(update_admin).delete(delete_admin),
        )
}
