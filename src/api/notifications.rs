use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::CurrentAdmin;
use crate::api::middleware::session::AppState;
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::notification::{Notification, NotificationView, CATEGORIES};
use crate::services::validation::{trimmed, FormValidator};

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub unread: usize,
    pub notifications: Vec<NotificationView>,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub marked: u64,
}

async fn list_notifications(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<NotificationListQuery>,
) -> Result<ApiResponse<NotificationList>> {
    let category = trimmed(query.category);
    if let Some(category) = &category {
        FormValidator::new()
            .one_of("Category", category, CATEGORIES)
            .finish()?;
    }

    let notifications = Notification::list_for_admin(
        &state.pool,
        &current.scope,
        current.id(),
        category.as_deref(),
    )
    .await?;
    let unread = notifications.iter().filter(|n| !n.is_read).count();

    Ok(ApiResponse::ok(
        "Notifications fetched",
        NotificationList {
            unread,
            notifications,
        },
    ))
}

async fn mark_read(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    if !Notification::exists_in_scope(&state.pool, id, &current.scope).await? {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    Notification::mark_read(&state.pool, id, current.id()).await?;
    Ok(ApiResponse::message_only("Notification marked as read"))
}

async fn mark_all_read(
    State(state): State<AppState>,
    current: CurrentAdmin,
) -> Result<ApiResponse<MarkedRead>> {
    let marked = Notification::mark_all_read(&state.pool, &current.scope, current.id()).await?;
    tracing::debug!(admin_id = %current.id(), marked, "Notifications marked as read");

    Ok(ApiResponse::ok(
        "All notifications marked as read",
        MarkedRead { marked },
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/notifications", get(list_notifications))
        .route("/api/admin/notifications/read-all", post(mark_all_read))
        .route("/api/admin/notifications/:id/read", post(mark_read))
}
