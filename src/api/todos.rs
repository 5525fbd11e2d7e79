use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::CurrentAdmin;
use crate::api::middleware::session::AppState;
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::todo::{
    CreateToDoData, ToDoBoard, ToDoItem, UpdateToDoData, PRIORITIES, STATUSES,
};
use crate::services::validation::{trimmed, FormValidator};

#[derive(Debug, Deserialize)]
pub struct CreateToDoRequest {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    #[serde(default)]
    pub assigned_admins: Vec<Uuid>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateToDoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub assigned_admins: Option<Vec<Uuid>>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ToDoStatusRequest {
    pub status: String,
}

/// Tasks can only be assigned to admins the current admin can see
fn check_assignees(v: &mut FormValidator, assignees: &[Uuid], scope: &[Uuid]) {
    v.check(
        assignees.iter().all(|id| scope.contains(id)),
        "Assigned admins must belong to your team",
    );
}

async fn find_item(state: &AppState, current: &CurrentAdmin, id: Uuid) -> Result<ToDoItem> {
    ToDoItem::find_in_scope(&state.pool, id, &current.scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

async fn board(
    State(state): State<AppState>,
    current: CurrentAdmin,
) -> Result<ApiResponse<ToDoBoard>> {
    let items = ToDoItem::list_in_scope(&state.pool, &current.scope).await?;
    Ok(ApiResponse::ok("Tasks fetched", ToDoBoard::from_items(items)))
}

async fn get_item(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<ToDoItem>> {
    let item = find_item(&state, &current, id).await?;
    Ok(ApiResponse::ok("Task fetched", item))
}

async fn create_item(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Json(req): Json<CreateToDoRequest>,
) -> Result<ApiResponse<ToDoItem>> {
    let priority = trimmed(req.priority).unwrap_or_else(|| "medium".to_string());

    let mut v = FormValidator::new();
    v.required("Title", &req.title)
        .one_of("Priority", &priority, PRIORITIES);
    check_assignees(&mut v, &req.assigned_admins, &current.scope);
    v.finish()?;

    let item = ToDoItem::create(
        &state.pool,
        CreateToDoData {
            title: req.title.trim().to_string(),
            description: trimmed(req.description),
            priority,
            assigned_admins: req.assigned_admins,
            due_date: req.due_date,
            created_by: current.id(),
        },
    )
    .await?;

    tracing::info!(todo_id = %item.id, created_by = %current.id(), "Task created");

    Ok(ApiResponse::created("Task created", item))
}

async fn update_item(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateToDoRequest>,
) -> Result<ApiResponse<ToDoItem>> {
    let item = find_item(&state, &current, id).await?;

    let mut v = FormValidator::new();
    if let Some(title) = &req.title {
        v.required("Title", title);
    }
    if let Some(priority) = &req.priority {
        v.one_of("Priority", priority, PRIORITIES);
    }
    if let Some(assignees) = &req.assigned_admins {
        check_assignees(&mut v, assignees, &current.scope);
    }
    if let Some(order) = req.sort_order {
        v.check(order >= 0, "Sort order cannot be negative");
    }
    v.finish()?;

    let item = ToDoItem::update(
        &state.pool,
        item.id,
        UpdateToDoData {
            title: trimmed(req.title),
            description: trimmed(req.description),
            priority: req.priority,
            assigned_admins: req.assigned_admins,
            due_date: req.due_date,
            sort_order: req.sort_order,
        },
    )
    .await?;

    tracing::info!(todo_id = %item.id, updated_by = %current.id(), "Task updated");

    Ok(ApiResponse::ok("Task updated", item))
}

async fn set_item_status(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<ToDoStatusRequest>,
) -> Result<ApiResponse<ToDoItem>> {
    let status = req.status.trim();
    FormValidator::new()
        .one_of("Status", status, STATUSES)
        .finish()?;

    let item = find_item(&state, &current, id).await?;
    let item = ToDoItem::set_status(&state.pool, item.id, status).await?;

    tracing::info!(todo_id = %item.id, status = %status, "Task moved");

    Ok(ApiResponse::ok("Task status updated", item))
}

async fn delete_item(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    let item = find_item(&state, &current, id).await?;

    ToDoItem::soft_delete(&state.pool, item.id, current.id()).await?;
    tracing::info!(todo_id = %item.id, deleted_by = %current.id(), "Task deleted");

    Ok(ApiResponse::message_only("Task deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/todos", get(board).post(create_item))
        .route(
            "/api/admin/todos/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/api/admin/todos/:id/status", put(set_item_status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignees_must_be_in_scope() {
        let me = Uuid::new_v4();
        let teammate = Uuid::new_v4();
        let scope = vec![me, teammate];

        let mut v = FormValidator::new();
        check_assignees(&mut v, &[teammate], &scope);
        assert!(v.finish().is_ok());

        let mut v = FormValidator::new();
        check_assignees(&mut v, &[teammate, Uuid::new_v4()], &scope);
        assert!(v.finish().is_err());
    }
}
