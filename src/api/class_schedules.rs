use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveTime;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::CurrentAdmin;
use crate::api::middleware::session::AppState;
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::class_schedule::{
    adjusted_capacity, ClassSchedule, CreateClassScheduleData, UpdateClassScheduleData, DAYS,
    STATUS_CANCELLED,
};
use crate::models::Venue;
use crate::services::validation::{trimmed, FormValidator};

const MAX_CAPACITY: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct ClassListQuery {
    pub venue_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClassRequest {
    pub venue_id: Uuid,
    pub class_name: String,
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_capacity: i32,
    #[serde(default)]
    pub allow_free_trial: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClassRequest {
    pub class_name: Option<String>,
    pub day: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub total_capacity: Option<i32>,
    pub allow_free_trial: Option<bool>,
}

async fn find_class(state: &AppState, current: &CurrentAdmin, id: Uuid) -> Result<ClassSchedule> {
    ClassSchedule::find_in_scope(&state.pool, id, &current.scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Class schedule not found".to_string()))
}

async fn list_classes(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<ClassListQuery>,
) -> Result<ApiResponse<Vec<ClassSchedule>>> {
    let classes = ClassSchedule::list_in_scope(&state.pool, &current.scope, query.venue_id).await?;
    Ok(ApiResponse::ok("Class schedules fetched", classes))
}

async fn get_class(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<ClassSchedule>> {
    let class = find_class(&state, &current, id).await?;
    Ok(ApiResponse::ok("Class schedule fetched", class))
}

async fn create_class(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Json(req): Json<CreateClassRequest>,
) -> Result<ApiResponse<ClassSchedule>> {
    FormValidator::new()
        .required("Class name", &req.class_name)
        .one_of("Day", &req.day, DAYS)
        .check(req.end_time > req.start_time, "End time must be after start time")
        .range("Capacity", req.total_capacity as i64, 1, MAX_CAPACITY)
        .finish()?;

    let venue = Venue::find_in_scope(&state.pool, req.venue_id, &current.scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Venue not found".to_string()))?;

    let class = ClassSchedule::create(
        &state.pool,
        CreateClassScheduleData {
            venue_id: venue.id,
            class_name: req.class_name.trim().to_string(),
            day: req.day,
            start_time: req.start_time,
            end_time: req.end_time,
            total_capacity: req.total_capacity,
            allow_free_trial: req.allow_free_trial,
            created_by: current.id(),
        },
    )
    .await?;

    tracing::info!(
        class_id = %class.id,
        venue_id = %venue.id,
        created_by = %current.id(),
        "Class schedule created"
    );

    Ok(ApiResponse::created("Class schedule created", class))
}

async fn update_class(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClassRequest>,
) -> Result<ApiResponse<ClassSchedule>> {
    let class = find_class(&state, &current, id).await?;

    let start = req.start_time.unwrap_or(class.start_time);
    let end = req.end_time.unwrap_or(class.end_time);

    let mut v = FormValidator::new();
    if let Some(name) = &req.class_name {
        v.required("Class name", name);
    }
    if let Some(day) = &req.day {
        v.one_of("Day", day, DAYS);
    }
    if let Some(total) = req.total_capacity {
        v.range("Capacity", total as i64, 1, MAX_CAPACITY);
    }
    v.check(end > start, "End time must be after start time");
    v.finish()?;

    // Seats may be taken concurrently; recompute from the locked row
    let mut tx = state.pool.begin().await?;
    let locked = ClassSchedule::lock_for_update(&mut *tx, class.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Class schedule not found".to_string()))?;

    let capacity = match req.total_capacity {
        Some(total) if total != locked.total_capacity => Some(
            adjusted_capacity(locked.capacity, locked.total_capacity, total).ok_or_else(|| {
                AppError::Conflict(format!(
                    "{} seats are already booked; capacity cannot be reduced to {}",
                    locked.total_capacity - locked.capacity,
                    total
                ))
            })?,
        ),
        _ => None,
    };

    let updated = ClassSchedule::update(
        &mut *tx,
        locked.id,
        UpdateClassScheduleData {
            class_name: trimmed(req.class_name),
            day: req.day,
            start_time: req.start_time,
            end_time: req.end_time,
            total_capacity: req.total_capacity,
            capacity,
            allow_free_trial: req.allow_free_trial,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(class_id = %updated.id, updated_by = %current.id(), "Class schedule updated");

    Ok(ApiResponse::ok("Class schedule updated", updated))
}

async fn cancel_class(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<ClassSchedule>> {
    let class = find_class(&state, &current, id).await?;

    if class.status == STATUS_CANCELLED {
        return Err(AppError::Conflict("Class is already cancelled".to_string()));
    }

    let class = ClassSchedule::set_status(&state.pool, class.id, STATUS_CANCELLED).await?;
    tracing::info!(class_id = %class.id, cancelled_by = %current.id(), "Class schedule cancelled");

    Ok(ApiResponse::ok("Class schedule cancelled", class))
}

async fn delete_class(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    let class = find_class(&state, &current, id).await?;

    ClassSchedule::soft_delete(&state.pool, class.id, current.id()).await?;
    tracing::info!(class_id = %class.id, deleted_by = %current.id(), "Class schedule deleted");

    Ok(ApiResponse::message_only("Class schedule deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/class-schedules",
            get(list_classes).post(create_class),
        )
        .route(
            "/api/admin/class-schedules/:id",
            get(get_class).put(update_class).delete(delete_class),
        )
        .route("/api/admin/class-schedules/:id/cancel", post(cancel_class))
}
