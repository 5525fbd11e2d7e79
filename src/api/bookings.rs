use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::CurrentAdmin;
use crate::api::middleware::session::AppState;
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::booking::{
    Booking, BookingDetails, BookingFilter, BookingWithStudents, TYPE_FREE, TYPE_PAID,
    TYPE_WAITING_LIST,
};
use crate::services::booking::{self, BookingKind, NewBookingRequest};
use crate::services::validation::trimmed;

#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub venue_id: Option<Uuid>,
    pub status: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub search: Option<String>,
}

impl BookingListQuery {
    fn into_filter(self, booking_type: &str) -> BookingFilter {
        BookingFilter {
            booking_type: Some(booking_type.to_string()),
            venue_id: self.venue_id,
            status: trimmed(self.status),
            from_date: self.from_date,
            to_date: self.to_date,
            search: trimmed(self.search),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub payment_plan_id: Uuid,
    pub start_date: NaiveDate,
}

async fn list_of_type(
    state: &AppState,
    current: &CurrentAdmin,
    query: BookingListQuery,
    booking_type: &str,
) -> Result<Vec<BookingWithStudents>> {
    let filter = query.into_filter(booking_type);
    Ok(Booking::list(&state.pool, &current.scope, &filter).await?)
}

/// Loads a booking, optionally requiring it to be of one type
async fn details_of_type(
    state: &AppState,
    current: &CurrentAdmin,
    id: Uuid,
    booking_type: Option<&str>,
) -> Result<BookingDetails> {
    Booking::find_details(&state.pool, id, &current.scope)
        .await?
        .filter(|d| booking_type.map_or(true, |t| d.booking.booking_type == t))
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
}

async fn create_free_trial(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Json(req): Json<NewBookingRequest>,
) -> Result<ApiResponse<BookingDetails>> {
    let details = booking::create_booking(
        &state.pool,
        &current.admin,
        &current.scope,
        BookingKind::FreeTrial,
        req,
    )
    .await?;
    Ok(ApiResponse::created("Free trial booked", details))
}

async fn list_free_trials(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<BookingListQuery>,
) -> Result<ApiResponse<Vec<BookingWithStudents>>> {
    let trials = list_of_type(&state, &current, query, TYPE_FREE).await?;
    Ok(ApiResponse::ok("Free trials fetched", trials))
}

async fn get_free_trial(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<BookingDetails>> {
    let details = details_of_type(&state, &current, id, Some(TYPE_FREE)).await?;
    Ok(ApiResponse::ok("Free trial fetched", details))
}

async fn update_free_trial_status(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<ApiResponse<Booking>> {
    let booking = booking::update_free_trial_status(
        &state.pool,
        &current.scope,
        current.id(),
        id,
        req.status.trim(),
    )
    .await?;
    Ok(ApiResponse::ok("Free trial status updated", booking))
}

async fn create_waiting_list(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Json(req): Json<NewBookingRequest>,
) -> Result<ApiResponse<BookingDetails>> {
    let details = booking::create_booking(
        &state.pool,
        &current.admin,
        &current.scope,
        BookingKind::WaitingList,
        req,
    )
    .await?;
    Ok(ApiResponse::created("Added to waiting list", details))
}

async fn list_waiting_list(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<BookingListQuery>,
) -> Result<ApiResponse<Vec<BookingWithStudents>>> {
    let entries = list_of_type(&state, &current, query, TYPE_WAITING_LIST).await?;
    Ok(ApiResponse::ok("Waiting list fetched", entries))
}

async fn get_waiting_list_entry(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<BookingDetails>> {
    let details = details_of_type(&state, &current, id, Some(TYPE_WAITING_LIST)).await?;
    Ok(ApiResponse::ok("Waiting list entry fetched", details))
}

async fn list_memberships(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<BookingListQuery>,
) -> Result<ApiResponse<Vec<BookingWithStudents>>> {
    let members = list_of_type(&state, &current, query, TYPE_PAID).await?;
    Ok(ApiResponse::ok("Memberships fetched", members))
}

async fn get_booking(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<BookingDetails>> {
    let details = details_of_type(&state, &current, id, None).await?;
    Ok(ApiResponse::ok("Booking fetched", details))
}

async fn cancel_booking(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<ApiResponse<Booking>> {
    let note = trimmed(req.note);
    let booking = booking::cancel_booking(
        &state.pool,
        &current.scope,
        current.id(),
        id,
        &req.reason,
        note.as_deref(),
    )
    .await?;
    Ok(ApiResponse::ok("Booking cancelled", booking))
}

async fn convert_booking(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<ConvertRequest>,
) -> Result<ApiResponse<Booking>> {
    let booking = booking::convert_to_membership(
        &state.pool,
        &current.scope,
        &current.admin,
        id,
        req.payment_plan_id,
        req.start_date,
    )
    .await?;
    Ok(ApiResponse::ok("Booking converted to membership", booking))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/book/free-trials",
            get(list_free_trials).post(create_free_trial),
        )
        .route("/api/admin/book/free-trials/:id", get(get_free_trial))
        .route(
            "/api/admin/book/free-trials/:id/status",
            put(update_free_trial_status),
        )
        .route(
            "/api/admin/waiting-list",
            get(list_waiting_list).post(create_waiting_list),
        )
        .route("/api/admin/waiting-list/:id", get(get_waiting_list_entry))
        .route("/api/admin/memberships", get(list_memberships))
        .route("/api/admin/bookings/:id", get(get_booking))
        .route("/api/admin/bookings/:id/cancel", post(cancel_booking))
        .route("/api/admin/bookings/:id/convert", post(convert_booking))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_becomes_typed_filter() {
        let query = BookingListQuery {
            status: Some("  ".to_string()),
            search: Some(" Ava ".to_string()),
            ..Default::default()
        };

        let filter = query.into_filter(TYPE_WAITING_LIST);
        assert_eq!(filter.booking_type.as_deref(), Some("waiting list"));
        assert_eq!(filter.status, None);
        assert_eq!(filter.search.as_deref(), Some("Ava"));
    }
}
