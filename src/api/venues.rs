use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::CurrentAdmin;
use crate::api::middleware::session::AppState;
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::venue::{CreateVenueData, UpdateVenueData, Venue, FACILITIES};
use crate::services::validation::{trimmed, FormValidator};

#[derive(Debug, Deserialize)]
pub struct VenueListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVenueRequest {
    pub name: String,
    pub area: String,
    pub address: String,
    pub facility: String,
    pub parking_note: Option<String>,
    pub how_to_enter_facility: Option<String>,
    #[serde(default)]
    pub is_congested: bool,
    #[serde(default)]
    pub has_parking: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVenueRequest {
    pub name: Option<String>,
    pub area: Option<String>,
    pub address: Option<String>,
    pub facility: Option<String>,
    pub parking_note: Option<String>,
    pub how_to_enter_facility: Option<String>,
    pub is_congested: Option<bool>,
    pub has_parking: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn validate_coordinates(v: &mut FormValidator, latitude: Option<f64>, longitude: Option<f64>) {
    if let Some(lat) = latitude {
        v.check((-90.0..=90.0).contains(&lat), "Latitude must be between -90 and 90");
    }
    if let Some(lng) = longitude {
        v.check(
            (-180.0..=180.0).contains(&lng),
            "Longitude must be between -180 and 180",
        );
    }
}

async fn find_venue(state: &AppState, current: &CurrentAdmin, id: Uuid) -> Result<Venue> {
    Venue::find_in_scope(&state.pool, id, &current.scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Venue not found".to_string()))
}

async fn list_venues(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<VenueListQuery>,
) -> Result<ApiResponse<Vec<Venue>>> {
    let search = trimmed(query.search);
    let venues = Venue::list_in_scope(&state.pool, &current.scope, search.as_deref()).await?;
    Ok(ApiResponse::ok("Venues fetched", venues))
}

async fn get_venue(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Venue>> {
    let venue = find_venue(&state, &current, id).await?;
    Ok(ApiResponse::ok("Venue fetched", venue))
}

async fn create_venue(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Json(req): Json<CreateVenueRequest>,
) -> Result<ApiResponse<Venue>> {
    let mut v = FormValidator::new();
    v.required("Name", &req.name)
        .required("Area", &req.area)
        .required("Address", &req.address)
        .one_of("Facility", &req.facility, FACILITIES);
    validate_coordinates(&mut v, req.latitude, req.longitude);
    v.finish()?;

    let venue = Venue::create(
        &state.pool,
        CreateVenueData {
            name: req.name.trim().to_string(),
            area: req.area.trim().to_string(),
            address: req.address.trim().to_string(),
            facility: req.facility,
            parking_note: trimmed(req.parking_note),
            how_to_enter_facility: trimmed(req.how_to_enter_facility),
            is_congested: req.is_congested,
            has_parking: req.has_parking,
            latitude: req.latitude,
            longitude: req.longitude,
            created_by: current.id(),
        },
    )
    .await?;

    tracing::info!(venue_id = %venue.id, created_by = %current.id(), "Venue created");

    Ok(ApiResponse::created("Venue created", venue))
}

async fn update_venue(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateVenueRequest>,
) -> Result<ApiResponse<Venue>> {
    let venue = find_venue(&state, &current, id).await?;

    let mut v = FormValidator::new();
    for (field, value) in [("Name", &req.name), ("Area", &req.area), ("Address", &req.address)] {
        if let Some(value) = value {
            v.required(field, value);
        }
    }
    if let Some(facility) = &req.facility {
        v.one_of("Facility", facility, FACILITIES);
    }
    validate_coordinates(&mut v, req.latitude, req.longitude);
    v.finish()?;

    let venue = Venue::update(
        &state.pool,
        venue.id,
        UpdateVenueData {
            name: trimmed(req.name),
            area: trimmed(req.area),
            address: trimmed(req.address),
            facility: req.facility,
            parking_note: trimmed(req.parking_note),
            how_to_enter_facility: trimmed(req.how_to_enter_facility),
            is_congested: req.is_congested,
            has_parking: req.has_parking,
            latitude: req.latitude,
            longitude: req.longitude,
        },
    )
    .await?;

    tracing::info!(venue_id = %venue.id, updated_by = %current.id(), "Venue updated");

    Ok(ApiResponse::ok("Venue updated", venue))
}

async fn delete_venue(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    let venue = find_venue(&state, &current, id).await?;

    let active = Venue::count_active_classes(&state.pool, venue.id).await?;
    if active > 0 {
        return Err(AppError::Conflict(format!(
            "Venue still has {} active class(es); cancel or delete them first",
            active
        )));
    }

    Venue::soft_delete(&state.pool, venue.id, current.id()).await?;
    tracing::info!(venue_id = %venue.id, deleted_by = %current.id(), "Venue deleted");

    Ok(ApiResponse::message_only("Venue deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/venues", get(list_venues).post(create_venue))
        .route(
            "/api/admin/venues/:id",
            get(get_venue).put(update_venue).delete(delete_venue),
        )
}
