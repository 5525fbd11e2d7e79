use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::CurrentAdmin;
use crate::api::middleware::session::AppState;
use crate::api::response::ApiResponse;
use crate::db::is_unique_violation;
use crate::error::{AppError, Result};
use crate::models::recruitment_lead::{
    CreateLeadData, RecruitmentLead, UpdateLeadData, ROLE_TYPES, STATUSES,
};
use crate::services::analytics::common::{percentage, Breakdown};
use crate::services::validation::{trimmed, FormValidator};

#[derive(Debug, Deserialize)]
pub struct LeadListQuery {
    pub status: Option<String>,
    pub role_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub postcode: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub role_type: String,
    pub experience_years: Option<i32>,
    pub qualifications: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeadRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub postcode: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub experience_years: Option<i32>,
    pub qualifications: Option<String>,
    pub telephone_call_score: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct LeadStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecruitmentReport {
    pub total: i64,
    pub by_status: Vec<Breakdown>,
    pub by_role_type: Vec<Breakdown>,
}

fn count_by(
    leads: &[RecruitmentLead],
    labels: &[&str],
    key: fn(&RecruitmentLead) -> &str,
) -> Vec<Breakdown> {
    let total = leads.len() as i64;
    labels
        .iter()
        .map(|label| {
            let count = leads.iter().filter(|l| key(l) == *label).count() as i64;
            Breakdown {
                label: label.to_string(),
                count,
                percentage: percentage(count, total),
            }
        })
        .collect()
}

impl RecruitmentReport {
    /// Every known status and role type is listed, including empty ones
    pub fn build(leads: &[RecruitmentLead]) -> Self {
        Self {
            total: leads.len() as i64,
            by_status: count_by(leads, STATUSES, |l| l.status.as_str()),
            by_role_type: count_by(leads, ROLE_TYPES, |l| l.role_type.as_str()),
        }
    }
}

fn validate_numbers(
    v: &mut FormValidator,
    age: Option<i32>,
    experience_years: Option<i32>,
    score: Option<i32>,
) {
    if let Some(age) = age {
        v.range("Age", age as i64, 16, 99);
    }
    if let Some(years) = experience_years {
        v.range("Experience", years as i64, 0, 60);
    }
    if let Some(score) = score {
        v.range("Telephone call score", score as i64, 0, 5);
    }
}

fn email_taken(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("A lead with this email already exists".to_string())
    } else {
        AppError::Database(e)
    }
}

async fn find_lead(state: &AppState, current: &CurrentAdmin, id: Uuid) -> Result<RecruitmentLead> {
    RecruitmentLead::find_in_scope(&state.pool, id, &current.scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Recruitment lead not found".to_string()))
}

async fn list_leads(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<LeadListQuery>,
) -> Result<ApiResponse<Vec<RecruitmentLead>>> {
    let status = trimmed(query.status);
    let role_type = trimmed(query.role_type);
    let leads = RecruitmentLead::list_in_scope(
        &state.pool,
        &current.scope,
        status.as_deref(),
        role_type.as_deref(),
    )
    .await?;
    Ok(ApiResponse::ok("Recruitment leads fetched", leads))
}

async fn get_lead(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<RecruitmentLead>> {
    let lead = find_lead(&state, &current, id).await?;
    Ok(ApiResponse::ok("Recruitment lead fetched", lead))
}

async fn create_lead(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Json(req): Json<CreateLeadRequest>,
) -> Result<ApiResponse<RecruitmentLead>> {
    let mut v = FormValidator::new();
    v.required("First name", &req.first_name)
        .required("Last name", &req.last_name)
        .required("Email", &req.email)
        .email("Email", &req.email)
        .required("Phone", &req.phone)
        .one_of("Role type", &req.role_type, ROLE_TYPES);
    validate_numbers(&mut v, req.age, req.experience_years, None);
    v.finish()?;

    let lead = RecruitmentLead::create(
        &state.pool,
        CreateLeadData {
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email: req.email.trim().to_string(),
            phone: req.phone.trim().to_string(),
            postcode: trimmed(req.postcode),
            age: req.age,
            gender: trimmed(req.gender),
            role_type: req.role_type,
            experience_years: req.experience_years,
            qualifications: trimmed(req.qualifications),
            created_by: current.id(),
        },
    )
    .await
    .map_err(email_taken)?;

    tracing::info!(lead_id = %lead.id, role_type = %lead.role_type, "Recruitment lead created");

    Ok(ApiResponse::created("Recruitment lead created", lead))
}

async fn update_lead(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLeadRequest>,
) -> Result<ApiResponse<RecruitmentLead>> {
    let lead = find_lead(&state, &current, id).await?;

    let mut v = FormValidator::new();
    if let Some(email) = &req.email {
        v.email("Email", email);
    }
    validate_numbers(&mut v, req.age, req.experience_years, req.telephone_call_score);
    v.finish()?;

    let lead = RecruitmentLead::update(
        &state.pool,
        lead.id,
        UpdateLeadData {
            first_name: trimmed(req.first_name),
            last_name: trimmed(req.last_name),
            email: trimmed(req.email),
            phone: trimmed(req.phone),
            postcode: trimmed(req.postcode),
            age: req.age,
            gender: trimmed(req.gender),
            experience_years: req.experience_years,
            qualifications: trimmed(req.qualifications),
            telephone_call_score: req.telephone_call_score,
        },
    )
    .await
    .map_err(email_taken)?;

    tracing::info!(lead_id = %lead.id, updated_by = %current.id(), "Recruitment lead updated");

    Ok(ApiResponse::ok("Recruitment lead updated", lead))
}

async fn set_lead_status(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<LeadStatusRequest>,
) -> Result<ApiResponse<RecruitmentLead>> {
    let status = req.status.trim();
    FormValidator::new()
        .one_of("Status", status, STATUSES)
        .finish()?;

    let lead = find_lead(&state, &current, id).await?;
    let lead = RecruitmentLead::set_status(&state.pool, lead.id, status).await?;

    tracing::info!(lead_id = %lead.id, status = %status, "Recruitment lead status updated");

    Ok(ApiResponse::ok("Recruitment lead status updated", lead))
}

async fn delete_lead(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    let lead = find_lead(&state, &current, id).await?;

    RecruitmentLead::soft_delete(&state.pool, lead.id, current.id()).await?;
    tracing::info!(lead_id = %lead.id, deleted_by = %current.id(), "Recruitment lead deleted");

    Ok(ApiResponse::message_only("Recruitment lead deleted"))
}

async fn lead_report(
    State(state): State<AppState>,
    current: CurrentAdmin,
) -> Result<ApiResponse<RecruitmentReport>> {
    let leads = RecruitmentLead::list_in_scope(&state.pool, &current.scope, None, None).await?;
    Ok(ApiResponse::ok(
        "Recruitment report fetched",
        RecruitmentReport::build(&leads),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/recruitment", get(list_leads).post(create_lead))
        .route("/api/admin/recruitment/report", get(lead_report))
        .route(
            "/api/admin/recruitment/:id",
            get(get_lead).put(update_lead).delete(delete_lead),
        )
        .route("/api/admin/recruitment/:id/status", put(set_lead_status))
}
