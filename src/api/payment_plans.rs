use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::CurrentAdmin;
use crate::api::middleware::session::AppState;
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::payment_plan::{
    CreatePaymentPlanData, PaymentPlan, UpdatePaymentPlanData, INTERVALS,
};
use crate::services::analytics::common::round2;
use crate::services::validation::{trimmed, FormValidator};

const MAX_PLAN_STUDENTS: i64 = 3;

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub title: String,
    pub price: f64,
    pub price_lesson: Option<f64>,
    pub interval: String,
    pub duration: i32,
    pub students: i32,
    pub joining_fee: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub price_lesson: Option<f64>,
    pub interval: Option<String>,
    pub duration: Option<i32>,
    pub students: Option<i32>,
    pub joining_fee: Option<f64>,
}

/// A plan with its derived length and monthly fee
#[derive(Debug, Serialize)]
pub struct PaymentPlanView {
    #[serde(flatten)]
    pub plan: PaymentPlan,
    pub months: i32,
    pub monthly_fee: f64,
}

impl From<PaymentPlan> for PaymentPlanView {
    fn from(plan: PaymentPlan) -> Self {
        Self {
            months: plan.months(),
            monthly_fee: round2(plan.monthly_fee()),
            plan,
        }
    }
}

fn validate_amounts(
    v: &mut FormValidator,
    price: Option<f64>,
    price_lesson: Option<f64>,
    joining_fee: Option<f64>,
) {
    for (field, amount) in [
        ("Price", price),
        ("Price per lesson", price_lesson),
        ("Joining fee", joining_fee),
    ] {
        if let Some(amount) = amount {
            v.check(amount >= 0.0, &format!("{} cannot be negative", field));
        }
    }
}

async fn find_plan(state: &AppState, current: &CurrentAdmin, id: Uuid) -> Result<PaymentPlan> {
    PaymentPlan::find_in_scope(&state.pool, id, &current.scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment plan not found".to_string()))
}

async fn list_plans(
    State(state): State<AppState>,
    current: CurrentAdmin,
) -> Result<ApiResponse<Vec<PaymentPlanView>>> {
    let plans = PaymentPlan::list_in_scope(&state.pool, &current.scope).await?;
    Ok(ApiResponse::ok(
        "Payment plans fetched",
        plans.into_iter().map(PaymentPlanView::from).collect(),
    ))
}

async fn get_plan(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<PaymentPlanView>> {
    let plan = find_plan(&state, &current, id).await?;
    Ok(ApiResponse::ok("Payment plan fetched", plan.into()))
}

async fn create_plan(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Json(req): Json<CreatePlanRequest>,
) -> Result<ApiResponse<PaymentPlanView>> {
    let mut v = FormValidator::new();
    v.required("Title", &req.title)
        .one_of("Interval", &req.interval, INTERVALS)
        .check(req.duration > 0, "Duration must be greater than 0")
        .range("Students", req.students as i64, 1, MAX_PLAN_STUDENTS);
    validate_amounts(&mut v, Some(req.price), req.price_lesson, req.joining_fee);
    v.finish()?;

    let plan = PaymentPlan::create(
        &state.pool,
        CreatePaymentPlanData {
            title: req.title.trim().to_string(),
            price: req.price,
            price_lesson: req.price_lesson,
            interval: req.interval,
            duration: req.duration,
            students: req.students,
            joining_fee: req.joining_fee,
            created_by: current.id(),
        },
    )
    .await?;

    tracing::info!(plan_id = %plan.id, created_by = %current.id(), "Payment plan created");

    Ok(ApiResponse::created("Payment plan created", plan.into()))
}

async fn update_plan(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePlanRequest>,
) -> Result<ApiResponse<PaymentPlanView>> {
    let plan = find_plan(&state, &current, id).await?;

    let mut v = FormValidator::new();
    if let Some(title) = &req.title {
        v.required("Title", title);
    }
    if let Some(interval) = &req.interval {
        v.one_of("Interval", interval, INTERVALS);
    }
    if let Some(duration) = req.duration {
        v.check(duration > 0, "Duration must be greater than 0");
    }
    if let Some(students) = req.students {
        v.range("Students", students as i64, 1, MAX_PLAN_STUDENTS);
    }
    validate_amounts(&mut v, req.price, req.price_lesson, req.joining_fee);
    v.finish()?;

    let plan = PaymentPlan::update(
        &state.pool,
        plan.id,
        UpdatePaymentPlanData {
            title: trimmed(req.title),
            price: req.price,
            price_lesson: req.price_lesson,
            interval: req.interval,
            duration: req.duration,
            students: req.students,
            joining_fee: req.joining_fee,
        },
    )
    .await?;

    tracing::info!(plan_id = %plan.id, updated_by = %current.id(), "Payment plan updated");

    Ok(ApiResponse::ok("Payment plan updated", plan.into()))
}

async fn delete_plan(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>> {
    let plan = find_plan(&state, &current, id).await?;

    PaymentPlan::soft_delete(&state.pool, plan.id, current.id()).await?;
    tracing::info!(plan_id = %plan.id, deleted_by = %current.id(), "Payment plan deleted");

    Ok(ApiResponse::message_only("Payment plan deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/payment-plans", get(list_plans).post(create_plan))
        .route(
            "/api/admin/payment-plans/:id",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
}
