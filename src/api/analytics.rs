use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};

use crate::api::middleware::auth::CurrentAdmin;
use crate::api::middleware::session::AppState;
use crate::api::response::ApiResponse;
use crate::error::Result;
use crate::services::analytics::{
    self, cancellation, free_trial, membership, waiting_list, AnalyticsQuery, BookingRecord,
    CancellationReport, FreeTrialReport, MembershipReport, Period, WaitingListReport,
};

/// Loads the scoped bookings and resolves the reporting period for one request
async fn prepare(
    state: &AppState,
    current: &CurrentAdmin,
    query: &AnalyticsQuery,
) -> Result<(Vec<BookingRecord>, Period)> {
    let period = analytics::resolve_period(query)?;
    let records = analytics::load_records(&state.pool, &current.scope, query).await?;

    tracing::debug!(
        admin_id = %current.id(),
        bookings = records.len(),
        from = %period.start,
        to = %period.end,
        "Analytics data loaded"
    );

    Ok((records, period))
}

async fn free_trials(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<AnalyticsQuery>,
) -> Result<ApiResponse<FreeTrialReport>> {
    let (records, period) = prepare(&state, &current, &query).await?;
    Ok(ApiResponse::ok(
        "Free trial report generated",
        free_trial::build(&records, period),
    ))
}

async fn memberships(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<AnalyticsQuery>,
) -> Result<ApiResponse<MembershipReport>> {
    let (records, period) = prepare(&state, &current, &query).await?;
    Ok(ApiResponse::ok(
        "Membership report generated",
        membership::build(&records, period),
    ))
}

async fn cancellations(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<AnalyticsQuery>,
) -> Result<ApiResponse<CancellationReport>> {
    let (records, period) = prepare(&state, &current, &query).await?;
    Ok(ApiResponse::ok(
        "Cancellation report generated",
        cancellation::build(&records, period),
    ))
}

async fn waiting_list_report(
    State(state): State<AppState>,
    current: CurrentAdmin,
    Query(query): Query<AnalyticsQuery>,
) -> Result<ApiResponse<WaitingListReport>> {
    let (records, period) = prepare(&state, &current, &query).await?;
    Ok(ApiResponse::ok(
        "Waiting list report generated",
        waiting_list::build(&records, period),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/analytics/free-trials", get(free_trials))
        .route("/api/admin/analytics/memberships", get(memberships))
        .route("/api/admin/analytics/cancellations", get(cancellations))
        .route("/api/admin/analytics/waiting-list", get(waiting_list_report))
}
