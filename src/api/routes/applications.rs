//! Application Routes
//!
//! - GET /api/v1/applications - Applications visible to the caller
//! - GET /api/v1/applications/:id - One application
//! - GET /api/v1/applications/:id/schedule - Amortization schedule (`?format=csv`)
//! - GET /api/v1/applications/:id/history - Status history
//!
//! Borrowers see their own applications, investors see approved and funded
//! ones as marketplace listings, admins see everything. Records outside the
//! caller's view are reported as not found.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::calculator::render_schedule;
use crate::api::dto::{
    ApplicationListResponse, ApplicationView, FormatParams, HistoryResponse, ListParams,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::AuthUser;
use crate::api::state::AppState;
use crate::auth::{policy, Principal};
use crate::finance::AmortizationSchedule;
use crate::store::{Application, ApplicationFilter, ApplicationStatus, Role, StatusChange};

/// Build a filter from query parameters, clamping the page size
pub(crate) fn filter_from_params(
    params: &ListParams,
    max_page_size: usize,
) -> ApiResult<ApplicationFilter> {
    let mut filter = ApplicationFilter::default();

    if let Some(statuses) = params.status.as_deref() {
        for raw in statuses.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let status: ApplicationStatus = raw
                .parse()
                .map_err(|_| ApiError::Validation(format!("Unknown status '{}'", raw)))?;
            filter.statuses.push(status);
        }
    }

    filter = filter.limit(params.limit.unwrap_or(max_page_size).min(max_page_size));
    if let Some(offset) = params.offset {
        filter = filter.offset(offset);
    }
    Ok(filter)
}

/// Load an application the principal is allowed to see
pub(crate) fn load_visible(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
) -> ApiResult<Application> {
    let application = state.store.get_application(id)?;
    if policy::can_view_application(principal, &application) {
        Ok(application)
    } else {
        Err(ApiError::NotFound(format!("Application {} not found", id)))
    }
}

/// GET /api/v1/applications
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApplicationListResponse>> {
    let principal = caller.principal();
    let filter = policy::scope_filter(
        &principal,
        filter_from_params(&params, state.config.max_page_size)?,
    );
    let applications: Vec<ApplicationView> = state
        .store
        .list_applications(&filter)?
        .into_iter()
        .map(|app| ApplicationView::for_role(principal.role, app))
        .collect();

    Ok(Json(ApplicationListResponse {
        total: applications.len(),
        applications,
    }))
}

/// GET /api/v1/applications/:id
pub async fn get_application(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApplicationView>> {
    let principal = caller.principal();
    let application = load_visible(&state, &principal, id)?;
    Ok(Json(ApplicationView::for_role(principal.role, application)))
}

/// GET /api/v1/applications/:id/schedule
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Query(params): Query<FormatParams>,
) -> ApiResult<Response> {
    let application = load_visible(&state, &caller.principal(), id)?;
    let schedule = AmortizationSchedule::generate(
        application.loan_amount,
        application.apr,
        application.term_months,
    )?;
    render_schedule(schedule, &params)
}

/// GET /api/v1/applications/:id/history
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<HistoryResponse>> {
    let principal = caller.principal();
    let application = load_visible(&state, &principal, id)?;
    let history = state.store.application_history(application.id)?;
    let history = match principal.role {
        Role::Investor => history.into_iter().map(redact_change).collect(),
        Role::Borrower | Role::Admin => history,
    };

    Ok(Json(HistoryResponse {
        application_id: application.id,
        history,
    }))
}

/// Drop reviewer identity and notes
fn redact_change(change: StatusChange) -> StatusChange {
    StatusChange {
        changed_by: None,
        note: None,
        ..change
    }
}
