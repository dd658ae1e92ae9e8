//! Admin Routes
//!
//! - GET /api/v1/admin/applications - Full pipeline with filters
//! - POST /api/v1/admin/applications/:id/status - Move an application through review
//! - GET /api/v1/admin/stats - Pipeline totals

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::applications::filter_from_params;
use crate::api::dto::{
    ApplicationListResponse, ApplicationView, ListParams, StatusUpdateRequest,
    StatusUpdateResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::AuthUser;
use crate::api::state::AppState;
use crate::auth::policy;
use crate::store::{ApplicationStatus, PipelineStats, Role};
use crate::websocket::{WsEvent, MARKETPLACE_TOPIC};

/// GET /api/v1/admin/applications
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApplicationListResponse>> {
    caller.require(&[Role::Admin])?;
    let filter = filter_from_params(&params, state.config.max_page_size)?;
    let applications: Vec<ApplicationView> = state
        .store
        .list_applications(&filter)?
        .into_iter()
        .map(ApplicationView::Full)
        .collect();

    Ok(Json(ApplicationListResponse {
        total: applications.len(),
        applications,
    }))
}

/// POST /api/v1/admin/applications/:id/status
///
/// `funded` is reached only through investments and is rejected here.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> ApiResult<Json<StatusUpdateResponse>> {
    let principal = caller.principal();
    if !policy::can_change_status(&principal) {
        return Err(ApiError::Forbidden(
            "Only admins can change application status".to_string(),
        ));
    }
    if req.status == ApplicationStatus::Funded {
        return Err(ApiError::Conflict(
            "Applications become funded through investments".to_string(),
        ));
    }

    let (application, change) =
        state
            .store
            .update_status(id, req.status, principal.user_id, req.note)?;

    let event = WsEvent::status_changed(&change);
    if ApplicationStatus::visible_to_investors().contains(&change.to_status) {
        state.ws_hub.publish(event.retopic(MARKETPLACE_TOPIC, id));
    }
    state.ws_hub.publish(event);

    Ok(Json(StatusUpdateResponse {
        application,
        change,
    }))
}

/// GET /api/v1/admin/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
) -> ApiResult<Json<PipelineStats>> {
    caller.require(&[Role::Admin])?;
    Ok(Json(state.store.pipeline_stats()?))
}
