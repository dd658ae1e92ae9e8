//! Wizard Routes (borrower portal)
//!
//! - GET /api/v1/wizard/steps - Form definition
//! - POST /api/v1/wizard - Start an application
//! - GET /api/v1/wizard/:id - Current state
//! - PATCH /api/v1/wizard/:id - Merge field values
//! - POST /api/v1/wizard/:id/next - Validate and advance
//! - POST /api/v1/wizard/:id/back - Previous step
//! - POST /api/v1/wizard/:id/goto/:step - Jump to a reachable step
//! - POST /api/v1/wizard/:id/submit - Validate everything and file the application

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::dto::{StepDefinition, WizardUpdateRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::AuthUser;
use crate::api::state::AppState;
use crate::store::{Application, Role};
use crate::websocket::WsEvent;
use crate::wizard::{StepId, WizardView};

/// GET /api/v1/wizard/steps
pub async fn list_steps() -> Json<Vec<StepDefinition>> {
    Json(
        StepId::all()
            .iter()
            .map(|step| StepDefinition {
                id: *step,
                title: step.title(),
                fields: step.fields(),
            })
            .collect(),
    )
}

/// POST /api/v1/wizard
pub async fn start(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
) -> ApiResult<(StatusCode, Json<WizardView>)> {
    let principal = caller.require(&[Role::Borrower])?;
    let view = state.wizards.start(principal.user_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/wizard/:id
pub async fn get(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardView>> {
    let principal = caller.require(&[Role::Borrower])?;
    Ok(Json(state.wizards.get(id, principal.user_id).await?))
}

/// PATCH /api/v1/wizard/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<WizardUpdateRequest>,
) -> ApiResult<Json<WizardView>> {
    let principal = caller.require(&[Role::Borrower])?;
    let view = state
        .wizards
        .with_session(id, principal.user_id, |session| {
            session.update(req.values)?;
            Ok(session.view())
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/wizard/:id/next
///
/// 400 with per-field errors when the current step does not validate.
pub async fn next(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardView>> {
    let principal = caller.require(&[Role::Borrower])?;
    let view = state
        .wizards
        .with_session(id, principal.user_id, |session| {
            session.next()?;
            Ok(session.view())
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/wizard/:id/back
pub async fn back(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardView>> {
    let principal = caller.require(&[Role::Borrower])?;
    let view = state
        .wizards
        .with_session(id, principal.user_id, |session| {
            session.back();
            Ok(session.view())
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/wizard/:id/goto/:step
pub async fn goto(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path((id, step)): Path<(Uuid, String)>,
) -> ApiResult<Json<WizardView>> {
    let principal = caller.require(&[Role::Borrower])?;
    let step: StepId = step
        .parse()
        .map_err(|_| ApiError::Validation(format!("Unknown step '{}'", step)))?;

    let view = state
        .wizards
        .with_session(id, principal.user_id, |session| {
            session.goto(step)?;
            Ok(session.view())
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/wizard/:id/submit
///
/// The session is consumed on success and kept on failure so the borrower
/// can fix the reported fields.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<Application>)> {
    let principal = caller.require(&[Role::Borrower])?;
    let session = state.wizards.remove(id, principal.user_id).await?;

    let new_application = match session.build_submission() {
        Ok(app) => app,
        Err(e) => {
            state.wizards.restore(session).await;
            return Err(e.into());
        }
    };

    let application = match state.store.insert_application(new_application) {
        Ok(app) => app,
        Err(e) => {
            state.wizards.restore(session).await;
            return Err(e.into());
        }
    };

    state
        .ws_hub
        .publish(WsEvent::application_submitted(&application));
    tracing::info!(wizard_id = %id, application_id = %application.id, "Wizard submitted");

    Ok((StatusCode::CREATED, Json(application)))
}
