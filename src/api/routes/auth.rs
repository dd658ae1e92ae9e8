//! Auth Routes
//!
//! - POST /api/v1/auth/signup - Create a borrower or investor account
//! - POST /api/v1/auth/login - Exchange credentials for a bearer token
//! - POST /api/v1/auth/logout - Revoke the caller's token
//! - GET /api/v1/auth/me - The caller's account
//!
//! Password hashing is CPU-bound and runs on the blocking pool.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{LoginRequest, SessionResponse, SignupRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::AuthUser;
use crate::api::state::AppState;
use crate::store::{Role, User};

async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Auth task failed: {}", e)))?
}

/// POST /api/v1/auth/signup
///
/// Admin accounts cannot be self-registered.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    if req.role == Role::Admin {
        return Err(ApiError::Forbidden(
            "Admin accounts cannot be created through signup".to_string(),
        ));
    }

    let auth = Arc::clone(&state.auth);
    let (user, session) = run_blocking(move || {
        let user = auth.register(&req.email, &req.full_name, &req.password, req.role)?;
        let session = auth.login(&req.email, &req.password)?;
        Ok((user, session))
    })
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Account created");
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token: session.token,
            expires_at: session.expires_at,
            user,
        }),
    ))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let auth = Arc::clone(&state.auth);
    let session = run_blocking(move || Ok(auth.login(&req.email, &req.password)?)).await?;
    let user = state.store.get_user(session.user_id)?;

    Ok(Json(SessionResponse {
        token: session.token,
        expires_at: session.expires_at,
        user,
    }))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
) -> ApiResult<StatusCode> {
    state.auth.logout(&caller.token)?;
    tracing::info!(user_id = %caller.user.id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(caller: AuthUser) -> Json<User> {
    Json(caller.user)
}
