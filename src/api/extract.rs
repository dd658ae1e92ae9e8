//! Request extractors
//!
//! `AuthUser` resolves `Authorization: Bearer <token>` to a user; handlers
//! that take it reject anonymous requests with 401.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;

use super::error::ApiError;
use super::state::AppState;
use crate::auth::Principal;
use crate::store::{Role, User};

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    /// Raw bearer token, needed for logout
    pub token: String,
}

impl AuthUser {
    pub fn principal(&self) -> Principal {
        Principal::from(&self.user)
    }

    /// Fail with 403 unless the caller has one of `roles`
    pub fn require(&self, roles: &[Role]) -> Result<Principal, ApiError> {
        let principal = self.principal();
        if principal.has_role(roles) {
            Ok(principal)
        } else {
            Err(ApiError::Forbidden(format!(
                "{} accounts cannot perform this action",
                self.user.role
            )))
        }
    }
}

/// Token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve a token or fail with 401
pub fn authenticate_token(state: &AppState, token: &str) -> Result<User, ApiError> {
    state
        .auth
        .authenticate(token)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?
            .to_string();
        let user = authenticate_token(state, &token)?;
        Ok(AuthUser { user, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
