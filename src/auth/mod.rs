//! LendBridge Auth
//!
//! Accounts, bearer tokens and the access policy.
//!
//! - **password**: Salted, iterated SHA-256 password hashes
//! - **policy**: Which principal may see or change which record
//!
//! # Example
//!
//! ```rust
//! use lendbridge::auth::Authenticator;
//! use lendbridge::store::{Role, Store};
//! use std::sync::Arc;
//!
//! let store = Arc::new(Store::open_in_memory().unwrap());
//! let auth = Authenticator::new(Arc::clone(&store), 3600);
//!
//! auth.register("ops@example.com", "Ops", "s3cret-pass", Role::Investor).unwrap();
//! let session = auth.login("ops@example.com", "s3cret-pass").unwrap();
//! assert!(auth.authenticate(&session.token).unwrap().is_some());
//! ```

pub mod password;
pub mod policy;

pub use password::{generate_salt, hash_password, verify_password, MIN_PASSWORD_LEN};
pub use policy::Principal;

use std::sync::Arc;
use thiserror::Error;

use crate::store::{AuthSession, Role, Store, StoreError, User};

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Email/password pair did not match
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Registration input rejected
    #[error("{0}")]
    Validation(String),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Issues and resolves bearer tokens
#[derive(Debug, Clone)]
pub struct Authenticator {
    store: Arc<Store>,
    token_ttl_secs: u64,
}

impl Authenticator {
    pub fn new(store: Arc<Store>, token_ttl_secs: u64) -> Self {
        Self {
            store,
            token_ttl_secs,
        }
    }

    /// Create an account with a hashed password
    pub fn register(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::Validation("A valid email is required".to_string()));
        }
        if full_name.trim().is_empty() {
            return Err(AuthError::Validation("Full name is required".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let salt = generate_salt();
        let hash = hash_password(password, &salt);
        Ok(self.store.create_user(email, full_name, role, &hash, &salt)?)
    }

    /// Check credentials and issue a token
    pub fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let creds = self
            .store
            .find_credentials(email)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &creds.salt, &creds.password_hash) {
            tracing::warn!(user_id = %creds.user.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.store.create_session(creds.user.id, self.token_ttl_secs)?;
        tracing::info!(user_id = %creds.user.id, role = %creds.user.role, "User logged in");
        Ok(session)
    }

    /// Resolve a token to its user
    pub fn authenticate(&self, token: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.session_user(token)?)
    }

    pub fn logout(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.store.delete_session(token)?)
    }

    /// Create the admin account if no admin exists yet
    pub fn ensure_admin(&self, email: &str, password: &str) -> Result<Option<User>, AuthError> {
        if self.store.count_users(Role::Admin)? > 0 {
            return Ok(None);
        }
        let user = self.register(email, "Administrator", password, Role::Admin)?;
        tracing::info!(user_id = %user.id, email = %user.email, "Bootstrapped admin account");
        Ok(Some(user))
    }

    pub fn token_ttl_secs(&self) -> u64 {
        self.token_ttl_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new(Arc::new(Store::open_in_memory().unwrap()), 3600)
    }

    #[test]
    fn test_register_and_login() {
        let auth = authenticator();
        let user = auth
            .register("lee@example.com", "Lee", "long-password", Role::Borrower)
            .unwrap();

        let session = auth.login("LEE@example.com", "long-password").unwrap();
        assert_eq!(session.user_id, user.id);

        let resolved = auth.authenticate(&session.token).unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        assert!(auth.logout(&session.token).unwrap());
        assert!(auth.authenticate(&session.token).unwrap().is_none());
    }

    #[test]
    fn test_wrong_password() {
        let auth = authenticator();
        auth.register("lee@example.com", "Lee", "long-password", Role::Borrower)
            .unwrap();
        assert!(matches!(
            auth.login("lee@example.com", "wrong-password"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "long-password"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_register_validation() {
        let auth = authenticator();
        assert!(matches!(
            auth.register("not-an-email", "X", "long-password", Role::Investor),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            auth.register("x@example.com", "X", "short", Role::Investor),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            auth.register("x@example.com", "  ", "long-password", Role::Investor),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn test_ensure_admin_runs_once() {
        let auth = authenticator();
        let first = auth.ensure_admin("root@example.com", "admin-password").unwrap();
        assert!(first.is_some());
        let second = auth.ensure_admin("other@example.com", "admin-password").unwrap();
        assert!(second.is_none());
    }
}
