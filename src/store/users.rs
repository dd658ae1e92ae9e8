//! Accounts and bearer-token sessions

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

use crate::store::db::{parse_column, parse_uuid, Store};
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{now_millis, Role, User};

/// A user together with the stored password material
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
    pub salt: String,
}

/// An issued bearer token
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: i64,
    pub expires_at: i64,
}

const USER_COLUMNS: &str = "id, email, full_name, role, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode_user(raw: (String, String, String, String, i64)) -> StoreResult<User> {
    let (id, email, full_name, role, created_at) = raw;
    Ok(User {
        id: parse_uuid(&id)?,
        email,
        full_name,
        role: parse_column(&role)?,
        created_at,
    })
}

/// True when a SQLite error is a UNIQUE/PK violation
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Normalize an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Store {
    /// Create an account. Emails are unique case-insensitively.
    pub fn create_user(
        &self,
        email: &str,
        full_name: &str,
        role: Role,
        password_hash: &str,
        salt: &str,
    ) -> StoreResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            full_name: full_name.trim().to_string(),
            role,
            created_at: now_millis(),
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (id, email, full_name, role, password_hash, salt, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id.to_string(),
                user.email,
                user.full_name,
                role.as_str(),
                password_hash,
                salt,
                user.created_at
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StoreError::Conflict(format!("email '{}' is already registered", user.email))
            } else {
                StoreError::Sqlite(e)
            }
        })?;

        tracing::info!(user_id = %user.id, role = %role, "Created user");
        Ok(user)
    }

    pub fn get_user(&self, id: Uuid) -> StoreResult<User> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id.to_string()],
                user_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("User {}", id)))?;
        decode_user(raw)
    }

    /// Look up an account by email, case-insensitively
    pub fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.find_credentials(email)?.map(|creds| creds.user))
    }

    /// Look up login material by email
    pub fn find_credentials(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                &format!(
                    "SELECT {}, password_hash, salt FROM users WHERE email = ?1",
                    USER_COLUMNS
                ),
                params![normalize_email(email)],
                |row| Ok((user_from_row(row)?, row.get::<_, String>(5)?, row.get::<_, String>(6)?)),
            )
            .optional()?;

        match found {
            Some((raw, password_hash, salt)) => Ok(Some(UserCredentials {
                user: decode_user(raw)?,
                password_hash,
                salt,
            })),
            None => Ok(None),
        }
    }

    pub fn count_users(&self, role: Role) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?1",
            params![role.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Issue a new bearer token valid for `ttl_secs`
    pub fn create_session(&self, user_id: Uuid, ttl_secs: u64) -> StoreResult<AuthSession> {
        let created_at = now_millis();
        let session = AuthSession {
            token: Uuid::new_v4().simple().to_string(),
            user_id,
            created_at,
            expires_at: created_at + (ttl_secs as i64) * 1000,
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO auth_sessions (token, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token,
                user_id.to_string(),
                session.created_at,
                session.expires_at
            ],
        )?;
        Ok(session)
    }

    /// Resolve a token to its user. Expired or unknown tokens yield `None`.
    pub fn session_user(&self, token: &str) -> StoreResult<Option<User>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                "SELECT u.id, u.email, u.full_name, u.role, u.created_at
                 FROM auth_sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1 AND s.expires_at > ?2",
                params![token, now_millis()],
                user_from_row,
            )
            .optional()?;
        raw.map(decode_user).transpose()
    }

    /// Revoke a token. Returns whether it existed.
    pub fn delete_session(&self, token: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM auth_sessions WHERE token = ?1", params![token])?;
        Ok(removed > 0)
    }

    /// Drop expired tokens, returning how many were removed
    pub fn purge_expired_sessions(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM auth_sessions WHERE expires_at <= ?1",
            params![now_millis()],
        )?;
        if removed > 0 {
            tracing::debug!(removed, "Purged expired auth sessions");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_get_user() {
        let store = store();
        let user = store
            .create_user(" Ada@Example.com ", "Ada Lovelace", Role::Borrower, "h", "s")
            .unwrap();
        assert_eq!(user.email, "ada@example.com");

        let fetched = store.get_user(user.id).unwrap();
        assert_eq!(fetched, user);
        assert_eq!(store.count_users(Role::Borrower).unwrap(), 1);
        assert_eq!(store.count_users(Role::Admin).unwrap(), 0);
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let store = store();
        store
            .create_user("a@example.com", "A", Role::Investor, "h", "s")
            .unwrap();
        let err = store
            .create_user("A@EXAMPLE.COM", "B", Role::Borrower, "h", "s")
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_find_credentials() {
        let store = store();
        store
            .create_user("cred@example.com", "C", Role::Admin, "hash", "salt")
            .unwrap();

        let creds = store.find_credentials("CRED@example.com").unwrap().unwrap();
        assert_eq!(creds.password_hash, "hash");
        assert_eq!(creds.salt, "salt");
        assert_eq!(creds.user.role, Role::Admin);
        assert!(store.find_credentials("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_find_user_by_email() {
        let store = store();
        let user = store
            .create_user("finder@example.com", "F", Role::Investor, "hash", "salt")
            .unwrap();

        let found = store.find_user_by_email(" Finder@Example.com").unwrap();
        assert_eq!(found, Some(user));
        assert_eq!(store.find_user_by_email("missing@example.com").unwrap(), None);
    }

    #[test]
    fn test_get_missing_user() {
        let store = store();
        assert!(matches!(
            store.get_user(Uuid::new_v4()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_session_lifecycle() {
        let store = store();
        let user = store
            .create_user("s@example.com", "S", Role::Borrower, "h", "s")
            .unwrap();

        let session = store.create_session(user.id, 3600).unwrap();
        assert_eq!(store.session_user(&session.token).unwrap(), Some(user));

        assert!(store.delete_session(&session.token).unwrap());
        assert!(store.session_user(&session.token).unwrap().is_none());
        assert!(!store.delete_session(&session.token).unwrap());
    }

    #[test]
    fn test_expired_session_rejected_and_purged() {
        let store = store();
        let user = store
            .create_user("e@example.com", "E", Role::Investor, "h", "s")
            .unwrap();

        let session = store.create_session(user.id, 0).unwrap();
        assert!(store.session_user(&session.token).unwrap().is_none());
        assert_eq!(store.purge_expired_sessions().unwrap(), 1);
    }
}
