//! In-progress wizard sessions
//!
//! Sessions live in memory until they are submitted or sit idle past the
//! configured TTL. Lookups are scoped to the owner: a session owned by
//! someone else is reported as not found.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::{WizardError, WizardResult};
use super::session::{WizardSession, WizardView};
use crate::store::now_millis;

/// Wizard registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Idle sessions older than this are dropped
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
    /// Open sessions allowed per borrower
    #[serde(default = "default_max_sessions_per_user")]
    pub max_sessions_per_user: usize,
    /// How often the background sweep runs
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

fn default_idle_ttl_secs() -> u64 {
    86_400
}

fn default_max_sessions_per_user() -> usize {
    5
}

fn default_purge_interval_secs() -> u64 {
    300
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl_secs(),
            max_sessions_per_user: default_max_sessions_per_user(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

/// Registry of open wizard sessions
pub struct WizardRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, WizardSession>>>,
    config: WizardConfig,
}

impl WizardRegistry {
    pub fn new(config: WizardConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    fn idle_ttl_ms(&self) -> i64 {
        (self.config.idle_ttl_secs as i64).saturating_mul(1000)
    }

    /// Open a new session for `owner_id`
    pub async fn start(&self, owner_id: Uuid) -> WizardResult<WizardView> {
        let mut sessions = self.sessions.write().await;
        let now = now_millis();
        let ttl = self.idle_ttl_ms();

        let open = sessions
            .values()
            .filter(|s| s.owner_id == owner_id && !s.is_expired(now, ttl))
            .count();
        if open >= self.config.max_sessions_per_user {
            return Err(WizardError::TooManySessions(self.config.max_sessions_per_user));
        }

        let session = WizardSession::new(owner_id);
        let view = session.view();
        tracing::debug!(session_id = %session.id, owner = %owner_id, "Wizard session started");
        sessions.insert(session.id, session);
        Ok(view)
    }

    /// Snapshot a session
    pub async fn get(&self, id: Uuid, owner_id: Uuid) -> WizardResult<WizardView> {
        let sessions = self.sessions.read().await;
        let now = now_millis();
        let ttl = self.idle_ttl_ms();
        match sessions.get(&id) {
            Some(s) if s.owner_id == owner_id && !s.is_expired(now, ttl) => Ok(s.view()),
            _ => Err(WizardError::NotFound(id)),
        }
    }

    /// Run `f` against a session under the write lock
    pub async fn with_session<T, F>(&self, id: Uuid, owner_id: Uuid, f: F) -> WizardResult<T>
    where
        F: FnOnce(&mut WizardSession) -> WizardResult<T>,
    {
        let mut sessions = self.sessions.write().await;
        let now = now_millis();
        let ttl = self.idle_ttl_ms();
        match sessions.get_mut(&id) {
            Some(s) if s.owner_id == owner_id && !s.is_expired(now, ttl) => f(s),
            _ => Err(WizardError::NotFound(id)),
        }
    }

    /// Remove a session, returning it if the caller owns it
    pub async fn remove(&self, id: Uuid, owner_id: Uuid) -> WizardResult<WizardSession> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&id) {
            Some(s) if s.owner_id == owner_id => {
                sessions.remove(&id).ok_or(WizardError::NotFound(id))
            }
            _ => Err(WizardError::NotFound(id)),
        }
    }

    /// Put a session back, e.g. after a failed submit
    pub async fn restore(&self, mut session: WizardSession) {
        session.touch();
        self.sessions.write().await.insert(session.id, session);
    }

    /// Drop idle sessions, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = now_millis();
        let ttl = self.idle_ttl_ms();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, ttl));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Spawn the periodic idle-session sweep
    pub fn start_background_purge(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = Duration::from_secs(self.config.purge_interval_secs.max(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = registry.purge_expired().await;
                if purged > 0 {
                    tracing::info!(purged, "Purged idle wizard sessions");
                }
            }
        })
    }
}

impl Default for WizardRegistry {
    fn default() -> Self {
        Self::new(WizardConfig::default())
    }
}
