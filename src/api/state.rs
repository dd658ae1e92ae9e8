//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::Authenticator;
use crate::documents::DocumentStorage;
use crate::store::Store;
use crate::websocket::{ConnectionHub, HubConfig};
use crate::wizard::{WizardConfig, WizardRegistry};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Applications, investments, users
    pub store: Arc<Store>,
    /// Token issuing and resolution
    pub auth: Arc<Authenticator>,
    /// Open application wizards
    pub wizards: Arc<WizardRegistry>,
    /// Document bytes
    pub documents: Arc<dyn DocumentStorage>,
    /// WebSocket connection hub for pipeline events
    pub ws_hub: Arc<ConnectionHub>,
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<Store>, documents: Arc<dyn DocumentStorage>, config: ApiConfig) -> Self {
        Self::with_configs(store, documents, config, WizardConfig::default(), HubConfig::default())
    }

    /// Create AppState with explicit wizard and WebSocket hub settings
    pub fn with_configs(
        store: Arc<Store>,
        documents: Arc<dyn DocumentStorage>,
        config: ApiConfig,
        wizard_config: WizardConfig,
        hub_config: HubConfig,
    ) -> Self {
        let auth = Arc::new(Authenticator::new(Arc::clone(&store), config.session_ttl_secs));
        Self {
            store,
            auth,
            wizards: Arc::new(WizardRegistry::new(wizard_config)),
            documents,
            ws_hub: Arc::new(ConnectionHub::new(hub_config)),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Bearer token lifetime
    pub session_ttl_secs: u64,
    /// Smallest investment accepted
    pub min_investment: f64,
    /// Largest page a listing endpoint returns
    pub max_page_size: usize,
    /// Largest document upload accepted
    pub max_upload_bytes: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            cors_origins: Vec::new(),
            max_body_size: 12 * 1024 * 1024, // 12MB
            session_ttl_secs: 12 * 3600,
            min_investment: 100.0,
            max_page_size: 200,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
