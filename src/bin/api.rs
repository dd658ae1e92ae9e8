//! LendBridge API Server
//!
//! Run with: cargo run --bin lendbridge-api
//!
//! # Configuration
//!
//! Read from `$LENDBRIDGE_CONFIG`, `~/.config/lendbridge/config.toml`,
//! `/etc/lendbridge/config.toml` or `./config.toml`, then overridden by:
//! - `LENDBRIDGE_API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `LENDBRIDGE_API_PORT`: Port to listen on (default: 8090)
//! - `LENDBRIDGE_DATA_DIR`: Database and document directory
//! - `LENDBRIDGE_ADMIN_EMAIL` / `LENDBRIDGE_ADMIN_PASSWORD`: Bootstrap admin account
//! - `LENDBRIDGE_LOG_LEVEL` / `LENDBRIDGE_LOG_FORMAT`: Logging (`RUST_LOG` wins when set)

use lendbridge::api::{serve, AppState};
use lendbridge::config::Config;
use lendbridge::documents::LocalDocumentStorage;
use lendbridge::store::Store;
use lendbridge::websocket::HubConfig;
use std::sync::Arc;
use std::time::Duration;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    lendbridge::logging::init(&config.logging);

    tracing::info!("Starting LendBridge API server v{}", env!("CARGO_PKG_VERSION"));

    let store_config = config.store_config();
    tracing::info!("Database: {:?}", store_config.path);
    let store = Arc::new(Store::open(&store_config)?);

    let documents_dir = config.documents_dir();
    tracing::info!("Document directory: {:?}", documents_dir);
    let documents = Arc::new(LocalDocumentStorage::new(documents_dir));

    let api_config = config.api_config();
    let state = AppState::with_configs(
        Arc::clone(&store),
        documents,
        api_config.clone(),
        config.wizard.clone(),
        HubConfig::default(),
    );

    match (&config.auth.admin_email, &config.auth.admin_password) {
        (Some(email), Some(password)) => {
            if state.auth.ensure_admin(email, password)?.is_none() {
                tracing::debug!("Admin account already exists, skipping bootstrap");
            }
        }
        _ => tracing::info!(
            "No bootstrap admin configured \
             (set LENDBRIDGE_ADMIN_EMAIL and LENDBRIDGE_ADMIN_PASSWORD)"
        ),
    }

    let purge_store = Arc::clone(&store);
    let session_purge = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = purge_store.purge_expired_sessions() {
                tracing::warn!(error = %e, "Failed to purge expired sessions");
            }
        }
    });

    tracing::info!("Starting server on {}", api_config.addr());
    serve(state, &api_config).await?;

    session_purge.abort();
    tracing::info!("LendBridge API server stopped");

    Ok(())
}
