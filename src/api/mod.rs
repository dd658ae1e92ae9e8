//! LendBridge REST API
//!
//! HTTP API for the three portals, built with Axum.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /api/v1/auth/signup`, `POST /api/v1/auth/login`
//! - `POST /api/v1/auth/logout`, `GET /api/v1/auth/me`
//!
//! ## Calculator (public)
//! - `GET /api/v1/products`
//! - `POST /api/v1/calculator/quote`
//! - `POST /api/v1/calculator/schedule`
//!
//! ## Borrower portal
//! - `GET /api/v1/wizard/steps`, `POST /api/v1/wizard`
//! - `GET|PATCH /api/v1/wizard/:id`
//! - `POST /api/v1/wizard/:id/{next,back,submit}`, `POST /api/v1/wizard/:id/goto/:step`
//! - `GET /api/v1/applications`, `GET /api/v1/applications/:id`
//! - `GET /api/v1/applications/:id/{schedule,history}`
//! - `POST|GET /api/v1/applications/:id/documents`, `GET /api/v1/documents/:id`
//!
//! ## Investor portal
//! - `GET /api/v1/marketplace`, `GET /api/v1/portfolio`
//! - `POST|GET /api/v1/applications/:id/investments`
//!
//! ## Admin portal
//! - `GET /api/v1/admin/applications`
//! - `POST /api/v1/admin/applications/:id/status`
//! - `GET /api/v1/admin/stats`
//!
//! ## Health
//! - `GET /health/live`, `GET /health/ready`, `GET /health`
//!
//! ## WebSocket
//! - `GET /ws` - Pipeline events
//!
//! # Example
//!
//! ```rust,ignore
//! use lendbridge::api::{serve, ApiConfig, AppState};
//! use lendbridge::documents::LocalDocumentStorage;
//! use lendbridge::store::{Store, StoreConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(Store::open(&StoreConfig::default())?);
//!     let documents = Arc::new(LocalDocumentStorage::new("lendbridge_data/documents"));
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(store, documents, config.clone());
//!     serve(state, &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use extract::AuthUser;
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::websocket::websocket_handler;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Auth
        .route("/auth/signup", post(routes::auth::signup))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        // Calculator
        .route("/products", get(routes::calculator::list_products))
        .route("/calculator/quote", post(routes::calculator::quote_loan))
        .route("/calculator/schedule", post(routes::calculator::schedule))
        // Wizard
        .route("/wizard/steps", get(routes::wizard::list_steps))
        .route("/wizard", post(routes::wizard::start))
        .route(
            "/wizard/:id",
            get(routes::wizard::get).patch(routes::wizard::update),
        )
        .route("/wizard/:id/next", post(routes::wizard::next))
        .route("/wizard/:id/back", post(routes::wizard::back))
        .route("/wizard/:id/goto/:step", post(routes::wizard::goto))
        .route("/wizard/:id/submit", post(routes::wizard::submit))
        // Applications
        .route("/applications", get(routes::applications::list_applications))
        .route("/applications/:id", get(routes::applications::get_application))
        .route("/applications/:id/schedule", get(routes::applications::get_schedule))
        .route("/applications/:id/history", get(routes::applications::get_history))
        // Documents
        .route(
            "/applications/:id/documents",
            post(routes::documents::upload_document).get(routes::documents::list_documents),
        )
        .route("/documents/:id", get(routes::documents::download_document))
        // Investor
        .route("/marketplace", get(routes::investments::marketplace))
        .route(
            "/applications/:id/investments",
            post(routes::investments::invest).get(routes::investments::list_investments),
        )
        .route("/portfolio", get(routes::investments::portfolio))
        // Admin
        .route("/admin/applications", get(routes::admin::list_applications))
        .route(
            "/admin/applications/:id/status",
            post(routes::admin::update_status),
        )
        .route("/admin/stats", get(routes::admin::stats))
        .layer(DefaultBodyLimit::max(state.config.max_body_size));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let wizards = Arc::clone(&state.wizards);
    let purge = wizards.start_background_purge();
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("LendBridge API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    purge.abort();
    tracing::info!("LendBridge API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
