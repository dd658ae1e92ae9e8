//! # LendBridge
//!
//! Commercial lending marketplace: borrowers apply through a multi-step
//! form, admins review, and investors fund approved loans in slices.
//!
//! ## Modules
//!
//! - [`finance`]: Rate tables, amortization and funding arithmetic
//! - [`wizard`]: Multi-step application form engine
//! - [`store`]: SQLite persistence for users, applications and investments
//! - [`auth`]: Password hashing, bearer tokens and the access policy
//! - [`documents`]: Supporting document storage
//! - [`api`]: REST API server with Axum
//! - [`websocket`]: Live pipeline events
//!
//! ## Quick Start
//!
//! ```rust
//! use lendbridge::finance::{quote, AmortizationSchedule, ProductType};
//!
//! let offer = quote(ProductType::EquipmentFinancing, 120_000.0, 48).unwrap();
//! println!("APR {:.2}%, {:.2}/month", offer.apr, offer.monthly_payment);
//!
//! let schedule = AmortizationSchedule::generate(120_000.0, offer.apr, 48).unwrap();
//! assert_eq!(schedule.payments.len(), 48);
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod documents;
pub mod finance;
pub mod logging;
pub mod store;
pub mod websocket;
pub mod wizard;

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use auth::{AuthError, Authenticator, Principal};

pub use config::{Config, ConfigError, LoggingConfig};

pub use documents::{DocumentError, DocumentStorage, LocalDocumentStorage};

pub use finance::{
    calculate_apr, calculate_monthly_payment, quote, AmortizationSchedule, FinanceError,
    FundingLedger, FundingStatus, PaymentQuote, ProductType,
};

pub use store::{
    Application, ApplicationFilter, ApplicationStatus, Investment, Role, Store, StoreConfig,
    StoreError, StoreResult, User,
};

pub use websocket::{ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent};

pub use wizard::{StepId, WizardError, WizardRegistry, WizardSession};
