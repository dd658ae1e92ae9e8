//! LendBridge Store
//!
//! SQLite-backed persistence for the marketplace:
//!
//! - **db**: Connection, schema and migrations
//! - **types**: Records (User, Application, Investment, Document)
//! - **users**: Accounts and bearer-token sessions
//! - **applications**: Application rows, status workflow, pipeline stats
//! - **investments**: The funding transaction and portfolio totals
//! - **documents**: Document metadata
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Handler → Store (Mutex<Connection>) → SQLite (WAL)
//!
//! Funding:
//!   BEGIN → load application → FundingLedger::apply → INSERT investment
//!         → UPDATE funded_amount/funding_status/status → history → COMMIT
//! ```

pub mod applications;
pub mod db;
pub mod documents;
pub mod error;
pub mod investments;
pub mod types;
pub mod users;

pub use db::{Store, StoreConfig, SCHEMA_VERSION};
pub use error::{StoreError, StoreResult};
pub use types::{
    now_millis, Application, ApplicationFilter, ApplicationStatus, BusinessDetails,
    ContactDetails, Document, FinancialDetails, Investment, InvestmentReceipt, NewApplication,
    PipelineStats, PortfolioSummary, Role, StatusChange, User,
};
pub use users::{normalize_email, AuthSession, UserCredentials};
