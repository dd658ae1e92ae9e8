//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::finance::{AmortizationSchedule, FundingStatus, PaymentSummary, ProductType};
use crate::store::{
    Application, ApplicationStatus, Document, Investment, PortfolioSummary, Role, StatusChange,
    User,
};
use crate::wizard::{FieldSpec, StepId};

// ============================================
// AUTH DTOs
// ============================================

/// Signup request; only borrower and investor accounts can self-register
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued bearer token
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    /// Expiry (ms since epoch)
    pub expires_at: i64,
    pub user: User,
}

// ============================================
// CALCULATOR DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub product_type: ProductType,
    pub amount: f64,
    pub term_months: u32,
}

/// Schedule request: priced from a product, or from an explicit APR
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub amount: f64,
    pub term_months: u32,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    /// APR in percent; required when no product is given
    #[serde(default)]
    pub apr: Option<f64>,
}

/// Output format for schedules
#[derive(Debug, Deserialize, Default)]
pub struct FormatParams {
    /// "json" (default) or "csv"
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub summary: PaymentSummary,
    pub schedule: AmortizationSchedule,
}

// ============================================
// WIZARD DTOs
// ============================================

/// Field values to merge into a wizard session
#[derive(Debug, Deserialize)]
pub struct WizardUpdateRequest {
    pub values: Map<String, Value>,
}

/// Static definition of one form step
#[derive(Debug, Serialize)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
}

// ============================================
// APPLICATION DTOs
// ============================================

/// Listing query parameters
#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    /// Comma-separated statuses
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

/// An application as the caller is allowed to see it
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ApplicationView {
    Full(Application),
    /// Investors get the marketplace listing, never contact details or EIN
    Listing(Listing),
}

impl ApplicationView {
    pub fn for_role(role: Role, application: Application) -> Self {
        match role {
            Role::Investor => ApplicationView::Listing(Listing::from(&application)),
            Role::Borrower | Role::Admin => ApplicationView::Full(application),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplicationListResponse {
    pub applications: Vec<ApplicationView>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub application_id: Uuid,
    pub history: Vec<StatusChange>,
}

// ============================================
// DOCUMENT DTOs
// ============================================

/// Upload query parameters; the body is the raw file
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
    pub total: usize,
}

// ============================================
// MARKETPLACE DTOs
// ============================================

/// What an investor sees of an application (no contact details)
#[derive(Debug, Serialize)]
pub struct Listing {
    pub application_id: Uuid,
    pub business_name: String,
    pub industry: String,
    pub state: String,
    pub years_in_business: u32,
    pub product_type: ProductType,
    pub loan_purpose: String,
    pub loan_amount: f64,
    pub term_months: u32,
    pub apr: f64,
    pub monthly_payment: f64,
    pub credit_score: u32,
    pub annual_revenue: f64,
    pub status: ApplicationStatus,
    pub funding_status: FundingStatus,
    pub funded_amount: f64,
    pub percent_funded: f64,
    pub remaining_amount: f64,
    pub submitted_at: i64,
}

impl From<&Application> for Listing {
    fn from(app: &Application) -> Self {
        Self {
            application_id: app.id,
            business_name: app.business.business_name.clone(),
            industry: app.business.industry.clone(),
            state: app.business.state.clone(),
            years_in_business: app.business.years_in_business,
            product_type: app.product_type,
            loan_purpose: app.loan_purpose.clone(),
            loan_amount: app.loan_amount,
            term_months: app.term_months,
            apr: app.apr,
            monthly_payment: app.monthly_payment,
            credit_score: app.financials.credit_score,
            annual_revenue: app.financials.annual_revenue,
            status: app.status,
            funding_status: app.funding_status,
            funded_amount: app.funded_amount,
            percent_funded: app.percent_funded(),
            remaining_amount: app.remaining_amount(),
            submitted_at: app.submitted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MarketplaceResponse {
    pub listings: Vec<Listing>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct InvestRequest {
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct InvestmentResponse {
    pub investment: Investment,
    pub listing: Listing,
}

#[derive(Debug, Serialize)]
pub struct PortfolioResponse {
    pub summary: PortfolioSummary,
    pub investments: Vec<Investment>,
}

#[derive(Debug, Serialize)]
pub struct InvestmentListResponse {
    pub investments: Vec<Investment>,
    pub total_invested: f64,
}

// ============================================
// ADMIN DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub application: Application,
    pub change: StatusChange,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy or unhealthy
    pub status: String,
    /// Database status
    pub database: String,
    /// Open wizard sessions
    pub open_wizards: usize,
    /// Live WebSocket connections
    pub websocket_connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
