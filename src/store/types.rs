//! Core records for the LendBridge store
//!
//! - `User` / `Role`: accounts and the portal they use
//! - `Application` / `ApplicationStatus`: borrower loan requests
//! - `Investment`: investor contributions toward approved loans
//! - `Document`: metadata for files attached to an application
//! - `StatusChange`: audit trail of application status moves

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::finance::{FundingStatus, ProductType};

/// Current time as Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Which portal an account belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Borrower,
    Investor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Borrower => "borrower",
            Role::Investor => "investor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrower" => Ok(Role::Borrower),
            "investor" => Ok(Role::Investor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// A registered account
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    /// Unix timestamp in milliseconds
    pub created_at: i64,
}

/// Lifecycle of a loan application
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Approved,
    Funded,
    Rejected,
}

impl ApplicationStatus {
    pub fn all() -> &'static [ApplicationStatus] {
        &[
            ApplicationStatus::Submitted,
            ApplicationStatus::UnderReview,
            ApplicationStatus::Approved,
            ApplicationStatus::Funded,
            ApplicationStatus::Rejected,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Funded => "funded",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Moves an administrator may make by hand.
    ///
    /// `Approved → Funded` is not listed: it happens only when investments
    /// reach the loan amount.
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Submitted, UnderReview)
                | (Submitted, Rejected)
                | (UnderReview, Approved)
                | (UnderReview, Rejected)
        )
    }

    /// Statuses investors are allowed to see
    pub fn visible_to_investors() -> &'static [ApplicationStatus] {
        &[ApplicationStatus::Approved, ApplicationStatus::Funded]
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown application status '{}'", s))
    }
}

/// Business section of an application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessDetails {
    pub business_name: String,
    pub business_type: String,
    pub industry: String,
    pub ein: String,
    pub years_in_business: u32,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Financial section of an application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialDetails {
    pub annual_revenue: f64,
    pub monthly_revenue: f64,
    #[serde(default)]
    pub existing_debt: f64,
    pub credit_score: u32,
}

/// Contact section of an application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// A validated application ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub borrower_id: Uuid,
    pub product_type: ProductType,
    pub loan_amount: f64,
    pub term_months: u32,
    pub apr: f64,
    pub monthly_payment: f64,
    pub loan_purpose: String,
    pub business: BusinessDetails,
    pub financials: FinancialDetails,
    pub contact: ContactDetails,
}

/// A borrower's loan request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Application {
    pub id: Uuid,
    pub borrower_id: Uuid,
    pub status: ApplicationStatus,
    pub product_type: ProductType,
    pub loan_amount: f64,
    pub term_months: u32,
    pub apr: f64,
    pub monthly_payment: f64,
    pub loan_purpose: String,
    pub business: BusinessDetails,
    pub financials: FinancialDetails,
    pub contact: ContactDetails,
    pub funded_amount: f64,
    pub funding_status: FundingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub submitted_at: i64,
    pub updated_at: i64,
}

impl Application {
    pub fn percent_funded(&self) -> f64 {
        if self.loan_amount <= 0.0 {
            return 0.0;
        }
        (self.funded_amount / self.loan_amount * 100.0).min(100.0)
    }

    pub fn remaining_amount(&self) -> f64 {
        (self.loan_amount - self.funded_amount).max(0.0)
    }
}

/// Filter for listing applications
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    /// Only applications owned by this borrower
    pub borrower_id: Option<Uuid>,
    /// Only applications in one of these statuses (empty = any)
    pub statuses: Vec<ApplicationStatus>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ApplicationFilter {
    pub fn for_borrower(borrower_id: Uuid) -> Self {
        Self {
            borrower_id: Some(borrower_id),
            ..Default::default()
        }
    }

    pub fn with_statuses(statuses: &[ApplicationStatus]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            ..Default::default()
        }
    }

    pub fn status(mut self, status: ApplicationStatus) -> Self {
        self.statuses = vec![status];
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// An investor's contribution toward an application
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Investment {
    pub id: Uuid,
    pub application_id: Uuid,
    pub investor_id: Uuid,
    pub amount: f64,
    /// Share of the loan amount, in percent
    pub percentage: f64,
    pub created_at: i64,
}

/// Result of recording an investment
#[derive(Debug, Clone, Serialize)]
pub struct InvestmentReceipt {
    pub investment: Investment,
    pub application: Application,
}

/// Totals for one investor
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PortfolioSummary {
    pub investor_id: Uuid,
    pub investment_count: usize,
    pub applications_backed: usize,
    pub total_invested: f64,
    /// Sum of each investment's share of its loan's monthly payment
    pub expected_monthly_income: f64,
}

/// Metadata of a stored file
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub application_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    /// Key in the document storage backend
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub created_at: i64,
}

/// One entry in an application's status history
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusChange {
    pub application_id: Uuid,
    pub from_status: Option<ApplicationStatus>,
    pub to_status: ApplicationStatus,
    pub changed_by: Option<Uuid>,
    pub note: Option<String>,
    pub changed_at: i64,
}

/// Pipeline totals for the admin dashboard
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct PipelineStats {
    pub total_applications: u64,
    pub by_status: BTreeMap<String, u64>,
    pub total_requested: f64,
    pub total_funded: f64,
    pub investor_count: u64,
    pub investment_count: u64,
}
