//! LendBridge Finance
//!
//! The arithmetic behind the marketplace:
//!
//! - **rates**: Product catalog and the term → APR adjustment table
//! - **amortization**: Fixed monthly payment and per-period schedules
//! - **funding**: Investment percentages and the funding ledger
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust
//! use lendbridge::finance::{calculate_apr, AmortizationSchedule, ProductType};
//!
//! let apr = calculate_apr(ProductType::TermLoan, 24);
//! let schedule = AmortizationSchedule::generate(25_000.0, apr, 24).unwrap();
//! assert_eq!(schedule.payments.last().unwrap().remaining_balance, 0.0);
//! ```

pub mod amortization;
pub mod error;
pub mod funding;
pub mod rates;

pub use amortization::{
    calculate_monthly_payment, monthly_rate, round_cents, AmortizationSchedule, Payment,
    PaymentSummary, MAX_TERM_MONTHS,
};
pub use error::{FinanceError, FinanceResult};
pub use funding::{
    investment_percentage, FundingChange, FundingLedger, FundingStatus, FUNDING_EPSILON,
};
pub use rates::{calculate_apr, quote, term_adjustment, PaymentQuote, Product, ProductType};
