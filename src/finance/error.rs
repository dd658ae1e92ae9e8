//! Finance error types
//!
//! Errors raised by the rate tables, amortization math and funding ledger.

use thiserror::Error;

/// Errors that can occur in financial calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FinanceError {
    /// Principal is negative, NaN or infinite
    #[error("Invalid principal: {0}")]
    InvalidPrincipal(f64),

    /// Interest rate is negative, NaN or infinite
    #[error("Invalid interest rate: {0}")]
    InvalidRate(f64),

    /// Loan term must be between one month and the maximum term
    #[error("Invalid term: {0} months")]
    InvalidTerm(u32),

    /// Requested amount falls outside the product limits
    #[error("Amount {amount:.2} outside product range {min:.2}..={max:.2}")]
    AmountOutOfRange { amount: f64, min: f64, max: f64 },

    /// Requested term falls outside the product limits
    #[error("Term {term} months outside product range {min}..={max}")]
    TermOutOfRange { term: u32, min: u32, max: u32 },

    /// Unknown product identifier
    #[error("Unknown product type: {0}")]
    UnknownProduct(String),

    /// Investment amount is zero, negative or not finite
    #[error("Invalid investment amount: {0}")]
    InvalidInvestment(f64),

    /// Investment would push funding past the loan amount
    #[error("Investment of {amount:.2} exceeds remaining {remaining:.2}")]
    ExceedsRemaining { amount: f64, remaining: f64 },

    /// Loan has already reached 100% funding
    #[error("Loan is already fully funded")]
    AlreadyFunded,
}

/// Result type alias for finance operations
pub type FinanceResult<T> = Result<T, FinanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FinanceError::InvalidTerm(0);
        assert_eq!(err.to_string(), "Invalid term: 0 months");

        let err = FinanceError::ExceedsRemaining {
            amount: 600.0,
            remaining: 500.0,
        };
        assert_eq!(
            err.to_string(),
            "Investment of 600.00 exceeds remaining 500.00"
        );
    }
}
