//! Investment funding arithmetic
//!
//! Tracks how much of an approved loan investors have committed. Funded
//! amounts only grow, and the funding status moves forward through
//! `unfunded → partially_funded → fully_funded`, never back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{FinanceError, FinanceResult};

/// Half a cent. Amounts within this of the loan amount count as fully funded.
pub const FUNDING_EPSILON: f64 = 0.005;

/// Share of the loan an investment represents, in percent
pub fn investment_percentage(amount: f64, loan_amount: f64) -> FinanceResult<f64> {
    if !loan_amount.is_finite() || loan_amount <= 0.0 {
        return Err(FinanceError::InvalidPrincipal(loan_amount));
    }
    if !amount.is_finite() || amount < 0.0 {
        return Err(FinanceError::InvalidInvestment(amount));
    }
    Ok(amount / loan_amount * 100.0)
}

/// Funding progress of an application
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FundingStatus {
    #[default]
    Unfunded,
    PartiallyFunded,
    FullyFunded,
}

impl FundingStatus {
    /// Status implied by a funded amount
    pub fn from_amounts(funded_amount: f64, loan_amount: f64) -> Self {
        if funded_amount <= 0.0 {
            FundingStatus::Unfunded
        } else if funded_amount + FUNDING_EPSILON >= loan_amount {
            FundingStatus::FullyFunded
        } else {
            FundingStatus::PartiallyFunded
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FundingStatus::Unfunded => "unfunded",
            FundingStatus::PartiallyFunded => "partially_funded",
            FundingStatus::FullyFunded => "fully_funded",
        }
    }
}

impl fmt::Display for FundingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FundingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unfunded" => Ok(FundingStatus::Unfunded),
            "partially_funded" => Ok(FundingStatus::PartiallyFunded),
            "fully_funded" => Ok(FundingStatus::FullyFunded),
            other => Err(format!("unknown funding status '{}'", other)),
        }
    }
}

/// Outcome of applying one investment to a ledger
#[derive(Debug, Clone, PartialEq)]
pub struct FundingChange {
    pub amount: f64,
    pub percentage: f64,
    pub previous_status: FundingStatus,
    pub status: FundingStatus,
    pub funded_amount: f64,
}

impl FundingChange {
    /// True when this investment completed the loan
    pub fn completed_funding(&self) -> bool {
        self.previous_status != FundingStatus::FullyFunded
            && self.status == FundingStatus::FullyFunded
    }
}

/// Running funding total for one loan
#[derive(Debug, Clone, PartialEq)]
pub struct FundingLedger {
    pub loan_amount: f64,
    pub funded_amount: f64,
    pub status: FundingStatus,
}

impl FundingLedger {
    pub fn new(loan_amount: f64) -> Self {
        Self {
            loan_amount,
            funded_amount: 0.0,
            status: FundingStatus::Unfunded,
        }
    }

    /// Rebuild a ledger from persisted values
    pub fn restore(loan_amount: f64, funded_amount: f64, status: FundingStatus) -> Self {
        Self {
            loan_amount,
            funded_amount,
            status,
        }
    }

    /// Amount still open for investment
    pub fn remaining(&self) -> f64 {
        (self.loan_amount - self.funded_amount).max(0.0)
    }

    pub fn percent_funded(&self) -> f64 {
        if self.loan_amount <= 0.0 {
            return 0.0;
        }
        (self.funded_amount / self.loan_amount * 100.0).min(100.0)
    }

    /// Apply an investment.
    ///
    /// On error the ledger is left untouched.
    pub fn apply(&mut self, amount: f64) -> FinanceResult<FundingChange> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(FinanceError::InvalidInvestment(amount));
        }
        if self.status == FundingStatus::FullyFunded {
            return Err(FinanceError::AlreadyFunded);
        }

        let remaining = self.remaining();
        if amount > remaining + FUNDING_EPSILON {
            return Err(FinanceError::ExceedsRemaining { amount, remaining });
        }

        let percentage = investment_percentage(amount, self.loan_amount)?;
        let previous_status = self.status;

        self.funded_amount += amount;
        self.status = previous_status.max(FundingStatus::from_amounts(
            self.funded_amount,
            self.loan_amount,
        ));

        Ok(FundingChange {
            amount,
            percentage,
            previous_status,
            status: self.status,
            funded_amount: self.funded_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_investment_percentage() {
        assert_eq!(investment_percentage(2_500.0, 10_000.0).unwrap(), 25.0);
        assert_eq!(investment_percentage(10_000.0, 10_000.0).unwrap(), 100.0);
        assert!(investment_percentage(100.0, 0.0).is_err());
    }

    #[test]
    fn test_status_from_amounts() {
        assert_eq!(FundingStatus::from_amounts(0.0, 100.0), FundingStatus::Unfunded);
        assert_eq!(
            FundingStatus::from_amounts(50.0, 100.0),
            FundingStatus::PartiallyFunded
        );
        assert_eq!(
            FundingStatus::from_amounts(99.999, 100.0),
            FundingStatus::FullyFunded
        );
    }

    #[test]
    fn test_ledger_progression() {
        let mut ledger = FundingLedger::new(10_000.0);
        assert_eq!(ledger.status, FundingStatus::Unfunded);

        let first = ledger.apply(4_000.0).unwrap();
        assert_eq!(first.percentage, 40.0);
        assert_eq!(first.status, FundingStatus::PartiallyFunded);
        assert!(!first.completed_funding());

        let second = ledger.apply(6_000.0).unwrap();
        assert_eq!(second.previous_status, FundingStatus::PartiallyFunded);
        assert_eq!(second.status, FundingStatus::FullyFunded);
        assert!(second.completed_funding());
        assert_eq!(ledger.remaining(), 0.0);
        assert_eq!(ledger.percent_funded(), 100.0);
    }

    #[test]
    fn test_ledger_rejects_overfunding() {
        let mut ledger = FundingLedger::new(1_000.0);
        ledger.apply(700.0).unwrap();

        let err = ledger.apply(400.0).unwrap_err();
        assert!(matches!(err, FinanceError::ExceedsRemaining { .. }));
        assert_eq!(ledger.funded_amount, 700.0);

        ledger.apply(300.0).unwrap();
        assert_eq!(ledger.apply(1.0), Err(FinanceError::AlreadyFunded));
    }

    #[test]
    fn test_ledger_rejects_invalid_amounts() {
        let mut ledger = FundingLedger::new(1_000.0);
        assert!(ledger.apply(0.0).is_err());
        assert!(ledger.apply(-10.0).is_err());
        assert!(ledger.apply(f64::NAN).is_err());
        assert_eq!(ledger.status, FundingStatus::Unfunded);
    }

    #[test]
    fn test_funded_amount_monotonic_and_status_never_regresses() {
        let mut ledger = FundingLedger::new(3_333.33);
        let mut last_amount = 0.0;
        let mut last_status = FundingStatus::Unfunded;

        for _ in 0..20 {
            if ledger.status == FundingStatus::FullyFunded {
                break;
            }
            let step = ledger.remaining().min(250.0);
            let change = ledger.apply(step).unwrap();
            assert!(change.funded_amount > last_amount);
            assert!(change.status >= last_status);
            last_amount = change.funded_amount;
            last_status = change.status;
        }

        assert_eq!(ledger.status, FundingStatus::FullyFunded);
    }

    #[test]
    fn test_restored_status_is_kept() {
        // A persisted full status stays full even if amounts disagree
        let mut ledger = FundingLedger::restore(1_000.0, 400.0, FundingStatus::FullyFunded);
        assert_eq!(ledger.apply(100.0), Err(FinanceError::AlreadyFunded));
    }
}
