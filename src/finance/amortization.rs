//! Amortization math
//!
//! Closed-form fixed payment and per-period schedule generation.
//!
//! ```text
//! M = P · r(1+r)^n / ((1+r)^n − 1)      (r > 0)
//! M = P / n                              (r = 0)
//! ```

use serde::Serialize;

use super::error::{FinanceError, FinanceResult};

/// Longest term any schedule is generated for
pub const MAX_TERM_MONTHS: u32 = 360;

/// Convert an APR in percent to a monthly rate
pub fn monthly_rate(apr_percent: f64) -> f64 {
    apr_percent / 100.0 / 12.0
}

/// Fixed monthly payment for principal `principal`, monthly rate `rate`
/// and `term_months` periods.
pub fn calculate_monthly_payment(
    principal: f64,
    rate: f64,
    term_months: u32,
) -> FinanceResult<f64> {
    if !principal.is_finite() || principal < 0.0 {
        return Err(FinanceError::InvalidPrincipal(principal));
    }
    if !rate.is_finite() || rate < 0.0 {
        return Err(FinanceError::InvalidRate(rate));
    }
    if term_months == 0 || term_months > MAX_TERM_MONTHS {
        return Err(FinanceError::InvalidTerm(term_months));
    }

    let n = term_months as f64;
    if rate == 0.0 {
        return Ok(principal / n);
    }

    let growth = (1.0 + rate).powf(n);
    let payment = principal * rate * growth / (growth - 1.0);
    // (1+r)^n overflows for absurd rates
    if !growth.is_finite() || !payment.is_finite() {
        return Err(FinanceError::InvalidRate(rate));
    }
    Ok(payment)
}

/// Round to whole cents
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One row of an amortization schedule
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Payment {
    /// 1-based payment number
    pub period: u32,
    pub payment: f64,
    pub principal_portion: f64,
    pub interest_portion: f64,
    pub remaining_balance: f64,
}

/// Totals over a full schedule
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentSummary {
    pub monthly_payment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
}

/// Per-period breakdown of a fixed-payment loan
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AmortizationSchedule {
    pub principal: f64,
    pub apr: f64,
    pub term_months: u32,
    pub monthly_payment: f64,
    pub payments: Vec<Payment>,
}

impl AmortizationSchedule {
    /// Build the schedule for a loan.
    ///
    /// The last period pays off whatever balance remains, so its remaining
    /// balance is exactly zero and the principal portions sum to `principal`.
    pub fn generate(principal: f64, apr_percent: f64, term_months: u32) -> FinanceResult<Self> {
        if !apr_percent.is_finite() || apr_percent < 0.0 {
            return Err(FinanceError::InvalidRate(apr_percent));
        }
        let rate = monthly_rate(apr_percent);
        let monthly_payment = calculate_monthly_payment(principal, rate, term_months)?;

        let mut payments = Vec::with_capacity(term_months as usize);
        let mut balance = principal;

        for period in 1..=term_months {
            let interest_portion = balance * rate;
            let (principal_portion, payment) = if period == term_months {
                (balance, balance + interest_portion)
            } else {
                (monthly_payment - interest_portion, monthly_payment)
            };

            balance = if period == term_months {
                0.0
            } else {
                balance - principal_portion
            };

            payments.push(Payment {
                period,
                payment,
                principal_portion,
                interest_portion,
                remaining_balance: balance,
            });
        }

        Ok(Self {
            principal,
            apr: apr_percent,
            term_months,
            monthly_payment,
            payments,
        })
    }

    /// Totals across every period
    pub fn summary(&self) -> PaymentSummary {
        let total_payment: f64 = self.payments.iter().map(|p| p.payment).sum();
        PaymentSummary {
            monthly_payment: self.monthly_payment,
            total_payment,
            total_interest: total_payment - self.principal,
        }
    }

    /// Sum of principal portions; equals the principal up to float drift
    pub fn total_principal(&self) -> f64 {
        self.payments.iter().map(|p| p.principal_portion).sum()
    }

    /// Render as CSV with amounts rounded to cents
    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "period",
            "payment",
            "principal_portion",
            "interest_portion",
            "remaining_balance",
        ])?;

        for p in &self.payments {
            writer.write_record([
                p.period.to_string(),
                format!("{:.2}", p.payment),
                format!("{:.2}", p.principal_portion),
                format!("{:.2}", p.interest_portion),
                format!("{:.2}", p.remaining_balance),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_matches_closed_form() {
        let principal = 10_000.0;
        let rate = monthly_rate(25.0);
        let n = 12;

        let m = calculate_monthly_payment(principal, rate, n).unwrap();
        let growth = (1.0 + rate).powi(n as i32);
        let expected = principal * rate * growth / (growth - 1.0);

        assert!((rate - 0.020833).abs() < 1e-6);
        assert!((m - expected).abs() < 1e-9);
        assert!((round_cents(m) - 950.44).abs() < 1e-9);
    }

    #[test]
    fn test_total_interest_example() {
        let schedule = AmortizationSchedule::generate(10_000.0, 25.0, 12).unwrap();
        let summary = schedule.summary();
        assert!((round_cents(summary.total_interest) - 1405.30).abs() < 0.011);
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let m = calculate_monthly_payment(12_000.0, 0.0, 24).unwrap();
        assert_eq!(m, 500.0);

        let schedule = AmortizationSchedule::generate(12_000.0, 0.0, 24).unwrap();
        assert!(schedule.payments.iter().all(|p| p.interest_portion == 0.0));
        assert_eq!(schedule.summary().total_interest, 0.0);
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(
            calculate_monthly_payment(1000.0, 0.01, 0),
            Err(FinanceError::InvalidTerm(0))
        );
        assert!(matches!(
            calculate_monthly_payment(-1.0, 0.01, 12),
            Err(FinanceError::InvalidPrincipal(_))
        ));
        assert!(matches!(
            calculate_monthly_payment(1000.0, f64::NAN, 12),
            Err(FinanceError::InvalidRate(_))
        ));
        assert!(matches!(
            AmortizationSchedule::generate(1000.0, -5.0, 12),
            Err(FinanceError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_term_capped() {
        assert!(calculate_monthly_payment(1000.0, 0.01, MAX_TERM_MONTHS).is_ok());
        assert_eq!(
            calculate_monthly_payment(1000.0, 0.01, MAX_TERM_MONTHS + 1),
            Err(FinanceError::InvalidTerm(MAX_TERM_MONTHS + 1))
        );
        assert_eq!(
            AmortizationSchedule::generate(1000.0, 10.0, u32::MAX).unwrap_err(),
            FinanceError::InvalidTerm(u32::MAX)
        );
    }

    #[test]
    fn test_overflowing_rate_rejected() {
        assert!(matches!(
            AmortizationSchedule::generate(1000.0, 1e300, 12),
            Err(FinanceError::InvalidRate(_))
        ));
        assert!(matches!(
            calculate_monthly_payment(1000.0, 1e30, 360),
            Err(FinanceError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_schedule_principal_sums_to_loan() {
        for (principal, apr, term) in [
            (10_000.0, 25.0, 12),
            (250_000.0, 9.75, 300),
            (5_000.0, 18.0, 3),
            (1_234_567.89, 8.5, 360),
        ] {
            let schedule = AmortizationSchedule::generate(principal, apr, term).unwrap();
            assert_eq!(schedule.payments.len(), term as usize);
            assert!(
                (schedule.total_principal() - principal).abs() < 0.01,
                "principal drift for {} @ {}% x {}",
                principal,
                apr,
                term
            );
            assert_eq!(schedule.payments.last().unwrap().remaining_balance, 0.0);
        }
    }

    #[test]
    fn test_balance_decreases_each_period() {
        let schedule = AmortizationSchedule::generate(50_000.0, 12.0, 36).unwrap();
        let balances: Vec<f64> = schedule
            .payments
            .iter()
            .map(|p| p.remaining_balance)
            .collect();
        assert!(balances.windows(2).all(|w| w[1] < w[0]));
        // Interest share shrinks as the balance is paid down
        assert!(schedule.payments[0].interest_portion > schedule.payments[35].interest_portion);
    }

    #[test]
    fn test_csv_export() {
        let schedule = AmortizationSchedule::generate(1_200.0, 0.0, 3).unwrap();
        let csv = schedule.to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "period,payment,principal_portion,interest_portion,remaining_balance"
        );
        assert_eq!(lines[3], "3,400.00,400.00,0.00,0.00");
    }
}
