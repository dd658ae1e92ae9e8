//! Product and rate tables
//!
//! Static lookup data for the lending products offered on the marketplace
//! and the term adjustment table used to price them.
//!
//! ```text
//! APR = product.base_apr + adjustment(term_months)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::amortization::{calculate_monthly_payment, monthly_rate};
use super::error::{FinanceError, FinanceResult};

/// Term → APR points added, as `(max_term_months, points)`.
///
/// Rows are sorted by term and points never decrease, so the resulting APR
/// is non-decreasing in term length. Terms beyond the last row use
/// [`LONG_TERM_ADJUSTMENT`].
pub const TERM_ADJUSTMENTS: &[(u32, f64)] = &[
    (6, 0.0),
    (12, 0.5),
    (24, 1.0),
    (36, 1.5),
    (60, 2.5),
    (120, 3.5),
];

/// Adjustment for terms longer than every row in [`TERM_ADJUSTMENTS`]
pub const LONG_TERM_ADJUSTMENT: f64 = 4.5;

/// Lending products offered to borrowers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    TermLoan,
    LineOfCredit,
    SbaLoan,
    EquipmentFinancing,
    InvoiceFactoring,
    MerchantCashAdvance,
    CommercialRealEstate,
}

impl ProductType {
    /// All products, in catalog order
    pub fn all() -> &'static [ProductType] {
        &[
            ProductType::TermLoan,
            ProductType::LineOfCredit,
            ProductType::SbaLoan,
            ProductType::EquipmentFinancing,
            ProductType::InvoiceFactoring,
            ProductType::MerchantCashAdvance,
            ProductType::CommercialRealEstate,
        ]
    }

    /// Wire identifier (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::TermLoan => "term_loan",
            ProductType::LineOfCredit => "line_of_credit",
            ProductType::SbaLoan => "sba_loan",
            ProductType::EquipmentFinancing => "equipment_financing",
            ProductType::InvoiceFactoring => "invoice_factoring",
            ProductType::MerchantCashAdvance => "merchant_cash_advance",
            ProductType::CommercialRealEstate => "commercial_real_estate",
        }
    }

    /// Catalog entry for this product
    pub fn product(&self) -> &'static Product {
        PRODUCTS
            .iter()
            .find(|p| p.product_type == *self)
            .unwrap_or(&PRODUCTS[0])
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductType::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| FinanceError::UnknownProduct(s.to_string()))
    }
}

/// A lending product definition
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Product {
    pub product_type: ProductType,
    pub name: &'static str,
    pub description: &'static str,
    /// Base APR in percent, before the term adjustment
    pub base_apr: f64,
    pub min_amount: f64,
    pub max_amount: f64,
    pub min_term_months: u32,
    pub max_term_months: u32,
}

static PRODUCTS: [Product; 7] = [
    Product {
        product_type: ProductType::TermLoan,
        name: "Term Loan",
        description: "Lump-sum financing repaid in fixed monthly installments",
        base_apr: 12.0,
        min_amount: 10_000.0,
        max_amount: 500_000.0,
        min_term_months: 6,
        max_term_months: 60,
    },
    Product {
        product_type: ProductType::LineOfCredit,
        name: "Business Line of Credit",
        description: "Revolving working capital drawn as needed",
        base_apr: 18.0,
        min_amount: 5_000.0,
        max_amount: 250_000.0,
        min_term_months: 6,
        max_term_months: 24,
    },
    Product {
        product_type: ProductType::SbaLoan,
        name: "SBA Loan",
        description: "Government-backed long-term financing",
        base_apr: 9.5,
        min_amount: 25_000.0,
        max_amount: 5_000_000.0,
        min_term_months: 60,
        max_term_months: 300,
    },
    Product {
        product_type: ProductType::EquipmentFinancing,
        name: "Equipment Financing",
        description: "Loans secured by the equipment being purchased",
        base_apr: 11.0,
        min_amount: 10_000.0,
        max_amount: 2_000_000.0,
        min_term_months: 12,
        max_term_months: 84,
    },
    Product {
        product_type: ProductType::InvoiceFactoring,
        name: "Invoice Factoring",
        description: "Advances against outstanding receivables",
        base_apr: 20.0,
        min_amount: 5_000.0,
        max_amount: 500_000.0,
        min_term_months: 3,
        max_term_months: 12,
    },
    Product {
        product_type: ProductType::MerchantCashAdvance,
        name: "Merchant Cash Advance",
        description: "Advances repaid from future card sales",
        base_apr: 25.0,
        min_amount: 5_000.0,
        max_amount: 250_000.0,
        min_term_months: 3,
        max_term_months: 18,
    },
    Product {
        product_type: ProductType::CommercialRealEstate,
        name: "Commercial Real Estate",
        description: "Purchase or refinance of owner-occupied property",
        base_apr: 8.5,
        min_amount: 100_000.0,
        max_amount: 10_000_000.0,
        min_term_months: 60,
        max_term_months: 360,
    },
];

impl Product {
    /// The full product catalog
    pub fn catalog() -> &'static [Product] {
        &PRODUCTS
    }

    /// Validate an amount against this product's limits
    pub fn check_amount(&self, amount: f64) -> FinanceResult<()> {
        if !amount.is_finite() || amount < self.min_amount || amount > self.max_amount {
            return Err(FinanceError::AmountOutOfRange {
                amount,
                min: self.min_amount,
                max: self.max_amount,
            });
        }
        Ok(())
    }

    /// Validate a term against this product's limits
    pub fn check_term(&self, term_months: u32) -> FinanceResult<()> {
        if term_months < self.min_term_months || term_months > self.max_term_months {
            return Err(FinanceError::TermOutOfRange {
                term: term_months,
                min: self.min_term_months,
                max: self.max_term_months,
            });
        }
        Ok(())
    }
}

/// APR points added for a given term length
pub fn term_adjustment(term_months: u32) -> f64 {
    TERM_ADJUSTMENTS
        .iter()
        .find(|(max_term, _)| term_months <= *max_term)
        .map(|(_, points)| *points)
        .unwrap_or(LONG_TERM_ADJUSTMENT)
}

/// Annual percentage rate for a product at a given term
pub fn calculate_apr(product_type: ProductType, term_months: u32) -> f64 {
    product_type.product().base_apr + term_adjustment(term_months)
}

/// A priced loan offer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentQuote {
    pub product_type: ProductType,
    pub amount: f64,
    pub term_months: u32,
    pub apr: f64,
    pub monthly_payment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
}

/// Price a loan for the given product, amount and term.
///
/// Fails when the amount or term is outside the product's limits.
pub fn quote(
    product_type: ProductType,
    amount: f64,
    term_months: u32,
) -> FinanceResult<PaymentQuote> {
    let product = product_type.product();
    product.check_amount(amount)?;
    product.check_term(term_months)?;

    let apr = calculate_apr(product_type, term_months);
    let monthly_payment = calculate_monthly_payment(amount, monthly_rate(apr), term_months)?;
    let total_payment = monthly_payment * term_months as f64;

    Ok(PaymentQuote {
        product_type,
        amount,
        term_months,
        apr,
        monthly_payment,
        total_payment,
        total_interest: total_payment - amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_product() {
        assert_eq!(Product::catalog().len(), ProductType::all().len());
        for product_type in ProductType::all() {
            assert_eq!(product_type.product().product_type, *product_type);
        }
    }

    #[test]
    fn test_term_adjustment_table() {
        assert_eq!(term_adjustment(3), 0.0);
        assert_eq!(term_adjustment(6), 0.0);
        assert_eq!(term_adjustment(7), 0.5);
        assert_eq!(term_adjustment(36), 1.5);
        assert_eq!(term_adjustment(60), 2.5);
        assert_eq!(term_adjustment(121), LONG_TERM_ADJUSTMENT);
    }

    #[test]
    fn test_apr_non_decreasing_in_term() {
        for product_type in ProductType::all() {
            let mut previous = f64::NEG_INFINITY;
            for term in 1..=400 {
                let apr = calculate_apr(*product_type, term);
                assert!(
                    apr >= previous,
                    "{} APR dropped at term {}: {} < {}",
                    product_type,
                    term,
                    apr,
                    previous
                );
                previous = apr;
            }
        }
    }

    #[test]
    fn test_apr_includes_base_rate() {
        assert_eq!(calculate_apr(ProductType::TermLoan, 12), 12.5);
        assert_eq!(calculate_apr(ProductType::SbaLoan, 120), 13.0);
    }

    #[test]
    fn test_product_type_parse() {
        assert_eq!(
            "line_of_credit".parse::<ProductType>().unwrap(),
            ProductType::LineOfCredit
        );
        assert!(matches!(
            "payday".parse::<ProductType>(),
            Err(FinanceError::UnknownProduct(_))
        ));
    }

    #[test]
    fn test_quote_within_limits() {
        let q = quote(ProductType::TermLoan, 50_000.0, 36).unwrap();
        assert_eq!(q.apr, 13.5);
        assert!(q.monthly_payment > 50_000.0 / 36.0);
        assert!((q.total_payment - q.monthly_payment * 36.0).abs() < 1e-9);
        assert!((q.total_interest - (q.total_payment - 50_000.0)).abs() < 1e-9);
    }

    #[test]
    fn test_quote_rejects_out_of_range() {
        assert!(matches!(
            quote(ProductType::TermLoan, 1_000.0, 36),
            Err(FinanceError::AmountOutOfRange { .. })
        ));
        assert!(matches!(
            quote(ProductType::LineOfCredit, 20_000.0, 48),
            Err(FinanceError::TermOutOfRange { .. })
        ));
    }
}
