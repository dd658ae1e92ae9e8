//! Application form definition
//!
//! Five steps, each a fixed list of fields. The definitions are static so
//! clients can fetch them and render the form without hard-coding it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wizard steps in the order they are completed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    LoanRequest,
    BusinessInfo,
    Financials,
    Contact,
    Review,
}

impl StepId {
    pub fn all() -> &'static [StepId] {
        &[
            StepId::LoanRequest,
            StepId::BusinessInfo,
            StepId::Financials,
            StepId::Contact,
            StepId::Review,
        ]
    }

    pub fn first() -> StepId {
        StepId::LoanRequest
    }

    /// Zero-based position
    pub fn index(&self) -> usize {
        StepId::all()
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }

    pub fn from_index(index: usize) -> Option<StepId> {
        StepId::all().get(index).copied()
    }

    pub fn next(&self) -> Option<StepId> {
        StepId::from_index(self.index() + 1)
    }

    pub fn previous(&self) -> Option<StepId> {
        self.index().checked_sub(1).and_then(StepId::from_index)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::LoanRequest => "loan_request",
            StepId::BusinessInfo => "business_info",
            StepId::Financials => "financials",
            StepId::Contact => "contact",
            StepId::Review => "review",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            StepId::LoanRequest => "Loan Request",
            StepId::BusinessInfo => "Business Information",
            StepId::Financials => "Financial Information",
            StepId::Contact => "Contact Details",
            StepId::Review => "Review & Submit",
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            StepId::LoanRequest => &LOAN_REQUEST_FIELDS,
            StepId::BusinessInfo => &BUSINESS_INFO_FIELDS,
            StepId::Financials => &FINANCIAL_FIELDS,
            StepId::Contact => &CONTACT_FIELDS,
            StepId::Review => &REVIEW_FIELDS,
        }
    }

    /// Step that owns a field, if any
    pub fn for_field(name: &str) -> Option<StepId> {
        StepId::all()
            .iter()
            .copied()
            .find(|step| step.fields().iter().any(|f| f.name == name))
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepId::all()
            .iter()
            .copied()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown step '{}'", s))
    }
}

/// How a field's value is checked
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text { min_len: usize, max_len: usize },
    Email,
    Phone,
    /// Dollar amount; accepts numbers or strings like "$12,500.00"
    Currency { min: f64, max: f64 },
    Integer { min: i64, max: i64 },
    Select { options: &'static [&'static str] },
    Pattern { regex: &'static str, hint: &'static str },
    /// Checkbox that must be ticked
    Consent,
}

/// One form field
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn field(name: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        required: false,
    }
}

/// Smallest loan the marketplace accepts
pub const MIN_LOAN_AMOUNT: f64 = 5_000.0;
pub const MAX_LOAN_AMOUNT: f64 = 10_000_000.0;

pub const PRODUCT_OPTIONS: &[&str] = &[
    "term_loan",
    "line_of_credit",
    "sba_loan",
    "equipment_financing",
    "invoice_factoring",
    "merchant_cash_advance",
    "commercial_real_estate",
];

pub const BUSINESS_TYPE_OPTIONS: &[&str] = &[
    "sole_proprietorship",
    "partnership",
    "llc",
    "corporation",
    "s_corporation",
    "nonprofit",
];

static LOAN_REQUEST_FIELDS: [FieldSpec; 4] = [
    field(
        "product_type",
        "Loan Product",
        FieldKind::Select {
            options: PRODUCT_OPTIONS,
        },
    ),
    field(
        "loan_amount",
        "Requested Amount",
        FieldKind::Currency {
            min: MIN_LOAN_AMOUNT,
            max: MAX_LOAN_AMOUNT,
        },
    ),
    field(
        "term_months",
        "Term (months)",
        FieldKind::Integer { min: 3, max: 360 },
    ),
    field(
        "loan_purpose",
        "Use of Funds",
        FieldKind::Text {
            min_len: 10,
            max_len: 1000,
        },
    ),
];

static BUSINESS_INFO_FIELDS: [FieldSpec; 9] = [
    field(
        "business_name",
        "Legal Business Name",
        FieldKind::Text {
            min_len: 2,
            max_len: 200,
        },
    ),
    field(
        "business_type",
        "Entity Type",
        FieldKind::Select {
            options: BUSINESS_TYPE_OPTIONS,
        },
    ),
    field(
        "industry",
        "Industry",
        FieldKind::Text {
            min_len: 2,
            max_len: 100,
        },
    ),
    field(
        "ein",
        "Employer Identification Number",
        FieldKind::Pattern {
            regex: r"^\d{2}-\d{7}$",
            hint: "format NN-NNNNNNN",
        },
    ),
    field(
        "years_in_business",
        "Years in Business",
        FieldKind::Integer { min: 0, max: 200 },
    ),
    field(
        "address",
        "Street Address",
        FieldKind::Text {
            min_len: 3,
            max_len: 200,
        },
    ),
    field(
        "city",
        "City",
        FieldKind::Text {
            min_len: 2,
            max_len: 100,
        },
    ),
    field(
        "state",
        "State",
        FieldKind::Pattern {
            regex: r"^[A-Z]{2}$",
            hint: "two-letter state code",
        },
    ),
    field(
        "zip",
        "ZIP Code",
        FieldKind::Pattern {
            regex: r"^\d{5}(-\d{4})?$",
            hint: "NNNNN or NNNNN-NNNN",
        },
    ),
];

static FINANCIAL_FIELDS: [FieldSpec; 4] = [
    field(
        "annual_revenue",
        "Annual Revenue",
        FieldKind::Currency {
            min: 0.0,
            max: 1_000_000_000.0,
        },
    ),
    field(
        "monthly_revenue",
        "Average Monthly Revenue",
        FieldKind::Currency {
            min: 0.0,
            max: 100_000_000.0,
        },
    ),
    optional(
        "existing_debt",
        "Existing Business Debt",
        FieldKind::Currency {
            min: 0.0,
            max: 1_000_000_000.0,
        },
    ),
    field(
        "credit_score",
        "Owner Credit Score",
        FieldKind::Integer { min: 300, max: 850 },
    ),
];

static CONTACT_FIELDS: [FieldSpec; 4] = [
    field(
        "first_name",
        "First Name",
        FieldKind::Text {
            min_len: 1,
            max_len: 100,
        },
    ),
    field(
        "last_name",
        "Last Name",
        FieldKind::Text {
            min_len: 1,
            max_len: 100,
        },
    ),
    field("email", "Email", FieldKind::Email),
    field("phone", "Phone", FieldKind::Phone),
];

static REVIEW_FIELDS: [FieldSpec; 1] = [field(
    "agree_terms",
    "I certify the information provided is accurate",
    FieldKind::Consent,
)];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::ProductType;
    use std::collections::HashSet;

    #[test]
    fn test_step_navigation_helpers() {
        assert_eq!(StepId::first().next(), Some(StepId::BusinessInfo));
        assert_eq!(StepId::first().previous(), None);
        assert_eq!(StepId::Review.next(), None);
        assert_eq!(StepId::Contact.previous(), Some(StepId::Financials));
        assert_eq!(StepId::Financials.index(), 2);
        assert_eq!("review".parse::<StepId>().unwrap(), StepId::Review);
    }

    #[test]
    fn test_field_names_unique() {
        let mut seen = HashSet::new();
        for step in StepId::all() {
            for field in step.fields() {
                assert!(seen.insert(field.name), "duplicate field {}", field.name);
                assert_eq!(StepId::for_field(field.name), Some(*step));
            }
        }
        assert_eq!(StepId::for_field("favorite_color"), None);
    }

    #[test]
    fn test_product_options_match_catalog() {
        let catalog: Vec<&str> = ProductType::all().iter().map(|p| p.as_str()).collect();
        assert_eq!(PRODUCT_OPTIONS.to_vec(), catalog);
    }
}
