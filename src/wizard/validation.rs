//! Field and step validation

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, OnceLock};

use crate::finance::ProductType;

use super::steps::{FieldKind, FieldSpec, StepId};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const PHONE_PATTERN: &str = r"^\+?1?[\s.-]?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}$";

/// A single validation failure
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn regex_cache() -> &'static Mutex<HashMap<&'static str, Regex>> {
    static CACHE: OnceLock<Mutex<HashMap<&'static str, Regex>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Match against a static pattern, compiling it once
fn matches_pattern(pattern: &'static str, value: &str) -> bool {
    let mut cache = match regex_cache().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if !cache.contains_key(pattern) {
        match Regex::new(pattern) {
            Ok(re) => {
                cache.insert(pattern, re);
            }
            Err(e) => {
                tracing::error!(pattern, error = %e, "Invalid field pattern");
                return false;
            }
        }
    }
    cache.get(pattern).map(|re| re.is_match(value)).unwrap_or(false)
}

/// True for missing, null or blank-string values
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Read a dollar amount from a number or a string like "$1,250.50"
pub fn parse_currency(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}

/// Read a whole number from a number or numeric string
pub fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim)
}

/// Check one field's value against its spec
pub fn validate_field(spec: &FieldSpec, value: Option<&Value>) -> Result<(), FieldError> {
    if is_blank(value) {
        return if spec.required {
            Err(FieldError::new(spec.name, format!("{} is required", spec.label)))
        } else {
            Ok(())
        };
    }
    // Non-blank from here on
    let value = match value {
        Some(v) => v,
        None => return Ok(()),
    };
    let fail = |message: String| -> Result<(), FieldError> {
        Err(FieldError::new(spec.name, message))
    };

    match &spec.kind {
        FieldKind::Text { min_len, max_len } => match as_text(value) {
            Some(text) => {
                let len = text.chars().count();
                if len < *min_len {
                    fail(format!("{} must be at least {} characters", spec.label, min_len))
                } else if len > *max_len {
                    fail(format!("{} must be at most {} characters", spec.label, max_len))
                } else {
                    Ok(())
                }
            }
            None => fail(format!("{} must be text", spec.label)),
        },
        FieldKind::Email => match as_text(value) {
            Some(text) if matches_pattern(EMAIL_PATTERN, text) => Ok(()),
            _ => fail(format!("{} must be a valid email address", spec.label)),
        },
        FieldKind::Phone => match as_text(value) {
            Some(text) if matches_pattern(PHONE_PATTERN, text) => Ok(()),
            _ => fail(format!("{} must be a valid US phone number", spec.label)),
        },
        FieldKind::Currency { min, max } => match parse_currency(value) {
            Some(amount) if amount < *min => {
                fail(format!("{} must be at least ${:.2}", spec.label, min))
            }
            Some(amount) if amount > *max => {
                fail(format!("{} must be at most ${:.2}", spec.label, max))
            }
            Some(_) => Ok(()),
            None => fail(format!("{} must be a dollar amount", spec.label)),
        },
        FieldKind::Integer { min, max } => match parse_integer(value) {
            Some(n) if n < *min || n > *max => {
                fail(format!("{} must be between {} and {}", spec.label, min, max))
            }
            Some(_) => Ok(()),
            None => fail(format!("{} must be a whole number", spec.label)),
        },
        FieldKind::Select { options } => match as_text(value) {
            Some(text) if options.iter().any(|option| *option == text) => Ok(()),
            _ => fail(format!("{} must be one of: {}", spec.label, options.join(", "))),
        },
        FieldKind::Pattern { regex, hint } => match as_text(value) {
            Some(text) if matches_pattern(*regex, text) => Ok(()),
            _ => fail(format!("{} must match {}", spec.label, hint)),
        },
        FieldKind::Consent => match value {
            Value::Bool(true) => Ok(()),
            _ => fail(format!("{} must be accepted", spec.label)),
        },
    }
}

/// Validate every field of a step plus the step's cross-field rules
pub fn validate_step(step: StepId, values: &BTreeMap<String, Value>) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = step
        .fields()
        .iter()
        .filter_map(|spec| validate_field(spec, values.get(spec.name)).err())
        .collect();

    if errors.is_empty() {
        errors.extend(cross_field_errors(step, values));
    }
    errors
}

fn cross_field_errors(step: StepId, values: &BTreeMap<String, Value>) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match step {
        StepId::LoanRequest => {
            let product = values
                .get("product_type")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<ProductType>().ok());
            let amount = values.get("loan_amount").and_then(parse_currency);
            let term = values.get("term_months").and_then(parse_integer);

            if let (Some(product), Some(amount), Some(term)) = (product, amount, term) {
                let product = product.product();
                if let Err(e) = product.check_amount(amount) {
                    errors.push(FieldError::new(
                        "loan_amount",
                        format!("{} for {}", e, product.name),
                    ));
                }
                if let Err(e) = product.check_term(term.max(0) as u32) {
                    errors.push(FieldError::new(
                        "term_months",
                        format!("{} for {}", e, product.name),
                    ));
                }
            }
        }
        StepId::Financials => {
            let annual = values.get("annual_revenue").and_then(parse_currency);
            let monthly = values.get("monthly_revenue").and_then(parse_currency);
            if let (Some(annual), Some(monthly)) = (annual, monthly) {
                if monthly > annual {
                    errors.push(FieldError::new(
                        "monthly_revenue",
                        "Average Monthly Revenue cannot exceed Annual Revenue",
                    ));
                }
            }
        }
        _ => {}
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(name: &str) -> &'static FieldSpec {
        StepId::for_field(name)
            .and_then(|step| step.fields().iter().find(|f| f.name == name))
            .unwrap()
    }

    fn check(name: &str, value: Value) -> bool {
        validate_field(spec(name), Some(&value)).is_ok()
    }

    #[test]
    fn test_required_and_optional() {
        assert!(validate_field(spec("business_name"), None).is_err());
        assert!(validate_field(spec("business_name"), Some(&json!("   "))).is_err());
        assert!(validate_field(spec("existing_debt"), None).is_ok());
        assert!(validate_field(spec("existing_debt"), Some(&Value::Null)).is_ok());
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!(parse_currency(&json!("$12,500.50")), Some(12_500.5));
        assert_eq!(parse_currency(&json!(7500)), Some(7_500.0));
        assert_eq!(parse_currency(&json!("abc")), None);
        assert_eq!(parse_currency(&json!(true)), None);

        assert!(check("loan_amount", json!("25,000")));
        assert!(!check("loan_amount", json!(4_999.99)));
        assert!(!check("annual_revenue", json!(-1)));
    }

    #[test]
    fn test_integer_fields() {
        assert!(check("credit_score", json!(720)));
        assert!(check("credit_score", json!("680")));
        assert!(!check("credit_score", json!(299)));
        assert!(!check("credit_score", json!(851)));
        assert!(!check("term_months", json!(12.5)));
        assert!(check("term_months", json!(12.0)));
    }

    #[test]
    fn test_patterns() {
        assert!(check("ein", json!("12-3456789")));
        assert!(!check("ein", json!("123456789")));
        assert!(check("state", json!("CA")));
        assert!(!check("state", json!("California")));
        assert!(check("zip", json!("94103")));
        assert!(check("zip", json!("94103-1234")));
        assert!(!check("zip", json!("9410")));
    }

    #[test]
    fn test_email_and_phone() {
        assert!(check("email", json!("owner@shop.example")));
        assert!(!check("email", json!("owner@shop")));
        assert!(check("phone", json!("(415) 555-0199")));
        assert!(check("phone", json!("+1 415.555.0199")));
        assert!(!check("phone", json!("555-0199")));
    }

    #[test]
    fn test_select_and_consent() {
        assert!(check("product_type", json!("sba_loan")));
        assert!(!check("product_type", json!("payday_loan")));
        assert!(check("agree_terms", json!(true)));
        assert!(!check("agree_terms", json!(false)));
        assert!(!check("agree_terms", json!("yes")));
    }

    #[test]
    fn test_loan_request_product_limits() {
        let mut values = BTreeMap::new();
        values.insert("product_type".to_string(), json!("sba_loan"));
        values.insert("loan_amount".to_string(), json!(10_000));
        values.insert("term_months".to_string(), json!(12));
        values.insert(
            "loan_purpose".to_string(),
            json!("Purchase a second delivery van"),
        );

        let errors = validate_step(StepId::LoanRequest, &values);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["loan_amount", "term_months"]);

        values.insert("loan_amount".to_string(), json!(150_000));
        values.insert("term_months".to_string(), json!(120));
        assert!(validate_step(StepId::LoanRequest, &values).is_empty());
    }

    #[test]
    fn test_financials_cross_check() {
        let mut values = BTreeMap::new();
        values.insert("annual_revenue".to_string(), json!(100_000));
        values.insert("monthly_revenue".to_string(), json!(200_000));
        values.insert("credit_score".to_string(), json!(700));

        let errors = validate_step(StepId::Financials, &values);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "monthly_revenue");
    }
}
