//! Wizard session state machine
//!
//! ```text
//! loan_request → business_info → financials → contact → review → submit
//!      ↑_____________ back / goto (completed steps only) ____________|
//! ```
//!
//! `next` validates the current step before advancing. Values are merged
//! across updates, so a borrower can move back and forth without losing
//! what they typed.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::error::{WizardError, WizardResult};
use super::steps::{FieldSpec, StepId};
use super::validation::{parse_currency, parse_integer, validate_step, FieldError};
use crate::finance::{quote, ProductType};
use crate::store::{now_millis, BusinessDetails, ContactDetails, FinancialDetails, NewApplication};

/// One borrower's in-progress application
#[derive(Debug, Clone)]
pub struct WizardSession {
    pub id: Uuid,
    pub owner_id: Uuid,
    current: StepId,
    values: BTreeMap<String, Value>,
    completed: BTreeSet<StepId>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Step summary for clients
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepView {
    pub id: StepId,
    pub title: &'static str,
    pub completed: bool,
    pub available: bool,
}

/// Serializable snapshot of a session
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub id: Uuid,
    pub current_step: StepId,
    pub step_index: usize,
    pub steps: Vec<StepView>,
    pub fields: &'static [FieldSpec],
    pub values: BTreeMap<String, Value>,
    pub progress_percent: f64,
    pub complete: bool,
    pub updated_at: i64,
}

impl WizardSession {
    pub fn new(owner_id: Uuid) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            current: StepId::first(),
            values: BTreeMap::new(),
            completed: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn current_step(&self) -> StepId {
        self.current
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn is_step_complete(&self, step: StepId) -> bool {
        self.completed.contains(&step)
    }

    /// First step that has not been completed; the furthest a user may jump
    pub fn first_incomplete(&self) -> Option<StepId> {
        StepId::all()
            .iter()
            .copied()
            .find(|step| !self.completed.contains(step))
    }

    pub fn is_complete(&self) -> bool {
        self.first_incomplete().is_none()
    }

    pub fn progress_percent(&self) -> f64 {
        self.completed.len() as f64 / StepId::all().len() as f64 * 100.0
    }

    pub fn is_expired(&self, now_ms: i64, idle_ttl_ms: i64) -> bool {
        now_ms - self.updated_at > idle_ttl_ms
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = now_millis();
    }

    /// Merge field values.
    ///
    /// Unknown fields reject the whole update. Editing a field of a step
    /// that was already completed re-validates that step; if it no longer
    /// passes, the step is marked incomplete again.
    pub fn update(&mut self, values: Map<String, Value>) -> WizardResult<()> {
        if let Some(unknown) = values.keys().find(|k| StepId::for_field(k).is_none()) {
            return Err(WizardError::UnknownField(unknown.clone()));
        }

        let mut touched = BTreeSet::new();
        for (name, value) in values {
            if let Some(step) = StepId::for_field(&name) {
                touched.insert(step);
            }
            if value.is_null() {
                self.values.remove(&name);
            } else {
                self.values.insert(name, value);
            }
        }

        for step in touched {
            if self.completed.contains(&step) && !validate_step(step, &self.values).is_empty() {
                self.completed.remove(&step);
            }
        }
        self.touch();
        Ok(())
    }

    /// Validate the current step and advance.
    ///
    /// On the last step this only marks it complete.
    pub fn next(&mut self) -> WizardResult<StepId> {
        let errors = validate_step(self.current, &self.values);
        if !errors.is_empty() {
            return Err(WizardError::Invalid(errors));
        }

        self.completed.insert(self.current);
        if let Some(next) = self.current.next() {
            self.current = next;
        }
        self.touch();
        Ok(self.current)
    }

    pub fn back(&mut self) -> StepId {
        if let Some(previous) = self.current.previous() {
            self.current = previous;
        }
        self.touch();
        self.current
    }

    /// Jump to a completed step or the first incomplete one
    pub fn goto(&mut self, step: StepId) -> WizardResult<StepId> {
        let reachable = match self.first_incomplete() {
            Some(frontier) => step <= frontier || self.completed.contains(&step),
            None => true,
        };
        if !reachable {
            return Err(WizardError::StepLocked(step));
        }
        self.current = step;
        self.touch();
        Ok(step)
    }

    pub fn view(&self) -> WizardView {
        let frontier = self.first_incomplete();
        let steps = StepId::all()
            .iter()
            .map(|step| StepView {
                id: *step,
                title: step.title(),
                completed: self.completed.contains(step),
                available: frontier.map(|f| *step <= f).unwrap_or(true)
                    || self.completed.contains(step),
            })
            .collect();

        WizardView {
            id: self.id,
            current_step: self.current,
            step_index: self.current.index(),
            steps,
            fields: self.current.fields(),
            values: self.values.clone(),
            progress_percent: self.progress_percent(),
            complete: self.is_complete(),
            updated_at: self.updated_at,
        }
    }

    /// Validate every step and build the typed application.
    ///
    /// APR and monthly payment are priced from the product tables.
    pub fn build_submission(&self) -> WizardResult<NewApplication> {
        let errors: Vec<FieldError> = StepId::all()
            .iter()
            .flat_map(|step| validate_step(*step, &self.values))
            .collect();
        if !errors.is_empty() {
            return Err(WizardError::Invalid(errors));
        }

        let product_type: ProductType = self.text("product_type").parse()?;
        let loan_amount = self.currency("loan_amount");
        let term_months = self.integer("term_months") as u32;
        let priced = quote(product_type, loan_amount, term_months)?;

        Ok(NewApplication {
            borrower_id: self.owner_id,
            product_type,
            loan_amount,
            term_months,
            apr: priced.apr,
            monthly_payment: priced.monthly_payment,
            loan_purpose: self.text("loan_purpose"),
            business: BusinessDetails {
                business_name: self.text("business_name"),
                business_type: self.text("business_type"),
                industry: self.text("industry"),
                ein: self.text("ein"),
                years_in_business: self.integer("years_in_business") as u32,
                address: self.text("address"),
                city: self.text("city"),
                state: self.text("state"),
                zip: self.text("zip"),
            },
            financials: FinancialDetails {
                annual_revenue: self.currency("annual_revenue"),
                monthly_revenue: self.currency("monthly_revenue"),
                existing_debt: self.currency("existing_debt"),
                credit_score: self.integer("credit_score") as u32,
            },
            contact: ContactDetails {
                first_name: self.text("first_name"),
                last_name: self.text("last_name"),
                email: self.text("email").to_lowercase(),
                phone: self.text("phone"),
            },
        })
    }

    // Accessors below assume the values already passed validation

    fn text(&self, name: &str) -> String {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    fn currency(&self, name: &str) -> f64 {
        self.values.get(name).and_then(parse_currency).unwrap_or(0.0)
    }

    fn integer(&self, name: &str) -> i64 {
        self.values.get(name).and_then(parse_integer).unwrap_or(0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn step_values(step: StepId) -> Map<String, Value> {
        let value = match step {
            StepId::LoanRequest => json!({
                "product_type": "term_loan",
                "loan_amount": "$50,000",
                "term_months": 36,
                "loan_purpose": "Purchase new roasting equipment"
            }),
            StepId::BusinessInfo => json!({
                "business_name": "Ridge Coffee Roasters",
                "business_type": "llc",
                "industry": "Food & Beverage",
                "ein": "98-7654321",
                "years_in_business": 4,
                "address": "400 Pine Ave",
                "city": "Boulder",
                "state": "CO",
                "zip": "80302"
            }),
            StepId::Financials => json!({
                "annual_revenue": 620000,
                "monthly_revenue": 52000,
                "credit_score": 705
            }),
            StepId::Contact => json!({
                "first_name": "Sam",
                "last_name": "Ortiz",
                "email": "Sam@RidgeCoffee.example",
                "phone": "303-555-0110"
            }),
            StepId::Review => json!({ "agree_terms": true }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    pub(crate) fn completed_session(owner: Uuid) -> WizardSession {
        let mut session = WizardSession::new(owner);
        for step in StepId::all() {
            session.update(step_values(*step)).unwrap();
            session.next().unwrap();
        }
        session
    }

    #[test]
    fn test_new_session_starts_at_first_step() {
        let session = WizardSession::new(Uuid::new_v4());
        assert_eq!(session.current_step(), StepId::LoanRequest);
        assert_eq!(session.progress_percent(), 0.0);
        assert!(!session.is_complete());
    }

    #[test]
    fn test_next_requires_valid_step() {
        let mut session = WizardSession::new(Uuid::new_v4());
        match session.next() {
            Err(WizardError::Invalid(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected validation errors, got {:?}", other),
        }
        assert_eq!(session.current_step(), StepId::LoanRequest);

        session.update(step_values(StepId::LoanRequest)).unwrap();
        assert_eq!(session.next().unwrap(), StepId::BusinessInfo);
        assert!(session.is_step_complete(StepId::LoanRequest));
        assert_eq!(session.progress_percent(), 20.0);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut session = WizardSession::new(Uuid::new_v4());
        let mut values = Map::new();
        values.insert("loan_amount".to_string(), json!(10_000));
        values.insert("shoe_size".to_string(), json!(11));

        assert!(matches!(
            session.update(values),
            Err(WizardError::UnknownField(field)) if field == "shoe_size"
        ));
        assert!(session.values().is_empty());
    }

    #[test]
    fn test_back_and_goto() {
        let mut session = WizardSession::new(Uuid::new_v4());
        session.update(step_values(StepId::LoanRequest)).unwrap();
        session.next().unwrap();

        assert_eq!(session.back(), StepId::LoanRequest);
        assert_eq!(session.back(), StepId::LoanRequest);

        assert_eq!(session.goto(StepId::BusinessInfo).unwrap(), StepId::BusinessInfo);
        assert!(matches!(
            session.goto(StepId::Contact),
            Err(WizardError::StepLocked(StepId::Contact))
        ));

        // Values survive navigation
        assert_eq!(session.values()["term_months"], json!(36));
    }

    #[test]
    fn test_editing_completed_step_reopens_it() {
        let mut session = WizardSession::new(Uuid::new_v4());
        session.update(step_values(StepId::LoanRequest)).unwrap();
        session.next().unwrap();

        let mut edit = Map::new();
        edit.insert("loan_amount".to_string(), json!(100));
        session.update(edit).unwrap();
        assert!(!session.is_step_complete(StepId::LoanRequest));

        let view = session.view();
        assert!(!view.steps[0].completed);
        assert!(view.steps[0].available);
        assert!(view.steps[1].available);
        assert!(!view.steps[2].available);
    }

    #[test]
    fn test_full_walkthrough_builds_submission() {
        let owner = Uuid::new_v4();
        let session = completed_session(owner);
        assert!(session.is_complete());
        assert_eq!(session.current_step(), StepId::Review);
        assert_eq!(session.progress_percent(), 100.0);

        let app = session.build_submission().unwrap();
        assert_eq!(app.borrower_id, owner);
        assert_eq!(app.product_type, ProductType::TermLoan);
        assert_eq!(app.loan_amount, 50_000.0);
        assert_eq!(app.term_months, 36);
        assert_eq!(app.apr, 13.5);
        assert!(app.monthly_payment > 0.0);
        assert_eq!(app.financials.existing_debt, 0.0);
        assert_eq!(app.contact.email, "sam@ridgecoffee.example");
        assert_eq!(app.business.years_in_business, 4);
    }

    #[test]
    fn test_submission_rejects_missing_consent() {
        let mut session = WizardSession::new(Uuid::new_v4());
        for step in &StepId::all()[..4] {
            session.update(step_values(*step)).unwrap();
            session.next().unwrap();
        }
        assert!(matches!(
            session.build_submission(),
            Err(WizardError::Invalid(errors)) if errors[0].field == "agree_terms"
        ));
    }

    #[test]
    fn test_expiry() {
        let session = WizardSession::new(Uuid::new_v4());
        let ttl = 60_000;
        assert!(!session.is_expired(session.updated_at + ttl, ttl));
        assert!(session.is_expired(session.updated_at + ttl + 1, ttl));
    }
}
