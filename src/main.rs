//! LendBridge demo
//!
//! Runs one loan through the whole pipeline against an in-memory database:
//! apply, review, approve, fund.

use anyhow::Context;
use lendbridge::auth::Authenticator;
use lendbridge::config::LoggingConfig;
use lendbridge::finance::AmortizationSchedule;
use lendbridge::store::{ApplicationStatus, Role, Store};
use lendbridge::wizard::{StepId, WizardSession};
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn step_values(step: StepId) -> Map<String, Value> {
    let values = match step {
        StepId::LoanRequest => json!({
            "product_type": "equipment_financing",
            "loan_amount": "120,000",
            "term_months": 48,
            "loan_purpose": "Two CNC milling machines for the new line"
        }),
        StepId::BusinessInfo => json!({
            "business_name": "Harbor Precision Parts",
            "business_type": "corporation",
            "industry": "Manufacturing",
            "ein": "41-2233445",
            "years_in_business": 11,
            "address": "18 Dock Street",
            "city": "Portland",
            "state": "ME",
            "zip": "04101"
        }),
        StepId::Financials => json!({
            "annual_revenue": 2_400_000,
            "monthly_revenue": 200_000,
            "existing_debt": 150_000,
            "credit_score": 742
        }),
        StepId::Contact => json!({
            "first_name": "Dana",
            "last_name": "Reyes",
            "email": "dana@harborprecision.example",
            "phone": "(207) 555-0143"
        }),
        StepId::Review => json!({ "agree_terms": true }),
    };
    match values {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn main() -> anyhow::Result<()> {
    lendbridge::logging::init(&LoggingConfig::default());
    tracing::info!("LendBridge demo v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(Store::open_in_memory().context("opening in-memory database")?);
    let auth = Authenticator::new(Arc::clone(&store), 3600);

    let admin = auth.register("admin@lendbridge.example", "Admin", "demo-admin-pass", Role::Admin)?;
    let borrower = auth.register(
        "dana@harborprecision.example",
        "Dana Reyes",
        "demo-borrower-pass",
        Role::Borrower,
    )?;
    let investors = [
        auth.register(
            "north@capital.example",
            "North Capital",
            "demo-investor-pass",
            Role::Investor,
        )?,
        auth.register("bay@fund.example", "Bay Fund", "demo-investor-pass", Role::Investor)?,
    ];

    // Borrower fills in the form
    let mut session = WizardSession::new(borrower.id);
    for step in StepId::all() {
        session.update(step_values(*step))?;
        session.next().with_context(|| format!("completing step {}", step))?;
    }
    let application = store.insert_application(session.build_submission()?)?;
    tracing::info!(
        application_id = %application.id,
        apr = application.apr,
        monthly_payment = application.monthly_payment,
        "Application filed"
    );

    // Admin review
    store.update_status(application.id, ApplicationStatus::UnderReview, admin.id, None)?;
    store.update_status(
        application.id,
        ApplicationStatus::Approved,
        admin.id,
        Some("Strong revenue, collateralized by equipment".to_string()),
    )?;

    // Investors fund it in two slices
    let first = store.record_investment(application.id, investors[0].id, 80_000.0)?;
    tracing::info!(
        percent_funded = first.application.percent_funded(),
        status = %first.application.funding_status,
        "First slice funded"
    );
    let remaining = first.application.remaining_amount();
    let last = store.record_investment(application.id, investors[1].id, remaining)?;
    tracing::info!(status = %last.application.status, "Loan fully funded");

    let schedule = AmortizationSchedule::generate(
        last.application.loan_amount,
        last.application.apr,
        last.application.term_months,
    )?;
    let summary = schedule.summary();
    tracing::info!(
        monthly_payment = summary.monthly_payment,
        total_interest = summary.total_interest,
        "Amortization summary"
    );

    for investor in &investors {
        let portfolio = store.portfolio_summary(investor.id)?;
        tracing::info!(
            investor = %investor.email,
            invested = portfolio.total_invested,
            monthly_income = portfolio.expected_monthly_income,
            "Portfolio"
        );
    }

    let stats = store.pipeline_stats()?;
    tracing::info!(
        applications = stats.total_applications,
        requested = stats.total_requested,
        funded = stats.total_funded,
        "Pipeline stats"
    );

    Ok(())
}
