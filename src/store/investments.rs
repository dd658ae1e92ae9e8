//! Investments and the funding transaction

use rusqlite::{params, Row};
use uuid::Uuid;

use crate::finance::FundingLedger;
use crate::store::applications::{insert_history, load_application, parsed};
use crate::store::db::Store;
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{
    now_millis, ApplicationStatus, Investment, InvestmentReceipt, PortfolioSummary, StatusChange,
};

const INVESTMENT_COLUMNS: &str = "id, application_id, investor_id, amount, percentage, created_at";

fn investment_from_row(row: &Row<'_>) -> rusqlite::Result<Investment> {
    Ok(Investment {
        id: parsed(row, 0)?,
        application_id: parsed(row, 1)?,
        investor_id: parsed(row, 2)?,
        amount: row.get(3)?,
        percentage: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl Store {
    /// Commit `amount` from `investor_id` toward an approved application.
    ///
    /// Runs as one transaction: the funding ledger is checked and advanced,
    /// the investment row is written, and the application moves to `funded`
    /// when the ledger reaches 100%.
    pub fn record_investment(
        &self,
        application_id: Uuid,
        investor_id: Uuid,
        amount: f64,
    ) -> StoreResult<InvestmentReceipt> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let application = load_application(&tx, application_id)?;
        if application.status != ApplicationStatus::Approved {
            return Err(StoreError::Conflict(format!(
                "application {} is {} and not open for investment",
                application_id, application.status
            )));
        }

        let mut ledger = FundingLedger::restore(
            application.loan_amount,
            application.funded_amount,
            application.funding_status,
        );
        let change = ledger.apply(amount)?;

        let now = now_millis();
        let investment = Investment {
            id: Uuid::new_v4(),
            application_id,
            investor_id,
            amount,
            percentage: change.percentage,
            created_at: now,
        };

        tx.execute(
            &format!(
                "INSERT INTO investments ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                INVESTMENT_COLUMNS
            ),
            params![
                investment.id.to_string(),
                application_id.to_string(),
                investor_id.to_string(),
                investment.amount,
                investment.percentage,
                investment.created_at
            ],
        )?;

        let status = if change.completed_funding() {
            ApplicationStatus::Funded
        } else {
            application.status
        };

        tx.execute(
            "UPDATE applications
             SET funded_amount = ?1, funding_status = ?2, status = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                change.funded_amount,
                change.status.as_str(),
                status.as_str(),
                now,
                application_id.to_string()
            ],
        )?;

        if status != application.status {
            insert_history(
                &tx,
                &StatusChange {
                    application_id,
                    from_status: Some(application.status),
                    to_status: status,
                    changed_by: None,
                    note: Some("Reached 100% funding".to_string()),
                    changed_at: now,
                },
            )?;
        }

        let application = load_application(&tx, application_id)?;
        tx.commit()?;

        tracing::info!(
            application_id = %application_id,
            investor_id = %investor_id,
            amount,
            percentage = investment.percentage,
            funding_status = %application.funding_status,
            "Investment recorded"
        );

        Ok(InvestmentReceipt {
            investment,
            application,
        })
    }

    pub fn investments_for_application(
        &self,
        application_id: Uuid,
    ) -> StoreResult<Vec<Investment>> {
        self.query_investments("application_id", application_id)
    }

    pub fn investments_for_investor(&self, investor_id: Uuid) -> StoreResult<Vec<Investment>> {
        self.query_investments("investor_id", investor_id)
    }

    fn query_investments(&self, column: &str, id: Uuid) -> StoreResult<Vec<Investment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM investments WHERE {} = ?1 ORDER BY created_at, id",
            INVESTMENT_COLUMNS, column
        ))?;
        let rows = stmt.query_map(params![id.to_string()], investment_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Totals across an investor's holdings
    pub fn portfolio_summary(&self, investor_id: Uuid) -> StoreResult<PortfolioSummary> {
        let conn = self.conn()?;
        let (count, backed, invested, income): (i64, i64, f64, f64) = conn.query_row(
            "SELECT COUNT(*),
                    COUNT(DISTINCT i.application_id),
                    COALESCE(SUM(i.amount), 0),
                    COALESCE(SUM(i.percentage / 100.0 * a.monthly_payment), 0)
             FROM investments i JOIN applications a ON a.id = i.application_id
             WHERE i.investor_id = ?1",
            params![investor_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        Ok(PortfolioSummary {
            investor_id,
            investment_count: count as usize,
            applications_backed: backed as usize,
            total_invested: invested,
            expected_monthly_income: income,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::{FinanceError, FundingStatus};
    use crate::store::applications::tests::{sample_application, seeded_store};
    use crate::store::types::{Application, Role};

    fn approved(store: &Store, borrower: Uuid, admin: Uuid, amount: f64) -> Application {
        let app = store
            .insert_application(sample_application(borrower, amount))
            .unwrap();
        store
            .update_status(app.id, ApplicationStatus::UnderReview, admin, None)
            .unwrap();
        store
            .update_status(app.id, ApplicationStatus::Approved, admin, None)
            .unwrap()
            .0
    }

    fn investor(store: &Store, email: &str) -> Uuid {
        store
            .create_user(email, "Investor", Role::Investor, "h", "s")
            .unwrap()
            .id
    }

    #[test]
    fn test_partial_then_full_funding() {
        let (store, borrower, admin) = seeded_store();
        let app = approved(&store, borrower, admin, 20_000.0);
        let alice = investor(&store, "alice@example.com");
        let bob = investor(&store, "bob@example.com");

        let first = store.record_investment(app.id, alice, 5_000.0).unwrap();
        assert_eq!(first.investment.percentage, 25.0);
        assert_eq!(first.application.funded_amount, 5_000.0);
        assert_eq!(first.application.funding_status, FundingStatus::PartiallyFunded);
        assert_eq!(first.application.status, ApplicationStatus::Approved);

        let second = store.record_investment(app.id, bob, 15_000.0).unwrap();
        assert_eq!(second.investment.percentage, 75.0);
        assert_eq!(second.application.funding_status, FundingStatus::FullyFunded);
        assert_eq!(second.application.status, ApplicationStatus::Funded);

        let history = store.application_history(app.id).unwrap();
        assert_eq!(history.last().unwrap().to_status, ApplicationStatus::Funded);
        assert_eq!(history.last().unwrap().changed_by, None);

        let investments = store.investments_for_application(app.id).unwrap();
        assert_eq!(investments.len(), 2);
        let total_pct: f64 = investments.iter().map(|i| i.percentage).sum();
        assert!((total_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_investment_requires_approved_status() {
        let (store, borrower, _) = seeded_store();
        let app = store
            .insert_application(sample_application(borrower, 20_000.0))
            .unwrap();
        let alice = investor(&store, "alice@example.com");

        let err = store.record_investment(app.id, alice, 1_000.0).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.investments_for_application(app.id).unwrap().is_empty());
    }

    #[test]
    fn test_overfunding_rolls_back() {
        let (store, borrower, admin) = seeded_store();
        let app = approved(&store, borrower, admin, 10_000.0);
        let alice = investor(&store, "alice@example.com");

        store.record_investment(app.id, alice, 9_000.0).unwrap();
        let err = store.record_investment(app.id, alice, 2_000.0).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Funding(FinanceError::ExceedsRemaining { .. })
        ));

        let app = store.get_application(app.id).unwrap();
        assert_eq!(app.funded_amount, 9_000.0);
        assert_eq!(store.investments_for_application(app.id).unwrap().len(), 1);
    }

    #[test]
    fn test_funded_application_closed() {
        let (store, borrower, admin) = seeded_store();
        let app = approved(&store, borrower, admin, 10_000.0);
        let alice = investor(&store, "alice@example.com");

        store.record_investment(app.id, alice, 10_000.0).unwrap();
        let err = store.record_investment(app.id, alice, 1.0).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_portfolio_summary() {
        let (store, borrower, admin) = seeded_store();
        let a = approved(&store, borrower, admin, 10_000.0);
        let b = approved(&store, borrower, admin, 40_000.0);
        let alice = investor(&store, "alice@example.com");

        store.record_investment(a.id, alice, 1_000.0).unwrap();
        store.record_investment(a.id, alice, 1_000.0).unwrap();
        store.record_investment(b.id, alice, 4_000.0).unwrap();

        let summary = store.portfolio_summary(alice).unwrap();
        assert_eq!(summary.investment_count, 3);
        assert_eq!(summary.applications_backed, 2);
        assert_eq!(summary.total_invested, 6_000.0);
        // 20% of a's payment + 10% of b's payment; both share the sample payment
        let expected = 0.2 * a.monthly_payment + 0.1 * b.monthly_payment;
        assert!((summary.expected_monthly_income - expected).abs() < 1e-6);

        assert_eq!(store.investments_for_investor(alice).unwrap().len(), 3);

        let stats = store.pipeline_stats().unwrap();
        assert_eq!(stats.investment_count, 3);
        assert_eq!(stats.investor_count, 1);
        assert_eq!(stats.total_funded, 6_000.0);
    }

    #[test]
    fn test_empty_portfolio() {
        let (store, _, _) = seeded_store();
        let nobody = investor(&store, "new@example.com");
        let summary = store.portfolio_summary(nobody).unwrap();
        assert_eq!(summary.investment_count, 0);
        assert_eq!(summary.total_invested, 0.0);
    }
}
