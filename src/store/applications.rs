//! Application records, status workflow and pipeline stats

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::store::db::Store;
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{
    now_millis, Application, ApplicationFilter, ApplicationStatus, BusinessDetails,
    ContactDetails, FinancialDetails, NewApplication, PipelineStats, StatusChange,
};

pub(crate) const APPLICATION_COLUMNS: &str = "id, borrower_id, status, product_type, loan_amount, \
    term_months, apr, monthly_payment, loan_purpose, business_name, business_type, industry, ein, \
    years_in_business, address, city, state, zip, annual_revenue, monthly_revenue, existing_debt, \
    credit_score, first_name, last_name, contact_email, phone, funded_amount, funding_status, \
    admin_notes, submitted_at, updated_at";

/// Read a TEXT column through `FromStr`
pub(crate) fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            e.to_string().into(),
        )
    })
}

pub(crate) fn application_from_row(row: &Row<'_>) -> rusqlite::Result<Application> {
    Ok(Application {
        id: parsed(row, 0)?,
        borrower_id: parsed(row, 1)?,
        status: parsed(row, 2)?,
        product_type: parsed(row, 3)?,
        loan_amount: row.get(4)?,
        term_months: row.get(5)?,
        apr: row.get(6)?,
        monthly_payment: row.get(7)?,
        loan_purpose: row.get(8)?,
        business: BusinessDetails {
            business_name: row.get(9)?,
            business_type: row.get(10)?,
            industry: row.get(11)?,
            ein: row.get(12)?,
            years_in_business: row.get(13)?,
            address: row.get(14)?,
            city: row.get(15)?,
            state: row.get(16)?,
            zip: row.get(17)?,
        },
        financials: FinancialDetails {
            annual_revenue: row.get(18)?,
            monthly_revenue: row.get(19)?,
            existing_debt: row.get(20)?,
            credit_score: row.get(21)?,
        },
        contact: ContactDetails {
            first_name: row.get(22)?,
            last_name: row.get(23)?,
            email: row.get(24)?,
            phone: row.get(25)?,
        },
        funded_amount: row.get(26)?,
        funding_status: parsed(row, 27)?,
        admin_notes: row.get(28)?,
        submitted_at: row.get(29)?,
        updated_at: row.get(30)?,
    })
}

pub(crate) fn load_application(conn: &Connection, id: Uuid) -> StoreResult<Application> {
    conn.query_row(
        &format!("SELECT {} FROM applications WHERE id = ?1", APPLICATION_COLUMNS),
        params![id.to_string()],
        application_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("Application {}", id)))
}

pub(crate) fn insert_history(conn: &Connection, change: &StatusChange) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO status_history
             (application_id, from_status, to_status, changed_by, note, changed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            change.application_id.to_string(),
            change.from_status.map(|s| s.as_str()),
            change.to_status.as_str(),
            change.changed_by.map(|id| id.to_string()),
            change.note,
            change.changed_at
        ],
    )?;
    Ok(())
}

impl Store {
    /// Persist a new application in `submitted` status
    pub fn insert_application(&self, new: NewApplication) -> StoreResult<Application> {
        let now = now_millis();
        let id = Uuid::new_v4();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO applications ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
                 ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, \
                 ?27, ?28, ?29, ?30, ?31)",
                APPLICATION_COLUMNS
            ),
            params![
                id.to_string(),
                new.borrower_id.to_string(),
                ApplicationStatus::Submitted.as_str(),
                new.product_type.as_str(),
                new.loan_amount,
                new.term_months,
                new.apr,
                new.monthly_payment,
                new.loan_purpose,
                new.business.business_name,
                new.business.business_type,
                new.business.industry,
                new.business.ein,
                new.business.years_in_business,
                new.business.address,
                new.business.city,
                new.business.state,
                new.business.zip,
                new.financials.annual_revenue,
                new.financials.monthly_revenue,
                new.financials.existing_debt,
                new.financials.credit_score,
                new.contact.first_name,
                new.contact.last_name,
                new.contact.email,
                new.contact.phone,
                0.0_f64,
                "unfunded",
                Option::<String>::None,
                now,
                now
            ],
        )?;

        insert_history(
            &tx,
            &StatusChange {
                application_id: id,
                from_status: None,
                to_status: ApplicationStatus::Submitted,
                changed_by: Some(new.borrower_id),
                note: None,
                changed_at: now,
            },
        )?;

        let application = load_application(&tx, id)?;
        tx.commit()?;

        tracing::info!(
            application_id = %id,
            borrower_id = %application.borrower_id,
            product = %application.product_type,
            amount = application.loan_amount,
            "Application submitted"
        );
        Ok(application)
    }

    pub fn get_application(&self, id: Uuid) -> StoreResult<Application> {
        let conn = self.conn()?;
        load_application(&conn, id)
    }

    /// List applications, newest first
    pub fn list_applications(&self, filter: &ApplicationFilter) -> StoreResult<Vec<Application>> {
        let mut sql = format!("SELECT {} FROM applications WHERE 1 = 1", APPLICATION_COLUMNS);
        let mut values: Vec<Value> = Vec::new();

        if let Some(borrower_id) = filter.borrower_id {
            values.push(Value::Text(borrower_id.to_string()));
            sql.push_str(&format!(" AND borrower_id = ?{}", values.len()));
        }

        if !filter.statuses.is_empty() {
            let mut placeholders = Vec::with_capacity(filter.statuses.len());
            for status in &filter.statuses {
                values.push(Value::Text(status.as_str().to_string()));
                placeholders.push(format!("?{}", values.len()));
            }
            sql.push_str(&format!(" AND status IN ({})", placeholders.join(", ")));
        }

        sql.push_str(" ORDER BY submitted_at DESC, id");

        // SQLite needs a LIMIT before an OFFSET; -1 means unbounded
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        values.push(Value::Integer(limit));
        sql.push_str(&format!(" LIMIT ?{}", values.len()));
        values.push(Value::Integer(filter.offset as i64));
        sql.push_str(&format!(" OFFSET ?{}", values.len()));

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), application_from_row)?;
        let applications = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(applications)
    }

    /// Move an application to a new status as an administrator.
    ///
    /// Only the moves in [`ApplicationStatus::can_transition_to`] are
    /// accepted. A non-empty `note` replaces the admin notes.
    pub fn update_status(
        &self,
        id: Uuid,
        next: ApplicationStatus,
        changed_by: Uuid,
        note: Option<String>,
    ) -> StoreResult<(Application, StatusChange)> {
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let current = load_application(&tx, id)?;

        if !current.status.can_transition_to(next) {
            return Err(StoreError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        let now = now_millis();
        tx.execute(
            "UPDATE applications
             SET status = ?1, admin_notes = COALESCE(?2, admin_notes), updated_at = ?3
             WHERE id = ?4",
            params![next.as_str(), note, now, id.to_string()],
        )?;

        let change = StatusChange {
            application_id: id,
            from_status: Some(current.status),
            to_status: next,
            changed_by: Some(changed_by),
            note,
            changed_at: now,
        };
        insert_history(&tx, &change)?;

        let updated = load_application(&tx, id)?;
        tx.commit()?;

        tracing::info!(
            application_id = %id,
            from = %current.status,
            to = %next,
            admin_id = %changed_by,
            "Application status changed"
        );
        Ok((updated, change))
    }

    /// Status history, oldest first
    pub fn application_history(&self, id: Uuid) -> StoreResult<Vec<StatusChange>> {
        let conn = self.conn()?;
        // Surface NotFound rather than an empty history
        load_application(&conn, id)?;

        let mut stmt = conn.prepare(
            "SELECT from_status, to_status, changed_by, note, changed_at
             FROM status_history WHERE application_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![id.to_string()], |row| {
            let from_status: Option<String> = row.get(0)?;
            let changed_by: Option<String> = row.get(2)?;
            Ok(StatusChange {
                application_id: id,
                from_status: match from_status {
                    Some(_) => Some(parsed(row, 0)?),
                    None => None,
                },
                to_status: parsed(row, 1)?,
                changed_by: match changed_by {
                    Some(_) => Some(parsed(row, 2)?),
                    None => None,
                },
                note: row.get(3)?,
                changed_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Aggregate pipeline numbers for the admin dashboard
    pub fn pipeline_stats(&self) -> StoreResult<PipelineStats> {
        let conn = self.conn()?;
        let mut stats = PipelineStats::default();

        for status in ApplicationStatus::all() {
            stats.by_status.insert(status.as_str().to_string(), 0);
        }

        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*), COALESCE(SUM(loan_amount), 0), COALESCE(SUM(funded_amount), 0)
             FROM applications GROUP BY status",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        for row in rows {
            let (status, count, requested, funded) = row?;
            stats.total_applications += count as u64;
            stats.total_requested += requested;
            stats.total_funded += funded;
            stats.by_status.insert(status, count as u64);
        }

        let (investment_count, investor_count): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT investor_id) FROM investments",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        stats.investment_count = investment_count as u64;
        stats.investor_count = investor_count as u64;

        Ok(stats)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::finance::{FundingStatus, ProductType};
    use crate::store::types::Role;

    pub(crate) fn sample_application(borrower_id: Uuid, amount: f64) -> NewApplication {
        NewApplication {
            borrower_id,
            product_type: ProductType::TermLoan,
            loan_amount: amount,
            term_months: 24,
            apr: 13.0,
            monthly_payment: 2_376.89,
            loan_purpose: "Expand kitchen".to_string(),
            business: BusinessDetails {
                business_name: "Blue Door Bistro".to_string(),
                business_type: "llc".to_string(),
                industry: "Restaurants".to_string(),
                ein: "12-3456789".to_string(),
                years_in_business: 6,
                address: "12 Harbor St".to_string(),
                city: "Portland".to_string(),
                state: "ME".to_string(),
                zip: "04101".to_string(),
            },
            financials: FinancialDetails {
                annual_revenue: 850_000.0,
                monthly_revenue: 70_000.0,
                existing_debt: 20_000.0,
                credit_score: 712,
            },
            contact: ContactDetails {
                first_name: "Mara".to_string(),
                last_name: "Quinn".to_string(),
                email: "mara@bluedoor.example".to_string(),
                phone: "207-555-0142".to_string(),
            },
        }
    }

    pub(crate) fn seeded_store() -> (Store, Uuid, Uuid) {
        let store = Store::open_in_memory().unwrap();
        let borrower = store
            .create_user("b@example.com", "Borrower", Role::Borrower, "h", "s")
            .unwrap();
        let admin = store
            .create_user("admin@example.com", "Admin", Role::Admin, "h", "s")
            .unwrap();
        (store, borrower.id, admin.id)
    }

    #[test]
    fn test_insert_and_get() {
        let (store, borrower, _) = seeded_store();
        let app = store
            .insert_application(sample_application(borrower, 50_000.0))
            .unwrap();

        assert_eq!(app.status, ApplicationStatus::Submitted);
        assert_eq!(app.funding_status, FundingStatus::Unfunded);
        assert_eq!(app.funded_amount, 0.0);
        assert_eq!(app.business.ein, "12-3456789");

        let fetched = store.get_application(app.id).unwrap();
        assert_eq!(fetched, app);
    }

    #[test]
    fn test_get_missing_application() {
        let (store, _, _) = seeded_store();
        assert!(matches!(
            store.get_application(Uuid::new_v4()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_filters() {
        let (store, borrower, admin) = seeded_store();
        let other = store
            .create_user("o@example.com", "Other", Role::Borrower, "h", "s")
            .unwrap();

        let a = store
            .insert_application(sample_application(borrower, 10_000.0))
            .unwrap();
        store
            .insert_application(sample_application(borrower, 20_000.0))
            .unwrap();
        store
            .insert_application(sample_application(other.id, 30_000.0))
            .unwrap();

        store
            .update_status(a.id, ApplicationStatus::UnderReview, admin, None)
            .unwrap();

        let all = store.list_applications(&ApplicationFilter::default()).unwrap();
        assert_eq!(all.len(), 3);

        let mine = store
            .list_applications(&ApplicationFilter::for_borrower(borrower))
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|app| app.borrower_id == borrower));

        let reviewing = store
            .list_applications(&ApplicationFilter::default().status(ApplicationStatus::UnderReview))
            .unwrap();
        assert_eq!(reviewing.len(), 1);
        assert_eq!(reviewing[0].id, a.id);

        let page = store
            .list_applications(&ApplicationFilter::default().limit(2).offset(2))
            .unwrap();
        assert_eq!(page.len(), 1);

        let skipped = store
            .list_applications(&ApplicationFilter::default().offset(1))
            .unwrap();
        assert_eq!(skipped.len(), 2);
    }

    #[test]
    fn test_status_workflow_and_history() {
        let (store, borrower, admin) = seeded_store();
        let app = store
            .insert_application(sample_application(borrower, 40_000.0))
            .unwrap();

        let (app, _) = store
            .update_status(app.id, ApplicationStatus::UnderReview, admin, None)
            .unwrap();
        let (app, change) = store
            .update_status(
                app.id,
                ApplicationStatus::Approved,
                admin,
                Some("Strong cash flow".to_string()),
            )
            .unwrap();

        assert_eq!(app.status, ApplicationStatus::Approved);
        assert_eq!(app.admin_notes.as_deref(), Some("Strong cash flow"));
        assert_eq!(change.from_status, Some(ApplicationStatus::UnderReview));

        let history = store.application_history(app.id).unwrap();
        let steps: Vec<ApplicationStatus> = history.iter().map(|c| c.to_status).collect();
        assert_eq!(
            steps,
            vec![
                ApplicationStatus::Submitted,
                ApplicationStatus::UnderReview,
                ApplicationStatus::Approved
            ]
        );
        assert_eq!(history[0].from_status, None);
        assert_eq!(history[0].changed_by, Some(borrower));
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let (store, borrower, admin) = seeded_store();
        let app = store
            .insert_application(sample_application(borrower, 40_000.0))
            .unwrap();

        let err = store
            .update_status(app.id, ApplicationStatus::Approved, admin, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        let err = store
            .update_status(app.id, ApplicationStatus::Funded, admin, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        assert_eq!(
            store.get_application(app.id).unwrap().status,
            ApplicationStatus::Submitted
        );
        assert_eq!(store.application_history(app.id).unwrap().len(), 1);
    }

    #[test]
    fn test_pipeline_stats() {
        let (store, borrower, admin) = seeded_store();
        let a = store
            .insert_application(sample_application(borrower, 10_000.0))
            .unwrap();
        store
            .insert_application(sample_application(borrower, 15_000.0))
            .unwrap();
        store
            .update_status(a.id, ApplicationStatus::Rejected, admin, None)
            .unwrap();

        let stats = store.pipeline_stats().unwrap();
        assert_eq!(stats.total_applications, 2);
        assert_eq!(stats.total_requested, 25_000.0);
        assert_eq!(stats.by_status["submitted"], 1);
        assert_eq!(stats.by_status["rejected"], 1);
        assert_eq!(stats.by_status["funded"], 0);
        assert_eq!(stats.investment_count, 0);
    }
}
