//! Access policy
//!
//! Row-level rules deciding which records a principal may read or change.
//!
//! | Record              | Borrower        | Investor                   | Admin |
//! |---------------------|-----------------|----------------------------|-------|
//! | Application         | own             | approved / funded          | all   |
//! | Documents           | own application | -                          | all   |
//! | Investments (list)  | own application | own investments only       | all   |
//! | Status changes      | -               | -                          | all   |

use serde::Serialize;
use uuid::Uuid;

use crate::store::{Application, ApplicationFilter, ApplicationStatus, Investment, Role, User};

/// The authenticated user behind a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
        }
    }
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

pub fn can_view_application(principal: &Principal, application: &Application) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Borrower => application.borrower_id == principal.user_id,
        Role::Investor => ApplicationStatus::visible_to_investors().contains(&application.status),
    }
}

/// Documents are private to the borrower and staff
pub fn can_access_documents(principal: &Principal, application: &Application) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Borrower => application.borrower_id == principal.user_id,
        Role::Investor => false,
    }
}

pub fn can_change_status(principal: &Principal) -> bool {
    principal.is_admin()
}

pub fn can_invest(principal: &Principal) -> bool {
    principal.role == Role::Investor
}

/// Restrict a listing filter to what the principal may see
pub fn scope_filter(principal: &Principal, mut filter: ApplicationFilter) -> ApplicationFilter {
    match principal.role {
        Role::Admin => filter,
        Role::Borrower => {
            filter.borrower_id = Some(principal.user_id);
            filter
        }
        Role::Investor => {
            let visible = ApplicationStatus::visible_to_investors();
            if filter.statuses.is_empty() {
                filter.statuses = visible.to_vec();
            } else {
                filter.statuses.retain(|s| visible.contains(s));
                if filter.statuses.is_empty() {
                    // Asked only for hidden statuses; match nothing
                    filter.limit = Some(0);
                }
            }
            filter
        }
    }
}

/// Drop investments the principal may not see
pub fn visible_investments(
    principal: &Principal,
    application: &Application,
    investments: Vec<Investment>,
) -> Vec<Investment> {
    match principal.role {
        Role::Admin => investments,
        Role::Borrower if application.borrower_id == principal.user_id => investments,
        Role::Borrower => Vec::new(),
        Role::Investor => investments
            .into_iter()
            .filter(|i| i.investor_id == principal.user_id)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::{FundingStatus, ProductType};
    use crate::store::{BusinessDetails, ContactDetails, FinancialDetails};

    fn application(borrower_id: Uuid, status: ApplicationStatus) -> Application {
        Application {
            id: Uuid::new_v4(),
            borrower_id,
            status,
            product_type: ProductType::TermLoan,
            loan_amount: 10_000.0,
            term_months: 12,
            apr: 12.5,
            monthly_payment: 890.83,
            loan_purpose: "Inventory".to_string(),
            business: BusinessDetails {
                business_name: "Acme".to_string(),
                business_type: "llc".to_string(),
                industry: "Retail".to_string(),
                ein: "12-3456789".to_string(),
                years_in_business: 3,
                address: "1 Main St".to_string(),
                city: "Austin".to_string(),
                state: "TX".to_string(),
                zip: "73301".to_string(),
            },
            financials: FinancialDetails {
                annual_revenue: 500_000.0,
                monthly_revenue: 40_000.0,
                existing_debt: 0.0,
                credit_score: 700,
            },
            contact: ContactDetails {
                first_name: "Jo".to_string(),
                last_name: "Doe".to_string(),
                email: "jo@acme.example".to_string(),
                phone: "512-555-0100".to_string(),
            },
            funded_amount: 0.0,
            funding_status: FundingStatus::Unfunded,
            admin_notes: None,
            submitted_at: 0,
            updated_at: 0,
        }
    }

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn test_borrower_sees_only_own() {
        let borrower = principal(Role::Borrower);
        let own = application(borrower.user_id, ApplicationStatus::Submitted);
        let other = application(Uuid::new_v4(), ApplicationStatus::Approved);

        assert!(can_view_application(&borrower, &own));
        assert!(!can_view_application(&borrower, &other));
        assert!(can_access_documents(&borrower, &own));
        assert!(!can_access_documents(&borrower, &other));
    }

    #[test]
    fn test_investor_sees_marketplace_only() {
        let investor = principal(Role::Investor);
        let submitted = application(Uuid::new_v4(), ApplicationStatus::Submitted);
        let approved = application(Uuid::new_v4(), ApplicationStatus::Approved);

        assert!(!can_view_application(&investor, &submitted));
        assert!(can_view_application(&investor, &approved));
        assert!(!can_access_documents(&investor, &approved));
        assert!(can_invest(&investor));
        assert!(!can_change_status(&investor));
    }

    #[test]
    fn test_admin_sees_everything() {
        let admin = principal(Role::Admin);
        let app = application(Uuid::new_v4(), ApplicationStatus::Rejected);
        assert!(can_view_application(&admin, &app));
        assert!(can_change_status(&admin));
        assert!(!can_invest(&admin));
    }

    #[test]
    fn test_scope_filter() {
        let borrower = principal(Role::Borrower);
        let scoped = scope_filter(&borrower, ApplicationFilter::default());
        assert_eq!(scoped.borrower_id, Some(borrower.user_id));

        let investor = principal(Role::Investor);
        let scoped = scope_filter(&investor, ApplicationFilter::default());
        assert_eq!(scoped.statuses, ApplicationStatus::visible_to_investors().to_vec());

        let scoped = scope_filter(
            &investor,
            ApplicationFilter::default().status(ApplicationStatus::Submitted),
        );
        assert!(scoped.statuses.is_empty());
        assert_eq!(scoped.limit, Some(0));
    }

    #[test]
    fn test_visible_investments() {
        let investor = principal(Role::Investor);
        let app = application(Uuid::new_v4(), ApplicationStatus::Approved);
        let mine = Investment {
            id: Uuid::new_v4(),
            application_id: app.id,
            investor_id: investor.user_id,
            amount: 100.0,
            percentage: 1.0,
            created_at: 0,
        };
        let theirs = Investment {
            investor_id: Uuid::new_v4(),
            id: Uuid::new_v4(),
            ..mine.clone()
        };

        let visible = visible_investments(&investor, &app, vec![mine.clone(), theirs.clone()]);
        assert_eq!(visible, vec![mine.clone()]);

        let owner = Principal {
            user_id: app.borrower_id,
            role: Role::Borrower,
        };
        assert_eq!(visible_investments(&owner, &app, vec![mine, theirs]).len(), 2);
    }
}
