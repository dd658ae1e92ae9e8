//! Investor Routes
//!
//! - GET /api/v1/marketplace - Approved and funded listings
//! - POST /api/v1/applications/:id/investments - Fund part of an approved application
//! - GET /api/v1/applications/:id/investments - Investments the caller may see
//! - GET /api/v1/portfolio - The caller's holdings

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::applications::{filter_from_params, load_visible};
use crate::api::dto::{
    InvestRequest, InvestmentListResponse, InvestmentResponse, ListParams, Listing,
    MarketplaceResponse, PortfolioResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::AuthUser;
use crate::api::state::AppState;
use crate::auth::{policy, Principal};
use crate::finance::FUNDING_EPSILON;
use crate::store::{Application, Role, StatusChange};
use crate::websocket::{WsEvent, APPLICATIONS_TOPIC, MARKETPLACE_TOPIC};

/// GET /api/v1/marketplace
pub async fn marketplace(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<MarketplaceResponse>> {
    caller.require(&[Role::Investor, Role::Admin])?;

    // Admins browse the marketplace with an investor's view
    let investor_view = Principal {
        user_id: caller.user.id,
        role: Role::Investor,
    };
    let filter = policy::scope_filter(
        &investor_view,
        filter_from_params(&params, state.config.max_page_size)?,
    );
    let listings: Vec<Listing> = state
        .store
        .list_applications(&filter)?
        .iter()
        .map(Listing::from)
        .collect();

    Ok(Json(MarketplaceResponse {
        total: listings.len(),
        listings,
    }))
}

/// Reject amounts under the minimum unless they close out the loan
fn check_minimum(application: &Application, amount: f64, min_investment: f64) -> ApiResult<()> {
    let closes_loan = (amount - application.remaining_amount()).abs() <= FUNDING_EPSILON;
    if amount < min_investment && !closes_loan {
        return Err(ApiError::Validation(format!(
            "Minimum investment is {:.2}",
            min_investment
        )));
    }
    Ok(())
}

/// POST /api/v1/applications/:id/investments
pub async fn invest(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<InvestRequest>,
) -> ApiResult<(StatusCode, Json<InvestmentResponse>)> {
    let principal = caller.principal();
    if !policy::can_invest(&principal) {
        return Err(ApiError::Forbidden(
            "Only investor accounts can fund applications".to_string(),
        ));
    }

    let application = load_visible(&state, &principal, id)?;
    check_minimum(&application, req.amount, state.config.min_investment)?;

    let receipt = state
        .store
        .record_investment(application.id, principal.user_id, req.amount)?;

    let funded = WsEvent::investment_recorded(&receipt);
    state.ws_hub.publish(funded.retopic(APPLICATIONS_TOPIC, id));
    state.ws_hub.publish(funded);

    if receipt.application.status != application.status {
        let change = WsEvent::status_changed(&StatusChange {
            application_id: id,
            from_status: Some(application.status),
            to_status: receipt.application.status,
            changed_by: None,
            note: None,
            changed_at: receipt.application.updated_at,
        });
        state.ws_hub.publish(change.retopic(MARKETPLACE_TOPIC, id));
        state.ws_hub.publish(change);
    }

    Ok((
        StatusCode::CREATED,
        Json(InvestmentResponse {
            listing: Listing::from(&receipt.application),
            investment: receipt.investment,
        }),
    ))
}

/// GET /api/v1/applications/:id/investments
pub async fn list_investments(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InvestmentListResponse>> {
    let principal = caller.principal();
    let application = load_visible(&state, &principal, id)?;
    let investments = policy::visible_investments(
        &principal,
        &application,
        state.store.investments_for_application(application.id)?,
    );

    Ok(Json(InvestmentListResponse {
        total_invested: investments.iter().map(|i| i.amount).sum(),
        investments,
    }))
}

/// GET /api/v1/portfolio
pub async fn portfolio(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
) -> ApiResult<Json<PortfolioResponse>> {
    let principal = caller.require(&[Role::Investor])?;

    Ok(Json(PortfolioResponse {
        summary: state.store.portfolio_summary(principal.user_id)?,
        investments: state.store.investments_for_investor(principal.user_id)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::applications::tests::sample_application;
    use crate::store::{ApplicationStatus, Store};

    #[test]
    fn test_minimum_waived_for_final_slice() {
        let store = Store::open_in_memory().unwrap();
        let borrower = store
            .create_user("b@example.com", "B", Role::Borrower, "h", "s")
            .unwrap();
        let mut app = store
            .insert_application(sample_application(borrower.id, 50_000.0))
            .unwrap();
        app.status = ApplicationStatus::Approved;
        app.funded_amount = 49_950.0;

        assert!(check_minimum(&app, 50.0, 100.0).is_ok());
        assert!(check_minimum(&app, 40.0, 100.0).is_err());
        assert!(check_minimum(&app, 100.0, 100.0).is_ok());
    }
}
