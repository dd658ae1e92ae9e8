//! Calculator Routes (public)
//!
//! - GET /api/v1/products - Product catalog
//! - POST /api/v1/calculator/quote - Price a loan
//! - POST /api/v1/calculator/schedule - Amortization schedule (`?format=csv`)

use axum::{
    extract::Query,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::dto::{FormatParams, QuoteRequest, ScheduleRequest, ScheduleResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::finance::{calculate_apr, quote, AmortizationSchedule, PaymentQuote, Product};

/// GET /api/v1/products
pub async fn list_products() -> Json<&'static [Product]> {
    Json(Product::catalog())
}

/// POST /api/v1/calculator/quote
pub async fn quote_loan(Json(req): Json<QuoteRequest>) -> ApiResult<Json<PaymentQuote>> {
    Ok(Json(quote(req.product_type, req.amount, req.term_months)?))
}

/// POST /api/v1/calculator/schedule
///
/// With a product the APR comes from the rate tables and the product
/// limits apply; otherwise `apr` must be given.
pub async fn schedule(
    Query(params): Query<FormatParams>,
    Json(req): Json<ScheduleRequest>,
) -> ApiResult<Response> {
    let apr = match (req.product_type, req.apr) {
        (Some(product_type), _) => {
            let product = product_type.product();
            product.check_amount(req.amount)?;
            product.check_term(req.term_months)?;
            calculate_apr(product_type, req.term_months)
        }
        (None, Some(apr)) => apr,
        (None, None) => {
            return Err(ApiError::Validation(
                "Either product_type or apr is required".to_string(),
            ))
        }
    };

    let schedule = AmortizationSchedule::generate(req.amount, apr, req.term_months)?;
    render_schedule(schedule, &params)
}

/// Render a schedule as JSON or CSV
pub fn render_schedule(
    schedule: AmortizationSchedule,
    params: &FormatParams,
) -> ApiResult<Response> {
    match params.format.as_deref().unwrap_or("json") {
        "json" => Ok(Json(ScheduleResponse {
            summary: schedule.summary(),
            schedule,
        })
        .into_response()),
        "csv" => {
            let body = schedule
                .to_csv()
                .map_err(|e| ApiError::Internal(format!("CSV encoding failed: {}", e)))?;
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv"),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"amortization.csv\"",
                    ),
                ],
                body,
            )
                .into_response())
        }
        other => Err(ApiError::Validation(format!(
            "Unsupported format '{}', expected json or csv",
            other
        ))),
    }
}
