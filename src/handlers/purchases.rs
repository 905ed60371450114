use super::common::PaginationParams;
use crate::entities::purchase::{PurchaseKind, PurchaseStatus};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::storage::PurchaseWithTemplate;
use crate::ApiResponse;
use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Purchase row shown in the staff dashboard
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseRow {
    pub id: Uuid,
    pub template_id: Option<Uuid>,
    /// Resolved template name; None when the purchase was a consultation or
    /// the template has since been removed
    pub template_name: Option<String>,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub kind: PurchaseKind,
    pub status: PurchaseStatus,
    pub stripe_session_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<PurchaseWithTemplate> for PurchaseRow {
    fn from(row: PurchaseWithTemplate) -> Self {
        let purchase = row.purchase;
        Self {
            id: purchase.id,
            template_id: purchase.template_id,
            template_name: row.template_name,
            buyer_name: purchase.buyer_name,
            buyer_email: purchase.buyer_email,
            buyer_phone: purchase.buyer_phone,
            amount: purchase.amount,
            currency: purchase.currency,
            kind: purchase.kind,
            status: purchase.status,
            stripe_session_id: purchase.stripe_session_id,
            created_at: purchase.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct PurchaseStatusFilter {
    /// Filter by purchase status (pending, completed, refunded)
    #[schema(example = "completed")]
    pub status: Option<String>,
}

/// List purchases for the staff dashboard
#[utoipa::path(
    get,
    path = "/api/v1/purchases",
    params(PaginationParams, PurchaseStatusFilter),
    responses(
        (status = 200, description = "Purchases", body = crate::ApiResponse<crate::PaginatedResponse<PurchaseRow>>),
        (status = 400, description = "Bad request", body = crate::errors::ErrorResponse)
    ),
    tag = "Purchases"
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<PurchaseStatusFilter>,
) -> Result<
    axum::Json<ApiResponse<crate::PaginatedResponse<PurchaseRow>>>,
    ServiceError,
> {
    let status_filter = match filter.status {
        Some(value) => Some(parse_status_filter(&value)?),
        None => None,
    };

    let (rows, total) = state
        .services
        .entitlements
        .list_purchases(params.page, params.per_page, status_filter)
        .await?;

    let response = crate::PaginatedResponse {
        items: rows.into_iter().map(PurchaseRow::from).collect(),
        total,
        page: params.page,
        limit: params.per_page,
        total_pages: total.div_ceil(params.per_page.max(1)),
    };

    Ok(axum::Json(ApiResponse::success(response)))
}

/// Purchase routes
pub fn purchase_routes() -> Router<AppState> {
    Router::new().route("/", get(list_purchases))
}

fn parse_status_filter(value: &str) -> Result<PurchaseStatus, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError(
            "status filter cannot be empty".to_string(),
        ));
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "pending" => Ok(PurchaseStatus::Pending),
        "completed" => Ok(PurchaseStatus::Completed),
        "refunded" => Ok(PurchaseStatus::Refunded),
        other => Err(ServiceError::ValidationError(format!(
            "invalid purchase status filter: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("pending", PurchaseStatus::Pending ; "pending")]
    #[test_case("completed", PurchaseStatus::Completed ; "completed")]
    #[test_case(" Refunded ", PurchaseStatus::Refunded ; "refunded with padding")]
    fn status_filter_parses_known_values(input: &str, expected: PurchaseStatus) {
        assert_eq!(parse_status_filter(input).unwrap(), expected);
    }

    #[test_case("shipped" ; "unknown status")]
    #[test_case("" ; "empty string")]
    fn status_filter_rejects_bad_values(input: &str) {
        assert!(parse_status_filter(input).is_err());
    }
}
