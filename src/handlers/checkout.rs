use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::checkout::CheckoutRedirect;
use crate::services::entitlements::ResolveOutcome;
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"template_id": "550e8400-e29b-41d4-a716-446655440000"}))]
pub struct TemplateCheckoutRequest {
    /// Template to purchase
    pub template_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"price_id": "price_consult_30"}))]
pub struct ConsultationCheckoutRequest {
    /// Allow-listed consultation price reference
    pub price_id: String,
}

/// Start checkout for a contract template
#[utoipa::path(
    post,
    path = "/api/v1/checkout/template",
    request_body = TemplateCheckoutRequest,
    responses(
        (status = 201, description = "Checkout session created", body = crate::ApiResponse<CheckoutRedirect>),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Template not purchasable", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn create_template_checkout(
    State(state): State<AppState>,
    Json(request): Json<TemplateCheckoutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutRedirect>>), ServiceError> {
    let redirect = state
        .services
        .checkout
        .create_template_checkout(request.template_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(redirect))))
}

/// Start checkout for a fixed-price consultation package
#[utoipa::path(
    post,
    path = "/api/v1/checkout/consultation",
    request_body = ConsultationCheckoutRequest,
    responses(
        (status = 201, description = "Checkout session created", body = crate::ApiResponse<CheckoutRedirect>),
        (status = 400, description = "Price not allow-listed", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn create_consultation_checkout(
    State(state): State<AppState>,
    Json(request): Json<ConsultationCheckoutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutRedirect>>), ServiceError> {
    let redirect = state
        .services
        .checkout
        .create_consultation_checkout(&request.price_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(redirect))))
}

/// Verify a returning checkout session and resolve the entitlement.
///
/// Safe to call any number of times for the same session: the buyer
/// refreshing the success page, polling after a 402, or racing a webhook
/// delivery all land on the same recorded purchase.
#[utoipa::path(
    get,
    path = "/api/v1/checkout/session/:session_id",
    params(
        ("session_id" = String, Path, description = "Provider checkout session ID")
    ),
    responses(
        (status = 200, description = "Entitlement resolved", body = crate::ApiResponse<ResolveOutcome>),
        (status = 402, description = "Payment not completed yet", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn resolve_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<ResolveOutcome>>, ServiceError> {
    let outcome = state.services.entitlements.resolve(&session_id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Checkout routes
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/template", post(create_template_checkout))
        .route("/consultation", post(create_consultation_checkout))
        .route("/session/:session_id", get(resolve_session))
}
