use super::common::PaginationParams;
use crate::entities::consultation_request::{self, ConsultationStatus};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::consultations::SubmitConsultationInput;
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Submit a consultation request (public intake form)
#[utoipa::path(
    post,
    path = "/api/v1/consultations",
    request_body = SubmitConsultationInput,
    responses(
        (status = 201, description = "Request received", body = crate::ApiResponse<consultation_request::Model>),
        (status = 400, description = "Bad request", body = crate::errors::ErrorResponse)
    ),
    tag = "Consultations"
)]
pub async fn submit_consultation(
    State(state): State<AppState>,
    Json(input): Json<SubmitConsultationInput>,
) -> Result<(StatusCode, Json<ApiResponse<consultation_request::Model>>), ServiceError> {
    let request = state.services.consultations.submit(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(request))))
}

#[derive(Debug, Serialize, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ConsultationStatusFilter {
    /// Filter by workflow status (new, in_review, scheduled, closed)
    #[schema(example = "new")]
    pub status: Option<String>,
}

/// List consultation requests (staff dashboard)
#[utoipa::path(
    get,
    path = "/api/v1/consultations",
    params(PaginationParams, ConsultationStatusFilter),
    responses(
        (status = 200, description = "Consultation requests", body = crate::ApiResponse<crate::PaginatedResponse<consultation_request::Model>>)
    ),
    tag = "Consultations"
)]
pub async fn list_consultations(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<ConsultationStatusFilter>,
) -> Result<
    Json<ApiResponse<crate::PaginatedResponse<consultation_request::Model>>>,
    ServiceError,
> {
    let status_filter = match filter.status {
        Some(value) => Some(parse_status_filter(&value)?),
        None => None,
    };

    let (items, total) = state
        .services
        .consultations
        .list(params.page, params.per_page, status_filter)
        .await?;

    let response = crate::PaginatedResponse {
        items,
        total,
        page: params.page,
        limit: params.per_page,
        total_pages: total.div_ceil(params.per_page.max(1)),
    };

    Ok(Json(ApiResponse::success(response)))
}

/// Get a consultation request (staff dashboard)
#[utoipa::path(
    get,
    path = "/api/v1/consultations/:request_id",
    params(
        ("request_id" = Uuid, Path, description = "Consultation request ID")
    ),
    responses(
        (status = 200, description = "Consultation request", body = crate::ApiResponse<consultation_request::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Consultations"
)]
pub async fn get_consultation(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<ApiResponse<consultation_request::Model>>, ServiceError> {
    let request = state.services.consultations.get(request_id).await?;
    Ok(Json(ApiResponse::success(request)))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"status": "scheduled"}))]
pub struct UpdateConsultationStatusRequest {
    /// New workflow status (new, in_review, scheduled, closed)
    pub status: String,
}

/// Update a consultation request's workflow status (staff dashboard)
#[utoipa::path(
    put,
    path = "/api/v1/consultations/:request_id/status",
    params(
        ("request_id" = Uuid, Path, description = "Consultation request ID")
    ),
    request_body = UpdateConsultationStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = crate::ApiResponse<consultation_request::Model>),
        (status = 400, description = "Bad request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Consultations"
)]
pub async fn update_consultation_status(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(request): Json<UpdateConsultationStatusRequest>,
) -> Result<Json<ApiResponse<consultation_request::Model>>, ServiceError> {
    let status = parse_status_filter(&request.status)?;
    let updated = state
        .services
        .consultations
        .update_status(request_id, status)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// Consultation routes
pub fn consultation_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_consultation))
        .route("/", get(list_consultations))
        .route("/:request_id", get(get_consultation))
        .route("/:request_id/status", put(update_consultation_status))
}

fn parse_status_filter(value: &str) -> Result<ConsultationStatus, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError(
            "status cannot be empty".to_string(),
        ));
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "new" => Ok(ConsultationStatus::New),
        "in_review" => Ok(ConsultationStatus::InReview),
        "scheduled" => Ok(ConsultationStatus::Scheduled),
        "closed" => Ok(ConsultationStatus::Closed),
        other => Err(ServiceError::ValidationError(format!(
            "invalid consultation status: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consultation_status_parsing() {
        assert_eq!(
            parse_status_filter("in_review").unwrap(),
            ConsultationStatus::InReview
        );
        assert_eq!(
            parse_status_filter(" CLOSED ").unwrap(),
            ConsultationStatus::Closed
        );
        assert!(parse_status_filter("resolved").is_err());
    }
}
