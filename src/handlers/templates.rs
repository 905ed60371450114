use super::common::PaginationParams;
use crate::entities::contract_template;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::catalog::{CreateTemplateInput, UpdateTemplateInput};
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

/// List active templates in storefront order
#[utoipa::path(
    get,
    path = "/api/v1/templates",
    responses(
        (status = 200, description = "Active templates", body = crate::ApiResponse<Vec<contract_template::Model>>)
    ),
    tag = "Templates"
)]
pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<contract_template::Model>>>, ServiceError> {
    let templates = state.services.catalog.list_active_templates().await?;
    Ok(Json(ApiResponse::success(templates)))
}

/// Get a single template
#[utoipa::path(
    get,
    path = "/api/v1/templates/:template_id",
    params(
        ("template_id" = Uuid, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Template details", body = crate::ApiResponse<contract_template::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Templates"
)]
pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
) -> Result<Json<ApiResponse<contract_template::Model>>, ServiceError> {
    let template = state.services.catalog.get_template(template_id).await?;
    Ok(Json(ApiResponse::success(template)))
}

/// List every template, including inactive ones (staff dashboard)
#[utoipa::path(
    get,
    path = "/api/v1/templates/all",
    params(PaginationParams),
    responses(
        (status = 200, description = "All templates", body = crate::ApiResponse<crate::PaginatedResponse<contract_template::Model>>)
    ),
    tag = "Templates"
)]
pub async fn list_all_templates(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<crate::PaginatedResponse<contract_template::Model>>>, ServiceError> {
    let (items, total) = state
        .services
        .catalog
        .list_templates(params.page, params.per_page)
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

/// Create a template (staff dashboard)
#[utoipa::path(
    post,
    path = "/api/v1/templates",
    request_body = CreateTemplateInput,
    responses(
        (status = 201, description = "Template created", body = crate::ApiResponse<contract_template::Model>),
        (status = 400, description = "Bad request", body = crate::errors::ErrorResponse)
    ),
    tag = "Templates"
)]
pub async fn create_template(
    State(state): State<AppState>,
    Json(input): Json<CreateTemplateInput>,
) -> Result<(StatusCode, Json<ApiResponse<contract_template::Model>>), ServiceError> {
    let template = state.services.catalog.create_template(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(template))))
}

/// Update a template (staff dashboard)
#[utoipa::path(
    put,
    path = "/api/v1/templates/:template_id",
    params(
        ("template_id" = Uuid, Path, description = "Template ID")
    ),
    request_body = UpdateTemplateInput,
    responses(
        (status = 200, description = "Template updated", body = crate::ApiResponse<contract_template::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Templates"
)]
pub async fn update_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    Json(input): Json<UpdateTemplateInput>,
) -> Result<Json<ApiResponse<contract_template::Model>>, ServiceError> {
    let template = state
        .services
        .catalog
        .update_template(template_id, input)
        .await?;
    Ok(Json(ApiResponse::success(template)))
}

/// Template routes
pub fn template_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates))
        .route("/", post(create_template))
        .route("/all", get(list_all_templates))
        .route("/:template_id", get(get_template))
        .route("/:template_id", put(update_template))
}
