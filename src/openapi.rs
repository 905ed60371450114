use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lexcart API",
        version = "1.0.0",
        description = r#"
# Lexcart Storefront API

Backend for a legal-services storefront: a contract template catalog, a
payment-provider checkout flow with idempotent purchase recording, and a
consultation-request intake.

## Checkout flow

1. `POST /api/v1/checkout/template` (or `/checkout/consultation`) returns a
   provider-hosted redirect URL.
2. The buyer completes payment at the provider and returns with a session id.
3. `GET /api/v1/checkout/session/{session_id}` verifies payment, records the
   purchase exactly once, and returns the download URL (or the consultation
   confirmation). The endpoint is safe to call repeatedly.

## Error Handling

Failures use a consistent error body with appropriate HTTP status codes:

```json
{
  "error": "Payment Required",
  "message": "Payment not completed for session cs_123",
  "request_id": "req-abc123xyz",
  "timestamp": "2025-01-01T00:00:00Z"
}
```

A `402` from the session endpoint means the provider has not settled yet;
poll again before declaring failure.
        "#,
        contact(
            name = "Lexcart Support",
            email = "support@lexcart.dev"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Templates", description = "Contract template catalog"),
        (name = "Checkout", description = "Checkout sessions and entitlement resolution"),
        (name = "Purchases", description = "Staff purchase reporting"),
        (name = "Consultations", description = "Consultation intake and staff workflow")
    ),
    paths(
        // Templates
        crate::handlers::templates::list_templates,
        crate::handlers::templates::get_template,
        crate::handlers::templates::list_all_templates,
        crate::handlers::templates::create_template,
        crate::handlers::templates::update_template,

        // Checkout
        crate::handlers::checkout::create_template_checkout,
        crate::handlers::checkout::create_consultation_checkout,
        crate::handlers::checkout::resolve_session,
        crate::handlers::webhooks::payment_webhook,

        // Purchases
        crate::handlers::purchases::list_purchases,

        // Consultations
        crate::handlers::consultations::submit_consultation,
        crate::handlers::consultations::list_consultations,
        crate::handlers::consultations::get_consultation,
        crate::handlers::consultations::update_consultation_status,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,

            // Checkout types
            crate::handlers::checkout::TemplateCheckoutRequest,
            crate::handlers::checkout::ConsultationCheckoutRequest,
            crate::services::checkout::CheckoutRedirect,
            crate::services::entitlements::ResolveOutcome,

            // Template types
            crate::services::catalog::CreateTemplateInput,
            crate::services::catalog::UpdateTemplateInput,

            // Purchase types
            crate::handlers::purchases::PurchaseRow,
            crate::handlers::purchases::PurchaseStatusFilter,

            // Consultation types
            crate::services::consultations::SubmitConsultationInput,
            crate::handlers::consultations::UpdateConsultationStatusRequest,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Lexcart API"));
        assert!(json.contains("/api/v1/checkout/session/"));
        assert!(json.contains("/api/v1/templates"));
    }
}
