//! Stripe client tests against a local mock of the provider's HTTP API.

use assert_matches::assert_matches;
use lexcart_api::{
    errors::ServiceError,
    payments::{CreateSessionRequest, PaymentGateway, StripeGateway, BUYER_NAME_FIELD},
};
use std::collections::BTreeMap;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> StripeGateway {
    StripeGateway::new(
        "sk_test_123",
        server.uri(),
        Duration::from_secs(2),
        Duration::from_secs(5),
    )
    .expect("client builds")
}

fn sample_request() -> CreateSessionRequest {
    let mut metadata = BTreeMap::new();
    metadata.insert("kind".to_string(), "contract".to_string());
    metadata.insert("template_id".to_string(), "tpl-1".to_string());
    CreateSessionRequest {
        price_id: "price_abc".to_string(),
        success_url: "https://lexcart.dev/purchase/success?session_id={CHECKOUT_SESSION_ID}"
            .to_string(),
        cancel_url: "https://lexcart.dev/templates".to_string(),
        metadata,
        collect_phone: true,
        collect_buyer_name: true,
    }
}

#[tokio::test]
async fn create_session_posts_form_and_returns_redirect() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(body_string_contains("price_abc"))
        .and(body_string_contains("mode=payment"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"id": "cs_test_1", "object": "checkout.session", "url": "https://checkout.stripe.com/c/pay/cs_test_1"}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let created = gateway(&server)
        .create_checkout_session(sample_request())
        .await
        .unwrap();

    assert_eq!(created.id, "cs_test_1");
    assert_eq!(created.url, "https://checkout.stripe.com/c/pay/cs_test_1");
}

#[tokio::test]
async fn retrieve_session_parses_payment_state_and_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{
                "id": "cs_test_1",
                "object": "checkout.session",
                "payment_status": "paid",
                "status": "complete",
                "amount_total": 15000,
                "currency": "usd",
                "customer_details": {"name": "Ada Lovelace", "email": "ada@example.test", "phone": null},
                "custom_fields": [
                    {"key": "buyer_full_name", "type": "text", "text": {"value": "Ada L."}}
                ],
                "metadata": {"kind": "contract", "template_id": "tpl-1"}
            }"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let session = gateway(&server)
        .retrieve_checkout_session("cs_test_1")
        .await
        .unwrap();

    assert!(session.payment_status.is_paid());
    assert_eq!(session.amount_total, 15000);
    assert_eq!(session.currency, "usd");
    assert_eq!(session.customer_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(session.custom_field(BUYER_NAME_FIELD), Some("Ada L."));
    assert_eq!(session.metadata_value("template_id"), Some("tpl-1"));
}

#[tokio::test]
async fn unknown_session_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_raw(
            r#"{"error": {"type": "invalid_request_error", "message": "No such checkout session"}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .retrieve_checkout_session("cs_missing")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn provider_errors_surface_as_external_service_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(500).set_body_raw(
            r#"{"error": {"type": "api_error", "message": "Something went wrong"}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .create_checkout_session(sample_request())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ExternalServiceError(msg) if msg.contains("Something went wrong"));
}
