//! Stripe-backed [`PaymentGateway`] over the form-encoded HTTP API.

use super::{
    CreateSessionRequest, CreatedSession, PaymentGateway, ProviderSession, SessionPaymentStatus,
};
use crate::{config::AppConfig, errors::ServiceError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{instrument, warn};

const CHECKOUT_SESSIONS_PATH: &str = "/v1/checkout/sessions";

/// Stripe checkout client. Constructed once per process and injected where
/// needed; holds no mutable state beyond the connection pool.
#[derive(Clone)]
pub struct StripeGateway {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            cfg.stripe_secret_key.clone(),
            cfg.stripe_api_base.clone(),
            Duration::from_secs(cfg.provider_connect_timeout_secs),
            Duration::from_secs(cfg.provider_request_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(price_id = %request.price_id))]
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CreatedSession, ServiceError> {
        let params = create_session_params(&request);

        let response = self
            .http
            .post(self.url(CHECKOUT_SESSIONS_PATH))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!("checkout session create: {}", e))
            })?;

        let session: CheckoutSessionResponse = decode_response(response).await?;
        let url = session.url.clone().ok_or_else(|| {
            ServiceError::ExternalServiceError(
                "provider returned a session without a redirect URL".to_string(),
            )
        })?;

        Ok(CreatedSession {
            id: session.id,
            url,
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<ProviderSession, ServiceError> {
        let response = self
            .http
            .get(self.url(&format!("{}/{}", CHECKOUT_SESSIONS_PATH, session_id)))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!("checkout session retrieve: {}", e))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!(
                "Checkout session {} not found",
                session_id
            )));
        }

        let session: CheckoutSessionResponse = decode_response(response).await?;
        Ok(session.into())
    }
}

/// Flatten a create request into Stripe's bracketed form parameters.
fn create_session_params(request: &CreateSessionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        (
            "line_items[0][price]".to_string(),
            request.price_id.clone(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (key, value) in &request.metadata {
        params.push((format!("metadata[{}]", key), value.clone()));
    }

    if request.collect_phone {
        params.push((
            "phone_number_collection[enabled]".to_string(),
            "true".to_string(),
        ));
    }

    if request.collect_buyer_name {
        params.push((
            "custom_fields[0][key]".to_string(),
            super::BUYER_NAME_FIELD.to_string(),
        ));
        params.push((
            "custom_fields[0][label][type]".to_string(),
            "custom".to_string(),
        ));
        params.push((
            "custom_fields[0][label][custom]".to_string(),
            "Full name".to_string(),
        ));
        params.push(("custom_fields[0][type]".to_string(), "text".to_string()));
        params.push(("custom_fields[0][optional]".to_string(), "true".to_string()));
    }

    params
}

async fn decode_response(response: reqwest::Response) -> Result<CheckoutSessionResponse, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<StripeErrorResponse>()
            .await
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        warn!(status = %status, "Provider call failed: {}", detail);
        return Err(ServiceError::ExternalServiceError(detail));
    }

    response.json::<CheckoutSessionResponse>().await.map_err(|e| {
        ServiceError::ExternalServiceError(format!("malformed provider response: {}", e))
    })
}

// Wire types, private to this client

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    customer_details: Option<CustomerDetails>,
    #[serde(default)]
    custom_fields: Vec<CustomField>,
    #[serde(default)]
    metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomField {
    key: String,
    #[serde(default)]
    text: Option<CustomFieldText>,
}

#[derive(Debug, Deserialize)]
struct CustomFieldText {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl From<CheckoutSessionResponse> for ProviderSession {
    fn from(raw: CheckoutSessionResponse) -> Self {
        let customer = raw.customer_details.unwrap_or(CustomerDetails {
            name: None,
            email: None,
            phone: None,
        });

        let custom_fields = raw
            .custom_fields
            .into_iter()
            .filter_map(|f| f.text.and_then(|t| t.value).map(|v| (f.key, v)))
            .collect();

        ProviderSession {
            id: raw.id,
            payment_status: raw
                .payment_status
                .as_deref()
                .map(SessionPaymentStatus::from)
                .unwrap_or(SessionPaymentStatus::Unknown),
            amount_total: raw.amount_total.unwrap_or(0),
            currency: raw.currency.unwrap_or_else(|| "usd".to_string()),
            customer_name: customer.name,
            customer_email: customer.email,
            customer_phone: customer.phone,
            custom_fields,
            metadata: raw.metadata.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::{BUYER_NAME_FIELD, METADATA_KIND, METADATA_TEMPLATE_ID};

    fn sample_request() -> CreateSessionRequest {
        let mut metadata = BTreeMap::new();
        metadata.insert(METADATA_KIND.to_string(), "contract".to_string());
        metadata.insert(METADATA_TEMPLATE_ID.to_string(), "tpl-1".to_string());
        CreateSessionRequest {
            price_id: "price_abc".to_string(),
            success_url: "https://example.test/success?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "https://example.test/templates".to_string(),
            metadata,
            collect_phone: true,
            collect_buyer_name: true,
        }
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn session_params_carry_price_urls_and_metadata() {
        let params = create_session_params(&sample_request());

        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(param(&params, "line_items[0][price]"), Some("price_abc"));
        assert_eq!(param(&params, "line_items[0][quantity]"), Some("1"));
        assert_eq!(param(&params, "metadata[kind]"), Some("contract"));
        assert_eq!(param(&params, "metadata[template_id]"), Some("tpl-1"));
        assert_eq!(
            param(&params, "phone_number_collection[enabled]"),
            Some("true")
        );
        assert_eq!(
            param(&params, "custom_fields[0][key]"),
            Some(BUYER_NAME_FIELD)
        );
        assert!(param(&params, "success_url")
            .unwrap()
            .contains("{CHECKOUT_SESSION_ID}"));
    }

    #[test]
    fn optional_collection_flags_are_omitted() {
        let mut request = sample_request();
        request.collect_phone = false;
        request.collect_buyer_name = false;
        let params = create_session_params(&request);

        assert!(param(&params, "phone_number_collection[enabled]").is_none());
        assert!(param(&params, "custom_fields[0][key]").is_none());
    }

    #[test]
    fn retrieved_session_deserializes_and_converts() {
        let raw: CheckoutSessionResponse = serde_json::from_str(
            r#"{
                "id": "cs_test_1",
                "object": "checkout.session",
                "payment_status": "paid",
                "status": "complete",
                "amount_total": 15000,
                "currency": "usd",
                "customer_details": {"name": null, "email": "ada@example.test", "phone": "+15550100"},
                "custom_fields": [
                    {"key": "buyer_full_name", "type": "text", "text": {"value": "Ada Lovelace"}}
                ],
                "metadata": {"kind": "contract", "template_id": "tpl-1"}
            }"#,
        )
        .expect("fixture should deserialize");

        let session: ProviderSession = raw.into();
        assert_eq!(session.id, "cs_test_1");
        assert!(session.payment_status.is_paid());
        assert_eq!(session.amount_total, 15000);
        assert_eq!(session.customer_name, None);
        assert_eq!(session.customer_email.as_deref(), Some("ada@example.test"));
        assert_eq!(
            session.custom_field(BUYER_NAME_FIELD),
            Some("Ada Lovelace")
        );
        assert_eq!(session.metadata_value("template_id"), Some("tpl-1"));
    }

    #[test]
    fn missing_payment_status_is_unknown() {
        let raw: CheckoutSessionResponse =
            serde_json::from_str(r#"{"id": "cs_test_2", "url": "https://pay.example.test/cs_test_2"}"#)
                .expect("fixture should deserialize");
        let session: ProviderSession = raw.into();
        assert!(!session.payment_status.is_paid());
        assert_eq!(session.amount_total, 0);
    }
}
