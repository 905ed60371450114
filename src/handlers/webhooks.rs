use crate::{errors::ServiceError, AppState};
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_TOLERANCE_SECS: u64 = 300;

/// Provider webhook intake.
///
/// Deliveries are at-least-once; duplicates and races with the success-page
/// poll are absorbed by the entitlement recorder's upsert, so no separate
/// dedup cache is needed here.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Webhook accepted"),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(secret) = state.config.stripe_webhook_secret.clone() {
        let tolerance = state
            .config
            .stripe_webhook_tolerance_secs
            .unwrap_or(DEFAULT_TOLERANCE_SECS);
        if !verify_signature(&headers, &body, &secret, tolerance) {
            warn!("Payment webhook signature verification failed");
            return Err(ServiceError::Unauthorized(
                "invalid webhook signature".to_string(),
            ));
        }
    }

    let json: Value = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid json: {}", e)))?;

    let event_type = json.get("type").and_then(|v| v.as_str()).unwrap_or("");
    match event_type {
        "checkout.session.completed" => {
            let session_id = json
                .pointer("/data/object/id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    ServiceError::BadRequest("event carries no session id".to_string())
                })?;

            match state.services.entitlements.resolve(session_id).await {
                Ok(outcome) => {
                    info!(session_id, ?outcome, "Webhook recorded entitlement");
                }
                // The session showed up unpaid; the success-page poll will
                // pick it up once the provider settles. Acknowledge so the
                // provider does not hammer a state we cannot advance.
                Err(ServiceError::PaymentNotCompleted(_)) => {
                    warn!(session_id, "Completed-session webhook for unpaid session");
                }
                // Storage or provider trouble: signal failure so the
                // provider redelivers; the upsert makes the retry safe.
                Err(err) => return Err(err),
            }
        }
        other => {
            info!("Unhandled payment webhook type: {}", other);
        }
    }

    Ok((axum::http::StatusCode::OK, "ok"))
}

/// Stripe-style signature header: `t=<unix>,v1=<hex hmac>` over
/// `"{t}.{payload}"`.
fn verify_signature(headers: &HeaderMap, payload: &Bytes, secret: &str, tolerance_secs: u64) -> bool {
    let Some(sig) = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
    else {
        return false;
    };

    let mut ts = "";
    let mut v1 = "";
    for part in sig.split(',') {
        let mut it = part.trim().split('=');
        match (it.next(), it.next()) {
            (Some("t"), Some(val)) => ts = val,
            (Some("v1"), Some(val)) => v1 = val,
            _ => {}
        }
    }
    if ts.is_empty() || v1.is_empty() {
        return false;
    }

    if let Ok(ts_i) = ts.parse::<i64>() {
        let now = chrono::Utc::now().timestamp();
        if (now - ts_i).unsigned_abs() > tolerance_secs {
            return false;
        }
    } else {
        return false;
    }

    let signed = format!("{}.{}", ts, std::str::from_utf8(payload).unwrap_or(""));
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(signed.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, v1)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &str, secret: &str, ts: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", ts, payload).as_bytes());
        format!("t={},v1={}", ts, hex::encode(mac.finalize().into_bytes()))
    }

    fn headers_with(sig: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Stripe-Signature", sig.parse().unwrap());
        headers
    }

    #[test]
    fn valid_signature_passes() {
        let payload = r#"{"type":"checkout.session.completed"}"#;
        let ts = chrono::Utc::now().timestamp();
        let sig = sign(payload, "whsec_test", ts);

        assert!(verify_signature(
            &headers_with(&sig),
            &Bytes::from(payload),
            "whsec_test",
            300
        ));
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = r#"{"type":"checkout.session.completed"}"#;
        let ts = chrono::Utc::now().timestamp();
        let sig = sign(payload, "whsec_other", ts);

        assert!(!verify_signature(
            &headers_with(&sig),
            &Bytes::from(payload),
            "whsec_test",
            300
        ));
    }

    #[test]
    fn stale_timestamp_fails() {
        let payload = r#"{}"#;
        let ts = chrono::Utc::now().timestamp() - 3600;
        let sig = sign(payload, "whsec_test", ts);

        assert!(!verify_signature(
            &headers_with(&sig),
            &Bytes::from(payload),
            "whsec_test",
            300
        ));
    }

    #[test]
    fn missing_header_fails() {
        assert!(!verify_signature(
            &HeaderMap::new(),
            &Bytes::from_static(b"{}"),
            "whsec_test",
            300
        ));
    }

    #[test]
    fn tampered_payload_fails() {
        let ts = chrono::Utc::now().timestamp();
        let sig = sign(r#"{"amount":100}"#, "whsec_test", ts);

        assert!(!verify_signature(
            &headers_with(&sig),
            &Bytes::from_static(br#"{"amount":999}"#),
            "whsec_test",
            300
        ));
    }
}
