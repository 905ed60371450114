//! Payment provider boundary.
//!
//! The checkout and verification services talk to the provider only through
//! [`PaymentGateway`], so tests substitute a fake and the Stripe-backed
//! client stays a detail of process wiring.

use crate::errors::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod stripe;

pub use stripe::StripeGateway;

/// Metadata keys carried on every checkout session so verification can map a
/// session back to what was bought.
pub const METADATA_KIND: &str = "kind";
pub const METADATA_TEMPLATE_ID: &str = "template_id";
pub const METADATA_TEMPLATE_NAME: &str = "template_name";
pub const METADATA_PRICE_ID: &str = "price_id";

pub const KIND_CONTRACT: &str = "contract";
pub const KIND_CONSULTATION: &str = "consultation";

/// Key of the checkout custom field capturing the buyer's full name, used as
/// a fallback when the provider's standard name field was not collected.
pub const BUYER_NAME_FIELD: &str = "buyer_full_name";

/// One provider-hosted checkout session to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Provider price reference, quantity is always 1
    pub price_id: String,
    /// Redirect target on success; contains the provider's session-id placeholder
    pub success_url: String,
    /// Redirect target when the buyer abandons
    pub cancel_url: String,
    /// Metadata bag echoed back on retrieval
    pub metadata: BTreeMap<String, String>,
    /// Ask the provider to collect the buyer's phone number
    pub collect_phone: bool,
    /// Add a custom field capturing the buyer's full name
    pub collect_buyer_name: bool,
}

/// Freshly created session: the storefront only needs the redirect URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSession {
    pub id: String,
    pub url: String,
}

/// Provider-reported payment status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
    /// Status string this client does not recognize; treated as not paid
    Unknown,
}

impl SessionPaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, SessionPaymentStatus::Paid)
    }
}

impl From<&str> for SessionPaymentStatus {
    fn from(value: &str) -> Self {
        match value {
            "paid" => SessionPaymentStatus::Paid,
            "unpaid" => SessionPaymentStatus::Unpaid,
            "no_payment_required" => SessionPaymentStatus::NoPaymentRequired,
            _ => SessionPaymentStatus::Unknown,
        }
    }
}

/// A checkout session as read back from the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSession {
    pub id: String,
    pub payment_status: SessionPaymentStatus,
    /// Total in minor currency units (e.g. cents)
    pub amount_total: i64,
    pub currency: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    /// Custom field key -> captured text value
    pub custom_fields: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
}

impl ProviderSession {
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn custom_field(&self, key: &str) -> Option<&str> {
        self.custom_fields.get(key).map(String::as_str)
    }
}

/// Port to the hosted payment provider.
///
/// Implementations must be side-effect free on local state: session objects
/// live at the provider, and reads are safely repeatable.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session and return its redirect URL.
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CreatedSession, ServiceError>;

    /// Retrieve a session by its opaque identifier.
    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<ProviderSession, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn payment_status_parsing() {
        assert_eq!(SessionPaymentStatus::from("paid"), SessionPaymentStatus::Paid);
        assert_eq!(
            SessionPaymentStatus::from("unpaid"),
            SessionPaymentStatus::Unpaid
        );
        assert_eq!(
            SessionPaymentStatus::from("no_payment_required"),
            SessionPaymentStatus::NoPaymentRequired
        );
        assert_eq!(
            SessionPaymentStatus::from("settling"),
            SessionPaymentStatus::Unknown
        );
    }

    #[test]
    fn only_paid_counts_as_paid() {
        assert!(SessionPaymentStatus::Paid.is_paid());
        assert!(!SessionPaymentStatus::Unpaid.is_paid());
        assert!(!SessionPaymentStatus::NoPaymentRequired.is_paid());
        assert!(!SessionPaymentStatus::Unknown.is_paid());
    }
}
