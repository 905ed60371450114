use crate::{
    entities::{contract_template, purchase::PurchaseKind},
    errors::ServiceError,
    payments::{PaymentGateway, ProviderSession, BUYER_NAME_FIELD, METADATA_TEMPLATE_ID},
    services::CatalogService,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Buyer name recorded when neither the provider's standard name field nor
/// the checkout custom field captured one.
const FALLBACK_BUYER_NAME: &str = "Guest";

/// Outcome of looking the purchased item back up in the catalog.
///
/// `Missing` is deliberately not an error: a template deleted after purchase
/// must not block recording the paid session, only degrade asset resolution.
#[derive(Debug, Clone)]
pub enum TemplateLookup {
    Found(contract_template::Model),
    Missing(Uuid),
    /// Consultation purchases have no catalog entry to look up
    NotApplicable,
}

#[derive(Debug, Clone)]
pub struct BuyerDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A checkout session confirmed paid, with everything the recorder needs.
#[derive(Debug, Clone)]
pub struct VerifiedPurchase {
    pub session_id: String,
    pub kind: PurchaseKind,
    pub template: TemplateLookup,
    pub buyer: BuyerDetails,
    /// Major currency units, normalized from the provider's minor units
    pub amount: Decimal,
    pub currency: String,
}

impl VerifiedPurchase {
    pub fn template_id(&self) -> Option<Uuid> {
        match &self.template {
            TemplateLookup::Found(template) => Some(template.id),
            TemplateLookup::Missing(id) => Some(*id),
            TemplateLookup::NotApplicable => None,
        }
    }
}

/// Confirms payment state with the provider and maps a session back to what
/// was bought. Pure read: calling it any number of times returns the same
/// logical result and records nothing.
#[derive(Clone)]
pub struct PaymentVerifier {
    gateway: Arc<dyn PaymentGateway>,
    catalog: Arc<CatalogService>,
}

impl PaymentVerifier {
    pub fn new(gateway: Arc<dyn PaymentGateway>, catalog: Arc<CatalogService>) -> Self {
        Self { gateway, catalog }
    }

    #[instrument(skip(self))]
    pub async fn verify(&self, session_id: &str) -> Result<VerifiedPurchase, ServiceError> {
        let session = self.gateway.retrieve_checkout_session(session_id).await?;

        if !session.payment_status.is_paid() {
            return Err(ServiceError::PaymentNotCompleted(session_id.to_string()));
        }

        let (kind, template) = match session.metadata_value(METADATA_TEMPLATE_ID) {
            Some(raw_id) => {
                let template = match raw_id.parse::<Uuid>() {
                    Ok(template_id) => match self.catalog.find_template(template_id).await? {
                        Some(template) => TemplateLookup::Found(template),
                        None => {
                            warn!(
                                template_id = %template_id,
                                "Purchased template no longer in catalog"
                            );
                            TemplateLookup::Missing(template_id)
                        }
                    },
                    Err(_) => {
                        warn!(raw_id, "Unparseable template id in session metadata");
                        TemplateLookup::NotApplicable
                    }
                };
                (PurchaseKind::Contract, template)
            }
            None => (PurchaseKind::Consultation, TemplateLookup::NotApplicable),
        };

        Ok(VerifiedPurchase {
            session_id: session.id.clone(),
            kind,
            template,
            buyer: buyer_details(&session),
            amount: normalize_minor_units(session.amount_total),
            currency: session.currency.clone(),
        })
    }
}

/// Minor currency units (cents) to major units: 15000 -> 150.00.
pub fn normalize_minor_units(amount_total: i64) -> Decimal {
    Decimal::new(amount_total, 2)
}

fn buyer_details(session: &ProviderSession) -> BuyerDetails {
    let name = session
        .customer_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| session.custom_field(BUYER_NAME_FIELD))
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(FALLBACK_BUYER_NAME)
        .trim()
        .to_string();

    BuyerDetails {
        name,
        email: session.customer_email.clone().unwrap_or_default(),
        phone: session.customer_phone.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::SessionPaymentStatus;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn session(name: Option<&str>, custom_name: Option<&str>) -> ProviderSession {
        let mut custom_fields = BTreeMap::new();
        if let Some(value) = custom_name {
            custom_fields.insert(BUYER_NAME_FIELD.to_string(), value.to_string());
        }
        ProviderSession {
            id: "cs_1".to_string(),
            payment_status: SessionPaymentStatus::Paid,
            amount_total: 5000,
            currency: "usd".to_string(),
            customer_name: name.map(String::from),
            customer_email: Some("ada@example.test".to_string()),
            customer_phone: None,
            custom_fields,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn minor_units_normalize_to_major() {
        assert_eq!(normalize_minor_units(15000), dec!(150.00));
        assert_eq!(normalize_minor_units(5000), dec!(50.00));
        assert_eq!(normalize_minor_units(99), dec!(0.99));
        assert_eq!(normalize_minor_units(0), dec!(0.00));
    }

    #[test]
    fn buyer_name_prefers_provider_details() {
        let details = buyer_details(&session(Some("Ada Lovelace"), Some("Custom Name")));
        assert_eq!(details.name, "Ada Lovelace");
    }

    #[test]
    fn buyer_name_falls_back_to_custom_field() {
        let details = buyer_details(&session(None, Some("Ada From Field")));
        assert_eq!(details.name, "Ada From Field");

        let blank_provider = buyer_details(&session(Some("   "), Some("Ada From Field")));
        assert_eq!(blank_provider.name, "Ada From Field");
    }

    #[test]
    fn buyer_name_defaults_to_guest() {
        let details = buyer_details(&session(None, None));
        assert_eq!(details.name, "Guest");
    }
}
