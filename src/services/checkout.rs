use crate::{
    config::AppConfig,
    entities::contract_template,
    errors::ServiceError,
    events::{Event, EventSender},
    payments::{
        CreateSessionRequest, PaymentGateway, KIND_CONSULTATION, KIND_CONTRACT, METADATA_KIND,
        METADATA_PRICE_ID, METADATA_TEMPLATE_ID, METADATA_TEMPLATE_NAME,
    },
    services::CatalogService,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Checkout settings lifted out of AppConfig so the service can be built
/// without the full configuration in tests.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Success redirect, containing the provider's session-id placeholder
    pub success_url: String,
    /// Cancel redirect
    pub cancel_url: String,
    /// Fixed allow-list of consultation price references. Everything else
    /// is rejected before any provider call.
    pub consultation_price_ids: Vec<String>,
}

impl CheckoutSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            success_url: cfg.checkout_success_url(),
            cancel_url: cfg.checkout_cancel_url(),
            consultation_price_ids: cfg.consultation_price_allowlist(),
        }
    }
}

/// Redirect handed back to the storefront; payment confirmation only ever
/// happens after the provider's hosted flow completes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutRedirect {
    pub redirect_url: String,
}

/// Checkout session initiator
#[derive(Clone)]
pub struct CheckoutService {
    catalog: Arc<CatalogService>,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<CatalogService>,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            catalog,
            gateway,
            settings,
            event_sender,
        }
    }

    /// Start checkout for a contract template.
    ///
    /// Preconditions: the template exists, is active, and carries a provider
    /// price reference. Creates exactly one remote session and touches no
    /// local state.
    #[instrument(skip(self))]
    pub async fn create_template_checkout(
        &self,
        template_id: Uuid,
    ) -> Result<CheckoutRedirect, ServiceError> {
        let template = self.catalog.get_template(template_id).await?;

        if !template.is_active {
            return Err(ServiceError::ConfigurationError(format!(
                "Template {} is not available for purchase",
                template_id
            )));
        }

        let price_id = template
            .stripe_price_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                ServiceError::ConfigurationError(format!(
                    "Template {} has no payment price configured",
                    template_id
                ))
            })?;

        let session = self
            .gateway
            .create_checkout_session(CreateSessionRequest {
                price_id: price_id.to_string(),
                success_url: self.settings.success_url.clone(),
                cancel_url: self.settings.cancel_url.clone(),
                metadata: contract_metadata(&template),
                collect_phone: true,
                collect_buyer_name: true,
            })
            .await?;

        self.event_sender
            .send_or_log(Event::CheckoutSessionCreated {
                kind: KIND_CONTRACT.to_string(),
                template_id: Some(template_id),
                price_id: price_id.to_string(),
            })
            .await;

        info!(session_id = %session.id, "Created template checkout session");
        Ok(CheckoutRedirect {
            redirect_url: session.url,
        })
    }

    /// Start checkout for a fixed-price consultation package.
    ///
    /// The price reference comes from the client, so it is validated against
    /// the configured allow-list before anything leaves this process.
    #[instrument(skip(self))]
    pub async fn create_consultation_checkout(
        &self,
        price_id: &str,
    ) -> Result<CheckoutRedirect, ServiceError> {
        if !self
            .settings
            .consultation_price_ids
            .iter()
            .any(|allowed| allowed == price_id)
        {
            return Err(ServiceError::InvalidPrice(price_id.to_string()));
        }

        let mut metadata = BTreeMap::new();
        metadata.insert(METADATA_KIND.to_string(), KIND_CONSULTATION.to_string());
        metadata.insert(METADATA_PRICE_ID.to_string(), price_id.to_string());

        let session = self
            .gateway
            .create_checkout_session(CreateSessionRequest {
                price_id: price_id.to_string(),
                success_url: self.settings.success_url.clone(),
                cancel_url: self.settings.cancel_url.clone(),
                metadata,
                collect_phone: true,
                collect_buyer_name: true,
            })
            .await?;

        self.event_sender
            .send_or_log(Event::CheckoutSessionCreated {
                kind: KIND_CONSULTATION.to_string(),
                template_id: None,
                price_id: price_id.to_string(),
            })
            .await;

        info!(session_id = %session.id, "Created consultation checkout session");
        Ok(CheckoutRedirect {
            redirect_url: session.url,
        })
    }
}

fn contract_metadata(template: &contract_template::Model) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert(METADATA_KIND.to_string(), KIND_CONTRACT.to_string());
    metadata.insert(METADATA_TEMPLATE_ID.to_string(), template.id.to_string());
    metadata.insert(METADATA_TEMPLATE_NAME.to_string(), template.name.clone());
    metadata
}
