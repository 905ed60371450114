pub mod checkout;
pub mod common;
pub mod consultations;
pub mod purchases;
pub mod templates;
pub mod webhooks;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::payments::PaymentGateway;
use crate::services::checkout::CheckoutSettings;
use crate::storage::SeaOrmEntitlementStore;
use crate::db::DbPool;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<crate::services::CatalogService>,
    pub checkout: Arc<crate::services::CheckoutService>,
    pub entitlements: Arc<crate::services::EntitlementService>,
    pub consultations: Arc<crate::services::ConsultationService>,
}

impl AppServices {
    /// Wire the service graph: gateway and store are injected so tests can
    /// substitute fakes for both external collaborators.
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
        cfg: &AppConfig,
    ) -> Self {
        let catalog = Arc::new(crate::services::CatalogService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let checkout = Arc::new(crate::services::CheckoutService::new(
            catalog.clone(),
            gateway.clone(),
            CheckoutSettings::from_config(cfg),
            event_sender.clone(),
        ));
        let verifier = Arc::new(crate::services::PaymentVerifier::new(
            gateway,
            catalog.clone(),
        ));
        let store = Arc::new(SeaOrmEntitlementStore::new(db.clone()));
        let entitlements = Arc::new(crate::services::EntitlementService::new(
            store,
            verifier,
            event_sender.clone(),
            cfg.public_origin.clone(),
        ));
        let consultations = Arc::new(crate::services::ConsultationService::new(
            db,
            event_sender,
        ));

        Self {
            catalog,
            checkout,
            entitlements,
            consultations,
        }
    }
}
