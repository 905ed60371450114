use crate::{
    entities::purchase::{self, PurchaseStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::verification::{PaymentVerifier, TemplateLookup, VerifiedPurchase},
    storage::{EntitlementStore, NewDownload, NewPurchase, PurchaseWithTemplate},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

/// Terminal outcome of resolving a paid checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolveOutcome {
    /// Contract purchase with a deliverable asset
    Download {
        download_url: String,
        template_name: String,
    },
    /// Consultation purchase: paid, no deliverable. A success, not an error.
    Consultation,
    /// Contract purchase whose template (or its asset) is gone. The purchase
    /// stays recorded; the buyer is pointed at support.
    AssetUnavailable,
}

/// Entitlement recorder and resolver.
///
/// `record` is the single place the at-most-one-per-session invariant is
/// enforced; callers (success page, webhook, background re-checks) may all
/// invoke it for the same session in any interleaving.
#[derive(Clone)]
pub struct EntitlementService {
    store: Arc<dyn EntitlementStore>,
    verifier: Arc<PaymentVerifier>,
    event_sender: Arc<EventSender>,
    public_origin: String,
}

impl EntitlementService {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        verifier: Arc<PaymentVerifier>,
        event_sender: Arc<EventSender>,
        public_origin: impl Into<String>,
    ) -> Self {
        Self {
            store,
            verifier,
            event_sender,
            public_origin: public_origin.into(),
        }
    }

    /// Idempotently persist the purchase (and download, when an asset was
    /// bought) for a verified session.
    ///
    /// The two upserts are independently idempotent rather than wrapped in a
    /// transaction: a retry after a partial failure converges to both rows
    /// written, never to duplicates.
    #[instrument(skip(self, verified), fields(session_id = %verified.session_id))]
    pub async fn record(
        &self,
        verified: &VerifiedPurchase,
    ) -> Result<purchase::Model, ServiceError> {
        let recorded = self
            .store
            .upsert_purchase(NewPurchase {
                stripe_session_id: verified.session_id.clone(),
                template_id: verified.template_id(),
                buyer_name: verified.buyer.name.clone(),
                buyer_email: verified.buyer.email.clone(),
                buyer_phone: verified.buyer.phone.clone(),
                amount: verified.amount,
                currency: verified.currency.clone(),
                kind: verified.kind,
                status: PurchaseStatus::Completed,
            })
            .await?;

        self.event_sender
            .send_or_log(Event::PurchaseRecorded {
                purchase_id: recorded.id,
                stripe_session_id: recorded.stripe_session_id.clone(),
            })
            .await;

        if let TemplateLookup::Found(template) = &verified.template {
            if let Some(file_url) = template.file_url.as_deref().filter(|f| !f.is_empty()) {
                self.store
                    .upsert_download(NewDownload {
                        stripe_session_id: verified.session_id.clone(),
                        template_id: template.id,
                        file_url: file_url.to_string(),
                    })
                    .await?;

                self.event_sender
                    .send_or_log(Event::DownloadIssued {
                        template_id: template.id,
                        stripe_session_id: verified.session_id.clone(),
                    })
                    .await;
            }
        }

        Ok(recorded)
    }

    /// Verify payment, record the entitlement, and work out what the buyer
    /// is owed. Safe under concurrent and repeated invocation for the same
    /// session; every call returns the same logical outcome.
    #[instrument(skip(self))]
    pub async fn resolve(&self, session_id: &str) -> Result<ResolveOutcome, ServiceError> {
        let verified = self.verifier.verify(session_id).await?;
        self.record(&verified).await?;

        let outcome = match &verified.template {
            TemplateLookup::Found(template) => match template.file_url.as_deref() {
                Some(file_url) if !file_url.is_empty() => ResolveOutcome::Download {
                    download_url: absolute_url(&self.public_origin, file_url),
                    template_name: template.name.clone(),
                },
                _ => ResolveOutcome::AssetUnavailable,
            },
            TemplateLookup::Missing(_) => ResolveOutcome::AssetUnavailable,
            TemplateLookup::NotApplicable => ResolveOutcome::Consultation,
        };

        info!(session_id, ?outcome, "Resolved checkout session");
        Ok(outcome)
    }

    /// Dashboard read: purchases newest first with template names.
    pub async fn list_purchases(
        &self,
        page: u64,
        per_page: u64,
        status: Option<PurchaseStatus>,
    ) -> Result<(Vec<PurchaseWithTemplate>, u64), ServiceError> {
        self.store.list_purchases(page, per_page, status).await
    }
}

/// Asset paths are stored relative to the public origin; absolute URLs pass
/// through untouched.
fn absolute_url(origin: &str, file_url: &str) -> String {
    if file_url.starts_with("http://") || file_url.starts_with("https://") {
        return file_url.to_string();
    }
    let origin = origin.trim_end_matches('/');
    if file_url.starts_with('/') {
        format!("{}{}", origin, file_url)
    } else {
        format!("{}/{}", origin, file_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::purchase::PurchaseKind;
    use crate::services::verification::BuyerDetails;
    use crate::storage::InMemoryEntitlementStore;
    use crate::{payments::PaymentGateway, services::CatalogService};
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn verified_consultation(session_id: &str) -> VerifiedPurchase {
        VerifiedPurchase {
            session_id: session_id.to_string(),
            kind: PurchaseKind::Consultation,
            template: TemplateLookup::NotApplicable,
            buyer: BuyerDetails {
                name: "Guest".to_string(),
                email: "guest@example.test".to_string(),
                phone: None,
            },
            amount: dec!(80.00),
            currency: "usd".to_string(),
        }
    }

    fn service_with_store(
        store: Arc<InMemoryEntitlementStore>,
    ) -> (EntitlementService, mpsc::Receiver<Event>) {
        struct NoGateway;

        #[async_trait::async_trait]
        impl PaymentGateway for NoGateway {
            async fn create_checkout_session(
                &self,
                _request: crate::payments::CreateSessionRequest,
            ) -> Result<crate::payments::CreatedSession, ServiceError> {
                unreachable!("record tests never create sessions")
            }

            async fn retrieve_checkout_session(
                &self,
                session_id: &str,
            ) -> Result<crate::payments::ProviderSession, ServiceError> {
                Err(ServiceError::NotFound(session_id.to_string()))
            }
        }

        let (tx, rx) = mpsc::channel(16);
        let event_sender = Arc::new(EventSender::new(tx));
        let catalog = Arc::new(CatalogService::new(
            Arc::new(sea_orm::DatabaseConnection::Disconnected),
            event_sender.clone(),
        ));
        let verifier = Arc::new(PaymentVerifier::new(Arc::new(NoGateway), catalog));
        (
            EntitlementService::new(store, verifier, event_sender, "https://lexcart.dev"),
            rx,
        )
    }

    #[tokio::test]
    async fn recording_twice_keeps_a_single_purchase() {
        let store = Arc::new(InMemoryEntitlementStore::new());
        let (service, _rx) = service_with_store(store.clone());
        let verified = verified_consultation("cs_1");

        let first = service.record(&verified).await.unwrap();
        let second = service.record(&verified).await.unwrap();

        assert_eq!(store.purchase_count().await, 1);
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, PurchaseStatus::Completed);
        assert_eq!(second.amount, dec!(80.00));
    }

    #[tokio::test]
    async fn contract_with_asset_records_purchase_and_download() {
        let store = Arc::new(InMemoryEntitlementStore::new());
        let (service, mut rx) = service_with_store(store.clone());

        let template = crate::entities::contract_template::Model {
            id: Uuid::new_v4(),
            name: "NDA".to_string(),
            description: None,
            price: dec!(50.00),
            currency: "USD".to_string(),
            stripe_price_id: Some("price_abc".to_string()),
            file_url: Some("/files/nda.docx".to_string()),
            preview_url: None,
            is_active: true,
            display_order: 0,
            created_at: chrono::Utc::now(),
            updated_at: None,
        };

        let verified = VerifiedPurchase {
            session_id: "cs_2".to_string(),
            kind: PurchaseKind::Contract,
            template: TemplateLookup::Found(template),
            buyer: BuyerDetails {
                name: "Ada Lovelace".to_string(),
                email: "ada@example.test".to_string(),
                phone: None,
            },
            amount: dec!(50.00),
            currency: "usd".to_string(),
        };

        service.record(&verified).await.unwrap();
        service.record(&verified).await.unwrap();

        assert_eq!(store.purchase_count().await, 1);
        assert_eq!(store.download_count().await, 1);

        match rx.recv().await {
            Some(Event::PurchaseRecorded {
                stripe_session_id, ..
            }) => assert_eq!(stripe_session_id, "cs_2"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_template_still_records_the_purchase() {
        let store = Arc::new(InMemoryEntitlementStore::new());
        let (service, _rx) = service_with_store(store.clone());

        let gone_template = Uuid::new_v4();
        let verified = VerifiedPurchase {
            session_id: "cs_3".to_string(),
            kind: PurchaseKind::Contract,
            template: TemplateLookup::Missing(gone_template),
            buyer: BuyerDetails {
                name: "Guest".to_string(),
                email: "guest@example.test".to_string(),
                phone: None,
            },
            amount: dec!(50.00),
            currency: "usd".to_string(),
        };

        let recorded = service.record(&verified).await.unwrap();

        assert_eq!(store.purchase_count().await, 1);
        assert_eq!(store.download_count().await, 0);
        assert_eq!(recorded.template_id, Some(gone_template));
    }

    #[test]
    fn absolute_url_joins_origin_and_relative_paths() {
        assert_eq!(
            absolute_url("https://lexcart.dev", "/files/nda.docx"),
            "https://lexcart.dev/files/nda.docx"
        );
        assert_eq!(
            absolute_url("https://lexcart.dev/", "files/nda.docx"),
            "https://lexcart.dev/files/nda.docx"
        );
        assert_eq!(
            absolute_url("https://lexcart.dev", "https://cdn.example.test/nda.docx"),
            "https://cdn.example.test/nda.docx"
        );
    }
}
