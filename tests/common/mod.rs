//! Shared fixtures: an in-memory database with the real migrations applied,
//! and a fake payment gateway the tests can preload with sessions.
#![allow(dead_code)]

use async_trait::async_trait;
use lexcart_api::{
    entities::contract_template,
    errors::ServiceError,
    events::{Event, EventSender},
    payments::{CreateSessionRequest, CreatedSession, PaymentGateway, ProviderSession},
    services::{
        checkout::CheckoutSettings, CatalogService, CheckoutService, EntitlementService,
        PaymentVerifier,
    },
    storage::SeaOrmEntitlementStore,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

pub const PUBLIC_ORIGIN: &str = "https://lexcart.dev";

/// One connection so every query sees the same in-memory database.
pub async fn setup_db() -> Arc<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1);
    let db = Database::connect(opt).await.expect("sqlite connect");
    lexcart_api::migrator::Migrator::up(&db, None)
        .await
        .expect("migrations apply");
    Arc::new(db)
}

pub fn event_channel() -> (Arc<EventSender>, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(64);
    (Arc::new(EventSender::new(tx)), rx)
}

/// Gateway whose sessions are preloaded by the test; counts provider calls.
#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<HashMap<String, ProviderSession>>,
    pub create_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_session(&self, session: ProviderSession) {
        self.sessions
            .lock()
            .await
            .insert(session.id.clone(), session);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CreatedSession, ServiceError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CreatedSession {
            id: format!("cs_fake_{}", request.price_id),
            url: format!("https://pay.example.test/c/{}", request.price_id),
        })
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<ProviderSession, ServiceError> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Checkout session {} not found", session_id))
            })
    }
}

pub struct TestServices {
    pub db: Arc<DatabaseConnection>,
    pub gateway: Arc<FakeGateway>,
    pub catalog: Arc<CatalogService>,
    pub checkout: CheckoutService,
    pub entitlements: EntitlementService,
    // Events drain here; kept alive so sends never hit a closed channel.
    pub events: mpsc::Receiver<Event>,
}

pub async fn setup_services() -> TestServices {
    let db = setup_db().await;
    let (event_sender, events) = event_channel();
    let gateway = Arc::new(FakeGateway::new());

    let catalog = Arc::new(CatalogService::new(db.clone(), event_sender.clone()));
    let checkout = CheckoutService::new(
        catalog.clone(),
        gateway.clone(),
        CheckoutSettings {
            success_url: format!(
                "{}/purchase/success?session_id={{CHECKOUT_SESSION_ID}}",
                PUBLIC_ORIGIN
            ),
            cancel_url: format!("{}/templates", PUBLIC_ORIGIN),
            consultation_price_ids: vec!["price_consult_30".to_string()],
        },
        event_sender.clone(),
    );
    let verifier = Arc::new(PaymentVerifier::new(gateway.clone(), catalog.clone()));
    let store = Arc::new(SeaOrmEntitlementStore::new(db.clone()));
    let entitlements =
        EntitlementService::new(store, verifier, event_sender, PUBLIC_ORIGIN);

    TestServices {
        db,
        gateway,
        catalog,
        checkout,
        entitlements,
        events,
    }
}

pub struct TemplateSpec {
    pub name: &'static str,
    pub price: Decimal,
    pub stripe_price_id: Option<&'static str>,
    pub file_url: Option<&'static str>,
    pub is_active: bool,
}

pub async fn seed_template(
    db: &DatabaseConnection,
    spec: TemplateSpec,
) -> contract_template::Model {
    contract_template::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(spec.name.to_string()),
        description: Set(None),
        price: Set(spec.price),
        currency: Set("USD".to_string()),
        stripe_price_id: Set(spec.stripe_price_id.map(String::from)),
        file_url: Set(spec.file_url.map(String::from)),
        preview_url: Set(None),
        is_active: Set(spec.is_active),
        display_order: Set(0),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("template insert")
}
