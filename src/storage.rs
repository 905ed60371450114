//! Entitlement storage boundary.
//!
//! The recorder needs exactly one capability from its store:
//! insert-or-update keyed on the checkout session identifier. The unique
//! constraint on that column is the sole serialization point for concurrent
//! recordings of the same session; no engine-specific behavior leaks past
//! this trait.

use crate::{
    entities::{
        contract_template, download,
        purchase::{self, PurchaseKind, PurchaseStatus},
        Download, Purchase,
    },
    errors::ServiceError,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Purchase row content, minus identity and timestamps (the store owns those).
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub stripe_session_id: String,
    pub template_id: Option<Uuid>,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub kind: PurchaseKind,
    pub status: PurchaseStatus,
}

#[derive(Debug, Clone)]
pub struct NewDownload {
    pub stripe_session_id: String,
    pub template_id: Uuid,
    pub file_url: String,
}

/// A purchase row joined with the template name, for dashboard listings.
#[derive(Debug, Clone)]
pub struct PurchaseWithTemplate {
    pub purchase: purchase::Model,
    pub template_name: Option<String>,
}

#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Insert a purchase, or update the existing row with the same
    /// session id in place. Never produces a second row per session.
    async fn upsert_purchase(&self, new: NewPurchase) -> Result<purchase::Model, ServiceError>;

    /// Same contract for the download record.
    async fn upsert_download(&self, new: NewDownload) -> Result<download::Model, ServiceError>;

    async fn find_purchase_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<purchase::Model>, ServiceError>;

    async fn find_download_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<download::Model>, ServiceError>;

    /// Dashboard read: purchases newest first, joined with template names.
    async fn list_purchases(
        &self,
        page: u64,
        per_page: u64,
        status: Option<PurchaseStatus>,
    ) -> Result<(Vec<PurchaseWithTemplate>, u64), ServiceError>;
}

/// sea-orm backed store; works against Postgres and SQLite alike.
#[derive(Clone)]
pub struct SeaOrmEntitlementStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmEntitlementStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntitlementStore for SeaOrmEntitlementStore {
    async fn upsert_purchase(&self, new: NewPurchase) -> Result<purchase::Model, ServiceError> {
        let now = Utc::now();
        let session_id = new.stripe_session_id.clone();

        let model = purchase::ActiveModel {
            id: Set(Uuid::new_v4()),
            template_id: Set(new.template_id),
            buyer_name: Set(new.buyer_name),
            buyer_email: Set(new.buyer_email),
            buyer_phone: Set(new.buyer_phone),
            amount: Set(new.amount),
            currency: Set(new.currency),
            kind: Set(new.kind),
            status: Set(new.status),
            stripe_session_id: Set(new.stripe_session_id),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        Purchase::insert(model)
            .on_conflict(
                OnConflict::column(purchase::Column::StripeSessionId)
                    .update_columns([
                        purchase::Column::TemplateId,
                        purchase::Column::BuyerName,
                        purchase::Column::BuyerEmail,
                        purchase::Column::BuyerPhone,
                        purchase::Column::Amount,
                        purchase::Column::Currency,
                        purchase::Column::Kind,
                        purchase::Column::Status,
                        purchase::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&*self.db)
            .await?;

        self.find_purchase_by_session(&session_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "purchase for session {} missing after upsert",
                    session_id
                ))
            })
    }

    async fn upsert_download(&self, new: NewDownload) -> Result<download::Model, ServiceError> {
        let session_id = new.stripe_session_id.clone();

        let model = download::ActiveModel {
            id: Set(Uuid::new_v4()),
            stripe_session_id: Set(new.stripe_session_id),
            template_id: Set(new.template_id),
            file_url: Set(new.file_url),
            issued_at: Set(Utc::now()),
        };

        Download::insert(model)
            .on_conflict(
                OnConflict::column(download::Column::StripeSessionId)
                    .update_columns([download::Column::TemplateId, download::Column::FileUrl])
                    .to_owned(),
            )
            .exec(&*self.db)
            .await?;

        self.find_download_by_session(&session_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "download for session {} missing after upsert",
                    session_id
                ))
            })
    }

    async fn find_purchase_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<purchase::Model>, ServiceError> {
        Ok(Purchase::find()
            .filter(purchase::Column::StripeSessionId.eq(session_id))
            .one(&*self.db)
            .await?)
    }

    async fn find_download_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<download::Model>, ServiceError> {
        Ok(Download::find()
            .filter(download::Column::StripeSessionId.eq(session_id))
            .one(&*self.db)
            .await?)
    }

    async fn list_purchases(
        &self,
        page: u64,
        per_page: u64,
        status: Option<PurchaseStatus>,
    ) -> Result<(Vec<PurchaseWithTemplate>, u64), ServiceError> {
        let mut query = Purchase::find();
        if let Some(status) = status {
            query = query.filter(purchase::Column::Status.eq(status));
        }

        let total = query.clone().count(&*self.db).await?;

        let page = page.max(1);
        let rows = query
            .find_also_related(contract_template::Entity)
            .order_by_desc(purchase::Column::CreatedAt)
            .paginate(&*self.db, per_page.clamp(1, 100))
            .fetch_page(page - 1)
            .await?;

        let items = rows
            .into_iter()
            .map(|(purchase, template)| PurchaseWithTemplate {
                purchase,
                template_name: template.map(|t| t.name),
            })
            .collect();

        Ok((items, total))
    }
}

/// In-memory store used by unit tests; mirrors the upsert contract exactly.
#[derive(Default)]
pub struct InMemoryEntitlementStore {
    purchases: Mutex<HashMap<String, purchase::Model>>,
    downloads: Mutex<HashMap<String, download::Model>>,
}

impl InMemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn purchase_count(&self) -> usize {
        self.purchases.lock().await.len()
    }

    pub async fn download_count(&self) -> usize {
        self.downloads.lock().await.len()
    }
}

#[async_trait]
impl EntitlementStore for InMemoryEntitlementStore {
    async fn upsert_purchase(&self, new: NewPurchase) -> Result<purchase::Model, ServiceError> {
        let mut purchases = self.purchases.lock().await;
        let now = Utc::now();

        let model = match purchases.get(&new.stripe_session_id) {
            Some(existing) => purchase::Model {
                // identity and creation time survive re-recording
                id: existing.id,
                created_at: existing.created_at,
                template_id: new.template_id,
                buyer_name: new.buyer_name,
                buyer_email: new.buyer_email,
                buyer_phone: new.buyer_phone,
                amount: new.amount,
                currency: new.currency,
                kind: new.kind,
                status: new.status,
                stripe_session_id: new.stripe_session_id.clone(),
                updated_at: Some(now),
            },
            None => purchase::Model {
                id: Uuid::new_v4(),
                template_id: new.template_id,
                buyer_name: new.buyer_name,
                buyer_email: new.buyer_email,
                buyer_phone: new.buyer_phone,
                amount: new.amount,
                currency: new.currency,
                kind: new.kind,
                status: new.status,
                stripe_session_id: new.stripe_session_id.clone(),
                created_at: now,
                updated_at: Some(now),
            },
        };

        purchases.insert(new.stripe_session_id.clone(), model.clone());
        Ok(model)
    }

    async fn upsert_download(&self, new: NewDownload) -> Result<download::Model, ServiceError> {
        let mut downloads = self.downloads.lock().await;

        let model = match downloads.get(&new.stripe_session_id) {
            Some(existing) => download::Model {
                id: existing.id,
                issued_at: existing.issued_at,
                stripe_session_id: new.stripe_session_id.clone(),
                template_id: new.template_id,
                file_url: new.file_url,
            },
            None => download::Model {
                id: Uuid::new_v4(),
                stripe_session_id: new.stripe_session_id.clone(),
                template_id: new.template_id,
                file_url: new.file_url,
                issued_at: Utc::now(),
            },
        };

        downloads.insert(new.stripe_session_id.clone(), model.clone());
        Ok(model)
    }

    async fn find_purchase_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<purchase::Model>, ServiceError> {
        Ok(self.purchases.lock().await.get(session_id).cloned())
    }

    async fn find_download_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<download::Model>, ServiceError> {
        Ok(self.downloads.lock().await.get(session_id).cloned())
    }

    async fn list_purchases(
        &self,
        page: u64,
        per_page: u64,
        status: Option<PurchaseStatus>,
    ) -> Result<(Vec<PurchaseWithTemplate>, u64), ServiceError> {
        let purchases = self.purchases.lock().await;
        let mut rows: Vec<_> = purchases
            .values()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = rows.len() as u64;
        let page = page.max(1);
        let start = ((page - 1) * per_page) as usize;
        let items = rows
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .map(|purchase| PurchaseWithTemplate {
                purchase,
                template_name: None,
            })
            .collect();

        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_purchase(session_id: &str) -> NewPurchase {
        NewPurchase {
            stripe_session_id: session_id.to_string(),
            template_id: Some(Uuid::new_v4()),
            buyer_name: "Ada Lovelace".to_string(),
            buyer_email: "ada@example.test".to_string(),
            buyer_phone: None,
            amount: dec!(150.00),
            currency: "usd".to_string(),
            kind: PurchaseKind::Contract,
            status: PurchaseStatus::Completed,
        }
    }

    #[tokio::test]
    async fn repeated_purchase_upserts_keep_one_row_and_identity() {
        let store = InMemoryEntitlementStore::new();

        let first = store.upsert_purchase(sample_purchase("cs_1")).await.unwrap();

        let mut second = sample_purchase("cs_1");
        second.buyer_phone = Some("+15550100".to_string());
        let updated = store.upsert_purchase(second).await.unwrap();

        assert_eq!(store.purchase_count().await, 1);
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.created_at, first.created_at);
        assert_eq!(updated.buyer_phone.as_deref(), Some("+15550100"));
    }

    #[tokio::test]
    async fn distinct_sessions_get_distinct_rows() {
        let store = InMemoryEntitlementStore::new();
        store.upsert_purchase(sample_purchase("cs_1")).await.unwrap();
        store.upsert_purchase(sample_purchase("cs_2")).await.unwrap();
        assert_eq!(store.purchase_count().await, 2);
    }

    #[tokio::test]
    async fn download_upsert_is_idempotent() {
        let store = InMemoryEntitlementStore::new();
        let template_id = Uuid::new_v4();
        let new = NewDownload {
            stripe_session_id: "cs_1".to_string(),
            template_id,
            file_url: "/files/nda.docx".to_string(),
        };

        let first = store.upsert_download(new.clone()).await.unwrap();
        let second = store.upsert_download(new).await.unwrap();

        assert_eq!(store.download_count().await, 1);
        assert_eq!(first.id, second.id);
        assert_eq!(first.issued_at, second.issued_at);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = InMemoryEntitlementStore::new();
        store.upsert_purchase(sample_purchase("cs_1")).await.unwrap();

        let mut refunded = sample_purchase("cs_2");
        refunded.status = PurchaseStatus::Refunded;
        store.upsert_purchase(refunded).await.unwrap();

        let (completed, total) = store
            .list_purchases(1, 20, Some(PurchaseStatus::Completed))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(completed.len(), 1);
        assert_eq!(
            completed[0].purchase.stripe_session_id,
            "cs_1".to_string()
        );
    }
}
