use crate::{
    entities::{
        consultation_request::{self, ConsultationStatus},
        ConsultationRequest,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Consultation intake and the staff workflow around it
#[derive(Clone)]
pub struct ConsultationService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ConsultationService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Accept a consultation request from the public intake form.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn submit(
        &self,
        input: SubmitConsultationInput,
    ) -> Result<consultation_request::Model, ServiceError> {
        input.validate()?;

        let request_id = Uuid::new_v4();
        let request = consultation_request::ActiveModel {
            id: Set(request_id),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            topic: Set(input.topic),
            message: Set(input.message),
            ..Default::default()
        };

        let request = request.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ConsultationRequested(request_id))
            .await;

        info!("Consultation request received: {}", request_id);
        Ok(request)
    }

    /// Staff listing, newest first, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
        status: Option<ConsultationStatus>,
    ) -> Result<(Vec<consultation_request::Model>, u64), ServiceError> {
        let mut query = ConsultationRequest::find();
        if let Some(status) = status {
            query = query.filter(consultation_request::Column::Status.eq(status));
        }

        let total = query.clone().count(&*self.db).await?;

        let page = page.max(1);
        let items = query
            .order_by_desc(consultation_request::Column::CreatedAt)
            .paginate(&*self.db, per_page.clamp(1, 100))
            .fetch_page(page - 1)
            .await?;

        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, request_id: Uuid) -> Result<consultation_request::Model, ServiceError> {
        ConsultationRequest::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Consultation request {} not found", request_id))
            })
    }

    /// Move a request through the staff workflow.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        request_id: Uuid,
        new_status: ConsultationStatus,
    ) -> Result<consultation_request::Model, ServiceError> {
        let request = self.get(request_id).await?;
        let old_status = request.status;

        let mut active: consultation_request::ActiveModel = request.into();
        active.status = Set(new_status);
        let request = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ConsultationStatusChanged {
                request_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await;

        Ok(request)
    }
}

/// Public intake form payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Ada Lovelace",
    "email": "ada@example.test",
    "phone": "+1 555 0100",
    "topic": "Series A financing documents",
    "message": "We need help reviewing our term sheet before Friday."
}))]
pub struct SubmitConsultationInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub topic: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}
