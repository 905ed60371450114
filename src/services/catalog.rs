use crate::{
    entities::{contract_template, ContractTemplate},
    errors::ServiceError,
    events::{Event, EventSender},
};
use rust_decimal::Decimal;
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

/// Catalog service: the storefront's read path plus staff template management
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Active templates in storefront order. Ties on display_order break by
    /// id so the ordering is stable across reloads.
    #[instrument(skip(self))]
    pub async fn list_active_templates(
        &self,
    ) -> Result<Vec<contract_template::Model>, ServiceError> {
        Ok(ContractTemplate::find()
            .filter(contract_template::Column::IsActive.eq(true))
            .order_by_asc(contract_template::Column::DisplayOrder)
            .order_by_asc(contract_template::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// All templates for the staff dashboard, newest first.
    #[instrument(skip(self))]
    pub async fn list_templates(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<contract_template::Model>, u64), ServiceError> {
        let query = ContractTemplate::find();
        let total = query.clone().count(&*self.db).await?;

        let page = page.max(1);
        let items = query
            .order_by_desc(contract_template::Column::CreatedAt)
            .paginate(&*self.db, per_page.clamp(1, 100))
            .fetch_page(page - 1)
            .await?;

        Ok((items, total))
    }

    /// Look up a template without treating absence as an error. The
    /// verification path uses this: a template deleted after purchase is a
    /// degraded outcome, not a failure.
    pub async fn find_template(
        &self,
        template_id: Uuid,
    ) -> Result<Option<contract_template::Model>, ServiceError> {
        Ok(ContractTemplate::find_by_id(template_id)
            .one(&*self.db)
            .await?)
    }

    /// Look up a template, failing with NotFound when absent.
    #[instrument(skip(self))]
    pub async fn get_template(
        &self,
        template_id: Uuid,
    ) -> Result<contract_template::Model, ServiceError> {
        self.find_template(template_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Template {} not found", template_id))
        })
    }

    /// Create a new template
    #[instrument(skip(self))]
    pub async fn create_template(
        &self,
        input: CreateTemplateInput,
    ) -> Result<contract_template::Model, ServiceError> {
        input.validate()?;

        let template_id = Uuid::new_v4();
        let template = contract_template::ActiveModel {
            id: Set(template_id),
            name: Set(input.name.clone()),
            description: Set(input.description.clone()),
            price: Set(input.price),
            currency: Set(input.currency.clone()),
            stripe_price_id: Set(input.stripe_price_id.clone()),
            file_url: Set(input.file_url.clone()),
            preview_url: Set(input.preview_url.clone()),
            is_active: Set(input.is_active),
            display_order: Set(input.display_order),
            ..Default::default()
        };

        let template = template.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::TemplateCreated(template_id))
            .await;

        info!("Created template: {}", template_id);
        Ok(template)
    }

    /// Update an existing template
    #[instrument(skip(self))]
    pub async fn update_template(
        &self,
        template_id: Uuid,
        input: UpdateTemplateInput,
    ) -> Result<contract_template::Model, ServiceError> {
        input.validate()?;

        let template = self.get_template(template_id).await?;
        let mut active: contract_template::ActiveModel = template.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency);
        }
        if let Some(stripe_price_id) = input.stripe_price_id {
            active.stripe_price_id = Set(Some(stripe_price_id));
        }
        if let Some(file_url) = input.file_url {
            active.file_url = Set(Some(file_url));
        }
        if let Some(preview_url) = input.preview_url {
            active.preview_url = Set(Some(preview_url));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(display_order) = input.display_order {
            active.display_order = Set(display_order);
        }

        let template = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::TemplateUpdated(template_id))
            .await;

        Ok(template)
    }
}

/// Staff input for creating a template
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTemplateInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(length(equal = 3))]
    pub currency: String,
    pub stripe_price_id: Option<String>,
    pub file_url: Option<String>,
    pub preview_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

fn default_true() -> bool {
    true
}

/// Staff input for a partial template update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTemplateInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub stripe_price_id: Option<String>,
    pub file_url: Option<String>,
    pub preview_url: Option<String>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}
