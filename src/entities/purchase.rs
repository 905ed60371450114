use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;
use uuid::Uuid;

/// Purchase entity: the durable record that a checkout session was paid.
///
/// `stripe_session_id` is unique; the entitlement recorder upserts on it, so
/// repeated verification of the same session never produces a second row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Purchased template; None for consultation purchases, and purchases
    /// survive the template being deleted afterwards
    pub template_id: Option<Uuid>,

    /// Buyer name as captured at checkout ("Guest" when not collected)
    pub buyer_name: String,

    /// Buyer email
    pub buyer_email: String,

    /// Buyer phone, when collected
    pub buyer_phone: Option<String>,

    /// Amount actually paid, in major currency units
    pub amount: Decimal,

    /// Currency reported by the provider
    pub currency: String,

    /// Contract vs. consultation purchase
    pub kind: PurchaseKind,

    /// Purchase status
    pub status: PurchaseStatus,

    /// Originating checkout session identifier (idempotency key)
    #[sea_orm(unique)]
    pub stripe_session_id: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contract_template::Entity",
        from = "Column::TemplateId",
        to = "super::contract_template::Column::Id"
    )]
    Template,
}

impl Related<super::contract_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// What the buyer paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, Display, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PurchaseKind {
    #[sea_orm(string_value = "contract")]
    Contract,
    #[sea_orm(string_value = "consultation")]
    Consultation,
}

/// Purchase status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, Display, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PurchaseStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}
