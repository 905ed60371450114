use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Download entity: records that a downloadable asset was issued for a paid
/// checkout session. Same idempotency key and at-most-one invariant as the
/// purchase record.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "downloads")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Originating checkout session identifier (idempotency key)
    #[sea_orm(unique)]
    pub stripe_session_id: String,

    /// Template the asset belongs to
    pub template_id: Uuid,

    /// Asset path issued to the buyer
    pub file_url: String,

    /// When the asset was first issued
    pub issued_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
