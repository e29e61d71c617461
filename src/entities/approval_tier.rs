use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Grand-total threshold band requiring human approval. An open upper
/// bound is modeled as `max_amount_cents = None`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "approval_tiers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub min_amount_cents: i64,
    pub max_amount_cents: Option<i64>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
