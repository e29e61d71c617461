use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dedicated row per document-number series (po, receipt, shipment, wave).
/// Incremented inside the caller's transaction so numbers serialize.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sequence_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
