use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::location::LocationType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum SourcePriority {
    #[sea_orm(string_value = "fifo")]
    Fifo,
    #[sea_orm(string_value = "smallest_first")]
    SmallestFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ReplenMethod {
    #[sea_orm(string_value = "case_break")]
    CaseBreak,
    #[sea_orm(string_value = "full_case")]
    FullCase,
    #[sea_orm(string_value = "pallet_drop")]
    PalletDrop,
}

/// Fires when summed pick-face on-hand of `pick_variant` drops to
/// `min_qty`. `pick_variant` and `source_variant` must belong to
/// `product_id`; priority 1 is highest.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "replen_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub pick_variant_id: Uuid,
    pub source_variant_id: Uuid,
    pub pick_location_type: LocationType,
    pub source_location_type: LocationType,
    pub source_priority: SourcePriority,
    pub min_qty: i64,
    pub max_qty: Option<i64>,
    pub replen_method: ReplenMethod,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::replen_task::Entity")]
    Tasks,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::replen_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
