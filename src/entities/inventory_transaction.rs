use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::inventory_balance::StockState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[sea_orm(string_value = "receipt")]
    Receipt,
    #[sea_orm(string_value = "pick")]
    Pick,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    #[sea_orm(string_value = "transfer")]
    Transfer,
    #[sea_orm(string_value = "ship")]
    Ship,
    #[sea_orm(string_value = "return")]
    Return,
    #[sea_orm(string_value = "replenish")]
    Replenish,
    #[sea_orm(string_value = "reserve")]
    Reserve,
    #[sea_orm(string_value = "unreserve")]
    Unreserve,
    #[sea_orm(string_value = "csv_upload")]
    CsvUpload,
}

/// Append-only ledger row. `base_qty_delta` is always
/// `variant_qty_delta * units_per_variant`; `batch_id` groups the legs of
/// a transfer. Rows are never updated or deleted after insertion.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_type: TransactionType,
    pub variant_id: Uuid,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub source_state: StockState,
    pub target_state: StockState,
    pub variant_qty_delta: i64,
    pub base_qty_delta: i64,
    pub batch_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub order_line_id: Option<Uuid>,
    pub receiving_order_id: Option<Uuid>,
    pub cycle_count_id: Option<Uuid>,
    pub reference: Option<String>,
    pub reason: Option<String>,
    pub user_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_variant::Entity",
        from = "Column::VariantId",
        to = "super::product_variant::Column::Id"
    )]
    ProductVariant,
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVariant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
