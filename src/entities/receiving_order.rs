use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ReceivingSourceType {
    #[sea_orm(string_value = "blind")]
    Blind,
    #[sea_orm(string_value = "po")]
    Po,
    #[sea_orm(string_value = "asn")]
    Asn,
    #[sea_orm(string_value = "initial_load")]
    InitialLoad,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReceivingStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "receiving")]
    Receiving,
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Closing commits ledger receipts and the PO roll-up in one transaction
/// and cannot be undone; re-closing is a no-op.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receiving_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub receipt_number: String,
    pub source_type: ReceivingSourceType,
    pub vendor_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
    pub status: ReceivingStatus,
    pub expected_lines: i32,
    pub expected_units: i64,
    pub received_lines: i32,
    pub received_units: i64,
    pub closed_at: Option<DateTimeUtc>,
    pub closed_by: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::receiving_line::Entity")]
    Lines,
}

impl Related<super::receiving_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
