use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::Priority;

/// Order lifecycle. `Ready` covers newly ingested orders;
/// `Allocated`..`Shipped` follow fulfillment; `Exception` flags short
/// picks and other operator-attention states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SalesOrderStatus {
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "allocated")]
    Allocated,
    #[sea_orm(string_value = "picking")]
    Picking,
    #[sea_orm(string_value = "picked")]
    Picked,
    #[sea_orm(string_value = "packed")]
    Packed,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "exception")]
    Exception,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl SalesOrderStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Shipped | Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum CombinedRole {
    #[sea_orm(string_value = "parent")]
    Parent,
    #[sea_orm(string_value = "child")]
    Child,
}

/// `address_hash` is the SHA-256 of the normalized destination address and
/// drives combinable-order grouping.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_number: String,
    pub channel_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub ship_street: String,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_postal: String,
    pub ship_country: String,
    pub address_hash: String,
    pub status: SalesOrderStatus,
    pub priority: Priority,
    pub on_hold: bool,
    pub combined_group_id: Option<Uuid>,
    pub combined_role: Option<CombinedRole>,
    pub released_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales_order_line::Entity")]
    Lines,
}

impl Related<super::sales_order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
