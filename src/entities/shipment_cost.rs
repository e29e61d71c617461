use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::inbound_shipment::AllocationMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum CostType {
    #[sea_orm(string_value = "freight")]
    Freight,
    #[sea_orm(string_value = "duty")]
    Duty,
    #[sea_orm(string_value = "insurance")]
    Insurance,
    #[sea_orm(string_value = "drayage")]
    Drayage,
    #[sea_orm(string_value = "port_handling")]
    PortHandling,
    #[sea_orm(string_value = "brokerage")]
    Brokerage,
    #[sea_orm(string_value = "inspection")]
    Inspection,
    #[sea_orm(string_value = "other")]
    Other,
}

/// The effective amount for allocation is `actual_cents` when present,
/// else `estimated_cents`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipment_costs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub cost_type: CostType,
    pub estimated_cents: i64,
    pub actual_cents: Option<i64>,
    pub allocation_method: Option<AllocationMethod>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inbound_shipment::Entity",
        from = "Column::ShipmentId",
        to = "super::inbound_shipment::Column::Id"
    )]
    Shipment,
}

impl Related<super::inbound_shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
