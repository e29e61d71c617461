use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One cost split onto one shipment line. The whole set for a shipment is
/// deleted and recomputed on every allocation run.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipment_cost_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub shipment_cost_id: Uuid,
    pub shipment_line_id: Uuid,
    pub allocated_cents: i64,
    pub basis_value: i64,
    pub basis_total: i64,
    pub share_bps: i32,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shipment_cost::Entity",
        from = "Column::ShipmentCostId",
        to = "super::shipment_cost::Column::Id"
    )]
    ShipmentCost,
    #[sea_orm(
        belongs_to = "super::inbound_shipment_line::Entity",
        from = "Column::ShipmentLineId",
        to = "super::inbound_shipment_line::Column::Id"
    )]
    ShipmentLine,
}

impl Related<super::shipment_cost::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentCost.def()
    }
}

impl Related<super::inbound_shipment_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
