use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Immutable per-line landed-cost record written at shipment finalization.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "landed_cost_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub shipment_line_id: Uuid,
    pub po_unit_cost_cents: i64,
    pub freight_cents: i64,
    pub duty_cents: i64,
    pub insurance_cents: i64,
    pub other_cents: i64,
    pub total_landed_cents: i64,
    pub landed_unit_cost_cents: i64,
    pub qty: i64,
    pub finalized_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inbound_shipment_line::Entity",
        from = "Column::ShipmentLineId",
        to = "super::inbound_shipment_line::Column::Id"
    )]
    ShipmentLine,
}

impl Related<super::inbound_shipment_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
