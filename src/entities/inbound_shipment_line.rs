use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Derived totals are recomputed whenever the line is written:
/// `total_weight_grams = qty * unit_weight`, `total_volume_cm3` from unit
/// dimensions, `chargeable_weight_grams = qty * max(unit_weight, unit_volume_cm3 / 5)`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inbound_shipment_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub po_line_id: Option<Uuid>,
    pub variant_id: Uuid,
    pub qty_shipped: i64,
    pub unit_weight_grams: i64,
    pub unit_length_mm: i32,
    pub unit_width_mm: i32,
    pub unit_height_mm: i32,
    pub total_weight_grams: i64,
    pub total_volume_cm3: i64,
    pub gross_volume_cm3: Option<i64>,
    pub chargeable_weight_grams: i64,
    pub allocated_cost_cents: i64,
    pub landed_unit_cost_cents: Option<i64>,
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
    #[sea_orm(
        belongs_to = "super::purchase_order_line::Entity",
        from = "Column::PoLineId",
        to = "super::purchase_order_line::Column::Id"
    )]
    PoLine,
}

impl Related<super::inbound_shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipment.def()
    }
}

impl Related<super::purchase_order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PoLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
