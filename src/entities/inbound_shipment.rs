use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShipmentMode {
    #[sea_orm(string_value = "sea_fcl")]
    SeaFcl,
    #[sea_orm(string_value = "sea_lcl")]
    SeaLcl,
    #[sea_orm(string_value = "air")]
    Air,
    #[sea_orm(string_value = "ground")]
    Ground,
    #[sea_orm(string_value = "ltl")]
    Ltl,
    #[sea_orm(string_value = "ftl")]
    Ftl,
    #[sea_orm(string_value = "parcel")]
    Parcel,
    #[sea_orm(string_value = "courier")]
    Courier,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "booked")]
    Booked,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "at_port")]
    AtPort,
    #[sea_orm(string_value = "customs_clearance")]
    CustomsClearance,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "costing")]
    Costing,
    #[sea_orm(string_value = "closed")]
    Closed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum AllocationMethod {
    #[sea_orm(string_value = "by_volume")]
    ByVolume,
    #[sea_orm(string_value = "by_chargeable_weight")]
    ByChargeableWeight,
    #[sea_orm(string_value = "by_weight")]
    ByWeight,
    #[sea_orm(string_value = "by_value")]
    ByValue,
    #[sea_orm(string_value = "by_line_count")]
    ByLineCount,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inbound_shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub shipment_number: String,
    pub mode: ShipmentMode,
    pub carrier: Option<String>,
    pub forwarder: Option<String>,
    pub origin_port: Option<String>,
    pub destination_port: Option<String>,
    pub container_number: Option<String>,
    pub bol_number: Option<String>,
    pub tracking_number: Option<String>,
    pub etd: Option<Date>,
    pub eta: Option<Date>,
    pub allocation_method_default: Option<AllocationMethod>,
    pub total_weight_grams: i64,
    pub total_volume_cm3: i64,
    pub total_pieces: i64,
    pub total_cartons: i64,
    pub estimated_total_cost_cents: i64,
    pub actual_total_cost_cents: i64,
    pub status: ShipmentStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inbound_shipment_line::Entity")]
    Lines,
    #[sea_orm(has_many = "super::shipment_cost::Entity")]
    Costs,
}

impl Related<super::inbound_shipment_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::shipment_cost::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Costs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
