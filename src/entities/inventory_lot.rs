use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cost lot created at receipt. Provisional until the inbound shipment
/// that sourced it finalizes landed costs.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_lots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub variant_id: Uuid,
    pub location_id: Option<Uuid>,
    pub receiving_line_id: Option<Uuid>,
    pub po_line_id: Option<Uuid>,
    pub qty: i64,
    pub unit_cost_cents: i64,
    pub landed_unit_cost_cents: Option<i64>,
    pub is_provisional: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
