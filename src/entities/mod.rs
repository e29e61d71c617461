pub mod approval_tier;
pub mod channel;
pub mod channel_feed;
pub mod inbound_shipment;
pub mod inbound_shipment_line;
pub mod inventory_balance;
pub mod inventory_lot;
pub mod inventory_transaction;
pub mod landed_cost_snapshot;
pub mod location;
pub mod pick_task;
pub mod pick_wave;
pub mod po_revision;
pub mod po_status_event;
pub mod product;
pub mod product_variant;
pub mod purchase_order;
pub mod purchase_order_line;
pub mod receiving_line;
pub mod receiving_order;
pub mod replen_rule;
pub mod replen_task;
pub mod role;
pub mod role_permission;
pub mod sales_order;
pub mod sales_order_line;
pub mod sequence_counter;
pub mod shipment_cost;
pub mod shipment_cost_allocation;
pub mod user;
pub mod user_role;
pub mod vendor;
pub mod vendor_product;
pub mod warehouse;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Document priority shared by purchase orders and sales orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "rush")]
    Rush,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}
