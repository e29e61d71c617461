use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ReceivingLineStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "complete")]
    Complete,
    #[sea_orm(string_value = "overage")]
    Overage,
}

impl ReceivingLineStatus {
    /// Status is a pure function of expected vs received quantities.
    pub fn derive(expected_qty: i64, received_qty: i64) -> Self {
        if received_qty == 0 {
            Self::Pending
        } else if expected_qty == 0 || received_qty > expected_qty {
            Self::Overage
        } else if received_qty < expected_qty {
            Self::Partial
        } else {
            Self::Complete
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receiving_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub receiving_order_id: Uuid,
    pub po_line_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub sku: String,
    pub name: Option<String>,
    pub expected_qty: i64,
    pub received_qty: i64,
    pub damaged_qty: i64,
    pub unit_cost_cents: Option<i64>,
    pub putaway_location_id: Option<Uuid>,
    pub status: ReceivingLineStatus,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::receiving_order::Entity",
        from = "Column::ReceivingOrderId",
        to = "super::receiving_order::Column::Id"
    )]
    ReceivingOrder,
}

impl Related<super::receiving_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReceivingOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::ReceivingLineStatus;

    #[test]
    fn status_derivation_covers_quantity_combinations() {
        assert_eq!(ReceivingLineStatus::derive(10, 0), ReceivingLineStatus::Pending);
        assert_eq!(ReceivingLineStatus::derive(10, 4), ReceivingLineStatus::Partial);
        assert_eq!(ReceivingLineStatus::derive(10, 10), ReceivingLineStatus::Complete);
        assert_eq!(ReceivingLineStatus::derive(10, 12), ReceivingLineStatus::Overage);
        // Blind receipts have no expectation; anything received is overage.
        assert_eq!(ReceivingLineStatus::derive(0, 3), ReceivingLineStatus::Overage);
        assert_eq!(ReceivingLineStatus::derive(0, 0), ReceivingLineStatus::Pending);
    }
}
