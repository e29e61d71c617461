use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ReplenTaskStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ReplenTrigger {
    #[sea_orm(string_value = "min_max")]
    MinMax,
    #[sea_orm(string_value = "manual")]
    Manual,
    #[sea_orm(string_value = "stockout")]
    Stockout,
    #[sea_orm(string_value = "wave")]
    Wave,
}

/// `variant_id` is the moved (source) variant; `pick_variant_id` records
/// which pick face the move feeds so duplicate tasks can be suppressed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "replen_tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub rule_id: Option<Uuid>,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub variant_id: Uuid,
    pub pick_variant_id: Uuid,
    pub qty_source_units: i64,
    pub qty_target_units: i64,
    pub qty_completed: i64,
    pub status: ReplenTaskStatus,
    pub triggered_by: ReplenTrigger,
    pub priority: i32,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::replen_rule::Entity",
        from = "Column::RuleId",
        to = "super::replen_rule::Column::Id"
    )]
    Rule,
}

impl Related<super::replen_rule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
