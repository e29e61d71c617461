use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum PickTaskStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "short")]
    Short,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// A single pick instruction. For combined groups `order_id` references
/// the group parent; `sequence` is the walk order within the wave.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pick_tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub wave_id: Uuid,
    pub order_id: Uuid,
    pub order_line_id: Uuid,
    pub variant_id: Uuid,
    pub location_id: Uuid,
    pub qty: i64,
    pub picked_qty: i64,
    pub sequence: i32,
    pub assignee: Option<Uuid>,
    pub status: PickTaskStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pick_wave::Entity",
        from = "Column::WaveId",
        to = "super::pick_wave::Column::Id"
    )]
    Wave,
}

impl Related<super::pick_wave::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wave.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
