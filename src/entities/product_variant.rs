use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A unit-of-measure variant of a product. `units_per_variant` is the
/// multiplier into base units (pieces); level 1 always has multiplier 1.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub units_per_variant: i64,
    pub hierarchy_level: i32,
    pub barcode: Option<String>,
    pub external_variant_ref: Option<String>,
    pub external_inventory_item_ref: Option<String>,
    pub weight_grams: Option<i64>,
    pub length_mm: Option<i32>,
    pub width_mm: Option<i32>,
    pub height_mm: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::channel_feed::Entity")]
    ChannelFeeds,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::channel_feed::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChannelFeeds.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
