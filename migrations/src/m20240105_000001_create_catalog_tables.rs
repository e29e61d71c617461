use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Products::BaseSku).string().not_null())
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::Category).string().null())
                    .col(ColumnDef::new(Products::Brand).string().null())
                    .col(ColumnDef::new(Products::ExternalProductRef).string().null())
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_base_sku")
                    .table(Products::Table)
                    .col(Products::BaseSku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductVariants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductVariants::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductVariants::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ProductVariants::Sku).string().not_null())
                    .col(ColumnDef::new(ProductVariants::Name).string().not_null())
                    .col(
                        ColumnDef::new(ProductVariants::UnitsPerVariant)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductVariants::HierarchyLevel)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductVariants::Barcode).string().null())
                    .col(
                        ColumnDef::new(ProductVariants::ExternalVariantRef)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductVariants::ExternalInventoryItemRef)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductVariants::WeightGrams)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(ProductVariants::LengthMm).integer().null())
                    .col(ColumnDef::new(ProductVariants::WidthMm).integer().null())
                    .col(ColumnDef::new(ProductVariants::HeightMm).integer().null())
                    .col(
                        ColumnDef::new(ProductVariants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductVariants::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_variants_sku")
                    .table(ProductVariants::Table)
                    .col(ProductVariants::Sku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Nullable barcode column; nulls never collide under a unique index.
        manager
            .create_index(
                Index::create()
                    .name("idx_product_variants_barcode")
                    .table(ProductVariants::Table)
                    .col(ProductVariants::Barcode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_variants_product_id")
                    .table(ProductVariants::Table)
                    .col(ProductVariants::ProductId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
    BaseSku,
    Name,
    Category,
    Brand,
    ExternalProductRef,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ProductVariants {
    Table,
    Id,
    ProductId,
    Sku,
    Name,
    UnitsPerVariant,
    HierarchyLevel,
    Barcode,
    ExternalVariantRef,
    ExternalInventoryItemRef,
    WeightGrams,
    LengthMm,
    WidthMm,
    HeightMm,
    CreatedAt,
    UpdatedAt,
}
