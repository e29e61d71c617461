use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Warehouses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Warehouses::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Warehouses::Code).string().not_null())
                    .col(ColumnDef::new(Warehouses::Name).string().not_null())
                    .col(
                        ColumnDef::new(Warehouses::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Warehouses::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Warehouses::ExternalLocationRef)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Warehouses::InventorySourceType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Warehouses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Warehouses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_warehouses_code")
                    .table(Warehouses::Table)
                    .col(Warehouses::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Locations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Locations::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Locations::WarehouseId).uuid().not_null())
                    .col(ColumnDef::new(Locations::Code).string().not_null())
                    .col(ColumnDef::new(Locations::LocationType).string().not_null())
                    .col(
                        ColumnDef::new(Locations::IsPickable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Locations::ZoneSequence)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Locations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_locations_warehouse_code")
                    .table(Locations::Table)
                    .col(Locations::WarehouseId)
                    .col(Locations::Code)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Locations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Warehouses::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Warehouses {
    Table,
    Id,
    Code,
    Name,
    IsDefault,
    IsActive,
    ExternalLocationRef,
    InventorySourceType,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Locations {
    Table,
    Id,
    WarehouseId,
    Code,
    LocationType,
    IsPickable,
    ZoneSequence,
    CreatedAt,
}
