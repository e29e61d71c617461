use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReplenRules::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ReplenRules::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(ReplenRules::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ReplenRules::WarehouseId).uuid().not_null())
                    .col(ColumnDef::new(ReplenRules::PickVariantId).uuid().not_null())
                    .col(ColumnDef::new(ReplenRules::SourceVariantId).uuid().not_null())
                    .col(
                        ColumnDef::new(ReplenRules::PickLocationType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplenRules::SourceLocationType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplenRules::SourcePriority)
                            .string()
                            .not_null()
                            .default("fifo"),
                    )
                    .col(ColumnDef::new(ReplenRules::MinQty).big_integer().not_null())
                    .col(ColumnDef::new(ReplenRules::MaxQty).big_integer().null())
                    .col(ColumnDef::new(ReplenRules::ReplenMethod).string().not_null())
                    .col(
                        ColumnDef::new(ReplenRules::Priority)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ReplenRules::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ReplenRules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplenRules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_replen_rules_product")
                    .table(ReplenRules::Table)
                    .col(ReplenRules::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReplenTasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ReplenTasks::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(ReplenTasks::RuleId).uuid().null())
                    .col(ColumnDef::new(ReplenTasks::FromLocationId).uuid().not_null())
                    .col(ColumnDef::new(ReplenTasks::ToLocationId).uuid().not_null())
                    .col(ColumnDef::new(ReplenTasks::VariantId).uuid().not_null())
                    .col(
                        ColumnDef::new(ReplenTasks::PickVariantId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplenTasks::QtySourceUnits)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplenTasks::QtyTargetUnits)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplenTasks::QtyCompleted)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ReplenTasks::Status).string().not_null())
                    .col(ColumnDef::new(ReplenTasks::TriggeredBy).string().not_null())
                    .col(
                        ColumnDef::new(ReplenTasks::Priority)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(ReplenTasks::AssignedTo).uuid().null())
                    .col(
                        ColumnDef::new(ReplenTasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplenTasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_replen_tasks_dedup")
                    .table(ReplenTasks::Table)
                    .col(ReplenTasks::PickVariantId)
                    .col(ReplenTasks::ToLocationId)
                    .col(ReplenTasks::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReplenTasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReplenRules::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ReplenRules {
    Table,
    Id,
    ProductId,
    WarehouseId,
    PickVariantId,
    SourceVariantId,
    PickLocationType,
    SourceLocationType,
    SourcePriority,
    MinQty,
    MaxQty,
    ReplenMethod,
    Priority,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ReplenTasks {
    Table,
    Id,
    RuleId,
    FromLocationId,
    ToLocationId,
    VariantId,
    PickVariantId,
    QtySourceUnits,
    QtyTargetUnits,
    QtyCompleted,
    Status,
    TriggeredBy,
    Priority,
    AssignedTo,
    CreatedAt,
    UpdatedAt,
}
