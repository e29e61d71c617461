use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PickWaves::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PickWaves::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(PickWaves::WaveNumber).string().not_null())
                    .col(ColumnDef::new(PickWaves::WarehouseId).uuid().not_null())
                    .col(ColumnDef::new(PickWaves::Status).string().not_null())
                    .col(
                        ColumnDef::new(PickWaves::Mode)
                            .string()
                            .not_null()
                            .default("single"),
                    )
                    .col(ColumnDef::new(PickWaves::CreatedBy).uuid().null())
                    .col(
                        ColumnDef::new(PickWaves::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PickWaves::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pick_waves_number")
                    .table(PickWaves::Table)
                    .col(PickWaves::WaveNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PickTasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PickTasks::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(PickTasks::WaveId).uuid().not_null())
                    .col(ColumnDef::new(PickTasks::OrderId).uuid().not_null())
                    .col(ColumnDef::new(PickTasks::OrderLineId).uuid().not_null())
                    .col(ColumnDef::new(PickTasks::VariantId).uuid().not_null())
                    .col(ColumnDef::new(PickTasks::LocationId).uuid().not_null())
                    .col(ColumnDef::new(PickTasks::Qty).big_integer().not_null())
                    .col(
                        ColumnDef::new(PickTasks::PickedQty)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PickTasks::Sequence).integer().not_null())
                    .col(ColumnDef::new(PickTasks::Assignee).uuid().null())
                    .col(ColumnDef::new(PickTasks::Status).string().not_null())
                    .col(
                        ColumnDef::new(PickTasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PickTasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pick_tasks_wave_sequence")
                    .table(PickTasks::Table)
                    .col(PickTasks::WaveId)
                    .col(PickTasks::Sequence)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PickTasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PickWaves::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PickWaves {
    Table,
    Id,
    WaveNumber,
    WarehouseId,
    Status,
    Mode,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum PickTasks {
    Table,
    Id,
    WaveId,
    OrderId,
    OrderLineId,
    VariantId,
    LocationId,
    Qty,
    PickedQty,
    Sequence,
    Assignee,
    Status,
    CreatedAt,
    UpdatedAt,
}
