use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryBalances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryBalances::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryBalances::VariantId).uuid().not_null())
                    .col(ColumnDef::new(InventoryBalances::LocationId).uuid().not_null())
                    .col(ColumnDef::new(InventoryBalances::State).string().not_null())
                    .col(
                        ColumnDef::new(InventoryBalances::Quantity)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_balances_cell")
                    .table(InventoryBalances::Table)
                    .col(InventoryBalances::VariantId)
                    .col(InventoryBalances::LocationId)
                    .col(InventoryBalances::State)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_balances_location")
                    .table(InventoryBalances::Table)
                    .col(InventoryBalances::LocationId)
                    .to_owned(),
            )
            .await?;

        // Append-only ledger; no updated_at by construction.
        manager
            .create_table(
                Table::create()
                    .table(InventoryTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryTransactions::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::TransactionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::VariantId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::FromLocationId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ToLocationId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::SourceState)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::TargetState)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::VariantQtyDelta)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::BaseQtyDelta)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryTransactions::BatchId).uuid().null())
                    .col(ColumnDef::new(InventoryTransactions::OrderId).uuid().null())
                    .col(
                        ColumnDef::new(InventoryTransactions::OrderLineId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ReceivingOrderId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::CycleCountId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Reference)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(InventoryTransactions::Reason).string().null())
                    .col(ColumnDef::new(InventoryTransactions::UserId).uuid().null())
                    .col(ColumnDef::new(InventoryTransactions::Notes).text().null())
                    .col(
                        ColumnDef::new(InventoryTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_transactions_variant")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::VariantId)
                    .col(InventoryTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_transactions_batch")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::BatchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_transactions_order_line")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::OrderLineId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SequenceCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SequenceCounters::Name)
                            .string()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SequenceCounters::Value)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryLots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryLots::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryLots::VariantId).uuid().not_null())
                    .col(ColumnDef::new(InventoryLots::LocationId).uuid().null())
                    .col(ColumnDef::new(InventoryLots::ReceivingLineId).uuid().null())
                    .col(ColumnDef::new(InventoryLots::PoLineId).uuid().null())
                    .col(ColumnDef::new(InventoryLots::Qty).big_integer().not_null())
                    .col(
                        ColumnDef::new(InventoryLots::UnitCostCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryLots::LandedUnitCostCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryLots::IsProvisional)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(InventoryLots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryLots::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_lots_po_line")
                    .table(InventoryLots::Table)
                    .col(InventoryLots::PoLineId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryLots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SequenceCounters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryBalances::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum InventoryBalances {
    Table,
    Id,
    VariantId,
    LocationId,
    State,
    Quantity,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum InventoryTransactions {
    Table,
    Id,
    TransactionType,
    VariantId,
    FromLocationId,
    ToLocationId,
    SourceState,
    TargetState,
    VariantQtyDelta,
    BaseQtyDelta,
    BatchId,
    OrderId,
    OrderLineId,
    ReceivingOrderId,
    CycleCountId,
    Reference,
    Reason,
    UserId,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
enum SequenceCounters {
    Table,
    Name,
    Value,
}

#[derive(Iden)]
enum InventoryLots {
    Table,
    Id,
    VariantId,
    LocationId,
    ReceivingLineId,
    PoLineId,
    Qty,
    UnitCostCents,
    LandedUnitCostCents,
    IsProvisional,
    CreatedAt,
    UpdatedAt,
}
