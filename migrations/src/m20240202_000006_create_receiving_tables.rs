use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReceivingOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReceivingOrders::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReceivingOrders::ReceiptNumber)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReceivingOrders::SourceType).string().not_null())
                    .col(ColumnDef::new(ReceivingOrders::VendorId).uuid().null())
                    .col(ColumnDef::new(ReceivingOrders::WarehouseId).uuid().null())
                    .col(ColumnDef::new(ReceivingOrders::PurchaseOrderId).uuid().null())
                    .col(ColumnDef::new(ReceivingOrders::Status).string().not_null())
                    .col(
                        ColumnDef::new(ReceivingOrders::ExpectedLines)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReceivingOrders::ExpectedUnits)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReceivingOrders::ReceivedLines)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReceivingOrders::ReceivedUnits)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReceivingOrders::ClosedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(ReceivingOrders::ClosedBy).uuid().null())
                    .col(
                        ColumnDef::new(ReceivingOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReceivingOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_receiving_orders_receipt_number")
                    .table(ReceivingOrders::Table)
                    .col(ReceivingOrders::ReceiptNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_receiving_orders_po")
                    .table(ReceivingOrders::Table)
                    .col(ReceivingOrders::PurchaseOrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReceivingLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReceivingLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReceivingLines::ReceivingOrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReceivingLines::PoLineId).uuid().null())
                    .col(ColumnDef::new(ReceivingLines::VariantId).uuid().null())
                    .col(ColumnDef::new(ReceivingLines::Sku).string().not_null())
                    .col(ColumnDef::new(ReceivingLines::Name).string().null())
                    .col(
                        ColumnDef::new(ReceivingLines::ExpectedQty)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReceivingLines::ReceivedQty)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReceivingLines::DamagedQty)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReceivingLines::UnitCostCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReceivingLines::PutawayLocationId)
                            .uuid()
                            .null(),
                    )
                    .col(ColumnDef::new(ReceivingLines::Status).string().not_null())
                    .col(ColumnDef::new(ReceivingLines::Notes).text().null())
                    .col(
                        ColumnDef::new(ReceivingLines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReceivingLines::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_receiving_lines_order")
                    .table(ReceivingLines::Table)
                    .col(ReceivingLines::ReceivingOrderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReceivingLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReceivingOrders::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ReceivingOrders {
    Table,
    Id,
    ReceiptNumber,
    SourceType,
    VendorId,
    WarehouseId,
    PurchaseOrderId,
    Status,
    ExpectedLines,
    ExpectedUnits,
    ReceivedLines,
    ReceivedUnits,
    ClosedAt,
    ClosedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ReceivingLines {
    Table,
    Id,
    ReceivingOrderId,
    PoLineId,
    VariantId,
    Sku,
    Name,
    ExpectedQty,
    ReceivedQty,
    DamagedQty,
    UnitCostCents,
    PutawayLocationId,
    Status,
    Notes,
    CreatedAt,
    UpdatedAt,
}
