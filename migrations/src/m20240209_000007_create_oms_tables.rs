use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SalesOrders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SalesOrders::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(SalesOrders::OrderNumber).string().not_null())
                    .col(ColumnDef::new(SalesOrders::ChannelId).uuid().null())
                    .col(ColumnDef::new(SalesOrders::WarehouseId).uuid().null())
                    .col(ColumnDef::new(SalesOrders::CustomerName).string().not_null())
                    .col(ColumnDef::new(SalesOrders::CustomerEmail).string().null())
                    .col(ColumnDef::new(SalesOrders::ShipStreet).string().not_null())
                    .col(ColumnDef::new(SalesOrders::ShipCity).string().not_null())
                    .col(ColumnDef::new(SalesOrders::ShipState).string().not_null())
                    .col(ColumnDef::new(SalesOrders::ShipPostal).string().not_null())
                    .col(ColumnDef::new(SalesOrders::ShipCountry).string().not_null())
                    .col(ColumnDef::new(SalesOrders::AddressHash).string().not_null())
                    .col(ColumnDef::new(SalesOrders::Status).string().not_null())
                    .col(
                        ColumnDef::new(SalesOrders::Priority)
                            .string()
                            .not_null()
                            .default("normal"),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::OnHold)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SalesOrders::CombinedGroupId).uuid().null())
                    .col(ColumnDef::new(SalesOrders::CombinedRole).string().null())
                    .col(
                        ColumnDef::new(SalesOrders::ReleasedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_orders_number")
                    .table(SalesOrders::Table)
                    .col(SalesOrders::OrderNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_orders_address_hash")
                    .table(SalesOrders::Table)
                    .col(SalesOrders::AddressHash)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_orders_combined_group")
                    .table(SalesOrders::Table)
                    .col(SalesOrders::CombinedGroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SalesOrderLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalesOrderLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SalesOrderLines::OrderId).uuid().not_null())
                    .col(ColumnDef::new(SalesOrderLines::VariantId).uuid().not_null())
                    .col(
                        ColumnDef::new(SalesOrderLines::OrderedQty)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrderLines::PickedQty)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SalesOrderLines::Status).string().not_null())
                    .col(
                        ColumnDef::new(SalesOrderLines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrderLines::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_order_lines_order")
                    .table(SalesOrderLines::Table)
                    .col(SalesOrderLines::OrderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SalesOrderLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SalesOrders::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SalesOrders {
    Table,
    Id,
    OrderNumber,
    ChannelId,
    WarehouseId,
    CustomerName,
    CustomerEmail,
    ShipStreet,
    ShipCity,
    ShipState,
    ShipPostal,
    ShipCountry,
    AddressHash,
    Status,
    Priority,
    OnHold,
    CombinedGroupId,
    CombinedRole,
    ReleasedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SalesOrderLines {
    Table,
    Id,
    OrderId,
    VariantId,
    OrderedQty,
    PickedQty,
    Status,
    CreatedAt,
    UpdatedAt,
}
