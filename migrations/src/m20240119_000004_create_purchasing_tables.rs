use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vendors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vendors::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Vendors::Code).string().not_null())
                    .col(ColumnDef::new(Vendors::Name).string().not_null())
                    .col(ColumnDef::new(Vendors::ContactEmail).string().null())
                    .col(ColumnDef::new(Vendors::ContactPhone).string().null())
                    .col(
                        ColumnDef::new(Vendors::Currency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(ColumnDef::new(Vendors::PaymentTerms).string().null())
                    .col(
                        ColumnDef::new(Vendors::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Vendors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vendors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vendors_code")
                    .table(Vendors::Table)
                    .col(Vendors::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VendorProducts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VendorProducts::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(VendorProducts::VendorId).uuid().not_null())
                    .col(ColumnDef::new(VendorProducts::VariantId).uuid().not_null())
                    .col(ColumnDef::new(VendorProducts::VendorSku).string().null())
                    .col(
                        ColumnDef::new(VendorProducts::UnitCostCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorProducts::IsPreferred)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(VendorProducts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vendor_products_vendor_variant")
                    .table(VendorProducts::Table)
                    .col(VendorProducts::VendorId)
                    .col(VendorProducts::VariantId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApprovalTiers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApprovalTiers::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApprovalTiers::Name).string().not_null())
                    .col(
                        ColumnDef::new(ApprovalTiers::MinAmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApprovalTiers::MaxAmountCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ApprovalTiers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrders::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::PoNumber).string().not_null())
                    .col(ColumnDef::new(PurchaseOrders::VendorId).uuid().not_null())
                    .col(ColumnDef::new(PurchaseOrders::WarehouseId).uuid().null())
                    .col(ColumnDef::new(PurchaseOrders::Status).string().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrders::Priority)
                            .string()
                            .not_null()
                            .default("normal"),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::Currency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::ExpectedDeliveryDate)
                            .date()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::ConfirmedDeliveryDate)
                            .date()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::ActualDeliveryDate)
                            .date()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::SubtotalCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::DiscountCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::TaxCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::ShippingCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::GrandTotalCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PurchaseOrders::ApprovalTierId).uuid().null())
                    .col(
                        ColumnDef::new(PurchaseOrders::RevisionNumber)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PurchaseOrders::Notes).text().null())
                    .col(
                        ColumnDef::new(PurchaseOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_orders_po_number")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::PoNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_orders_vendor_status")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::VendorId)
                    .col(PurchaseOrders::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrderLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrderLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::PurchaseOrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::LineNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrderLines::ProductId).uuid().not_null())
                    .col(ColumnDef::new(PurchaseOrderLines::VariantId).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrderLines::VendorProductId)
                            .uuid()
                            .null(),
                    )
                    .col(ColumnDef::new(PurchaseOrderLines::Sku).string().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrderLines::UnitCostCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::OrderQty)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::ReceivedQty)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::CancelledQty)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::DamagedQty)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::DiscountPct)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::TaxPct)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::LineTotalCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PurchaseOrderLines::Status).string().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrderLines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderLines::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_order_lines_po")
                    .table(PurchaseOrderLines::Table)
                    .col(PurchaseOrderLines::PurchaseOrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_order_lines_variant")
                    .table(PurchaseOrderLines::Table)
                    .col(PurchaseOrderLines::VariantId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PoRevisions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PoRevisions::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(PoRevisions::PurchaseOrderId).uuid().not_null())
                    .col(
                        ColumnDef::new(PoRevisions::RevisionNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PoRevisions::Changes).json().not_null())
                    .col(ColumnDef::new(PoRevisions::CreatedBy).uuid().null())
                    .col(
                        ColumnDef::new(PoRevisions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PoStatusEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PoStatusEvents::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PoStatusEvents::PurchaseOrderId).uuid().not_null())
                    .col(ColumnDef::new(PoStatusEvents::FromStatus).string().not_null())
                    .col(ColumnDef::new(PoStatusEvents::ToStatus).string().not_null())
                    .col(ColumnDef::new(PoStatusEvents::UserId).uuid().null())
                    .col(ColumnDef::new(PoStatusEvents::Note).text().null())
                    .col(
                        ColumnDef::new(PoStatusEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PoStatusEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PoRevisions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrderLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApprovalTiers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VendorProducts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vendors::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vendors {
    Table,
    Id,
    Code,
    Name,
    ContactEmail,
    ContactPhone,
    Currency,
    PaymentTerms,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum VendorProducts {
    Table,
    Id,
    VendorId,
    VariantId,
    VendorSku,
    UnitCostCents,
    IsPreferred,
    CreatedAt,
}

#[derive(Iden)]
enum ApprovalTiers {
    Table,
    Id,
    Name,
    MinAmountCents,
    MaxAmountCents,
    CreatedAt,
}

#[derive(Iden)]
enum PurchaseOrders {
    Table,
    Id,
    PoNumber,
    VendorId,
    WarehouseId,
    Status,
    Priority,
    Currency,
    ExpectedDeliveryDate,
    ConfirmedDeliveryDate,
    ActualDeliveryDate,
    SubtotalCents,
    DiscountCents,
    TaxCents,
    ShippingCents,
    GrandTotalCents,
    ApprovalTierId,
    RevisionNumber,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum PurchaseOrderLines {
    Table,
    Id,
    PurchaseOrderId,
    LineNumber,
    ProductId,
    VariantId,
    VendorProductId,
    Sku,
    UnitCostCents,
    OrderQty,
    ReceivedQty,
    CancelledQty,
    DamagedQty,
    DiscountPct,
    TaxPct,
    LineTotalCents,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum PoRevisions {
    Table,
    Id,
    PurchaseOrderId,
    RevisionNumber,
    Changes,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum PoStatusEvents {
    Table,
    Id,
    PurchaseOrderId,
    FromStatus,
    ToStatus,
    UserId,
    Note,
    CreatedAt,
}
