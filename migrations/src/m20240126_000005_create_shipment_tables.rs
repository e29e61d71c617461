use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InboundShipments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InboundShipments::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InboundShipments::ShipmentNumber)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InboundShipments::Mode).string().not_null())
                    .col(ColumnDef::new(InboundShipments::Carrier).string().null())
                    .col(ColumnDef::new(InboundShipments::Forwarder).string().null())
                    .col(ColumnDef::new(InboundShipments::OriginPort).string().null())
                    .col(
                        ColumnDef::new(InboundShipments::DestinationPort)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InboundShipments::ContainerNumber)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(InboundShipments::BolNumber).string().null())
                    .col(
                        ColumnDef::new(InboundShipments::TrackingNumber)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(InboundShipments::Etd).date().null())
                    .col(ColumnDef::new(InboundShipments::Eta).date().null())
                    .col(
                        ColumnDef::new(InboundShipments::AllocationMethodDefault)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InboundShipments::TotalWeightGrams)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipments::TotalVolumeCm3)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipments::TotalPieces)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipments::TotalCartons)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipments::EstimatedTotalCostCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipments::ActualTotalCostCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(InboundShipments::Status).string().not_null())
                    .col(
                        ColumnDef::new(InboundShipments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InboundShipments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inbound_shipments_number")
                    .table(InboundShipments::Table)
                    .col(InboundShipments::ShipmentNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InboundShipmentLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InboundShipmentLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::ShipmentId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InboundShipmentLines::PoLineId).uuid().null())
                    .col(
                        ColumnDef::new(InboundShipmentLines::VariantId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::QtyShipped)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::UnitWeightGrams)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::UnitLengthMm)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::UnitWidthMm)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::UnitHeightMm)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::TotalWeightGrams)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::TotalVolumeCm3)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::GrossVolumeCm3)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::ChargeableWeightGrams)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::AllocatedCostCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::LandedUnitCostCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InboundShipmentLines::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inbound_shipment_lines_shipment")
                    .table(InboundShipmentLines::Table)
                    .col(InboundShipmentLines::ShipmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ShipmentCosts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShipmentCosts::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShipmentCosts::ShipmentId).uuid().not_null())
                    .col(ColumnDef::new(ShipmentCosts::CostType).string().not_null())
                    .col(
                        ColumnDef::new(ShipmentCosts::EstimatedCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ShipmentCosts::ActualCents).big_integer().null())
                    .col(
                        ColumnDef::new(ShipmentCosts::AllocationMethod)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ShipmentCosts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShipmentCosts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ShipmentCostAllocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShipmentCostAllocations::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShipmentCostAllocations::ShipmentCostId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShipmentCostAllocations::ShipmentLineId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShipmentCostAllocations::AllocatedCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShipmentCostAllocations::BasisValue)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShipmentCostAllocations::BasisTotal)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShipmentCostAllocations::ShareBps)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShipmentCostAllocations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shipment_cost_allocations_cost_line")
                    .table(ShipmentCostAllocations::Table)
                    .col(ShipmentCostAllocations::ShipmentCostId)
                    .col(ShipmentCostAllocations::ShipmentLineId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LandedCostSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LandedCostSnapshots::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LandedCostSnapshots::ShipmentLineId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LandedCostSnapshots::PoUnitCostCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LandedCostSnapshots::FreightCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LandedCostSnapshots::DutyCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LandedCostSnapshots::InsuranceCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LandedCostSnapshots::OtherCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LandedCostSnapshots::TotalLandedCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LandedCostSnapshots::LandedUnitCostCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LandedCostSnapshots::Qty)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LandedCostSnapshots::FinalizedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_landed_cost_snapshots_line")
                    .table(LandedCostSnapshots::Table)
                    .col(LandedCostSnapshots::ShipmentLineId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LandedCostSnapshots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ShipmentCostAllocations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ShipmentCosts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InboundShipmentLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InboundShipments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum InboundShipments {
    Table,
    Id,
    ShipmentNumber,
    Mode,
    Carrier,
    Forwarder,
    OriginPort,
    DestinationPort,
    ContainerNumber,
    BolNumber,
    TrackingNumber,
    Etd,
    Eta,
    AllocationMethodDefault,
    TotalWeightGrams,
    TotalVolumeCm3,
    TotalPieces,
    TotalCartons,
    EstimatedTotalCostCents,
    ActualTotalCostCents,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum InboundShipmentLines {
    Table,
    Id,
    ShipmentId,
    PoLineId,
    VariantId,
    QtyShipped,
    UnitWeightGrams,
    UnitLengthMm,
    UnitWidthMm,
    UnitHeightMm,
    TotalWeightGrams,
    TotalVolumeCm3,
    GrossVolumeCm3,
    ChargeableWeightGrams,
    AllocatedCostCents,
    LandedUnitCostCents,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ShipmentCosts {
    Table,
    Id,
    ShipmentId,
    CostType,
    EstimatedCents,
    ActualCents,
    AllocationMethod,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ShipmentCostAllocations {
    Table,
    Id,
    ShipmentCostId,
    ShipmentLineId,
    AllocatedCents,
    BasisValue,
    BasisTotal,
    ShareBps,
    CreatedAt,
}

#[derive(Iden)]
enum LandedCostSnapshots {
    Table,
    Id,
    ShipmentLineId,
    PoUnitCostCents,
    FreightCents,
    DutyCents,
    InsuranceCents,
    OtherCents,
    TotalLandedCents,
    LandedUnitCostCents,
    Qty,
    FinalizedAt,
}
