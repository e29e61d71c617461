pub use sea_orm_migration::prelude::*;

mod m20240105_000001_create_catalog_tables;
mod m20240105_000002_create_location_tables;
mod m20240112_000003_create_inventory_tables;
mod m20240119_000004_create_purchasing_tables;
mod m20240126_000005_create_shipment_tables;
mod m20240202_000006_create_receiving_tables;
mod m20240209_000007_create_oms_tables;
mod m20240216_000008_create_picking_tables;
mod m20240223_000009_create_replen_tables;
mod m20240301_000010_create_channel_tables;
mod m20240308_000011_create_rbac_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240105_000001_create_catalog_tables::Migration),
            Box::new(m20240105_000002_create_location_tables::Migration),
            Box::new(m20240112_000003_create_inventory_tables::Migration),
            Box::new(m20240119_000004_create_purchasing_tables::Migration),
            Box::new(m20240126_000005_create_shipment_tables::Migration),
            Box::new(m20240202_000006_create_receiving_tables::Migration),
            Box::new(m20240209_000007_create_oms_tables::Migration),
            Box::new(m20240216_000008_create_picking_tables::Migration),
            Box::new(m20240223_000009_create_replen_tables::Migration),
            Box::new(m20240301_000010_create_channel_tables::Migration),
            Box::new(m20240308_000011_create_rbac_tables::Migration),
        ]
    }
}
