pub mod auth;
pub mod channels;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::RbacService;
use crate::channels::DriverRegistry;
use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::catalog::CatalogService;
use crate::services::channel_sync::ChannelSyncService;
use crate::services::inventory::InventoryService;
use crate::services::locations::LocationService;
use crate::services::orders::OrderService;
use crate::services::picking::PickingService;
use crate::services::purchasing::PurchasingService;
use crate::services::receiving::ReceivingService;
use crate::services::replenishment::ReplenishmentService;
use crate::services::shipments::ShipmentService;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub catalog: CatalogService,
    pub locations: LocationService,
    pub inventory: InventoryService,
    pub purchasing: PurchasingService,
    pub shipments: ShipmentService,
    pub receiving: ReceivingService,
    pub orders: OrderService,
    pub picking: PickingService,
    pub replenishment: ReplenishmentService,
    pub channel_sync: Arc<ChannelSyncService>,
    pub rbac: RbacService,
}

impl AppState {
    /// Wire the full service graph over one connection pool and event
    /// channel. Composition order follows the data flow: reference data,
    /// the ledger, then the arcs that read and post to it.
    pub fn build(
        config: Arc<AppConfig>,
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        registry: Arc<DriverRegistry>,
    ) -> Self {
        let catalog = CatalogService::new(db.clone(), event_sender.clone());
        let locations = LocationService::new(db.clone());
        let inventory = InventoryService::new(db.clone(), event_sender.clone());
        let purchasing = PurchasingService::new(db.clone(), event_sender.clone());
        let shipments = ShipmentService::new(db.clone(), event_sender.clone());
        let receiving =
            ReceivingService::new(db.clone(), event_sender.clone(), purchasing.clone());
        let orders = OrderService::new(db.clone(), event_sender.clone(), inventory.clone());
        let picking = PickingService::new(
            db.clone(),
            event_sender.clone(),
            inventory.clone(),
            orders.clone(),
        );
        let replenishment =
            ReplenishmentService::new(db.clone(), event_sender.clone(), inventory.clone());
        let channel_sync = Arc::new(ChannelSyncService::new(
            db.clone(),
            inventory.clone(),
            registry,
            config.channel_sync.clone(),
        ));
        let rbac = RbacService::new(db.clone());

        Self {
            config,
            db,
            catalog,
            locations,
            inventory,
            purchasing,
            shipments,
            receiving,
            orders,
            picking,
            replenishment,
            channel_sync,
            rbac,
        }
    }
}
