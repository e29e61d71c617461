use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::services::channel_sync::ChannelSyncService;

/// Events emitted by the service layer after their transactions commit.
/// Channel-sync work hangs off these so pushes never run inside a ledger
/// transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Ledger events
    InventoryChanged {
        variant_id: Uuid,
        transaction_id: Uuid,
    },

    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrdersCombined {
        group_id: Uuid,
        parent_order_id: Uuid,
        child_order_ids: Vec<Uuid>,
    },

    // Purchasing events
    PurchaseOrderStatusChanged {
        po_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Inbound events
    ReceivingOrderClosed {
        receiving_order_id: Uuid,
    },
    ShipmentFinalized {
        shipment_id: Uuid,
    },

    // Replenishment events
    ReplenTaskCompleted {
        task_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Fire-and-forget publish. A full or closed queue is logged, never
    /// surfaced to the emitting operation (its transaction has already
    /// committed).
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            error!("failed to enqueue event: {e}");
        }
    }
}

/// Build an event channel pair with a reasonable depth.
pub fn event_channel() -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(1024);
    (EventSender::new(tx), rx)
}

/// Long-lived consumer loop. Runs until every sender is dropped.
pub async fn process_events(
    mut rx: mpsc::Receiver<Event>,
    channel_sync: Option<Arc<ChannelSyncService>>,
) {
    info!("event processing loop started");

    while let Some(event) = rx.recv().await {
        debug!(?event, "event received");

        match event {
            Event::InventoryChanged { variant_id, .. } => {
                if let Some(sync) = &channel_sync {
                    if let Err(e) = sync.queue_sync_after_inventory_change(variant_id).await {
                        warn!(%variant_id, "reactive channel sync failed: {e}");
                    }
                }
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "order status changed");
            }
            Event::PurchaseOrderStatusChanged {
                po_id,
                old_status,
                new_status,
            } => {
                info!(%po_id, %old_status, %new_status, "purchase order status changed");
            }
            Event::ReceivingOrderClosed { receiving_order_id } => {
                info!(%receiving_order_id, "receiving order closed");
            }
            Event::ShipmentFinalized { shipment_id } => {
                info!(%shipment_id, "inbound shipment finalized");
            }
            other => {
                debug!(?other, "event observed");
            }
        }
    }

    info!("event processing loop stopped");
}
