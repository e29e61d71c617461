//! Order management: ingest, hold/release, combinable-order grouping,
//! and the release gate into picking.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::sales_order::{self, CombinedRole, SalesOrderStatus};
use crate::entities::sales_order_line::{self, SalesOrderLineStatus};
use crate::entities::Priority;
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::services::inventory::InventoryService;
use crate::services::{map_unique_violation, next_document_number};

/// Normalized destination address, the combining key.
pub fn normalize_address(
    street: &str,
    city: &str,
    state: &str,
    postal: &str,
    country: &str,
) -> String {
    [street, city, state, postal, country]
        .iter()
        .map(|part| {
            part.trim()
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("|")
}

pub fn hash_address(street: &str, city: &str, state: &str, postal: &str, country: &str) -> String {
    let normalized = normalize_address(street, city, state, postal, country);
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineInput {
    pub variant_id: Uuid,
    pub qty: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    pub order_number: Option<String>,
    pub channel_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub ship_street: String,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_postal: String,
    pub ship_country: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub lines: Vec<OrderLineInput>,
}

/// List views exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderView {
    Active,
    Exceptions,
    Completed,
}

#[derive(Debug, Serialize)]
pub struct CombineResult {
    pub group_id: Uuid,
    pub parent_order_id: Uuid,
    pub child_order_ids: Vec<Uuid>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    inventory: InventoryService,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        inventory: InventoryService,
    ) -> Self {
        Self {
            db,
            event_sender,
            inventory,
        }
    }

    #[instrument(skip(self, input))]
    pub async fn create_order(&self, input: CreateOrderInput) -> ServiceResult<sales_order::Model> {
        if input.lines.is_empty() {
            return Err(ServiceError::Validation("order has no lines".into()));
        }
        for line in &input.lines {
            if line.qty <= 0 {
                return Err(ServiceError::Validation("line qty must be positive".into()));
            }
        }

        let address_hash = hash_address(
            &input.ship_street,
            &input.ship_city,
            &input.ship_state,
            &input.ship_postal,
            &input.ship_country,
        );

        let txn = self.db.begin().await?;
        let order_number = match input.order_number {
            Some(n) => n,
            None => next_document_number(&txn, "sales_order", "SO").await?,
        };
        let now = Utc::now();
        let order = sales_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(order_number),
            channel_id: Set(input.channel_id),
            warehouse_id: Set(input.warehouse_id),
            customer_name: Set(input.customer_name),
            customer_email: Set(input.customer_email),
            ship_street: Set(input.ship_street),
            ship_city: Set(input.ship_city),
            ship_state: Set(input.ship_state),
            ship_postal: Set(input.ship_postal),
            ship_country: Set(input.ship_country),
            address_hash: Set(address_hash),
            status: Set(SalesOrderStatus::Ready),
            priority: Set(input.priority.unwrap_or_default()),
            on_hold: Set(false),
            combined_group_id: Set(None),
            combined_role: Set(None),
            released_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| map_unique_violation(e, "order number"))?;

        for line in input.lines {
            sales_order_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                variant_id: Set(line.variant_id),
                ordered_qty: Set(line.qty),
                picked_qty: Set(0),
                status: Set(SalesOrderLineStatus::Open),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        self.event_sender.send(Event::OrderCreated(order.id)).await;
        info!(order_id = %order.id, number = %order.order_number, "sales order created");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> ServiceResult<sales_order::Model> {
        sales_order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn get_lines(&self, order_id: Uuid) -> ServiceResult<Vec<sales_order_line::Model>> {
        sales_order_line::Entity::find()
            .filter(sales_order_line::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        view: Option<OrderView>,
        channel_id: Option<Uuid>,
    ) -> ServiceResult<Vec<sales_order::Model>> {
        let mut query = sales_order::Entity::find();
        match view {
            Some(OrderView::Active) => {
                query = query.filter(
                    sales_order::Column::Status.is_not_in([
                        SalesOrderStatus::Shipped,
                        SalesOrderStatus::Completed,
                        SalesOrderStatus::Cancelled,
                        SalesOrderStatus::Exception,
                    ]),
                );
            }
            Some(OrderView::Exceptions) => {
                query = query.filter(sales_order::Column::Status.eq(SalesOrderStatus::Exception));
            }
            Some(OrderView::Completed) => {
                query = query.filter(
                    sales_order::Column::Status
                        .is_in([SalesOrderStatus::Shipped, SalesOrderStatus::Completed]),
                );
            }
            None => {}
        }
        if let Some(c) = channel_id {
            query = query.filter(sales_order::Column::ChannelId.eq(c));
        }
        query
            .order_by_desc(sales_order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn set_hold(&self, order_id: Uuid, on_hold: bool) -> ServiceResult<sales_order::Model> {
        let order = self.get_order(order_id).await?;
        if !order.status.is_open() {
            return Err(ServiceError::InvalidTransition(format!(
                "order is {} and cannot change hold state",
                order.status
            )));
        }
        let mut active: sales_order::ActiveModel = order.into();
        active.on_hold = Set(on_hold);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn set_priority(
        &self,
        order_id: Uuid,
        priority: Priority,
    ) -> ServiceResult<sales_order::Model> {
        let order = self.get_order(order_id).await?;
        let mut active: sales_order::ActiveModel = order.into();
        active.priority = Set(priority);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(Into::into)
    }

    /// Confirm pickable stock covers every line and move the order to
    /// `allocated`. Physical stock stays on-hand; picks draw it down.
    #[instrument(skip(self))]
    pub async fn allocate(&self, order_id: Uuid) -> ServiceResult<sales_order::Model> {
        let order = self.get_order(order_id).await?;
        if order.status != SalesOrderStatus::Ready {
            return Err(ServiceError::InvalidTransition(format!(
                "order is {}, expected ready",
                order.status
            )));
        }
        if order.on_hold {
            return Err(ServiceError::InvalidTransition(
                "order is on hold".into(),
            ));
        }

        let lines = self.get_lines(order_id).await?;
        for line in &lines {
            let available = self.inventory.available_on_hand(line.variant_id).await?;
            if available < line.ordered_qty {
                return Err(ServiceError::InsufficientStock(format!(
                    "line {}: {} on hand of {} ordered",
                    line.id, available, line.ordered_qty
                )));
            }
            let mut active: sales_order_line::ActiveModel = line.clone().into();
            active.status = Set(SalesOrderLineStatus::Allocated);
            active.updated_at = Set(Utc::now());
            active.update(&*self.db).await?;
        }

        self.set_status(order, SalesOrderStatus::Allocated).await
    }

    /// Stamp the order into the picking queue.
    #[instrument(skip(self))]
    pub async fn release_to_picking(&self, order_id: Uuid) -> ServiceResult<sales_order::Model> {
        let order = self.get_order(order_id).await?;
        if order.status != SalesOrderStatus::Allocated || order.on_hold {
            return Err(ServiceError::InvalidTransition(format!(
                "order {} is not releasable",
                order.order_number
            )));
        }
        let mut active: sales_order::ActiveModel = order.into();
        active.released_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(Into::into)
    }

    /// Background sweep used by the interval auto-release modes. Returns
    /// how many orders entered the queue.
    #[instrument(skip(self))]
    pub async fn release_pending(&self) -> ServiceResult<usize> {
        let pending = sales_order::Entity::find()
            .filter(sales_order::Column::Status.eq(SalesOrderStatus::Allocated))
            .filter(sales_order::Column::ReleasedAt.is_null())
            .filter(sales_order::Column::OnHold.eq(false))
            .all(&*self.db)
            .await?;
        let count = pending.len();
        for order in pending {
            let mut active: sales_order::ActiveModel = order.into();
            active.released_at = Set(Some(Utc::now()));
            active.updated_at = Set(Utc::now());
            active.update(&*self.db).await?;
        }
        Ok(count)
    }

    /// Orders released and awaiting wave assignment.
    #[instrument(skip(self))]
    pub async fn released_orders(&self) -> ServiceResult<Vec<sales_order::Model>> {
        sales_order::Entity::find()
            .filter(sales_order::Column::Status.eq(SalesOrderStatus::Allocated))
            .filter(sales_order::Column::ReleasedAt.is_not_null())
            .filter(sales_order::Column::OnHold.eq(false))
            .order_by_asc(sales_order::Column::ReleasedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    pub(crate) async fn set_status(
        &self,
        order: sales_order::Model,
        to: SalesOrderStatus,
    ) -> ServiceResult<sales_order::Model> {
        let old = order.status;
        let order_id = order.id;
        let mut active: sales_order::ActiveModel = order.into();
        active.status = Set(to);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status: old.to_string(),
                new_status: to.to_string(),
            })
            .await;
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Combining
    // ------------------------------------------------------------------

    /// Join open, unshipped orders for the same customer and destination
    /// into one group picked and shipped as a unit.
    #[instrument(skip(self))]
    pub async fn combine(&self, order_ids: Vec<Uuid>) -> ServiceResult<CombineResult> {
        if order_ids.len() < 2 {
            return Err(ServiceError::Validation(
                "combining needs at least two orders".into(),
            ));
        }

        let mut orders = Vec::with_capacity(order_ids.len());
        for id in &order_ids {
            orders.push(self.get_order(*id).await?);
        }

        let first = &orders[0];
        for order in &orders {
            if !order.status.is_open() {
                return Err(ServiceError::InvalidTransition(format!(
                    "order {} is {} and cannot be combined",
                    order.order_number, order.status
                )));
            }
            if order.combined_group_id.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "order {} is already in a combined group",
                    order.order_number
                )));
            }
            if order.address_hash != first.address_hash {
                return Err(ServiceError::Validation(format!(
                    "order {} ships to a different address",
                    order.order_number
                )));
            }
            if order.customer_name.trim().to_lowercase()
                != first.customer_name.trim().to_lowercase()
            {
                return Err(ServiceError::Validation(format!(
                    "order {} belongs to a different customer",
                    order.order_number
                )));
            }
        }

        let group_id = Uuid::new_v4();
        let parent_id = first.id;
        let txn = self.db.begin().await?;
        for (idx, order) in orders.into_iter().enumerate() {
            let role = if idx == 0 {
                CombinedRole::Parent
            } else {
                CombinedRole::Child
            };
            let mut active: sales_order::ActiveModel = order.into();
            active.combined_group_id = Set(Some(group_id));
            active.combined_role = Set(Some(role));
            active.updated_at = Set(Utc::now());
            active.update(&txn).await?;
        }
        txn.commit().await?;

        let child_ids: Vec<Uuid> = order_ids.iter().skip(1).copied().collect();
        self.event_sender
            .send(Event::OrdersCombined {
                group_id,
                parent_order_id: parent_id,
                child_order_ids: child_ids.clone(),
            })
            .await;
        info!(%group_id, %parent_id, children = child_ids.len(), "orders combined");

        Ok(CombineResult {
            group_id,
            parent_order_id: parent_id,
            child_order_ids: child_ids,
        })
    }

    /// Dissolve a group. Refused once anything in it has been picked.
    #[instrument(skip(self))]
    pub async fn uncombine(&self, group_id: Uuid) -> ServiceResult<usize> {
        let members = sales_order::Entity::find()
            .filter(sales_order::Column::CombinedGroupId.eq(group_id))
            .all(&*self.db)
            .await?;
        if members.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "combined group {group_id} not found"
            )));
        }

        for order in &members {
            let lines = self.get_lines(order.id).await?;
            if lines.iter().any(|l| l.picked_qty > 0) {
                return Err(ServiceError::InvalidTransition(format!(
                    "order {} already has picked lines",
                    order.order_number
                )));
            }
        }

        let count = members.len();
        let txn = self.db.begin().await?;
        for order in members {
            let mut active: sales_order::ActiveModel = order.into();
            active.combined_group_id = Set(None);
            active.combined_role = Set(None);
            active.updated_at = Set(Utc::now());
            active.update(&txn).await?;
        }
        txn.commit().await?;
        Ok(count)
    }

    /// Orders in a combined group, parent first.
    #[instrument(skip(self))]
    pub async fn group_members(&self, group_id: Uuid) -> ServiceResult<Vec<sales_order::Model>> {
        let mut members = sales_order::Entity::find()
            .filter(sales_order::Column::CombinedGroupId.eq(group_id))
            .all(&*self.db)
            .await?;
        members.sort_by_key(|o| o.combined_role != Some(CombinedRole::Parent));
        Ok(members)
    }

    // ------------------------------------------------------------------
    // Shipping
    // ------------------------------------------------------------------

    /// Ship a picked order; for a combined parent, the whole group ships.
    #[instrument(skip(self))]
    pub async fn ship_order(&self, order_id: Uuid, user_id: Option<Uuid>) -> ServiceResult<Vec<Uuid>> {
        let order = self.get_order(order_id).await?;
        let targets = match (order.combined_group_id, order.combined_role) {
            (Some(group), Some(CombinedRole::Parent)) => self.group_members(group).await?,
            (Some(_), Some(CombinedRole::Child)) => {
                return Err(ServiceError::InvalidTransition(
                    "ship the combined group through its parent order".into(),
                ))
            }
            _ => vec![order],
        };

        let mut shipped = Vec::new();
        for order in targets {
            if !matches!(
                order.status,
                SalesOrderStatus::Picked | SalesOrderStatus::Packed
            ) {
                return Err(ServiceError::InvalidTransition(format!(
                    "order {} is {}, expected picked or packed",
                    order.order_number, order.status
                )));
            }
            let lines = self.get_lines(order.id).await?;
            for line in lines.iter().filter(|l| l.picked_qty > 0) {
                let refs = crate::services::inventory::TxnRefs {
                    order_id: Some(order.id),
                    user_id,
                    ..Default::default()
                };
                self.inventory.ship(line.id, refs).await?;
                let mut active: sales_order_line::ActiveModel = line.clone().into();
                active.status = Set(SalesOrderLineStatus::Shipped);
                active.updated_at = Set(Utc::now());
                active.update(&*self.db).await?;
            }
            let updated = self.set_status(order, SalesOrderStatus::Shipped).await?;
            shipped.push(updated.id);
        }
        Ok(shipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_normalization_ignores_case_and_spacing() {
        let a = normalize_address("12 Main St", "Springfield", "IL", "62701", "US");
        let b = normalize_address("  12  MAIN st ", "springfield", "il", " 62701", "us");
        assert_eq!(a, b);
        assert_eq!(a, "12 main st|springfield|il|62701|us");
    }

    #[test]
    fn different_addresses_hash_differently() {
        let a = hash_address("12 Main St", "Springfield", "IL", "62701", "US");
        let b = hash_address("13 Main St", "Springfield", "IL", "62701", "US");
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
