//! Inventory ledger and ATP engine.
//!
//! Every quantity or state change of located inventory goes through this
//! service. Balances are `(variant, location, state)` cells; the ledger is
//! append-only. The `external` state marks the boundary with the outside
//! world: rows crossing it change total owned inventory, rows between
//! owned states conserve it.

use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::{with_serializable_retry, RetryConfig};
use crate::entities::inventory_balance::{self, StockState};
use crate::entities::inventory_transaction::{self, TransactionType};
use crate::entities::{location, product_variant, warehouse};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};

/// Optional references carried on a ledger row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxnRefs {
    pub order_id: Option<Uuid>,
    pub order_line_id: Option<Uuid>,
    pub receiving_order_id: Option<Uuid>,
    pub cycle_count_id: Option<Uuid>,
    pub reference: Option<String>,
    pub user_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Opaque handle returned by `transfer`, consumed by `undo_transfer`.
/// Valid only while the transfer's two rows are still the latest
/// movements on their cells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UndoToken {
    pub batch_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantAtp {
    pub variant_id: Uuid,
    pub sku: String,
    pub units_per_variant: i64,
    pub atp_units: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductAtp {
    pub product_id: Uuid,
    pub atp_base: i64,
    pub variants: Vec<VariantAtp>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub variant_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub order_line_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// The inventory ledger. All writes run inside a serializable transaction
/// with a bounded retry on serialization losers; the balance row is the
/// unit of contention.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    retry: RetryConfig,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db,
            event_sender,
            retry: RetryConfig::default(),
        }
    }

    // ------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------

    /// Add `qty` variant units to `(variant, to_location, on_hand)`.
    #[instrument(skip(self, refs))]
    pub async fn receive(
        &self,
        variant_id: Uuid,
        to_location_id: Uuid,
        qty: i64,
        refs: TxnRefs,
    ) -> ServiceResult<Uuid> {
        ensure_positive(qty)?;
        let variant = self.load_variant(variant_id).await?;

        let txn_id = with_serializable_retry(&self.db, &self.retry, "receive", |txn| {
            let variant = variant.clone();
            let refs = refs.clone();
            async move {
                ensure_location(txn, to_location_id).await?;
                apply_delta(txn, variant.id, to_location_id, StockState::OnHand, qty).await?;
                let row = insert_ledger_row(
                    txn,
                    LedgerRow {
                        transaction_type: TransactionType::Receipt,
                        variant: &variant,
                        from_location_id: None,
                        to_location_id: Some(to_location_id),
                        source_state: StockState::External,
                        target_state: StockState::OnHand,
                        variant_qty_delta: qty,
                        batch_id: None,
                        reason: None,
                        refs: &refs,
                    },
                )
                .await?;
                Ok(row.id)
            }
            .boxed()
        })
        .await?;

        self.notify_change(variant_id, txn_id).await;
        Ok(txn_id)
    }

    /// Move `qty` from `on_hand` to `picked` at one location.
    #[instrument(skip(self, refs))]
    pub async fn pick(
        &self,
        variant_id: Uuid,
        from_location_id: Uuid,
        qty: i64,
        order_line_id: Uuid,
        refs: TxnRefs,
    ) -> ServiceResult<Uuid> {
        ensure_positive(qty)?;
        let variant = self.load_variant(variant_id).await?;

        let txn_id = with_serializable_retry(&self.db, &self.retry, "pick", |txn| {
            let variant = variant.clone();
            let mut refs = refs.clone();
            refs.order_line_id = Some(order_line_id);
            async move {
                ensure_location(txn, from_location_id).await?;
                apply_delta(txn, variant.id, from_location_id, StockState::OnHand, -qty).await?;
                apply_delta(txn, variant.id, from_location_id, StockState::Picked, qty).await?;
                let row = insert_ledger_row(
                    txn,
                    LedgerRow {
                        transaction_type: TransactionType::Pick,
                        variant: &variant,
                        from_location_id: Some(from_location_id),
                        to_location_id: None,
                        source_state: StockState::OnHand,
                        target_state: StockState::Picked,
                        variant_qty_delta: qty,
                        batch_id: None,
                        reason: None,
                        refs: &refs,
                    },
                )
                .await?;
                Ok(row.id)
            }
            .boxed()
        })
        .await?;

        self.notify_change(variant_id, txn_id).await;
        Ok(txn_id)
    }

    /// Move everything picked for the order line to `shipped` at the
    /// locations it was picked from.
    #[instrument(skip(self, refs))]
    pub async fn ship(&self, order_line_id: Uuid, refs: TxnRefs) -> ServiceResult<Vec<Uuid>> {
        let ids = with_serializable_retry(&self.db, &self.retry, "ship", |txn| {
            let refs = refs.clone();
            async move {
                let open = picked_remaining(txn, order_line_id).await?;
                if open.is_empty() {
                    return Err(ServiceError::Validation(format!(
                        "order line {order_line_id} has nothing picked"
                    )));
                }

                let mut ids = Vec::with_capacity(open.len());
                for slot in open {
                    let variant = load_variant_on(txn, slot.variant_id).await?;
                    apply_delta(txn, slot.variant_id, slot.location_id, StockState::Picked, -slot.qty)
                        .await?;
                    apply_delta(txn, slot.variant_id, slot.location_id, StockState::Shipped, slot.qty)
                        .await?;
                    let mut row_refs = refs.clone();
                    row_refs.order_line_id = Some(order_line_id);
                    let row = insert_ledger_row(
                        txn,
                        LedgerRow {
                            transaction_type: TransactionType::Ship,
                            variant: &variant,
                            from_location_id: Some(slot.location_id),
                            to_location_id: None,
                            source_state: StockState::Picked,
                            target_state: StockState::Shipped,
                            variant_qty_delta: slot.qty,
                            batch_id: None,
                            reason: None,
                            refs: &row_refs,
                        },
                    )
                    .await?;
                    ids.push((slot.variant_id, row.id));
                }
                Ok(ids)
            }
            .boxed()
        })
        .await?;

        for (variant_id, txn_id) in &ids {
            self.notify_change(*variant_id, *txn_id).await;
        }
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    /// Signed correction against one cell; requires a reason code. The
    /// outside world is the counter-side of the movement.
    #[instrument(skip(self, refs))]
    pub async fn adjust(
        &self,
        variant_id: Uuid,
        location_id: Uuid,
        state: StockState,
        signed_qty: i64,
        reason: &str,
        refs: TxnRefs,
    ) -> ServiceResult<Uuid> {
        if signed_qty == 0 {
            return Err(ServiceError::Validation("adjustment of zero units".into()));
        }
        if reason.trim().is_empty() {
            return Err(ServiceError::Validation(
                "adjustment requires a reason code".into(),
            ));
        }
        if state == StockState::External {
            return Err(ServiceError::Validation(
                "cannot adjust the external state".into(),
            ));
        }
        let variant = self.load_variant(variant_id).await?;
        let reason = reason.to_string();

        let txn_id = with_serializable_retry(&self.db, &self.retry, "adjust", |txn| {
            let variant = variant.clone();
            let refs = refs.clone();
            let reason = reason.clone();
            async move {
                ensure_location(txn, location_id).await?;
                apply_delta(txn, variant.id, location_id, state, signed_qty).await?;
                let (source_state, target_state) = if signed_qty >= 0 {
                    (StockState::External, state)
                } else {
                    (state, StockState::External)
                };
                let row = insert_ledger_row(
                    txn,
                    LedgerRow {
                        transaction_type: TransactionType::Adjustment,
                        variant: &variant,
                        from_location_id: Some(location_id),
                        to_location_id: Some(location_id),
                        source_state,
                        target_state,
                        variant_qty_delta: signed_qty,
                        batch_id: None,
                        reason: Some(reason),
                        refs: &refs,
                    },
                )
                .await?;
                Ok(row.id)
            }
            .boxed()
        })
        .await?;

        self.notify_change(variant_id, txn_id).await;
        Ok(txn_id)
    }

    /// Atomic two-leg move of on-hand stock. Both legs share a batch id;
    /// the returned token undoes the pair while neither cell has moved
    /// since.
    #[instrument(skip(self, refs))]
    pub async fn transfer(
        &self,
        variant_id: Uuid,
        from_location_id: Uuid,
        to_location_id: Uuid,
        qty: i64,
        refs: TxnRefs,
    ) -> ServiceResult<(Uuid, UndoToken)> {
        ensure_positive(qty)?;
        if from_location_id == to_location_id {
            return Err(ServiceError::Validation(
                "transfer source and destination are the same location".into(),
            ));
        }
        let variant = self.load_variant(variant_id).await?;
        let batch_id = Uuid::new_v4();

        let txn_id = with_serializable_retry(&self.db, &self.retry, "transfer", |txn| {
            let variant = variant.clone();
            let refs = refs.clone();
            async move {
                ensure_location(txn, from_location_id).await?;
                ensure_location(txn, to_location_id).await?;
                post_transfer_pair(
                    txn,
                    &variant,
                    from_location_id,
                    to_location_id,
                    qty,
                    batch_id,
                    TransactionType::Transfer,
                    &refs,
                )
                .await
            }
            .boxed()
        })
        .await?;

        self.notify_change(variant_id, txn_id).await;
        Ok((txn_id, UndoToken { batch_id }))
    }

    /// Post the mirror transfer if, and only if, the original pair is
    /// still the newest movement on both cells.
    #[instrument(skip(self))]
    pub async fn undo_transfer(&self, token: UndoToken) -> ServiceResult<Uuid> {
        let txn_id = with_serializable_retry(&self.db, &self.retry, "undo_transfer", |txn| {
            async move {
                let legs = inventory_transaction::Entity::find()
                    .filter(inventory_transaction::Column::BatchId.eq(token.batch_id))
                    .filter(
                        inventory_transaction::Column::TransactionType
                            .eq(TransactionType::Transfer),
                    )
                    .all(txn)
                    .await?;
                if legs.len() != 2 {
                    return Err(ServiceError::NotFound(format!(
                        "transfer batch {} not found",
                        token.batch_id
                    )));
                }

                let outbound = legs
                    .iter()
                    .find(|l| l.variant_qty_delta < 0)
                    .ok_or_else(|| ServiceError::Internal("malformed transfer batch".into()))?;
                let inbound = legs
                    .iter()
                    .find(|l| l.variant_qty_delta > 0)
                    .ok_or_else(|| ServiceError::Internal("malformed transfer batch".into()))?;

                let from = outbound.from_location_id.ok_or_else(|| {
                    ServiceError::Internal("transfer leg missing from_location".into())
                })?;
                let to = inbound.to_location_id.ok_or_else(|| {
                    ServiceError::Internal("transfer leg missing to_location".into())
                })?;
                let qty = inbound.variant_qty_delta;
                let variant = load_variant_on(txn, inbound.variant_id).await?;

                // Guard: any later movement on either cell supersedes the pair.
                for location_id in [from, to] {
                    let latest =
                        latest_on_hand_txn(txn, variant.id, location_id).await?.ok_or_else(
                            || ServiceError::Internal("transfer cell has no ledger rows".into()),
                        )?;
                    if latest.batch_id != Some(token.batch_id) {
                        return Err(ServiceError::NotUndoable(format!(
                            "cell at location {location_id} has moved since transfer {}",
                            token.batch_id
                        )));
                    }
                }

                let undo_batch = Uuid::new_v4();
                let refs = TxnRefs {
                    reference: Some(format!("undo of transfer {}", token.batch_id)),
                    ..Default::default()
                };
                post_transfer_pair(
                    txn,
                    &variant,
                    to,
                    from,
                    qty,
                    undo_batch,
                    TransactionType::Transfer,
                    &refs,
                )
                .await
            }
            .boxed()
        })
        .await?;

        info!(batch_id = %token.batch_id, "transfer undone");
        Ok(txn_id)
    }

    /// Replenishment movement, possibly converting between UOM siblings
    /// (case break): `from_qty` of `from_variant` leaves one cell and the
    /// base-equivalent `to_qty` of `to_variant` arrives at another. Both
    /// rows share a batch id.
    #[instrument(skip(self, refs))]
    #[allow(clippy::too_many_arguments)]
    pub async fn replenish_move(
        &self,
        from_variant_id: Uuid,
        from_location_id: Uuid,
        from_qty: i64,
        to_variant_id: Uuid,
        to_location_id: Uuid,
        to_qty: i64,
        refs: TxnRefs,
    ) -> ServiceResult<Uuid> {
        ensure_positive(from_qty)?;
        ensure_positive(to_qty)?;
        let from_variant = self.load_variant(from_variant_id).await?;
        let to_variant = self.load_variant(to_variant_id).await?;
        if from_variant.product_id != to_variant.product_id {
            return Err(ServiceError::Validation(
                "replenishment cannot convert across products".into(),
            ));
        }
        if from_qty * from_variant.units_per_variant != to_qty * to_variant.units_per_variant {
            return Err(ServiceError::Validation(format!(
                "unbalanced conversion: {} base out, {} base in",
                from_qty * from_variant.units_per_variant,
                to_qty * to_variant.units_per_variant
            )));
        }
        let batch_id = Uuid::new_v4();

        with_serializable_retry(&self.db, &self.retry, "replenish", |txn| {
            let from_variant = from_variant.clone();
            let to_variant = to_variant.clone();
            let refs = refs.clone();
            async move {
                ensure_location(txn, from_location_id).await?;
                ensure_location(txn, to_location_id).await?;
                apply_delta(txn, from_variant.id, from_location_id, StockState::OnHand, -from_qty)
                    .await?;
                apply_delta(txn, to_variant.id, to_location_id, StockState::OnHand, to_qty).await?;
                insert_ledger_row(
                    txn,
                    LedgerRow {
                        transaction_type: TransactionType::Replenish,
                        variant: &from_variant,
                        from_location_id: Some(from_location_id),
                        to_location_id: Some(to_location_id),
                        source_state: StockState::OnHand,
                        target_state: StockState::OnHand,
                        variant_qty_delta: -from_qty,
                        batch_id: Some(batch_id),
                        reason: None,
                        refs: &refs,
                    },
                )
                .await?;
                insert_ledger_row(
                    txn,
                    LedgerRow {
                        transaction_type: TransactionType::Replenish,
                        variant: &to_variant,
                        from_location_id: Some(from_location_id),
                        to_location_id: Some(to_location_id),
                        source_state: StockState::OnHand,
                        target_state: StockState::OnHand,
                        variant_qty_delta: to_qty,
                        batch_id: Some(batch_id),
                        reason: None,
                        refs: &refs,
                    },
                )
                .await?;
                Ok(batch_id)
            }
            .boxed()
        })
        .await?;

        self.notify_change(from_variant_id, batch_id).await;
        if to_variant_id != from_variant_id {
            self.notify_change(to_variant_id, batch_id).await;
        }
        Ok(batch_id)
    }

    /// Commit on-hand stock to an order line, walking pickable locations
    /// FIFO over `(balance created_at, location code)`. Returns the batch
    /// id grouping the per-location rows.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        variant_id: Uuid,
        qty: i64,
        order_line_id: Uuid,
    ) -> ServiceResult<Uuid> {
        self.move_reservation(variant_id, qty, order_line_id, ReservationDirection::Reserve)
            .await
    }

    /// Inverse of `reserve`: release committed stock back to on-hand.
    #[instrument(skip(self))]
    pub async fn unreserve(
        &self,
        variant_id: Uuid,
        qty: i64,
        order_line_id: Uuid,
    ) -> ServiceResult<Uuid> {
        self.move_reservation(variant_id, qty, order_line_id, ReservationDirection::Unreserve)
            .await
    }

    async fn move_reservation(
        &self,
        variant_id: Uuid,
        qty: i64,
        order_line_id: Uuid,
        direction: ReservationDirection,
    ) -> ServiceResult<Uuid> {
        ensure_positive(qty)?;
        let variant = self.load_variant(variant_id).await?;
        let batch_id = Uuid::new_v4();

        with_serializable_retry(&self.db, &self.retry, direction.operation_name(), |txn| {
            let variant = variant.clone();
            async move {
                let (take_state, give_state, txn_type) = match direction {
                    ReservationDirection::Reserve => (
                        StockState::OnHand,
                        StockState::Committed,
                        TransactionType::Reserve,
                    ),
                    ReservationDirection::Unreserve => (
                        StockState::Committed,
                        StockState::OnHand,
                        TransactionType::Unreserve,
                    ),
                };

                let slots = pickable_cells_fifo(txn, variant.id, take_state).await?;
                let available: i64 = slots.iter().map(|s| s.qty).sum();
                if available < qty {
                    return Err(ServiceError::InsufficientStock(format!(
                        "{} of {} units available to {}",
                        available,
                        qty,
                        direction.operation_name()
                    )));
                }

                let mut remaining = qty;
                for slot in slots {
                    if remaining == 0 {
                        break;
                    }
                    let take = remaining.min(slot.qty);
                    apply_delta(txn, variant.id, slot.location_id, take_state, -take).await?;
                    apply_delta(txn, variant.id, slot.location_id, give_state, take).await?;
                    let refs = TxnRefs {
                        order_line_id: Some(order_line_id),
                        ..Default::default()
                    };
                    insert_ledger_row(
                        txn,
                        LedgerRow {
                            transaction_type: txn_type,
                            variant: &variant,
                            from_location_id: Some(slot.location_id),
                            to_location_id: Some(slot.location_id),
                            source_state: take_state,
                            target_state: give_state,
                            variant_qty_delta: take,
                            batch_id: Some(batch_id),
                            reason: None,
                            refs: &refs,
                        },
                    )
                    .await?;
                    remaining -= take;
                }
                Ok(batch_id)
            }
            .boxed()
        })
        .await?;

        self.notify_change(variant_id, batch_id).await;
        Ok(batch_id)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn balance(
        &self,
        variant_id: Uuid,
        location_id: Uuid,
        state: StockState,
    ) -> ServiceResult<i64> {
        let row = inventory_balance::Entity::find()
            .filter(inventory_balance::Column::VariantId.eq(variant_id))
            .filter(inventory_balance::Column::LocationId.eq(location_id))
            .filter(inventory_balance::Column::State.eq(state))
            .one(&*self.db)
            .await?;
        Ok(row.map(|r| r.quantity).unwrap_or(0))
    }

    /// Every non-zero cell for a variant.
    #[instrument(skip(self))]
    pub async fn balances_for_variant(
        &self,
        variant_id: Uuid,
    ) -> ServiceResult<Vec<inventory_balance::Model>> {
        inventory_balance::Entity::find()
            .filter(inventory_balance::Column::VariantId.eq(variant_id))
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> ServiceResult<(Vec<inventory_transaction::Model>, u64)> {
        let mut query = inventory_transaction::Entity::find();
        if let Some(v) = filter.variant_id {
            query = query.filter(inventory_transaction::Column::VariantId.eq(v));
        }
        if let Some(l) = filter.location_id {
            query = query.filter(
                inventory_transaction::Column::FromLocationId
                    .eq(l)
                    .or(inventory_transaction::Column::ToLocationId.eq(l)),
            );
        }
        if let Some(t) = filter.transaction_type {
            query = query.filter(inventory_transaction::Column::TransactionType.eq(t));
        }
        if let Some(ol) = filter.order_line_id {
            query = query.filter(inventory_transaction::Column::OrderLineId.eq(ol));
        }
        if let Some(b) = filter.batch_id {
            query = query.filter(inventory_transaction::Column::BatchId.eq(b));
        }

        let total = query.clone().count(&*self.db).await?;
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.per_page.unwrap_or(50).clamp(1, 500);
        let rows = query
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .offset((page - 1) * per_page)
            .limit(per_page)
            .all(&*self.db)
            .await?;
        Ok((rows, total))
    }

    /// ATP for a product in one warehouse, fungible across its UOM
    /// variants: the shared base-unit pool is on-hand plus committed at
    /// pickable locations, floored into each variant's unit.
    #[instrument(skip(self))]
    pub async fn atp_for_product_in_warehouse(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> ServiceResult<ProductAtp> {
        self.atp_for_product_filtered(product_id, Some(warehouse_id))
            .await
    }

    /// Aggregate ATP for a product across all warehouses.
    #[instrument(skip(self))]
    pub async fn atp_for_product(&self, product_id: Uuid) -> ServiceResult<ProductAtp> {
        self.atp_for_product_filtered(product_id, None).await
    }

    /// Base-unit ATP for the product owning `variant_id` in a warehouse.
    #[instrument(skip(self))]
    pub async fn atp_base_for_variant(
        &self,
        variant_id: Uuid,
        warehouse_id: Uuid,
    ) -> ServiceResult<i64> {
        let variant = self.load_variant(variant_id).await?;
        let atp = self
            .atp_for_product_in_warehouse(variant.product_id, warehouse_id)
            .await?;
        Ok(atp.atp_base)
    }

    async fn atp_for_product_filtered(
        &self,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
    ) -> ServiceResult<ProductAtp> {
        let variants = product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .order_by_asc(product_variant::Column::HierarchyLevel)
            .order_by_asc(product_variant::Column::UnitsPerVariant)
            .all(&*self.db)
            .await?;
        if variants.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "product {product_id} has no variants"
            )));
        }

        let variant_ids: Vec<Uuid> = variants.iter().map(|v| v.id).collect();
        let mut query = inventory_balance::Entity::find()
            .filter(inventory_balance::Column::VariantId.is_in(variant_ids))
            .filter(
                inventory_balance::Column::State
                    .eq(StockState::OnHand)
                    .or(inventory_balance::Column::State.eq(StockState::Committed)),
            )
            .inner_join(location::Entity)
            .filter(location::Column::IsPickable.eq(true));
        if let Some(w) = warehouse_id {
            query = query.filter(location::Column::WarehouseId.eq(w));
        }
        let balances = query.all(&*self.db).await?;

        let mut atp_base: i64 = 0;
        for b in &balances {
            let per = variants
                .iter()
                .find(|v| v.id == b.variant_id)
                .map(|v| v.units_per_variant)
                .unwrap_or(1);
            atp_base += b.quantity * per;
        }

        let projected = variants
            .iter()
            .map(|v| VariantAtp {
                variant_id: v.id,
                sku: v.sku.clone(),
                units_per_variant: v.units_per_variant,
                atp_units: if v.units_per_variant > 0 {
                    atp_base / v.units_per_variant
                } else {
                    0
                },
            })
            .collect();

        Ok(ProductAtp {
            product_id,
            atp_base,
            variants: projected,
        })
    }

    /// On-hand cells for a variant inside one warehouse, FIFO ordered.
    /// Used by picking fallback and replenishment sourcing.
    #[instrument(skip(self))]
    pub async fn on_hand_cells_in_warehouse(
        &self,
        variant_id: Uuid,
        warehouse_id: Uuid,
    ) -> ServiceResult<Vec<(location::Model, i64)>> {
        let rows = inventory_balance::Entity::find()
            .filter(inventory_balance::Column::VariantId.eq(variant_id))
            .filter(inventory_balance::Column::State.eq(StockState::OnHand))
            .filter(inventory_balance::Column::Quantity.gt(0))
            .find_also_related(location::Entity)
            .filter(location::Column::WarehouseId.eq(warehouse_id))
            .order_by_asc(inventory_balance::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(b, loc)| loc.map(|l| (l, b.quantity)))
            .collect())
    }

    /// Total on-hand at pickable locations across all warehouses.
    #[instrument(skip(self))]
    pub async fn available_on_hand(&self, variant_id: Uuid) -> ServiceResult<i64> {
        let rows = inventory_balance::Entity::find()
            .filter(inventory_balance::Column::VariantId.eq(variant_id))
            .filter(inventory_balance::Column::State.eq(StockState::OnHand))
            .inner_join(location::Entity)
            .filter(location::Column::IsPickable.eq(true))
            .all(&*self.db)
            .await?;
        Ok(rows.iter().map(|r| r.quantity).sum())
    }

    /// Warehouses that map to an external location and source inventory
    /// internally; the per-warehouse channel push iterates these.
    #[instrument(skip(self))]
    pub async fn externally_mapped_warehouses(&self) -> ServiceResult<Vec<warehouse::Model>> {
        warehouse::Entity::find()
            .filter(warehouse::Column::ExternalLocationRef.is_not_null())
            .filter(
                warehouse::Column::InventorySourceType
                    .eq(crate::entities::warehouse::InventorySourceType::Internal),
            )
            .filter(warehouse::Column::IsActive.eq(true))
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn load_variant(&self, variant_id: Uuid) -> ServiceResult<product_variant::Model> {
        product_variant::Entity::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("variant {variant_id} not found")))
    }

    async fn notify_change(&self, variant_id: Uuid, transaction_id: Uuid) {
        self.event_sender
            .send(Event::InventoryChanged {
                variant_id,
                transaction_id,
            })
            .await;
    }
}

#[derive(Clone, Copy, Debug)]
enum ReservationDirection {
    Reserve,
    Unreserve,
}

impl ReservationDirection {
    fn operation_name(&self) -> &'static str {
        match self {
            Self::Reserve => "reserve",
            Self::Unreserve => "unreserve",
        }
    }
}

struct LedgerRow<'a> {
    transaction_type: TransactionType,
    variant: &'a product_variant::Model,
    from_location_id: Option<Uuid>,
    to_location_id: Option<Uuid>,
    source_state: StockState,
    target_state: StockState,
    variant_qty_delta: i64,
    batch_id: Option<Uuid>,
    reason: Option<String>,
    refs: &'a TxnRefs,
}

fn ensure_positive(qty: i64) -> ServiceResult<()> {
    if qty <= 0 {
        Err(ServiceError::Validation(format!(
            "quantity must be positive, got {qty}"
        )))
    } else {
        Ok(())
    }
}

async fn ensure_location(txn: &DatabaseTransaction, location_id: Uuid) -> ServiceResult<()> {
    location::Entity::find_by_id(location_id)
        .one(txn)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("location {location_id} not found")))
}

async fn load_variant_on(
    txn: &DatabaseTransaction,
    variant_id: Uuid,
) -> ServiceResult<product_variant::Model> {
    product_variant::Entity::find_by_id(variant_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("variant {variant_id} not found")))
}

/// Post a receipt inside a caller-owned transaction. Receiving close uses
/// this so the ledger write, the PO roll-up, and the status change commit
/// together.
pub(crate) async fn post_receipt(
    txn: &DatabaseTransaction,
    variant: &product_variant::Model,
    to_location_id: Uuid,
    qty: i64,
    refs: &TxnRefs,
) -> ServiceResult<inventory_transaction::Model> {
    ensure_positive(qty)?;
    ensure_location(txn, to_location_id).await?;
    apply_delta(txn, variant.id, to_location_id, StockState::OnHand, qty).await?;
    insert_ledger_row(
        txn,
        LedgerRow {
            transaction_type: TransactionType::Receipt,
            variant,
            from_location_id: None,
            to_location_id: Some(to_location_id),
            source_state: StockState::External,
            target_state: StockState::OnHand,
            variant_qty_delta: qty,
            batch_id: None,
            reason: None,
            refs,
        },
    )
    .await
}

/// Apply a signed delta to one balance cell, creating the row on first
/// positive movement. The cell never goes negative.
async fn apply_delta(
    txn: &DatabaseTransaction,
    variant_id: Uuid,
    location_id: Uuid,
    state: StockState,
    delta: i64,
) -> ServiceResult<i64> {
    let existing = inventory_balance::Entity::find()
        .filter(inventory_balance::Column::VariantId.eq(variant_id))
        .filter(inventory_balance::Column::LocationId.eq(location_id))
        .filter(inventory_balance::Column::State.eq(state))
        .one(txn)
        .await?;

    match existing {
        Some(row) => {
            let next = row.quantity + delta;
            if next < 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "cell ({variant_id}, {location_id}, {state:?}) has {} units, delta {delta}",
                    row.quantity
                )));
            }
            let mut active: inventory_balance::ActiveModel = row.into();
            active.quantity = Set(next);
            active.updated_at = Set(Utc::now());
            active.update(txn).await?;
            Ok(next)
        }
        None => {
            if delta < 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "cell ({variant_id}, {location_id}, {state:?}) is empty, delta {delta}"
                )));
            }
            let now = Utc::now();
            inventory_balance::ActiveModel {
                id: Set(Uuid::new_v4()),
                variant_id: Set(variant_id),
                location_id: Set(location_id),
                state: Set(state),
                quantity: Set(delta),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(txn)
            .await?;
            Ok(delta)
        }
    }
}

async fn insert_ledger_row(
    txn: &DatabaseTransaction,
    row: LedgerRow<'_>,
) -> ServiceResult<inventory_transaction::Model> {
    inventory_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        transaction_type: Set(row.transaction_type),
        variant_id: Set(row.variant.id),
        from_location_id: Set(row.from_location_id),
        to_location_id: Set(row.to_location_id),
        source_state: Set(row.source_state),
        target_state: Set(row.target_state),
        variant_qty_delta: Set(row.variant_qty_delta),
        base_qty_delta: Set(row.variant_qty_delta * row.variant.units_per_variant),
        batch_id: Set(row.batch_id),
        order_id: Set(row.refs.order_id),
        order_line_id: Set(row.refs.order_line_id),
        receiving_order_id: Set(row.refs.receiving_order_id),
        cycle_count_id: Set(row.refs.cycle_count_id),
        reference: Set(row.refs.reference.clone()),
        reason: Set(row.reason),
        user_id: Set(row.refs.user_id),
        notes: Set(row.refs.notes.clone()),
        created_at: Set(Utc::now()),
    }
    .insert(txn)
    .await
    .map_err(Into::into)
}

/// Both legs of a transfer, sharing `batch_id`. Returns the batch id.
#[allow(clippy::too_many_arguments)]
async fn post_transfer_pair(
    txn: &DatabaseTransaction,
    variant: &product_variant::Model,
    from_location_id: Uuid,
    to_location_id: Uuid,
    qty: i64,
    batch_id: Uuid,
    txn_type: TransactionType,
    refs: &TxnRefs,
) -> ServiceResult<Uuid> {
    apply_delta(txn, variant.id, from_location_id, StockState::OnHand, -qty).await?;
    apply_delta(txn, variant.id, to_location_id, StockState::OnHand, qty).await?;

    insert_ledger_row(
        txn,
        LedgerRow {
            transaction_type: txn_type,
            variant,
            from_location_id: Some(from_location_id),
            to_location_id: Some(to_location_id),
            source_state: StockState::OnHand,
            target_state: StockState::OnHand,
            variant_qty_delta: -qty,
            batch_id: Some(batch_id),
            reason: None,
            refs,
        },
    )
    .await?;
    insert_ledger_row(
        txn,
        LedgerRow {
            transaction_type: txn_type,
            variant,
            from_location_id: Some(from_location_id),
            to_location_id: Some(to_location_id),
            source_state: StockState::OnHand,
            target_state: StockState::OnHand,
            variant_qty_delta: qty,
            batch_id: Some(batch_id),
            reason: None,
            refs,
        },
    )
    .await?;
    Ok(batch_id)
}

#[derive(Debug)]
struct CellSlot {
    location_id: Uuid,
    qty: i64,
}

#[derive(Debug)]
struct PickedSlot {
    variant_id: Uuid,
    location_id: Uuid,
    qty: i64,
}

/// Non-empty pickable cells in `state`, FIFO over `(created_at, code)`.
async fn pickable_cells_fifo(
    txn: &DatabaseTransaction,
    variant_id: Uuid,
    state: StockState,
) -> ServiceResult<Vec<CellSlot>> {
    let rows = inventory_balance::Entity::find()
        .filter(inventory_balance::Column::VariantId.eq(variant_id))
        .filter(inventory_balance::Column::State.eq(state))
        .filter(inventory_balance::Column::Quantity.gt(0))
        .find_also_related(location::Entity)
        .filter(location::Column::IsPickable.eq(true))
        .all(txn)
        .await?;

    let mut slots: Vec<(inventory_balance::Model, location::Model)> = rows
        .into_iter()
        .filter_map(|(b, loc)| loc.map(|l| (b, l)))
        .collect();
    slots.sort_by(|(a, la), (b, lb)| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| la.code.cmp(&lb.code))
    });

    Ok(slots
        .into_iter()
        .map(|(b, l)| CellSlot {
            location_id: l.id,
            qty: b.quantity,
        })
        .collect())
}

/// Quantity still sitting in `picked` per (variant, location) for an order
/// line: picks minus ships from the ledger.
async fn picked_remaining(
    txn: &DatabaseTransaction,
    order_line_id: Uuid,
) -> ServiceResult<Vec<PickedSlot>> {
    let rows = inventory_transaction::Entity::find()
        .filter(inventory_transaction::Column::OrderLineId.eq(order_line_id))
        .filter(
            inventory_transaction::Column::TransactionType
                .eq(TransactionType::Pick)
                .or(inventory_transaction::Column::TransactionType.eq(TransactionType::Ship)),
        )
        .all(txn)
        .await?;

    let mut per_cell: Vec<PickedSlot> = Vec::new();
    for row in rows {
        let location_id = match row.from_location_id {
            Some(l) => l,
            None => continue,
        };
        let signed = match row.transaction_type {
            TransactionType::Pick => row.variant_qty_delta,
            TransactionType::Ship => -row.variant_qty_delta,
            _ => 0,
        };
        match per_cell
            .iter_mut()
            .find(|s| s.variant_id == row.variant_id && s.location_id == location_id)
        {
            Some(slot) => slot.qty += signed,
            None => per_cell.push(PickedSlot {
                variant_id: row.variant_id,
                location_id,
                qty: signed,
            }),
        }
    }
    per_cell.retain(|s| s.qty > 0);
    Ok(per_cell)
}

/// Newest ledger row touching `(variant, location, on_hand)`.
async fn latest_on_hand_txn(
    txn: &DatabaseTransaction,
    variant_id: Uuid,
    location_id: Uuid,
) -> ServiceResult<Option<inventory_transaction::Model>> {
    let rows = inventory_transaction::Entity::find()
        .filter(inventory_transaction::Column::VariantId.eq(variant_id))
        .filter(
            inventory_transaction::Column::FromLocationId
                .eq(location_id)
                .or(inventory_transaction::Column::ToLocationId.eq(location_id)),
        )
        .filter(
            inventory_transaction::Column::SourceState
                .eq(StockState::OnHand)
                .or(inventory_transaction::Column::TargetState.eq(StockState::OnHand)),
        )
        .order_by_desc(inventory_transaction::Column::CreatedAt)
        .limit(1)
        .all(txn)
        .await?;

    Ok(rows.into_iter().next())
}
