//! Wave generation and pick execution.
//!
//! Task order is the warehouse walk: zone sequence, then natural bin
//! order, then order priority (rush first). Short picks fall back to
//! other locations FIFO and surface as exceptions when stock runs dry.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::pick_task::{self, PickTaskStatus};
use crate::entities::pick_wave::{self, PickMode, WaveStatus};
use crate::entities::sales_order::{self, CombinedRole, SalesOrderStatus};
use crate::entities::sales_order_line::{self, SalesOrderLineStatus};
use crate::entities::Priority;
use crate::errors::{ServiceError, ServiceResult};
use crate::events::EventSender;
use crate::services::inventory::{InventoryService, TxnRefs};
use crate::services::next_document_number;
use crate::services::orders::OrderService;

/// Natural comparison for bin codes: digit runs compare numerically, so
/// `A-2` walks before `A-10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ca = a.chars().peekable();
    let mut cb = b.chars().peekable();
    loop {
        match (ca.peek().copied(), cb.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let mut na: u64 = 0;
                    while let Some(d) = ca.peek().and_then(|c| c.to_digit(10)) {
                        na = na * 10 + d as u64;
                        ca.next();
                    }
                    let mut nb: u64 = 0;
                    while let Some(d) = cb.peek().and_then(|c| c.to_digit(10)) {
                        nb = nb * 10 + d as u64;
                        cb.next();
                    }
                    match na.cmp(&nb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    match x.cmp(&y) {
                        Ordering::Equal => {
                            ca.next();
                            cb.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

fn priority_rank(p: Priority) -> i32 {
    match p {
        Priority::Rush => 0,
        Priority::High => 1,
        Priority::Normal => 2,
    }
}

struct TaskDraft {
    order_id: Uuid,
    order_line_id: Uuid,
    variant_id: Uuid,
    location_id: Uuid,
    location_code: String,
    zone_sequence: i32,
    priority: Priority,
    order_sort_key: String,
    qty: i64,
}

#[derive(Clone)]
pub struct PickingService {
    db: Arc<DatabaseConnection>,
    #[allow(dead_code)]
    event_sender: EventSender,
    inventory: InventoryService,
    orders: OrderService,
}

impl PickingService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        inventory: InventoryService,
        orders: OrderService,
    ) -> Self {
        Self {
            db,
            event_sender,
            inventory,
            orders,
        }
    }

    /// Build a wave over the released orders, or an explicit subset.
    #[instrument(skip(self))]
    pub async fn generate_wave(
        &self,
        warehouse_id: Uuid,
        mode: PickMode,
        order_ids: Option<Vec<Uuid>>,
        created_by: Option<Uuid>,
    ) -> ServiceResult<(pick_wave::Model, Vec<pick_task::Model>)> {
        let released = self.orders.released_orders().await?;
        let selected: Vec<sales_order::Model> = match &order_ids {
            Some(ids) => released
                .into_iter()
                .filter(|o| ids.contains(&o.id))
                .collect(),
            None => released,
        };
        if selected.is_empty() {
            return Err(ServiceError::Validation(
                "no released orders available for a wave".into(),
            ));
        }

        let mut drafts: Vec<TaskDraft> = Vec::new();
        for order in &selected {
            // Combined groups pick under the parent.
            let task_order_id = match (order.combined_group_id, order.combined_role) {
                (Some(group), Some(CombinedRole::Child)) => {
                    let members = self.orders.group_members(group).await?;
                    members
                        .into_iter()
                        .find(|m| m.combined_role == Some(CombinedRole::Parent))
                        .map(|m| m.id)
                        .unwrap_or(order.id)
                }
                _ => order.id,
            };

            let lines = self.orders.get_lines(order.id).await?;
            for line in lines {
                let open_qty = line.ordered_qty - line.picked_qty;
                if open_qty <= 0 || line.status == SalesOrderLineStatus::Cancelled {
                    continue;
                }
                let cells = self
                    .inventory
                    .on_hand_cells_in_warehouse(line.variant_id, warehouse_id)
                    .await?;

                let mut remaining = open_qty;
                for (loc, qty) in cells {
                    if remaining == 0 {
                        break;
                    }
                    let take = remaining.min(qty);
                    drafts.push(TaskDraft {
                        order_id: task_order_id,
                        order_line_id: line.id,
                        variant_id: line.variant_id,
                        location_id: loc.id,
                        location_code: loc.code.clone(),
                        zone_sequence: loc.zone_sequence,
                        priority: order.priority,
                        order_sort_key: order.order_number.clone(),
                        qty: take,
                    });
                    remaining -= take;
                }
                if remaining > 0 {
                    // Planned short: emit the task anyway so the operator
                    // confirms the actual count; the short path resolves it.
                    warn!(line_id = %line.id, short = remaining, "wave planned short");
                    drafts.push(TaskDraft {
                        order_id: task_order_id,
                        order_line_id: line.id,
                        variant_id: line.variant_id,
                        location_id: self.any_location(warehouse_id).await?,
                        location_code: String::new(),
                        zone_sequence: i32::MAX,
                        priority: order.priority,
                        order_sort_key: order.order_number.clone(),
                        qty: remaining,
                    });
                }
            }
        }
        if drafts.is_empty() {
            return Err(ServiceError::Validation(
                "selected orders have nothing left to pick".into(),
            ));
        }

        // Stable walk order. Single mode keeps each order contiguous;
        // batch mode interleaves orders along the walk.
        match mode {
            PickMode::Batch => drafts.sort_by(|a, b| {
                a.zone_sequence
                    .cmp(&b.zone_sequence)
                    .then_with(|| natural_cmp(&a.location_code, &b.location_code))
                    .then_with(|| priority_rank(a.priority).cmp(&priority_rank(b.priority)))
            }),
            PickMode::Single => drafts.sort_by(|a, b| {
                a.order_sort_key
                    .cmp(&b.order_sort_key)
                    .then_with(|| a.zone_sequence.cmp(&b.zone_sequence))
                    .then_with(|| natural_cmp(&a.location_code, &b.location_code))
            }),
        }

        let txn = self.db.begin().await?;
        let wave_number = next_document_number(&txn, "wave", "WV").await?;
        let now = Utc::now();
        let wave = pick_wave::ActiveModel {
            id: Set(Uuid::new_v4()),
            wave_number: Set(wave_number),
            warehouse_id: Set(warehouse_id),
            status: Set(WaveStatus::Open),
            mode: Set(mode),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut tasks = Vec::with_capacity(drafts.len());
        for (seq, draft) in drafts.iter().enumerate() {
            let task = pick_task::ActiveModel {
                id: Set(Uuid::new_v4()),
                wave_id: Set(wave.id),
                order_id: Set(draft.order_id),
                order_line_id: Set(draft.order_line_id),
                variant_id: Set(draft.variant_id),
                location_id: Set(draft.location_id),
                qty: Set(draft.qty),
                picked_qty: Set(0),
                sequence: Set(seq as i32 + 1),
                assignee: Set(None),
                status: Set(PickTaskStatus::Pending),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            tasks.push(task);
        }

        for order in &selected {
            let mut active: sales_order::ActiveModel = order.clone().into();
            active.status = Set(SalesOrderStatus::Picking);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }
        txn.commit().await?;

        info!(wave_id = %wave.id, tasks = tasks.len(), "wave generated");
        Ok((wave, tasks))
    }

    async fn any_location(&self, warehouse_id: Uuid) -> ServiceResult<Uuid> {
        crate::entities::location::Entity::find()
            .filter(crate::entities::location::Column::WarehouseId.eq(warehouse_id))
            .order_by_asc(crate::entities::location::Column::Code)
            .one(&*self.db)
            .await?
            .map(|l| l.id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("warehouse {warehouse_id} has no locations"))
            })
    }

    #[instrument(skip(self))]
    pub async fn get_wave(&self, wave_id: Uuid) -> ServiceResult<pick_wave::Model> {
        pick_wave::Entity::find_by_id(wave_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("wave {wave_id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn get_tasks(&self, wave_id: Uuid) -> ServiceResult<Vec<pick_task::Model>> {
        pick_task::Entity::find()
            .filter(pick_task::Column::WaveId.eq(wave_id))
            .order_by_asc(pick_task::Column::Sequence)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn assign_task(&self, task_id: Uuid, assignee: Uuid) -> ServiceResult<pick_task::Model> {
        let task = self.get_task(task_id).await?;
        if task.status != PickTaskStatus::Pending {
            return Err(ServiceError::InvalidTransition(format!(
                "task is {:?}, expected pending",
                task.status
            )));
        }
        let mut active: pick_task::ActiveModel = task.into();
        active.assignee = Set(Some(assignee));
        active.status = Set(PickTaskStatus::InProgress);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(Into::into)
    }

    async fn get_task(&self, task_id: Uuid) -> ServiceResult<pick_task::Model> {
        pick_task::Entity::find_by_id(task_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("pick task {task_id} not found")))
    }

    /// Operator confirms the quantity actually lifted. Short picks try
    /// other locations FIFO; with nothing left the line and order go to
    /// exception. No negative balance is ever created.
    #[instrument(skip(self))]
    pub async fn confirm_pick(
        &self,
        task_id: Uuid,
        actual_qty: i64,
        user_id: Option<Uuid>,
    ) -> ServiceResult<pick_task::Model> {
        if actual_qty < 0 {
            return Err(ServiceError::Validation("picked qty must be non-negative".into()));
        }
        let task = self.get_task(task_id).await?;
        if !matches!(
            task.status,
            PickTaskStatus::Pending | PickTaskStatus::InProgress
        ) {
            return Err(ServiceError::InvalidTransition(format!(
                "task is {:?}",
                task.status
            )));
        }
        if actual_qty > task.qty {
            return Err(ServiceError::Validation(format!(
                "picked {actual_qty} exceeds requested {}",
                task.qty
            )));
        }

        // The on-hand check is the ledger's: a pick beyond the cell fails.
        let available = self
            .inventory
            .balance(
                task.variant_id,
                task.location_id,
                crate::entities::inventory_balance::StockState::OnHand,
            )
            .await?;
        let actual = actual_qty.min(available);

        if actual > 0 {
            let refs = TxnRefs {
                order_id: Some(task.order_id),
                user_id,
                ..Default::default()
            };
            self.inventory
                .pick(task.variant_id, task.location_id, actual, task.order_line_id, refs)
                .await?;
        }

        let short = task.qty - actual;
        let task_id = task.id;
        let wave_id = task.wave_id;
        let order_line_id = task.order_line_id;
        let variant_id = task.variant_id;
        let order_id = task.order_id;

        let mut active: pick_task::ActiveModel = task.into();
        active.picked_qty = Set(actual);
        active.status = Set(if short == 0 {
            PickTaskStatus::Completed
        } else {
            PickTaskStatus::Short
        });
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        // The task may reference a combined-group parent; completion and
        // exceptions roll up to the line's owning order.
        let owner_order_id = self.roll_up_line(order_line_id, actual).await?;

        if short > 0 {
            self.resolve_short(
                wave_id,
                order_id,
                order_line_id,
                variant_id,
                short,
                updated.location_id,
            )
            .await?;
        } else {
            self.maybe_complete_order(owner_order_id).await?;
        }
        self.maybe_complete_wave(wave_id).await?;

        info!(%task_id, picked = actual, short, "pick confirmed");
        Ok(updated)
    }

    async fn roll_up_line(&self, order_line_id: Uuid, picked: i64) -> ServiceResult<Uuid> {
        let line = sales_order_line::Entity::find_by_id(order_line_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("order line {order_line_id} not found"))
            })?;
        let owner = line.order_id;
        if picked == 0 {
            return Ok(owner);
        }
        let new_picked = line.picked_qty + picked;
        let complete = new_picked >= line.ordered_qty;
        let mut active: sales_order_line::ActiveModel = line.into();
        active.picked_qty = Set(new_picked);
        if complete {
            active.status = Set(SalesOrderLineStatus::Picked);
        }
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        Ok(owner)
    }

    /// Short-pick fallback: other same-warehouse locations FIFO (the
    /// shorted bin is out), else the line and its order surface as
    /// exceptions.
    #[allow(clippy::too_many_arguments)]
    async fn resolve_short(
        &self,
        wave_id: Uuid,
        order_id: Uuid,
        order_line_id: Uuid,
        variant_id: Uuid,
        short_qty: i64,
        shorted_location_id: Uuid,
    ) -> ServiceResult<()> {
        let wave = self.get_wave(wave_id).await?;
        let cells: Vec<_> = self
            .inventory
            .on_hand_cells_in_warehouse(variant_id, wave.warehouse_id)
            .await?
            .into_iter()
            .filter(|(loc, _)| loc.id != shorted_location_id)
            .collect();

        let mut remaining = short_qty;
        let now = Utc::now();
        let max_seq = self
            .get_tasks(wave_id)
            .await?
            .iter()
            .map(|t| t.sequence)
            .max()
            .unwrap_or(0);
        let mut seq = max_seq;

        for (loc, qty) in cells {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(qty);
            seq += 1;
            pick_task::ActiveModel {
                id: Set(Uuid::new_v4()),
                wave_id: Set(wave_id),
                order_id: Set(order_id),
                order_line_id: Set(order_line_id),
                variant_id: Set(variant_id),
                location_id: Set(loc.id),
                qty: Set(take),
                picked_qty: Set(0),
                sequence: Set(seq),
                assignee: Set(None),
                status: Set(PickTaskStatus::Pending),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&*self.db)
            .await?;
            remaining -= take;
        }

        if remaining > 0 {
            warn!(%order_line_id, remaining, "short pick with no fallback stock");
            let line = sales_order_line::Entity::find_by_id(order_line_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("order line {order_line_id} not found"))
                })?;
            let owner_order_id = line.order_id;
            let mut active: sales_order_line::ActiveModel = line.into();
            active.status = Set(SalesOrderLineStatus::Exception);
            active.updated_at = Set(now);
            active.update(&*self.db).await?;

            let order = self.orders.get_order(owner_order_id).await?;
            self.orders
                .set_status(order, SalesOrderStatus::Exception)
                .await?;
        }
        Ok(())
    }

    async fn maybe_complete_order(&self, order_id: Uuid) -> ServiceResult<()> {
        let order = self.orders.get_order(order_id).await?;
        if order.status != SalesOrderStatus::Picking {
            return Ok(());
        }
        let lines = self.orders.get_lines(order_id).await?;
        let done = lines.iter().all(|l| {
            matches!(
                l.status,
                SalesOrderLineStatus::Picked
                    | SalesOrderLineStatus::Shipped
                    | SalesOrderLineStatus::Cancelled
            )
        });
        if done {
            self.orders.set_status(order, SalesOrderStatus::Picked).await?;
        }
        Ok(())
    }

    async fn maybe_complete_wave(&self, wave_id: Uuid) -> ServiceResult<()> {
        let tasks = self.get_tasks(wave_id).await?;
        let open = tasks.iter().any(|t| {
            matches!(
                t.status,
                PickTaskStatus::Pending | PickTaskStatus::InProgress
            )
        });
        if !open {
            let wave = self.get_wave(wave_id).await?;
            if wave.status != WaveStatus::Completed {
                let mut active: pick_wave::ActiveModel = wave.into();
                active.status = Set(WaveStatus::Completed);
                active.updated_at = Set(Utc::now());
                active.update(&*self.db).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order_compares_digit_runs_numerically() {
        assert_eq!(natural_cmp("A-2", "A-10"), Ordering::Less);
        assert_eq!(natural_cmp("A-10", "A-2"), Ordering::Greater);
        assert_eq!(natural_cmp("A-10", "A-10"), Ordering::Equal);
        assert_eq!(natural_cmp("A-10", "B-1"), Ordering::Less);
        assert_eq!(natural_cmp("AISLE2-BIN3", "AISLE2-BIN12"), Ordering::Less);
        assert_eq!(natural_cmp("", "A"), Ordering::Less);
    }

    #[test]
    fn rush_orders_rank_first() {
        assert!(priority_rank(Priority::Rush) < priority_rank(Priority::High));
        assert!(priority_rank(Priority::High) < priority_rank(Priority::Normal));
    }
}
