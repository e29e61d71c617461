//! Replenishment: min/max rules over pick faces, task generation, and
//! completion back through the ledger.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::inventory_balance::{self, StockState};
use crate::entities::location::{self, LocationType};
use crate::entities::product_variant;
use crate::entities::replen_rule::{self, ReplenMethod, SourcePriority};
use crate::entities::replen_task::{self, ReplenTaskStatus, ReplenTrigger};
use crate::entities::warehouse;
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::services::inventory::{InventoryService, TxnRefs};
use crate::services::receiving::parse_csv;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRuleInput {
    pub pick_variant_sku: String,
    pub source_variant_sku: String,
    pub warehouse_id: Uuid,
    pub pick_location_type: LocationType,
    pub source_location_type: LocationType,
    #[serde(default)]
    pub source_priority: Option<SourcePriority>,
    pub min_qty: i64,
    pub max_qty: Option<i64>,
    pub replen_method: ReplenMethod,
    #[serde(default)]
    pub priority: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct RuleImportWarning {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Serialize, Default)]
pub struct RuleImportReport {
    pub created: usize,
    pub warnings: Vec<RuleImportWarning>,
}

#[derive(Clone)]
pub struct ReplenishmentService {
    db: Arc<DatabaseConnection>,
    #[allow(dead_code)]
    event_sender: EventSender,
    inventory: InventoryService,
}

impl ReplenishmentService {
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

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    /// Both variants must belong to the same product; the rule is keyed
    /// by that product.
    #[instrument(skip(self))]
    pub async fn create_rule(&self, input: CreateRuleInput) -> ServiceResult<replen_rule::Model> {
        if input.min_qty < 0 {
            return Err(ServiceError::Validation("min_qty must be non-negative".into()));
        }
        if let Some(max) = input.max_qty {
            if max <= input.min_qty {
                return Err(ServiceError::Validation(
                    "max_qty must exceed min_qty".into(),
                ));
            }
        }

        let pick = self.variant_by_sku(&input.pick_variant_sku).await?;
        let source = self.variant_by_sku(&input.source_variant_sku).await?;
        if pick.product_id != source.product_id {
            return Err(ServiceError::Validation(
                "pick and source variants belong to different products".into(),
            ));
        }
        warehouse::Entity::find_by_id(input.warehouse_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("warehouse {} not found", input.warehouse_id))
            })?;

        let now = Utc::now();
        replen_rule::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(pick.product_id),
            warehouse_id: Set(input.warehouse_id),
            pick_variant_id: Set(pick.id),
            source_variant_id: Set(source.id),
            pick_location_type: Set(input.pick_location_type),
            source_location_type: Set(input.source_location_type),
            source_priority: Set(input.source_priority.unwrap_or(SourcePriority::Fifo)),
            min_qty: Set(input.min_qty),
            max_qty: Set(input.max_qty),
            replen_method: Set(input.replen_method),
            priority: Set(input.priority.unwrap_or(1)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(Into::into)
    }

    async fn variant_by_sku(&self, sku: &str) -> ServiceResult<product_variant::Model> {
        product_variant::Entity::find()
            .filter(product_variant::Column::Sku.eq(sku))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("SKU {sku} not found")))
    }

    #[instrument(skip(self))]
    pub async fn list_rules(&self) -> ServiceResult<Vec<replen_rule::Model>> {
        replen_rule::Entity::find()
            .order_by_asc(replen_rule::Column::Priority)
            .order_by_asc(replen_rule::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Bulk rule import. Unresolvable SKUs warn and skip the row; they do
    /// not fail the import. Headers: `pick_sku, source_sku, warehouse,
    /// pick_location_type, source_location_type, min_qty, max_qty?,
    /// replen_method, source_priority?, priority?`.
    #[instrument(skip(self, csv_text))]
    pub async fn import_rules_csv(&self, csv_text: &str) -> ServiceResult<RuleImportReport> {
        let records = parse_csv(csv_text);
        let header: Vec<String> = records
            .first()
            .ok_or_else(|| ServiceError::Validation("empty CSV".into()))?
            .iter()
            .map(|c| c.trim().to_lowercase())
            .collect();
        let col = |name: &str| header.iter().position(|h| h == name);
        let need = |name: &str| {
            col(name).ok_or_else(|| {
                ServiceError::Validation(format!("CSV is missing the {name} column"))
            })
        };
        let pick_idx = need("pick_sku")?;
        let source_idx = need("source_sku")?;
        let wh_idx = need("warehouse")?;
        let plt_idx = need("pick_location_type")?;
        let slt_idx = need("source_location_type")?;
        let min_idx = need("min_qty")?;
        let method_idx = need("replen_method")?;
        let max_idx = col("max_qty");
        let sp_idx = col("source_priority");
        let prio_idx = col("priority");

        let mut report = RuleImportReport::default();
        for (row_no, record) in records.iter().enumerate().skip(1) {
            if record.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            let outcome = self
                .import_rule_row(
                    record, pick_idx, source_idx, wh_idx, plt_idx, slt_idx, min_idx, method_idx,
                    max_idx, sp_idx, prio_idx,
                )
                .await;
            match outcome {
                Ok(()) => report.created += 1,
                Err(e) => {
                    warn!(row = row_no + 1, "rule import row skipped: {e}");
                    report.warnings.push(RuleImportWarning {
                        row: row_no + 1,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn import_rule_row(
        &self,
        record: &[String],
        pick_idx: usize,
        source_idx: usize,
        wh_idx: usize,
        plt_idx: usize,
        slt_idx: usize,
        min_idx: usize,
        method_idx: usize,
        max_idx: Option<usize>,
        sp_idx: Option<usize>,
        prio_idx: Option<usize>,
    ) -> ServiceResult<()> {
        let cell = |idx: usize| -> String {
            record.get(idx).map(|c| c.trim().to_string()).unwrap_or_default()
        };
        let opt_cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| record.get(i))
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
        };

        let warehouse_code = cell(wh_idx);
        let wh = warehouse::Entity::find()
            .filter(warehouse::Column::Code.eq(warehouse_code.clone()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("warehouse {warehouse_code} not found"))
            })?;

        let parse_location_type = |s: &str| -> ServiceResult<LocationType> {
            serde_json::from_value(serde_json::Value::String(s.to_string()))
                .map_err(|_| ServiceError::Validation(format!("unknown location type {s}")))
        };
        let parse_method = |s: &str| -> ServiceResult<ReplenMethod> {
            serde_json::from_value(serde_json::Value::String(s.to_string()))
                .map_err(|_| ServiceError::Validation(format!("unknown replen method {s}")))
        };
        let parse_source_priority = |s: &str| -> ServiceResult<SourcePriority> {
            serde_json::from_value(serde_json::Value::String(s.to_string()))
                .map_err(|_| ServiceError::Validation(format!("unknown source priority {s}")))
        };

        let min_qty: i64 = cell(min_idx)
            .parse()
            .map_err(|_| ServiceError::Validation("min_qty is not a number".into()))?;
        let max_qty: Option<i64> = opt_cell(max_idx)
            .map(|c| c.parse())
            .transpose()
            .map_err(|_| ServiceError::Validation("max_qty is not a number".into()))?;
        let priority: Option<i32> = opt_cell(prio_idx)
            .map(|c| c.parse())
            .transpose()
            .map_err(|_| ServiceError::Validation("priority is not a number".into()))?;

        self.create_rule(CreateRuleInput {
            pick_variant_sku: cell(pick_idx),
            source_variant_sku: cell(source_idx),
            warehouse_id: wh.id,
            pick_location_type: parse_location_type(&cell(plt_idx))?,
            source_location_type: parse_location_type(&cell(slt_idx))?,
            source_priority: opt_cell(sp_idx)
                .map(|s| parse_source_priority(&s))
                .transpose()?,
            min_qty,
            max_qty,
            replen_method: parse_method(&cell(method_idx))?,
            priority,
        })
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Evaluate every active rule and emit tasks for pick faces at or
    /// below their minimum. A pending or in-flight task for the same
    /// `(pick_variant, to_location)` suppresses new ones.
    #[instrument(skip(self))]
    pub async fn generate(&self, trigger: ReplenTrigger) -> ServiceResult<Vec<replen_task::Model>> {
        let rules = replen_rule::Entity::find()
            .filter(replen_rule::Column::IsActive.eq(true))
            .order_by_asc(replen_rule::Column::Priority)
            .all(&*self.db)
            .await?;

        let mut created = Vec::new();
        for rule in rules {
            let mut tasks = self.generate_for_rule(&rule, trigger).await?;
            created.append(&mut tasks);
        }
        info!(tasks = created.len(), "replenishment generation finished");
        Ok(created)
    }

    async fn generate_for_rule(
        &self,
        rule: &replen_rule::Model,
        trigger: ReplenTrigger,
    ) -> ServiceResult<Vec<replen_task::Model>> {
        let pick_variant = product_variant::Entity::find_by_id(rule.pick_variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("variant {} not found", rule.pick_variant_id))
            })?;
        let source_variant = product_variant::Entity::find_by_id(rule.source_variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("variant {} not found", rule.source_variant_id))
            })?;

        // 1-2: current pick-face stock in base units.
        let pick_locations = location::Entity::find()
            .filter(location::Column::WarehouseId.eq(rule.warehouse_id))
            .filter(location::Column::LocationType.eq(rule.pick_location_type))
            .order_by_asc(location::Column::Code)
            .all(&*self.db)
            .await?;
        if pick_locations.is_empty() {
            return Ok(Vec::new());
        }
        let pick_location_ids: Vec<Uuid> = pick_locations.iter().map(|l| l.id).collect();
        let pick_balances = inventory_balance::Entity::find()
            .filter(inventory_balance::Column::VariantId.eq(pick_variant.id))
            .filter(inventory_balance::Column::LocationId.is_in(pick_location_ids.clone()))
            .filter(inventory_balance::Column::State.eq(StockState::OnHand))
            .all(&*self.db)
            .await?;
        let current_base: i64 = pick_balances
            .iter()
            .map(|b| b.quantity * pick_variant.units_per_variant)
            .sum();

        if current_base > rule.min_qty {
            return Ok(Vec::new());
        }

        // 3: target. Without a max, pull exactly one source unit's worth.
        let target_base = rule
            .max_qty
            .unwrap_or(current_base + source_variant.units_per_variant);
        let mut needed_base = target_base - current_base;
        if needed_base <= 0 {
            return Ok(Vec::new());
        }

        // Destination: the neediest pick face (lowest on-hand, then code).
        let to_location = pick_locations
            .iter()
            .min_by_key(|l| {
                let qty = pick_balances
                    .iter()
                    .find(|b| b.location_id == l.id)
                    .map(|b| b.quantity)
                    .unwrap_or(0);
                (qty, l.code.clone())
            })
            .ok_or_else(|| ServiceError::Internal("no pick location candidates".into()))?;

        // 6: dedup against open tasks for the same pick face.
        let open = replen_task::Entity::find()
            .filter(replen_task::Column::PickVariantId.eq(pick_variant.id))
            .filter(replen_task::Column::ToLocationId.eq(to_location.id))
            .filter(replen_task::Column::Status.is_in([
                ReplenTaskStatus::Pending,
                ReplenTaskStatus::Assigned,
                ReplenTaskStatus::InProgress,
            ]))
            .one(&*self.db)
            .await?;
        if open.is_some() {
            return Ok(Vec::new());
        }

        // 4: source cells in the rule's source bins, ordered by policy.
        let source_locations = location::Entity::find()
            .filter(location::Column::WarehouseId.eq(rule.warehouse_id))
            .filter(location::Column::LocationType.eq(rule.source_location_type))
            .all(&*self.db)
            .await?;
        let source_location_ids: Vec<Uuid> = source_locations.iter().map(|l| l.id).collect();
        let mut source_cells = inventory_balance::Entity::find()
            .filter(inventory_balance::Column::VariantId.eq(source_variant.id))
            .filter(inventory_balance::Column::LocationId.is_in(source_location_ids))
            .filter(inventory_balance::Column::State.eq(StockState::OnHand))
            .filter(inventory_balance::Column::Quantity.gt(0))
            .all(&*self.db)
            .await?;
        match rule.source_priority {
            SourcePriority::Fifo => source_cells.sort_by_key(|b| b.created_at),
            SourcePriority::SmallestFirst => source_cells.sort_by_key(|b| (b.quantity, b.created_at)),
        }

        // 5: size tasks by method.
        let per_source = source_variant.units_per_variant;
        let wanted_source_units = match rule.replen_method {
            ReplenMethod::CaseBreak => 1,
            ReplenMethod::FullCase | ReplenMethod::PalletDrop => {
                (needed_base + per_source - 1) / per_source
            }
        };

        let now = Utc::now();
        let mut created = Vec::new();
        let mut remaining_source_units = wanted_source_units;
        for cell in source_cells {
            if remaining_source_units == 0 || needed_base <= 0 {
                break;
            }
            let take = remaining_source_units.min(cell.quantity);
            if take == 0 {
                continue;
            }
            let qty_target_units = match rule.replen_method {
                ReplenMethod::CaseBreak => {
                    take * per_source / pick_variant.units_per_variant
                }
                ReplenMethod::FullCase | ReplenMethod::PalletDrop => take,
            };
            let task = replen_task::ActiveModel {
                id: Set(Uuid::new_v4()),
                rule_id: Set(Some(rule.id)),
                from_location_id: Set(cell.location_id),
                to_location_id: Set(to_location.id),
                variant_id: Set(source_variant.id),
                pick_variant_id: Set(pick_variant.id),
                qty_source_units: Set(take),
                qty_target_units: Set(qty_target_units),
                qty_completed: Set(0),
                status: Set(ReplenTaskStatus::Pending),
                triggered_by: Set(trigger),
                priority: Set(rule.priority),
                assigned_to: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&*self.db)
            .await?;
            created.push(task);
            remaining_source_units -= take;
            needed_base -= take * per_source;
        }

        Ok(created)
    }

    // ------------------------------------------------------------------
    // Task lifecycle
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn list_tasks(
        &self,
        status: Option<ReplenTaskStatus>,
    ) -> ServiceResult<Vec<replen_task::Model>> {
        let mut query = replen_task::Entity::find();
        if let Some(s) = status {
            query = query.filter(replen_task::Column::Status.eq(s));
        }
        query
            .order_by_asc(replen_task::Column::Priority)
            .order_by_asc(replen_task::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn assign_task(
        &self,
        task_id: Uuid,
        assignee: Uuid,
    ) -> ServiceResult<replen_task::Model> {
        let task = self.get_task(task_id).await?;
        if task.status != ReplenTaskStatus::Pending {
            return Err(ServiceError::InvalidTransition(format!(
                "task is {:?}, expected pending",
                task.status
            )));
        }
        let mut active: replen_task::ActiveModel = task.into();
        active.assigned_to = Set(Some(assignee));
        active.status = Set(ReplenTaskStatus::Assigned);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn start_task(&self, task_id: Uuid) -> ServiceResult<replen_task::Model> {
        let task = self.get_task(task_id).await?;
        if !matches!(
            task.status,
            ReplenTaskStatus::Pending | ReplenTaskStatus::Assigned
        ) {
            return Err(ServiceError::InvalidTransition(format!(
                "task is {:?}",
                task.status
            )));
        }
        let mut active: replen_task::ActiveModel = task.into();
        active.status = Set(ReplenTaskStatus::InProgress);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(Into::into)
    }

    /// Completing a task posts the stock movement: a plain transfer when
    /// the variants match, a case-break conversion otherwise.
    #[instrument(skip(self))]
    pub async fn complete_task(
        &self,
        task_id: Uuid,
        user_id: Option<Uuid>,
    ) -> ServiceResult<replen_task::Model> {
        let task = self.get_task(task_id).await?;
        if matches!(
            task.status,
            ReplenTaskStatus::Completed | ReplenTaskStatus::Cancelled
        ) {
            return Err(ServiceError::InvalidTransition(format!(
                "task is {:?}",
                task.status
            )));
        }

        let refs = TxnRefs {
            reference: Some(format!("replen task {}", task.id)),
            user_id,
            ..Default::default()
        };
        if task.variant_id == task.pick_variant_id {
            self.inventory
                .transfer(
                    task.variant_id,
                    task.from_location_id,
                    task.to_location_id,
                    task.qty_source_units,
                    refs,
                )
                .await?;
        } else {
            self.inventory
                .replenish_move(
                    task.variant_id,
                    task.from_location_id,
                    task.qty_source_units,
                    task.pick_variant_id,
                    task.to_location_id,
                    task.qty_target_units,
                    refs,
                )
                .await?;
        }

        let qty = task.qty_source_units;
        let task_id = task.id;
        let mut active: replen_task::ActiveModel = task.into();
        active.status = Set(ReplenTaskStatus::Completed);
        active.qty_completed = Set(qty);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send(Event::ReplenTaskCompleted { task_id })
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn cancel_task(&self, task_id: Uuid) -> ServiceResult<replen_task::Model> {
        let task = self.get_task(task_id).await?;
        if task.status == ReplenTaskStatus::Completed {
            return Err(ServiceError::InvalidTransition(
                "completed tasks cannot be cancelled".into(),
            ));
        }
        let mut active: replen_task::ActiveModel = task.into();
        active.status = Set(ReplenTaskStatus::Cancelled);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(Into::into)
    }

    async fn get_task(&self, task_id: Uuid) -> ServiceResult<replen_task::Model> {
        replen_task::Entity::find_by_id(task_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("replen task {task_id} not found")))
    }
}
