//! Inbound shipments and landed cost.
//!
//! The allocation engine is two pure rules (effective amount, per-line
//! basis) plus a remainder rule: integer shares floor, and the leftover
//! cents land on the line with the largest basis.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::inbound_shipment::{self, AllocationMethod, ShipmentMode, ShipmentStatus};
use crate::entities::inbound_shipment_line;
use crate::entities::inventory_lot;
use crate::entities::landed_cost_snapshot;
use crate::entities::purchase_order_line;
use crate::entities::shipment_cost::{self, CostType};
use crate::entities::shipment_cost_allocation;
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::services::{map_unique_violation, next_document_number};

const ALLOWED_TRANSITIONS: &[(ShipmentStatus, ShipmentStatus)] = &[
    (ShipmentStatus::Draft, ShipmentStatus::Booked),
    (ShipmentStatus::Booked, ShipmentStatus::InTransit),
    (ShipmentStatus::InTransit, ShipmentStatus::AtPort),
    (ShipmentStatus::AtPort, ShipmentStatus::CustomsClearance),
    (ShipmentStatus::CustomsClearance, ShipmentStatus::Delivered),
    (ShipmentStatus::Delivered, ShipmentStatus::Costing),
    (ShipmentStatus::Costing, ShipmentStatus::Closed),
];

pub fn can_transition(from: ShipmentStatus, to: ShipmentStatus) -> bool {
    if to == ShipmentStatus::Cancelled {
        return !matches!(from, ShipmentStatus::Closed | ShipmentStatus::Cancelled);
    }
    ALLOWED_TRANSITIONS.contains(&(from, to))
}

/// Actual cost wins over the estimate once captured.
pub fn effective_amount(cost: &shipment_cost::Model) -> i64 {
    cost.actual_cents.unwrap_or(cost.estimated_cents)
}

/// Method precedence: cost-type override, explicit method on the cost,
/// shipment default, then the mode default table.
pub fn resolve_method(
    cost: &shipment_cost::Model,
    shipment: &inbound_shipment::Model,
) -> AllocationMethod {
    match cost.cost_type {
        CostType::Duty => return AllocationMethod::ByValue,
        CostType::Brokerage | CostType::Inspection => return AllocationMethod::ByLineCount,
        _ => {}
    }
    if let Some(method) = cost.allocation_method {
        return method;
    }
    if let Some(method) = shipment.allocation_method_default {
        return method;
    }
    match shipment.mode {
        ShipmentMode::SeaFcl | ShipmentMode::SeaLcl => AllocationMethod::ByVolume,
        ShipmentMode::Air => AllocationMethod::ByChargeableWeight,
        ShipmentMode::Ground
        | ShipmentMode::Ltl
        | ShipmentMode::Ftl
        | ShipmentMode::Parcel
        | ShipmentMode::Courier => AllocationMethod::ByWeight,
    }
}

/// Per-line basis value for a method. Value bases need the PO unit cost,
/// supplied by the caller per line.
pub fn basis_for_method(
    line: &inbound_shipment_line::Model,
    method: AllocationMethod,
    po_unit_cost_cents: i64,
) -> i64 {
    match method {
        AllocationMethod::ByVolume => line.gross_volume_cm3.unwrap_or(line.total_volume_cm3),
        AllocationMethod::ByChargeableWeight => line.chargeable_weight_grams,
        AllocationMethod::ByWeight => line.total_weight_grams,
        AllocationMethod::ByValue => po_unit_cost_cents * line.qty_shipped,
        AllocationMethod::ByLineCount => 1,
    }
}

/// Split `effective` cents across `bases`. Shares floor; the remainder
/// goes to the largest basis (first among ties). A zero basis total falls
/// back to an even split.
pub fn allocate_cents(effective: i64, bases: &[i64]) -> Vec<i64> {
    if bases.is_empty() {
        return Vec::new();
    }
    let basis_total: i64 = bases.iter().sum();
    let (mut shares, largest_idx): (Vec<i64>, usize) = if basis_total == 0 {
        let even = effective / bases.len() as i64;
        (vec![even; bases.len()], 0)
    } else {
        let shares: Vec<i64> = bases
            .iter()
            .map(|b| ((effective as i128 * *b as i128) / basis_total as i128) as i64)
            .collect();
        let largest = bases
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
            .map(|(i, _)| i)
            .unwrap_or(0);
        (shares, largest)
    };
    let remainder = effective - shares.iter().sum::<i64>();
    shares[largest_idx] += remainder;
    shares
}

/// Chargeable weight in grams: actual weight or volumetric (1:5000),
/// whichever is greater, per unit.
pub fn chargeable_weight_grams(qty: i64, unit_weight_grams: i64, unit_volume_cm3: i64) -> i64 {
    qty * unit_weight_grams.max(unit_volume_cm3 / 5)
}

/// Half-up division for unit costs.
fn div_round(total: i64, qty: i64) -> i64 {
    if qty <= 0 {
        return 0;
    }
    (total + qty / 2) / qty
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateShipmentInput {
    pub mode: ShipmentMode,
    pub carrier: Option<String>,
    pub forwarder: Option<String>,
    pub origin_port: Option<String>,
    pub destination_port: Option<String>,
    pub container_number: Option<String>,
    pub bol_number: Option<String>,
    pub tracking_number: Option<String>,
    pub etd: Option<NaiveDate>,
    pub eta: Option<NaiveDate>,
    pub allocation_method_default: Option<AllocationMethod>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentLineInput {
    pub po_line_id: Option<Uuid>,
    pub variant_id: Uuid,
    pub qty_shipped: i64,
    #[serde(default)]
    pub unit_weight_grams: i64,
    #[serde(default)]
    pub unit_length_mm: i32,
    #[serde(default)]
    pub unit_width_mm: i32,
    #[serde(default)]
    pub unit_height_mm: i32,
    pub gross_volume_cm3: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentCostInput {
    pub cost_type: CostType,
    pub estimated_cents: i64,
    pub actual_cents: Option<i64>,
    pub allocation_method: Option<AllocationMethod>,
}

#[derive(Clone)]
pub struct ShipmentService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ShipmentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_shipment(
        &self,
        input: CreateShipmentInput,
    ) -> ServiceResult<inbound_shipment::Model> {
        let txn = self.db.begin().await?;
        let number = next_document_number(&txn, "shipment", "SHP").await?;
        let now = Utc::now();
        let created = inbound_shipment::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipment_number: Set(number),
            mode: Set(input.mode),
            carrier: Set(input.carrier),
            forwarder: Set(input.forwarder),
            origin_port: Set(input.origin_port),
            destination_port: Set(input.destination_port),
            container_number: Set(input.container_number),
            bol_number: Set(input.bol_number),
            tracking_number: Set(input.tracking_number),
            etd: Set(input.etd),
            eta: Set(input.eta),
            allocation_method_default: Set(input.allocation_method_default),
            total_weight_grams: Set(0),
            total_volume_cm3: Set(0),
            total_pieces: Set(0),
            total_cartons: Set(0),
            estimated_total_cost_cents: Set(0),
            actual_total_cost_cents: Set(0),
            status: Set(ShipmentStatus::Draft),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| map_unique_violation(e, "shipment number"))?;
        txn.commit().await?;
        info!(shipment_id = %created.id, number = %created.shipment_number, "inbound shipment created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_shipment(&self, shipment_id: Uuid) -> ServiceResult<inbound_shipment::Model> {
        inbound_shipment::Entity::find_by_id(shipment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("shipment {shipment_id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn get_lines(
        &self,
        shipment_id: Uuid,
    ) -> ServiceResult<Vec<inbound_shipment_line::Model>> {
        inbound_shipment_line::Entity::find()
            .filter(inbound_shipment_line::Column::ShipmentId.eq(shipment_id))
            .order_by_asc(inbound_shipment_line::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn get_costs(&self, shipment_id: Uuid) -> ServiceResult<Vec<shipment_cost::Model>> {
        shipment_cost::Entity::find()
            .filter(shipment_cost::Column::ShipmentId.eq(shipment_id))
            .order_by_asc(shipment_cost::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        shipment_id: Uuid,
        input: ShipmentLineInput,
    ) -> ServiceResult<inbound_shipment_line::Model> {
        if input.qty_shipped <= 0 {
            return Err(ServiceError::Validation("qty_shipped must be positive".into()));
        }
        let shipment = self.get_shipment(shipment_id).await?;
        self.ensure_open(&shipment)?;

        // mm^3 -> cm^3
        let unit_volume_cm3 = (input.unit_length_mm as i64
            * input.unit_width_mm as i64
            * input.unit_height_mm as i64)
            / 1000;

        let now = Utc::now();
        let txn = self.db.begin().await?;
        let line = inbound_shipment_line::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(shipment_id),
            po_line_id: Set(input.po_line_id),
            variant_id: Set(input.variant_id),
            qty_shipped: Set(input.qty_shipped),
            unit_weight_grams: Set(input.unit_weight_grams),
            unit_length_mm: Set(input.unit_length_mm),
            unit_width_mm: Set(input.unit_width_mm),
            unit_height_mm: Set(input.unit_height_mm),
            total_weight_grams: Set(input.qty_shipped * input.unit_weight_grams),
            total_volume_cm3: Set(input.qty_shipped * unit_volume_cm3),
            gross_volume_cm3: Set(input.gross_volume_cm3),
            chargeable_weight_grams: Set(chargeable_weight_grams(
                input.qty_shipped,
                input.unit_weight_grams,
                unit_volume_cm3,
            )),
            allocated_cost_cents: Set(0),
            landed_unit_cost_cents: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        Self::recompute_aggregates(&txn, shipment_id).await?;
        txn.commit().await?;
        Ok(line)
    }

    #[instrument(skip(self))]
    pub async fn add_cost(
        &self,
        shipment_id: Uuid,
        input: ShipmentCostInput,
    ) -> ServiceResult<shipment_cost::Model> {
        let shipment = self.get_shipment(shipment_id).await?;
        self.ensure_open(&shipment)?;
        if input.estimated_cents < 0 || input.actual_cents.map(|a| a < 0).unwrap_or(false) {
            return Err(ServiceError::Validation("cost amounts must be non-negative".into()));
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;
        let cost = shipment_cost::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(shipment_id),
            cost_type: Set(input.cost_type),
            estimated_cents: Set(input.estimated_cents),
            actual_cents: Set(input.actual_cents),
            allocation_method: Set(input.allocation_method),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        Self::recompute_aggregates(&txn, shipment_id).await?;
        txn.commit().await?;
        Ok(cost)
    }

    /// Capture the invoiced amount for a cost.
    #[instrument(skip(self))]
    pub async fn set_actual_cost(
        &self,
        cost_id: Uuid,
        actual_cents: i64,
    ) -> ServiceResult<shipment_cost::Model> {
        if actual_cents < 0 {
            return Err(ServiceError::Validation("cost amounts must be non-negative".into()));
        }
        let cost = shipment_cost::Entity::find_by_id(cost_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("shipment cost {cost_id} not found")))?;
        let shipment = self.get_shipment(cost.shipment_id).await?;
        self.ensure_open(&shipment)?;

        let txn = self.db.begin().await?;
        let mut active: shipment_cost::ActiveModel = cost.into();
        active.actual_cents = Set(Some(actual_cents));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        Self::recompute_aggregates(&txn, shipment.id).await?;
        txn.commit().await?;
        Ok(updated)
    }

    fn ensure_open(&self, shipment: &inbound_shipment::Model) -> ServiceResult<()> {
        if matches!(
            shipment.status,
            ShipmentStatus::Closed | ShipmentStatus::Cancelled
        ) {
            return Err(ServiceError::InvalidTransition(format!(
                "shipment is {}",
                shipment.status
            )));
        }
        Ok(())
    }

    async fn recompute_aggregates(
        txn: &DatabaseTransaction,
        shipment_id: Uuid,
    ) -> ServiceResult<()> {
        let lines = inbound_shipment_line::Entity::find()
            .filter(inbound_shipment_line::Column::ShipmentId.eq(shipment_id))
            .all(txn)
            .await?;
        let costs = shipment_cost::Entity::find()
            .filter(shipment_cost::Column::ShipmentId.eq(shipment_id))
            .all(txn)
            .await?;

        let shipment = inbound_shipment::Entity::find_by_id(shipment_id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("shipment {shipment_id} not found")))?;

        let mut active: inbound_shipment::ActiveModel = shipment.into();
        active.total_weight_grams = Set(lines.iter().map(|l| l.total_weight_grams).sum());
        active.total_volume_cm3 = Set(lines
            .iter()
            .map(|l| l.gross_volume_cm3.unwrap_or(l.total_volume_cm3))
            .sum());
        active.total_pieces = Set(lines.iter().map(|l| l.qty_shipped).sum());
        active.total_cartons = Set(lines.len() as i64);
        active.estimated_total_cost_cents = Set(costs.iter().map(|c| c.estimated_cents).sum());
        active.actual_total_cost_cents = Set(costs.iter().map(effective_amount).sum());
        active.updated_at = Set(Utc::now());
        active.update(txn).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        shipment_id: Uuid,
        to: ShipmentStatus,
    ) -> ServiceResult<inbound_shipment::Model> {
        let shipment = self.get_shipment(shipment_id).await?;
        let from = shipment.status;
        if !can_transition(from, to) {
            return Err(ServiceError::InvalidTransition(format!(
                "shipment cannot move {from} -> {to}"
            )));
        }
        if to == ShipmentStatus::Booked {
            let lines = self.get_lines(shipment_id).await?;
            if lines.is_empty() {
                return Err(ServiceError::Validation(
                    "cannot book a shipment without lines".into(),
                ));
            }
        }
        if to == ShipmentStatus::Closed {
            // Closing finalizes landed costs first.
            self.finalize(shipment_id).await?;
        }

        let mut active: inbound_shipment::ActiveModel = shipment.into();
        active.status = Set(to);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;
        info!(shipment_id = %updated.id, %from, %to, "shipment transitioned");
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Allocation & finalization
    // ------------------------------------------------------------------

    /// Delete previous allocations and re-run the engine for every cost
    /// with a nonzero effective amount. Deterministic for an unchanged
    /// shipment.
    #[instrument(skip(self))]
    pub async fn run_allocation(&self, shipment_id: Uuid) -> ServiceResult<()> {
        let shipment = self.get_shipment(shipment_id).await?;
        let lines = self.get_lines(shipment_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::Validation(
                "shipment has no lines to allocate against".into(),
            ));
        }
        let costs = self.get_costs(shipment_id).await?;
        let po_costs = self.po_unit_costs(&lines).await?;

        let txn = self.db.begin().await?;
        Self::run_allocation_on(&txn, &shipment, &lines, &costs, &po_costs).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn run_allocation_on(
        txn: &DatabaseTransaction,
        shipment: &inbound_shipment::Model,
        lines: &[inbound_shipment_line::Model],
        costs: &[shipment_cost::Model],
        po_costs: &HashMap<Uuid, i64>,
    ) -> ServiceResult<()> {
        let cost_ids: Vec<Uuid> = costs.iter().map(|c| c.id).collect();
        shipment_cost_allocation::Entity::delete_many()
            .filter(shipment_cost_allocation::Column::ShipmentCostId.is_in(cost_ids))
            .exec(txn)
            .await?;

        let mut allocated_per_line: HashMap<Uuid, i64> = HashMap::new();

        for cost in costs {
            let effective = effective_amount(cost);
            if effective == 0 {
                continue;
            }
            let method = resolve_method(cost, shipment);
            let bases: Vec<i64> = lines
                .iter()
                .map(|l| {
                    let po_cost = l
                        .po_line_id
                        .and_then(|id| po_costs.get(&id).copied())
                        .unwrap_or(0);
                    basis_for_method(l, method, po_cost)
                })
                .collect();
            let basis_total: i64 = bases.iter().sum();
            let shares = allocate_cents(effective, &bases);

            for ((line, basis), share) in lines.iter().zip(&bases).zip(&shares) {
                let share_bps = if basis_total > 0 {
                    ((*basis as i128 * 10_000) / basis_total as i128) as i32
                } else {
                    (10_000 / lines.len() as i128) as i32
                };
                shipment_cost_allocation::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    shipment_cost_id: Set(cost.id),
                    shipment_line_id: Set(line.id),
                    allocated_cents: Set(*share),
                    basis_value: Set(*basis),
                    basis_total: Set(basis_total),
                    share_bps: Set(share_bps),
                    created_at: Set(Utc::now()),
                }
                .insert(txn)
                .await?;
                *allocated_per_line.entry(line.id).or_insert(0) += share;
            }
        }

        for line in lines {
            let total = allocated_per_line.get(&line.id).copied().unwrap_or(0);
            let mut active: inbound_shipment_line::ActiveModel = line.clone().into();
            active.allocated_cost_cents = Set(total);
            active.updated_at = Set(Utc::now());
            active.update(txn).await?;
        }
        Ok(())
    }

    async fn po_unit_costs(
        &self,
        lines: &[inbound_shipment_line::Model],
    ) -> ServiceResult<HashMap<Uuid, i64>> {
        let po_line_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.po_line_id).collect();
        if po_line_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = purchase_order_line::Entity::find()
            .filter(purchase_order_line::Column::Id.is_in(po_line_ids))
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(|l| (l.id, l.unit_cost_cents)).collect())
    }

    /// Run allocation, write one landed-cost snapshot per line, and push
    /// the landed unit cost onto provisional lots for the same PO line.
    #[instrument(skip(self))]
    pub async fn finalize(&self, shipment_id: Uuid) -> ServiceResult<Vec<landed_cost_snapshot::Model>> {
        let shipment = self.get_shipment(shipment_id).await?;
        if matches!(
            shipment.status,
            ShipmentStatus::Closed | ShipmentStatus::Cancelled
        ) {
            return Err(ServiceError::InvalidTransition(format!(
                "shipment is {} and can no longer be finalized",
                shipment.status
            )));
        }
        let lines = self.get_lines(shipment_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::Validation("shipment has no lines".into()));
        }
        let costs = self.get_costs(shipment_id).await?;
        let po_costs = self.po_unit_costs(&lines).await?;

        let txn = self.db.begin().await?;
        Self::run_allocation_on(&txn, &shipment, &lines, &costs, &po_costs).await?;

        // Re-read lines: allocation updated allocated_cost_cents.
        let lines = inbound_shipment_line::Entity::find()
            .filter(inbound_shipment_line::Column::ShipmentId.eq(shipment_id))
            .order_by_asc(inbound_shipment_line::Column::CreatedAt)
            .all(&txn)
            .await?;

        // Per-cost-type rollups for the snapshot columns.
        let allocations = shipment_cost_allocation::Entity::find()
            .filter(
                shipment_cost_allocation::Column::ShipmentCostId
                    .is_in(costs.iter().map(|c| c.id).collect::<Vec<_>>()),
            )
            .all(&txn)
            .await?;
        let cost_types: HashMap<Uuid, CostType> =
            costs.iter().map(|c| (c.id, c.cost_type)).collect();

        let line_ids: Vec<Uuid> = lines.iter().map(|l| l.id).collect();
        landed_cost_snapshot::Entity::delete_many()
            .filter(landed_cost_snapshot::Column::ShipmentLineId.is_in(line_ids))
            .exec(&txn)
            .await?;

        let now = Utc::now();
        let mut snapshots = Vec::with_capacity(lines.len());
        for line in &lines {
            let mut freight = 0i64;
            let mut duty = 0i64;
            let mut insurance = 0i64;
            let mut other = 0i64;
            for alloc in allocations.iter().filter(|a| a.shipment_line_id == line.id) {
                match cost_types.get(&alloc.shipment_cost_id) {
                    Some(CostType::Freight) => freight += alloc.allocated_cents,
                    Some(CostType::Duty) => duty += alloc.allocated_cents,
                    Some(CostType::Insurance) => insurance += alloc.allocated_cents,
                    _ => other += alloc.allocated_cents,
                }
            }

            let po_unit_cost = line
                .po_line_id
                .and_then(|id| po_costs.get(&id).copied())
                .unwrap_or(0);
            let total_landed = po_unit_cost * line.qty_shipped + line.allocated_cost_cents;
            let landed_unit = div_round(total_landed, line.qty_shipped);

            let snapshot = landed_cost_snapshot::ActiveModel {
                id: Set(Uuid::new_v4()),
                shipment_line_id: Set(line.id),
                po_unit_cost_cents: Set(po_unit_cost),
                freight_cents: Set(freight),
                duty_cents: Set(duty),
                insurance_cents: Set(insurance),
                other_cents: Set(other),
                total_landed_cents: Set(total_landed),
                landed_unit_cost_cents: Set(landed_unit),
                qty: Set(line.qty_shipped),
                finalized_at: Set(now),
            }
            .insert(&txn)
            .await?;

            let mut active: inbound_shipment_line::ActiveModel = line.clone().into();
            active.landed_unit_cost_cents = Set(Some(landed_unit));
            active.updated_at = Set(now);
            active.update(&txn).await?;

            // Landed unit cost flows into the provisional lots created at
            // receipt for the same PO line.
            if let Some(po_line_id) = line.po_line_id {
                let lots = inventory_lot::Entity::find()
                    .filter(inventory_lot::Column::PoLineId.eq(po_line_id))
                    .filter(inventory_lot::Column::IsProvisional.eq(true))
                    .all(&txn)
                    .await?;
                for lot in lots {
                    let mut active: inventory_lot::ActiveModel = lot.into();
                    active.landed_unit_cost_cents = Set(Some(landed_unit));
                    active.is_provisional = Set(false);
                    active.updated_at = Set(now);
                    active.update(&txn).await?;
                }
            }

            snapshots.push(snapshot);
        }
        txn.commit().await?;

        self.event_sender
            .send(Event::ShipmentFinalized { shipment_id })
            .await;
        info!(%shipment_id, lines = snapshots.len(), "landed costs finalized");
        Ok(snapshots)
    }

    #[instrument(skip(self))]
    pub async fn get_allocations(
        &self,
        shipment_id: Uuid,
    ) -> ServiceResult<Vec<shipment_cost_allocation::Model>> {
        let costs = self.get_costs(shipment_id).await?;
        shipment_cost_allocation::Entity::find()
            .filter(
                shipment_cost_allocation::Column::ShipmentCostId
                    .is_in(costs.iter().map(|c| c.id).collect::<Vec<_>>()),
            )
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn list_shipments(
        &self,
        status: Option<ShipmentStatus>,
    ) -> ServiceResult<Vec<inbound_shipment::Model>> {
        let mut query = inbound_shipment::Entity::find();
        if let Some(s) = status {
            query = query.filter(inbound_shipment::Column::Status.eq(s));
        }
        query
            .order_by_desc(inbound_shipment::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn odd_cent_remainder_lands_on_largest_basis() {
        // Two equal volumes, 10001 cents of freight.
        let shares = allocate_cents(10_001, &[500, 500]);
        assert_eq!(shares.iter().sum::<i64>(), 10_001);
        assert_eq!(shares, vec![5_001, 5_000]);
    }

    #[test]
    fn larger_basis_takes_the_remainder() {
        let shares = allocate_cents(101, &[1, 2]);
        assert_eq!(shares.iter().sum::<i64>(), 101);
        // floor(101/3)=33 for the small line, the rest on the large one.
        assert_eq!(shares, vec![33, 68]);
    }

    #[test]
    fn zero_basis_total_splits_evenly() {
        let shares = allocate_cents(900, &[0, 0, 0]);
        assert_eq!(shares.iter().sum::<i64>(), 900);
        assert_eq!(shares, vec![300, 300, 300]);
    }

    #[test]
    fn chargeable_weight_takes_the_greater_of_actual_and_volumetric() {
        // 2 kg unit, tiny volume: actual wins.
        assert_eq!(chargeable_weight_grams(3, 2_000, 1_000), 6_000);
        // Bulky and light: volumetric wins (30000 cm3 / 5 = 6000 g).
        assert_eq!(chargeable_weight_grams(2, 2_000, 30_000), 12_000);
    }

    #[test]
    fn unit_cost_rounds_half_up() {
        assert_eq!(div_round(10, 4), 3); // 2.5 -> 3
        assert_eq!(div_round(9, 4), 2); // 2.25 -> 2
        assert_eq!(div_round(0, 4), 0);
    }

    fn cost(cost_type: CostType, method: Option<AllocationMethod>) -> shipment_cost::Model {
        shipment_cost::Model {
            id: Uuid::new_v4(),
            shipment_id: Uuid::new_v4(),
            cost_type,
            estimated_cents: 1000,
            actual_cents: None,
            allocation_method: method,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn shipment(mode: ShipmentMode, default: Option<AllocationMethod>) -> inbound_shipment::Model {
        inbound_shipment::Model {
            id: Uuid::new_v4(),
            shipment_number: "SHP-000001".into(),
            mode,
            carrier: None,
            forwarder: None,
            origin_port: None,
            destination_port: None,
            container_number: None,
            bol_number: None,
            tracking_number: None,
            etd: None,
            eta: None,
            allocation_method_default: default,
            total_weight_grams: 0,
            total_volume_cm3: 0,
            total_pieces: 0,
            total_cartons: 0,
            estimated_total_cost_cents: 0,
            actual_total_cost_cents: 0,
            status: ShipmentStatus::Draft,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn method_precedence_follows_the_table() {
        // Duty is always by value, whatever else is configured.
        let duty = cost(CostType::Duty, Some(AllocationMethod::ByWeight));
        let s = shipment(ShipmentMode::Air, Some(AllocationMethod::ByVolume));
        assert_eq!(resolve_method(&duty, &s), AllocationMethod::ByValue);

        // Brokerage/inspection split per line.
        let brokerage = cost(CostType::Brokerage, None);
        assert_eq!(resolve_method(&brokerage, &s), AllocationMethod::ByLineCount);

        // Explicit method on the cost wins over defaults.
        let freight = cost(CostType::Freight, Some(AllocationMethod::ByWeight));
        assert_eq!(resolve_method(&freight, &s), AllocationMethod::ByWeight);

        // Shipment default beats the mode default.
        let freight = cost(CostType::Freight, None);
        assert_eq!(resolve_method(&freight, &s), AllocationMethod::ByVolume);

        // Mode defaults: sea by volume, air by chargeable weight, road by weight.
        let plain = shipment(ShipmentMode::SeaFcl, None);
        assert_eq!(resolve_method(&freight, &plain), AllocationMethod::ByVolume);
        let air = shipment(ShipmentMode::Air, None);
        assert_eq!(
            resolve_method(&freight, &air),
            AllocationMethod::ByChargeableWeight
        );
        let truck = shipment(ShipmentMode::Ltl, None);
        assert_eq!(resolve_method(&freight, &truck), AllocationMethod::ByWeight);
    }

    #[test]
    fn effective_amount_prefers_actuals() {
        let mut c = cost(CostType::Freight, None);
        assert_eq!(effective_amount(&c), 1000);
        c.actual_cents = Some(1234);
        assert_eq!(effective_amount(&c), 1234);
    }

    proptest! {
        /// Allocation conserves the effective amount for any basis mix.
        #[test]
        fn allocation_conserves_total(
            effective in 0i64..10_000_000,
            bases in prop::collection::vec(0i64..1_000_000, 1..12),
        ) {
            let shares = allocate_cents(effective, &bases);
            prop_assert_eq!(shares.len(), bases.len());
            prop_assert_eq!(shares.iter().sum::<i64>(), effective);
        }
    }
}
