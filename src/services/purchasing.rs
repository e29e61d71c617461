//! Purchasing: vendors, purchase orders, approval tiers, and the
//! receiving roll-up callback.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::approval_tier;
use crate::entities::po_revision;
use crate::entities::po_status_event;
use crate::entities::purchase_order::{self, PoStatus};
use crate::entities::purchase_order_line::{self, PoLineStatus};
use crate::entities::vendor;
use crate::entities::vendor_product;
use crate::entities::{product_variant, Priority};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::services::{map_unique_violation, next_document_number};

/// Legal purchase-order transitions. Receiving-driven moves
/// (`*_received`) are included so the roll-up shares the same gate.
const ALLOWED_TRANSITIONS: &[(PoStatus, PoStatus)] = &[
    (PoStatus::Draft, PoStatus::PendingApproval),
    (PoStatus::Draft, PoStatus::Approved),
    (PoStatus::Draft, PoStatus::Cancelled),
    (PoStatus::PendingApproval, PoStatus::Approved),
    (PoStatus::PendingApproval, PoStatus::Cancelled),
    (PoStatus::Approved, PoStatus::Sent),
    (PoStatus::Approved, PoStatus::PartiallyReceived),
    (PoStatus::Approved, PoStatus::Received),
    (PoStatus::Approved, PoStatus::Cancelled),
    (PoStatus::Sent, PoStatus::Acknowledged),
    (PoStatus::Sent, PoStatus::PartiallyReceived),
    (PoStatus::Sent, PoStatus::Received),
    (PoStatus::Sent, PoStatus::Cancelled),
    (PoStatus::Acknowledged, PoStatus::PartiallyReceived),
    (PoStatus::Acknowledged, PoStatus::Received),
    (PoStatus::Acknowledged, PoStatus::Cancelled),
    (PoStatus::PartiallyReceived, PoStatus::PartiallyReceived),
    (PoStatus::PartiallyReceived, PoStatus::Received),
    (PoStatus::PartiallyReceived, PoStatus::Closed),
    (PoStatus::Received, PoStatus::Closed),
];

pub fn can_transition(from: PoStatus, to: PoStatus) -> bool {
    ALLOWED_TRANSITIONS.contains(&(from, to))
}

/// Integer percentage of an amount in cents, rounded half-up.
pub fn pct_of(amount_cents: i64, pct: i32) -> i64 {
    if amount_cents <= 0 || pct <= 0 {
        return 0;
    }
    (amount_cents * pct as i64 + 50) / 100
}

/// Line totals per the costing rule: discount off the subtotal, tax on
/// the discounted amount.
pub fn line_total_cents(order_qty: i64, unit_cost_cents: i64, discount_pct: i32, tax_pct: i32) -> i64 {
    let subtotal = order_qty * unit_cost_cents;
    let discount = pct_of(subtotal, discount_pct);
    let tax = pct_of(subtotal - discount, tax_pct);
    subtotal - discount + tax
}

pub fn derive_line_status(order_qty: i64, received_qty: i64, cancelled_qty: i64) -> PoLineStatus {
    if cancelled_qty >= order_qty {
        PoLineStatus::Cancelled
    } else if received_qty == 0 {
        PoLineStatus::Open
    } else if received_qty + cancelled_qty >= order_qty {
        PoLineStatus::Received
    } else {
        PoLineStatus::PartiallyReceived
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVendorInput {
    pub code: String,
    pub name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub payment_terms: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePoInput {
    pub vendor_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub expected_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub shipping_cents: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoLineInput {
    pub variant_id: Uuid,
    pub unit_cost_cents: i64,
    pub order_qty: i64,
    #[serde(default)]
    pub discount_pct: i32,
    #[serde(default)]
    pub tax_pct: i32,
}

#[derive(Debug, Clone)]
pub struct ReceiptLineRollup {
    pub po_line_id: Uuid,
    pub received_qty: i64,
    pub damaged_qty: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderItem {
    pub variant_id: Uuid,
    pub suggested_qty: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OnOrderSummary {
    pub variant_id: Uuid,
    pub on_order_qty: i64,
    pub earliest_expected: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct PurchasingService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl PurchasingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    // ------------------------------------------------------------------
    // Vendors & tiers
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn create_vendor(&self, input: CreateVendorInput) -> ServiceResult<vendor::Model> {
        let now = Utc::now();
        vendor::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(input.code.trim().to_string()),
            name: Set(input.name),
            contact_email: Set(input.contact_email),
            contact_phone: Set(input.contact_phone),
            currency: Set(input.currency),
            payment_terms: Set(input.payment_terms),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| map_unique_violation(e, "vendor code"))
    }

    #[instrument(skip(self))]
    pub async fn list_vendors(&self) -> ServiceResult<Vec<vendor::Model>> {
        vendor::Entity::find()
            .order_by_asc(vendor::Column::Code)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Record (or refresh) a vendor's cost for a variant.
    #[instrument(skip(self))]
    pub async fn set_vendor_cost(
        &self,
        vendor_id: Uuid,
        variant_id: Uuid,
        unit_cost_cents: i64,
        is_preferred: bool,
    ) -> ServiceResult<vendor_product::Model> {
        let existing = vendor_product::Entity::find()
            .filter(vendor_product::Column::VendorId.eq(vendor_id))
            .filter(vendor_product::Column::VariantId.eq(variant_id))
            .one(&*self.db)
            .await?;
        match existing {
            Some(row) => {
                let mut active: vendor_product::ActiveModel = row.into();
                active.unit_cost_cents = Set(unit_cost_cents);
                active.is_preferred = Set(is_preferred);
                active.update(&*self.db).await.map_err(Into::into)
            }
            None => vendor_product::ActiveModel {
                id: Set(Uuid::new_v4()),
                vendor_id: Set(vendor_id),
                variant_id: Set(variant_id),
                vendor_sku: Set(None),
                unit_cost_cents: Set(unit_cost_cents),
                is_preferred: Set(is_preferred),
                created_at: Set(Utc::now()),
            }
            .insert(&*self.db)
            .await
            .map_err(Into::into),
        }
    }

    #[instrument(skip(self))]
    pub async fn create_approval_tier(
        &self,
        name: &str,
        min_amount_cents: i64,
        max_amount_cents: Option<i64>,
    ) -> ServiceResult<approval_tier::Model> {
        approval_tier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            min_amount_cents: Set(min_amount_cents),
            max_amount_cents: Set(max_amount_cents),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(Into::into)
    }

    // ------------------------------------------------------------------
    // Purchase orders
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn create_po(&self, input: CreatePoInput) -> ServiceResult<purchase_order::Model> {
        let vendor = vendor::Entity::find_by_id(input.vendor_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("vendor {} not found", input.vendor_id)))?;

        let txn = self.db.begin().await?;
        let po_number = next_document_number(&txn, "po", "PO").await?;
        let now = Utc::now();
        let created = purchase_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            po_number: Set(po_number),
            vendor_id: Set(vendor.id),
            warehouse_id: Set(input.warehouse_id),
            status: Set(PoStatus::Draft),
            priority: Set(input.priority.unwrap_or_default()),
            currency: Set(vendor.currency.clone()),
            expected_delivery_date: Set(input.expected_delivery_date),
            confirmed_delivery_date: Set(None),
            actual_delivery_date: Set(None),
            subtotal_cents: Set(0),
            discount_cents: Set(input.discount_cents),
            tax_cents: Set(input.tax_cents),
            shipping_cents: Set(input.shipping_cents),
            grand_total_cents: Set(0),
            approval_tier_id: Set(None),
            revision_number: Set(0),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        Self::recalculate_totals_on(&txn, created.id).await?;
        txn.commit().await?;

        info!(po_id = %created.id, po_number = %created.po_number, "purchase order created");
        self.get_po(created.id).await
    }

    #[instrument(skip(self))]
    pub async fn get_po(&self, po_id: Uuid) -> ServiceResult<purchase_order::Model> {
        purchase_order::Entity::find_by_id(po_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {po_id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn get_po_lines(&self, po_id: Uuid) -> ServiceResult<Vec<purchase_order_line::Model>> {
        purchase_order_line::Entity::find()
            .filter(purchase_order_line::Column::PurchaseOrderId.eq(po_id))
            .order_by_asc(purchase_order_line::Column::LineNumber)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn list_pos(&self, status: Option<PoStatus>) -> ServiceResult<Vec<purchase_order::Model>> {
        let mut query = purchase_order::Entity::find();
        if let Some(s) = status {
            query = query.filter(purchase_order::Column::Status.eq(s));
        }
        query
            .order_by_desc(purchase_order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Add a line. Free in draft; after `sent` the change is recorded as
    /// a revision. Other states refuse edits.
    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        po_id: Uuid,
        input: PoLineInput,
    ) -> ServiceResult<purchase_order_line::Model> {
        if input.order_qty <= 0 {
            return Err(ServiceError::Validation("order_qty must be positive".into()));
        }
        let po = self.get_po(po_id).await?;
        self.ensure_editable(&po)?;

        let variant = product_variant::Entity::find_by_id(input.variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("variant {} not found", input.variant_id))
            })?;

        let vendor_product = vendor_product::Entity::find()
            .filter(vendor_product::Column::VendorId.eq(po.vendor_id))
            .filter(vendor_product::Column::VariantId.eq(variant.id))
            .one(&*self.db)
            .await?;

        let line_number = self.get_po_lines(po_id).await?.len() as i32 + 1;
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let line = purchase_order_line::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(po_id),
            line_number: Set(line_number),
            product_id: Set(variant.product_id),
            variant_id: Set(variant.id),
            vendor_product_id: Set(vendor_product.map(|vp| vp.id)),
            sku: Set(variant.sku.clone()),
            unit_cost_cents: Set(input.unit_cost_cents),
            order_qty: Set(input.order_qty),
            received_qty: Set(0),
            cancelled_qty: Set(0),
            damaged_qty: Set(0),
            discount_pct: Set(input.discount_pct),
            tax_pct: Set(input.tax_pct),
            line_total_cents: Set(line_total_cents(
                input.order_qty,
                input.unit_cost_cents,
                input.discount_pct,
                input.tax_pct,
            )),
            status: Set(PoLineStatus::Open),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        if po.status != PoStatus::Draft {
            Self::record_revision(&txn, &po, json!({ "line_added": line.id, "sku": line.sku }))
                .await?;
        }
        Self::recalculate_totals_on(&txn, po_id).await?;
        txn.commit().await?;
        Ok(line)
    }

    /// Update quantity/cost fields on a line under the same edit rules.
    #[instrument(skip(self))]
    pub async fn update_line(
        &self,
        line_id: Uuid,
        order_qty: Option<i64>,
        unit_cost_cents: Option<i64>,
    ) -> ServiceResult<purchase_order_line::Model> {
        let line = purchase_order_line::Entity::find_by_id(line_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("PO line {line_id} not found")))?;
        let po = self.get_po(line.purchase_order_id).await?;
        self.ensure_editable(&po)?;

        let before = json!({
            "line_id": line.id,
            "order_qty": line.order_qty,
            "unit_cost_cents": line.unit_cost_cents,
        });

        let new_qty = order_qty.unwrap_or(line.order_qty);
        if new_qty < line.received_qty + line.cancelled_qty {
            return Err(ServiceError::Validation(format!(
                "order_qty {new_qty} below received + cancelled"
            )));
        }
        let new_cost = unit_cost_cents.unwrap_or(line.unit_cost_cents);
        let discount_pct = line.discount_pct;
        let tax_pct = line.tax_pct;

        let txn = self.db.begin().await?;
        let mut active: purchase_order_line::ActiveModel = line.into();
        active.order_qty = Set(new_qty);
        active.unit_cost_cents = Set(new_cost);
        active.line_total_cents = Set(line_total_cents(new_qty, new_cost, discount_pct, tax_pct));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        if po.status != PoStatus::Draft {
            let after = json!({
                "line_id": updated.id,
                "order_qty": updated.order_qty,
                "unit_cost_cents": updated.unit_cost_cents,
            });
            Self::record_revision(&txn, &po, json!({ "before": before, "after": after })).await?;
        }
        Self::recalculate_totals_on(&txn, po.id).await?;
        txn.commit().await?;
        Ok(updated)
    }

    fn ensure_editable(&self, po: &purchase_order::Model) -> ServiceResult<()> {
        match po.status {
            PoStatus::Draft
            | PoStatus::Sent
            | PoStatus::Acknowledged
            | PoStatus::PartiallyReceived => Ok(()),
            other => Err(ServiceError::InvalidTransition(format!(
                "purchase order in {other} cannot be edited"
            ))),
        }
    }

    async fn record_revision(
        txn: &DatabaseTransaction,
        po: &purchase_order::Model,
        changes: serde_json::Value,
    ) -> ServiceResult<()> {
        let next_revision = po.revision_number + 1;
        po_revision::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(po.id),
            revision_number: Set(next_revision),
            changes: Set(changes),
            created_by: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(txn)
        .await?;

        let mut active: purchase_order::ActiveModel = po.clone().into();
        active.revision_number = Set(next_revision);
        active.update(txn).await?;
        Ok(())
    }

    /// The single authoritative totals routine; every mutation ends here.
    pub(crate) async fn recalculate_totals_on<C: ConnectionTrait>(
        conn: &C,
        po_id: Uuid,
    ) -> ServiceResult<purchase_order::Model> {
        let po = purchase_order::Entity::find_by_id(po_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {po_id} not found")))?;
        let lines = purchase_order_line::Entity::find()
            .filter(purchase_order_line::Column::PurchaseOrderId.eq(po_id))
            .all(conn)
            .await?;

        let mut subtotal = 0i64;
        let mut line_total_sum = 0i64;
        for line in lines.iter().filter(|l| l.status != PoLineStatus::Cancelled) {
            subtotal += line.order_qty * line.unit_cost_cents;
            line_total_sum += line.line_total_cents;
        }
        let grand =
            line_total_sum - po.discount_cents + po.tax_cents + po.shipping_cents;

        let mut active: purchase_order::ActiveModel = po.into();
        active.subtotal_cents = Set(subtotal);
        active.grand_total_cents = Set(grand);
        active.updated_at = Set(Utc::now());
        active.update(conn).await.map_err(Into::into)
    }

    /// Submit a draft: recompute totals, then route through the lowest
    /// matching approval tier, or auto-approve when none matches.
    #[instrument(skip(self))]
    pub async fn submit(&self, po_id: Uuid, user_id: Option<Uuid>) -> ServiceResult<purchase_order::Model> {
        let po = self.get_po(po_id).await?;
        if po.status != PoStatus::Draft {
            return Err(ServiceError::InvalidTransition(format!(
                "only draft purchase orders can be submitted, found {}",
                po.status
            )));
        }
        let lines = self.get_po_lines(po_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::Validation(
                "cannot submit a purchase order without lines".into(),
            ));
        }

        let txn = self.db.begin().await?;
        let po = Self::recalculate_totals_on(&txn, po_id).await?;

        let tiers = approval_tier::Entity::find()
            .order_by_asc(approval_tier::Column::MinAmountCents)
            .all(&txn)
            .await?;
        let matching = tiers.into_iter().find(|t| {
            po.grand_total_cents >= t.min_amount_cents
                && t.max_amount_cents
                    .map(|max| po.grand_total_cents <= max)
                    .unwrap_or(true)
        });

        let (target, tier_id, note) = match matching {
            Some(tier) => (
                PoStatus::PendingApproval,
                Some(tier.id),
                format!("requires approval ({})", tier.name),
            ),
            None => (PoStatus::Approved, None, "auto-approved".to_string()),
        };

        let updated =
            Self::transition_on(&txn, po, target, user_id, Some(note), tier_id).await?;
        txn.commit().await?;

        self.emit_status_change(&updated, PoStatus::Draft).await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn approve(&self, po_id: Uuid, user_id: Option<Uuid>) -> ServiceResult<purchase_order::Model> {
        self.simple_transition(po_id, PoStatus::Approved, user_id, None).await
    }

    #[instrument(skip(self))]
    pub async fn send(&self, po_id: Uuid, user_id: Option<Uuid>) -> ServiceResult<purchase_order::Model> {
        self.simple_transition(po_id, PoStatus::Sent, user_id, None).await
    }

    #[instrument(skip(self))]
    pub async fn acknowledge(
        &self,
        po_id: Uuid,
        user_id: Option<Uuid>,
        confirmed_delivery_date: Option<NaiveDate>,
    ) -> ServiceResult<purchase_order::Model> {
        let po = self
            .simple_transition(po_id, PoStatus::Acknowledged, user_id, None)
            .await?;
        if let Some(date) = confirmed_delivery_date {
            let mut active: purchase_order::ActiveModel = po.into();
            active.confirmed_delivery_date = Set(Some(date));
            active.updated_at = Set(Utc::now());
            return active.update(&*self.db).await.map_err(Into::into);
        }
        Ok(po)
    }

    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        po_id: Uuid,
        user_id: Option<Uuid>,
        note: Option<String>,
    ) -> ServiceResult<purchase_order::Model> {
        self.simple_transition(po_id, PoStatus::Cancelled, user_id, note).await
    }

    #[instrument(skip(self))]
    pub async fn close(&self, po_id: Uuid, user_id: Option<Uuid>) -> ServiceResult<purchase_order::Model> {
        let txn = self.db.begin().await?;
        let po = purchase_order::Entity::find_by_id(po_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {po_id} not found")))?;
        let old = po.status;
        let updated = Self::transition_on(&txn, po, PoStatus::Closed, user_id, None, None).await?;

        // Open remainder on lines is closed out with the order.
        let lines = purchase_order_line::Entity::find()
            .filter(purchase_order_line::Column::PurchaseOrderId.eq(po_id))
            .all(&txn)
            .await?;
        for line in lines {
            if matches!(line.status, PoLineStatus::Open | PoLineStatus::PartiallyReceived | PoLineStatus::Received) {
                let mut active: purchase_order_line::ActiveModel = line.into();
                active.status = Set(PoLineStatus::Closed);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;
            }
        }
        txn.commit().await?;

        self.emit_status_change(&updated, old).await;
        Ok(updated)
    }

    /// Close short: cancel every line's unreceived remainder, then close.
    #[instrument(skip(self))]
    pub async fn close_short(&self, po_id: Uuid, user_id: Option<Uuid>) -> ServiceResult<purchase_order::Model> {
        let txn = self.db.begin().await?;
        let po = purchase_order::Entity::find_by_id(po_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {po_id} not found")))?;
        let old = po.status;
        if !matches!(old, PoStatus::PartiallyReceived | PoStatus::Received) {
            return Err(ServiceError::InvalidTransition(format!(
                "close-short requires a received state, found {old}"
            )));
        }

        let lines = purchase_order_line::Entity::find()
            .filter(purchase_order_line::Column::PurchaseOrderId.eq(po_id))
            .all(&txn)
            .await?;
        for line in lines {
            let remainder = line.order_qty - line.received_qty - line.cancelled_qty;
            if remainder > 0 {
                let cancelled = line.cancelled_qty + remainder;
                let status = derive_line_status(line.order_qty, line.received_qty, cancelled);
                let mut active: purchase_order_line::ActiveModel = line.into();
                active.cancelled_qty = Set(cancelled);
                active.status = Set(status);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;
            }
        }

        let po = Self::recalculate_totals_on(&txn, po_id).await?;
        let updated = Self::transition_on(&txn, po, PoStatus::Closed, user_id, Some("closed short".into()), None).await?;
        txn.commit().await?;

        self.emit_status_change(&updated, old).await;
        Ok(updated)
    }

    async fn simple_transition(
        &self,
        po_id: Uuid,
        to: PoStatus,
        user_id: Option<Uuid>,
        note: Option<String>,
    ) -> ServiceResult<purchase_order::Model> {
        let txn = self.db.begin().await?;
        let po = purchase_order::Entity::find_by_id(po_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {po_id} not found")))?;
        let old = po.status;
        let updated = Self::transition_on(&txn, po, to, user_id, note, None).await?;
        txn.commit().await?;
        self.emit_status_change(&updated, old).await;
        Ok(updated)
    }

    /// Gate + audit row for one transition, on the caller's transaction.
    async fn transition_on(
        txn: &DatabaseTransaction,
        po: purchase_order::Model,
        to: PoStatus,
        user_id: Option<Uuid>,
        note: Option<String>,
        approval_tier_id: Option<Uuid>,
    ) -> ServiceResult<purchase_order::Model> {
        let from = po.status;
        if !can_transition(from, to) {
            return Err(ServiceError::InvalidTransition(format!(
                "purchase order cannot move {from} -> {to}"
            )));
        }

        po_status_event::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(po.id),
            from_status: Set(from.to_string()),
            to_status: Set(to.to_string()),
            user_id: Set(user_id),
            note: Set(note),
            created_at: Set(Utc::now()),
        }
        .insert(txn)
        .await?;

        let mut active: purchase_order::ActiveModel = po.into();
        active.status = Set(to);
        if approval_tier_id.is_some() {
            active.approval_tier_id = Set(approval_tier_id);
        }
        active.updated_at = Set(Utc::now());
        active.update(txn).await.map_err(Into::into)
    }

    async fn emit_status_change(&self, po: &purchase_order::Model, old: PoStatus) {
        self.event_sender
            .send(Event::PurchaseOrderStatusChanged {
                po_id: po.id,
                old_status: old.to_string(),
                new_status: po.status.to_string(),
            })
            .await;
    }

    // ------------------------------------------------------------------
    // Receiving callback
    // ------------------------------------------------------------------

    /// Roll received/damaged quantities into PO lines and auto-advance
    /// the order. Runs on the receiving close transaction so the ledger
    /// write, the line update, and the status move commit together.
    pub async fn on_receiving_order_closed(
        &self,
        txn: &DatabaseTransaction,
        po_id: Uuid,
        rollups: &[ReceiptLineRollup],
    ) -> ServiceResult<PoStatus> {
        let po = purchase_order::Entity::find_by_id(po_id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {po_id} not found")))?;

        for rollup in rollups {
            let line = purchase_order_line::Entity::find_by_id(rollup.po_line_id)
                .one(txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("PO line {} not found", rollup.po_line_id))
                })?;
            if line.purchase_order_id != po_id {
                return Err(ServiceError::Validation(format!(
                    "PO line {} does not belong to purchase order {po_id}",
                    rollup.po_line_id
                )));
            }

            let received = line.received_qty + rollup.received_qty;
            let damaged = line.damaged_qty + rollup.damaged_qty;
            if received + line.cancelled_qty > line.order_qty {
                return Err(ServiceError::Validation(format!(
                    "receipt overruns PO line {}: {} received of {} ordered",
                    line.id, received, line.order_qty
                )));
            }
            let status = derive_line_status(line.order_qty, received, line.cancelled_qty);
            let mut active: purchase_order_line::ActiveModel = line.into();
            active.received_qty = Set(received);
            active.damaged_qty = Set(damaged);
            active.status = Set(status);
            active.updated_at = Set(Utc::now());
            active.update(txn).await?;
        }

        // Derive the header status from the full line set.
        let lines = purchase_order_line::Entity::find()
            .filter(purchase_order_line::Column::PurchaseOrderId.eq(po_id))
            .all(txn)
            .await?;
        let active_lines: Vec<_> = lines
            .iter()
            .filter(|l| l.status != PoLineStatus::Cancelled)
            .collect();
        let all_received = !active_lines.is_empty()
            && active_lines.iter().all(|l| l.status == PoLineStatus::Received);
        let any_received = active_lines.iter().any(|l| l.received_qty > 0);

        let target = if all_received {
            Some(PoStatus::Received)
        } else if any_received {
            Some(PoStatus::PartiallyReceived)
        } else {
            None
        };

        if let Some(to) = target {
            if po.status != to && can_transition(po.status, to) {
                let updated = Self::transition_on(txn, po, to, None, Some("receiving roll-up".into()), None).await?;
                return Ok(updated.status);
            }
            return Ok(po.status);
        }
        Ok(po.status)
    }

    // ------------------------------------------------------------------
    // Reorder & on-order
    // ------------------------------------------------------------------

    /// One draft PO per preferred vendor for the given suggestions. The
    /// whole batch fails if any variant lacks a preferred vendor.
    #[instrument(skip(self, items))]
    pub async fn reorder_to_drafts(&self, items: Vec<ReorderItem>) -> ServiceResult<Vec<Uuid>> {
        if items.is_empty() {
            return Err(ServiceError::Validation("no reorder items supplied".into()));
        }

        let mut grouped: HashMap<Uuid, Vec<(ReorderItem, vendor_product::Model)>> = HashMap::new();
        for item in items {
            let preferred = vendor_product::Entity::find()
                .filter(vendor_product::Column::VariantId.eq(item.variant_id))
                .filter(vendor_product::Column::IsPreferred.eq(true))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NoPreferredVendor(format!(
                        "variant {} has no preferred vendor",
                        item.variant_id
                    ))
                })?;
            grouped.entry(preferred.vendor_id).or_default().push((item, preferred));
        }

        let mut created = Vec::with_capacity(grouped.len());
        for (vendor_id, entries) in grouped {
            let po = self
                .create_po(CreatePoInput {
                    vendor_id,
                    warehouse_id: None,
                    priority: None,
                    expected_delivery_date: None,
                    discount_cents: 0,
                    tax_cents: 0,
                    shipping_cents: 0,
                    notes: Some("generated from reorder suggestions".into()),
                })
                .await?;
            for (item, vp) in entries {
                self.add_line(
                    po.id,
                    PoLineInput {
                        variant_id: item.variant_id,
                        unit_cost_cents: vp.unit_cost_cents,
                        order_qty: item.suggested_qty,
                        discount_pct: 0,
                        tax_pct: 0,
                    },
                )
                .await?;
            }
            created.push(po.id);
        }
        Ok(created)
    }

    /// Open on-order quantity and earliest expected date for a variant.
    #[instrument(skip(self))]
    pub async fn on_order(&self, variant_id: Uuid) -> ServiceResult<OnOrderSummary> {
        let open_statuses = [
            PoStatus::Approved,
            PoStatus::Sent,
            PoStatus::Acknowledged,
            PoStatus::PartiallyReceived,
        ];

        let rows = purchase_order_line::Entity::find()
            .filter(purchase_order_line::Column::VariantId.eq(variant_id))
            .find_also_related(purchase_order::Entity)
            .all(&*self.db)
            .await?;

        let mut on_order = 0i64;
        let mut earliest: Option<NaiveDate> = None;
        for (line, po) in rows {
            let po = match po {
                Some(p) if open_statuses.contains(&p.status) => p,
                _ => continue,
            };
            let open_qty = line.order_qty - line.received_qty - line.cancelled_qty;
            if open_qty <= 0 {
                continue;
            }
            on_order += open_qty;
            if let Some(expected) = po.expected_delivery_date {
                earliest = Some(match earliest {
                    Some(current) => current.min(expected),
                    None => expected,
                });
            }
        }

        Ok(OnOrderSummary {
            variant_id,
            on_order_qty: on_order,
            earliest_expected: earliest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(pct_of(1000, 10), 100);
        assert_eq!(pct_of(1001, 10), 100); // 100.1 -> 100
        assert_eq!(pct_of(1005, 10), 101); // 100.5 -> 101
        assert_eq!(pct_of(0, 10), 0);
        assert_eq!(pct_of(1000, 0), 0);
    }

    #[test]
    fn line_total_applies_discount_then_tax() {
        // 10 x 500 = 5000; 10% discount = 500; tax 5% of 4500 = 225.
        assert_eq!(line_total_cents(10, 500, 10, 5), 5000 - 500 + 225);
        assert_eq!(line_total_cents(10, 500, 0, 0), 5000);
    }

    #[test_case(10, 0, 0, PoLineStatus::Open)]
    #[test_case(10, 4, 0, PoLineStatus::PartiallyReceived)]
    #[test_case(10, 10, 0, PoLineStatus::Received)]
    #[test_case(10, 6, 4, PoLineStatus::Received)]
    #[test_case(10, 0, 10, PoLineStatus::Cancelled)]
    fn line_status_derivation(order: i64, received: i64, cancelled: i64, expected: PoLineStatus) {
        assert_eq!(derive_line_status(order, received, cancelled), expected);
    }

    #[test]
    fn transition_table_enforces_the_state_graph() {
        assert!(can_transition(PoStatus::Draft, PoStatus::PendingApproval));
        assert!(can_transition(PoStatus::Draft, PoStatus::Approved));
        assert!(can_transition(PoStatus::PendingApproval, PoStatus::Approved));
        assert!(can_transition(PoStatus::Sent, PoStatus::Acknowledged));
        assert!(can_transition(PoStatus::Received, PoStatus::Closed));

        assert!(!can_transition(PoStatus::Draft, PoStatus::Sent));
        assert!(!can_transition(PoStatus::Closed, PoStatus::Draft));
        assert!(!can_transition(PoStatus::Cancelled, PoStatus::Approved));
        assert!(!can_transition(PoStatus::Received, PoStatus::Cancelled));
    }
}
