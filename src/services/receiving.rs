//! Receiving: blind, PO-linked, ASN and initial-load receipts.
//!
//! Closing a receiving order is the commit point of the inbound arc: one
//! transaction posts the ledger receipts, creates provisional cost lots,
//! and rolls quantities into the linked purchase order.

use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::{with_serializable_retry, RetryConfig};
use crate::entities::purchase_order_line::PoLineStatus;
use crate::entities::receiving_line::{self, ReceivingLineStatus};
use crate::entities::receiving_order::{self, ReceivingSourceType, ReceivingStatus};
use crate::entities::{inventory_lot, location, product_variant};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::services::inventory::{post_receipt, TxnRefs};
use crate::services::next_document_number;
use crate::services::purchasing::{PurchasingService, ReceiptLineRollup};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReceivingOrderInput {
    pub source_type: ReceivingSourceType,
    pub vendor_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceivingLineInput {
    pub sku: String,
    pub name: Option<String>,
    #[serde(default)]
    pub expected_qty: i64,
    pub unit_cost_cents: Option<i64>,
    pub putaway_location_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReceivingLineInput {
    pub received_qty: Option<i64>,
    pub damaged_qty: Option<i64>,
    pub putaway_location_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CsvRowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Serialize, Default)]
pub struct CsvImportReport {
    pub imported: usize,
    pub errors: Vec<CsvRowError>,
}

#[derive(Clone)]
pub struct ReceivingService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    purchasing: PurchasingService,
    retry: RetryConfig,
}

impl ReceivingService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        purchasing: PurchasingService,
    ) -> Self {
        Self {
            db,
            event_sender,
            purchasing,
            retry: RetryConfig::default(),
        }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        input: CreateReceivingOrderInput,
    ) -> ServiceResult<receiving_order::Model> {
        if input.source_type == ReceivingSourceType::Po && input.purchase_order_id.is_none() {
            return Err(ServiceError::Validation(
                "PO-sourced receipts need purchase_order_id".into(),
            ));
        }

        let txn = self.db.begin().await?;
        let number = next_document_number(&txn, "receipt", "RCV").await?;
        let now = Utc::now();
        let created = receiving_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            receipt_number: Set(number),
            source_type: Set(input.source_type),
            vendor_id: Set(input.vendor_id),
            warehouse_id: Set(input.warehouse_id),
            purchase_order_id: Set(input.purchase_order_id),
            status: Set(ReceivingStatus::Draft),
            expected_lines: Set(0),
            expected_units: Set(0),
            received_lines: Set(0),
            received_units: Set(0),
            closed_at: Set(None),
            closed_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(receiving_order_id = %created.id, receipt = %created.receipt_number, "receiving order created");
        Ok(created)
    }

    /// Build a PO-sourced receipt pre-populated with the PO's open
    /// remainder.
    #[instrument(skip(self))]
    pub async fn create_from_po(&self, po_id: Uuid) -> ServiceResult<receiving_order::Model> {
        let po = self.purchasing.get_po(po_id).await?;
        let order = self
            .create(CreateReceivingOrderInput {
                source_type: ReceivingSourceType::Po,
                vendor_id: Some(po.vendor_id),
                warehouse_id: po.warehouse_id,
                purchase_order_id: Some(po.id),
            })
            .await?;

        let lines = self.purchasing.get_po_lines(po_id).await?;
        for line in lines {
            if matches!(line.status, PoLineStatus::Cancelled | PoLineStatus::Closed) {
                continue;
            }
            let open_qty = line.order_qty - line.received_qty - line.cancelled_qty;
            if open_qty <= 0 {
                continue;
            }
            self.insert_line(
                order.id,
                ReceivingLineInput {
                    sku: line.sku.clone(),
                    name: None,
                    expected_qty: open_qty,
                    unit_cost_cents: Some(line.unit_cost_cents),
                    putaway_location_id: None,
                },
                Some(line.id),
                0,
            )
            .await?;
        }
        self.refresh_counts(order.id).await?;
        self.get(order.id).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> ServiceResult<receiving_order::Model> {
        receiving_order::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("receiving order {id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn get_lines(&self, id: Uuid) -> ServiceResult<Vec<receiving_line::Model>> {
        receiving_line::Entity::find()
            .filter(receiving_line::Column::ReceivingOrderId.eq(id))
            .order_by_asc(receiving_line::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<ReceivingStatus>,
    ) -> ServiceResult<Vec<receiving_order::Model>> {
        let mut query = receiving_order::Entity::find();
        if let Some(s) = status {
            query = query.filter(receiving_order::Column::Status.eq(s));
        }
        query
            .order_by_desc(receiving_order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        id: Uuid,
        input: ReceivingLineInput,
    ) -> ServiceResult<receiving_line::Model> {
        let order = self.get(id).await?;
        if order.status == ReceivingStatus::Closed {
            return Err(ServiceError::InvalidTransition(
                "cannot add lines to a closed receiving order".into(),
            ));
        }
        let line = self.insert_line(id, input, None, 0).await?;
        self.refresh_counts(id).await?;
        Ok(line)
    }

    async fn insert_line(
        &self,
        order_id: Uuid,
        input: ReceivingLineInput,
        po_line_id: Option<Uuid>,
        received_qty: i64,
    ) -> ServiceResult<receiving_line::Model> {
        let variant = product_variant::Entity::find()
            .filter(product_variant::Column::Sku.eq(input.sku.clone()))
            .one(&*self.db)
            .await?;

        let now = Utc::now();
        receiving_line::ActiveModel {
            id: Set(Uuid::new_v4()),
            receiving_order_id: Set(order_id),
            po_line_id: Set(po_line_id),
            variant_id: Set(variant.as_ref().map(|v| v.id)),
            sku: Set(input.sku.trim().to_string()),
            name: Set(input.name.or(variant.map(|v| v.name))),
            expected_qty: Set(input.expected_qty),
            received_qty: Set(received_qty),
            damaged_qty: Set(0),
            unit_cost_cents: Set(input.unit_cost_cents),
            putaway_location_id: Set(input.putaway_location_id),
            status: Set(ReceivingLineStatus::derive(input.expected_qty, received_qty)),
            notes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(Into::into)
    }

    /// Bulk line import. Accepted headers:
    /// `sku, qty, location?, damaged_qty?, unit_cost?, barcode?, notes?`.
    /// Row failures are reported, not fatal.
    #[instrument(skip(self, csv_text))]
    pub async fn import_lines_csv(
        &self,
        id: Uuid,
        csv_text: &str,
    ) -> ServiceResult<CsvImportReport> {
        let order = self.get(id).await?;
        if order.status == ReceivingStatus::Closed {
            return Err(ServiceError::InvalidTransition(
                "cannot import into a closed receiving order".into(),
            ));
        }

        let records = parse_csv(csv_text);
        let mut report = CsvImportReport::default();
        let header = match records.first() {
            Some(h) => h.iter().map(|c| c.trim().to_lowercase()).collect::<Vec<_>>(),
            None => {
                return Err(ServiceError::Validation("empty CSV".into()));
            }
        };
        let col = |name: &str| header.iter().position(|h| h == name);
        let sku_idx = col("sku")
            .ok_or_else(|| ServiceError::Validation("CSV is missing the sku column".into()))?;
        let qty_idx = col("qty")
            .ok_or_else(|| ServiceError::Validation("CSV is missing the qty column".into()))?;
        let location_idx = col("location");
        let damaged_idx = col("damaged_qty");
        let cost_idx = col("unit_cost");
        let barcode_idx = col("barcode");
        let notes_idx = col("notes");

        for (row_no, record) in records.iter().enumerate().skip(1) {
            if record.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            match self
                .import_csv_row(
                    &order,
                    record,
                    sku_idx,
                    qty_idx,
                    location_idx,
                    damaged_idx,
                    cost_idx,
                    barcode_idx,
                    notes_idx,
                )
                .await
            {
                Ok(()) => report.imported += 1,
                Err(e) => report.errors.push(CsvRowError {
                    row: row_no + 1,
                    message: e.to_string(),
                }),
            }
        }

        self.refresh_counts(id).await?;
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn import_csv_row(
        &self,
        order: &receiving_order::Model,
        record: &[String],
        sku_idx: usize,
        qty_idx: usize,
        location_idx: Option<usize>,
        damaged_idx: Option<usize>,
        cost_idx: Option<usize>,
        barcode_idx: Option<usize>,
        notes_idx: Option<usize>,
    ) -> ServiceResult<()> {
        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| record.get(i))
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
        };

        let sku = record
            .get(sku_idx)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ServiceError::Validation("missing sku".into()))?;
        let qty: i64 = record
            .get(qty_idx)
            .map(|c| c.trim())
            .unwrap_or("")
            .parse()
            .map_err(|_| ServiceError::Validation("qty is not a number".into()))?;
        if qty < 0 {
            return Err(ServiceError::Validation("qty must be non-negative".into()));
        }

        // Variant resolution: SKU first, then barcode.
        let variant = match product_variant::Entity::find()
            .filter(product_variant::Column::Sku.eq(sku.clone()))
            .one(&*self.db)
            .await?
        {
            Some(v) => Some(v),
            None => match cell(barcode_idx) {
                Some(barcode) => {
                    product_variant::Entity::find()
                        .filter(product_variant::Column::Barcode.eq(barcode))
                        .one(&*self.db)
                        .await?
                }
                None => None,
            },
        };
        let variant =
            variant.ok_or_else(|| ServiceError::NotFound(format!("SKU {sku} not found")))?;

        let putaway_location_id = match cell(location_idx) {
            Some(code) => {
                let warehouse_id = order.warehouse_id.ok_or_else(|| {
                    ServiceError::Validation(
                        "receiving order has no warehouse; cannot resolve location code".into(),
                    )
                })?;
                let loc = location::Entity::find()
                    .filter(location::Column::WarehouseId.eq(warehouse_id))
                    .filter(location::Column::Code.eq(code.clone()))
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("location {code} not found"))
                    })?;
                Some(loc.id)
            }
            None => None,
        };

        let damaged: i64 = cell(damaged_idx)
            .map(|c| c.parse())
            .transpose()
            .map_err(|_| ServiceError::Validation("damaged_qty is not a number".into()))?
            .unwrap_or(0);
        let unit_cost: Option<i64> = cell(cost_idx)
            .map(|c| c.parse())
            .transpose()
            .map_err(|_| ServiceError::Validation("unit_cost is not a number".into()))?;

        let now = Utc::now();
        receiving_line::ActiveModel {
            id: Set(Uuid::new_v4()),
            receiving_order_id: Set(order.id),
            po_line_id: Set(None),
            variant_id: Set(Some(variant.id)),
            sku: Set(variant.sku.clone()),
            name: Set(Some(variant.name.clone())),
            expected_qty: Set(qty),
            received_qty: Set(qty),
            damaged_qty: Set(damaged),
            unit_cost_cents: Set(unit_cost),
            putaway_location_id: Set(putaway_location_id),
            status: Set(ReceivingLineStatus::derive(qty, qty)),
            notes: Set(cell(notes_idx)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        Ok(())
    }

    /// Draft -> open.
    #[instrument(skip(self))]
    pub async fn open(&self, id: Uuid) -> ServiceResult<receiving_order::Model> {
        let order = self.get(id).await?;
        if order.status != ReceivingStatus::Draft {
            return Err(ServiceError::InvalidTransition(format!(
                "receiving order is {}, expected draft",
                order.status
            )));
        }
        let mut active: receiving_order::ActiveModel = order.into();
        active.status = Set(ReceivingStatus::Open);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn update_line(
        &self,
        line_id: Uuid,
        input: UpdateReceivingLineInput,
    ) -> ServiceResult<receiving_line::Model> {
        let line = receiving_line::Entity::find_by_id(line_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("receiving line {line_id} not found")))?;
        let order = self.get(line.receiving_order_id).await?;
        if order.status == ReceivingStatus::Closed {
            return Err(ServiceError::InvalidTransition(
                "receiving order is closed".into(),
            ));
        }

        let received = input.received_qty.unwrap_or(line.received_qty);
        let damaged = input.damaged_qty.unwrap_or(line.damaged_qty);
        if received < 0 || damaged < 0 {
            return Err(ServiceError::Validation("quantities must be non-negative".into()));
        }
        let expected = line.expected_qty;

        let mut active: receiving_line::ActiveModel = line.into();
        active.received_qty = Set(received);
        active.damaged_qty = Set(damaged);
        if input.putaway_location_id.is_some() {
            active.putaway_location_id = Set(input.putaway_location_id);
        }
        active.status = Set(ReceivingLineStatus::derive(expected, received));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        // First touch moves the order into the receiving state.
        if order.status == ReceivingStatus::Open {
            let mut active: receiving_order::ActiveModel = order.into();
            active.status = Set(ReceivingStatus::Receiving);
            active.updated_at = Set(Utc::now());
            active.update(&*self.db).await?;
        }
        self.refresh_counts(updated.receiving_order_id).await?;
        Ok(updated)
    }

    /// Close the receipt. One database transaction posts every ledger
    /// receipt, writes provisional cost lots, and rolls quantities into
    /// the linked PO. Re-closing is a no-op.
    #[instrument(skip(self))]
    pub async fn close(&self, id: Uuid, user_id: Option<Uuid>) -> ServiceResult<receiving_order::Model> {
        let order = self.get(id).await?;
        if order.status == ReceivingStatus::Closed {
            // Idempotent: the original close already committed.
            return Ok(order);
        }
        let lines = self.get_lines(id).await?;
        for line in lines.iter().filter(|l| l.received_qty > 0) {
            if line.variant_id.is_none() {
                return Err(ServiceError::Validation(format!(
                    "line {} has received quantity but no resolved variant",
                    line.sku
                )));
            }
            if line.putaway_location_id.is_none() {
                return Err(ServiceError::Validation(format!(
                    "line {} has received quantity but no putaway location",
                    line.sku
                )));
            }
        }

        let purchasing = self.purchasing.clone();
        let order_id = order.id;
        let po_id = order.purchase_order_id;

        let (closed, posted) =
            with_serializable_retry(&self.db, &self.retry, "receiving_close", |txn| {
                let lines = lines.clone();
                let purchasing = purchasing.clone();
                async move {
                    Self::close_on(txn, order_id, po_id, &lines, user_id, &purchasing).await
                }
                .boxed()
            })
            .await?;

        for (variant_id, transaction_id) in posted {
            self.event_sender
                .send(Event::InventoryChanged {
                    variant_id,
                    transaction_id,
                })
                .await;
        }
        self.event_sender
            .send(Event::ReceivingOrderClosed {
                receiving_order_id: order_id,
            })
            .await;
        info!(receiving_order_id = %order_id, "receiving order closed");
        Ok(closed)
    }

    async fn close_on(
        txn: &DatabaseTransaction,
        order_id: Uuid,
        po_id: Option<Uuid>,
        lines: &[receiving_line::Model],
        user_id: Option<Uuid>,
        purchasing: &PurchasingService,
    ) -> ServiceResult<(receiving_order::Model, Vec<(Uuid, Uuid)>)> {
        // Status gate inside the transaction keeps concurrent closers off.
        let order = receiving_order::Entity::find_by_id(order_id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("receiving order {order_id} not found")))?;
        if order.status == ReceivingStatus::Closed {
            return Ok((order, Vec::new()));
        }

        let mut rollups: Vec<ReceiptLineRollup> = Vec::new();
        let mut posted: Vec<(Uuid, Uuid)> = Vec::new();
        let now = Utc::now();

        for line in lines.iter().filter(|l| l.received_qty > 0) {
            let variant_id = line.variant_id.ok_or_else(|| {
                ServiceError::Validation(format!("line {} has no resolved variant", line.sku))
            })?;
            let putaway = line.putaway_location_id.ok_or_else(|| {
                ServiceError::Validation(format!("line {} has no putaway location", line.sku))
            })?;
            let variant = product_variant::Entity::find_by_id(variant_id)
                .one(txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("variant {variant_id} not found"))
                })?;

            let refs = TxnRefs {
                receiving_order_id: Some(order_id),
                reference: Some(order.receipt_number.clone()),
                user_id,
                ..Default::default()
            };
            let receipt = post_receipt(txn, &variant, putaway, line.received_qty, &refs).await?;
            posted.push((variant_id, receipt.id));

            inventory_lot::ActiveModel {
                id: Set(Uuid::new_v4()),
                variant_id: Set(variant_id),
                location_id: Set(Some(putaway)),
                receiving_line_id: Set(Some(line.id)),
                po_line_id: Set(line.po_line_id),
                qty: Set(line.received_qty),
                unit_cost_cents: Set(line.unit_cost_cents.unwrap_or(0)),
                landed_unit_cost_cents: Set(None),
                is_provisional: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(txn)
            .await?;

            if let Some(po_line_id) = line.po_line_id {
                rollups.push(ReceiptLineRollup {
                    po_line_id,
                    received_qty: line.received_qty,
                    damaged_qty: line.damaged_qty,
                });
            }
        }

        if let Some(po_id) = po_id {
            if !rollups.is_empty() {
                let status = purchasing.on_receiving_order_closed(txn, po_id, &rollups).await?;
                info!(%po_id, ?status, "purchase order rolled up from receipt");
            }
        }

        let received_lines = lines.iter().filter(|l| l.received_qty > 0).count() as i32;
        let received_units: i64 = lines.iter().map(|l| l.received_qty).sum();
        let mut active: receiving_order::ActiveModel = order.into();
        active.status = Set(ReceivingStatus::Closed);
        active.received_lines = Set(received_lines);
        active.received_units = Set(received_units);
        active.closed_at = Set(Some(now));
        active.closed_by = Set(user_id);
        active.updated_at = Set(now);
        let model = active.update(txn).await?;
        Ok((model, posted))
    }

    async fn refresh_counts(&self, id: Uuid) -> ServiceResult<()> {
        let order = self.get(id).await?;
        if order.status == ReceivingStatus::Closed {
            return Ok(());
        }
        let lines = self.get_lines(id).await?;
        let mut active: receiving_order::ActiveModel = order.into();
        active.expected_lines = Set(lines.len() as i32);
        active.expected_units = Set(lines.iter().map(|l| l.expected_qty).sum());
        active.received_lines = Set(lines.iter().filter(|l| l.received_qty > 0).count() as i32);
        active.received_units = Set(lines.iter().map(|l| l.received_qty).sum());
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        Ok(())
    }
}

/// Minimal CSV reader: comma separated, double-quoted cells with `""`
/// escapes, tolerant of CRLF.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        cell.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => cell.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => {
                row.push(std::mem::take(&mut cell));
            }
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                rows.push(std::mem::take(&mut row));
            }
            _ => cell.push(c),
        }
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::parse_csv;

    #[test]
    fn parses_plain_rows() {
        let rows = parse_csv("sku,qty\nWIDGET,5\nGADGET,3\n");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["sku", "qty"]);
        assert_eq!(rows[1], vec!["WIDGET", "5"]);
        assert_eq!(rows[2], vec!["GADGET", "3"]);
    }

    #[test]
    fn quoted_cells_keep_commas_and_quotes() {
        let rows = parse_csv("sku,notes\nW1,\"fragile, keep upright\"\nW2,\"said \"\"ok\"\"\"\n");
        assert_eq!(rows[1][1], "fragile, keep upright");
        assert_eq!(rows[2][1], "said \"ok\"");
    }

    #[test]
    fn handles_crlf_and_missing_trailing_newline() {
        let rows = parse_csv("sku,qty\r\nW1,2\r\nW2,4");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec!["W2", "4"]);
    }
}
