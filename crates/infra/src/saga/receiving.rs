//! Receiving saga: batches plus weighted-average stock postings.
//!
//! Each received item either creates a batch and then posts a stock receipt
//! (batched), or only posts the stock receipt (unbatched). Stock documents are
//! created lazily. Everything that can be rejected is rejected while planning,
//! before the first write; the write phase can then only fail in the store.
//!
//! Purchase order receiving runs the same plan inside a larger saga that also
//! updates the order and writes a receiving record last.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use tally_core::{Document, DocumentId, DocumentKind, TenantId, UserId};
use tally_inventory::{Batch, MovementContext, NewBatch, Stock, StockMovement};
use tally_purchasing::{PurchaseOrder, ReceiptLine, ReceivedItem, ReceivingRecord};
use tally_store::{DocumentStore, Selector};

use crate::error::{OperationError, OperationResult};
use crate::lookup::{ReferenceLookup, load, load_optional};
use crate::saga::Saga;

pub const RECEIVE: &str = "receiving";
pub const CREATE_BATCH: &str = "create_batch";
pub const RECEIVE_PURCHASE_ORDER: &str = "purchase_order_receiving";

/// One product arriving into stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveItem {
    pub product_id: DocumentId,
    pub quantity: i64,
    pub unit_cost: Decimal,
    /// Present for batched receipts.
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<DocumentId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub tenant_id: TenantId,
    pub actor: UserId,
    pub items: Vec<ReceiveItem>,
    /// Free-form reference stamped on the stock adjustments.
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOutcome {
    pub batches: Vec<Batch>,
    /// Final state of every stock ledger touched, in first-touch order.
    pub stocks: Vec<Stock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBatchRequest {
    pub tenant_id: TenantId,
    pub actor: UserId,
    pub product_id: DocumentId,
    pub batch_number: String,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<DocumentId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch: Batch,
    pub stock: Stock,
}

/// Quantity of one product received against a purchase order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceiptItem {
    pub product_id: DocumentId,
    pub quantity: i64,
    /// Defaults to the unit cost on the order line.
    pub unit_cost: Option<Decimal>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceiptRequest {
    pub tenant_id: TenantId,
    pub actor: UserId,
    pub purchase_order_id: DocumentId,
    pub items: Vec<PurchaseReceiptItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceiptOutcome {
    pub purchase_order: PurchaseOrder,
    pub receiving: ReceivingRecord,
    pub batches: Vec<Batch>,
    pub stocks: Vec<Stock>,
}

#[derive(Debug)]
struct PlannedItem {
    stock: usize,
    movement: StockMovement,
    unit_cost: Decimal,
    batch: Option<Batch>,
    /// The stock ledger after this item, computed while planning.
    posted: Stock,
}

/// Everything a receipt will write, built and validated without writing.
#[derive(Debug)]
struct ReceivingPlan {
    items: Vec<PlannedItem>,
    stocks: Vec<Stock>,
}

impl ReceivingPlan {
    fn received_items(&self) -> Vec<ReceivedItem> {
        self.items
            .iter()
            .map(|item| ReceivedItem {
                product_id: self.stocks[item.stock].product_id().clone(),
                quantity: item.movement.quantity(),
                unit_cost: item.unit_cost,
                batch_number: item.batch.as_ref().map(|b| b.batch_number().to_string()),
                batch_id: item.batch.as_ref().map(|b| b.id().clone()),
            })
            .collect()
    }
}

/// Receive items into stock.
pub fn run<S: DocumentStore + ?Sized>(
    store: &S,
    request: &ReceiveRequest,
    at: DateTime<Utc>,
) -> OperationResult<ReceiveOutcome> {
    check_suppliers(store, request.tenant_id, &request.items)?;
    let mut ctx = MovementContext::new(request.actor, at).with_reason("receiving");
    ctx.reference = request.reference.clone();
    let plan = plan(store, request.tenant_id, &ctx, &request.items, None)?;

    let mut saga = Saga::begin(store, RECEIVE);
    let outcome = post(&mut saga, plan)?;
    saga.complete();
    Ok(outcome)
}

/// Create one batch and post it to stock immediately.
///
/// If the stock posting fails the batch is deleted again.
pub fn create_batch<S: DocumentStore + ?Sized>(
    store: &S,
    request: &CreateBatchRequest,
    at: DateTime<Utc>,
) -> OperationResult<BatchOutcome> {
    let item = ReceiveItem {
        product_id: request.product_id.clone(),
        quantity: request.quantity,
        unit_cost: request.unit_cost,
        batch_number: Some(request.batch_number.clone()),
        expiry_date: request.expiry_date,
        supplier_id: request.supplier_id.clone(),
    };
    let items = [item];
    check_suppliers(store, request.tenant_id, &items)?;
    let ctx = MovementContext::new(request.actor, at).with_reason("batch_received");
    let plan = plan(store, request.tenant_id, &ctx, &items, None)?;

    let mut saga = Saga::begin(store, CREATE_BATCH);
    let outcome = post(&mut saga, plan)?;
    saga.complete();

    match (outcome.batches.into_iter().next(), outcome.stocks.into_iter().next()) {
        (Some(batch), Some(stock)) => Ok(BatchOutcome { batch, stock }),
        _ => Err(OperationError::validation("batch_number_required")),
    }
}

/// Receive goods against a purchase order.
///
/// Order lines are checked (`over_delivery`, `product_not_on_order`, status
/// transition) before anything is written. Writes: batches and stock postings
/// per item, then the order once, then the receiving record.
pub fn receive_purchase_order<S: DocumentStore + ?Sized>(
    store: &S,
    request: &PurchaseReceiptRequest,
    at: DateTime<Utc>,
) -> OperationResult<PurchaseReceiptOutcome> {
    let tenant_id = request.tenant_id;
    let order: PurchaseOrder = load(store, tenant_id, &request.purchase_order_id, "purchase_order")?;

    let receiving_id = DocumentId::generate(tenant_id, DocumentKind::ReceivingRecord);
    let lines: Vec<ReceiptLine> = request
        .items
        .iter()
        .map(|item| ReceiptLine {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
        })
        .collect();
    let mut order_after = order.record_receipt(&lines, receiving_id.clone(), request.actor, at)?;

    let items: Vec<ReceiveItem> = request
        .items
        .iter()
        .map(|item| ReceiveItem {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            unit_cost: item
                .unit_cost
                .or_else(|| order.line_for(&item.product_id).map(|line| line.unit_cost))
                .unwrap_or_default(),
            batch_number: item.batch_number.clone(),
            expiry_date: item.expiry_date,
            supplier_id: Some(order.supplier_id().clone()),
        })
        .collect();
    let ctx = MovementContext::new(request.actor, at)
        .with_reason("purchase_order")
        .with_reference(order.order_number());
    let plan = plan(store, tenant_id, &ctx, &items, Some(order.id()))?;

    let mut receiving = ReceivingRecord::new(
        receiving_id,
        order.id().clone(),
        plan.received_items(),
        request.notes.clone(),
        request.actor,
        at,
    )?;

    let mut saga = Saga::begin(store, RECEIVE_PURCHASE_ORDER);
    let outcome = post(&mut saga, plan)?;
    saga.update("update_purchase_order", &order, &mut order_after)?;
    saga.create("record_receiving", &mut receiving)?;
    saga.complete();

    tracing::info!(
        tenant_id = %tenant_id,
        purchase_order_id = %order_after.id(),
        status = %order_after.status(),
        items = request.items.len(),
        "purchase order received"
    );

    Ok(PurchaseReceiptOutcome {
        purchase_order: order_after,
        receiving,
        batches: outcome.batches,
        stocks: outcome.stocks,
    })
}

fn check_suppliers<S: DocumentStore + ?Sized>(
    store: &S,
    tenant_id: TenantId,
    items: &[ReceiveItem],
) -> OperationResult<()> {
    let suppliers: HashSet<&DocumentId> = items.iter().filter_map(|i| i.supplier_id.as_ref()).collect();
    for supplier_id in suppliers {
        store.supplier(tenant_id, supplier_id)?;
    }
    Ok(())
}

fn plan<S: DocumentStore + ?Sized>(
    store: &S,
    tenant_id: TenantId,
    ctx: &MovementContext,
    items: &[ReceiveItem],
    purchase_order_id: Option<&DocumentId>,
) -> OperationResult<ReceivingPlan> {
    let (actor, at) = (ctx.actor, ctx.at);
    if items.is_empty() {
        return Err(OperationError::validation("items_required"));
    }

    let mut stocks: Vec<Stock> = Vec::new();
    let mut projected: Vec<Stock> = Vec::new();
    let mut stock_index: HashMap<DocumentId, usize> = HashMap::new();
    let mut batch_numbers: HashSet<(DocumentId, String)> = HashSet::new();
    let mut planned = Vec::with_capacity(items.len());

    for item in items {
        if item.quantity <= 0 {
            return Err(OperationError::validation("invalid_quantity"));
        }
        if item.unit_cost < Decimal::ZERO {
            return Err(OperationError::validation("invalid_unit_cost"));
        }
        store.product(tenant_id, &item.product_id)?;

        let stock = match stock_index.get(&item.product_id) {
            Some(&index) => index,
            None => {
                let stock_id = Stock::id_for(&item.product_id);
                let stock = match load_optional::<Stock, S>(store, tenant_id, &stock_id)? {
                    Some(stock) => stock,
                    None => Stock::empty(&item.product_id, actor, at)?,
                };
                projected.push(stock.clone());
                stocks.push(stock);
                stock_index.insert(item.product_id.clone(), stocks.len() - 1);
                stocks.len() - 1
            }
        };

        let batch = match item.batch_number.as_deref() {
            None => None,
            Some(number) => {
                let batch = Batch::receive(
                    DocumentId::generate(tenant_id, DocumentKind::Batch),
                    NewBatch {
                        product_id: item.product_id.clone(),
                        batch_number: number.to_string(),
                        quantity: item.quantity,
                        purchase_cost: item.unit_cost,
                        expiry_date: item.expiry_date,
                        supplier_id: item.supplier_id.clone(),
                        purchase_order_id: purchase_order_id.cloned(),
                    },
                    actor,
                    at,
                )?;
                let key = (item.product_id.clone(), batch.batch_number().to_string());
                if !batch_numbers.insert(key) || batch_exists(store, tenant_id, &batch)? {
                    return Err(OperationError::conflict(format!(
                        "batch number {} already exists for product",
                        batch.batch_number()
                    )));
                }
                Some(batch)
            }
        };

        let movement = StockMovement::In {
            quantity: item.quantity,
            unit_cost: item.unit_cost,
        };
        let mut item_ctx = ctx.clone();
        if let Some(batch) = &batch {
            item_ctx.reference = Some(batch.batch_number().to_string());
        }
        let posted = projected[stock].apply(&movement, &item_ctx)?;
        projected[stock] = posted.clone();

        planned.push(PlannedItem {
            stock,
            movement,
            unit_cost: item.unit_cost,
            batch,
            posted,
        });
    }

    Ok(ReceivingPlan {
        items: planned,
        stocks,
    })
}

fn batch_exists<S: DocumentStore + ?Sized>(store: &S, tenant_id: TenantId, batch: &Batch) -> OperationResult<bool> {
    let selector = Selector::kind(DocumentKind::Batch)
        .eq("productId", batch.product_id().to_string())
        .eq("batchNumber", batch.batch_number());
    Ok(!store.find(tenant_id, &selector)?.is_empty())
}

/// Find a product's batch by number.
pub fn find_batch<S: DocumentStore + ?Sized>(
    store: &S,
    tenant_id: TenantId,
    product_id: &DocumentId,
    batch_number: &str,
) -> OperationResult<Batch> {
    let selector = Selector::kind(DocumentKind::Batch)
        .eq("productId", product_id.to_string())
        .eq("batchNumber", batch_number.trim());
    let raw = store
        .find(tenant_id, &selector)?
        .into_iter()
        .next()
        .ok_or_else(|| OperationError::not_found("batch"))?;
    Ok(tally_store::from_raw(raw)?)
}

fn post<S: DocumentStore + ?Sized>(
    saga: &mut Saga<'_, S>,
    plan: ReceivingPlan,
) -> OperationResult<ReceiveOutcome> {
    let ReceivingPlan { items, mut stocks } = plan;
    let mut batches = Vec::new();

    for item in items {
        if let Some(mut batch) = item.batch {
            saga.create("create_batch", &mut batch)?;
            batches.push(batch);
        }

        // Earlier items may already have written this ledger.
        let before = stocks[item.stock].clone();
        let mut next = item.posted;
        next.meta_mut().rev = before.rev().cloned();
        saga.save("post_stock", &before, &mut next)?;
        stocks[item.stock] = next;
    }

    Ok(ReceiveOutcome { batches, stocks })
}
