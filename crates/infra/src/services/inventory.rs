use chrono::Utc;
use serde_json::json;

use tally_core::{Document, DocumentId, TenantId};
use tally_inventory::{Batch, Stock};
use tally_store::DocumentStore;

use crate::audit::{AuditEntry, AuditLog, record_quietly};
use crate::config::SagaConfig;
use crate::error::OperationResult;
use crate::lookup::load_optional;
use crate::saga::receiving::{
    self, BatchOutcome, CreateBatchRequest, ReceiveOutcome, ReceiveRequest,
};
use crate::saga::stock::{self, AdjustStockRequest};

/// Stock receipts, batches and adjustments.
#[derive(Debug)]
pub struct InventoryService<S, A> {
    store: S,
    audit: A,
    config: SagaConfig,
}

impl<S: DocumentStore, A: AuditLog> InventoryService<S, A> {
    pub fn new(store: S, audit: A, config: SagaConfig) -> Self {
        Self { store, audit, config }
    }

    /// Receive items (batched or not) into stock.
    pub fn receive(&self, request: ReceiveRequest) -> OperationResult<ReceiveOutcome> {
        let outcome = receiving::run(&self.store, &request, Utc::now())?;
        for stock in &outcome.stocks {
            self.audit(
                AuditEntry::new(request.actor, "inventory.receive", stock.id()).with_metadata(json!({
                    "quantityOnHand": stock.quantity_on_hand(),
                    "averageCost": stock.average_cost(),
                    "batches": outcome.batches.len(),
                })),
            );
        }
        Ok(outcome)
    }

    /// Create a batch and post it to stock in one step.
    pub fn create_batch(&self, request: CreateBatchRequest) -> OperationResult<BatchOutcome> {
        let outcome = receiving::create_batch(&self.store, &request, Utc::now())?;
        self.audit(
            AuditEntry::new(request.actor, "inventory.batch.create", outcome.batch.id()).with_metadata(json!({
                "batchNumber": outcome.batch.batch_number(),
                "quantity": outcome.batch.quantity_received(),
                "purchaseCost": outcome.batch.purchase_cost(),
            })),
        );
        Ok(outcome)
    }

    pub fn adjust_stock(&self, request: AdjustStockRequest) -> OperationResult<Stock> {
        let stock = stock::run(&self.store, &self.config, &request, Utc::now())?;
        self.audit(
            AuditEntry::new(request.actor, "inventory.stock.adjust", stock.id()).with_metadata(json!({
                "movement": request.movement,
                "quantityOnHand": stock.quantity_on_hand(),
                "totalValue": stock.total_value(),
            })),
        );
        Ok(stock)
    }

    /// A product's stock ledger, if anything was ever posted to it.
    pub fn stock(&self, tenant_id: TenantId, product_id: &DocumentId) -> OperationResult<Option<Stock>> {
        load_optional(&self.store, tenant_id, &Stock::id_for(product_id))
    }

    pub fn find_batch(
        &self,
        tenant_id: TenantId,
        product_id: &DocumentId,
        batch_number: &str,
    ) -> OperationResult<Batch> {
        receiving::find_batch(&self.store, tenant_id, product_id, batch_number)
    }

    fn audit(&self, entry: AuditEntry) {
        record_quietly(&self.audit, self.config.audit_enabled, entry);
    }
}
