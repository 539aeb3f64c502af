use chrono::Utc;
use serde_json::json;

use tally_core::{Document, DocumentId, DocumentKind, TenantId, UserId};
use tally_purchasing::{NewOrderLine, PurchaseOrder};
use tally_store::{DocumentStore, Selector};

use crate::audit::{AuditEntry, AuditLog, record_quietly};
use crate::config::SagaConfig;
use crate::error::{OperationError, OperationResult};
use crate::lookup::{ReferenceLookup, load};
use crate::saga::Saga;
use crate::saga::receiving::{self, PurchaseReceiptOutcome, PurchaseReceiptRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePurchaseOrderRequest {
    pub tenant_id: TenantId,
    pub actor: UserId,
    pub supplier_id: DocumentId,
    pub order_number: String,
    pub lines: Vec<NewOrderLine>,
}

/// Purchase order lifecycle and receiving.
#[derive(Debug)]
pub struct PurchasingService<S, A> {
    store: S,
    audit: A,
    config: SagaConfig,
}

impl<S: DocumentStore, A: AuditLog> PurchasingService<S, A> {
    pub fn new(store: S, audit: A, config: SagaConfig) -> Self {
        Self { store, audit, config }
    }

    /// Create a draft order. Supplier and every product must exist; order
    /// numbers are unique per tenant.
    pub fn create_purchase_order(&self, request: CreatePurchaseOrderRequest) -> OperationResult<PurchaseOrder> {
        let tenant_id = request.tenant_id;
        self.store.supplier(tenant_id, &request.supplier_id)?;
        for line in &request.lines {
            self.store.product(tenant_id, &line.product_id)?;
        }

        let mut order = PurchaseOrder::create(
            DocumentId::generate(tenant_id, DocumentKind::PurchaseOrder),
            request.supplier_id,
            request.order_number,
            request.lines,
            request.actor,
            Utc::now(),
        )?;

        let same_number = Selector::kind(DocumentKind::PurchaseOrder).eq("orderNumber", order.order_number());
        if !self.store.find(tenant_id, &same_number)?.is_empty() {
            return Err(OperationError::conflict(format!(
                "purchase order {} already exists",
                order.order_number()
            )));
        }

        let mut saga = Saga::begin(&self.store, "create_purchase_order");
        saga.create("create_purchase_order", &mut order)?;
        saga.complete();

        self.audit(
            AuditEntry::new(request.actor, "purchase_order.create", order.id()).with_metadata(json!({
                "orderNumber": order.order_number(),
                "lines": order.lines().len(),
            })),
        );
        Ok(order)
    }

    /// `draft -> pending`.
    pub fn submit(&self, tenant_id: TenantId, actor: UserId, id: &DocumentId) -> OperationResult<PurchaseOrder> {
        let order = self.purchase_order(tenant_id, id)?;
        let next = order.submit(actor, Utc::now())?;
        self.transition("submit_purchase_order", "purchase_order.submit", actor, order, next)
    }

    pub fn cancel(&self, tenant_id: TenantId, actor: UserId, id: &DocumentId) -> OperationResult<PurchaseOrder> {
        let order = self.purchase_order(tenant_id, id)?;
        let next = order.cancel(actor, Utc::now())?;
        self.transition("cancel_purchase_order", "purchase_order.cancel", actor, order, next)
    }

    pub fn receive_purchase_order(&self, request: PurchaseReceiptRequest) -> OperationResult<PurchaseReceiptOutcome> {
        let outcome = receiving::receive_purchase_order(&self.store, &request, Utc::now())?;
        self.audit(
            AuditEntry::new(request.actor, "purchase_order.receive", outcome.purchase_order.id()).with_metadata(
                json!({
                    "receivingId": outcome.receiving.id(),
                    "status": outcome.purchase_order.status(),
                    "quantity": outcome.receiving.total_quantity(),
                }),
            ),
        );
        Ok(outcome)
    }

    pub fn purchase_order(&self, tenant_id: TenantId, id: &DocumentId) -> OperationResult<PurchaseOrder> {
        load(&self.store, tenant_id, id, "purchase_order")
    }

    fn transition(
        &self,
        operation: &'static str,
        action: &str,
        actor: UserId,
        before: PurchaseOrder,
        mut next: PurchaseOrder,
    ) -> OperationResult<PurchaseOrder> {
        let mut saga = Saga::begin(&self.store, operation);
        saga.update("update_status", &before, &mut next)?;
        saga.complete();

        self.audit(
            AuditEntry::new(actor, action, next.id()).with_metadata(json!({
                "from": before.status(),
                "to": next.status(),
            })),
        );
        Ok(next)
    }

    fn audit(&self, entry: AuditEntry) {
        record_quietly(&self.audit, self.config.audit_enabled, entry);
    }
}
