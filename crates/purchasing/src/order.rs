use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tally_core::{Document, DocumentId, DocumentKind, DocumentMeta, DomainError, DomainResult, UserId};

/// Purchase order status lifecycle.
///
/// `draft -> pending -> {partial -> completed, completed}`; `cancelled` is
/// reachable from `draft`, `pending` and `partial`. `completed` and
/// `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Pending,
    Partial,
    Completed,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Partial => "partial",
            PurchaseOrderStatus::Completed => "completed",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Completed | PurchaseOrderStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, to: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;
        matches!(
            (self, to),
            (Draft, Pending)
                | (Pending, Partial)
                | (Partial, Partial)
                | (Pending, Completed)
                | (Partial, Completed)
                | (Draft, Cancelled)
                | (Pending, Cancelled)
                | (Partial, Cancelled)
        )
    }

    /// `to`, if the transition is in the table.
    pub fn transition_to(&self, to: PurchaseOrderStatus) -> DomainResult<PurchaseOrderStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(DomainError::invalid_transition(self, to))
        }
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub line_no: u32,
    pub product_id: DocumentId,
    pub quantity_ordered: i64,
    pub quantity_received: i64,
    pub unit_cost: Decimal,
}

impl OrderLine {
    pub fn outstanding(&self) -> i64 {
        self.quantity_ordered - self.quantity_received
    }

    pub fn is_fully_received(&self) -> bool {
        self.quantity_received >= self.quantity_ordered
    }
}

/// A line as requested when the order is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: DocumentId,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

/// Quantity of one product arriving against an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLine {
    pub product_id: DocumentId,
    pub quantity: i64,
}

/// Document: PurchaseOrder.
///
/// Invariant: `quantity_received <= quantity_ordered` on every line. Each
/// product appears on at most one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    #[serde(flatten)]
    meta: DocumentMeta,
    supplier_id: DocumentId,
    order_number: String,
    status: PurchaseOrderStatus,
    lines: Vec<OrderLine>,
    #[serde(default)]
    receiving_ids: Vec<DocumentId>,
}

impl PurchaseOrder {
    /// New order in `draft`.
    pub fn create(
        id: DocumentId,
        supplier_id: DocumentId,
        order_number: impl Into<String>,
        lines: Vec<NewOrderLine>,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if id.kind() != DocumentKind::PurchaseOrder {
            return Err(DomainError::invalid_id(format!("{id} is not a purchase order id")));
        }
        if supplier_id.kind() != DocumentKind::Supplier {
            return Err(DomainError::invalid_id(format!("{supplier_id} is not a supplier id")));
        }
        let order_number = order_number.into().trim().to_string();
        if order_number.is_empty() {
            return Err(DomainError::validation("order_number_required"));
        }
        if lines.is_empty() {
            return Err(DomainError::validation("lines_required"));
        }

        let mut order_lines: Vec<OrderLine> = Vec::with_capacity(lines.len());
        for (index, line) in lines.into_iter().enumerate() {
            if line.product_id.kind() != DocumentKind::Product {
                return Err(DomainError::invalid_id(format!(
                    "{} is not a product id",
                    line.product_id
                )));
            }
            if line.quantity <= 0 {
                return Err(DomainError::validation("invalid_quantity"));
            }
            if line.unit_cost < Decimal::ZERO {
                return Err(DomainError::validation("invalid_unit_cost"));
            }
            if order_lines.iter().any(|l| l.product_id == line.product_id) {
                return Err(DomainError::validation("duplicate_product_line"));
            }
            order_lines.push(OrderLine {
                line_no: index as u32 + 1,
                product_id: line.product_id,
                quantity_ordered: line.quantity,
                quantity_received: 0,
                unit_cost: line.unit_cost,
            });
        }

        Ok(Self {
            meta: DocumentMeta::new(id, actor, at),
            supplier_id,
            order_number,
            status: PurchaseOrderStatus::Draft,
            lines: order_lines,
            receiving_ids: Vec::new(),
        })
    }

    pub fn supplier_id(&self) -> &DocumentId {
        &self.supplier_id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn line_for(&self, product_id: &DocumentId) -> Option<&OrderLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    pub fn receiving_ids(&self) -> &[DocumentId] {
        &self.receiving_ids
    }

    /// `draft -> pending`.
    pub fn submit(&self, actor: UserId, at: DateTime<Utc>) -> DomainResult<Self> {
        self.with_status(PurchaseOrderStatus::Pending, actor, at)
    }

    pub fn cancel(&self, actor: UserId, at: DateTime<Utc>) -> DomainResult<Self> {
        self.with_status(PurchaseOrderStatus::Cancelled, actor, at)
    }

    /// Copy of this order with `items` counted as received under `receiving_id`.
    ///
    /// Everything is checked before anything is changed: items must be
    /// positive, on the order, and within the outstanding quantity of their
    /// line (`over_delivery`). The status moves to `completed` once every line
    /// is fully received, otherwise to `partial`.
    pub fn record_receipt(
        &self,
        items: &[ReceiptLine],
        receiving_id: DocumentId,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("items_required"));
        }

        let mut increments: HashMap<&DocumentId, i64> = HashMap::new();
        for item in items {
            if item.quantity <= 0 {
                return Err(DomainError::validation("invalid_quantity"));
            }
            let Some(line) = self.line_for(&item.product_id) else {
                return Err(DomainError::validation("product_not_on_order"));
            };
            let total = increments.entry(&line.product_id).or_insert(0);
            if item.quantity > line.outstanding() - *total {
                return Err(DomainError::validation("over_delivery"));
            }
            *total += item.quantity;
        }

        let mut next = self.clone();
        for line in next.lines.iter_mut() {
            if let Some(quantity) = increments.get(&line.product_id) {
                line.quantity_received += quantity;
            }
        }
        let target = if next.lines.iter().all(OrderLine::is_fully_received) {
            PurchaseOrderStatus::Completed
        } else {
            PurchaseOrderStatus::Partial
        };
        next.status = self.status.transition_to(target)?;
        next.receiving_ids.push(receiving_id);
        next.meta.touch(actor, at);
        Ok(next)
    }

    fn with_status(
        &self,
        to: PurchaseOrderStatus,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut next = self.clone();
        next.status = self.status.transition_to(to)?;
        next.meta.touch(actor, at);
        Ok(next)
    }
}

impl Document for PurchaseOrder {
    const KIND: DocumentKind = DocumentKind::PurchaseOrder;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use tally_core::TenantId;

    use PurchaseOrderStatus::*;

    const ALL: [PurchaseOrderStatus; 5] = [Draft, Pending, Partial, Completed, Cancelled];

    struct Fixture {
        tenant: TenantId,
        products: Vec<DocumentId>,
    }

    impl Fixture {
        fn new(products: usize) -> Self {
            let tenant = TenantId::new();
            Self {
                tenant,
                products: (0..products)
                    .map(|_| DocumentId::generate(tenant, DocumentKind::Product))
                    .collect(),
            }
        }

        fn order(&self, quantities: &[i64]) -> PurchaseOrder {
            let lines = self
                .products
                .iter()
                .zip(quantities)
                .map(|(product_id, &quantity)| NewOrderLine {
                    product_id: product_id.clone(),
                    quantity,
                    unit_cost: dec!(12.50),
                })
                .collect();
            PurchaseOrder::create(
                DocumentId::generate(self.tenant, DocumentKind::PurchaseOrder),
                DocumentId::generate(self.tenant, DocumentKind::Supplier),
                "PO-0001",
                lines,
                UserId::new(),
                Utc::now(),
            )
            .unwrap()
        }

        fn pending(&self, quantities: &[i64]) -> PurchaseOrder {
            self.order(quantities).submit(UserId::new(), Utc::now()).unwrap()
        }

        fn receiving_id(&self) -> DocumentId {
            DocumentId::generate(self.tenant, DocumentKind::ReceivingRecord)
        }

        fn receive(&self, order: &PurchaseOrder, product: usize, quantity: i64) -> DomainResult<PurchaseOrder> {
            order.record_receipt(
                &[ReceiptLine {
                    product_id: self.products[product].clone(),
                    quantity,
                }],
                self.receiving_id(),
                UserId::new(),
                Utc::now(),
            )
        }
    }

    #[test]
    fn transition_table_matches_lifecycle() {
        let allowed: Vec<(PurchaseOrderStatus, PurchaseOrderStatus)> = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (Draft, Pending),
                (Draft, Cancelled),
                (Pending, Partial),
                (Pending, Completed),
                (Pending, Cancelled),
                (Partial, Partial),
                (Partial, Completed),
                (Partial, Cancelled),
            ]
        );
        for status in [Completed, Cancelled] {
            assert!(status.is_terminal());
            assert!(ALL.iter().all(|to| !status.can_transition_to(*to)));
        }
    }

    #[test]
    fn illegal_transition_reports_both_ends() {
        let err = Completed.transition_to(Pending).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "completed".to_string(),
                to: "pending".to_string()
            }
        );
    }

    #[test]
    fn create_validates_lines() {
        let fixture = Fixture::new(1);
        let create = |lines: Vec<NewOrderLine>| {
            PurchaseOrder::create(
                DocumentId::generate(fixture.tenant, DocumentKind::PurchaseOrder),
                DocumentId::generate(fixture.tenant, DocumentKind::Supplier),
                "PO-1",
                lines,
                UserId::new(),
                Utc::now(),
            )
        };
        let line = |quantity: i64| NewOrderLine {
            product_id: fixture.products[0].clone(),
            quantity,
            unit_cost: dec!(1),
        };

        assert_eq!(create(vec![]).unwrap_err(), DomainError::validation("lines_required"));
        assert_eq!(create(vec![line(0)]).unwrap_err(), DomainError::validation("invalid_quantity"));
        assert_eq!(
            create(vec![line(1), line(2)]).unwrap_err(),
            DomainError::validation("duplicate_product_line")
        );

        let order = create(vec![line(3)]).unwrap();
        assert_eq!(order.status(), Draft);
        assert_eq!(order.lines()[0].line_no, 1);
    }

    #[test]
    fn partial_then_complete() {
        let fixture = Fixture::new(2);
        let order = fixture.pending(&[10, 4]);

        let order = fixture.receive(&order, 0, 8).unwrap();
        assert_eq!(order.status(), Partial);
        assert_eq!(order.lines()[0].quantity_received, 8);
        assert_eq!(order.receiving_ids().len(), 1);

        let order = fixture.receive(&order, 0, 2).unwrap();
        assert_eq!(order.status(), Partial);

        let order = fixture.receive(&order, 1, 4).unwrap();
        assert_eq!(order.status(), Completed);
        assert_eq!(order.receiving_ids().len(), 3);
    }

    #[test]
    fn over_delivery_is_rejected_without_changes() {
        let fixture = Fixture::new(1);
        let order = fixture.receive(&fixture.pending(&[10]), 0, 8).unwrap();

        let err = fixture.receive(&order, 0, 5).unwrap_err();
        assert_eq!(err, DomainError::validation("over_delivery"));
        assert_eq!(order.lines()[0].quantity_received, 8);
    }

    #[test]
    fn repeated_product_in_one_receipt_is_summed() {
        let fixture = Fixture::new(1);
        let order = fixture.pending(&[10]);
        let item = ReceiptLine {
            product_id: fixture.products[0].clone(),
            quantity: 6,
        };
        let err = order
            .record_receipt(&[item.clone(), item], fixture.receiving_id(), UserId::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err, DomainError::validation("over_delivery"));
    }

    #[test]
    fn huge_repeated_quantity_is_over_delivery() {
        let fixture = Fixture::new(1);
        let order = fixture.pending(&[10]);
        let line = |quantity| ReceiptLine {
            product_id: fixture.products[0].clone(),
            quantity,
        };
        let err = order
            .record_receipt(&[line(5), line(i64::MAX)], fixture.receiving_id(), UserId::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err, DomainError::validation("over_delivery"));
    }

    #[test]
    fn unknown_product_is_rejected() {
        let fixture = Fixture::new(1);
        let order = fixture.pending(&[10]);
        let stranger = ReceiptLine {
            product_id: DocumentId::generate(fixture.tenant, DocumentKind::Product),
            quantity: 1,
        };
        let err = order
            .record_receipt(&[stranger], fixture.receiving_id(), UserId::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err, DomainError::validation("product_not_on_order"));
    }

    #[test]
    fn receiving_requires_a_submitted_order() {
        let fixture = Fixture::new(1);
        let draft = fixture.order(&[10]);
        assert!(matches!(
            fixture.receive(&draft, 0, 1),
            Err(DomainError::InvalidTransition { .. })
        ));

        let cancelled = fixture.pending(&[10]).cancel(UserId::new(), Utc::now()).unwrap();
        let err = fixture.receive(&cancelled, 0, 1).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "cancelled".to_string(),
                to: "partial".to_string()
            }
        );
    }

    #[test]
    fn serialized_shape_uses_camel_case() {
        let fixture = Fixture::new(1);
        let body = serde_json::to_value(fixture.pending(&[3])).unwrap();
        assert_eq!(body["type"], "purchase_order");
        assert_eq!(body["status"], "pending");
        assert_eq!(body["orderNumber"], "PO-0001");
        assert_eq!(body["lines"][0]["quantityOrdered"], 3);
        assert_eq!(body["receivingIds"], serde_json::json!([]));
    }

    proptest! {
        /// Property: whatever sequence of receipts is attempted, no line is
        /// ever received beyond what was ordered, and the order completes
        /// exactly when every line is full.
        #[test]
        fn received_never_exceeds_ordered(
            ordered in prop::collection::vec(1i64..50, 1..4),
            attempts in prop::collection::vec((0usize..4, 1i64..30), 0..20),
        ) {
            let fixture = Fixture::new(ordered.len());
            let mut order = fixture.pending(&ordered);
            for (product, quantity) in attempts {
                let product = product % ordered.len();
                if let Ok(next) = fixture.receive(&order, product, quantity) {
                    order = next;
                }
                for line in order.lines() {
                    prop_assert!(line.quantity_received <= line.quantity_ordered);
                }
                let all_full = order.lines().iter().all(OrderLine::is_fully_received);
                prop_assert_eq!(order.status() == Completed, all_full);
            }
        }
    }
}
