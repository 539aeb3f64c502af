use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tally_core::{Document, DocumentId, DocumentKind, DocumentMeta, DomainError, DomainResult, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Active,
    Depleted,
    Expired,
    Recalled,
}

/// Fields of a batch being received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBatch {
    pub product_id: DocumentId,
    pub batch_number: String,
    pub quantity: i64,
    pub purchase_cost: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<DocumentId>,
    pub purchase_order_id: Option<DocumentId>,
}

/// Document: a received lot of one product.
///
/// `batch_number` is unique per product; uniqueness is checked by the caller
/// against the store. `quantity_available` never drops below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    #[serde(flatten)]
    meta: DocumentMeta,
    product_id: DocumentId,
    batch_number: String,
    quantity_received: i64,
    quantity_available: i64,
    quantity_sold: i64,
    quantity_damaged: i64,
    purchase_cost: Decimal,
    total_cost: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry_date: Option<NaiveDate>,
    status: BatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    supplier_id: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    purchase_order_id: Option<DocumentId>,
}

impl Batch {
    pub fn receive(
        id: DocumentId,
        new: NewBatch,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if id.kind() != DocumentKind::Batch {
            return Err(DomainError::invalid_id(format!("{id} is not a batch id")));
        }
        if new.product_id.kind() != DocumentKind::Product {
            return Err(DomainError::invalid_id(format!(
                "{} is not a product id",
                new.product_id
            )));
        }
        let batch_number = new.batch_number.trim().to_string();
        if batch_number.is_empty() {
            return Err(DomainError::validation("batch_number_required"));
        }
        if new.quantity <= 0 {
            return Err(DomainError::validation("invalid_quantity"));
        }
        if new.purchase_cost < Decimal::ZERO {
            return Err(DomainError::validation("invalid_unit_cost"));
        }
        let total_cost = new
            .purchase_cost
            .checked_mul(Decimal::from(new.quantity))
            .ok_or_else(|| DomainError::validation("value_overflow"))?;

        Ok(Self {
            meta: DocumentMeta::new(id, actor, at),
            product_id: new.product_id,
            batch_number,
            quantity_received: new.quantity,
            quantity_available: new.quantity,
            quantity_sold: 0,
            quantity_damaged: 0,
            total_cost,
            purchase_cost: new.purchase_cost,
            expiry_date: new.expiry_date,
            status: BatchStatus::Active,
            supplier_id: new.supplier_id,
            purchase_order_id: new.purchase_order_id,
        })
    }

    pub fn product_id(&self) -> &DocumentId {
        &self.product_id
    }

    pub fn batch_number(&self) -> &str {
        &self.batch_number
    }

    pub fn quantity_received(&self) -> i64 {
        self.quantity_received
    }

    pub fn quantity_available(&self) -> i64 {
        self.quantity_available
    }

    pub fn quantity_sold(&self) -> i64 {
        self.quantity_sold
    }

    pub fn quantity_damaged(&self) -> i64 {
        self.quantity_damaged
    }

    pub fn purchase_cost(&self) -> Decimal {
        self.purchase_cost
    }

    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn supplier_id(&self) -> Option<&DocumentId> {
        self.supplier_id.as_ref()
    }

    pub fn purchase_order_id(&self) -> Option<&DocumentId> {
        self.purchase_order_id.as_ref()
    }

    /// Copy of this batch with `quantity` sold out of it.
    pub fn consume(&self, quantity: i64, actor: UserId, at: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.take(quantity, actor, at)?;
        next.quantity_sold += quantity;
        Ok(next)
    }

    /// Copy of this batch with `quantity` written off as damaged.
    pub fn record_damage(&self, quantity: i64, actor: UserId, at: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.take(quantity, actor, at)?;
        next.quantity_damaged += quantity;
        Ok(next)
    }

    fn take(&self, quantity: i64, actor: UserId, at: DateTime<Utc>) -> DomainResult<Self> {
        if self.status != BatchStatus::Active {
            return Err(DomainError::validation("batch_not_active"));
        }
        if quantity <= 0 {
            return Err(DomainError::validation("invalid_quantity"));
        }
        if quantity > self.quantity_available {
            return Err(DomainError::validation("insufficient_stock"));
        }

        let mut next = self.clone();
        next.quantity_available -= quantity;
        if next.quantity_available == 0 {
            next.status = BatchStatus::Depleted;
        }
        next.meta.touch(actor, at);
        Ok(next)
    }
}

impl Document for Batch {
    const KIND: DocumentKind = DocumentKind::Batch;

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
    use rust_decimal_macros::dec;
    use tally_core::TenantId;

    fn new_batch(tenant: TenantId, quantity: i64) -> NewBatch {
        NewBatch {
            product_id: DocumentId::generate(tenant, DocumentKind::Product),
            batch_number: "BATCH-001".to_string(),
            quantity,
            purchase_cost: dec!(25),
            expiry_date: NaiveDate::from_ymd_opt(2027, 1, 31),
            supplier_id: None,
            purchase_order_id: None,
        }
    }

    fn received(quantity: i64) -> Batch {
        let tenant = TenantId::new();
        Batch::receive(
            DocumentId::generate(tenant, DocumentKind::Batch),
            new_batch(tenant, quantity),
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn receive_makes_everything_available() {
        let batch = received(100);
        assert_eq!(batch.quantity_received(), 100);
        assert_eq!(batch.quantity_available(), 100);
        assert_eq!(batch.total_cost(), dec!(2500));
        assert_eq!(batch.status(), BatchStatus::Active);
    }

    #[test]
    fn receive_rejects_cost_beyond_decimal_range() {
        let tenant = TenantId::new();
        let mut huge = new_batch(tenant, i64::MAX);
        huge.purchase_cost = dec!(100000000000);
        assert_eq!(
            Batch::receive(
                DocumentId::generate(tenant, DocumentKind::Batch),
                huge,
                UserId::new(),
                Utc::now()
            )
            .unwrap_err(),
            DomainError::validation("value_overflow")
        );
    }

    #[test]
    fn receive_validates_number_quantity_and_cost() {
        let tenant = TenantId::new();
        let id = DocumentId::generate(tenant, DocumentKind::Batch);

        let mut blank = new_batch(tenant, 1);
        blank.batch_number = "  ".to_string();
        assert_eq!(
            Batch::receive(id.clone(), blank, UserId::new(), Utc::now()).unwrap_err(),
            DomainError::validation("batch_number_required")
        );

        assert_eq!(
            Batch::receive(id.clone(), new_batch(tenant, 0), UserId::new(), Utc::now()).unwrap_err(),
            DomainError::validation("invalid_quantity")
        );

        let mut negative = new_batch(tenant, 1);
        negative.purchase_cost = dec!(-0.01);
        assert_eq!(
            Batch::receive(id, negative, UserId::new(), Utc::now()).unwrap_err(),
            DomainError::validation("invalid_unit_cost")
        );
    }

    #[test]
    fn consuming_everything_depletes_the_batch() {
        let batch = received(10);
        let batch = batch.consume(4, UserId::new(), Utc::now()).unwrap();
        let batch = batch.record_damage(6, UserId::new(), Utc::now()).unwrap();
        assert_eq!(batch.quantity_available(), 0);
        assert_eq!(batch.quantity_sold(), 4);
        assert_eq!(batch.quantity_damaged(), 6);
        assert_eq!(batch.status(), BatchStatus::Depleted);

        let err = batch.consume(1, UserId::new(), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("batch_not_active"));
    }

    #[test]
    fn available_never_goes_below_zero() {
        let batch = received(3);
        let err = batch.consume(4, UserId::new(), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("insufficient_stock"));
        assert_eq!(batch.quantity_available(), 3);
    }

    #[test]
    fn serialized_shape_uses_camel_case() {
        let body = serde_json::to_value(received(5)).unwrap();
        assert_eq!(body["type"], "batch");
        assert_eq!(body["batchNumber"], "BATCH-001");
        assert_eq!(body["quantityAvailable"], 5);
        assert_eq!(body["status"], "active");
        assert_eq!(body["expiryDate"], "2027-01-31");
    }
}
