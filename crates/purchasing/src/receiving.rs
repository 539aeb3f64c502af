use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tally_core::{Document, DocumentId, DocumentKind, DocumentMeta, DomainError, DomainResult, UserId};

/// One product as it was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedItem {
    pub product_id: DocumentId,
    pub quantity: i64,
    pub unit_cost: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<DocumentId>,
}

/// Document: immutable snapshot of one receiving event against a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivingRecord {
    #[serde(flatten)]
    meta: DocumentMeta,
    purchase_order_id: DocumentId,
    items: Vec<ReceivedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    received_at: DateTime<Utc>,
}

impl ReceivingRecord {
    pub fn new(
        id: DocumentId,
        purchase_order_id: DocumentId,
        items: Vec<ReceivedItem>,
        notes: Option<String>,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if id.kind() != DocumentKind::ReceivingRecord {
            return Err(DomainError::invalid_id(format!("{id} is not a receiving record id")));
        }
        if purchase_order_id.kind() != DocumentKind::PurchaseOrder {
            return Err(DomainError::invalid_id(format!(
                "{purchase_order_id} is not a purchase order id"
            )));
        }
        if items.is_empty() {
            return Err(DomainError::validation("items_required"));
        }
        Ok(Self {
            meta: DocumentMeta::new(id, actor, at),
            purchase_order_id,
            items,
            notes,
            received_at: at,
        })
    }

    pub fn purchase_order_id(&self) -> &DocumentId {
        &self.purchase_order_id
    }

    pub fn items(&self) -> &[ReceivedItem] {
        &self.items
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

impl Document for ReceivingRecord {
    const KIND: DocumentKind = DocumentKind::ReceivingRecord;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}
