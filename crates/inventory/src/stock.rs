use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tally_core::{Document, DocumentId, DocumentKind, DocumentMeta, DomainError, DomainResult, UserId};

use crate::costing::{MovementKind, StockLevels, StockMovement, apply_movement};

/// Record of the most recent movement applied to a stock document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastAdjustment {
    pub kind: MovementKind,
    pub quantity: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub adjusted_at: DateTime<Utc>,
    pub adjusted_by: UserId,
}

/// Who moved stock, when, and why.
#[derive(Debug, Clone)]
pub struct MovementContext {
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub actor: UserId,
    pub at: DateTime<Utc>,
}

impl MovementContext {
    pub fn new(actor: UserId, at: DateTime<Utc>) -> Self {
        Self {
            reason: None,
            reference: None,
            actor,
            at,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Document: stock ledger of one product.
///
/// There is exactly one per `(tenant, product)`, addressed by the product's
/// local id under the `stock` kind (see [`Stock::id_for`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    #[serde(flatten)]
    meta: DocumentMeta,
    product_id: DocumentId,
    #[serde(flatten)]
    levels: StockLevels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_adjustment: Option<LastAdjustment>,
}

impl Stock {
    /// Id of the stock document belonging to `product_id`.
    pub fn id_for(product_id: &DocumentId) -> DocumentId {
        product_id.with_kind(DocumentKind::Stock)
    }

    /// A fresh, never-written stock ledger with nothing on hand.
    pub fn empty(product_id: &DocumentId, actor: UserId, at: DateTime<Utc>) -> DomainResult<Self> {
        if product_id.kind() != DocumentKind::Product {
            return Err(DomainError::invalid_id(format!("{product_id} is not a product id")));
        }
        Ok(Self {
            meta: DocumentMeta::new(Self::id_for(product_id), actor, at),
            product_id: product_id.clone(),
            levels: StockLevels::default(),
            last_adjustment: None,
        })
    }

    pub fn product_id(&self) -> &DocumentId {
        &self.product_id
    }

    pub fn levels(&self) -> &StockLevels {
        &self.levels
    }

    pub fn quantity_on_hand(&self) -> i64 {
        self.levels.quantity_on_hand
    }

    pub fn quantity_available(&self) -> i64 {
        self.levels.quantity_available
    }

    pub fn average_cost(&self) -> Decimal {
        self.levels.average_cost
    }

    pub fn total_value(&self) -> Decimal {
        self.levels.total_value
    }

    pub fn last_adjustment(&self) -> Option<&LastAdjustment> {
        self.last_adjustment.as_ref()
    }

    /// Copy of this ledger with `movement` applied and stamped.
    ///
    /// The revision is carried over, so the result can be written back as an
    /// update of the same document.
    pub fn apply(&self, movement: &StockMovement, ctx: &MovementContext) -> DomainResult<Self> {
        let mut next = self.clone();
        next.levels = apply_movement(&self.levels, movement)?;
        next.last_adjustment = Some(LastAdjustment {
            kind: movement.kind(),
            quantity: movement.quantity(),
            previous_quantity: self.levels.quantity_on_hand,
            new_quantity: next.levels.quantity_on_hand,
            unit_cost: movement.unit_cost(),
            reason: ctx.reason.clone(),
            reference: ctx.reference.clone(),
            adjusted_at: ctx.at,
            adjusted_by: ctx.actor,
        });
        next.meta.touch(ctx.actor, ctx.at);
        Ok(next)
    }
}

impl Document for Stock {
    const KIND: DocumentKind = DocumentKind::Stock;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}
