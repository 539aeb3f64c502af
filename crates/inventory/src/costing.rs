//! Weighted-average stock costing.
//!
//! Pure arithmetic over a product's stock levels. Every stock mutation in the
//! system goes through [`apply_movement`]; it performs no IO and fails only on
//! arithmetic overflow.
//!
//! Value rules:
//! - `total_value` always equals `average_cost * quantity_on_hand` up to decimal
//!   rounding.
//! - Zero or negative on-hand quantity carries no value. The average is `0`
//!   below zero; at exactly zero it is `0` after a receipt and the last purchase
//!   cost after an issue or a count.
//! - `quantity_available` moves by the same delta as `quantity_on_hand`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_core::{DomainError, DomainResult};

/// A single stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockMovement {
    /// Goods received at `unit_cost`.
    #[serde(rename_all = "camelCase")]
    In { quantity: i64, unit_cost: Decimal },
    /// Goods issued at the current average cost.
    Out { quantity: i64 },
    /// Physical count: on-hand becomes exactly `quantity`.
    Adjustment { quantity: i64 },
}

impl StockMovement {
    pub fn kind(&self) -> MovementKind {
        match self {
            StockMovement::In { .. } => MovementKind::In,
            StockMovement::Out { .. } => MovementKind::Out,
            StockMovement::Adjustment { .. } => MovementKind::Adjustment,
        }
    }

    pub fn quantity(&self) -> i64 {
        match self {
            StockMovement::In { quantity, .. }
            | StockMovement::Out { quantity }
            | StockMovement::Adjustment { quantity } => *quantity,
        }
    }

    pub fn unit_cost(&self) -> Option<Decimal> {
        match self {
            StockMovement::In { unit_cost, .. } => Some(*unit_cost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    In,
    Out,
    Adjustment,
}

/// Quantities and valuation of one product's stock.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevels {
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub quantity_available: i64,
    pub average_cost: Decimal,
    pub last_purchase_cost: Decimal,
    pub total_value: Decimal,
}

impl StockLevels {
    /// Whether `total_value` matches `average_cost * quantity_on_hand` within `tolerance`.
    pub fn is_consistent(&self, tolerance: Decimal) -> bool {
        let implied = self.average_cost * Decimal::from(self.quantity_on_hand);
        (implied - self.total_value).abs() <= tolerance
    }
}

/// Apply one movement, returning the new levels.
///
/// Fails only when a quantity leaves the `i64` range (`quantity_overflow`)
/// or a value leaves the `Decimal` range (`value_overflow`).
pub fn apply_movement(current: &StockLevels, movement: &StockMovement) -> DomainResult<StockLevels> {
    let mut next = current.clone();
    let old_qty = current.quantity_on_hand;

    match *movement {
        StockMovement::In { quantity: 0, .. } => return Ok(next),
        StockMovement::In { quantity, unit_cost } => {
            let new_qty = checked_quantity(old_qty.checked_add(quantity))?;
            let received = checked_value(Decimal::from(quantity).checked_mul(unit_cost))?;
            let total = checked_value(current.total_value.checked_add(received))?;
            next.last_purchase_cost = unit_cost;
            (next.average_cost, next.total_value) = if new_qty > 0 {
                (total / Decimal::from(new_qty), total)
            } else {
                (Decimal::ZERO, Decimal::ZERO)
            };
            next.quantity_on_hand = new_qty;
        }
        StockMovement::Out { quantity } => {
            let new_qty = checked_quantity(old_qty.checked_sub(quantity))?;
            let issued = checked_value(Decimal::from(quantity).checked_mul(current.average_cost))?;
            let total = checked_value(current.total_value.checked_sub(issued))?.max(Decimal::ZERO);
            (next.average_cost, next.total_value) =
                revalue(new_qty, total, current.last_purchase_cost);
            next.quantity_on_hand = new_qty;
        }
        StockMovement::Adjustment { quantity: new_qty } => {
            let total = if new_qty <= 0 {
                Decimal::ZERO
            } else if old_qty > 0 {
                checked_value(current.total_value.checked_mul(Decimal::from(new_qty)))?
                    / Decimal::from(old_qty)
            } else {
                let unit = if current.average_cost > Decimal::ZERO {
                    current.average_cost
                } else {
                    current.last_purchase_cost
                };
                checked_value(unit.checked_mul(Decimal::from(new_qty)))?
            };
            (next.average_cost, next.total_value) =
                revalue(new_qty, total, current.last_purchase_cost);
            next.quantity_on_hand = new_qty;
        }
    }

    let delta = checked_quantity(next.quantity_on_hand.checked_sub(old_qty))?;
    next.quantity_available = checked_quantity(current.quantity_available.checked_add(delta))?;
    Ok(next)
}

fn checked_quantity(quantity: Option<i64>) -> DomainResult<i64> {
    quantity.ok_or_else(|| DomainError::validation("quantity_overflow"))
}

fn checked_value(value: Option<Decimal>) -> DomainResult<Decimal> {
    value.ok_or_else(|| DomainError::validation("value_overflow"))
}

fn revalue(quantity: i64, total: Decimal, last_purchase_cost: Decimal) -> (Decimal, Decimal) {
    match quantity {
        q if q > 0 => (total / Decimal::from(q), total),
        0 => (last_purchase_cost, Decimal::ZERO),
        _ => (Decimal::ZERO, Decimal::ZERO),
    }
}
