//! Single-product stock adjustment.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use tally_core::{DocumentId, TenantId, UserId};
use tally_inventory::{MovementContext, Stock, StockMovement};
use tally_store::DocumentStore;

use crate::config::SagaConfig;
use crate::error::{OperationError, OperationResult};
use crate::lookup::{ReferenceLookup, load_optional};
use crate::saga::Saga;

pub const OPERATION: &str = "stock_adjustment";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustStockRequest {
    pub tenant_id: TenantId,
    pub actor: UserId,
    pub product_id: DocumentId,
    pub movement: StockMovement,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

/// Apply one movement to a product's stock ledger, creating it if needed.
///
/// Issues beyond the quantity on hand and counts below zero are rejected
/// unless negative stock is allowed.
pub fn run<S: DocumentStore + ?Sized>(
    store: &S,
    config: &SagaConfig,
    request: &AdjustStockRequest,
    at: DateTime<Utc>,
) -> OperationResult<Stock> {
    match request.movement {
        StockMovement::In { quantity, unit_cost } => {
            if quantity <= 0 {
                return Err(OperationError::validation("invalid_quantity"));
            }
            if unit_cost < Decimal::ZERO {
                return Err(OperationError::validation("invalid_unit_cost"));
            }
        }
        StockMovement::Out { quantity } if quantity <= 0 => {
            return Err(OperationError::validation("invalid_quantity"));
        }
        StockMovement::Adjustment { quantity } if quantity < 0 && !config.allow_negative_stock => {
            return Err(OperationError::validation("invalid_quantity"));
        }
        _ => {}
    }

    store.product(request.tenant_id, &request.product_id)?;
    let stock_id = Stock::id_for(&request.product_id);
    let before = match load_optional::<Stock, S>(store, request.tenant_id, &stock_id)? {
        Some(stock) => stock,
        None => Stock::empty(&request.product_id, request.actor, at)?,
    };

    if let StockMovement::Out { quantity } = request.movement {
        if quantity > before.quantity_on_hand() && !config.allow_negative_stock {
            return Err(OperationError::validation("insufficient_stock"));
        }
    }

    let ctx = MovementContext {
        reason: request.reason.clone(),
        reference: request.reference.clone(),
        actor: request.actor,
        at,
    };
    let mut next = before.apply(&request.movement, &ctx)?;

    let mut saga = Saga::begin(store, OPERATION);
    saga.save("post_stock", &before, &mut next)?;
    saga.complete();
    Ok(next)
}
