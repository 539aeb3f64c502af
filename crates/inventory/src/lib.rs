//! Inventory domain module (stock ledgers, batches, weighted-average costing).
//!
//! This crate contains business rules for inventory, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod batch;
pub mod costing;
pub mod product;
pub mod stock;

pub use batch::{Batch, BatchStatus, NewBatch};
pub use costing::{MovementKind, StockLevels, StockMovement, apply_movement};
pub use product::Product;
pub use stock::{LastAdjustment, MovementContext, Stock};
