//! Purchasing domain module (purchase orders, receiving records, suppliers).
//!
//! This crate contains business rules for purchase orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;
pub mod receiving;
pub mod supplier;

pub use order::{NewOrderLine, OrderLine, PurchaseOrder, PurchaseOrderStatus, ReceiptLine};
pub use receiving::{ReceivedItem, ReceivingRecord};
pub use supplier::Supplier;
