//! Service entry points.
//!
//! Each service owns a store handle, an audit log and the saga configuration.
//! Operations read and validate first, write through a saga, and record one
//! audit entry once the saga has completed.

pub mod accounts;
pub mod inventory;
pub mod purchasing;

pub use accounts::{AccountService, OpenAccountRequest};
pub use inventory::InventoryService;
pub use purchasing::{CreatePurchaseOrderRequest, PurchasingService};
