//! Infrastructure layer: multi-document consistency on a single-document store.
//!
//! Services validate, then write through a [`saga::Saga`] that compensates
//! every earlier write when a later one fails.

pub mod audit;
pub mod config;
pub mod error;
pub mod lookup;
pub mod saga;
pub mod services;


pub use audit::{AuditEntry, AuditError, AuditLog, InMemoryAuditLog, TracingAuditLog};
pub use config::SagaConfig;
pub use error::{
    CompensationAction, OperationError, OperationFailure, OperationResult, SecondaryFailure,
};
pub use lookup::ReferenceLookup;
pub use saga::Saga;
pub use services::{AccountService, InventoryService, PurchasingService};
