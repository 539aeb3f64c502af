//! Tenant-partitioned document store boundary.
//!
//! This crate defines the infrastructure-facing abstraction the sagas write
//! through: single-document atomic writes guarded by revision tokens, with no
//! multi-document guarantees.

pub mod fault;
pub mod in_memory;
pub mod traits;
pub mod typed;

pub use fault::{Fault, FaultOp, FaultyStore};
pub use in_memory::InMemoryDocumentStore;
pub use traits::{DocumentStore, RawDocument, Selector, StoreError};
pub use typed::{DocumentStoreExt, from_raw, to_raw};
