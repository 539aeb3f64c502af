//! `tally-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, revision tokens, the document envelope and the domain error.

pub mod document;
pub mod error;
pub mod id;
pub mod revision;

pub use document::{Document, DocumentMeta};
pub use error::{DomainError, DomainResult};
pub use id::{DocumentId, DocumentKind, TenantId, UserId};
pub use revision::Revision;
