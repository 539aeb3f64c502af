//! Error model of the service layer.
//!
//! Every operation ends either fully applied or fully compensated. Failures
//! detected before the first write carry their business meaning (`NotFound`,
//! `Validation`, `Conflict`, `InvalidTransition`) or, for store failures
//! while reading, `Unavailable`. Failures after the first write are always
//! reported as one opaque [`OperationError::OperationFailed`].

use thiserror::Error;

use tally_core::{DocumentId, DomainError};
use tally_store::StoreError;

pub type OperationResult<T> = Result<T, OperationError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OperationError {
    /// A referenced document does not exist. Carries the resource kind
    /// (`account`, `category`, `product`, ...).
    #[error("{0} not found")]
    NotFound(String),

    /// Business-rule violation with a stable code (`insufficient_funds`, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Duplicate unique key.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The store failed before anything was written.
    #[error("document store unavailable")]
    Unavailable(#[source] StoreError),

    /// The store failed after writing started; compensation has run.
    #[error("{0}")]
    OperationFailed(OperationFailure),
}

impl OperationError {
    pub fn validation(code: impl Into<String>) -> Self {
        Self::Validation(code.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// The failure of a saga, if this is one.
    pub fn failure(&self) -> Option<&OperationFailure> {
        match self {
            OperationError::OperationFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<DomainError> for OperationError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(code) => Self::Validation(code),
            DomainError::InvariantViolation(msg) => Self::Validation(msg),
            DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound(resource) => Self::NotFound(resource),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
        }
    }
}

/// Read-phase store failures. `NotFound` should be mapped to a resource name by
/// the caller before reaching this conversion.
impl From<StoreError> for OperationError {
    fn from(value: StoreError) -> Self {
        Self::Unavailable(value)
    }
}

/// What a compensation was trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationAction {
    /// Write back the pre-mutation snapshot.
    Restore,
    /// Delete a document the saga created.
    Destroy,
}

/// A compensation that itself failed. Logged, collected, never re-raised.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryFailure {
    pub step: &'static str,
    pub action: CompensationAction,
    pub document_id: DocumentId,
    pub error: StoreError,
}

/// A saga that failed mid-sequence.
///
/// Displays as the opaque `<operation>.failed`; the failing step, the store
/// error behind it and any failed compensations are available structurally.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationFailure {
    pub operation: &'static str,
    pub step: &'static str,
    pub cause: StoreError,
    pub secondary: Vec<SecondaryFailure>,
}

impl OperationFailure {
    /// A stale revision caused the failure; the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        self.cause.is_conflict()
    }

    /// Every compensation succeeded, so the store is back to its pre-call state.
    pub fn is_fully_compensated(&self) -> bool {
        self.secondary.is_empty()
    }
}

impl core::fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.failed", self.operation)
    }
}
