//! Audit trail of completed operations.
//!
//! Recording is fire-and-forget: a failing audit log is logged and never
//! affects the outcome of the operation being audited.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use tally_core::{DocumentId, DocumentKind, TenantId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub tenant_id: TenantId,
    pub actor: UserId,
    /// Dotted action name, e.g. `account.transfer`.
    pub action: String,
    pub resource_kind: DocumentKind,
    pub resource_id: DocumentId,
    pub metadata: JsonValue,
}

impl AuditEntry {
    pub fn new(actor: UserId, action: impl Into<String>, resource_id: &DocumentId) -> Self {
        Self {
            tenant_id: resource_id.tenant_id(),
            actor,
            action: action.into(),
            resource_kind: resource_id.kind(),
            resource_id: resource_id.clone(),
            metadata: JsonValue::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit log unavailable: {0}")]
    Unavailable(String),
}

pub trait AuditLog: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

impl<A: AuditLog + ?Sized> AuditLog for std::sync::Arc<A> {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        (**self).record(entry)
    }
}

/// Audit log that writes each entry as a structured `tracing` event
/// (target `audit`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        tracing::info!(
            target: "audit",
            tenant_id = %entry.tenant_id,
            actor = %entry.actor,
            action = %entry.action,
            resource_kind = %entry.resource_kind,
            resource_id = %entry.resource_id,
            metadata = %entry.metadata,
            "audit"
        );
        Ok(())
    }
}

/// In-memory audit log (tests/dev). Can be switched to failing mode.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
    failing: Mutex<bool>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent record.
    pub fn fail_from_now_on(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            *failing = true;
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => Vec::new(),
        }
    }

    pub fn actions(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.action).collect()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| AuditError::Unavailable("lock poisoned".to_string()))?;
        if *failing {
            return Err(AuditError::Unavailable("audit log rejected entry".to_string()));
        }
        self.entries
            .lock()
            .map_err(|_| AuditError::Unavailable("lock poisoned".to_string()))?
            .push(entry);
        Ok(())
    }
}

/// Record `entry`, logging instead of propagating a failure.
pub(crate) fn record_quietly<A: AuditLog + ?Sized>(audit: &A, enabled: bool, entry: AuditEntry) {
    if !enabled {
        return;
    }
    let action = entry.action.clone();
    if let Err(err) = audit.record(entry) {
        tracing::warn!(%action, error = %err, "audit record failed");
    }
}
