use serde_json::Value as JsonValue;
use thiserror::Error;

use tally_core::{DocumentId, DocumentKind, Revision, TenantId};
use std::sync::Arc;

/// A document as the store sees it: identity, revision and an opaque JSON body.
///
/// `rev == None` on insert means "create"; `Some` means "update the document
/// currently at this revision". Documents returned by the store always carry
/// their current revision.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: DocumentId,
    pub rev: Option<Revision>,
    pub body: JsonValue,
}

/// Document store operation error.
///
/// These are **infrastructure errors** (missing documents, stale revisions,
/// isolation, backend failures) as opposed to domain errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    #[error("revision conflict: {0}")]
    Conflict(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Equality filter over document bodies, scoped to one kind.
///
/// Field paths are dotted (`lastAdjustment.kind`) and compared against the JSON
/// value exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    kind: Option<DocumentKind>,
    fields: Vec<(String, JsonValue)>,
}

impl Selector {
    pub fn kind(kind: DocumentKind) -> Self {
        Self {
            kind: Some(kind),
            fields: Vec::new(),
        }
    }

    pub fn eq(mut self, path: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.fields.push((path.into(), value.into()));
        self
    }

    pub fn target_kind(&self) -> Option<DocumentKind> {
        self.kind
    }

    pub fn matches(&self, doc: &RawDocument) -> bool {
        if let Some(kind) = self.kind {
            if doc.id.kind() != kind {
                return false;
            }
        }
        self.fields
            .iter()
            .all(|(path, expected)| lookup_path(&doc.body, path) == Some(expected))
    }
}

fn lookup_path<'a>(body: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.').try_fold(body, |node, segment| node.get(segment))
}

/// Tenant-partitioned document store with single-document atomicity.
///
/// Each write is atomic and optimistically checked against the document's
/// revision. There is no multi-document transaction and no locking; anything
/// that spans documents is orchestrated above this trait.
///
/// Implementations must:
/// - reject a create (`rev == None`) for an id that already exists (`Conflict`)
/// - reject an update whose revision is stale (`Conflict`) or whose document is missing (`NotFound`)
/// - assign a fresh revision on every successful write
/// - scope `find` to the given tenant's partition
pub trait DocumentStore: Send + Sync {
    fn get(&self, id: &DocumentId) -> Result<RawDocument, StoreError>;

    /// Create-or-update; returns the new revision.
    fn insert(&self, doc: RawDocument) -> Result<Revision, StoreError>;

    fn destroy(&self, id: &DocumentId, rev: &Revision) -> Result<(), StoreError>;

    fn find(&self, tenant_id: TenantId, selector: &Selector) -> Result<Vec<RawDocument>, StoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn get(&self, id: &DocumentId) -> Result<RawDocument, StoreError> {
        (**self).get(id)
    }

    fn insert(&self, doc: RawDocument) -> Result<Revision, StoreError> {
        (**self).insert(doc)
    }

    fn destroy(&self, id: &DocumentId, rev: &Revision) -> Result<(), StoreError> {
        (**self).destroy(id, rev)
    }

    fn find(&self, tenant_id: TenantId, selector: &Selector) -> Result<Vec<RawDocument>, StoreError> {
        (**self).find(tenant_id, selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(kind: DocumentKind, body: JsonValue) -> RawDocument {
        RawDocument {
            id: DocumentId::generate(TenantId::new(), kind),
            rev: None,
            body,
        }
    }

    #[test]
    fn selector_filters_on_kind_and_nested_fields() {
        let doc = raw(
            DocumentKind::Batch,
            json!({ "productId": "p1", "lastAdjustment": { "kind": "in" } }),
        );

        assert!(Selector::kind(DocumentKind::Batch).eq("productId", "p1").matches(&doc));
        assert!(Selector::kind(DocumentKind::Batch)
            .eq("lastAdjustment.kind", "in")
            .matches(&doc));
        assert!(!Selector::kind(DocumentKind::Stock).matches(&doc));
        assert!(!Selector::kind(DocumentKind::Batch).eq("productId", "p2").matches(&doc));
        assert!(!Selector::kind(DocumentKind::Batch).eq("missing", "x").matches(&doc));
    }
}
