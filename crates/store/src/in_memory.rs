use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use tally_core::{DocumentId, DocumentKind, Revision, TenantId};

use crate::traits::{DocumentStore, RawDocument, Selector, StoreError};

#[derive(Debug, Clone)]
struct Slot {
    rev: Revision,
    body: JsonValue,
}

/// In-memory document store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<DocumentId, Slot>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents of `kind` in a tenant's partition.
    pub fn count(&self, tenant_id: TenantId, kind: DocumentKind) -> usize {
        match self.docs.read() {
            Ok(docs) => docs
                .keys()
                .filter(|id| id.tenant_id() == tenant_id && id.kind() == kind)
                .count(),
            Err(_) => 0,
        }
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, id: &DocumentId) -> Result<RawDocument, StoreError> {
        let docs = self
            .docs
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let slot = docs.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(RawDocument {
            id: id.clone(),
            rev: Some(slot.rev.clone()),
            body: slot.body.clone(),
        })
    }

    fn insert(&self, doc: RawDocument) -> Result<Revision, StoreError> {
        if !doc.body.is_object() {
            return Err(StoreError::Serialization(format!(
                "document body for {} must be a JSON object",
                doc.id
            )));
        }

        let mut docs = self
            .docs
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let next = match (docs.get(&doc.id), doc.rev.as_ref()) {
            (None, None) => Revision::initial(),
            (Some(_), None) => {
                return Err(StoreError::Conflict(format!("document {} already exists", doc.id)));
            }
            (None, Some(_)) => return Err(StoreError::NotFound(doc.id.clone())),
            (Some(slot), Some(presented)) => {
                slot.rev
                    .check(presented)
                    .map_err(|e| StoreError::Conflict(format!("{}: {e}", doc.id)))?;
                slot.rev.next()
            }
        };

        docs.insert(
            doc.id,
            Slot {
                rev: next.clone(),
                body: doc.body,
            },
        );
        Ok(next)
    }

    fn destroy(&self, id: &DocumentId, rev: &Revision) -> Result<(), StoreError> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let slot = docs.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        slot.rev
            .check(rev)
            .map_err(|e| StoreError::Conflict(format!("{id}: {e}")))?;
        docs.remove(id);
        Ok(())
    }

    fn find(&self, tenant_id: TenantId, selector: &Selector) -> Result<Vec<RawDocument>, StoreError> {
        let docs = self
            .docs
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let mut found: Vec<RawDocument> = docs
            .iter()
            .filter(|(id, _)| id.tenant_id() == tenant_id)
            .map(|(id, slot)| RawDocument {
                id: id.clone(),
                rev: Some(slot.rev.clone()),
                body: slot.body.clone(),
            })
            .filter(|doc| selector.matches(doc))
            .collect();

        // HashMap iteration order is arbitrary; keep results stable for callers.
        found.sort_by_key(|doc| doc.id.to_string());
        Ok(found)
    }
}
