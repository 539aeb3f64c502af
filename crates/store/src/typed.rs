//! Typed access on top of the raw document store.

use tally_core::{Document, DocumentId, Revision, TenantId};

use crate::traits::{DocumentStore, RawDocument, Selector, StoreError};

/// Serialize a typed document into its raw form (revision carried alongside).
pub fn to_raw<D: Document>(doc: &D) -> Result<RawDocument, StoreError> {
    let body = serde_json::to_value(doc)
        .map_err(|e| StoreError::Serialization(format!("{}: {e}", doc.id())))?;
    Ok(RawDocument {
        id: doc.id().clone(),
        rev: doc.rev().cloned(),
        body,
    })
}

/// Deserialize a raw document, checking it is of the expected kind.
pub fn from_raw<D: Document>(raw: RawDocument) -> Result<D, StoreError> {
    if raw.id.kind() != D::KIND {
        return Err(StoreError::Serialization(format!(
            "expected a {} document, found {}",
            D::KIND,
            raw.id
        )));
    }
    let mut doc: D = serde_json::from_value(raw.body)
        .map_err(|e| StoreError::Serialization(format!("{}: {e}", raw.id)))?;
    doc.meta_mut().rev = raw.rev;
    Ok(doc)
}

/// Typed helpers available on every [`DocumentStore`].
pub trait DocumentStoreExt: DocumentStore {
    fn fetch<D: Document>(&self, id: &DocumentId) -> Result<D, StoreError> {
        from_raw(self.get(id)?)
    }

    /// Like [`fetch`](Self::fetch) but maps `NotFound` to `None`.
    fn fetch_optional<D: Document>(&self, id: &DocumentId) -> Result<Option<D>, StoreError> {
        match self.get(id) {
            Ok(raw) => from_raw(raw).map(Some),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create (no revision yet) or update (current revision) a document and
    /// record the new revision on it.
    fn put<D: Document>(&self, doc: &mut D) -> Result<Revision, StoreError> {
        let rev = self.insert(to_raw(doc)?)?;
        doc.meta_mut().rev = Some(rev.clone());
        Ok(rev)
    }

    /// Delete a persisted document at its current revision.
    fn remove<D: Document>(&self, doc: &D) -> Result<(), StoreError> {
        let rev = doc.rev().ok_or_else(|| StoreError::NotFound(doc.id().clone()))?;
        self.destroy(doc.id(), rev)
    }

    fn find_all<D: Document>(&self, tenant_id: TenantId, selector: &Selector) -> Result<Vec<D>, StoreError> {
        self.find(tenant_id, selector)?
            .into_iter()
            .map(from_raw)
            .collect()
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}
