//! Fault-injecting store decorator.
//!
//! Wraps any [`DocumentStore`] and fails selected operations on demand so the
//! compensation paths above the store can be exercised deterministically.

use std::sync::Mutex;

use tally_core::{DocumentId, DocumentKind, Revision, TenantId};

use crate::traits::{DocumentStore, RawDocument, Selector, StoreError};

/// Store operation a fault can target.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FaultOp {
    Get,
    Insert,
    Destroy,
    Find,
}

/// One injected failure rule.
///
/// Matches operations of `op` (optionally restricted to one document kind),
/// lets the first `skip` matches through, then fails the next `times` matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    op: FaultOp,
    kind: Option<DocumentKind>,
    skip: usize,
    times: usize,
    error: StoreError,
}

impl Fault {
    pub fn on(op: FaultOp) -> Self {
        Self {
            op,
            kind: None,
            skip: 0,
            times: 1,
            error: StoreError::Unavailable(format!("injected {op:?} failure")),
        }
    }

    pub fn kind(mut self, kind: DocumentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Let `n` matching operations succeed before failing.
    pub fn after(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.times = n;
        self
    }

    pub fn always(self) -> Self {
        self.times(usize::MAX)
    }

    /// Error to surface instead of the default `Unavailable`.
    pub fn with_error(mut self, error: StoreError) -> Self {
        self.error = error;
        self
    }
}

#[derive(Debug)]
struct Armed {
    fault: Fault,
    seen: usize,
    fired: usize,
}

/// [`DocumentStore`] decorator failing operations according to armed [`Fault`]s.
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    armed: Mutex<Vec<Armed>>,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            armed: Mutex::new(Vec::new()),
        }
    }

    pub fn inject(&self, fault: Fault) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.push(Armed {
                fault,
                seen: 0,
                fired: 0,
            });
        }
    }

    pub fn clear(&self) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.clear();
        }
    }

    /// Total number of injected failures surfaced so far.
    pub fn fired(&self) -> usize {
        match self.armed.lock() {
            Ok(armed) => armed.iter().map(|a| a.fired).sum(),
            Err(_) => 0,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn trip(&self, op: FaultOp, kind: Option<DocumentKind>) -> Result<(), StoreError> {
        let mut armed = self
            .armed
            .lock()
            .map_err(|_| StoreError::Unavailable("fault plan lock poisoned".to_string()))?;

        for rule in armed.iter_mut() {
            if rule.fault.op != op {
                continue;
            }
            if rule.fault.kind.is_some() && rule.fault.kind != kind {
                continue;
            }
            rule.seen += 1;
            if rule.seen > rule.fault.skip && rule.fired < rule.fault.times {
                rule.fired += 1;
                tracing::debug!(?op, ?kind, "injecting store failure");
                return Err(rule.fault.error.clone());
            }
        }
        Ok(())
    }
}

impl<S: DocumentStore> DocumentStore for FaultyStore<S> {
    fn get(&self, id: &DocumentId) -> Result<RawDocument, StoreError> {
        self.trip(FaultOp::Get, Some(id.kind()))?;
        self.inner.get(id)
    }

    fn insert(&self, doc: RawDocument) -> Result<Revision, StoreError> {
        self.trip(FaultOp::Insert, Some(doc.id.kind()))?;
        self.inner.insert(doc)
    }

    fn destroy(&self, id: &DocumentId, rev: &Revision) -> Result<(), StoreError> {
        self.trip(FaultOp::Destroy, Some(id.kind()))?;
        self.inner.destroy(id, rev)
    }

    fn find(&self, tenant_id: TenantId, selector: &Selector) -> Result<Vec<RawDocument>, StoreError> {
        self.trip(FaultOp::Find, selector.target_kind())?;
        self.inner.find(tenant_id, selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryDocumentStore;
    use serde_json::json;

    fn doc(kind: DocumentKind) -> RawDocument {
        RawDocument {
            id: DocumentId::generate(TenantId::new(), kind),
            rev: None,
            body: json!({}),
        }
    }

    #[test]
    fn fails_only_the_selected_occurrence() {
        let store = FaultyStore::new(InMemoryDocumentStore::new());
        store.inject(Fault::on(FaultOp::Insert).kind(DocumentKind::Stock).after(1));

        assert!(store.insert(doc(DocumentKind::Batch)).is_ok());
        assert!(store.insert(doc(DocumentKind::Stock)).is_ok());
        assert!(matches!(
            store.insert(doc(DocumentKind::Stock)),
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.insert(doc(DocumentKind::Stock)).is_ok());
        assert_eq!(store.fired(), 1);
    }

    #[test]
    fn custom_error_and_repeat_count() {
        let store = FaultyStore::new(InMemoryDocumentStore::new());
        store.inject(
            Fault::on(FaultOp::Destroy)
                .times(2)
                .with_error(StoreError::Conflict("stale".to_string())),
        );

        let d = doc(DocumentKind::Batch);
        let rev = store.insert(d.clone()).unwrap();
        assert!(store.destroy(&d.id, &rev).unwrap_err().is_conflict());
        assert!(store.destroy(&d.id, &rev).unwrap_err().is_conflict());
        assert!(store.destroy(&d.id, &rev).is_ok());

        store.clear();
        assert_eq!(store.fired(), 0);
    }
}
