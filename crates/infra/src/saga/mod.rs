//! Saga infrastructure: ordered writes with paired compensations.
//!
//! A [`Saga`] wraps a document store for the duration of one multi-document
//! operation. Each successful write records how to undo it (write back the
//! pre-mutation snapshot, or delete the document the saga created). When a
//! write fails, the recorded compensations run in reverse order and the
//! caller receives a single [`OperationError::OperationFailed`].
//!
//! Compensations use the latest revision the saga itself produced for each
//! document (the revision journal), so a document written several times in one
//! saga unwinds cleanly. A compensation that fails is logged and collected as a
//! [`SecondaryFailure`]; it never replaces the original error.

pub mod cash;
pub mod receiving;
pub mod stock;
pub mod transfer;

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use tally_core::{Document, DocumentId, Revision};
use tally_store::{DocumentStore, DocumentStoreExt, RawDocument, StoreError, to_raw};

use crate::error::{
    CompensationAction, OperationError, OperationFailure, OperationResult, SecondaryFailure,
};

#[derive(Debug, Clone)]
enum Compensation {
    Restore {
        step: &'static str,
        id: DocumentId,
        snapshot: JsonValue,
    },
    Destroy {
        step: &'static str,
        id: DocumentId,
    },
}

/// One in-flight multi-document operation.
#[derive(Debug)]
pub struct Saga<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
    operation: &'static str,
    compensations: Vec<Compensation>,
    journal: HashMap<DocumentId, Revision>,
    writes: usize,
}

impl<'s, S: DocumentStore + ?Sized> Saga<'s, S> {
    pub fn begin(store: &'s S, operation: &'static str) -> Self {
        tracing::debug!(operation, "saga started");
        Self {
            store,
            operation,
            compensations: Vec::new(),
            journal: HashMap::new(),
            writes: 0,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Number of successful forward writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Create `doc` (which must not carry a revision yet). Undone by deleting it.
    pub fn create<D: Document>(&mut self, step: &'static str, doc: &mut D) -> OperationResult<()> {
        let id = doc.id().clone();
        match self.store.put(doc) {
            Ok(rev) => {
                tracing::debug!(operation = self.operation, step, %id, "created");
                self.journal.insert(id.clone(), rev);
                self.compensations.push(Compensation::Destroy { step, id });
                self.writes += 1;
                Ok(())
            }
            Err(err) => Err(self.fail(step, err)),
        }
    }

    /// Write `next` over `before` (the state last read or written). Undone by
    /// writing `before` back.
    pub fn update<D: Document>(
        &mut self,
        step: &'static str,
        before: &D,
        next: &mut D,
    ) -> OperationResult<()> {
        let snapshot = match to_raw(before) {
            Ok(raw) => raw.body,
            Err(err) => return Err(self.fail(step, err)),
        };
        let id = next.id().clone();
        match self.store.put(next) {
            Ok(rev) => {
                tracing::debug!(operation = self.operation, step, %id, "updated");
                self.journal.insert(id.clone(), rev);
                self.compensations.push(Compensation::Restore { step, id, snapshot });
                self.writes += 1;
                Ok(())
            }
            Err(err) => Err(self.fail(step, err)),
        }
    }

    /// Create `doc` if it was never persisted, update it over `before` otherwise.
    pub fn save<D: Document>(&mut self, step: &'static str, before: &D, next: &mut D) -> OperationResult<()> {
        if before.rev().is_some() {
            self.update(step, before, next)
        } else {
            self.create(step, next)
        }
    }

    /// Abort with `cause` at `step`: run every recorded compensation in reverse
    /// order and build the normalized failure.
    pub fn fail(&mut self, step: &'static str, cause: StoreError) -> OperationError {
        tracing::warn!(
            operation = self.operation,
            step,
            error = %cause,
            compensations = self.compensations.len(),
            "saga step failed, compensating"
        );

        let mut secondary = Vec::new();
        while let Some(compensation) = self.compensations.pop() {
            if let Err(failure) = self.compensate(compensation) {
                tracing::error!(
                    operation = self.operation,
                    failed_step = step,
                    compensated_step = failure.step,
                    action = ?failure.action,
                    document_id = %failure.document_id,
                    error = %failure.error,
                    "compensation failed"
                );
                secondary.push(failure);
            }
        }

        OperationError::OperationFailed(OperationFailure {
            operation: self.operation,
            step,
            cause,
            secondary,
        })
    }

    /// Finish successfully; nothing will be compensated.
    pub fn complete(self) {
        tracing::info!(operation = self.operation, writes = self.writes, "saga completed");
    }

    fn compensate(&mut self, compensation: Compensation) -> Result<(), SecondaryFailure> {
        match compensation {
            Compensation::Restore { step, id, snapshot } => {
                let failure = |error| SecondaryFailure {
                    step,
                    action: CompensationAction::Restore,
                    document_id: id.clone(),
                    error,
                };
                let rev = self
                    .journal
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| failure(StoreError::NotFound(id.clone())))?;
                let rev = self
                    .store
                    .insert(RawDocument {
                        id: id.clone(),
                        rev: Some(rev),
                        body: snapshot,
                    })
                    .map_err(failure)?;
                tracing::debug!(operation = self.operation, step, %id, "restored");
                self.journal.insert(id, rev);
                Ok(())
            }
            Compensation::Destroy { step, id } => {
                let failure = |error| SecondaryFailure {
                    step,
                    action: CompensationAction::Destroy,
                    document_id: id.clone(),
                    error,
                };
                let rev = self
                    .journal
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| failure(StoreError::NotFound(id.clone())))?;
                self.store.destroy(&id, &rev).map_err(failure)?;
                tracing::debug!(operation = self.operation, step, %id, "destroyed");
                self.journal.remove(&id);
                Ok(())
            }
        }
    }
}
