//! Transfer saga: move money between two accounts.
//!
//! Writes, in order: debit the source, credit the destination, then the
//! `transfer_out` and `transfer_in` ledger entries sharing one transfer id.
//! Any failing write unwinds the earlier ones in reverse order.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use tally_accounting::{Account, EntryContext, Transaction};
use tally_core::{Document, DocumentId, TenantId, UserId};
use tally_store::DocumentStore;

use crate::config::SagaConfig;
use crate::error::{OperationError, OperationResult};
use crate::lookup::{ReferenceLookup, load};
use crate::saga::Saga;

pub const OPERATION: &str = "transfer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub tenant_id: TenantId,
    pub actor: UserId,
    pub from_account_id: DocumentId,
    pub to_account_id: DocumentId,
    /// Minor units.
    pub amount: i64,
    pub category_id: Option<DocumentId>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub transfer_id: Uuid,
    pub from: Account,
    pub to: Account,
    /// `[transfer_out, transfer_in]`.
    pub transactions: [Transaction; 2],
}

/// Run a transfer. Preconditions are checked in a fixed order before anything
/// is written; see the individual error codes below.
pub fn run<S: DocumentStore + ?Sized>(
    store: &S,
    config: &SagaConfig,
    request: &TransferRequest,
    at: DateTime<Utc>,
) -> OperationResult<TransferOutcome> {
    let tenant_id = request.tenant_id;
    let amount = request.amount;

    if amount < 0 {
        return Err(OperationError::validation("invalid_amount"));
    }
    let Some(category_id) = request.category_id.as_ref() else {
        return Err(OperationError::validation("category_required"));
    };
    store.category(tenant_id, category_id)?;

    let from: Account = load(store, tenant_id, &request.from_account_id, "account")?;
    let to: Account = load(store, tenant_id, &request.to_account_id, "account")?;
    let same_account = from.id() == to.id();
    if same_account && !config.allow_self_transfer {
        return Err(OperationError::validation("same_account"));
    }
    if from.currency() != to.currency() {
        return Err(OperationError::validation("currency_mismatch"));
    }

    let mut from_after = from.debited(amount, request.actor, at)?;
    let to_before = if same_account { from_after.clone() } else { to };
    let mut to_after = to_before.credited(amount, request.actor, at)?;

    let transfer_id = Uuid::now_v7();
    let ctx = EntryContext {
        category_id: category_id.clone(),
        description: request.description.clone(),
        actor: request.actor,
        at,
    };
    let (mut outgoing, mut incoming) =
        Transaction::transfer_pair(&from_after, &to_after, amount, transfer_id, &ctx)?;

    let mut saga = Saga::begin(store, OPERATION);
    saga.update("debit_source", &from, &mut from_after)?;
    let to_before = if same_account {
        // One document: the credit continues from the revision just written.
        to_after.meta_mut().rev = from_after.rev().cloned();
        from_after.clone()
    } else {
        to_before
    };
    saga.update("credit_destination", &to_before, &mut to_after)?;
    saga.create("record_transfer_out", &mut outgoing)?;
    saga.create("record_transfer_in", &mut incoming)?;
    saga.complete();

    tracing::info!(
        tenant_id = %tenant_id,
        %transfer_id,
        from = %from_after.id(),
        to = %to_after.id(),
        amount,
        "transfer committed"
    );

    Ok(TransferOutcome {
        transfer_id,
        from: if same_account { to_after.clone() } else { from_after },
        to: to_after,
        transactions: [outgoing, incoming],
    })
}
