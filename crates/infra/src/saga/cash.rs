//! Deposit and withdrawal: one account write plus its ledger entry.

use chrono::{DateTime, Utc};

use tally_accounting::{Account, EntryContext, Transaction, TransactionType};
use tally_core::{DocumentId, TenantId, UserId};
use tally_store::DocumentStore;

use crate::error::{OperationError, OperationResult};
use crate::lookup::{ReferenceLookup, load};
use crate::saga::Saga;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashRequest {
    pub tenant_id: TenantId,
    pub actor: UserId,
    pub account_id: DocumentId,
    /// Minor units, strictly positive.
    pub amount: i64,
    pub category_id: Option<DocumentId>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashOutcome {
    pub account: Account,
    pub transaction: Transaction,
}

pub fn deposit<S: DocumentStore + ?Sized>(
    store: &S,
    request: &CashRequest,
    at: DateTime<Utc>,
) -> OperationResult<CashOutcome> {
    run(store, TransactionType::Deposit, request, at)
}

pub fn withdraw<S: DocumentStore + ?Sized>(
    store: &S,
    request: &CashRequest,
    at: DateTime<Utc>,
) -> OperationResult<CashOutcome> {
    run(store, TransactionType::Withdraw, request, at)
}

fn run<S: DocumentStore + ?Sized>(
    store: &S,
    direction: TransactionType,
    request: &CashRequest,
    at: DateTime<Utc>,
) -> OperationResult<CashOutcome> {
    let operation = match direction {
        TransactionType::Withdraw => "withdraw",
        _ => "deposit",
    };

    if request.amount <= 0 {
        return Err(OperationError::validation("invalid_amount"));
    }
    let Some(category_id) = request.category_id.as_ref() else {
        return Err(OperationError::validation("category_required"));
    };
    store.category(request.tenant_id, category_id)?;
    let account: Account = load(store, request.tenant_id, &request.account_id, "account")?;

    let mut account_after = match direction {
        TransactionType::Withdraw => account.debited(request.amount, request.actor, at)?,
        _ => account.credited(request.amount, request.actor, at)?,
    };
    let ctx = EntryContext {
        category_id: category_id.clone(),
        description: request.description.clone(),
        actor: request.actor,
        at,
    };
    let mut entry = match direction {
        TransactionType::Withdraw => Transaction::withdrawal(&account_after, request.amount, &ctx)?,
        _ => Transaction::deposit(&account_after, request.amount, &ctx)?,
    };

    let mut saga = Saga::begin(store, operation);
    saga.update("update_balance", &account, &mut account_after)?;
    saga.create("record_entry", &mut entry)?;
    saga.complete();

    Ok(CashOutcome {
        account: account_after,
        transaction: entry,
    })
}
