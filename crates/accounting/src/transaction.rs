use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tally_core::{Document, DocumentId, DocumentKind, DocumentMeta, DomainError, DomainResult, UserId};

use crate::account::Account;
use crate::currency::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    TransferIn,
    TransferOut,
}

impl TransactionType {
    /// Direction of the entry relative to its account's balance.
    pub fn sign(&self) -> i64 {
        match self {
            TransactionType::Deposit | TransactionType::TransferIn => 1,
            TransactionType::Withdraw | TransactionType::TransferOut => -1,
        }
    }
}

/// Document: immutable ledger entry against one account.
///
/// `amount` is always non-negative; direction comes from `transaction_type`.
/// `balance_after` is the account balance right after the movement it records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(flatten)]
    meta: DocumentMeta,
    transaction_type: TransactionType,
    account_id: DocumentId,
    amount: i64,
    currency: Currency,
    category_id: DocumentId,
    balance_after: i64,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    related_account_id: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transfer_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// Inputs shared by every ledger entry constructor.
#[derive(Debug, Clone)]
pub struct EntryContext {
    pub category_id: DocumentId,
    pub description: Option<String>,
    pub actor: UserId,
    pub at: DateTime<Utc>,
}

impl Transaction {
    fn record(
        transaction_type: TransactionType,
        account: &Account,
        amount: i64,
        ctx: &EntryContext,
    ) -> DomainResult<Self> {
        if amount < 0 {
            return Err(DomainError::validation("invalid_amount"));
        }
        if ctx.category_id.kind() != DocumentKind::Category {
            return Err(DomainError::invalid_id(format!(
                "{} is not a category id",
                ctx.category_id
            )));
        }
        let id = DocumentId::generate(account.id().tenant_id(), DocumentKind::Transaction);
        Ok(Self {
            meta: DocumentMeta::new(id, ctx.actor, ctx.at),
            transaction_type,
            account_id: account.id().clone(),
            amount,
            currency: account.currency().clone(),
            category_id: ctx.category_id.clone(),
            balance_after: account.balance(),
            timestamp: ctx.at,
            related_account_id: None,
            transfer_id: None,
            description: ctx.description.clone(),
        })
    }

    /// Entry for a deposit into `account` (already credited).
    pub fn deposit(account: &Account, amount: i64, ctx: &EntryContext) -> DomainResult<Self> {
        Self::record(TransactionType::Deposit, account, amount, ctx)
    }

    /// Entry for a withdrawal from `account` (already debited).
    pub fn withdrawal(account: &Account, amount: i64, ctx: &EntryContext) -> DomainResult<Self> {
        Self::record(TransactionType::Withdraw, account, amount, ctx)
    }

    /// The two entries of a transfer: `transfer_out` against `from`,
    /// `transfer_in` against `to`, sharing `transfer_id`.
    ///
    /// Both accounts must already carry their post-transfer balances.
    pub fn transfer_pair(
        from: &Account,
        to: &Account,
        amount: i64,
        transfer_id: Uuid,
        ctx: &EntryContext,
    ) -> DomainResult<(Self, Self)> {
        if from.currency() != to.currency() {
            return Err(DomainError::validation("currency_mismatch"));
        }

        let mut outgoing = Self::record(TransactionType::TransferOut, from, amount, ctx)?;
        outgoing.related_account_id = Some(to.id().clone());
        outgoing.transfer_id = Some(transfer_id);

        let mut incoming = Self::record(TransactionType::TransferIn, to, amount, ctx)?;
        incoming.related_account_id = Some(from.id().clone());
        incoming.transfer_id = Some(transfer_id);

        Ok((outgoing, incoming))
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn account_id(&self) -> &DocumentId {
        &self.account_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Amount with the direction applied (negative for money leaving the account).
    pub fn signed_amount(&self) -> i64 {
        self.amount * self.transaction_type.sign()
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn category_id(&self) -> &DocumentId {
        &self.category_id
    }

    pub fn balance_after(&self) -> i64 {
        self.balance_after
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn related_account_id(&self) -> Option<&DocumentId> {
        self.related_account_id.as_ref()
    }

    pub fn transfer_id(&self) -> Option<Uuid> {
        self.transfer_id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Document for Transaction {
    const KIND: DocumentKind = DocumentKind::Transaction;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}
