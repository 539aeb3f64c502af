use chrono::Utc;
use serde_json::json;

use tally_accounting::{Account, AccountType, Currency, Transaction};
use tally_core::{Document, DocumentId, DocumentKind, TenantId, UserId};
use tally_store::{DocumentStore, DocumentStoreExt, Selector};

use crate::audit::{AuditEntry, AuditLog, record_quietly};
use crate::config::SagaConfig;
use crate::error::{OperationError, OperationResult};
use crate::lookup::load;
use crate::saga::Saga;
use crate::saga::cash::{self, CashOutcome, CashRequest};
use crate::saga::transfer::{self, TransferOutcome, TransferRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAccountRequest {
    pub tenant_id: TenantId,
    pub actor: UserId,
    pub name: String,
    pub currency: String,
    pub account_type: AccountType,
    pub opening_balance: i64,
    pub description: Option<String>,
}

/// Money accounts: opening, deposits, withdrawals and transfers.
#[derive(Debug)]
pub struct AccountService<S, A> {
    store: S,
    audit: A,
    config: SagaConfig,
}

impl<S: DocumentStore, A: AuditLog> AccountService<S, A> {
    pub fn new(store: S, audit: A, config: SagaConfig) -> Self {
        Self { store, audit, config }
    }

    pub fn config(&self) -> &SagaConfig {
        &self.config
    }

    /// Open an account. Names are unique per tenant.
    pub fn open_account(&self, request: OpenAccountRequest) -> OperationResult<Account> {
        let currency = Currency::new(request.currency)?;
        let mut account = Account::open(
            DocumentId::generate(request.tenant_id, DocumentKind::Account),
            request.name,
            currency,
            request.account_type,
            request.opening_balance,
            request.actor,
            Utc::now(),
        )?;
        if let Some(description) = request.description {
            account = account.with_description(description);
        }

        let same_name = Selector::kind(DocumentKind::Account).eq("name", account.name());
        if !self.store.find(request.tenant_id, &same_name)?.is_empty() {
            return Err(OperationError::conflict(format!(
                "account named '{}' already exists",
                account.name()
            )));
        }

        let mut saga = Saga::begin(&self.store, "open_account");
        saga.create("create_account", &mut account)?;
        saga.complete();

        self.audit(
            AuditEntry::new(request.actor, "account.open", account.id()).with_metadata(json!({
                "name": account.name(),
                "currency": account.currency().code(),
                "openingBalance": account.balance(),
            })),
        );
        Ok(account)
    }

    pub fn deposit(&self, request: CashRequest) -> OperationResult<CashOutcome> {
        let outcome = cash::deposit(&self.store, &request, Utc::now())?;
        self.audit_cash("account.deposit", &request, &outcome);
        Ok(outcome)
    }

    pub fn withdraw(&self, request: CashRequest) -> OperationResult<CashOutcome> {
        let outcome = cash::withdraw(&self.store, &request, Utc::now())?;
        self.audit_cash("account.withdraw", &request, &outcome);
        Ok(outcome)
    }

    pub fn transfer(&self, request: TransferRequest) -> OperationResult<TransferOutcome> {
        let outcome = transfer::run(&self.store, &self.config, &request, Utc::now())?;
        self.audit(
            AuditEntry::new(request.actor, "account.transfer", outcome.from.id()).with_metadata(json!({
                "transferId": outcome.transfer_id,
                "toAccountId": outcome.to.id(),
                "amount": request.amount,
            })),
        );
        Ok(outcome)
    }

    pub fn account(&self, tenant_id: TenantId, id: &DocumentId) -> OperationResult<Account> {
        load(&self.store, tenant_id, id, "account")
    }

    /// Ledger entries of one account.
    pub fn transactions(&self, tenant_id: TenantId, account_id: &DocumentId) -> OperationResult<Vec<Transaction>> {
        let selector = Selector::kind(DocumentKind::Transaction).eq("accountId", account_id.to_string());
        Ok(self.store.find_all(tenant_id, &selector)?)
    }

    fn audit_cash(&self, action: &str, request: &CashRequest, outcome: &CashOutcome) {
        self.audit(
            AuditEntry::new(request.actor, action, outcome.account.id()).with_metadata(json!({
                "amount": request.amount,
                "balanceAfter": outcome.transaction.balance_after(),
                "transactionId": outcome.transaction.id(),
            })),
        );
    }

    fn audit(&self, entry: AuditEntry) {
        record_quietly(&self.audit, self.config.audit_enabled, entry);
    }
}
