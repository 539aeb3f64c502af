use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{Document, DocumentId, DocumentKind, DocumentMeta, DomainError, DomainResult, UserId};

use crate::currency::Currency;

/// What kind of money holder an account represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Cash,
    Bank,
    MobileMoney,
    Savings,
    Other,
}

/// Document: a tenant's money account.
///
/// `balance` is in minor units and is never persisted negative. Balances only
/// change through [`Account::debited`] / [`Account::credited`], which return a
/// new value and leave `self` untouched so callers keep the pre-mutation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(flatten)]
    meta: DocumentMeta,
    name: String,
    balance: i64,
    currency: Currency,
    account_type: AccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl Account {
    pub fn open(
        id: DocumentId,
        name: impl Into<String>,
        currency: Currency,
        account_type: AccountType,
        opening_balance: i64,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if id.kind() != DocumentKind::Account {
            return Err(DomainError::invalid_id(format!("{id} is not an account id")));
        }
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name_required"));
        }
        if opening_balance < 0 {
            return Err(DomainError::validation("invalid_amount"));
        }
        Ok(Self {
            meta: DocumentMeta::new(id, actor, at),
            name: name.trim().to_string(),
            balance: opening_balance,
            currency,
            account_type,
            description: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Balance after taking `amount` out, or why that is not allowed.
    pub fn balance_after_debit(&self, amount: i64) -> DomainResult<i64> {
        if amount < 0 {
            return Err(DomainError::validation("invalid_amount"));
        }
        if self.balance < amount {
            return Err(DomainError::validation("insufficient_funds"));
        }
        Ok(self.balance - amount)
    }

    /// Balance after putting `amount` in.
    pub fn balance_after_credit(&self, amount: i64) -> DomainResult<i64> {
        if amount < 0 {
            return Err(DomainError::validation("invalid_amount"));
        }
        self.balance
            .checked_add(amount)
            .ok_or_else(|| DomainError::validation("balance_overflow"))
    }

    /// Copy of this account with `amount` taken out.
    pub fn debited(&self, amount: i64, actor: UserId, at: DateTime<Utc>) -> DomainResult<Self> {
        let balance = self.balance_after_debit(amount)?;
        Ok(self.with_balance(balance, actor, at))
    }

    /// Copy of this account with `amount` put in.
    pub fn credited(&self, amount: i64, actor: UserId, at: DateTime<Utc>) -> DomainResult<Self> {
        let balance = self.balance_after_credit(amount)?;
        Ok(self.with_balance(balance, actor, at))
    }

    fn with_balance(&self, balance: i64, actor: UserId, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.balance = balance;
        next.meta.touch(actor, at);
        next
    }
}

impl Document for Account {
    const KIND: DocumentKind = DocumentKind::Account;

    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tally_core::TenantId;

    fn account(balance: i64) -> Account {
        Account::open(
            DocumentId::generate(TenantId::new(), DocumentKind::Account),
            "Till",
            Currency::new("TZS").unwrap(),
            AccountType::Cash,
            balance,
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn open_rejects_negative_opening_balance() {
        let err = Account::open(
            DocumentId::generate(TenantId::new(), DocumentKind::Account),
            "Till",
            Currency::new("TZS").unwrap(),
            AccountType::Cash,
            -1,
            UserId::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::validation("invalid_amount"));
    }

    #[test]
    fn open_rejects_blank_name_and_foreign_kind() {
        let tenant = TenantId::new();
        let blank = Account::open(
            DocumentId::generate(tenant, DocumentKind::Account),
            "  ",
            Currency::new("TZS").unwrap(),
            AccountType::Bank,
            0,
            UserId::new(),
            Utc::now(),
        );
        assert_eq!(blank.unwrap_err(), DomainError::validation("name_required"));

        let wrong_kind = Account::open(
            DocumentId::generate(tenant, DocumentKind::Batch),
            "Bank",
            Currency::new("TZS").unwrap(),
            AccountType::Bank,
            0,
            UserId::new(),
            Utc::now(),
        );
        assert!(matches!(wrong_kind, Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn debit_leaves_original_untouched() {
        let original = account(10_000);
        let next = original.debited(3_000, UserId::new(), Utc::now()).unwrap();
        assert_eq!(original.balance(), 10_000);
        assert_eq!(next.balance(), 7_000);
        assert_eq!(next.id(), original.id());
    }

    #[test]
    fn debit_beyond_balance_is_insufficient_funds() {
        let err = account(100).debited(101, UserId::new(), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("insufficient_funds"));
    }

    #[test]
    fn zero_debit_is_allowed() {
        assert_eq!(account(0).balance_after_debit(0).unwrap(), 0);
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let err = account(i64::MAX).balance_after_credit(1).unwrap_err();
        assert_eq!(err, DomainError::validation("balance_overflow"));
    }

    #[test]
    fn serialized_shape_uses_camel_case_and_type_tag() {
        let body = serde_json::to_value(account(5).with_description("petty cash")).unwrap();
        assert_eq!(body["type"], "account");
        assert_eq!(body["accountType"], "cash");
        assert_eq!(body["currency"], "TZS");
        assert_eq!(body["balance"], 5);
        let back: Account = serde_json::from_value(body).unwrap();
        assert_eq!(back.description(), Some("petty cash"));
    }

    proptest! {
        /// Property: moving any affordable amount between two accounts conserves
        /// the combined balance and never leaves either side negative.
        #[test]
        fn debit_credit_pair_conserves_total(
            from_balance in 0i64..1_000_000_000i64,
            to_balance in 0i64..1_000_000_000i64,
            fraction in 0.0f64..=1.0f64,
        ) {
            let amount = (from_balance as f64 * fraction) as i64;
            let from = account(from_balance);
            let to = account(to_balance);

            let from_after = from.debited(amount, UserId::new(), Utc::now()).unwrap();
            let to_after = to.credited(amount, UserId::new(), Utc::now()).unwrap();

            prop_assert!(from_after.balance() >= 0);
            prop_assert_eq!(
                from_after.balance() + to_after.balance(),
                from_balance + to_balance
            );
        }
    }
}
