//! Accounting module (money accounts and their ledger entries).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns. Writing
//! these documents consistently is the job of the sagas in `tally-infra`.

pub mod account;
pub mod category;
pub mod currency;
pub mod transaction;

pub use account::{Account, AccountType};
pub use category::{Category, CategoryType};
pub use currency::Currency;
pub use transaction::{EntryContext, Transaction, TransactionType};
