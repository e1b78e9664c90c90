// Entity Models
// Accounts are the only persisted entity with an identity of their own;
// transactions hang off an account's internal id.

pub mod account;

pub use account::{read_accounts_csv, Account, AccountRecord};
