// 🗂️ Account Grouping & Validation
//
// One statement file = one account. Grouping happens in a single pass and
// keeps parse order inside each group.

use std::collections::BTreeMap;

use crate::error::{Result, SummaryError};
use crate::parser::Transaction;

/// account identifier → transactions in parse order
pub type GroupedTransactions = BTreeMap<String, Vec<Transaction>>;

pub fn group(transactions: Vec<Transaction>) -> GroupedTransactions {
    let mut grouped = GroupedTransactions::new();

    for tx in transactions {
        grouped.entry(tx.account_id.clone()).or_default().push(tx);
    }

    grouped
}

/// Return the only account in `grouped`, or fail if there are zero or several
pub fn validate_single(grouped: &GroupedTransactions) -> Result<&str> {
    let mut accounts = grouped.keys();

    match (accounts.next(), accounts.next()) {
        (None, _) => Err(SummaryError::EmptyInput),
        (Some(account), None) => Ok(account.as_str()),
        (Some(_), Some(_)) => Err(SummaryError::MultipleAccounts {
            accounts: grouped.keys().cloned().collect(),
        }),
    }
}
