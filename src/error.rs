// 🚨 Error kinds for the statement pipeline
//
// Row-level problems in a statement are NOT errors (the parser drops them).
// Everything here is fatal for the run and carries the file or account that
// caused it.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SummaryError>;

#[derive(Debug, Error)]
pub enum SummaryError {
    /// A required CSV file could not be opened or read
    #[error("cannot read {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The file has no header row (empty file)
    #[error("{} has no header row", path.display())]
    MissingHeader { path: PathBuf },

    #[error("no transactions found in file")]
    EmptyInput,

    #[error(
        "the file contains more than one account ({}); only one account per file is allowed",
        accounts.join(", ")
    )]
    MultipleAccounts { accounts: Vec<String> },

    #[error("account {account} not found in the database, check the accounts file")]
    AccountNotFound { account: String },

    #[error("account {account} has no email address and no fallback recipient is configured")]
    MissingEmail { account: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid email address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build email: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("failed to deliver report to {recipient}: {source}")]
    Transport {
        recipient: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid storage event: {0}")]
    InvalidEvent(String),
}

impl SummaryError {
    /// Validation failures happen before anything is persisted
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SummaryError::EmptyInput | SummaryError::MultipleAccounts { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SummaryError::AccountNotFound { .. } | SummaryError::MissingEmail { .. }
        )
    }
}
