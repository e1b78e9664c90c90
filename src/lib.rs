// Statement Summary - Core Library
// Exposes all modules for use in the CLI, the event server, and tests

pub mod config;
pub mod db;
pub mod email;
pub mod entities;
pub mod error;
pub mod grouping;
pub mod parser;
pub mod pipeline;
pub mod summary;
pub mod trigger;

// Re-export commonly used types
pub use config::Config;
pub use db::{
    account_exists, get_account, get_email, get_internal_id, get_transactions,
    insert_transaction, insert_transactions, load_accounts_csv, open_database,
    setup_database, transaction_count, upsert_account, ImportStats, StoredTransaction,
};
pub use email::{Logo, ReportSender, SmtpSender, SUBJECT};
pub use entities::{Account, AccountRecord};
pub use error::{Result, SummaryError};
pub use grouping::{group, validate_single, GroupedTransactions};
pub use parser::{CsvStatementParser, ParsedStatement, StatementParser, Transaction};
pub use pipeline::{Pipeline, RunReport};
pub use summary::{summarize, MonthCount, SummaryReport};
pub use trigger::{EventInputs, StorageEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
