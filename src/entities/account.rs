// 💳 Account Entity - natural key from the accounts file, internal id from the database
//
// "external id is IDENTITY (never changes), name/email are VALUES (can change)"
//
// The accounts file (header discarded):
//   0: account identifier   (e.g. "A123")
//   1: display name
//   2: email

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SummaryError};

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

/// An account as stored in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Internal id, assigned by the database
    pub id: i64,

    /// Natural key from the input files (unique)
    pub account_id: String,

    pub name: String,

    /// May be empty; the pipeline falls back to the configured recipient
    pub email: String,
}

impl Account {
    pub fn has_email(&self) -> bool {
        !self.email.trim().is_empty()
    }
}

// ============================================================================
// ACCOUNTS FILE
// ============================================================================

/// One row of the accounts file, before it has an internal id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_id: String,
    pub name: String,
    pub email: String,
}

impl AccountRecord {
    pub fn new(account_id: &str, name: &str, email: &str) -> Self {
        AccountRecord {
            account_id: account_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        }
    }
}

/// Read every usable row of an accounts file. Rows with fewer than 3 fields are skipped.
pub fn read_accounts_csv(csv_path: &Path) -> Result<Vec<AccountRecord>> {
    let file_access = |source| SummaryError::FileAccess {
        path: csv_path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(csv_path)
        .map_err(file_access)?;

    if reader.headers().map_err(file_access)?.is_empty() {
        return Err(SummaryError::MissingHeader {
            path: csv_path.to_path_buf(),
        });
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(file_access)?;
        if row.len() < 3 {
            continue;
        }
        records.push(AccountRecord::new(&row[0], &row[1], &row[2]));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_accounts_csv() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "AccountID,Name,Email\nA123,Test User,test@example.com\nB456,Short Row\nC789,Other,other@example.com\n"
        )
        .unwrap();

        let records = read_accounts_csv(file.path()).unwrap();

        assert_eq!(records.len(), 2, "short row should be skipped");
        assert_eq!(records[0], AccountRecord::new("A123", "Test User", "test@example.com"));
        assert_eq!(records[1].account_id, "C789");
    }

    #[test]
    fn test_read_accounts_missing_file() {
        let err = read_accounts_csv(Path::new("/no/such/accounts.csv")).unwrap_err();
        assert!(matches!(err, SummaryError::FileAccess { .. }));
    }

    #[test]
    fn test_account_has_email() {
        let mut account = Account {
            id: 1,
            account_id: "A123".to_string(),
            name: "Test User".to_string(),
            email: "  ".to_string(),
        };
        assert!(!account.has_email());

        account.email = "test@example.com".to_string();
        assert!(account.has_email());
    }
}
