// 🗄️ Persistence Gateway - SQLite
//
// The connection is opened by the entry point and passed in explicitly.
// Idempotency lives in the schema:
//   account.account_id                         UNIQUE → upsert
//   transactions(account_id, timestamp, amount) UNIQUE → duplicate inserts ignored

use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::entities::{read_accounts_csv, Account};
use crate::error::{Result, SummaryError};
use crate::parser::Transaction;

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; in-memory databases answer "memory" and that's fine
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!("journal_mode = {}", mode);

    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Accounts Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Transactions Table (amount stored as normalized decimal text)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL REFERENCES account(id),
            timestamp TEXT NOT NULL,
            amount TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(account_id, timestamp, amount)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ACCOUNTS
// ============================================================================

/// Insert or refresh an account; returns the same internal id on every call
pub fn upsert_account(conn: &Connection, account_id: &str, name: &str, email: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO account (account_id, name, email) VALUES (?1, ?2, ?3)
         ON CONFLICT(account_id) DO UPDATE SET name = excluded.name, email = excluded.email",
        params![account_id, name, email],
    )?;

    get_internal_id(conn, account_id)
}

pub fn account_exists(conn: &Connection, account_id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM account WHERE account_id = ?1",
            [account_id],
            |row| row.get(0),
        )
        .optional()?;

    Ok(found.is_some())
}

pub fn get_account(conn: &Connection, account_id: &str) -> Result<Account> {
    conn.query_row(
        "SELECT id, account_id, name, email FROM account WHERE account_id = ?1",
        [account_id],
        |row| {
            Ok(Account {
                id: row.get(0)?,
                account_id: row.get(1)?,
                name: row.get(2)?,
                email: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| not_found(account_id))
}

pub fn get_email(conn: &Connection, account_id: &str) -> Result<String> {
    conn.query_row(
        "SELECT email FROM account WHERE account_id = ?1",
        [account_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| not_found(account_id))
}

pub fn get_internal_id(conn: &Connection, account_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM account WHERE account_id = ?1",
        [account_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| not_found(account_id))
}

fn not_found(account_id: &str) -> SummaryError {
    SummaryError::AccountNotFound {
        account: account_id.to_string(),
    }
}

/// Upsert every usable row of an accounts file. Returns the number of rows upserted.
pub fn load_accounts_csv(conn: &Connection, csv_path: &Path) -> Result<usize> {
    let records = read_accounts_csv(csv_path)?;

    for record in &records {
        upsert_account(conn, &record.account_id, &record.name, &record.email)?;
    }

    info!("👤 Loaded {} accounts from {}", records.len(), csv_path.display());
    Ok(records.len())
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

/// Import statistics for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub inserted: usize,
    pub duplicates: usize,
}

/// A transaction row read back from the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: i64,
    pub timestamp: String,
    pub amount: Decimal,
}

/// Canonical text for the dedup key: "100", "100.0" and "+100.00" all become "100"
fn amount_key(amount: Decimal) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }
    amount.normalize().to_string()
}

/// Insert one transaction. Returns `false` when the (account, timestamp, amount)
/// triple is already stored; that is not an error.
pub fn insert_transaction(
    conn: &Connection,
    internal_id: i64,
    timestamp: &str,
    amount: Decimal,
) -> Result<bool> {
    let result = conn.execute(
        "INSERT INTO transactions (account_id, timestamp, amount) VALUES (?1, ?2, ?3)",
        params![internal_id, timestamp, amount_key(amount)],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            debug!(
                "Duplicate transaction skipped: account={} timestamp={} amount={}",
                internal_id, timestamp, amount
            );
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn insert_transactions(
    conn: &Connection,
    internal_id: i64,
    transactions: &[Transaction],
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for tx in transactions {
        if insert_transaction(conn, internal_id, &tx.timestamp, tx.amount)? {
            stats.inserted += 1;
        } else {
            stats.duplicates += 1;
        }
    }

    info!(
        "💾 Inserted: {} transactions, skipped duplicates: {}",
        stats.inserted, stats.duplicates
    );

    Ok(stats)
}

pub fn transaction_count(conn: &Connection, internal_id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE account_id = ?1",
        [internal_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Stored transactions for an account, in insertion order
pub fn get_transactions(conn: &Connection, internal_id: i64) -> Result<Vec<StoredTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, amount FROM transactions WHERE account_id = ?1 ORDER BY id",
    )?;

    let rows = stmt
        .query_map([internal_id], |row| {
            let amount_text: String = row.get(2)?;
            let amount = Decimal::from_str(&amount_text).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
            })?;

            Ok(StoredTransaction {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                amount,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn account_rows(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM account", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_account_lookups() {
        let conn = test_db();
        let id = upsert_account(&conn, "A123", "Test User", "test@example.com").unwrap();

        assert!(account_exists(&conn, "A123").unwrap());
        assert!(!account_exists(&conn, "B999").unwrap());
        assert_eq!(get_email(&conn, "A123").unwrap(), "test@example.com");
        assert_eq!(get_internal_id(&conn, "A123").unwrap(), id);

        let account = get_account(&conn, "A123").unwrap();
        assert_eq!(account.id, id);
        assert_eq!(account.name, "Test User");
    }

    #[test]
    fn test_missing_account_is_not_found() {
        let conn = test_db();

        let err = get_internal_id(&conn, "B999").unwrap_err();
        assert!(matches!(err, SummaryError::AccountNotFound { ref account } if account == "B999"));

        assert!(get_email(&conn, "B999").unwrap_err().is_not_found());
        assert!(get_account(&conn, "B999").unwrap_err().is_not_found());
    }

    #[test]
    fn test_upsert_account_twice_same_id() {
        let conn = test_db();

        let id1 = upsert_account(&conn, "A123", "Test User", "test@example.com").unwrap();
        let id2 = upsert_account(&conn, "A123", "Test User", "test@example.com").unwrap();

        assert_eq!(id1, id2, "same external id must map to the same internal id");
        assert_eq!(account_rows(&conn), 1);
    }

    #[test]
    fn test_upsert_account_refreshes_values() {
        let conn = test_db();

        let id1 = upsert_account(&conn, "A123", "Old Name", "old@example.com").unwrap();
        let id2 = upsert_account(&conn, "A123", "New Name", "new@example.com").unwrap();

        assert_eq!(id1, id2);
        assert_eq!(get_email(&conn, "A123").unwrap(), "new@example.com");
        assert_eq!(get_account(&conn, "A123").unwrap().name, "New Name");
    }

    #[test]
    fn test_insert_transaction_twice_one_row() {
        let conn = test_db();
        let id = upsert_account(&conn, "A123", "Test User", "test@example.com").unwrap();

        let first = insert_transaction(&conn, id, "2024-07-08T14:23:00Z", dec!(100.0)).unwrap();
        let second = insert_transaction(&conn, id, "2024-07-08T14:23:00Z", dec!(100.0)).unwrap();

        assert!(first);
        assert!(!second, "duplicate insert must be ignored, not fail");
        assert_eq!(transaction_count(&conn, id).unwrap(), 1);
    }

    #[test]
    fn test_dedup_key_ignores_amount_scale() {
        let conn = test_db();
        let id = upsert_account(&conn, "A123", "Test User", "test@example.com").unwrap();

        insert_transaction(&conn, id, "2024-07-08T14:23:00Z", dec!(100)).unwrap();
        insert_transaction(&conn, id, "2024-07-08T14:23:00Z", dec!(100.00)).unwrap();
        insert_transaction(&conn, id, "2024-07-08T14:23:00Z", dec!(-100)).unwrap();

        let stored = get_transactions(&conn, id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].amount, dec!(100));
        assert_eq!(stored[1].amount, dec!(-100));
    }

    #[test]
    fn test_same_triple_for_different_accounts() {
        let conn = test_db();
        let a = upsert_account(&conn, "A123", "A", "a@example.com").unwrap();
        let b = upsert_account(&conn, "B456", "B", "b@example.com").unwrap();

        assert!(insert_transaction(&conn, a, "2024-07-08T14:23:00Z", dec!(5)).unwrap());
        assert!(insert_transaction(&conn, b, "2024-07-08T14:23:00Z", dec!(5)).unwrap());
    }

    #[test]
    fn test_insert_for_unknown_account_fails() {
        let conn = test_db();

        let err = insert_transaction(&conn, 42, "2024-07-08T14:23:00Z", dec!(5)).unwrap_err();
        assert!(matches!(err, SummaryError::Database(_)), "got {:?}", err);
    }

    #[test]
    fn test_insert_transactions_stats() {
        let conn = test_db();
        let id = upsert_account(&conn, "A123", "Test User", "test@example.com").unwrap();
        let batch = vec![
            Transaction::new(0, "2024-07-08T14:23:00Z", dec!(60.5), "A123"),
            Transaction::new(1, "2024-07-08T15:00:00Z", dec!(-20.46), "A123"),
        ];

        let first = insert_transactions(&conn, id, &batch).unwrap();
        let second = insert_transactions(&conn, id, &batch).unwrap();

        assert_eq!(first, ImportStats { inserted: 2, duplicates: 0 });
        assert_eq!(second, ImportStats { inserted: 0, duplicates: 2 });
        assert_eq!(transaction_count(&conn, id).unwrap(), 2);
    }

    #[test]
    fn test_load_accounts_csv() {
        let conn = test_db();
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "AccountID,Name,Email\nA123,Test User,test@example.com\nB456,Other,other@example.com\n"
        )
        .unwrap();

        assert_eq!(load_accounts_csv(&conn, file.path()).unwrap(), 2);
        // loading twice stays idempotent
        assert_eq!(load_accounts_csv(&conn, file.path()).unwrap(), 2);
        assert_eq!(account_rows(&conn), 2);
        assert!(account_exists(&conn, "B456").unwrap());
    }
}
