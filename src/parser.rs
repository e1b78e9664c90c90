// 🏗️ Statement Parser - CSV → Transactions
//
// Column layout (by position, header discarded):
//   0: account identifier
//   1: row id (unused)
//   2: timestamp (kept verbatim)
//   3: signed amount ("+60.5", "-20.46", "15")
//
// Leniency contract: short rows and unparseable amounts are dropped
// silently. Only an unreadable file or a missing header fails the parse.

use csv::{Reader, ReaderBuilder};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, SummaryError};

/// Minimum number of fields for a row to be considered
const MIN_FIELDS: usize = 4;

// ============================================================================
// CORE TYPES
// ============================================================================

/// One accepted statement row. Immutable once the parser hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Zero-based, counts accepted rows only
    pub sequence_index: usize,
    /// Verbatim timestamp text (RFC 3339 expected, not required)
    pub timestamp: String,
    pub amount: Decimal,
    pub account_id: String,
}

impl Transaction {
    pub fn new(sequence_index: usize, timestamp: &str, amount: Decimal, account_id: &str) -> Self {
        Transaction {
            sequence_index,
            timestamp: timestamp.to_string(),
            amount,
            account_id: account_id.to_string(),
        }
    }

    /// Strictly positive amounts are credits
    pub fn is_credit(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Zero counts as a debit
    pub fn is_debit(&self) -> bool {
        !self.is_credit()
    }
}

/// Output of a parse: accepted rows plus running totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedStatement {
    pub transactions: Vec<Transaction>,
    pub credits: Decimal,
    pub debits: Decimal,
    pub balance: Decimal,
    pub count: usize,
}

impl ParsedStatement {
    /// Returns false (and keeps nothing) if a running total would overflow
    fn accept(&mut self, account_id: &str, timestamp: &str, amount: Decimal) -> bool {
        let tx = Transaction::new(self.count, timestamp, amount, account_id);

        let Some(balance) = self.balance.checked_add(amount) else {
            return false;
        };
        let side = if tx.is_credit() { self.credits } else { self.debits };
        let Some(side) = side.checked_add(amount) else {
            return false;
        };

        if tx.is_credit() {
            self.credits = side;
        } else {
            self.debits = side;
        }
        self.balance = balance;
        self.count += 1;

        self.transactions.push(tx);
        true
    }
}

// ============================================================================
// PARSER CAPABILITY
// ============================================================================

/// StatementParser - turns a statement file into transactions
pub trait StatementParser {
    /// Parse a file and return accepted transactions with totals
    ///
    /// # Returns
    /// * `Ok(ParsedStatement)` - malformed rows already dropped
    /// * `Err(SummaryError)` - file cannot be opened/read or has no header
    fn parse(&self, file_path: &Path) -> Result<ParsedStatement>;

    /// Get parser version (logged at the start of each run)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

/// CSV statement parser
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvStatementParser;

impl CsvStatementParser {
    pub fn new() -> Self {
        CsvStatementParser
    }

    /// Parse from any reader. `origin` is only used in error messages.
    pub fn parse_reader<R: Read>(&self, source: R, origin: &Path) -> Result<ParsedStatement> {
        let reader = statement_reader().from_reader(source);
        read_statement(reader, origin)
    }
}

impl StatementParser for CsvStatementParser {
    fn parse(&self, file_path: &Path) -> Result<ParsedStatement> {
        let reader = statement_reader()
            .from_path(file_path)
            .map_err(|source| SummaryError::FileAccess {
                path: file_path.to_path_buf(),
                source,
            })?;

        read_statement(reader, file_path)
    }
}

fn statement_reader() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    // Rows may have any number of fields; short ones are dropped below
    builder.has_headers(true).flexible(true);
    builder
}

fn read_statement<R: Read>(mut reader: Reader<R>, origin: &Path) -> Result<ParsedStatement> {
    let header = reader.byte_headers().map_err(|source| SummaryError::FileAccess {
        path: origin.to_path_buf(),
        source,
    })?;
    if header.is_empty() {
        return Err(SummaryError::MissingHeader {
            path: origin.to_path_buf(),
        });
    }

    let mut statement = ParsedStatement::default();
    let mut dropped = 0usize;

    // Byte records: only the fields we use must be valid UTF-8
    for result in reader.byte_records() {
        let record = result.map_err(|source| SummaryError::FileAccess {
            path: origin.to_path_buf(),
            source,
        })?;

        if record.len() < MIN_FIELDS {
            dropped += 1;
            continue;
        }

        let fields = (
            std::str::from_utf8(&record[0]),
            std::str::from_utf8(&record[2]),
            std::str::from_utf8(&record[3]),
        );
        let (Ok(account_id), Ok(timestamp), Ok(raw_amount)) = fields else {
            dropped += 1;
            continue;
        };

        let accepted = parse_amount(raw_amount)
            .map(|amount| statement.accept(account_id, timestamp, amount))
            .unwrap_or(false);
        if !accepted {
            dropped += 1;
        }
    }

    debug!(
        "Parsed {}: {} accepted, {} dropped",
        origin.display(),
        statement.count,
        dropped
    );

    Ok(statement)
}

/// Parse a signed decimal amount. A single explicit `+` is allowed.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    let unsigned = match trimmed.strip_prefix('+') {
        Some(rest) if rest.starts_with(|c: char| c == '+' || c == '-') => return None,
        Some(rest) => rest,
        None => trimmed,
    };

    Decimal::from_str(unsigned).ok()
}
