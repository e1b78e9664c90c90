// 🔁 Statement Pipeline - parse → validate → persist → summarize → notify
//
// Single pass, no retries. The first fatal error ends the run. Persistence is
// not rolled back when delivery fails afterwards.

use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

use crate::db::{self, ImportStats};
use crate::email::{Logo, ReportSender, SUBJECT};
use crate::error::{Result, SummaryError};
use crate::grouping::{group, validate_single};
use crate::parser::StatementParser;
use crate::summary::{summarize, SummaryReport};

/// What a successful run did
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub account_id: String,
    pub recipient: String,
    pub summary: SummaryReport,
    pub import: ImportStats,
}

pub struct Pipeline<'a, P, S> {
    conn: &'a Connection,
    parser: P,
    sender: S,
    logo: Option<Logo>,
    fallback_recipient: Option<String>,
}

impl<'a, P, S> Pipeline<'a, P, S>
where
    P: StatementParser,
    S: ReportSender,
{
    pub fn new(conn: &'a Connection, parser: P, sender: S) -> Self {
        Pipeline {
            conn,
            parser,
            sender,
            logo: None,
            fallback_recipient: None,
        }
    }

    /// Builder pattern: logo to embed in the report
    pub fn with_logo(mut self, logo: Option<Logo>) -> Self {
        self.logo = logo;
        self
    }

    /// Builder pattern: recipient for accounts without an email on file
    pub fn with_fallback_recipient(mut self, recipient: Option<&str>) -> Self {
        self.fallback_recipient = recipient.map(str::to_string);
        self
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Run the whole pipeline for one statement file
    pub fn run(&self, transactions_path: &Path) -> Result<RunReport> {
        // 1. Parse (malformed rows already dropped)
        let statement = self.parser.parse(transactions_path)?;
        info!(
            "📂 Parsed {} transactions from {} (parser v{})",
            statement.count,
            transactions_path.display(),
            self.parser.version()
        );

        // 2. One file, one account
        let mut grouped = group(statement.transactions);
        let account_id = validate_single(&grouped)?.to_string();
        let transactions = grouped.remove(&account_id).unwrap_or_default();

        // 3. Account must already be known
        if !db::account_exists(self.conn, &account_id)? {
            return Err(SummaryError::AccountNotFound {
                account: account_id,
            });
        }
        let recipient = self.resolve_recipient(&account_id)?;
        let internal_id = db::get_internal_id(self.conn, &account_id)?;

        // 4. Persist (duplicates ignored)
        let import = db::insert_transactions(self.conn, internal_id, &transactions)?;

        // 5. Summarize + notify
        let summary = summarize(&account_id, &transactions);
        self.sender
            .send(&recipient, SUBJECT, &summary.render_html(), self.logo.as_ref())?;
        info!("✅ Summary email sent to {} for account {}", recipient, account_id);

        Ok(RunReport {
            account_id,
            recipient,
            summary,
            import,
        })
    }

    fn resolve_recipient(&self, account_id: &str) -> Result<String> {
        let account = db::get_account(self.conn, account_id)?;
        if account.has_email() {
            return Ok(account.email.trim().to_string());
        }

        self.fallback_recipient
            .clone()
            .ok_or_else(|| SummaryError::MissingEmail {
                account: account_id.to_string(),
            })
    }
}
