// 📊 Summary Generator - balance, monthly activity, average debit/credit
//
// Credits are amounts > 0, debits are amounts <= 0. Balance sums everything.
// Months sort chronologically; transactions whose timestamp is not RFC 3339
// land in a trailing "Unknown" bucket.

use chrono::{DateTime, Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::parser::Transaction;

pub const UNKNOWN_MONTH: &str = "Unknown";

// ============================================================================
// MONTH BUCKETS
// ============================================================================

/// Sort key for a month bucket. Variant order puts `Unknown` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MonthKey {
    Month { year: i32, month: u32 },
    Unknown,
}

impl MonthKey {
    pub fn from_timestamp(timestamp: &str) -> Self {
        match DateTime::parse_from_rfc3339(timestamp) {
            Ok(dt) => MonthKey::Month {
                year: dt.year(),
                month: dt.month(),
            },
            Err(_) => MonthKey::Unknown,
        }
    }

    /// "July 2024", or "Unknown"
    pub fn label(&self) -> String {
        match self {
            MonthKey::Month { year, month } => NaiveDate::from_ymd_opt(*year, *month, 1)
                .map(|d| d.format("%B %Y").to_string())
                .unwrap_or_else(|| UNKNOWN_MONTH.to_string()),
            MonthKey::Unknown => UNKNOWN_MONTH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    pub label: String,
    pub count: usize,
}

// ============================================================================
// SUMMARY REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub account_id: String,
    pub total_balance: Decimal,
    /// Chronological, "Unknown" last
    pub months: Vec<MonthCount>,
    pub credit_total: Decimal,
    pub credit_count: usize,
    pub debit_total: Decimal,
    pub debit_count: usize,
    pub average_debit: Decimal,
    pub average_credit: Decimal,
}

pub fn summarize(account_id: &str, transactions: &[Transaction]) -> SummaryReport {
    let mut buckets: BTreeMap<MonthKey, usize> = BTreeMap::new();
    let mut balance = Decimal::ZERO;
    let mut credit_total = Decimal::ZERO;
    let mut debit_total = Decimal::ZERO;
    let mut credit_count = 0usize;
    let mut debit_count = 0usize;

    for tx in transactions {
        *buckets.entry(MonthKey::from_timestamp(&tx.timestamp)).or_insert(0) += 1;

        // Totals saturate at the Decimal range instead of overflowing
        if tx.is_credit() {
            credit_total = credit_total.saturating_add(tx.amount);
            credit_count += 1;
        } else {
            debit_total = debit_total.saturating_add(tx.amount);
            debit_count += 1;
        }
        balance = balance.saturating_add(tx.amount);
    }

    SummaryReport {
        account_id: account_id.to_string(),
        total_balance: balance,
        months: buckets
            .into_iter()
            .map(|(key, count)| MonthCount {
                label: key.label(),
                count,
            })
            .collect(),
        credit_total,
        credit_count,
        debit_total,
        debit_count,
        average_debit: average(debit_total, debit_count),
        average_credit: average(credit_total, credit_count),
    }
}

fn average(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    total / Decimal::from(count)
}

/// Two decimals, half away from zero. Never renders "-0.00".
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded = Decimal::ZERO;
    }
    rounded.rescale(2);
    rounded.to_string()
}

impl SummaryReport {
    pub fn balance_line(&self) -> String {
        format!("Total balance is {}", format_amount(self.total_balance))
    }

    pub fn month_lines(&self) -> Vec<String> {
        self.months
            .iter()
            .map(|m| format!("Number of transactions in {}: {}", m.label, m.count))
            .collect()
    }

    pub fn average_debit_line(&self) -> String {
        format!("Average debit amount: {}", format_amount(self.average_debit))
    }

    pub fn average_credit_line(&self) -> String {
        format!("Average credit amount: {}", format_amount(self.average_credit))
    }

    /// Two-column HTML table: balance + months on the left, averages on the right
    pub fn render_html(&self) -> String {
        let mut left = format!("{}<br>", self.balance_line());
        for line in self.month_lines() {
            left.push_str(&line);
            left.push_str("<br>");
        }

        let right = format!(
            "{}<br>{}",
            self.average_debit_line(),
            self.average_credit_line()
        );

        format!(
            r#"
<table style="width:100%; max-width:600px; border-collapse:collapse;">
  <tr>
    <td style="vertical-align:top; width:50%; padding:8px; border-right:1px solid #eee;">{}</td>
    <td style="vertical-align:top; width:50%; padding:8px;">{}</td>
  </tr>
</table>
"#,
            left, right
        )
    }
}
