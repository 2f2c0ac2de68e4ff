//! Cross-checks a parsed checking statement against a lenient re-read of the raw export.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tally_core::{amounts_equal, format_usd, parse_amount, round_and_sum, round_to_cents};
use tally_ingest::{parsers::parse_statement_date, CheckingStatement, Transaction};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceCheck {
    pub calculated: f64,
    pub expected: Option<f64>,
    pub is_valid: bool,
    pub most_recent_date: Option<NaiveDate>,
    pub most_recent_transaction: Option<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountCheck {
    pub parsed: usize,
    pub expected_from_csv: usize,
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRangeCheck {
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
    pub is_chronological: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsCheck {
    pub credits: f64,
    pub debits: f64,
    pub net_calculated: f64,
    /// Latest running balance minus earliest
    pub balance_verification: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCheck {
    pub uncategorized: usize,
    pub counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub current_balance: BalanceCheck,
    pub transaction_count: CountCheck,
    pub date_range: DateRangeCheck,
    pub totals: TotalsCheck,
    pub category_validation: CategoryCheck,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.current_balance.is_valid
            && self.transaction_count.is_valid
            && self.date_range.is_chronological
    }
}

struct RawRow {
    row: usize,
    date: NaiveDate,
    amount: f64,
    balance: Option<f64>,
}

fn read_raw_rows(raw_csv: &str) -> Vec<RawRow> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw_csv.as_bytes());

    let mut rows = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(row, error = %e, "unreadable row in raw export");
                continue;
            }
        };
        let Some(date) = record.get(1).and_then(parse_statement_date) else {
            continue;
        };
        let Some(amount) = record.get(3).and_then(parse_amount) else {
            continue;
        };
        rows.push(RawRow {
            row,
            date,
            amount,
            balance: record.get(5).and_then(parse_amount),
        });
    }
    rows
}

/// Validate `statement` against the export it was parsed from.
///
/// The raw read keeps zero-amount rows, so a count mismatch flags rows the parser dropped.
pub fn validate_checking(statement: &CheckingStatement, raw_csv: &str) -> ValidationReport {
    let raw = read_raw_rows(raw_csv);

    // latest date; same-day ties go to the row nearest the top of the export
    let most_recent = raw
        .iter()
        .max_by(|a, b| a.date.cmp(&b.date).then(b.row.cmp(&a.row)));
    let earliest = raw
        .iter()
        .min_by(|a, b| a.date.cmp(&b.date).then(b.row.cmp(&a.row)));

    let calculated = statement.summary.balance.unwrap_or(0.0);
    let expected = most_recent.and_then(|r| r.balance);
    let most_recent_transaction = most_recent.and_then(|r| {
        statement
            .transactions
            .iter()
            .find(|t| t.date == r.date && amounts_equal(t.amount, r.amount, 0.0))
            .cloned()
    });

    let credits = round_and_sum(raw.iter().filter(|r| r.amount > 0.0).map(|r| r.amount));
    let debits = round_and_sum(raw.iter().filter(|r| r.amount < 0.0).map(|r| r.amount.abs()));
    let balance_verification = match (
        most_recent.and_then(|r| r.balance),
        earliest.and_then(|r| r.balance),
    ) {
        (Some(last), Some(first)) => round_to_cents(last - first),
        _ => 0.0,
    };

    let is_chronological = statement
        .transactions
        .windows(2)
        .all(|w| w[0].date <= w[1].date);

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for t in &statement.transactions {
        let label = if t.category.is_empty() { "Uncategorized" } else { t.category.as_str() };
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    let uncategorized = statement
        .transactions
        .iter()
        .filter(|t| t.category.is_empty() || t.category == tally_core::checking_rules::OTHER)
        .count();

    ValidationReport {
        current_balance: BalanceCheck {
            calculated,
            expected,
            is_valid: expected.is_some_and(|e| (calculated - e).abs() < 0.01),
            most_recent_date: most_recent.map(|r| r.date),
            most_recent_transaction,
        },
        transaction_count: CountCheck {
            parsed: statement.transactions.len(),
            expected_from_csv: raw.len(),
            is_valid: statement.transactions.len() == raw.len(),
        },
        date_range: DateRangeCheck {
            earliest: earliest.map(|r| r.date),
            latest: most_recent.map(|r| r.date),
            is_chronological,
        },
        totals: TotalsCheck {
            credits,
            debits,
            net_calculated: round_to_cents(credits - debits),
            balance_verification,
        },
        category_validation: CategoryCheck { uncategorized, counts },
    }
}

fn check_mark(ok: bool) -> &'static str {
    if ok { "ok" } else { "MISMATCH" }
}

pub fn format_validation_report(r: &ValidationReport) -> String {
    let mut out = String::from("CHECKING DATA VALIDATION\n\n");

    let b = &r.current_balance;
    out.push_str(&format!(
        "Current balance: {} (export says {}) [{}]\n",
        format_usd(b.calculated),
        b.expected.map(format_usd).unwrap_or_else(|| "n/a".to_string()),
        check_mark(b.is_valid)
    ));
    if let Some(d) = b.most_recent_date {
        out.push_str(&format!("  most recent date: {d}\n"));
    }

    let c = &r.transaction_count;
    out.push_str(&format!(
        "Transactions: {} parsed, {} in export [{}]\n",
        c.parsed,
        c.expected_from_csv,
        check_mark(c.is_valid)
    ));

    let d = &r.date_range;
    if let (Some(first), Some(last)) = (d.earliest, d.latest) {
        out.push_str(&format!("Date range: {first} to {last}\n"));
    }
    out.push_str(&format!(
        "Chronological order: [{}]\n\n",
        check_mark(d.is_chronological)
    ));

    let t = &r.totals;
    out.push_str(&format!("Credits: {}\n", format_usd(t.credits)));
    out.push_str(&format!("Debits:  {}\n", format_usd(t.debits)));
    out.push_str(&format!("Net:     {}\n", format_usd(t.net_calculated)));
    out.push_str(&format!(
        "Balance movement: {}\n\n",
        format_usd(t.balance_verification)
    ));

    out.push_str(&format!(
        "Uncategorized transactions: {}\n",
        r.category_validation.uncategorized
    ));
    for (label, count) in &r.category_validation.counts {
        out.push_str(&format!("  {label}: {count}\n"));
    }
    out
}
