//! Chase credit-card CSV export parser
//!
//! Expected columns:
//!   Card,Transaction Date,Post Date,Description,Category,Type,Amount,Memo
//!   8008,09/26/2025,09/28/2025,ANTHROPIC* CLAUDE PRO,Shopping,Sale,-20.00,
//!
//! Chase signs charges negative and payments/returns positive. Amounts are
//! stored as absolute values; the direction is inferred from the Chase type.

use csv::{ReaderBuilder, Trim};
use tally_core::{
    categorize_credit_card_transaction, extract_vendor, parse_amount, ChaseType, Direction,
};
use tracing::{info, warn};

use crate::error::{IngestError, Result};
use crate::parsers::parse_statement_date;
use crate::summary::summarize_card;
use crate::types::{CardStatement, CardTransaction};

/// Parse a card export. Every row is categorized at parse time.
pub fn parse_chase_credit_csv(content: &str) -> Result<CardStatement> {
    if content.trim().lines().count() < 2 {
        return Err(IngestError::Format(
            "credit card export has no data rows".to_string(),
        ));
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let mut out = Vec::new();

    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        if record.len() < 6 {
            warn!(row, columns = record.len(), "skipping malformed card row");
            continue;
        }

        let date_str = record.get(1).unwrap_or("");
        let date = match parse_statement_date(date_str) {
            Some(d) => d,
            None => {
                warn!(row, date = date_str, "skipping card row with invalid date");
                continue;
            }
        };

        let amount_str = record.get(6).unwrap_or("");
        let signed = match parse_amount(amount_str) {
            Some(a) => a,
            None => {
                warn!(row, amount = amount_str, "skipping card row with invalid amount");
                continue;
            }
        };

        let description = record.get(3).unwrap_or("").to_string();
        let chase_type = ChaseType::parse(record.get(5).unwrap_or(""));
        let direction = infer_direction(&chase_type, &description, signed);
        let amount = signed.abs();
        let chase_category = match record.get(4) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => "Uncategorized".to_string(),
        };

        out.push(CardTransaction {
            row,
            card: record.get(0).unwrap_or("").to_string(),
            date,
            post_date: record.get(2).and_then(parse_statement_date),
            categories: categorize_credit_card_transaction(&description, Some(amount)),
            vendor: extract_vendor(&description),
            description,
            chase_category,
            chase_type,
            direction,
            amount,
            memo: record.get(7).filter(|m| !m.is_empty()).map(str::to_string),
        });
    }

    let statement = summarize_card(out);
    info!(
        transactions = statement.summary.transaction_count,
        total_debits = format!("{:.2}", statement.summary.total_debits),
        total_credits = format!("{:.2}", statement.summary.total_credits),
        categories = statement.summary.category_breakdown.len(),
        "parsed card export"
    );
    Ok(statement)
}

/// Chase type first; description keywords, then the sign, when the type is silent.
fn infer_direction(chase_type: &ChaseType, description: &str, signed_amount: f64) -> Direction {
    if let Some(d) = chase_type.direction() {
        return d;
    }
    let desc = description.to_lowercase();
    if desc.contains("payment")
        || desc.contains("autopay")
        || desc.contains("return")
        || desc.contains("refund")
        || signed_amount > 0.0
    {
        Direction::Credit
    } else {
        Direction::Debit
    }
}
