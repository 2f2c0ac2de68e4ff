//! Chase checking-account CSV export parser
//!
//! Expected columns:
//!   Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #
//!   DEBIT,04/28/2024,"WIRE TRANSFER TO SPAIN BILBAO CARMEN CONSULTANCY",-7600.00,WIRE_OUTGOING,305600.00,,
//!
//! Exports list the newest row first and usually carry a trailing comma.

use csv::{ReaderBuilder, Trim};
use tally_core::{parse_amount, CheckingRules};
use tracing::{debug, info};

use crate::error::Result;
use crate::parsers::parse_statement_date;
use crate::summary::summarize_checking;
use crate::types::{CheckingStatement, Transaction};

pub const CHECKING_ACCOUNT: &str = "Chase Checking";

/// Parse a checking export, categorizing each row with `rules`.
///
/// Rows without a valid date or with a zero/unparseable amount are dropped.
pub fn parse_chase_checking_csv(content: &str, rules: &CheckingRules) -> Result<CheckingStatement> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let mut out = Vec::new();

    for (row, result) in rdr.records().enumerate() {
        let record = result?;

        let date = match record.get(1).and_then(parse_statement_date) {
            Some(d) => d,
            None => {
                debug!(row, "skipping checking row without a valid date");
                continue;
            }
        };

        let amount = record.get(3).and_then(parse_amount).unwrap_or(0.0);
        if amount == 0.0 {
            debug!(row, "skipping checking row with zero amount");
            continue;
        }

        let description = record.get(2).unwrap_or("").to_string();
        let tx_type = record.get(4).unwrap_or("").to_string();
        let category = rules.categorize(&description, &tx_type, amount);

        out.push(Transaction {
            id: format!("checking-{row}"),
            row,
            date,
            description,
            amount,
            details: record.get(0).unwrap_or("").to_string(),
            tx_type,
            balance: record.get(5).and_then(parse_amount),
            account: CHECKING_ACCOUNT.to_string(),
            category,
        });
    }

    info!(transactions = out.len(), "parsed checking export");
    Ok(summarize_checking(out, CHECKING_ACCOUNT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = r#"Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #
DEBIT,05/20/2024,"CHASE CREDIT CRD AUTOPAYBUSSEC ID: 192437285",-152400.00,ACH_DEBIT,181600.00,,
CREDIT,05/15/2024,"ACH CREDIT METROPOLITAN PAR CONSULTING ID: 9876543210",47000.00,ACH_CREDIT,333600.00,,
DEBIT,04/28/2024,"WIRE TRANSFER TO UNICREDIT BULBANK CONSULTANCY PEPI",-15000.00,WIRE_OUTGOING,286600.00,,
CREDIT,04/26/2024,"ACH CREDIT LAUREL MANAGEMEN PAYROLL ID: 1234567890",134000.00,ACH_CREDIT,301600.00,,
CREDIT,04/25/2024,"ONLINE TRANSFER FROM CHK 1234",167600.00,ACCT_XFER,167600.00,,
DEBIT,,"PENDING ITEM",-10.00,ACH_DEBIT,,,
DEBIT,04/25/2024,"ZERO ROW",0.00,ACH_DEBIT,167600.00,,
"#;

    #[test]
    fn test_parse_chase_checking_basic() {
        let stmt = parse_chase_checking_csv(SAMPLE, &CheckingRules::default()).unwrap();
        assert_eq!(stmt.transactions.len(), 5);

        // chronological after parsing
        let first = &stmt.transactions[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 4, 25).unwrap());
        assert_eq!(first.category, "Account Transfer");
        assert_eq!(first.id, "checking-4");

        let wire = stmt
            .transactions
            .iter()
            .find(|t| t.description.contains("PEPI"))
            .unwrap();
        assert_eq!(wire.amount, -15000.00);
        assert_eq!(wire.balance, Some(286600.00));
        assert_eq!(wire.category, "Consultant - Bulgaria (Pepi)");
        assert_eq!(wire.details, "DEBIT");
    }

    #[test]
    fn test_summary_totals() {
        let stmt = parse_chase_checking_csv(SAMPLE, &CheckingRules::default()).unwrap();
        assert_eq!(stmt.summary.total_credits, 348600.00);
        assert_eq!(stmt.summary.total_debits, 167400.00);
        assert_eq!(stmt.summary.net_amount, 181200.00);
        assert_eq!(stmt.summary.balance, Some(181600.00));
        assert_eq!(stmt.monthly.len(), 2);
        assert_eq!(stmt.monthly[0].month, "2024-04");
        assert_eq!(stmt.monthly[0].transaction_count, 3);
        assert_eq!(stmt.categories[0].category, "Account Transfer");
    }

    #[test]
    fn test_empty_export() {
        let stmt = parse_chase_checking_csv(
            "Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #\n",
            &CheckingRules::default(),
        )
        .unwrap();
        assert!(stmt.transactions.is_empty());
        assert_eq!(stmt.summary.balance, None);
        assert_eq!(stmt.summary.date_range.start, None);
    }
}
