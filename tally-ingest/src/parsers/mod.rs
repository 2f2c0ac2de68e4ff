//! Bank-specific CSV parsers.

pub mod chase_checking;
pub mod chase_credit;

pub use chase_checking::parse_chase_checking_csv;
pub use chase_credit::parse_chase_credit_csv;

use chrono::NaiveDate;

/// Parse the date formats seen in bank exports: `04/25/2024`, `4/5/24`, `2024-04-25`.
pub fn parse_statement_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let fmt = match s.rsplit_once('/') {
        Some((_, year)) if year.len() == 2 => "%m/%d/%y",
        Some(_) => "%m/%d/%Y",
        None => "%Y-%m-%d",
    };
    NaiveDate::parse_from_str(s, fmt).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statement_date() {
        let want = NaiveDate::from_ymd_opt(2024, 4, 25);
        assert_eq!(parse_statement_date("04/25/2024"), want);
        assert_eq!(parse_statement_date("2024-04-25"), want);
        assert_eq!(parse_statement_date("4/25/24"), want);
        assert_eq!(parse_statement_date("not a date"), None);
        assert_eq!(parse_statement_date(""), None);
    }
}
