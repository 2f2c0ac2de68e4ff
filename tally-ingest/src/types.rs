use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_core::{CategoryTriple, ChaseType, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    #[serde(rename = "checking")]
    Checking,
    #[serde(rename = "credit")]
    CreditCard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn of<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        dates.into_iter().fold(DateRange::default(), |acc, d| DateRange {
            start: Some(acc.start.map_or(d, |s| s.min(d))),
            end: Some(acc.end.map_or(d, |e| e.max(d))),
        })
    }
}

/// One row of the checking-account export, categorized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// `checking-{row}`
    pub id: String,
    /// Zero-based data row in the source file (exports are newest first)
    pub row: usize,
    pub date: NaiveDate,
    pub description: String,
    /// Positive = money in, negative = money out
    pub amount: f64,
    /// `DEBIT` / `CREDIT` / `CHECK` column
    pub details: String,
    /// Bank transaction type (`ACH_CREDIT`, `WIRE_OUTGOING`, ...)
    pub tx_type: String,
    pub balance: Option<f64>,
    pub account: String,
    pub category: String,
}

/// One row of the Chase card export, enriched by the categorizer at parse time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardTransaction {
    pub row: usize,
    pub card: String,
    pub date: NaiveDate,
    pub post_date: Option<NaiveDate>,
    pub description: String,
    /// Chase's own category column, untouched
    pub chase_category: String,
    pub chase_type: ChaseType,
    pub direction: Direction,
    /// Always non-negative; `direction` carries the sign
    pub amount: f64,
    pub memo: Option<String>,
    pub vendor: String,
    pub categories: CategoryTriple,
}

impl CardTransaction {
    pub fn is_debit(&self) -> bool {
        self.direction == Direction::Debit
    }

    /// Return or refund: a credit that reduces category spend
    pub fn is_refund(&self) -> bool {
        if self.direction != Direction::Credit {
            return false;
        }
        let desc = self.description.to_lowercase();
        self.chase_type.is_refund() || desc.contains("return") || desc.contains("refund")
    }

    /// A credit categorized as a card payment
    pub fn is_payment(&self) -> bool {
        self.direction == Direction::Credit && self.categories.category == "Payments"
    }

    pub fn full_category(&self) -> String {
        self.categories.full_label()
    }

    /// Signed amount from the card holder's view: charges negative
    pub fn signed_amount(&self) -> f64 {
        match self.direction {
            Direction::Debit => -self.amount,
            Direction::Credit => self.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account: String,
    pub account_type: StatementKind,
    pub total_transactions: usize,
    pub date_range: DateRange,
    /// Current balance: the latest transaction's running balance
    pub balance: Option<f64>,
    pub total_debits: f64,
    pub total_credits: f64,
    pub net_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    /// Sum of absolute amounts
    pub amount: f64,
    pub count: usize,
    /// Share of debits + credits
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyData {
    /// `YYYY-MM`
    pub month: String,
    pub total_debits: f64,
    pub total_credits: f64,
    pub net_flow: f64,
    pub transaction_count: usize,
}

/// Parsed checking export: transactions in chronological order plus summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckingStatement {
    pub transactions: Vec<Transaction>,
    pub summary: AccountSummary,
    pub categories: Vec<CategorySummary>,
    pub monthly: Vec<MonthlyData>,
}

impl CheckingStatement {
    /// Latest-dated transaction; among same-day rows the one nearest the top of the file
    pub fn latest_transaction(&self) -> Option<&Transaction> {
        self.transactions
            .iter()
            .max_by(|a, b| a.date.cmp(&b.date).then(b.row.cmp(&a.row)))
    }

    /// Category summaries whose label satisfies `pred`
    pub fn categories_where<'a, F>(&'a self, pred: F) -> impl Iterator<Item = &'a CategorySummary>
    where
        F: Fn(&str) -> bool + 'a,
    {
        self.categories.iter().filter(move |c| pred(&c.category))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSummary {
    pub total_debits: f64,
    pub total_credits: f64,
    /// Debits minus credits
    pub net_amount: f64,
    pub transaction_count: usize,
    pub date_range: DateRange,
    /// `"{category} - {subcategory}"` -> charges less returns
    pub category_breakdown: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub amount: f64,
    pub percentage: f64,
}

/// Parsed card export: transactions newest first plus summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardStatement {
    pub transactions: Vec<CardTransaction>,
    pub summary: CardSummary,
}

impl CardStatement {
    pub fn charges(&self) -> impl Iterator<Item = &CardTransaction> {
        self.transactions.iter().filter(|t| t.is_debit())
    }

    /// Charges per `YYYY-MM`
    pub fn monthly_charges(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for t in self.charges() {
            *out.entry(t.date.format("%Y-%m").to_string()).or_insert(0.0) += t.amount;
        }
        out
    }

    /// Largest breakdown entries with their share of total debits
    pub fn top_expense_categories(&self, limit: usize) -> Vec<CategoryShare> {
        let mut shares: Vec<CategoryShare> = self
            .summary
            .category_breakdown
            .iter()
            .map(|(category, amount)| CategoryShare {
                category: category.clone(),
                amount: *amount,
                percentage: tally_core::percent_of(*amount, self.summary.total_debits),
            })
            .collect();
        shares.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        shares.truncate(limit);
        shares
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_of() {
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        let r = DateRange::of([d(5, 3), d(4, 28), d(9, 22)]);
        assert_eq!(r.start, Some(d(4, 28)));
        assert_eq!(r.end, Some(d(9, 22)));
        assert_eq!(DateRange::of([]), DateRange::default());
    }
}
