//! Statement-level summaries: account totals, per-category and per-month rollups.

use std::collections::{BTreeMap, HashMap};

use tally_core::{percent_of, Direction};

use crate::types::{
    AccountSummary, CardStatement, CardSummary, CardTransaction, CategorySummary,
    CheckingStatement, DateRange, MonthlyData, StatementKind, Transaction,
};

/// Sort chronologically and build the checking summaries.
pub fn summarize_checking(mut transactions: Vec<Transaction>, account: &str) -> CheckingStatement {
    // stable: same-day rows keep file order
    transactions.sort_by_key(|t| t.date);

    let total_debits: f64 = transactions
        .iter()
        .filter(|t| t.amount < 0.0)
        .map(|t| t.amount.abs())
        .sum();
    let total_credits: f64 = transactions
        .iter()
        .filter(|t| t.amount > 0.0)
        .map(|t| t.amount)
        .sum();

    let mut by_category: HashMap<&str, (f64, usize)> = HashMap::new();
    for t in &transactions {
        let key = if t.category.is_empty() { "Other" } else { t.category.as_str() };
        let entry = by_category.entry(key).or_insert((0.0, 0));
        entry.0 += t.amount.abs();
        entry.1 += 1;
    }

    let grand_total = total_debits + total_credits;
    let mut categories: Vec<CategorySummary> = by_category
        .into_iter()
        .map(|(category, (amount, count))| CategorySummary {
            category: category.to_string(),
            amount,
            count,
            percentage: percent_of(amount, grand_total),
        })
        .collect();
    categories.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.category.cmp(&b.category)));

    let mut by_month: BTreeMap<String, (f64, f64, usize)> = BTreeMap::new();
    for t in &transactions {
        let entry = by_month
            .entry(t.date.format("%Y-%m").to_string())
            .or_insert((0.0, 0.0, 0));
        if t.amount < 0.0 {
            entry.0 += t.amount.abs();
        } else {
            entry.1 += t.amount;
        }
        entry.2 += 1;
    }
    let monthly = by_month
        .into_iter()
        .map(|(month, (debits, credits, count))| MonthlyData {
            month,
            total_debits: debits,
            total_credits: credits,
            net_flow: credits - debits,
            transaction_count: count,
        })
        .collect();

    let date_range = DateRange::of(transactions.iter().map(|t| t.date));
    let mut statement = CheckingStatement {
        summary: AccountSummary {
            account: account.to_string(),
            account_type: StatementKind::Checking,
            total_transactions: transactions.len(),
            date_range,
            balance: None,
            total_debits,
            total_credits,
            net_amount: total_credits - total_debits,
        },
        transactions,
        categories,
        monthly,
    };
    statement.summary.balance = statement.latest_transaction().and_then(|t| t.balance);
    statement
}

/// Sort newest first and build the card summary.
pub fn summarize_card(mut transactions: Vec<CardTransaction>) -> CardStatement {
    transactions.sort_by(|a, b| b.date.cmp(&a.date).then(a.row.cmp(&b.row)));

    let mut total_debits = 0.0;
    let mut total_credits = 0.0;
    let mut category_breakdown: BTreeMap<String, f64> = BTreeMap::new();

    for t in &transactions {
        match t.direction {
            Direction::Debit => {
                total_debits += t.amount;
                *category_breakdown.entry(t.full_category()).or_insert(0.0) += t.amount;
            }
            Direction::Credit => {
                total_credits += t.amount;
                // payments settle the balance; only returns reduce spend
                if t.is_refund() {
                    *category_breakdown.entry(t.full_category()).or_insert(0.0) -= t.amount;
                }
            }
        }
    }

    let date_range = DateRange::of(transactions.iter().map(|t| t.date));
    CardStatement {
        summary: CardSummary {
            total_debits,
            total_credits,
            net_amount: total_debits - total_credits,
            transaction_count: transactions.len(),
            date_range,
            category_breakdown,
        },
        transactions,
    }
}
