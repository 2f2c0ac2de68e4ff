//! The golden record: every headline figure, computed in one place from the parsed statements.
//!
//! Revenue and expenses come from the checking category labels; card expenses come from
//! the card's own debits (never from the checking payments that settle them).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tally_core::{
    checking_rules::{ACCOUNT_TRANSFER, CARD_AUTOPAY},
    consultant_name_from_label, round_and_sum, round_to_cents, MajorCategory,
};
use tally_ingest::{CardStatement, CheckingStatement};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseSource {
    #[serde(rename = "checking")]
    Checking,
    #[serde(rename = "credit-card")]
    CreditCard,
}

/// One line of the card expense breakdown, grouped by subcategory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCategory {
    pub name: String,
    pub amount: f64,
    pub source: ExpenseSource,
    pub major_category: MajorCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultantBreakdown {
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialTotals {
    pub business_revenue: f64,

    pub consultant_expenses: f64,
    pub consultant_breakdown: Vec<ConsultantBreakdown>,

    pub credit_card_operating_expenses: f64,
    pub credit_card_travel_expenses: f64,
    pub credit_card_meals_expenses: f64,
    pub credit_card_utilities_expenses: f64,
    pub credit_card_other_expenses: f64,
    pub credit_card_total_expenses: f64,
    pub credit_card_category_breakdown: Vec<ExpenseCategory>,

    pub auto_loan_expenses: f64,
    pub bank_fees_expenses: f64,
    pub total_business_expenses: f64,

    pub net_income: f64,

    /// Checking-side card payments; reconciliation only, never an expense
    pub credit_card_payments: f64,
    pub credit_card_reconciliation_variance: f64,

    pub initial_capital: f64,
    pub owner_capital_contributions: f64,
    pub other_credits: f64,
    pub unaccounted_credits: f64,
    pub total_owner_equity: f64,

    pub current_cash_balance: f64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct CardBuckets {
    operating: f64,
    travel: f64,
    meals: f64,
    utilities: f64,
    other: f64,
    total: f64,
}

/// Rounded sum of absolute category totals whose label contains `needle`
fn category_total(checking: &CheckingStatement, needle: &str) -> f64 {
    round_and_sum(
        checking
            .categories_where(|label| label.contains(needle))
            .map(|c| c.amount.abs()),
    )
}

fn consultant_breakdown(checking: &CheckingStatement) -> Vec<ConsultantBreakdown> {
    let mut by_name: HashMap<String, f64> = HashMap::new();
    for t in checking
        .transactions
        .iter()
        .filter(|t| t.category.contains("Consultant"))
    {
        *by_name.entry(consultant_name_from_label(&t.category)).or_insert(0.0) += t.amount.abs();
    }

    let mut out: Vec<ConsultantBreakdown> = by_name
        .into_iter()
        .map(|(name, amount)| ConsultantBreakdown { name, amount: round_to_cents(amount) })
        .collect();
    out.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));
    out
}

fn card_buckets(card: Option<&CardStatement>) -> CardBuckets {
    let Some(card) = card else {
        debug!("no card data; card expense buckets are zero");
        return CardBuckets::default();
    };

    let bucket = |major: MajorCategory| {
        round_and_sum(
            card.charges()
                .filter(|t| t.categories.major_category == major)
                .map(|t| t.amount),
        )
    };
    let other = round_and_sum(
        card.charges()
            .filter(|t| {
                !matches!(
                    t.categories.major_category,
                    MajorCategory::OperatingExpenses
                        | MajorCategory::Travel
                        | MajorCategory::MealsAndEntertainment
                        | MajorCategory::BillsAndUtilities
                        | MajorCategory::PaymentsAndFees
                        | MajorCategory::Excluded
                )
            })
            .map(|t| t.amount),
    );

    let mut b = CardBuckets {
        operating: bucket(MajorCategory::OperatingExpenses),
        travel: bucket(MajorCategory::Travel),
        meals: bucket(MajorCategory::MealsAndEntertainment),
        utilities: bucket(MajorCategory::BillsAndUtilities),
        other,
        total: 0.0,
    };
    b.total = round_to_cents(b.operating + b.travel + b.meals + b.utilities + b.other);
    b
}

fn card_category_breakdown(card: Option<&CardStatement>) -> Vec<ExpenseCategory> {
    let Some(card) = card else {
        return Vec::new();
    };

    let mut by_sub: HashMap<&str, (f64, MajorCategory)> = HashMap::new();
    for t in card.charges().filter(|t| t.categories.major_category.is_expense()) {
        let entry = by_sub
            .entry(t.categories.subcategory)
            .or_insert((0.0, t.categories.major_category));
        entry.0 += t.amount;
        entry.1 = t.categories.major_category;
    }

    let mut out: Vec<ExpenseCategory> = by_sub
        .into_iter()
        .map(|(name, (amount, major_category))| ExpenseCategory {
            name: name.to_string(),
            amount: round_to_cents(amount),
            source: ExpenseSource::CreditCard,
            major_category,
        })
        .collect();
    out.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));
    out
}

/// Compute the golden record. Pure: same inputs, same figures.
pub fn calculate_financial_totals(
    checking: &CheckingStatement,
    card: Option<&CardStatement>,
) -> FinancialTotals {
    let business_revenue = category_total(checking, "Client Payment");
    let consultant_expenses = category_total(checking, "Consultant");
    let consultant_breakdown = consultant_breakdown(checking);

    let buckets = card_buckets(card);
    let credit_card_category_breakdown = card_category_breakdown(card);

    let credit_card_payments = category_total(checking, CARD_AUTOPAY);
    let credit_card_reconciliation_variance = round_to_cents(credit_card_payments - buckets.total);

    let auto_loan_expenses = category_total(checking, "Auto Loan");
    let bank_fees_expenses = category_total(checking, "Monthly Bank");

    let total_business_expenses = round_to_cents(
        consultant_expenses + buckets.total + auto_loan_expenses + bank_fees_expenses,
    );
    let net_income = round_to_cents(business_revenue - total_business_expenses);

    let owner_capital_contributions = round_and_sum(
        checking
            .transactions
            .iter()
            .filter(|t| t.category == ACCOUNT_TRANSFER)
            .map(|t| t.amount),
    );
    let initial_capital = 0.0;

    // category totals are absolute sums; these labels are always incoming
    let other_credits = round_and_sum(
        checking
            .categories_where(|label| {
                label.contains("Wire Transfer Reversal") || label.contains("Account Verification")
            })
            .map(|c| c.amount),
    );

    let current_cash_balance = round_to_cents(
        checking
            .latest_transaction()
            .and_then(|t| t.balance)
            .unwrap_or(0.0),
    );

    let unaccounted_credits = round_to_cents(
        current_cash_balance
            - (initial_capital + owner_capital_contributions + net_income + other_credits),
    );
    let total_owner_equity = round_to_cents(
        initial_capital + owner_capital_contributions + net_income + other_credits
            + unaccounted_credits,
    );

    FinancialTotals {
        business_revenue,
        consultant_expenses,
        consultant_breakdown,
        credit_card_operating_expenses: buckets.operating,
        credit_card_travel_expenses: buckets.travel,
        credit_card_meals_expenses: buckets.meals,
        credit_card_utilities_expenses: buckets.utilities,
        credit_card_other_expenses: buckets.other,
        credit_card_total_expenses: buckets.total,
        credit_card_category_breakdown,
        auto_loan_expenses,
        bank_fees_expenses,
        total_business_expenses,
        net_income,
        credit_card_payments,
        credit_card_reconciliation_variance,
        initial_capital,
        owner_capital_contributions,
        other_credits,
        unaccounted_credits,
        total_owner_equity,
        current_cash_balance,
    }
}

impl FinancialTotals {
    /// Balance sheet check: equity equals cash to the cent
    pub fn balances(&self) -> bool {
        tally_core::amounts_equal(self.total_owner_equity, self.current_cash_balance, 0.01)
    }
}
