//! Data-source audit: recompute card figures two ways and explain where the checking and
//! card exports disagree (payment timing, per-month gaps, date coverage).

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use tally_core::{checking_rules::CARD_AUTOPAY, format_usd, round_and_sum, round_to_cents};
use tally_ingest::{CardStatement, CardTransaction, CheckingStatement, DateRange};
use tracing::{info, warn};

use crate::totals::calculate_financial_totals;

/// Card charges may differ from the parser's total debits by at most this much.
const CHARGE_TOTAL_TOLERANCE: f64 = 0.01;
/// Months whose payments and charges differ by less than this are not reported.
const PERIOD_MISMATCH_THRESHOLD: f64 = 100.0;
const DEFAULT_PAYMENT_CYCLE_DAYS: i64 = 30;
const MAX_LISTED_CHARGES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub source: String,
    pub description: String,
    pub expected_value: f64,
    pub actual_value: f64,
    pub variance: f64,
    pub severity: Severity,
}

/// One figure and how it was derived
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub calculation: String,
    pub source: String,
    pub value: f64,
    pub formula: String,
    pub data_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditedPayment {
    pub date: NaiveDate,
    /// Positive
    pub amount: f64,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditedCharge {
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
}

impl From<&CardTransaction> for AuditedCharge {
    fn from(t: &CardTransaction) -> Self {
        AuditedCharge {
            date: t.date,
            amount: t.amount,
            description: t.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountCount {
    pub total_amount: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckingAudit {
    pub date_range: DateRange,
    pub card_payments: AmountCount,
    pub card_payment_lines: Vec<AuditedPayment>,
    /// Business expenses outside the card, and every non-autopay outflow row
    pub other_expenses: AmountCount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardAudit {
    pub date_range: DateRange,
    pub charges: AmountCount,
    pub charges_by_month: BTreeMap<String, f64>,
    pub payments: AmountCount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargesAfterPayment {
    pub amount: f64,
    pub count: usize,
    /// First few, oldest first
    pub transactions: Vec<AuditedCharge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingAnalysis {
    /// Latest checking card payment; the epoch when there is none
    pub last_payment_date: NaiveDate,
    pub charges_after_last_payment: ChargesAfterPayment,
    /// Mean days between checking card payments, rounded
    pub average_payment_cycle: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodMismatch {
    /// `YYYY-MM`
    pub month: String,
    pub checking_payments: f64,
    pub card_charges: f64,
    /// Payments minus charges
    pub variance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnpaidCharges {
    pub total_unpaid_amount: f64,
    pub oldest_unpaid_date: Option<NaiveDate>,
    pub newest_unpaid_date: Option<NaiveDate>,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditSummary {
    pub checking_total_transactions: usize,
    pub card_total_transactions: usize,
    pub date_range_mismatch: bool,
    pub discrepancies: Vec<Discrepancy>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataAudit {
    pub summary: AuditSummary,
    pub checking: CheckingAudit,
    pub card: CardAudit,
    pub timing: TimingAnalysis,
    pub period_mismatches: Vec<PeriodMismatch>,
    pub unpaid_charges: UnpaidCharges,
    pub audit_trail: Vec<AuditEntry>,
}

fn entry(calculation: &str, source: &str, value: f64, formula: &str, data_points: usize) -> AuditEntry {
    AuditEntry {
        calculation: calculation.to_string(),
        source: source.to_string(),
        value,
        formula: formula.to_string(),
        data_points,
    }
}

fn month_of(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

fn average_cycle(payments: &[AuditedPayment]) -> i64 {
    let gaps: Vec<i64> = payments
        .windows(2)
        .map(|w| (w[1].date - w[0].date).num_days())
        .collect();
    if gaps.is_empty() {
        return DEFAULT_PAYMENT_CYCLE_DAYS;
    }
    (gaps.iter().sum::<i64>() as f64 / gaps.len() as f64).round() as i64
}

/// Cross-check the checking and card exports against each other.
pub fn audit_data_sources(checking: &CheckingStatement, card: &CardStatement) -> DataAudit {
    let totals = calculate_financial_totals(checking, Some(card));
    let mut trail = vec![entry(
        "Checking card payments",
        "calculate_financial_totals",
        totals.credit_card_payments,
        "Sum of Credit Card Autopay category",
        checking
            .transactions
            .iter()
            .filter(|t| t.category == CARD_AUTOPAY)
            .count(),
    )];

    let mut payments: Vec<AuditedPayment> = checking
        .transactions
        .iter()
        .filter(|t| t.category == CARD_AUTOPAY && t.amount < 0.0)
        .map(|t| AuditedPayment {
            date: t.date,
            amount: t.amount.abs(),
            description: t.description.clone(),
            category: t.category.clone(),
        })
        .collect();
    payments.sort_by_key(|p| p.date);
    let payments_total = round_and_sum(payments.iter().map(|p| p.amount));
    trail.push(entry(
        "Checking card payments (row sum)",
        "checking rows",
        payments_total,
        "Sum of outgoing Credit Card Autopay rows",
        payments.len(),
    ));

    let mut charges: Vec<&CardTransaction> = card.charges().collect();
    charges.sort_by_key(|t| t.date);
    let card_credits: Vec<&CardTransaction> =
        card.transactions.iter().filter(|t| !t.is_debit()).collect();
    let charges_total = round_and_sum(charges.iter().map(|t| t.amount));
    let credits_total = round_and_sum(card_credits.iter().map(|t| t.amount));
    trail.push(entry(
        "Card charges",
        "card rows",
        charges_total,
        "Sum of debit rows",
        charges.len(),
    ));
    trail.push(entry(
        "Card total debits",
        "card summary",
        card.summary.total_debits,
        "Parser total debits",
        card.summary.transaction_count,
    ));

    let mut discrepancies = Vec::new();
    let expected = round_to_cents(card.summary.total_debits);
    if (charges_total - expected).abs() > CHARGE_TOTAL_TOLERANCE {
        warn!(charges_total, expected, "card charge total disagrees with summary");
        discrepancies.push(Discrepancy {
            source: "Card charges vs card summary".to_string(),
            description: "Charge rows do not sum to the summary's total debits".to_string(),
            expected_value: expected,
            actual_value: charges_total,
            variance: round_to_cents(charges_total - expected),
            severity: Severity::Critical,
        });
    }

    let last_payment_date = payments
        .last()
        .map(|p| p.date)
        .unwrap_or(NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date"));
    let after: Vec<&CardTransaction> = charges
        .iter()
        .copied()
        .filter(|t| t.date > last_payment_date)
        .collect();
    let unpaid_amount = round_and_sum(after.iter().map(|t| t.amount));

    let mut monthly_payments: BTreeMap<String, f64> = BTreeMap::new();
    for p in &payments {
        *monthly_payments.entry(month_of(p.date)).or_insert(0.0) += p.amount;
    }
    let mut monthly_charges: BTreeMap<String, f64> = BTreeMap::new();
    for t in &charges {
        *monthly_charges.entry(month_of(t.date)).or_insert(0.0) += t.amount;
    }
    for v in monthly_charges.values_mut() {
        *v = round_to_cents(*v);
    }

    let months: BTreeSet<&String> = monthly_payments.keys().chain(monthly_charges.keys()).collect();
    let period_mismatches: Vec<PeriodMismatch> = months
        .into_iter()
        .filter_map(|month| {
            let paid = round_to_cents(monthly_payments.get(month).copied().unwrap_or(0.0));
            let charged = monthly_charges.get(month).copied().unwrap_or(0.0);
            let variance = round_to_cents(paid - charged);
            (variance.abs() > PERIOD_MISMATCH_THRESHOLD).then(|| PeriodMismatch {
                month: month.clone(),
                checking_payments: paid,
                card_charges: charged,
                variance,
            })
        })
        .collect();

    let date_range_mismatch = checking.summary.date_range != card.summary.date_range;
    let other_outflows = checking
        .transactions
        .iter()
        .filter(|t| t.amount < 0.0 && t.category != CARD_AUTOPAY)
        .count();

    let audit = DataAudit {
        summary: AuditSummary {
            checking_total_transactions: checking.transactions.len(),
            card_total_transactions: card.transactions.len(),
            date_range_mismatch,
            discrepancies,
        },
        checking: CheckingAudit {
            date_range: checking.summary.date_range,
            card_payments: AmountCount {
                total_amount: payments_total,
                transaction_count: payments.len(),
            },
            other_expenses: AmountCount {
                total_amount: round_to_cents(
                    totals.total_business_expenses - totals.credit_card_total_expenses,
                ),
                transaction_count: other_outflows,
            },
            card_payment_lines: payments.clone(),
        },
        card: CardAudit {
            date_range: card.summary.date_range,
            charges: AmountCount {
                total_amount: charges_total,
                transaction_count: charges.len(),
            },
            charges_by_month: monthly_charges,
            payments: AmountCount {
                total_amount: credits_total,
                transaction_count: card_credits.len(),
            },
        },
        timing: TimingAnalysis {
            last_payment_date,
            charges_after_last_payment: ChargesAfterPayment {
                amount: unpaid_amount,
                count: after.len(),
                transactions: after
                    .iter()
                    .take(MAX_LISTED_CHARGES)
                    .map(|t| AuditedCharge::from(*t))
                    .collect(),
            },
            average_payment_cycle: average_cycle(&payments),
        },
        period_mismatches,
        unpaid_charges: UnpaidCharges {
            total_unpaid_amount: unpaid_amount,
            oldest_unpaid_date: after.first().map(|t| t.date),
            newest_unpaid_date: after.last().map(|t| t.date),
            transaction_count: after.len(),
        },
        audit_trail: trail,
    };

    info!(
        payments = payments_total,
        charges = charges_total,
        unpaid = unpaid_amount,
        last_payment = %last_payment_date,
        discrepancies = audit.summary.discrepancies.len(),
        "data audit complete"
    );
    audit
}

pub fn format_audit_summary(audit: &DataAudit) -> String {
    let mut out = String::from("DATA AUDIT SUMMARY\n\n");

    if !audit.summary.discrepancies.is_empty() {
        out.push_str("CRITICAL DISCREPANCIES:\n");
        for (i, d) in audit.summary.discrepancies.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, d.description));
            out.push_str(&format!("   Expected: {}\n", format_usd(d.expected_value)));
            out.push_str(&format!("   Actual: {}\n", format_usd(d.actual_value)));
            out.push_str(&format!("   Variance: {}\n\n", format_usd(d.variance.abs())));
        }
    }

    let t = &audit.timing;
    out.push_str("TIMING ANALYSIS:\n");
    out.push_str(&format!("Last payment: {}\n", t.last_payment_date));
    out.push_str(&format!(
        "Unpaid charges: {} ({})\n",
        format_usd(audit.unpaid_charges.total_unpaid_amount),
        audit.unpaid_charges.transaction_count
    ));
    out.push_str(&format!("Payment cycle: {} days\n", t.average_payment_cycle));
    if audit.summary.date_range_mismatch {
        out.push_str("Exports cover different date ranges\n");
    }

    if !audit.period_mismatches.is_empty() {
        out.push_str("\nPERIOD MISMATCHES:\n");
        for m in &audit.period_mismatches {
            out.push_str(&format!("{}: {} variance\n", m.month, format_usd(m.variance.abs())));
        }
    }
    out
}
