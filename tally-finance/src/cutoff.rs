//! Card subledger reconciliation with a period cut-off.
//!
//! Checking autopay totals are compared against the payments the card export received.
//! Charges posted more than `cutoff_days` after the last checking payment belong to the next
//! bill and are set aside. Each payment is also matched against the charges in a window
//! around it to grade how well it lines up.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tally_core::{checking_rules::CARD_AUTOPAY, format_usd, round_and_sum, round_to_cents};
use tally_ingest::{CardStatement, CardTransaction, CheckingStatement, Transaction};
use tracing::{debug, info};

use crate::card_reconciliation::ChargeLine;
use crate::totals::calculate_financial_totals;

pub const DEFAULT_TOLERANCE: f64 = 0.01;
pub const DEFAULT_CUTOFF_DAYS: i64 = 30;

const LOOKBACK_DAYS: i64 = 35;
const PROCESSING_DAYS: i64 = 5;
const TIMING_TOLERANCE: f64 = 50.0;
const HIGH_CONFIDENCE_PCT: f64 = 1.0;
const MEDIUM_CONFIDENCE_PCT: f64 = 5.0;
const MAX_LISTED_EXCLUDED: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    fn from_percent(pct: f64) -> Self {
        if pct <= HIGH_CONFIDENCE_PCT {
            Confidence::High
        } else if pct <= MEDIUM_CONFIDENCE_PCT {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// A checking payment and the card charges in its window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowMatch<'a> {
    pub checking_payment: &'a Transaction,
    pub charges: Vec<&'a CardTransaction>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub charge_total: f64,
    /// Payment minus charges
    pub variance: f64,
    pub percent_variance: f64,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutoffTotals {
    pub checking_payment_total: f64,
    pub card_payment_total: f64,
    /// Charges on or before the cut-off
    pub card_charge_total: f64,
    /// Checking minus card payments
    pub payment_variance: f64,
    pub payment_percent_variance: f64,
    /// Included charges minus card payments
    pub outstanding_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutoffValidation {
    pub total_variance_within_tolerance: bool,
    pub all_payments_matched: bool,
    pub timing_variances_acceptable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedCharges {
    pub total_amount: f64,
    pub transaction_count: usize,
    /// First few, oldest first
    pub transactions: Vec<ChargeLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodCutoff {
    /// Latest checking card payment; the epoch when there is none
    pub last_payment_date: NaiveDate,
    pub cutoff_date: NaiveDate,
    pub cutoff_days: i64,
    pub excluded: ExcludedCharges,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutoffReconciliation<'a> {
    pub is_reconciled: bool,
    pub totals: CutoffTotals,
    pub matches: Vec<WindowMatch<'a>>,
    pub unmatched_charges: Vec<&'a CardTransaction>,
    pub unmatched_payments: Vec<&'a Transaction>,
    pub validation: CutoffValidation,
    pub period_cutoff: PeriodCutoff,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceLine {
    pub payment_date: NaiveDate,
    pub payment_amount: f64,
    pub charge_total: f64,
    pub variance: f64,
    pub confidence: Confidence,
    pub days_in_period: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceStatistics {
    /// Sum of absolute variances
    pub total_variance: f64,
    pub avg_variance: f64,
    pub max_variance: f64,
    pub high_confidence_matches: usize,
    pub medium_confidence_matches: usize,
    pub low_confidence_matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceAnalysis {
    pub variances: Vec<VarianceLine>,
    pub statistics: VarianceStatistics,
}

fn percent_of_larger(variance: f64, a: f64, b: f64) -> f64 {
    let larger = a.max(b);
    if larger > 0.0 { variance.abs() / larger * 100.0 } else { 0.0 }
}

fn match_payment<'a>(payment: &'a Transaction, charges: &[&'a CardTransaction]) -> WindowMatch<'a> {
    let period_start = payment.date - Duration::days(LOOKBACK_DAYS);
    let period_end = payment.date + Duration::days(PROCESSING_DAYS);
    let in_window: Vec<&CardTransaction> = charges
        .iter()
        .copied()
        .filter(|c| c.date >= period_start && c.date <= period_end)
        .collect();
    let paid = payment.amount.abs();
    let charge_total = round_and_sum(in_window.iter().map(|c| c.amount));
    let variance = round_to_cents(paid - charge_total);
    let percent_variance = percent_of_larger(variance, paid, charge_total);
    WindowMatch {
        checking_payment: payment,
        charges: in_window,
        period_start,
        period_end,
        charge_total,
        variance,
        percent_variance,
        confidence: Confidence::from_percent(percent_variance),
    }
}

/// Reconcile checking card payments against the card export, setting aside charges
/// made more than `cutoff_days` after the last payment. `tolerance` is a fraction (0.01 = 1%).
pub fn reconcile_card_subledger<'a>(
    checking: &'a CheckingStatement,
    card: &'a CardStatement,
    tolerance: f64,
    cutoff_days: i64,
) -> CutoffReconciliation<'a> {
    let totals = calculate_financial_totals(checking, Some(card));

    let mut payments: Vec<&Transaction> = checking
        .transactions
        .iter()
        .filter(|t| t.category == CARD_AUTOPAY && t.amount < 0.0)
        .collect();
    payments.sort_by_key(|t| t.date);

    let last_payment_date = payments
        .last()
        .map(|t| t.date)
        .unwrap_or(NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date"));
    let cutoff_date = last_payment_date + Duration::days(cutoff_days);

    let mut all_charges: Vec<&CardTransaction> = card.charges().collect();
    all_charges.sort_by_key(|t| t.date);
    let (charges, excluded): (Vec<&CardTransaction>, Vec<&CardTransaction>) =
        all_charges.into_iter().partition(|t| t.date <= cutoff_date);

    let checking_payment_total = round_to_cents(totals.credit_card_payments.abs());
    let card_payment_total = round_to_cents(card.summary.total_credits);
    let card_charge_total = round_and_sum(charges.iter().map(|t| t.amount));
    let excluded_total = round_and_sum(excluded.iter().map(|t| t.amount));
    let payment_variance = round_to_cents(checking_payment_total - card_payment_total);
    let payment_percent_variance =
        percent_of_larger(payment_variance, checking_payment_total, card_payment_total);

    info!(
        last_payment = %last_payment_date,
        cutoff = %cutoff_date,
        checking_payment_total,
        card_payment_total,
        card_charge_total,
        excluded_total,
        payment_percent_variance,
        "card subledger reconciliation"
    );

    let matches: Vec<WindowMatch<'a>> =
        payments.iter().map(|&p| match_payment(p, &charges)).collect();

    let unmatched_payments: Vec<&Transaction> = matches
        .iter()
        .filter(|m| m.charges.is_empty())
        .map(|m| m.checking_payment)
        .collect();
    let unmatched_charges: Vec<&CardTransaction> = charges
        .iter()
        .copied()
        .filter(|c| {
            !matches
                .iter()
                .any(|m| m.charges.iter().any(|mc| std::ptr::eq(*mc, *c)))
        })
        .collect();
    debug!(
        unmatched_payments = unmatched_payments.len(),
        unmatched_charges = unmatched_charges.len(),
        "payment windows matched"
    );

    let validation = CutoffValidation {
        total_variance_within_tolerance: payment_percent_variance <= tolerance * 100.0,
        all_payments_matched: unmatched_payments.is_empty(),
        timing_variances_acceptable: matches
            .iter()
            .filter(|m| !m.charges.is_empty())
            .all(|m| m.variance.abs() <= TIMING_TOLERANCE),
    };

    CutoffReconciliation {
        is_reconciled: validation.total_variance_within_tolerance
            && validation.all_payments_matched,
        totals: CutoffTotals {
            checking_payment_total,
            card_payment_total,
            card_charge_total,
            payment_variance,
            payment_percent_variance,
            outstanding_balance: round_to_cents(card_charge_total - card_payment_total),
        },
        matches,
        unmatched_charges,
        unmatched_payments,
        validation,
        period_cutoff: PeriodCutoff {
            last_payment_date,
            cutoff_date,
            cutoff_days,
            excluded: ExcludedCharges {
                total_amount: excluded_total,
                transaction_count: excluded.len(),
                transactions: excluded
                    .iter()
                    .take(MAX_LISTED_EXCLUDED)
                    .map(|t| ChargeLine::from(*t))
                    .collect(),
            },
        },
    }
}

pub fn format_cutoff_summary(rec: &CutoffReconciliation<'_>) -> String {
    let t = &rec.totals;
    let mut out = if rec.is_reconciled {
        format!(
            "RECONCILED: card payments match checking payments within tolerance ({:.2}% variance)",
            t.payment_percent_variance
        )
    } else {
        let mut issues = Vec::new();
        if !rec.validation.total_variance_within_tolerance {
            issues.push(format!(
                "payment variance of {:.1}% exceeds tolerance",
                t.payment_percent_variance
            ));
        }
        if !rec.unmatched_payments.is_empty() {
            issues.push(format!("{} unmatched payments", rec.unmatched_payments.len()));
        }
        if !rec.validation.timing_variances_acceptable {
            issues.push("timing variances exceed acceptable limits".to_string());
        }
        if issues.is_empty() {
            format!(
                "RECONCILIATION NOTE: {} variance in payment matching",
                format_usd(t.payment_variance.abs())
            )
        } else {
            format!("RECONCILIATION ISSUES: {}", issues.join(", "))
        }
    };

    let cut = &rec.period_cutoff;
    if cut.excluded.transaction_count > 0 {
        out.push_str(&format!(
            "\nPERIOD CUTOFF: {} charges ({}) excluded after {}",
            cut.excluded.transaction_count,
            format_usd(cut.excluded.total_amount),
            cut.cutoff_date
        ));
    }
    out
}

/// Per-payment variances and how confidently each payment lines up with its window
pub fn variance_analysis(rec: &CutoffReconciliation<'_>) -> VarianceAnalysis {
    let variances: Vec<VarianceLine> = rec
        .matches
        .iter()
        .map(|m| VarianceLine {
            payment_date: m.checking_payment.date,
            payment_amount: m.checking_payment.amount.abs(),
            charge_total: m.charge_total,
            variance: m.variance,
            confidence: m.confidence,
            days_in_period: (m.period_end - m.period_start).num_days(),
        })
        .collect();

    let total_variance = round_and_sum(variances.iter().map(|v| v.variance.abs()));
    let avg_variance = if variances.is_empty() {
        0.0
    } else {
        round_to_cents(total_variance / variances.len() as f64)
    };
    let max_variance = variances
        .iter()
        .map(|v| v.variance.abs())
        .fold(0.0, f64::max);
    let count = |c: Confidence| variances.iter().filter(|v| v.confidence == c).count();

    VarianceAnalysis {
        statistics: VarianceStatistics {
            total_variance,
            avg_variance,
            max_variance,
            high_confidence_matches: count(Confidence::High),
            medium_confidence_matches: count(Confidence::Medium),
            low_confidence_matches: count(Confidence::Low),
        },
        variances,
    }
}
