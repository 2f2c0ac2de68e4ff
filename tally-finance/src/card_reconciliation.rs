//! Card reconciliation: checking-account card payments (the master record) against the
//! card's own charges (the subledger).
//!
//! Statement cycles run from the 26th to the 25th. A checking payment made in month N
//! settles the cycle that closed on the 25th of month N-1.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use serde_json::{json, Value};
use tally_core::{format_usd, round_and_sum, round_to_cents};
use tally_ingest::{CardStatement, CardTransaction, CheckingStatement, Transaction};
use tracing::{debug, info, warn};

/// Statement periods reconcile only when payment and charges agree within this percentage.
pub const STATEMENT_TOLERANCE_PCT: f64 = 0.1;
/// Monthly (payment-to-payment) windows are looser.
pub const MONTHLY_TOLERANCE_PCT: f64 = 5.0;

const CYCLE_START_DAY: u32 = 26;
const CYCLE_END_DAY: u32 = 25;
const ONE_OFF_WINDOW_DAYS: i64 = 7;
const FIRST_WINDOW_DAYS: i64 = 35;
const LARGE_VARIANCE: f64 = 1000.0;
const MAX_LISTED_CHARGES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeLine {
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub category: String,
}

impl From<&CardTransaction> for ChargeLine {
    fn from(t: &CardTransaction) -> Self {
        ChargeLine {
            date: t.date,
            amount: t.amount,
            description: t.description.clone(),
            category: t.full_category(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentLine {
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementPeriod {
    /// `YYYY-MM` of the cycle end
    pub period_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub payment_amount: f64,
    pub charges: Vec<ChargeLine>,
    pub charges_total: f64,
    /// Payment minus charges
    pub variance: f64,
    pub percent_variance: f64,
    pub is_reconciled: bool,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationSummary {
    pub total_payments: f64,
    pub total_charges: f64,
    pub total_variance: f64,
    pub reconciled_periods: usize,
    pub unreconciled_periods: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OneOffPayments {
    pub count: usize,
    pub total_amount: f64,
    pub payments: Vec<PaymentLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditStep {
    pub step: String,
    pub description: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementReconciliation {
    pub periods: Vec<StatementPeriod>,
    pub summary: ReconciliationSummary,
    pub one_off_payments: OneOffPayments,
    pub audit_trail: Vec<AuditStep>,
}

impl StatementReconciliation {
    fn audit(&mut self, step: &str, description: impl Into<String>, data: Value) {
        self.audit_trail.push(AuditStep {
            step: step.to_string(),
            description: description.into(),
            data,
        });
    }
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 { (year - 1, 12) } else { (year, month - 1) }
}

/// Statement cycle settled by a payment made on `paid`: (start, end)
pub fn statement_cycle_for_payment(paid: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let (end_year, end_month) = previous_month(paid.year(), paid.month());
    let (start_year, start_month) = previous_month(end_year, end_month);
    Some((
        NaiveDate::from_ymd_opt(start_year, start_month, CYCLE_START_DAY)?,
        NaiveDate::from_ymd_opt(end_year, end_month, CYCLE_END_DAY)?,
    ))
}

/// Card-side payments: credits categorized as payments, ordered by post date
fn card_payments(card: &CardStatement) -> Vec<&CardTransaction> {
    let mut payments: Vec<&CardTransaction> =
        card.transactions.iter().filter(|t| t.is_payment()).collect();
    payments.sort_by_key(|t| t.post_date.unwrap_or(t.date));
    payments
}

fn is_regular_payment(t: &CardTransaction) -> bool {
    t.description.to_uppercase().contains("AUTOMATIC PAYMENT")
}

/// Charges in date order
fn card_charges(card: &CardStatement) -> Vec<&CardTransaction> {
    let mut charges: Vec<&CardTransaction> = card.charges().collect();
    charges.sort_by_key(|t| t.date);
    charges
}

fn percent_variance(payment: f64, charges_total: f64, variance: f64) -> f64 {
    if charges_total > 0.0 {
        variance.abs() / charges_total * 100.0
    } else if payment > 0.0 {
        100.0
    } else {
        0.0
    }
}

fn period_notes(percent: f64, charge_count: usize, variance: f64) -> Vec<String> {
    let mut notes = Vec::new();
    if percent > STATEMENT_TOLERANCE_PCT {
        notes.push(format!("Variance: {percent:.3}%"));
    }
    if charge_count == 0 {
        notes.push("No charges found in period".to_string());
    }
    if variance > LARGE_VARIANCE {
        notes.push("Payment significantly exceeds charges".to_string());
    }
    if variance < -LARGE_VARIANCE {
        notes.push("Charges significantly exceed payment".to_string());
    }
    notes
}

/// Map each regular checking card payment to the statement cycle it settles.
pub fn build_statement_reconciliation(
    checking: &CheckingStatement,
    card: &CardStatement,
) -> StatementReconciliation {
    let mut rec = StatementReconciliation {
        periods: Vec::new(),
        summary: ReconciliationSummary::default(),
        one_off_payments: OneOffPayments::default(),
        audit_trail: Vec::new(),
    };

    let all_payments = card_payments(card);
    let (regular, one_off): (Vec<&CardTransaction>, Vec<&CardTransaction>) =
        all_payments.iter().copied().partition(|t| is_regular_payment(t));

    let mut checking_payments: Vec<&Transaction> = checking
        .transactions
        .iter()
        .filter(|t| t.description.contains("CHASE CREDIT CRD") && t.amount < 0.0)
        .collect();
    checking_payments.sort_by_key(|t| t.date);
    checking_payments.retain(|p| {
        let settled_one_off = one_off.iter().any(|o| {
            let days = (o.post_date.unwrap_or(o.date) - p.date).num_days().abs();
            (o.amount - p.amount.abs()).abs() < 0.01 && days < ONE_OFF_WINDOW_DAYS
        });
        if settled_one_off {
            debug!(date = %p.date, amount = p.amount, "checking payment matches a one-off card payment");
        }
        !settled_one_off
    });

    let one_off_lines: Vec<PaymentLine> = one_off
        .iter()
        .map(|p| PaymentLine {
            date: p.post_date.unwrap_or(p.date),
            amount: p.amount,
            description: p.description.clone(),
        })
        .collect();

    rec.audit(
        "extract_payments",
        "Extracted regular card payments (excluding one-offs) from the checking account",
        json!({
            "all_card_payments": all_payments.len(),
            "regular_payments": regular.len(),
            "one_off_payments": one_off.len(),
            "regular_payment_amount": round_and_sum(regular.iter().map(|p| p.amount)),
            "one_off_payment_amount": round_and_sum(one_off.iter().map(|p| p.amount)),
            "checking_payment_count": checking_payments.len(),
            "checking_total_amount": round_and_sum(checking_payments.iter().map(|p| p.amount.abs())),
            "date_range": {
                "first": checking_payments.first().map(|p| p.date.to_string()),
                "last": checking_payments.last().map(|p| p.date.to_string()),
            },
            "one_off_details": &one_off_lines,
        }),
    );

    let charges = card_charges(card);
    rec.audit(
        "extract_charges",
        "Extracted card charges",
        json!({
            "charge_count": charges.len(),
            "total_amount": round_and_sum(charges.iter().map(|c| c.amount)),
            "date_range": {
                "first": charges.first().map(|c| c.date.to_string()),
                "last": charges.last().map(|c| c.date.to_string()),
            },
        }),
    );

    for (i, payment) in checking_payments.iter().enumerate() {
        let Some((start, end)) = statement_cycle_for_payment(payment.date) else {
            warn!(date = %payment.date, "no statement cycle for payment date");
            continue;
        };

        let in_period: Vec<ChargeLine> = charges
            .iter()
            .filter(|c| c.date >= start && c.date <= end)
            .map(|c| ChargeLine::from(*c))
            .collect();

        let payment_amount = round_to_cents(payment.amount.abs());
        let charges_total = round_and_sum(in_period.iter().map(|c| c.amount));
        let variance = round_to_cents(payment_amount - charges_total);
        let percent = percent_variance(payment_amount, charges_total, variance);
        let period_id = end.format("%Y-%m").to_string();

        rec.audit(
            "map_period",
            format!("Mapped payment {} to statement period", i + 1),
            json!({
                "period_id": &period_id,
                "payment_date": payment.date.to_string(),
                "payment_amount": payment_amount,
                "period_start": start.to_string(),
                "period_end": end.to_string(),
                "charges_count": in_period.len(),
                "charges_total": charges_total,
                "variance": variance,
                "percent_variance": format!("{percent:.2}%"),
            }),
        );

        rec.periods.push(StatementPeriod {
            period_id,
            start_date: start,
            end_date: end,
            payment_date: Some(payment.date),
            payment_amount,
            notes: period_notes(percent, in_period.len(), variance),
            charges: in_period,
            charges_total,
            variance,
            percent_variance: percent,
            is_reconciled: percent <= STATEMENT_TOLERANCE_PCT,
        });
    }

    let total_payments = round_and_sum(rec.periods.iter().map(|p| p.payment_amount));
    let total_charges = round_and_sum(rec.periods.iter().map(|p| p.charges_total));
    let reconciled = rec.periods.iter().filter(|p| p.is_reconciled).count();
    rec.summary = ReconciliationSummary {
        total_payments,
        total_charges,
        total_variance: round_to_cents(total_payments - total_charges),
        reconciled_periods: reconciled,
        unreconciled_periods: rec.periods.len() - reconciled,
    };

    let rate = reconciliation_rate(&rec);
    rec.audit(
        "calculate_summary",
        "Calculated overall reconciliation summary",
        json!({
            "total_periods": rec.periods.len(),
            "total_payments": total_payments,
            "total_charges": total_charges,
            "total_variance": rec.summary.total_variance,
            "reconciled_periods": reconciled,
            "unreconciled_periods": rec.summary.unreconciled_periods,
            "overall_reconciliation_rate": format!("{rate:.1}%"),
        }),
    );

    rec.one_off_payments = OneOffPayments {
        count: one_off_lines.len(),
        total_amount: round_and_sum(one_off_lines.iter().map(|p| p.amount)),
        payments: one_off_lines,
    };

    info!(
        periods = rec.periods.len(),
        reconciled,
        one_off = rec.one_off_payments.count,
        "built statement reconciliation"
    );
    rec
}

fn reconciliation_rate(rec: &StatementReconciliation) -> f64 {
    if rec.periods.is_empty() {
        0.0
    } else {
        rec.summary.reconciled_periods as f64 / rec.periods.len() as f64 * 100.0
    }
}

/// Plain-text overview of every statement period
pub fn format_statement_summary(rec: &StatementReconciliation) -> String {
    let s = &rec.summary;
    let mut out = String::from("CARD STATEMENT RECONCILIATION\n\n");
    out.push_str(&format!(
        "Master (checking payments): {}\n",
        format_usd(s.total_payments)
    ));
    out.push_str(&format!(
        "Subledger (card charges):   {}\n",
        format_usd(s.total_charges)
    ));
    out.push_str(&format!("Net variance: {}\n\n", format_usd(s.total_variance.abs())));

    out.push_str(&format!("Total periods: {}\n", rec.periods.len()));
    out.push_str(&format!(
        "Reconciled: {} ({:.1}%)\n",
        s.reconciled_periods,
        reconciliation_rate(rec)
    ));
    out.push_str(&format!("Variances: {}\n", s.unreconciled_periods));

    if s.unreconciled_periods > 0 {
        out.push_str("\nPeriods with variances:\n");
        for p in rec.periods.iter().filter(|p| !p.is_reconciled) {
            out.push_str(&format!(
                "  {}: {} ({:.1}%)\n",
                p.period_id,
                format_usd(p.variance.abs()),
                p.percent_variance
            ));
        }
    }

    if rec.one_off_payments.count > 0 {
        out.push_str(&format!(
            "\nOne-off payments: {} totalling {}\n",
            rec.one_off_payments.count,
            format_usd(rec.one_off_payments.total_amount)
        ));
    }
    out
}

fn push_charge_list(out: &mut String, charges: &[ChargeLine]) {
    for (i, c) in charges.iter().take(MAX_LISTED_CHARGES).enumerate() {
        out.push_str(&format!(
            "  {}. {} | {} | {}\n",
            i + 1,
            c.date,
            format_usd(c.amount),
            c.description
        ));
    }
    if charges.len() > MAX_LISTED_CHARGES {
        out.push_str(&format!(
            "  ... and {} more\n",
            charges.len() - MAX_LISTED_CHARGES
        ));
    }
}

/// Detailed text for one statement period
pub fn analyze_period(period: &StatementPeriod) -> String {
    let mut out = format!("PERIOD {} ANALYSIS\n\n", period.period_id);

    out.push_str("Payment (master):\n");
    out.push_str(&format!(
        "  Date: {}\n",
        period
            .payment_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    ));
    out.push_str(&format!("  Amount: {}\n\n", format_usd(period.payment_amount)));

    out.push_str("Charges (subledger):\n");
    out.push_str(&format!(
        "  Period: {} to {}\n",
        period.start_date, period.end_date
    ));
    out.push_str(&format!("  Total: {}\n", format_usd(period.charges_total)));
    out.push_str(&format!("  Count: {} transactions\n\n", period.charges.len()));

    let direction = if period.variance > 0.0 {
        "Payment > Charges"
    } else {
        "Charges > Payment"
    };
    out.push_str("Reconciliation:\n");
    out.push_str(&format!(
        "  Variance: {} ({})\n",
        format_usd(period.variance.abs()),
        direction
    ));
    out.push_str(&format!("  Percent: {:.2}%\n", period.percent_variance));
    out.push_str(&format!(
        "  Status: {}\n",
        if period.is_reconciled { "RECONCILED" } else { "VARIANCE" }
    ));

    if !period.notes.is_empty() {
        out.push_str("\nNotes:\n");
        for note in &period.notes {
            out.push_str(&format!("  - {note}\n"));
        }
    }

    if !period.charges.is_empty() {
        out.push_str("\nCharges:\n");
        push_charge_list(&mut out, &period.charges);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeSummary {
    pub total_amount: f64,
    pub transaction_count: usize,
    pub transactions: Vec<ChargeLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReconciliation {
    /// `YYYY-MM` of the payment
    pub month: String,
    pub checking_payment: Option<PaymentLine>,
    pub card_charges: ChargeSummary,
    pub variance: f64,
    pub percent_variance: f64,
    pub is_reconciled: bool,
}

/// Payment-to-payment windows: each `Credit Card Autopay` debit covers charges since the
/// previous one (35 days back for the first).
pub fn analyze_monthly_reconciliation(
    checking: &CheckingStatement,
    card: &CardStatement,
) -> Vec<MonthlyReconciliation> {
    let mut payments: Vec<&Transaction> = checking
        .transactions
        .iter()
        .filter(|t| t.category.contains(tally_core::checking_rules::CARD_AUTOPAY) && t.amount < 0.0)
        .collect();
    payments.sort_by_key(|t| t.date);
    let charges = card_charges(card);

    debug!(
        payments = payments.len(),
        charges = charges.len(),
        "monthly reconciliation setup"
    );

    let mut out: Vec<MonthlyReconciliation> = payments
        .iter()
        .enumerate()
        .map(|(i, payment)| {
            let start = if i == 0 {
                payment.date - Duration::days(FIRST_WINDOW_DAYS)
            } else {
                payments[i - 1].date
            };
            let end = payment.date;

            let lines: Vec<ChargeLine> = charges
                .iter()
                .filter(|c| c.date >= start && c.date <= end)
                .map(|c| ChargeLine::from(*c))
                .collect();

            let amount = round_to_cents(payment.amount.abs());
            let total = round_and_sum(lines.iter().map(|c| c.amount));
            let variance = round_to_cents(amount - total);
            let denominator = amount.max(total);
            let percent = if denominator > 0.0 {
                variance.abs() / denominator * 100.0
            } else {
                0.0
            };

            MonthlyReconciliation {
                month: payment.date.format("%Y-%m").to_string(),
                checking_payment: Some(PaymentLine {
                    date: payment.date,
                    amount,
                    description: payment.description.clone(),
                }),
                card_charges: ChargeSummary {
                    total_amount: total,
                    transaction_count: lines.len(),
                    transactions: lines,
                },
                variance,
                percent_variance: percent,
                is_reconciled: percent <= MONTHLY_TOLERANCE_PCT,
            }
        })
        .collect();

    out.sort_by(|a, b| a.month.cmp(&b.month));
    out
}

pub fn format_monthly_analysis(m: &MonthlyReconciliation) -> String {
    let mut out = format!("MONTH: {}\n\n", m.month);

    if let Some(p) = &m.checking_payment {
        out.push_str("Checking payment:\n");
        out.push_str(&format!("  Date: {}\n", p.date));
        out.push_str(&format!("  Amount: {}\n", format_usd(p.amount)));
        out.push_str(&format!("  Description: {}\n\n", p.description));
    }

    out.push_str("Card charges:\n");
    out.push_str(&format!(
        "  Total amount: {}\n",
        format_usd(m.card_charges.total_amount)
    ));
    out.push_str(&format!(
        "  Transaction count: {}\n\n",
        m.card_charges.transaction_count
    ));
    if !m.card_charges.transactions.is_empty() {
        push_charge_list(&mut out, &m.card_charges.transactions);
        out.push('\n');
    }

    out.push_str("Reconciliation:\n");
    out.push_str(&format!("  Variance: {}\n", format_usd(m.variance.abs())));
    out.push_str(&format!(
        "  Status: {}\n",
        if m.is_reconciled { "RECONCILED" } else { "VARIANCE DETECTED" }
    ));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentMatch<'a> {
    pub card_payment: &'a CardTransaction,
    pub checking_payment: &'a Transaction,
    /// Card amount minus checking amount
    pub variance: f64,
}

/// Pair each card-side payment with the first checking payment within 3 days and 1%.
pub fn find_matching_payments<'a>(
    card: &'a CardStatement,
    checking_payments: &'a [Transaction],
) -> Vec<PaymentMatch<'a>> {
    card.transactions
        .iter()
        .filter(|t| t.is_payment())
        .filter_map(|cc| {
            let found = checking_payments.iter().find(|chk| {
                let days = (cc.date - chk.date).num_days().abs();
                let chk_amount = chk.amount.abs();
                let denominator = cc.amount.max(chk_amount);
                let pct = if denominator > 0.0 {
                    (cc.amount - chk_amount).abs() / denominator
                } else {
                    0.0
                };
                days <= 3 && pct < 0.01
            })?;
            Some(PaymentMatch {
                card_payment: cc,
                checking_payment: found,
                variance: round_to_cents(cc.amount - found.amount.abs()),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardValidation {
    pub is_reconciled: bool,
    pub variance: f64,
    pub card_total: f64,
    pub expected_total: f64,
    pub percent_variance: f64,
}

/// Net card activity against an expected payment total; `tolerance` is a fraction (0.01 = 1%).
pub fn validate_card_reconciliation(
    card: &CardStatement,
    expected_total: f64,
    tolerance: f64,
) -> CardValidation {
    let card_total = card.summary.net_amount;
    let variance = card_total - expected_total;
    let denominator = card_total.abs().max(expected_total.abs());
    let fraction = if denominator > 0.0 { variance.abs() / denominator } else { 0.0 };

    CardValidation {
        is_reconciled: fraction <= tolerance,
        variance: round_to_cents(variance),
        card_total,
        expected_total,
        percent_variance: fraction * 100.0,
    }
}
