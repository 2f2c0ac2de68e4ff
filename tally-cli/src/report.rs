//! Plain-text views for the report commands. `--json` bypasses these entirely.

use tally_core::{format_usd, CategoryTriple};
use tally_finance::{FinancialTotals, PaymentMatch, VarianceAnalysis};
use tally_ingest::{
    match_vendor_to_consultant, BillComBill, CardStatement, OutstandingInvoice, RosterSummary,
};

const TOP_CATEGORIES: usize = 10;

fn line(out: &mut String, label: &str, amount: f64) {
    out.push_str(&format!("  {label:<32} {:>14}\n", format_usd(amount)));
}

pub fn render_totals(t: &FinancialTotals) -> String {
    let mut out = String::from("FINANCIAL TOTALS\n\n");

    out.push_str("Revenue\n");
    line(&mut out, "Business revenue", t.business_revenue);

    out.push_str("\nExpenses\n");
    line(&mut out, "Consultants", t.consultant_expenses);
    for c in &t.consultant_breakdown {
        line(&mut out, &format!("  {}", c.name), c.amount);
    }
    line(&mut out, "Card: operating", t.credit_card_operating_expenses);
    line(&mut out, "Card: travel", t.credit_card_travel_expenses);
    line(&mut out, "Card: meals", t.credit_card_meals_expenses);
    line(&mut out, "Card: utilities", t.credit_card_utilities_expenses);
    line(&mut out, "Card: other", t.credit_card_other_expenses);
    line(&mut out, "Card total", t.credit_card_total_expenses);
    line(&mut out, "Auto loan", t.auto_loan_expenses);
    line(&mut out, "Bank fees", t.bank_fees_expenses);
    line(&mut out, "Total business expenses", t.total_business_expenses);

    out.push('\n');
    line(&mut out, "Net income", t.net_income);

    out.push_str("\nCard payments (reconciliation only)\n");
    line(&mut out, "Paid from checking", t.credit_card_payments);
    line(&mut out, "Payments minus card expenses", t.credit_card_reconciliation_variance);

    out.push_str("\nEquity\n");
    line(&mut out, "Initial capital", t.initial_capital);
    line(&mut out, "Owner contributions", t.owner_capital_contributions);
    line(&mut out, "Other credits", t.other_credits);
    line(&mut out, "Unaccounted", t.unaccounted_credits);
    line(&mut out, "Total owner equity", t.total_owner_equity);
    line(&mut out, "Current cash balance", t.current_cash_balance);

    out.push_str(&format!(
        "\nBalance sheet: {}\n",
        if t.balances() { "balanced" } else { "OUT OF BALANCE" }
    ));
    out
}

pub fn render_categorized(
    description: &str,
    amount: Option<f64>,
    c: &CategoryTriple,
    vendor: &str,
) -> String {
    let mut out = format!("{description}\n");
    if let Some(a) = amount {
        out.push_str(&format!("  amount:   {}\n", format_usd(a)));
    }
    out.push_str(&format!("  major:    {}\n", c.major_category));
    out.push_str(&format!("  category: {}\n", c.full_label()));
    out.push_str(&format!("  vendor:   {vendor}\n"));
    out
}

pub fn render_card(card: &CardStatement, matches: &[PaymentMatch<'_>]) -> String {
    let s = &card.summary;
    let mut out = String::from("CREDIT CARD\n\n");
    if let (Some(first), Some(last)) = (s.date_range.start, s.date_range.end) {
        out.push_str(&format!("Period: {first} to {last}\n"));
    }
    out.push_str(&format!("Transactions: {}\n", s.transaction_count));
    line(&mut out, "Charges", s.total_debits);
    line(&mut out, "Payments and credits", s.total_credits);
    line(&mut out, "Net", s.net_amount);

    out.push_str("\nTop categories\n");
    for c in card.top_expense_categories(TOP_CATEGORIES) {
        out.push_str(&format!(
            "  {:<40} {:>14} {:>6.1}%\n",
            c.category,
            format_usd(c.amount),
            c.percentage
        ));
    }

    out.push_str("\nCharges by month\n");
    for (month, amount) in card.monthly_charges() {
        line(&mut out, &month, amount);
    }

    if !matches.is_empty() {
        out.push_str("\nPayments matched to checking\n");
        for m in matches {
            out.push_str(&format!(
                "  {} {:>12}  <->  {} {:>12}  variance {}\n",
                m.card_payment.date,
                format_usd(m.card_payment.amount),
                m.checking_payment.date,
                format_usd(m.checking_payment.amount.abs()),
                format_usd(m.variance)
            ));
        }
    }
    out
}

pub fn render_roster(s: &RosterSummary, outstanding: &[OutstandingInvoice]) -> String {
    let mut out = String::from("CONSULTANT ROSTER\n\n");
    out.push_str(&format!(
        "Consultants: {} ({} active, {} ended)\n",
        s.total_consultants, s.active_consultants, s.ended_consultants
    ));
    line(&mut out, "Total paid", s.total_paid);
    line(&mut out, "Outstanding", s.total_outstanding);

    for (title, map) in [
        ("By payment method", &s.by_payment_method),
        ("By status", &s.by_status),
        ("By country", &s.by_country),
        ("By role", &s.by_role),
    ] {
        out.push_str(&format!("\n{title}\n"));
        for (k, v) in map {
            line(&mut out, k, *v);
        }
    }

    if !outstanding.is_empty() {
        out.push_str("\nOutstanding invoices\n");
        for inv in outstanding {
            line(&mut out, &inv.name, inv.amount);
        }
    }
    out
}

pub fn render_variances(a: &VarianceAnalysis) -> String {
    let mut out = String::from("\nPayment windows\n");
    for v in &a.variances {
        out.push_str(&format!(
            "  {} {:>12}  charges {:>12}  variance {:>12}  {:?}\n",
            v.payment_date,
            format_usd(v.payment_amount),
            format_usd(v.charge_total),
            format_usd(v.variance),
            v.confidence
        ));
    }
    let s = &a.statistics;
    out.push_str(&format!(
        "Matches: {} high, {} medium, {} low\n",
        s.high_confidence_matches, s.medium_confidence_matches, s.low_confidence_matches
    ));
    line(&mut out, "Largest variance", s.max_variance);
    out
}

pub fn render_bills(bills: &[&BillComBill], total: f64) -> String {
    let mut out = String::from("UNPAID BILLS\n\n");
    for b in bills {
        let consultant = match_vendor_to_consultant(&b.vendor)
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {:<14} {:<28} due {:<10} {:>14}\n",
            b.invoice_no,
            format!("{}{consultant}", b.vendor),
            b.due_date,
            format_usd(b.balance_due)
        ));
    }
    out.push('\n');
    line(&mut out, "Total outstanding", total);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tally_core::{categorize_credit_card_transaction, extract_vendor, CheckingRules};
    use tally_finance::calculate_financial_totals;
    use tally_finance::{reconcile_card_subledger, variance_analysis};
    use tally_ingest::{
        parse_billcom_data, parse_chase_checking_csv, parse_chase_credit_csv,
        parse_consultant_subledger,
    };

    fn fixture(name: &str) -> String {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .join("fixtures")
            .join(name);
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_render_totals() {
        let checking =
            parse_chase_checking_csv(&fixture("chase_checking.csv"), &CheckingRules::default())
                .unwrap();
        let card = parse_chase_credit_csv(&fixture("chase_credit_card.csv")).unwrap();
        let text = render_totals(&calculate_financial_totals(&checking, Some(&card)));
        assert!(text.contains("Business revenue"));
        assert!(text.contains("$150,000.00"));
        assert!(text.contains("$99,214.00"));
        assert!(text.ends_with("Balance sheet: balanced\n"));
    }

    #[test]
    fn test_render_categorized() {
        let desc = "UBER   *TRIP HELP.UBER.COM";
        let c = categorize_credit_card_transaction(desc, Some(23.5));
        let text = render_categorized(desc, Some(23.5), &c, &extract_vendor(desc));
        assert!(text.contains("amount:   $23.50"));
        assert!(text.contains("category: Travel"));
    }

    #[test]
    fn test_render_card() {
        let card = parse_chase_credit_csv(&fixture("chase_credit_card.csv")).unwrap();
        let text = render_card(&card, &[]);
        assert!(text.starts_with("CREDIT CARD\n"));
        assert!(text.contains("Office Rent"));
        assert!(text.contains("2025-02"));
        assert!(!text.contains("Payments matched"));
    }

    #[test]
    fn test_render_roster() {
        let ledger = parse_consultant_subledger(&fixture("consultants.csv")).unwrap();
        let text = render_roster(&ledger.summary().unwrap(), &ledger.outstanding_invoices().unwrap());
        assert!(text.contains("Consultants: 6"));
        assert!(text.contains("Outstanding invoices"));
        assert!(text.contains("$2,500.00"));
    }

    #[test]
    fn test_render_variances() {
        let checking =
            parse_chase_checking_csv(&fixture("chase_checking.csv"), &CheckingRules::default())
                .unwrap();
        let card = parse_chase_credit_csv(&fixture("chase_credit_card.csv")).unwrap();
        let rec = reconcile_card_subledger(&checking, &card, 0.01, 30);
        let text = render_variances(&variance_analysis(&rec));
        assert!(text.contains("Matches: 0 high, 1 medium, 2 low"));
        assert!(text.contains("$8,670.00"));
    }

    #[test]
    fn test_render_bills() {
        let data = parse_billcom_data(
            &fixture("bill-com-vendors.csv"),
            &fixture("bill-com-bills.csv"),
        )
        .unwrap();
        let text = render_bills(&data.all_unpaid_bills(), 14000.0);
        assert!(text.contains("TEIZ-2025-04"));
        assert!(text.contains("Inversiones Teiz SL (Carmen)"));
        assert!(text.contains("Trusted Ltd (Petrana)"));
        assert!(!text.contains("TR-117"));
        assert!(text.contains("$14,000.00"));
    }
}
