use chrono::NaiveDate;
use std::path::PathBuf;
use tally_core::{CheckingRules, MajorCategory};
use tally_finance::{
    analyze_monthly_reconciliation, analyze_period, audit_data_sources,
    build_statement_reconciliation, calculate_financial_totals, find_matching_payments,
    format_statement_summary, reconcile_card_subledger, reconcile_consultants,
    validate_card_reconciliation, validate_checking, variance_analysis, Confidence,
    ReconcileSource, DEFAULT_CUTOFF_DAYS, DEFAULT_TOLERANCE,
};
use tally_ingest::{
    parse_chase_checking_csv, parse_chase_credit_csv, parse_consultant_subledger, CardStatement,
    CheckingStatement,
};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(path).unwrap()
}

fn load() -> (CheckingStatement, CardStatement) {
    let checking =
        parse_chase_checking_csv(&fixture("chase_checking.csv"), &CheckingRules::default())
            .unwrap();
    let card = parse_chase_credit_csv(&fixture("chase_credit_card.csv")).unwrap();
    (checking, card)
}

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, day).unwrap()
}

#[test]
fn test_golden_record_from_fixtures() {
    let (checking, card) = load();
    let t = calculate_financial_totals(&checking, Some(&card));

    assert_eq!(t.business_revenue, 150000.00);
    assert_eq!(t.consultant_expenses, 32100.00);
    assert_eq!(t.credit_card_operating_expenses, 17090.00);
    assert_eq!(t.credit_card_travel_expenses, 235.99);
    assert_eq!(t.credit_card_meals_expenses, 84.50);
    assert_eq!(t.credit_card_utilities_expenses, 0.0);
    assert_eq!(t.credit_card_other_expenses, 45.51);
    assert_eq!(t.credit_card_total_expenses, 17456.00);
    assert_eq!(t.auto_loan_expenses, 1200.00);
    assert_eq!(t.bank_fees_expenses, 30.00);
    assert_eq!(t.total_business_expenses, 50786.00);
    assert_eq!(t.net_income, 99214.00);
    assert_eq!(t.credit_card_payments, 17956.50);
    assert_eq!(t.credit_card_reconciliation_variance, 500.50);
    assert_eq!(t.owner_capital_contributions, 40000.00);
    assert_eq!(t.other_credits, 250.37);
    assert_eq!(t.current_cash_balance, 138864.87);
    assert_eq!(t.unaccounted_credits, -599.50);
    assert_eq!(t.total_owner_equity, 138864.87);
    assert!(t.balances());
}

#[test]
fn test_consultant_breakdown_order() {
    let (checking, card) = load();
    let t = calculate_financial_totals(&checking, Some(&card));
    let names: Vec<(&str, f64)> = t
        .consultant_breakdown
        .iter()
        .map(|c| (c.name.as_str(), c.amount))
        .collect();
    assert_eq!(
        names,
        vec![
            ("Carmen", 15200.0),
            ("Petrana", 6400.0),
            ("Pepi", 5000.0),
            ("Swan", 3000.0),
            ("Unassigned", 2500.0),
        ]
    );
}

#[test]
fn test_card_breakdown_sums_to_total() {
    let (checking, card) = load();
    let t = calculate_financial_totals(&checking, Some(&card));
    let sum: f64 = t.credit_card_category_breakdown.iter().map(|c| c.amount).sum();
    assert!((sum - t.credit_card_total_expenses).abs() <= 0.01);

    let first = &t.credit_card_category_breakdown[0];
    assert_eq!(first.name, "Office Rent");
    assert_eq!(first.amount, 16800.00);
    assert_eq!(first.major_category, MajorCategory::OperatingExpenses);
    assert!(t
        .credit_card_category_breakdown
        .iter()
        .all(|c| c.name != "Test Transaction" && c.name != "Credit Card Payment"));
}

#[test]
fn test_totals_are_deterministic() {
    let (checking, card) = load();
    let a = calculate_financial_totals(&checking, Some(&card));
    let b = calculate_financial_totals(&checking, Some(&card));
    assert_eq!(a, b);
}

#[test]
fn test_consultant_reconciliation_partitions() {
    let (checking, card) = load();
    let ledger = parse_consultant_subledger(&fixture("consultants.csv")).unwrap();
    let t = calculate_financial_totals(&checking, Some(&card));
    let r = reconcile_consultants(
        &checking,
        t.consultant_expenses,
        &t.consultant_breakdown,
        Some(&ledger),
    );

    let matched: Vec<&str> = r.matched.iter().map(|c| c.name.as_str()).collect();
    let chase_only: Vec<&str> = r.chase_only.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(matched, vec!["Carmen", "Petrana", "Pepi"]);
    assert_eq!(chase_only, vec!["Swan", "Unassigned"]);

    // every breakdown name in exactly one side
    for b in &t.consultant_breakdown {
        let hits = matched.iter().filter(|n| **n == b.name).count()
            + chase_only.iter().filter(|n| **n == b.name).count();
        assert_eq!(hits, 1, "{} not partitioned", b.name);
    }
    assert!((r.total_matched + r.total_unmatched - t.consultant_expenses).abs() < 0.01);

    let roster_only: Vec<&str> = r.subledger_only.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(roster_only, vec!["Ivana Kmecova", "Marianna Horvath"]);
    assert_eq!(r.total_subledger_only, 6000.0);
    assert!(r.subledger_only.iter().all(|c| c.source == ReconcileSource::Subledger));

    let carmen = &r.matched[0];
    assert_eq!(carmen.payments, 2);
    assert_eq!(carmen.contract_type.as_deref(), Some("Monthly Retainer"));
}

#[test]
fn test_statement_periods_reconcile() {
    let (checking, card) = load();
    let rec = build_statement_reconciliation(&checking, &card);

    let ids: Vec<&str> = rec.periods.iter().map(|p| p.period_id.as_str()).collect();
    assert_eq!(ids, vec!["2025-02", "2025-03"]);

    let feb = &rec.periods[0];
    assert_eq!(feb.start_date, d(1, 26));
    assert_eq!(feb.end_date, d(2, 25));
    assert_eq!(feb.payment_date, Some(d(3, 19)));
    assert_eq!(feb.charges.len(), 5);
    assert_eq!(feb.charges_total, 8702.00);
    assert!(feb.is_reconciled);
    assert!(feb.notes.is_empty());

    let mar = &rec.periods[1];
    assert_eq!(mar.charges_total, 8754.50);
    assert!(mar.is_reconciled);

    assert_eq!(rec.summary.reconciled_periods, 2);
    assert_eq!(rec.summary.total_variance, 0.0);

    // the $500 mobile payment is a one-off and its checking debit is not a period
    assert_eq!(rec.one_off_payments.count, 1);
    assert_eq!(rec.one_off_payments.total_amount, 500.00);

    let steps: Vec<&str> = rec.audit_trail.iter().map(|s| s.step.as_str()).collect();
    assert_eq!(
        steps,
        vec![
            "extract_payments",
            "extract_charges",
            "map_period",
            "map_period",
            "calculate_summary"
        ]
    );
    assert_eq!(rec.audit_trail[0].data["checking_payment_count"], 2);
    assert_eq!(rec.audit_trail[4].data["overall_reconciliation_rate"], "100.0%");

    let summary = format_statement_summary(&rec);
    assert!(summary.contains("Reconciled: 2 (100.0%)"));
    let detail = analyze_period(feb);
    assert!(detail.starts_with("PERIOD 2025-02 ANALYSIS"));
    assert!(detail.contains("Status: RECONCILED"));
}

#[test]
fn test_monthly_windows() {
    let (checking, card) = load();
    let months = analyze_monthly_reconciliation(&checking, &card);
    assert_eq!(months.len(), 3);
    assert_eq!(months[0].month, "2025-03");

    // first window reaches 35 days back from 03/08
    assert_eq!(months[0].card_charges.transaction_count, 6);
    assert_eq!(months[0].card_charges.total_amount, 8822.00);
    assert!(!months[0].is_reconciled);

    assert_eq!(months[2].month, "2025-04");
    assert_eq!(months[2].card_charges.total_amount, 84.50);
}

#[test]
fn test_payment_matching_and_validation() {
    let (checking, card) = load();
    let autopay: Vec<_> = checking
        .transactions
        .iter()
        .filter(|t| t.category == "Credit Card Autopay")
        .cloned()
        .collect();
    let matches = find_matching_payments(&card, &autopay);
    assert_eq!(matches.len(), 3);
    assert!(matches.iter().all(|m| m.variance == 0.0));

    let v = validate_card_reconciliation(&card, card.summary.net_amount, 0.01);
    assert!(v.is_reconciled);
    assert_eq!(v.variance, 0.0);
}

#[test]
fn test_fixture_validates() {
    let raw = fixture("chase_checking.csv");
    let checking = parse_chase_checking_csv(&raw, &CheckingRules::default()).unwrap();
    let report = validate_checking(&checking, &raw);
    assert!(report.is_valid());
    assert_eq!(report.current_balance.expected, Some(138864.87));
    assert_eq!(report.totals.balance_verification, 88864.87);
    assert_eq!(report.category_validation.uncategorized, 0);
}

#[test]
fn test_fixture_audit() {
    let (checking, card) = load();
    let audit = audit_data_sources(&checking, &card);

    assert_eq!(audit.checking.card_payments.total_amount, 17956.50);
    assert_eq!(audit.checking.card_payments.transaction_count, 3);
    assert_eq!(audit.checking.other_expenses.total_amount, 33330.00);
    assert_eq!(audit.checking.other_expenses.transaction_count, 11);
    assert_eq!(audit.card.charges.total_amount, 17456.50);
    assert_eq!(audit.card.charges.transaction_count, 9);
    assert_eq!(audit.card.payments.total_amount, 18006.50);
    assert!(audit.summary.discrepancies.is_empty());
    assert!(audit.summary.date_range_mismatch);

    // the April payment settles everything on the card
    assert_eq!(audit.timing.last_payment_date, d(4, 18));
    assert_eq!(audit.unpaid_charges.transaction_count, 0);
    assert_eq!(audit.timing.average_payment_cycle, 21);

    let months: Vec<(&str, f64)> = audit
        .period_mismatches
        .iter()
        .map(|m| (m.month.as_str(), m.variance))
        .collect();
    assert_eq!(
        months,
        vec![
            ("2025-01", -8400.00),
            ("2025-02", -422.00),
            ("2025-03", 567.50),
            ("2025-04", 8754.50),
        ]
    );
}

#[test]
fn test_fixture_cutoff_reconciliation() {
    let (checking, card) = load();
    let rec = reconcile_card_subledger(&checking, &card, DEFAULT_TOLERANCE, DEFAULT_CUTOFF_DAYS);

    assert_eq!(rec.period_cutoff.cutoff_date, d(5, 18));
    assert_eq!(rec.period_cutoff.excluded.transaction_count, 0);
    assert_eq!(rec.totals.checking_payment_total, 17956.50);
    assert_eq!(rec.totals.card_payment_total, 18006.50);
    assert_eq!(rec.totals.payment_variance, -50.00);
    assert_eq!(rec.totals.card_charge_total, 17456.50);
    assert_eq!(rec.totals.outstanding_balance, -550.00);
    assert!(rec.validation.total_variance_within_tolerance);
    assert!(rec.validation.all_payments_matched);
    assert!(!rec.validation.timing_variances_acceptable);
    assert!(rec.is_reconciled);

    // January's rent falls before every payment window
    assert_eq!(rec.unmatched_charges.len(), 1);
    assert_eq!(rec.unmatched_charges[0].date, d(1, 28));

    let confidences: Vec<Confidence> = rec.matches.iter().map(|m| m.confidence).collect();
    assert_eq!(
        confidences,
        vec![Confidence::Low, Confidence::Medium, Confidence::Low]
    );
    assert_eq!(rec.matches[1].charge_total, 9010.49);

    let analysis = variance_analysis(&rec);
    assert_eq!(analysis.statistics.medium_confidence_matches, 1);
    assert_eq!(analysis.statistics.max_variance, 8670.00);
}
