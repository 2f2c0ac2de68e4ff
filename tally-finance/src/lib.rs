//! tally-finance: golden-record totals, consultant and card reconciliation, data validation
//! and the cross-source audit

pub mod audit;
pub mod card_reconciliation;
pub mod consultants;
pub mod cutoff;
pub mod totals;
pub mod validation;

pub use audit::{audit_data_sources, format_audit_summary, DataAudit, Discrepancy, Severity};
pub use card_reconciliation::{
    analyze_monthly_reconciliation, analyze_period, build_statement_reconciliation,
    find_matching_payments, format_monthly_analysis, format_statement_summary,
    validate_card_reconciliation, CardValidation, MonthlyReconciliation, PaymentMatch,
    StatementPeriod, StatementReconciliation,
};
pub use consultants::{
    format_reconciliation_summary, reconcile_consultants, ConsultantReconciliation,
    ReconcileSource, ReconciledConsultant,
};
pub use cutoff::{
    format_cutoff_summary, reconcile_card_subledger, variance_analysis, Confidence,
    CutoffReconciliation, VarianceAnalysis, DEFAULT_CUTOFF_DAYS, DEFAULT_TOLERANCE,
};
pub use totals::{
    calculate_financial_totals, ConsultantBreakdown, ExpenseCategory, ExpenseSource,
    FinancialTotals,
};
pub use validation::{format_validation_report, validate_checking, ValidationReport};
