//! Consultant reconciliation: bank-side consultant spend against the roster's paid totals.
//!
//! Names on the bank side come from category labels (`Carmen`, `Swan`, `Unassigned`), names
//! on the roster side are full legal names and company names, so the join is a word-overlap
//! fuzzy match over the roster's alias index.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tally_core::{consultant_name_from_label, percent_of};
use tally_ingest::{CheckingStatement, Consultant, ConsultantSubledger};
use tracing::debug;

use crate::totals::ConsultantBreakdown;

const MIN_WORD_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileSource {
    Chase,
    Subledger,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledConsultant {
    pub name: String,
    /// Bank-side total
    pub amount: f64,
    /// Roster `TotalPaid`
    pub subledger_amount: f64,
    pub percentage: f64,
    pub payments: usize,
    pub country: Option<String>,
    pub role: Option<String>,
    pub specialization: Option<String>,
    pub hourly_rate: Option<f64>,
    pub contract_type: Option<String>,
    pub status: Option<String>,
    pub payment_method: Option<String>,
    pub source: ReconcileSource,
    pub matched: bool,
}

impl ReconciledConsultant {
    fn bank_only(name: &str, amount: f64, total: f64, payments: usize) -> Self {
        ReconciledConsultant {
            name: name.to_string(),
            amount,
            subledger_amount: 0.0,
            percentage: percent_of(amount, total),
            payments,
            country: None,
            role: None,
            specialization: None,
            hourly_rate: None,
            contract_type: None,
            status: None,
            payment_method: None,
            source: ReconcileSource::Chase,
            matched: false,
        }
    }

    fn with_roster(mut self, c: &Consultant) -> Self {
        self.subledger_amount = c.total_paid;
        self.country = Some(c.country.clone());
        self.role = Some(c.role.clone());
        self.specialization = Some(c.specialization.clone());
        self.hourly_rate = Some(c.hourly_rate);
        self.contract_type = Some(c.contract_type.clone());
        self.status = Some(c.status.clone());
        self.payment_method = Some(c.payment_method.clone());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultantReconciliation {
    /// Bank-side consultant total
    pub total: f64,
    pub matched: Vec<ReconciledConsultant>,
    pub chase_only: Vec<ReconciledConsultant>,
    pub subledger_only: Vec<ReconciledConsultant>,
    pub total_matched: f64,
    pub total_unmatched: f64,
    pub total_subledger_only: f64,
}

fn split_words(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
}

/// Word-overlap test between a bank-side name and a roster alias key
fn names_overlap(name: &str, key: &str) -> bool {
    split_words(name).any(|w| key.contains(w)) || split_words(key).any(|w| name.contains(w))
}

fn find_in_roster<'a>(ledger: &'a ConsultantSubledger, name: &str) -> Option<&'a Consultant> {
    let simple = name.to_lowercase().replace(['(', ')'], "");
    let simple = simple.trim();
    ledger
        .aliases()
        .find(|(key, _)| names_overlap(simple, key))
        .map(|(key, c)| {
            debug!(name, alias = key, consultant = %c.name, "matched consultant");
            c
        })
}

/// Number of checking rows labelled as a consultant payment to `name`
fn payment_count(checking: &CheckingStatement, name: &str) -> usize {
    checking
        .transactions
        .iter()
        .filter(|t| {
            t.category.starts_with("Consultant - ") && consultant_name_from_label(&t.category) == name
        })
        .count()
}

/// Reconcile bank-side consultant spend with the roster.
///
/// Every breakdown entry lands in exactly one of `matched` / `chase_only`. Roster consultants
/// that no entry matched and that have a positive `total_paid` are reported once each in
/// `subledger_only`.
pub fn reconcile_consultants(
    checking: &CheckingStatement,
    consultant_total: f64,
    breakdown: &[ConsultantBreakdown],
    subledger: Option<&ConsultantSubledger>,
) -> ConsultantReconciliation {
    let mut result = ConsultantReconciliation {
        total: consultant_total,
        matched: Vec::new(),
        chase_only: Vec::new(),
        subledger_only: Vec::new(),
        total_matched: 0.0,
        total_unmatched: 0.0,
        total_subledger_only: 0.0,
    };

    let Some(ledger) = subledger else {
        result.chase_only = breakdown
            .iter()
            .map(|b| {
                ReconciledConsultant::bank_only(
                    &b.name,
                    b.amount,
                    consultant_total,
                    payment_count(checking, &b.name),
                )
            })
            .collect();
        result.total_unmatched = consultant_total;
        return result;
    };

    // roster rows already claimed, by (id, name)
    let mut claimed: HashSet<(&str, &str)> = HashSet::new();

    for b in breakdown {
        let entry = ReconciledConsultant::bank_only(
            &b.name,
            b.amount,
            consultant_total,
            payment_count(checking, &b.name),
        );
        match find_in_roster(ledger, &b.name) {
            Some(c) => {
                claimed.insert((c.id.as_str(), c.name.as_str()));
                let mut entry = entry.with_roster(c);
                entry.source = ReconcileSource::Both;
                entry.matched = true;
                result.total_matched += b.amount;
                result.matched.push(entry);
            }
            None => {
                result.total_unmatched += b.amount;
                result.chase_only.push(entry);
            }
        }
    }

    for c in &ledger.consultants {
        if claimed.contains(&(c.id.as_str(), c.name.as_str())) || c.total_paid <= 0.0 {
            continue;
        }
        let mut entry = ReconciledConsultant::bank_only(&c.name, 0.0, consultant_total, 0).with_roster(c);
        entry.source = ReconcileSource::Subledger;
        result.total_subledger_only += c.total_paid;
        result.subledger_only.push(entry);
    }

    result
}

/// Plain-text summary of a reconciliation
pub fn format_reconciliation_summary(r: &ConsultantReconciliation) -> String {
    let mut lines = vec![
        format!("Total bank consultant spending: ${:.2}", r.total),
        String::new(),
    ];

    if !r.matched.is_empty() {
        lines.push(format!(
            "Matched contractors ({}): ${:.2}",
            r.matched.len(),
            r.total_matched
        ));
        lines.push("  tracked in both the bank export and the roster".to_string());
    }
    if !r.chase_only.is_empty() {
        lines.push(format!(
            "Other payments ({}): ${:.2}",
            r.chase_only.len(),
            r.total_unmatched
        ));
        lines.push("  bank payments not yet in the roster".to_string());
    }
    if !r.subledger_only.is_empty() {
        lines.push(format!(
            "Roster-only contractors ({}): ${:.2}",
            r.subledger_only.len(),
            r.total_subledger_only
        ));
        lines.push("  paid through other channels".to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::CheckingRules;
    use tally_ingest::{parse_chase_checking_csv, parse_consultant_subledger};

    const CHECKING: &str = r#"Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #
DEBIT,05/12/2024,"WIRE TRANSFER TO SWAN SOFTWEB SOLUTIONS",-1000.00,WIRE_OUTGOING,5000.00,,
DEBIT,05/10/2024,"WIRE TRANSFER TO SPAIN BILBAO CARMEN CONSULTANCY",-2500.00,WIRE_OUTGOING,6000.00,,
DEBIT,04/10/2024,"WIRE TRANSFER TO SPAIN BILBAO CARMEN CONSULTANCY",-2500.00,WIRE_OUTGOING,8500.00,,
"#;

    const ROSTER: &str = "ConsultantID,Name,Country,Role,Specialization,HourlyRate,ContractType,PaymentMethod,StartDate,EndDate,Status,Email,TaxID,CompanyName,Notes,TotalPaid
C1,Carmen Ruiz,Spain,Designer,UX,60,Monthly Retainer,Wire,2023-03-01,,Active,c@example.com,,Inversiones Teiz S.L.,,5000
C2,Marta Lopez,Spain,Developer,Web,40,Hourly,Upwork,2023-03-01,,Active,m@example.com,,,,900
C3,Oscar Diaz,Spain,Developer,Web,40,Hourly,Upwork,2023-03-01,,Inactive,o@example.com,,,,0
";

    fn breakdown() -> Vec<ConsultantBreakdown> {
        vec![
            ConsultantBreakdown { name: "Carmen".into(), amount: 5000.0 },
            ConsultantBreakdown { name: "Swan".into(), amount: 1000.0 },
        ]
    }

    #[test]
    fn test_without_roster_everything_is_bank_only() {
        let checking = parse_chase_checking_csv(CHECKING, &CheckingRules::default()).unwrap();
        let r = reconcile_consultants(&checking, 6000.0, &breakdown(), None);
        assert!(r.matched.is_empty());
        assert_eq!(r.chase_only.len(), 2);
        assert_eq!(r.total_unmatched, 6000.0);
        assert_eq!(r.chase_only[0].payments, 2);
        assert!((r.chase_only[1].percentage - 100.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_with_roster() {
        let checking = parse_chase_checking_csv(CHECKING, &CheckingRules::default()).unwrap();
        let ledger = parse_consultant_subledger(ROSTER).unwrap();
        let r = reconcile_consultants(&checking, 6000.0, &breakdown(), Some(&ledger));

        assert_eq!(r.matched.len(), 1);
        let carmen = &r.matched[0];
        assert_eq!(carmen.source, ReconcileSource::Both);
        assert_eq!(carmen.subledger_amount, 5000.0);
        assert_eq!(carmen.country.as_deref(), Some("Spain"));
        assert_eq!(carmen.payments, 2);

        assert_eq!(r.chase_only.len(), 1);
        assert_eq!(r.chase_only[0].name, "Swan");

        // paid roster rows only
        assert_eq!(r.subledger_only.len(), 1);
        assert_eq!(r.subledger_only[0].name, "Marta Lopez");
        assert_eq!(r.total_subledger_only, 900.0);
        assert_eq!(r.total_matched + r.total_unmatched, 6000.0);
    }

    #[test]
    fn test_payment_count_uses_exact_name() {
        let export = r#"Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #
DEBIT,06/20/2024,"WIRE TRANSFER NIKOLETA GEORGIEVA",-900.00,WIRE_OUTGOING,7200.00,,
DEBIT,06/10/2024,"WIRE TRANSFER NIKOLETA GEORGIEVA",-900.00,WIRE_OUTGOING,8100.00,,
DEBIT,06/05/2024,"WIRE TRANSFER NIKOLA DRAGANOV",-1000.00,WIRE_OUTGOING,9000.00,,
"#;
        let checking = parse_chase_checking_csv(export, &CheckingRules::default()).unwrap();
        let breakdown = vec![
            ConsultantBreakdown { name: "Nikoleta".into(), amount: 1800.0 },
            ConsultantBreakdown { name: "Nikola".into(), amount: 1000.0 },
        ];
        let r = reconcile_consultants(&checking, 2800.0, &breakdown, None);
        assert_eq!(r.chase_only[0].name, "Nikoleta");
        assert_eq!(r.chase_only[0].payments, 2);
        assert_eq!(r.chase_only[1].name, "Nikola");
        assert_eq!(r.chase_only[1].payments, 1);
    }

    #[test]
    fn test_short_words_do_not_match() {
        assert!(!names_overlap("jo", "jo smith"));
        assert!(names_overlap("petrana", "petrana petrova"));
        assert!(names_overlap("swan softweb", "swan"));
        assert!(!names_overlap("unassigned", "carmen ruiz"));
    }

    #[test]
    fn test_format_summary() {
        let checking = parse_chase_checking_csv(CHECKING, &CheckingRules::default()).unwrap();
        let ledger = parse_consultant_subledger(ROSTER).unwrap();
        let r = reconcile_consultants(&checking, 6000.0, &breakdown(), Some(&ledger));
        let text = format_reconciliation_summary(&r);
        assert!(text.starts_with("Total bank consultant spending: $6000.00"));
        assert!(text.contains("Matched contractors (1): $5000.00"));
        assert!(text.contains("Other payments (1): $1000.00"));
        assert!(text.contains("Roster-only contractors (1): $900.00"));
    }
}
