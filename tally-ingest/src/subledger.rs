//! Consultant subledger: the roster CSV the bookkeeper maintains next to the bank exports.
//!
//! Header-driven. Columns may be missing at the end of a row; missing values take defaults.

use std::collections::BTreeMap;

use csv::{ReaderBuilder, Trim};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tally_core::parse_amount;
use tracing::{debug, info};

use crate::error::Result;

const LEGAL_SUFFIXES: &str = r"(?i)\b(?:ltd|llc|inc|corp|limited|gmbh)\b\.?|\bs\.l\.";
const PARENTHESISED: &str = r"\(.*?\)";
const DOLLAR_FIGURE: &str = r"\$(\d+(?:,\d+)?)";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConsultant {
    #[serde(rename = "ConsultantID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Role")]
    role: String,
    #[serde(rename = "Specialization")]
    specialization: String,
    #[serde(rename = "HourlyRate")]
    hourly_rate: String,
    #[serde(rename = "ContractType")]
    contract_type: String,
    #[serde(rename = "PaymentMethod")]
    payment_method: String,
    #[serde(rename = "StartDate")]
    start_date: String,
    #[serde(rename = "EndDate")]
    end_date: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "TaxID")]
    tax_id: String,
    #[serde(rename = "CompanyName")]
    company_name: String,
    #[serde(rename = "Notes")]
    notes: String,
    #[serde(rename = "TotalPaid")]
    total_paid: String,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultant {
    pub id: String,
    pub name: String,
    pub country: String,
    pub role: String,
    pub specialization: String,
    pub hourly_rate: f64,
    pub contract_type: String,
    pub payment_method: String,
    pub start_date: String,
    pub end_date: Option<String>,
    /// `Active`, `Ended`, `Inactive`, `On Hold`
    pub status: String,
    pub email: String,
    pub tax_id: Option<String>,
    pub company_name: Option<String>,
    pub notes: Option<String>,
    pub total_paid: f64,
}

impl From<RawConsultant> for Consultant {
    fn from(raw: RawConsultant) -> Self {
        Consultant {
            id: raw.id,
            name: raw.name,
            country: if raw.country.is_empty() { "Unknown".to_string() } else { raw.country },
            role: raw.role,
            specialization: raw.specialization,
            hourly_rate: parse_amount(&raw.hourly_rate).unwrap_or(0.0),
            contract_type: raw.contract_type,
            payment_method: raw.payment_method,
            start_date: raw.start_date,
            end_date: non_empty(raw.end_date),
            status: if raw.status.is_empty() { "Active".to_string() } else { raw.status },
            email: raw.email,
            tax_id: non_empty(raw.tax_id),
            company_name: non_empty(raw.company_name),
            notes: non_empty(raw.notes),
            total_paid: parse_amount(&raw.total_paid).unwrap_or(0.0),
        }
    }
}

impl Consultant {
    pub fn is_active(&self) -> bool {
        self.status == "Active"
    }

    /// First of a `+`-joined payment method list (`Wise + Wire` -> `Wise`)
    pub fn primary_payment_method(&self) -> &str {
        self.payment_method.split('+').next().unwrap_or("").trim()
    }

    fn outstanding_note(&self) -> Option<&str> {
        self.notes.as_deref().filter(|n| n.contains("OUTSTANDING"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutstandingInvoice {
    pub name: String,
    pub amount: f64,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterSummary {
    pub total_consultants: usize,
    pub active_consultants: usize,
    pub ended_consultants: usize,
    pub total_paid: f64,
    pub total_outstanding: f64,
    pub by_payment_method: BTreeMap<String, f64>,
    pub by_status: BTreeMap<String, f64>,
    pub by_country: BTreeMap<String, f64>,
    pub by_role: BTreeMap<String, f64>,
}

/// Parsed roster plus the ordered alias index used for fuzzy joins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsultantSubledger {
    pub consultants: Vec<Consultant>,
    /// Lower-case alias -> index into `consultants`, in insertion order
    index: Vec<(String, usize)>,
}

impl ConsultantSubledger {
    pub fn new(consultants: Vec<Consultant>) -> Result<Self> {
        let parenthesised = Regex::new(PARENTHESISED)?;
        let suffixes = Regex::new(LEGAL_SUFFIXES)?;

        let mut ledger = ConsultantSubledger { consultants, index: Vec::new() };
        for i in 0..ledger.consultants.len() {
            let c = &ledger.consultants[i];
            let full = c.name.to_lowercase();
            let simple = parenthesised.replace_all(&full, "").trim().to_string();
            let first = full.split(' ').next().unwrap_or("").to_string();

            let mut keys = vec![full.clone(), simple, first];
            if let Some(company) = &c.company_name {
                let company = company.to_lowercase();
                let stripped = suffixes
                    .replace_all(&company, "")
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                keys.push(company);
                keys.push(stripped);
            }

            for key in keys {
                ledger.claim(key, i);
            }
        }
        Ok(ledger)
    }

    /// A later consultant takes over a shared alias; the key keeps its first position.
    fn claim(&mut self, key: String, consultant: usize) {
        if key.is_empty() {
            return;
        }
        if let Some((_, owner)) = self.index.iter_mut().find(|(k, _)| *k == key) {
            if *owner != consultant {
                debug!(alias = %key, "alias reassigned to a later consultant");
                *owner = consultant;
            }
            return;
        }
        self.index.push((key, consultant));
    }

    /// Alias keys in insertion order with their consultant
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &Consultant)> {
        self.index
            .iter()
            .map(|(key, i)| (key.as_str(), &self.consultants[*i]))
    }

    pub fn len(&self) -> usize {
        self.consultants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consultants.is_empty()
    }

    /// First consultant whose alias occurs in the lower-cased description
    pub fn match_consultant_from_description(&self, description: &str) -> Option<&Consultant> {
        let desc = description.to_lowercase();
        self.aliases()
            .find(|(key, _)| desc.contains(key))
            .map(|(_, c)| c)
    }

    pub fn summary(&self) -> Result<RosterSummary> {
        let figure = Regex::new(DOLLAR_FIGURE)?;
        let mut summary = RosterSummary {
            total_consultants: self.consultants.len(),
            active_consultants: self.consultants.iter().filter(|c| c.is_active()).count(),
            ended_consultants: self.consultants.iter().filter(|c| c.status == "Ended").count(),
            ..RosterSummary::default()
        };

        for c in &self.consultants {
            summary.total_paid += c.total_paid;
            if let Some(note) = c.outstanding_note() {
                summary.total_outstanding += first_dollar_figure(&figure, note);
            }
            *summary
                .by_payment_method
                .entry(c.primary_payment_method().to_string())
                .or_insert(0.0) += c.total_paid;
            *summary.by_status.entry(c.status.clone()).or_insert(0.0) += c.total_paid;
            *summary.by_country.entry(c.country.clone()).or_insert(0.0) += c.total_paid;
            *summary.by_role.entry(c.role.clone()).or_insert(0.0) += c.total_paid;
        }
        Ok(summary)
    }

    /// Paid consultants, largest total first
    pub fn top_by_spend(&self, limit: usize) -> Vec<&Consultant> {
        let mut paid: Vec<&Consultant> =
            self.consultants.iter().filter(|c| c.total_paid > 0.0).collect();
        paid.sort_by(|a, b| b.total_paid.total_cmp(&a.total_paid));
        paid.truncate(limit);
        paid
    }

    pub fn active(&self) -> impl Iterator<Item = &Consultant> {
        self.consultants.iter().filter(|c| c.is_active())
    }

    pub fn by_payment_method<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a Consultant> {
        self.consultants
            .iter()
            .filter(move |c| c.payment_method.contains(method))
    }

    /// Notes flagged `OUTSTANDING` with a positive dollar figure
    pub fn outstanding_invoices(&self) -> Result<Vec<OutstandingInvoice>> {
        let figure = Regex::new(DOLLAR_FIGURE)?;
        Ok(self
            .consultants
            .iter()
            .filter_map(|c| {
                let note = c.outstanding_note()?;
                let amount = first_dollar_figure(&figure, note);
                (amount > 0.0).then(|| OutstandingInvoice {
                    name: c.name.clone(),
                    amount,
                    notes: note.to_string(),
                })
            })
            .collect())
    }
}

fn first_dollar_figure(re: &Regex, text: &str) -> f64 {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .unwrap_or(0.0)
}

/// Parse the roster CSV. A UTF-8 BOM is tolerated; an empty file yields an empty roster.
pub fn parse_consultant_subledger(content: &str) -> Result<ConsultantSubledger> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers = rdr.headers()?.clone();
    let mut consultants = Vec::new();
    for result in rdr.records() {
        let mut record = result?;
        while record.len() < headers.len() {
            record.push_field("");
        }
        let raw: RawConsultant = record.deserialize(Some(&headers))?;
        if raw.name.is_empty() {
            debug!(id = %raw.id, "skipping roster row without a name");
            continue;
        }
        consultants.push(Consultant::from(raw));
    }

    let ledger = ConsultantSubledger::new(consultants)?;
    info!(
        consultants = ledger.len(),
        aliases = ledger.index.len(),
        "parsed consultant subledger"
    );
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "\u{feff}ConsultantID,Name,Country,Role,Specialization,HourlyRate,ContractType,PaymentMethod,StartDate,EndDate,Status,Email,TaxID,CompanyName,Notes,TotalPaid
C001,Petrana Petrova,Bulgaria,Developer,Backend,45,Hourly,Wire + Wise,2023-01-15,,Active,petrana@example.com,,Trusted Ltd,,52000
C002,Carmen Ruiz (Teiz),Spain,Designer,UX,60,Monthly Retainer,Wire,2023-03-01,,Active,carmen@example.com,B123,Inversiones Teiz S.L.,\"OUTSTANDING invoice $4,500 for March, $200 fees\",38000.50
C003,Jan Dzubak,Slovakia,QA,Automation,35,Hourly,Wise,2022-06-01,2024-02-28,Ended,jan@example.com,,,,12000
C004,Jan Novak,Czechia,QA,Manual,30,Hourly,PayPal,2024-01-01,,,jan.n@example.com
";

    #[test]
    fn test_parse_roster() {
        let ledger = parse_consultant_subledger(ROSTER).unwrap();
        assert_eq!(ledger.len(), 4);

        let petrana = &ledger.consultants[0];
        assert_eq!(petrana.id, "C001");
        assert_eq!(petrana.hourly_rate, 45.0);
        assert_eq!(petrana.company_name.as_deref(), Some("Trusted Ltd"));
        assert_eq!(petrana.end_date, None);

        let novak = &ledger.consultants[3];
        assert_eq!(novak.status, "Active");
        assert_eq!(novak.total_paid, 0.0);
        assert_eq!(novak.notes, None);
    }

    #[test]
    fn test_alias_index() {
        let ledger = parse_consultant_subledger(ROSTER).unwrap();
        let keys: Vec<&str> = ledger.aliases().map(|(k, _)| k).collect();
        assert!(keys.contains(&"trusted"));
        assert!(keys.contains(&"carmen ruiz"));
        assert!(keys.contains(&"inversiones teiz"));

        // a shared first name goes to the last consultant listed
        let (_, owner) = ledger.aliases().find(|(k, _)| *k == "jan").unwrap();
        assert_eq!(owner.name, "Jan Novak");
        assert_eq!(ledger.aliases().filter(|(k, _)| *k == "jan").count(), 1);
        // full names stay with their own consultant
        let (_, dzubak) = ledger.aliases().find(|(k, _)| *k == "jan dzubak").unwrap();
        assert_eq!(dzubak.name, "Jan Dzubak");
    }

    #[test]
    fn test_match_consultant_from_description() {
        let ledger = parse_consultant_subledger(ROSTER).unwrap();
        let c = ledger
            .match_consultant_from_description("WIRE TRANSFER TO TRUSTED LTD SOFIA")
            .unwrap();
        assert_eq!(c.name, "Petrana Petrova");
        assert!(ledger.match_consultant_from_description("AMAZON MKTPL").is_none());
    }

    #[test]
    fn test_summary() {
        let ledger = parse_consultant_subledger(ROSTER).unwrap();
        let s = ledger.summary().unwrap();
        assert_eq!(s.total_consultants, 4);
        assert_eq!(s.active_consultants, 3);
        assert_eq!(s.ended_consultants, 1);
        assert!((s.total_paid - 102000.50).abs() < 1e-6);
        assert_eq!(s.total_outstanding, 4500.0);
        assert_eq!(s.by_payment_method["Wire"], 90000.50);
        assert_eq!(s.by_payment_method["Wise"], 12000.0);
        assert_eq!(s.by_country["Slovakia"], 12000.0);
    }

    #[test]
    fn test_roster_queries() {
        let ledger = parse_consultant_subledger(ROSTER).unwrap();
        let top: Vec<&str> = ledger.top_by_spend(2).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(top, vec!["Petrana Petrova", "Carmen Ruiz (Teiz)"]);
        assert_eq!(ledger.active().count(), 3);
        assert_eq!(ledger.by_payment_method("Wise").count(), 2);

        let invoices = ledger.outstanding_invoices().unwrap();
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].name, "Carmen Ruiz (Teiz)");
        assert_eq!(invoices[0].amount, 4500.0);
    }

    #[test]
    fn test_empty_roster() {
        let ledger = parse_consultant_subledger("").unwrap();
        assert!(ledger.is_empty());
        assert_eq!(ledger.summary().unwrap().total_paid, 0.0);
    }
}
