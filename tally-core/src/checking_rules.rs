//! Checking-account categorization.
//!
//! Produces the category labels the totals aggregator filters on
//! (`Client Payment - ...`, `Consultant - ...`, `Credit Card Autopay`, ...).
//! Client and consultant tables are data so the config file can replace them.

use serde::{Deserialize, Serialize};

pub const WIRE_REVERSAL: &str = "Wire Transfer Reversal";
pub const ACCOUNT_VERIFICATION: &str = "Account Verification";
pub const CARD_AUTOPAY: &str = "Credit Card Autopay";
pub const AUTO_LOAN: &str = "Auto Loan Payment";
pub const BANK_FEES: &str = "Monthly Bank Fees";
pub const BUSINESS_SERVICES: &str = "Business Services";
pub const ACCOUNT_TRANSFER: &str = "Account Transfer";
pub const UNASSIGNED_CONSULTANT: &str = "Consultant - Unassigned";
pub const OTHER: &str = "Other";

/// Incoming payment from a client, matched by description keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRule {
    pub keyword: String,
    pub name: String,
}

/// Outgoing payment to a consultant, matched by any of its keywords
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultantRule {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub keywords: Vec<String>,
}

impl ConsultantRule {
    /// `Consultant - Spain (Carmen)` or `Consultant - Swan`
    pub fn label(&self) -> String {
        match &self.country {
            Some(country) => format!("Consultant - {} ({})", country, self.name),
            None => format!("Consultant - {}", self.name),
        }
    }

    fn matches(&self, desc_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && desc_lower.contains(&k.to_lowercase()))
    }
}

/// Ordered rule tables for checking transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckingRules {
    #[serde(default = "default_clients")]
    pub clients: Vec<ClientRule>,
    /// Checked in order: put `nikoleta` before `nikola`
    #[serde(default = "default_consultants")]
    pub consultants: Vec<ConsultantRule>,
}

impl Default for CheckingRules {
    fn default() -> Self {
        Self {
            clients: default_clients(),
            consultants: default_consultants(),
        }
    }
}

fn client(keyword: &str, name: &str) -> ClientRule {
    ClientRule {
        keyword: keyword.to_string(),
        name: name.to_string(),
    }
}

fn consultant(name: &str, country: Option<&str>, keywords: &[&str]) -> ConsultantRule {
    ConsultantRule {
        name: name.to_string(),
        country: country.map(str::to_string),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn default_clients() -> Vec<ClientRule> {
    vec![
        client("laurel managemen", "Laurel Management"),
        client("metropolitan", "Metropolitan Partners"),
    ]
}

fn default_consultants() -> Vec<ConsultantRule> {
    vec![
        consultant("Pepi", Some("Bulgaria"), &["pepi"]),
        consultant("Petrana", Some("Bulgaria"), &["petrana", "trusted ltd"]),
        consultant("Ivana", Some("Slovakia"), &["ivana", "kmecov"]),
        consultant("Carmen", Some("Spain"), &["carmen", "teiz"]),
        consultant("Nikoleta", None, &["nikoleta"]),
        consultant("Nikola", None, &["nikola", "draganov"]),
        consultant("Jan", None, &["dzubak"]),
        consultant("Swan", None, &["swan softweb", "swan"]),
        consultant("Abri", None, &["abri"]),
        consultant("Beata", None, &["beata"]),
        consultant("Marianna", None, &["marianna"]),
    ]
}

impl CheckingRules {
    /// Assign a category label to a checking transaction.
    ///
    /// `amount` is signed: positive = money in.
    pub fn categorize(&self, description: &str, tx_type: &str, amount: f64) -> String {
        let desc = description.to_lowercase();
        let tx_type = tx_type.trim();

        if desc.contains("reversal") {
            return WIRE_REVERSAL.to_string();
        }

        if desc.contains("acctverify") || desc.contains("verification") {
            return ACCOUNT_VERIFICATION.to_string();
        }

        if amount > 0.0 {
            if let Some(rule) = self
                .clients
                .iter()
                .find(|r| !r.keyword.is_empty() && desc.contains(&r.keyword.to_lowercase()))
            {
                return format!("Client Payment - {}", rule.name);
            }
        }

        // consultant keywords only apply to wires and consultancy payments
        let is_wire = desc.contains("wire transfer") || tx_type == "WIRE_OUTGOING";
        if amount < 0.0 && (is_wire || desc.contains("consult")) {
            if let Some(rule) = self.consultants.iter().find(|r| r.matches(&desc)) {
                return rule.label();
            }
            if is_wire
                && (desc.contains("consultancy")
                    || desc.contains("spain")
                    || desc.contains("bulgaria")
                    || desc.contains("slovakia"))
            {
                return UNASSIGNED_CONSULTANT.to_string();
            }
        }

        if desc.contains("chase credit crd") {
            return CARD_AUTOPAY.to_string();
        }

        if desc.contains("auto loan") || tx_type == "LOAN_PMT" {
            return AUTO_LOAN.to_string();
        }

        if tx_type == "FEE_TRANSACTION" || desc.contains("service charges") {
            return BANK_FEES.to_string();
        }

        if desc.contains("bill.com") {
            return BUSINESS_SERVICES.to_string();
        }

        if tx_type == "ACCT_XFER" {
            return ACCOUNT_TRANSFER.to_string();
        }

        if tx_type.is_empty() {
            OTHER.to_string()
        } else {
            tx_type.to_string()
        }
    }
}

/// Consultant name from a `Consultant - ...` label.
///
/// `Consultant - Spain (Carmen)` -> `Carmen`, `Consultant - Swan` -> `Swan`.
pub fn consultant_name_from_label(label: &str) -> String {
    let rest = label.replace("Consultant - ", "");
    let rest = rest.trim();
    if let (Some(open), Some(close)) = (rest.find('('), rest.find(')')) {
        if open < close {
            return rest[open + 1..close].trim().to_string();
        }
    }
    rest.to_string()
}
