//! Finance classification types shared by the parsers and the report builders

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level expense grouping used by the credit-card subledger buckets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MajorCategory {
    #[serde(rename = "Operating Expenses")]
    OperatingExpenses,
    #[serde(rename = "Travel")]
    Travel,
    #[serde(rename = "Meals & Entertainment")]
    MealsAndEntertainment,
    #[serde(rename = "Bills & Utilities")]
    BillsAndUtilities,
    #[serde(rename = "Payments & Fees")]
    PaymentsAndFees,
    #[serde(rename = "Excluded")]
    Excluded,
    #[serde(rename = "Uncategorized")]
    Uncategorized,
}

impl MajorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            MajorCategory::OperatingExpenses => "Operating Expenses",
            MajorCategory::Travel => "Travel",
            MajorCategory::MealsAndEntertainment => "Meals & Entertainment",
            MajorCategory::BillsAndUtilities => "Bills & Utilities",
            MajorCategory::PaymentsAndFees => "Payments & Fees",
            MajorCategory::Excluded => "Excluded",
            MajorCategory::Uncategorized => "Uncategorized",
        }
    }

    /// Whether charges in this group count as business expenses
    pub fn is_expense(&self) -> bool {
        !matches!(self, MajorCategory::PaymentsAndFees | MajorCategory::Excluded)
    }
}

impl fmt::Display for MajorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Three-level classification assigned to every card transaction
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct CategoryTriple {
    pub major_category: MajorCategory,
    pub category: &'static str,
    pub subcategory: &'static str,
}

impl CategoryTriple {
    pub const fn new(
        major_category: MajorCategory,
        category: &'static str,
        subcategory: &'static str,
    ) -> Self {
        Self {
            major_category,
            category,
            subcategory,
        }
    }

    /// `"{category} - {subcategory}"`, the key used by statement breakdowns
    pub fn full_label(&self) -> String {
        if self.subcategory.is_empty() {
            self.category.to_string()
        } else {
            format!("{} - {}", self.category, self.subcategory)
        }
    }
}

/// Money direction relative to the card account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Charge: increases what is owed
    #[serde(rename = "debit")]
    Debit,
    /// Payment, return or refund
    #[serde(rename = "credit")]
    Credit,
}

/// Transaction classification emitted by the Chase card export
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChaseType {
    Sale,
    Payment,
    Return,
    Adjustment,
    Fee,
    Other(String),
}

impl ChaseType {
    pub fn parse(raw: &str) -> Self {
        let t = raw.trim();
        match t.to_ascii_lowercase().as_str() {
            "sale" => ChaseType::Sale,
            "payment" => ChaseType::Payment,
            "return" => ChaseType::Return,
            "adjustment" => ChaseType::Adjustment,
            "fee" => ChaseType::Fee,
            _ => ChaseType::Other(t.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChaseType::Sale => "Sale",
            ChaseType::Payment => "Payment",
            ChaseType::Return => "Return",
            ChaseType::Adjustment => "Adjustment",
            ChaseType::Fee => "Fee",
            ChaseType::Other(s) => s,
        }
    }

    /// Direction implied by the type alone, if it implies one
    pub fn direction(&self) -> Option<Direction> {
        match self {
            ChaseType::Sale => Some(Direction::Debit),
            ChaseType::Payment | ChaseType::Return => Some(Direction::Credit),
            ChaseType::Other(s) => {
                let s = s.to_ascii_lowercase();
                if s.contains("payment") || s.contains("return") || s.contains("refund") {
                    Some(Direction::Credit)
                } else {
                    None
                }
            }
            ChaseType::Adjustment | ChaseType::Fee => None,
        }
    }

    /// Returns and refunds reduce category spend; payments do not
    pub fn is_refund(&self) -> bool {
        match self {
            ChaseType::Return => true,
            ChaseType::Other(s) => {
                let s = s.to_ascii_lowercase();
                s.contains("return") || s.contains("refund")
            }
            _ => false,
        }
    }
}

impl fmt::Display for ChaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
