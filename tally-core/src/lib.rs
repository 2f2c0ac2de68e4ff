//! tally-core: shared finance types, cent rounding, and the deterministic categorizers

pub mod categorizer;
pub mod checking_rules;
pub mod finance;
pub mod money;

pub use categorizer::{categorize_credit_card_transaction, extract_vendor, VENDOR_TABLE};
pub use checking_rules::{
    consultant_name_from_label, CheckingRules, ClientRule, ConsultantRule,
};
pub use finance::{CategoryTriple, ChaseType, Direction, MajorCategory};
pub use money::{
    amounts_equal, format_usd, parse_amount, percent_of, round_and_sum, round_to_cents,
};
