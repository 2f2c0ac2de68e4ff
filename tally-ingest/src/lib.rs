//! tally-ingest: bank and card CSV parsers, statement summaries, the consultant roster and
//! Bill.com exports.

pub mod billcom;
pub mod error;
pub mod parsers;
pub mod subledger;
pub mod summary;
pub mod types;

pub use billcom::{
    match_vendor_to_consultant, parse_billcom_bills, parse_billcom_data, parse_billcom_vendors,
    BillComBill, BillComData, BillComVendor, PaymentStatus, VendorKind, VendorStatus,
};
pub use error::{IngestError, Result};
pub use parsers::{parse_chase_checking_csv, parse_chase_credit_csv};
pub use subledger::{
    parse_consultant_subledger, Consultant, ConsultantSubledger, OutstandingInvoice, RosterSummary,
};
pub use types::{
    AccountSummary, CardStatement, CardSummary, CardTransaction, CategoryShare, CategorySummary,
    CheckingStatement, DateRange, MonthlyData, StatementKind, Transaction,
};
