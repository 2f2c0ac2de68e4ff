//! Bill.com exports: the vendor list and the bills register.
//!
//! Both exports are positional. The vendor export is very wide (60+ columns); rows
//! shorter than the columns we rely on are skipped.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tally_core::{parse_amount, round_and_sum};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::parsers::parse_statement_date;

const MIN_VENDOR_COLUMNS: usize = 20;
const MIN_BILL_COLUMNS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VendorStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorKind {
    Person,
    Business,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    /// Anything Bill.com reports other than `Paid` or `Unpaid`
    Partial,
}

impl PaymentStatus {
    fn parse(raw: &str) -> Self {
        match raw {
            "Paid" => PaymentStatus::Paid,
            "Unpaid" => PaymentStatus::Unpaid,
            _ => PaymentStatus::Partial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillComVendor {
    pub id: String,
    pub vendor_name: String,
    pub name_on_check: String,
    pub company_name: String,
    pub account_number: String,
    pub tax_id: String,
    /// Address lines joined with `, `
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub primary_email: String,
    pub phone: String,
    pub pay_by: String,
    pub payment_method: String,
    pub payment_currency: String,
    pub preferred_payment_method: String,
    pub balance: f64,
    pub available_credit: f64,
    pub status: VendorStatus,
    pub kind: VendorKind,
    pub last_payment_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillComBill {
    pub invoice_no: String,
    pub vendor: String,
    pub description: String,
    pub po_number: String,
    pub chart_of_account: String,
    pub bill_type: String,
    pub created_date: String,
    pub invoice_date: String,
    pub due_date: String,
    pub currency: String,
    pub invoice_amount: f64,
    pub balance_due: f64,
    pub payment_type: String,
    pub payment_status: PaymentStatus,
    /// `Approved`, `Approving`, `Denied`, `Pending`
    pub approval_status: String,
    pub uploads: Option<String>,
    pub notes: Option<String>,
}

impl BillComBill {
    pub fn is_outstanding(&self) -> bool {
        self.payment_status == PaymentStatus::Unpaid && self.balance_due > 0.0
    }

    pub fn due(&self) -> Option<NaiveDate> {
        parse_statement_date(&self.due_date)
    }
}

fn col(record: &StringRecord, i: usize) -> String {
    record.get(i).unwrap_or("").to_string()
}

fn col_or(record: &StringRecord, i: usize, default: &str) -> String {
    match record.get(i) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

fn col_opt(record: &StringRecord, i: usize) -> Option<String> {
    record.get(i).filter(|v| !v.is_empty()).map(str::to_string)
}

fn col_amount(record: &StringRecord, i: usize) -> f64 {
    record.get(i).and_then(parse_amount).unwrap_or(0.0)
}

fn records(content: &str, what: &str) -> Result<Vec<StringRecord>> {
    if content.trim().lines().count() < 2 {
        warn!(export = what, "Bill.com export is empty");
        return Ok(Vec::new());
    }
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.trim().as_bytes());
    let mut out = Vec::new();
    for result in rdr.records() {
        out.push(result?);
    }
    Ok(out)
}

pub fn parse_billcom_vendors(content: &str) -> Result<Vec<BillComVendor>> {
    let mut vendors = Vec::new();
    for (row, record) in records(content, "vendors")?.iter().enumerate() {
        if record.len() < MIN_VENDOR_COLUMNS {
            warn!(row, columns = record.len(), "skipping short vendor row");
            continue;
        }
        let address = (10..=13)
            .filter_map(|i| record.get(i))
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        vendors.push(BillComVendor {
            id: col(record, 2),
            vendor_name: col(record, 1),
            name_on_check: col(record, 3),
            company_name: col(record, 4),
            account_number: col(record, 5),
            tax_id: col(record, 6),
            address,
            city: col(record, 14),
            state: col(record, 15),
            zip_code: col(record, 16),
            country: col(record, 17),
            primary_email: col(record, 18),
            phone: col(record, 20),
            pay_by: col(record, 21),
            payment_method: col(record, 57),
            payment_currency: col(record, 42),
            preferred_payment_method: col(record, 43),
            balance: col_amount(record, 32),
            available_credit: col_amount(record, 33),
            status: if record.get(0) == Some("Active") {
                VendorStatus::Active
            } else {
                VendorStatus::Inactive
            },
            kind: if record.get(31) == Some("person") {
                VendorKind::Person
            } else {
                VendorKind::Business
            },
            last_payment_date: col_opt(record, 60),
        });
    }
    info!(count = vendors.len(), "parsed Bill.com vendors");
    Ok(vendors)
}

pub fn parse_billcom_bills(content: &str) -> Result<Vec<BillComBill>> {
    let mut bills = Vec::new();
    for (row, record) in records(content, "bills")?.iter().enumerate() {
        if record.len() < MIN_BILL_COLUMNS {
            warn!(row, columns = record.len(), "skipping short bill row");
            continue;
        }
        bills.push(BillComBill {
            invoice_no: col(record, 0),
            uploads: col_opt(record, 1),
            notes: col_opt(record, 2),
            vendor: col(record, 3),
            description: col(record, 4),
            po_number: col(record, 5),
            chart_of_account: col(record, 6),
            bill_type: col(record, 7),
            created_date: col(record, 8),
            invoice_date: col(record, 9),
            due_date: col(record, 10),
            currency: col_or(record, 11, "USD"),
            invoice_amount: col_amount(record, 12),
            balance_due: col_amount(record, 13),
            payment_type: col(record, 14),
            payment_status: PaymentStatus::parse(record.get(15).unwrap_or("")),
            approval_status: col_or(record, 16, "Pending"),
        });
    }
    info!(count = bills.len(), "parsed Bill.com bills");
    Ok(bills)
}

/// Vendors and bills with lookups by lower-cased vendor name
#[derive(Debug, Clone, Default, Serialize)]
pub struct BillComData {
    pub vendors: Vec<BillComVendor>,
    pub bills: Vec<BillComBill>,
    /// vendor name and name-on-check -> index into `vendors`
    #[serde(skip)]
    vendor_index: BTreeMap<String, usize>,
    /// vendor name -> indexes into `bills`
    #[serde(skip)]
    bills_by_vendor: BTreeMap<String, Vec<usize>>,
}

impl BillComData {
    pub fn new(vendors: Vec<BillComVendor>, bills: Vec<BillComBill>) -> Self {
        let mut vendor_index = BTreeMap::new();
        for (i, v) in vendors.iter().enumerate() {
            vendor_index.insert(v.vendor_name.to_lowercase(), i);
            if !v.name_on_check.is_empty() {
                vendor_index.insert(v.name_on_check.to_lowercase(), i);
            }
        }
        let mut bills_by_vendor: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, b) in bills.iter().enumerate() {
            bills_by_vendor.entry(b.vendor.to_lowercase()).or_default().push(i);
        }
        debug!(vendors = vendors.len(), keys = vendor_index.len(), "indexed Bill.com vendors");
        BillComData {
            vendors,
            bills,
            vendor_index,
            bills_by_vendor,
        }
    }

    /// Case-insensitive lookup by vendor name or name on check; later rows win
    pub fn vendor(&self, name: &str) -> Option<&BillComVendor> {
        self.vendor_index
            .get(&name.to_lowercase())
            .map(|&i| &self.vendors[i])
    }

    pub fn bills_for(&self, vendor: &str) -> Vec<&BillComBill> {
        self.bills_by_vendor
            .get(&vendor.to_lowercase())
            .map(|idx| idx.iter().map(|&i| &self.bills[i]).collect())
            .unwrap_or_default()
    }

    /// Unpaid bills with a balance for one vendor
    pub fn outstanding_bills(&self, vendor: &str) -> Vec<&BillComBill> {
        self.bills_for(vendor)
            .into_iter()
            .filter(|b| b.is_outstanding())
            .collect()
    }

    pub fn outstanding_amount(&self, vendor: &str) -> f64 {
        round_and_sum(self.outstanding_bills(vendor).iter().map(|b| b.balance_due))
    }

    /// Unpaid bills with a balance across every vendor
    pub fn all_unpaid_bills(&self) -> Vec<&BillComBill> {
        self.bills.iter().filter(|b| b.is_outstanding()).collect()
    }
}

pub fn parse_billcom_data(vendors_csv: &str, bills_csv: &str) -> Result<BillComData> {
    Ok(BillComData::new(
        parse_billcom_vendors(vendors_csv)?,
        parse_billcom_bills(bills_csv)?,
    ))
}

/// Consultant short name behind a Bill.com vendor name
pub fn match_vendor_to_consultant(vendor_name: &str) -> Option<&'static str> {
    let name = vendor_name.to_lowercase();
    let has = |s: &str| name.contains(s);
    if has("ivana") {
        Some("Ivana")
    } else if has("nikoleta") || has("nikyn") {
        Some("Nikoleta")
    } else if has("inversiones") || has("teiz") {
        Some("Carmen")
    } else if has("trusted") {
        Some("Petrana")
    } else if has("jan") && has("dzubak") {
        Some("Jan")
    } else if has("nikola") && has("draganov") {
        Some("Nikola")
    } else {
        None
    }
}
