//! Reads exports from disk or over HTTP and keeps the parsed card statement warm.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tally_core::CheckingRules;
use tally_ingest::{
    parse_billcom_data, parse_chase_checking_csv, parse_chase_credit_csv,
    parse_consultant_subledger, BillComData, CardStatement, CheckingStatement,
    ConsultantSubledger,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::DataSection;

const CHECKING_CANDIDATES: &[&str] = &["chase_checking.csv", "checking.csv"];
const CARD_CANDIDATES: &[&str] = &["chase_credit_card.csv", "credit_card.csv"];
const ROSTER_CANDIDATES: &[&str] = &["consultants.csv", "consultant_subledger.csv"];
const VENDOR_CANDIDATES: &[&str] = &["bill-com-vendors.csv", "billcom_vendors.csv"];
const BILL_CANDIDATES: &[&str] = &["bill-com-bills.csv", "billcom_bills.csv"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Url(String),
}

impl Source {
    /// URLs are taken as is, paths are resolved against `base`
    pub fn parse(raw: &str, base: &Path) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Source::Url(raw.to_string())
        } else {
            Source::File(base.join(raw))
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::File(p) => write!(f, "{}", p.display()),
            Source::Url(u) => f.write_str(u),
        }
    }
}

pub async fn read_source(client: &reqwest::Client, source: &Source) -> Result<String> {
    match source {
        Source::File(p) => tokio::fs::read_to_string(p)
            .await
            .with_context(|| format!("read {}", p.display())),
        Source::Url(url) => {
            let resp = client
                .get(url)
                .send()
                .await
                .with_context(|| format!("GET {url}"))?;
            let status = resp.status();
            if !status.is_success() {
                bail!("GET {url} returned {status}");
            }
            resp.text().await.with_context(|| format!("read body of {url}"))
        }
    }
}

/// Chase card downloads are named like `Chase8008_Activity20240101_20241231_20250102.CSV`
fn is_chase_activity_export(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    name.starts_with("Chase") && name.contains("_Activity") && lower.ends_with(".csv")
}

async fn first_existing(dir: &Path, candidates: &[&str]) -> Option<PathBuf> {
    for name in candidates {
        let p = dir.join(name);
        if tokio::fs::try_exists(&p).await.unwrap_or(false) {
            return Some(p);
        }
    }
    None
}

/// Latest `YYYYMMDD` stamp after `_Activity` in an export name
fn activity_stamp(name: &str) -> Option<String> {
    let (_, rest) = name.split_once("_Activity")?;
    rest.split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 8)
        .max()
        .map(str::to_string)
}

struct ActivityExport {
    stamp: Option<String>,
    modified: Option<SystemTime>,
    path: PathBuf,
}

/// Newest Chase activity export in `dir`, else one of the fixed card file names.
///
/// Newest means the latest date stamped in the file name, then the latest modification time,
/// so exports for several card numbers in one folder compare by date.
pub async fn find_card_export(dir: &Path) -> Result<Option<PathBuf>> {
    let mut activity: Vec<ActivityExport> = Vec::new();
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => {
            while let Some(entry) = entries
                .next_entry()
                .await
                .with_context(|| format!("list {}", dir.display()))?
            {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str().filter(|n| is_chase_activity_export(n)) else {
                    continue;
                };
                let modified = entry.metadata().await.ok().and_then(|m| m.modified().ok());
                activity.push(ActivityExport {
                    stamp: activity_stamp(name),
                    modified,
                    path: entry.path(),
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("list {}", dir.display())),
    }
    if let Some(newest) = activity
        .into_iter()
        .max_by(|a, b| (&a.stamp, a.modified).cmp(&(&b.stamp, b.modified)))
    {
        debug!(path = %newest.path.display(), "picked card activity export");
        return Ok(Some(newest.path));
    }
    Ok(first_existing(dir, CARD_CANDIDATES).await)
}

pub struct LoadedChecking {
    pub statement: CheckingStatement,
    /// The export text, kept for validation
    pub raw: String,
}

struct CachedCard {
    loaded_at: Instant,
    statement: Arc<CardStatement>,
}

pub struct DataLoader {
    data: DataSection,
    rules: CheckingRules,
    client: reqwest::Client,
    card_ttl: Duration,
    card_cache: Mutex<Option<CachedCard>>,
}

impl DataLoader {
    pub fn new(data: DataSection, rules: CheckingRules) -> Self {
        let card_ttl = data.cache_ttl();
        Self {
            data,
            rules,
            client: reqwest::Client::new(),
            card_ttl,
            card_cache: Mutex::new(None),
        }
    }

    fn configured(&self, raw: Option<&String>) -> Option<Source> {
        raw.map(|r| Source::parse(r, &self.data.dir))
    }

    async fn checking_source(&self) -> Result<Source> {
        if let Some(src) = self.configured(self.data.checking_csv.as_ref()) {
            return Ok(src);
        }
        match first_existing(&self.data.dir, CHECKING_CANDIDATES).await {
            Some(p) => Ok(Source::File(p)),
            None => bail!(
                "no checking export in {} (pass --checking <path|url>)",
                self.data.dir.display()
            ),
        }
    }

    pub async fn checking(&self) -> Result<LoadedChecking> {
        let source = self.checking_source().await?;
        let raw = read_source(&self.client, &source).await?;
        let statement = parse_chase_checking_csv(&raw, &self.rules)
            .with_context(|| format!("parse checking export {source}"))?;
        info!(
            source = %source,
            transactions = statement.transactions.len(),
            "loaded checking export"
        );
        Ok(LoadedChecking { statement, raw })
    }

    async fn card_source(&self) -> Result<Option<Source>> {
        if let Some(src) = self.configured(self.data.credit_card_csv.as_ref()) {
            return Ok(Some(src));
        }
        Ok(find_card_export(&self.data.dir).await?.map(Source::File))
    }

    /// Parsed card export, or `None` when there is no card data.
    ///
    /// Results are cached for the configured TTL; a miss or an empty file is not cached.
    pub async fn card(&self) -> Result<Option<Arc<CardStatement>>> {
        let mut cache = self.card_cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.loaded_at.elapsed() < self.card_ttl {
                debug!(age_secs = cached.loaded_at.elapsed().as_secs(), "card cache hit");
                return Ok(Some(Arc::clone(&cached.statement)));
            }
            debug!("card cache expired");
        }

        let Some(source) = self.card_source().await? else {
            debug!(dir = %self.data.dir.display(), "no card export found");
            return Ok(None);
        };
        let raw = read_source(&self.client, &source).await?;
        if raw.trim().is_empty() {
            warn!(source = %source, "card export is empty");
            return Ok(None);
        }

        let statement = Arc::new(
            parse_chase_credit_csv(&raw).with_context(|| format!("parse card export {source}"))?,
        );
        info!(
            source = %source,
            transactions = statement.transactions.len(),
            "loaded card export"
        );
        *cache = Some(CachedCard {
            loaded_at: Instant::now(),
            statement: Arc::clone(&statement),
        });
        Ok(Some(statement))
    }

    /// Drop the cached card statement so the next read goes to the source
    pub async fn invalidate(&self) {
        *self.card_cache.lock().await = None;
    }

    pub async fn consultants(&self) -> Result<Option<ConsultantSubledger>> {
        let Some(source) = self
            .optional_source(self.data.consultants_csv.as_ref(), ROSTER_CANDIDATES)
            .await
        else {
            debug!(dir = %self.data.dir.display(), "no consultant roster found");
            return Ok(None);
        };
        let raw = read_source(&self.client, &source).await?;
        let roster = parse_consultant_subledger(&raw)
            .with_context(|| format!("parse consultant roster {source}"))?;
        info!(source = %source, consultants = roster.len(), "loaded consultant roster");
        Ok(Some(roster))
    }

    async fn optional_source(&self, raw: Option<&String>, candidates: &[&str]) -> Option<Source> {
        match self.configured(raw) {
            Some(src) => Some(src),
            None => first_existing(&self.data.dir, candidates).await.map(Source::File),
        }
    }

    /// Bill.com vendors and bills. Either export may be missing; `None` when both are.
    pub async fn billcom(&self) -> Result<Option<BillComData>> {
        let vendors = self
            .optional_source(self.data.billcom_vendors_csv.as_ref(), VENDOR_CANDIDATES)
            .await;
        let bills = self
            .optional_source(self.data.billcom_bills_csv.as_ref(), BILL_CANDIDATES)
            .await;
        if vendors.is_none() && bills.is_none() {
            debug!(dir = %self.data.dir.display(), "no Bill.com exports found");
            return Ok(None);
        }

        let mut raw = [String::new(), String::new()];
        for (slot, source) in raw.iter_mut().zip([&vendors, &bills]) {
            if let Some(source) = source {
                *slot = read_source(&self.client, source).await?;
            }
        }
        let data = parse_billcom_data(&raw[0], &raw[1]).context("parse Bill.com exports")?;
        info!(
            vendors = data.vendors.len(),
            bills = data.bills.len(),
            "loaded Bill.com exports"
        );
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CARD: &str = "Card,Transaction Date,Post Date,Description,Category,Type,Amount,Memo
8008,03/02/2025,03/03/2025,SOUTHWES 5262168829843,Travel,Sale,-210.00,
8008,03/01/2025,03/02/2025,AMAZON MKTPL*AB12,Shopping,Sale,-45.51,
";

    fn fixtures() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .join("fixtures")
    }

    fn loader_for(dir: &Path, ttl_secs: u64) -> DataLoader {
        DataLoader::new(
            DataSection {
                dir: dir.to_path_buf(),
                cache_ttl_secs: ttl_secs,
                ..DataSection::default()
            },
            CheckingRules::default(),
        )
    }

    #[test]
    fn test_source_parse() {
        let base = Path::new("/data");
        assert_eq!(
            Source::parse("https://example.com/a.csv", base),
            Source::Url("https://example.com/a.csv".into())
        );
        assert_eq!(
            Source::parse("card.csv", base),
            Source::File(PathBuf::from("/data/card.csv"))
        );
        assert_eq!(
            Source::parse("/tmp/card.csv", base),
            Source::File(PathBuf::from("/tmp/card.csv"))
        );
    }

    #[test]
    fn test_activity_export_names() {
        assert!(is_chase_activity_export("Chase8008_Activity20250101_20250430.CSV"));
        assert!(is_chase_activity_export("Chase8008_Activity.csv"));
        assert!(!is_chase_activity_export("chase_credit_card.csv"));
        assert!(!is_chase_activity_export("Chase8008_Activity.xlsx"));
    }

    #[tokio::test]
    async fn test_find_card_export_prefers_newest_activity_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("credit_card.csv"), CARD).unwrap();
        assert_eq!(
            find_card_export(dir.path()).await.unwrap(),
            Some(dir.path().join("credit_card.csv"))
        );

        fs::write(dir.path().join("Chase8008_Activity20250101.CSV"), CARD).unwrap();
        fs::write(dir.path().join("Chase8008_Activity20250301.CSV"), CARD).unwrap();
        assert_eq!(
            find_card_export(dir.path()).await.unwrap(),
            Some(dir.path().join("Chase8008_Activity20250301.CSV"))
        );
    }

    #[test]
    fn test_activity_stamp() {
        assert_eq!(
            activity_stamp("Chase8008_Activity20250101_20250430_20250502.CSV").as_deref(),
            Some("20250502")
        );
        assert_eq!(activity_stamp("Chase8008_Activity.CSV"), None);
    }

    #[tokio::test]
    async fn test_find_card_export_compares_dates_across_cards() {
        let dir = tempfile::tempdir().unwrap();
        // plain name order would pick the 9999 card
        fs::write(dir.path().join("Chase1234_Activity20250301.CSV"), CARD).unwrap();
        fs::write(dir.path().join("Chase9999_Activity20250101.CSV"), CARD).unwrap();
        assert_eq!(
            find_card_export(dir.path()).await.unwrap(),
            Some(dir.path().join("Chase1234_Activity20250301.CSV"))
        );
    }

    #[tokio::test]
    async fn test_missing_dir_has_no_card() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_for(&dir.path().join("nope"), 300);
        assert!(loader.card().await.unwrap().is_none());
        assert!(loader.consultants().await.unwrap().is_none());
        assert!(loader.checking().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_card_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chase_credit_card.csv"), "  \n").unwrap();
        let loader = loader_for(dir.path(), 300);
        assert!(loader.card().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_card_is_cached_until_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chase_credit_card.csv");
        fs::write(&path, CARD).unwrap();

        let loader = loader_for(dir.path(), 300);
        let first = loader.card().await.unwrap().unwrap();
        assert_eq!(first.transactions.len(), 2);

        // edits are not seen while the cache is fresh
        fs::write(&path, CARD.lines().take(2).collect::<Vec<_>>().join("\n")).unwrap();
        let second = loader.card().await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        loader.invalidate().await;
        let third = loader.card().await.unwrap().unwrap();
        assert_eq!(third.transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_reloads() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("credit_card.csv"), CARD).unwrap();
        let loader = loader_for(dir.path(), 0);
        let a = loader.card().await.unwrap().unwrap();
        let b = loader.card().await.unwrap().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_loads_fixture_dir() {
        let loader = loader_for(&fixtures(), 300);
        let checking = loader.checking().await.unwrap();
        assert_eq!(checking.statement.transactions.len(), 20);
        assert!(checking.raw.starts_with("Details,"));
        assert!(loader.card().await.unwrap().is_some());
        assert_eq!(loader.consultants().await.unwrap().unwrap().len(), 6);
        let billcom = loader.billcom().await.unwrap().unwrap();
        assert_eq!(billcom.vendors.len(), 3);
        assert_eq!(billcom.bills.len(), 5);
    }

    #[tokio::test]
    async fn test_billcom_needs_one_export() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_for(dir.path(), 300);
        assert!(loader.billcom().await.unwrap().is_none());

        fs::write(
            dir.path().join("bill-com-bills.csv"),
            "Invoice #,Uploads,Notes,Vendor,Description,PO #,Chart of Account,Bill Type,Created Date,Invoice Date,Due Date,Currency,Invoice Amount,Balance Due,Payment Type,Payment Status,Approval Status\n\
             INV-1,,,Trusted Ltd,Work,,Consultants,Standard,03/01/2025,03/01/2025,04/01/2025,USD,100.00,100.00,Wire,Unpaid,Approved\n",
        )
        .unwrap();
        let data = loader.billcom().await.unwrap().unwrap();
        assert!(data.vendors.is_empty());
        assert_eq!(data.outstanding_amount("trusted ltd"), 100.00);
    }

    #[tokio::test]
    async fn test_configured_paths_override_search() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mine.csv"), CARD).unwrap();
        let loader = DataLoader::new(
            DataSection {
                dir: dir.path().to_path_buf(),
                credit_card_csv: Some("mine.csv".into()),
                ..DataSection::default()
            },
            CheckingRules::default(),
        );
        assert_eq!(loader.card().await.unwrap().unwrap().transactions.len(), 2);
    }
}
