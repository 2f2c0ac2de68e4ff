use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tally_core::{categorize_credit_card_transaction, checking_rules::CARD_AUTOPAY, extract_vendor};
use tally_finance::{
    analyze_monthly_reconciliation, analyze_period, audit_data_sources,
    build_statement_reconciliation, calculate_financial_totals, find_matching_payments,
    format_audit_summary, format_cutoff_summary, format_monthly_analysis,
    format_reconciliation_summary, format_statement_summary, format_validation_report,
    reconcile_card_subledger, reconcile_consultants, validate_checking, variance_analysis,
    DEFAULT_CUTOFF_DAYS, DEFAULT_TOLERANCE,
};

mod config;
mod loader;
mod report;
mod state;

use loader::DataLoader;

const CRATES: &[&str] = &["tally", "tally_core", "tally_ingest", "tally_finance"];

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")"),
    about = "Business financial reporting from bank and card exports"
)]
struct Cli {
    /// Directory holding the exports (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Checking export: path or http(s) URL
    #[arg(long, global = true)]
    checking: Option<String>,

    /// Card export: path or http(s) URL
    #[arg(long, global = true)]
    card: Option<String>,

    /// Consultant roster: path or http(s) URL
    #[arg(long, global = true)]
    consultants: Option<String>,

    /// Bill.com vendor export: path or http(s) URL
    #[arg(long, global = true)]
    billcom_vendors: Option<String>,

    /// Bill.com bills export: path or http(s) URL
    #[arg(long, global = true)]
    billcom_bills: Option<String>,

    /// Machine-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Golden-record totals: revenue, expenses, net income, equity
    Totals,

    /// Categorize a single description
    Categorize {
        description: String,

        #[arg(long, allow_hyphen_values = true)]
        amount: Option<f64>,

        /// Use the checking rules with this bank type (e.g. WIRE_OUTGOING)
        #[arg(long)]
        checking_type: Option<String>,
    },

    /// Card statement summary and payments matched to checking
    Card,

    /// Reconciliation reports
    Reconcile {
        #[command(subcommand)]
        command: ReconcileCommand,
    },

    /// Cross-check the checking export against its raw rows
    Validate,

    /// Compare card figures across the checking and card exports
    Audit,

    /// Unpaid Bill.com bills
    Bills {
        /// Only this vendor's outstanding bills
        #[arg(long)]
        vendor: Option<String>,
    },

    /// Consultant roster summary
    Consultants {
        /// Top spenders to list
        #[arg(long, default_value_t = 5)]
        top: usize,
    },

    /// Manage ~/.tally/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ReconcileCommand {
    /// Bank consultant spend against the roster
    Consultants,

    /// Card charges against checking payments, by statement cycle
    Card {
        /// Payment-to-payment windows instead of statement cycles
        #[arg(long)]
        monthly: bool,

        /// Detail for one statement period (YYYY-MM)
        #[arg(long, conflicts_with = "monthly")]
        period: Option<String>,

        /// Totals with charges after the last payment's cut-off set aside
        #[arg(long, conflicts_with_all = ["monthly", "period"])]
        cutoff: bool,

        /// Days after the last payment that still count toward it
        #[arg(long, default_value_t = DEFAULT_CUTOFF_DAYS, requires = "cutoff")]
        cutoff_days: i64,

        /// Allowed payment variance as a fraction (0.01 = 1%)
        #[arg(long, default_value_t = DEFAULT_TOLERANCE, requires = "cutoff")]
        tolerance: f64,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
        EnvFilter::new(directives.join(","))
    });
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serialize report")?);
    Ok(())
}

fn build_loader(cli: &Cli) -> Result<DataLoader> {
    let cfg = config::load_config()?;
    let mut data = cfg.data;
    if let Some(dir) = &cli.data_dir {
        data.dir = dir.clone();
    }
    if let Some(src) = &cli.checking {
        data.checking_csv = Some(src.clone());
    }
    if let Some(src) = &cli.card {
        data.credit_card_csv = Some(src.clone());
    }
    if let Some(src) = &cli.consultants {
        data.consultants_csv = Some(src.clone());
    }
    if let Some(src) = &cli.billcom_vendors {
        data.billcom_vendors_csv = Some(src.clone());
    }
    if let Some(src) = &cli.billcom_bills {
        data.billcom_bills_csv = Some(src.clone());
    }
    Ok(DataLoader::new(data, cfg.rules))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },

        Command::Categorize {
            description,
            amount,
            checking_type,
        } => match checking_type {
            Some(tx_type) => {
                let rules = config::load_config()?.rules;
                let label = rules.categorize(description, tx_type, amount.unwrap_or(0.0));
                if cli.json {
                    print_json(&serde_json::json!({
                        "description": description,
                        "type": tx_type,
                        "category": label,
                    }))?;
                } else {
                    println!("{description}\n  category: {label}");
                }
            }
            None => {
                let triple = categorize_credit_card_transaction(description, *amount);
                let vendor = extract_vendor(description);
                if cli.json {
                    print_json(&serde_json::json!({
                        "description": description,
                        "categories": triple,
                        "vendor": vendor,
                    }))?;
                } else {
                    print!("{}", report::render_categorized(description, *amount, &triple, &vendor));
                }
            }
        },

        Command::Totals => {
            let loader = build_loader(&cli)?;
            let checking = loader.checking().await?;
            let card = loader.card().await?;
            let totals = calculate_financial_totals(&checking.statement, card.as_deref());
            if cli.json {
                print_json(&totals)?;
            } else {
                print!("{}", report::render_totals(&totals));
            }
        }

        Command::Card => {
            let loader = build_loader(&cli)?;
            let Some(card) = loader.card().await? else {
                bail!("no card export found (pass --card <path|url>)");
            };
            let checking = loader.checking().await?;
            let autopay: Vec<_> = checking
                .statement
                .transactions
                .iter()
                .filter(|t| t.category == CARD_AUTOPAY)
                .cloned()
                .collect();
            let matches = find_matching_payments(&card, &autopay);
            if cli.json {
                print_json(&serde_json::json!({
                    "summary": card.summary,
                    "top_categories": card.top_expense_categories(10),
                    "monthly_charges": card.monthly_charges(),
                    "payment_matches": matches,
                }))?;
            } else {
                print!("{}", report::render_card(&card, &matches));
            }
        }

        Command::Reconcile { command } => {
            let loader = build_loader(&cli)?;
            let checking = loader.checking().await?;
            match command {
                ReconcileCommand::Consultants => {
                    let card = loader.card().await?;
                    let roster = loader.consultants().await?;
                    let totals = calculate_financial_totals(&checking.statement, card.as_deref());
                    let rec = reconcile_consultants(
                        &checking.statement,
                        totals.consultant_expenses,
                        &totals.consultant_breakdown,
                        roster.as_ref(),
                    );
                    if cli.json {
                        print_json(&rec)?;
                    } else {
                        println!("{}", format_reconciliation_summary(&rec));
                    }
                }
                ReconcileCommand::Card {
                    monthly,
                    period,
                    cutoff,
                    cutoff_days,
                    tolerance,
                } => {
                    let Some(card) = loader.card().await? else {
                        bail!("no card export found (pass --card <path|url>)");
                    };
                    if *cutoff {
                        let rec = reconcile_card_subledger(
                            &checking.statement,
                            &card,
                            *tolerance,
                            *cutoff_days,
                        );
                        if cli.json {
                            print_json(&serde_json::json!({
                                "reconciliation": rec,
                                "variance_analysis": variance_analysis(&rec),
                            }))?;
                        } else {
                            println!("{}", format_cutoff_summary(&rec));
                            print!("{}", report::render_variances(&variance_analysis(&rec)));
                        }
                    } else if *monthly {
                        let months = analyze_monthly_reconciliation(&checking.statement, &card);
                        if cli.json {
                            print_json(&months)?;
                        } else {
                            for m in &months {
                                println!("{}", format_monthly_analysis(m));
                            }
                        }
                    } else {
                        let rec = build_statement_reconciliation(&checking.statement, &card);
                        match period {
                            Some(id) => {
                                let p = rec
                                    .periods
                                    .iter()
                                    .find(|p| &p.period_id == id)
                                    .with_context(|| format!("no statement period {id}"))?;
                                if cli.json {
                                    print_json(p)?;
                                } else {
                                    println!("{}", analyze_period(p));
                                }
                            }
                            None if cli.json => print_json(&rec)?,
                            None => println!("{}", format_statement_summary(&rec)),
                        }
                    }
                }
            }
        }

        Command::Validate => {
            let loader = build_loader(&cli)?;
            let checking = loader.checking().await?;
            let report = validate_checking(&checking.statement, &checking.raw);
            if cli.json {
                print_json(&report)?;
            } else {
                print!("{}", format_validation_report(&report));
            }
            if !report.is_valid() {
                bail!("checking export failed validation");
            }
        }

        Command::Audit => {
            let loader = build_loader(&cli)?;
            let Some(card) = loader.card().await? else {
                bail!("no card export found (pass --card <path|url>)");
            };
            let checking = loader.checking().await?;
            let audit = audit_data_sources(&checking.statement, &card);
            if cli.json {
                print_json(&audit)?;
            } else {
                print!("{}", format_audit_summary(&audit));
            }
        }

        Command::Bills { vendor } => {
            let loader = build_loader(&cli)?;
            let Some(data) = loader.billcom().await? else {
                bail!("no Bill.com exports found (pass --billcom-bills <path|url>)");
            };
            let (bills, total) = match vendor {
                Some(v) => (data.outstanding_bills(v), data.outstanding_amount(v)),
                None => {
                    let bills = data.all_unpaid_bills();
                    let total = tally_core::round_and_sum(bills.iter().map(|b| b.balance_due));
                    (bills, total)
                }
            };
            if cli.json {
                print_json(&serde_json::json!({
                    "vendor": vendor,
                    "outstanding": bills,
                    "total": total,
                }))?;
            } else {
                print!("{}", report::render_bills(&bills, total));
            }
        }

        Command::Consultants { top } => {
            let loader = build_loader(&cli)?;
            let Some(roster) = loader.consultants().await? else {
                bail!("no consultant roster found (pass --consultants <path|url>)");
            };
            let summary = roster.summary()?;
            let outstanding = roster.outstanding_invoices()?;
            let top_paid = roster.top_by_spend(*top);
            if cli.json {
                print_json(&serde_json::json!({
                    "summary": summary,
                    "outstanding": outstanding,
                    "top_by_spend": top_paid,
                }))?;
            } else {
                print!("{}", report::render_roster(&summary, &outstanding));
                println!("\nTop {} by total paid", top_paid.len());
                for c in top_paid {
                    println!("  {:<32} {:>14}", c.name, tally_core::format_usd(c.total_paid));
                }
            }
        }
    }

    Ok(())
}
