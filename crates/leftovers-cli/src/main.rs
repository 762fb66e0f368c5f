//! Pharmacy Leftovers CLI
//!
//! Command-line front-end over `leftovers-core`: the leftover worklist, the
//! medication catalog, daily purchase entries and statistics exports.
//! Configuration comes from `LEFTOVERS_*` environment variables; flags
//! override them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use leftovers_core::{
    Config, Fetched, Gateway, LeftoverPatch, LeftoverPreparation, Medication, Mutation,
    NewLeftoverPreparation, NewMedication, NewPurchaseEntry, PurchaseEntry, PurchasePatch,
    RemoteConfig, SearchProxy, SessionGate, StatisticsReport, TimeRange,
};
use serde::Serialize;

/// Track leftover compounded preparations and pharmacy stock
#[derive(Parser, Debug)]
#[command(name = "leftovers")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Remote service URL (overrides LEFTOVERS_REMOTE_URL)
    #[arg(long, global = true, requires = "remote_key")]
    remote_url: Option<String>,

    /// Remote service API key (overrides LEFTOVERS_REMOTE_KEY)
    #[arg(long, global = true, requires = "remote_url")]
    remote_key: Option<String>,

    /// Local snapshot database (overrides LEFTOVERS_DATA_PATH)
    #[arg(long, global = true)]
    data_path: Option<PathBuf>,

    /// Do not store example leftovers in an empty local store
    #[arg(long, global = true, default_value_t = false)]
    no_seed: bool,

    /// Access secret, when LEFTOVERS_ACCESS_SECRET is set
    #[arg(long, global = true)]
    secret: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show unresolved leftovers, soonest expiry first
    Active,

    /// List a whole collection, newest first
    List {
        #[arg(value_enum)]
        collection: CollectionArg,
    },

    /// Register a leftover preparation
    AddLeftover {
        /// Preparation name, e.g. "Paclitaxel 175mg/m²"
        name: String,
        /// Dose description
        dose: String,
        /// Expiry date (YYYY-MM-DD)
        expiry: NaiveDate,
    },

    /// Flag a leftover as used or resolved
    Mark {
        id: String,
        #[arg(value_enum)]
        status: MarkArg,
        /// Clear the flag instead of setting it
        #[arg(long, default_value_t = false)]
        undo: bool,
    },

    /// Delete a record by id
    Delete {
        #[arg(value_enum)]
        collection: CollectionArg,
        id: String,
    },

    /// Add a medication to the catalog
    AddMedication { name: String },

    /// Search the medication catalog by name
    Search { query: String },

    /// Show today's purchase entries, or the full history
    Purchases {
        #[arg(long, default_value_t = false)]
        history: bool,
    },

    /// Record today's stock for a catalog medication
    AddPurchase {
        /// Catalog medication id
        medication_id: String,
        /// Units currently in stock
        stock: u32,
    },

    /// Flag a purchase entry as ordered
    Order {
        id: String,
        #[arg(long, default_value_t = false)]
        undo: bool,
    },

    /// Leftover statistics for a period
    Stats(RangeArgs),

    /// Write the period's leftovers as a semicolon-separated file
    ExportCsv {
        #[command(flatten)]
        range: RangeArgs,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Write the period's plain-text summary
    Report {
        #[command(flatten)]
        range: RangeArgs,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Delete every record of a collection
    Clear {
        #[arg(value_enum)]
        collection: CollectionArg,
        /// Confirm the deletion
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CollectionArg {
    Leftovers,
    Medications,
    Purchases,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MarkArg {
    Used,
    Resolved,
}

#[derive(Args, Debug)]
struct RangeArgs {
    /// week, month, quarter, year or custom
    #[arg(default_value = "month")]
    range: TimeRange,

    /// First day of a custom range (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End of a custom range, at 00:00 of that day (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl RangeArgs {
    /// `--from`/`--to` imply a custom range.
    fn time_range(&self) -> TimeRange {
        match (&self.range, self.from, self.to) {
            (TimeRange::Custom { .. }, start, end)
            | (_, start @ Some(_), end)
            | (_, start, end @ Some(_)) => TimeRange::Custom { start, end },
            (range, None, None) => range.clone(),
        }
    }
}

fn config_from(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env().context("Invalid LEFTOVERS_* environment")?;

    if let (Some(url), Some(api_key)) = (&cli.remote_url, &cli.remote_key) {
        config.remote = Some(RemoteConfig {
            url: url.clone(),
            api_key: api_key.clone(),
        });
    }
    if let Some(path) = &cli.data_path {
        config.data_path = path.clone();
    }
    if cli.no_seed {
        config.seed_demo_data = false;
    }
    Ok(config)
}

/// Print the rows; a failed fetch still prints the last known rows.
fn rows<T>(fetched: Fetched<T>) -> Vec<T> {
    if let Some(e) = &fetched.error {
        log::warn!("Showing cached data, refresh failed: {}", e);
    }
    fetched.data
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_leftovers(leftovers: &[LeftoverPreparation], json: bool) -> Result<()> {
    if json {
        return print_json(leftovers);
    }
    let today = Local::now().date_naive();
    for l in leftovers {
        println!(
            "{}  {:<32} {:<24} expires {} ({:?}){}{}",
            l.id,
            l.preparation_name,
            l.dose,
            l.expiry_date,
            l.expiry_status(today),
            if l.used { " [used]" } else { "" },
            if l.resolved { " [resolved]" } else { "" },
        );
    }
    println!("{} leftover(s)", leftovers.len());
    Ok(())
}

fn print_medications(medications: &[Medication], json: bool) -> Result<()> {
    if json {
        return print_json(medications);
    }
    for m in medications {
        println!("{}  {}", m.id, m.name);
    }
    println!("{} medication(s)", medications.len());
    Ok(())
}

fn print_purchases(purchases: &[PurchaseEntry], json: bool) -> Result<()> {
    if json {
        return print_json(purchases);
    }
    for p in purchases {
        println!(
            "{}  {}  {:<32} stock {:>4}{}",
            p.id,
            p.order_date,
            p.medication_name,
            p.current_stock,
            if p.ordered { " [ordered]" } else { "" },
        );
    }
    println!("{} entr(ies)", purchases.len());
    Ok(())
}

fn print_mutation(action: &str, id: &str, outcome: Mutation) {
    if outcome.found() {
        println!("{} {}", action, id);
    } else {
        println!("No record with id {}", id);
    }
}

fn print_stats(report: &StatisticsReport) {
    let c = &report.counts;
    println!(
        "Period {} .. {} ({})",
        report.window.start.format("%d/%m/%Y"),
        report.window.end.format("%d/%m/%Y"),
        report.range
    );
    println!("Total      {:>5}", c.total);
    println!("Utilized   {:>5}  {:>5.1}%", c.utilized(), c.share(c.utilized()));
    println!("Resolved   {:>5}  {:>5.1}%", c.resolved, c.share(c.resolved));
    println!("Pending    {:>5}  {:>5.1}%", c.pending, c.share(c.pending));
    println!("Expired    {:>5}  {:>5.1}%", c.expired, c.share(c.expired));

    if !report.trend.is_empty() {
        println!("\nBy day:");
        for b in &report.trend {
            println!(
                "  {}  total {:>3}  used {:>3}  resolved {:>3}",
                b.date, b.total, b.used, b.resolved
            );
        }
    }
    if !report.distribution.is_empty() {
        println!("\nTop families:");
        for b in &report.distribution {
            println!("  {:<24} total {:>3}  used {:>3}", b.name, b.total, b.used);
        }
    }
}

async fn build_report(gateway: &Gateway, range: &RangeArgs) -> StatisticsReport {
    let leftovers = rows(gateway.fetch_all::<LeftoverPreparation>().await);
    StatisticsReport::build(&leftovers, &range.time_range(), &Local::now())
}

fn write_export(dir: &Path, file_name: &str, contents: &str) -> Result<()> {
    let path = dir.join(file_name);
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn search(gateway: Arc<Gateway>, query: &str, json: bool) -> Result<()> {
    let mut proxy = SearchProxy::new(gateway);
    let mut rx = proxy.subscribe();
    proxy.input(query);

    tokio::time::timeout(Duration::from_secs(30), rx.changed())
        .await
        .context("Search timed out")?
        .context("Search stopped")?;

    let results = rx.borrow().clone();
    print_medications(&results.matches, json)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = config_from(&cli)?;

    let gate = SessionGate::new(config.access_secret.clone());
    if let Some(secret) = &cli.secret {
        gate.try_unlock(secret);
    }
    if !gate.is_authenticated() {
        bail!("Access secret required (--secret)");
    }

    let gateway = Arc::new(
        Gateway::connect(&config)
            .await
            .context("Failed to open record store")?,
    );
    if gateway.is_demo_mode() {
        log::info!("Demo mode: data is stored locally at {}", config.data_path.display());
    }

    let json = cli.json;
    let today = Local::now().date_naive();

    match cli.command {
        Command::Active => {
            print_leftovers(&rows(gateway.fetch_active().await), json)?;
        }
        Command::List { collection } => match collection {
            CollectionArg::Leftovers => {
                print_leftovers(&rows(gateway.fetch_all::<LeftoverPreparation>().await), json)?
            }
            CollectionArg::Medications => {
                print_medications(&rows(gateway.fetch_all::<Medication>().await), json)?
            }
            CollectionArg::Purchases => {
                print_purchases(&rows(gateway.fetch_all::<PurchaseEntry>().await), json)?
            }
        },
        Command::AddLeftover { name, dose, expiry } => {
            let created = gateway
                .create::<LeftoverPreparation>(NewLeftoverPreparation::new(name, dose, expiry))
                .await
                .context("Failed to add leftover")?;
            print_leftovers(&[created], json)?;
        }
        Command::Mark { id, status, undo } => {
            let patch = match status {
                MarkArg::Used => LeftoverPatch::used(!undo),
                MarkArg::Resolved => LeftoverPatch::resolved(!undo),
            };
            let outcome = gateway
                .update::<LeftoverPreparation>(&id, &patch)
                .await
                .context("Failed to update leftover")?;
            print_mutation("Updated", &id, outcome);
        }
        Command::Delete { collection, id } => {
            let outcome = match collection {
                CollectionArg::Leftovers => gateway.delete::<LeftoverPreparation>(&id).await,
                CollectionArg::Medications => gateway.delete::<Medication>(&id).await,
                CollectionArg::Purchases => gateway.delete::<PurchaseEntry>(&id).await,
            }
            .context("Failed to delete record")?;
            print_mutation("Deleted", &id, outcome);
        }
        Command::AddMedication { name } => {
            let created = gateway
                .create::<Medication>(NewMedication::new(&name))
                .await
                .context("Failed to add medication")?;
            print_medications(&[created], json)?;
        }
        Command::Search { query } => {
            search(Arc::clone(&gateway), &query, json).await?;
        }
        Command::Purchases { history } => {
            let fetched = if history {
                gateway.purchase_history().await
            } else {
                gateway.purchases_on(today).await
            };
            print_purchases(&rows(fetched), json)?;
        }
        Command::AddPurchase {
            medication_id,
            stock,
        } => {
            let catalog = rows(gateway.medication_catalog().await);
            let Some(medication) = catalog.iter().find(|m| m.id == medication_id) else {
                bail!("No medication with id {}", medication_id);
            };
            let created = gateway
                .create::<PurchaseEntry>(NewPurchaseEntry::for_medication(medication, stock, today))
                .await
                .context("Failed to add purchase entry")?;
            print_purchases(&[created], json)?;
        }
        Command::Order { id, undo } => {
            let outcome = gateway
                .update::<PurchaseEntry>(&id, &PurchasePatch::ordered(!undo))
                .await
                .context("Failed to update purchase entry")?;
            print_mutation("Updated", &id, outcome);
        }
        Command::Stats(range) => {
            let report = build_report(&gateway, &range).await;
            if json {
                print_json(&report)?;
            } else {
                print_stats(&report);
            }
        }
        Command::ExportCsv { range, out } => {
            let report = build_report(&gateway, &range).await;
            let csv = report.to_csv().context("Failed to build CSV export")?;
            write_export(&out, &report.csv_file_name(), &csv)?;
        }
        Command::Report { range, out } => {
            let report = build_report(&gateway, &range).await;
            write_export(&out, &report.text_file_name(), &report.to_text())?;
        }
        Command::Clear { collection, yes } => {
            if !yes {
                bail!("Refusing to delete every {:?} record without --yes", collection);
            }
            let outcome = match collection {
                CollectionArg::Leftovers => gateway.clear_all::<LeftoverPreparation>().await,
                CollectionArg::Medications => gateway.clear_all::<Medication>().await,
                CollectionArg::Purchases => gateway.clear_all::<PurchaseEntry>().await,
            }
            .context("Failed to clear collection")?;
            println!("Deleted {} record(s)", outcome.affected);
        }
    }

    Ok(())
}
