use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use bhavdiff::data::{import_files, SettlementStore, SqliteStore};
use bhavdiff::report::ComparisonReport;

#[derive(Parser)]
#[command(name = "bhavdiff", about = "Bhavcopy ingestion and two-date open-interest comparison")]
struct Cli {
    /// Path to the settlement database
    #[arg(long, global = true, default_value = "bhavcopy.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one or more bhavcopy CSV files
    Import {
        /// Files to ingest (filename must carry the DDMMYY trading date)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the dates present in storage
    Dates,

    /// Compare open interest and close price between two stored dates
    Compare {
        /// Reference date (YYYY-MM-DD)
        date_a: String,

        /// Comparison date (YYYY-MM-DD)
        date_b: String,

        /// Export the comparison rows to CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print the comparison rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import { files } => cmd_import(&cli.db, files),
        Commands::Dates => cmd_dates(&cli.db),
        Commands::Compare {
            date_a,
            date_b,
            csv,
            json,
        } => cmd_compare(&cli.db, date_a, date_b, csv, json),
    }
}

/// Open the store for one operation; the connection closes when the store
/// drops at the end of the command.
fn open_store(db: &Path) -> Result<SqliteStore> {
    let store = SqliteStore::open(db)
        .with_context(|| format!("failed to open database at {}", db.display()))?;
    store.init().context("failed to initialize schema")?;
    Ok(store)
}

fn cmd_import(db: &Path, files: Vec<PathBuf>) -> Result<()> {
    let store = open_store(db)?;
    let stats = import_files(&files, &store);

    println!();
    println!("Import complete:");
    println!("  Files processed: {}", stats.files_processed);
    println!("  Files skipped:   {}", stats.files_skipped);
    println!("  Rows written:    {}", stats.rows_written);
    println!();

    Ok(())
}

fn cmd_dates(db: &Path) -> Result<()> {
    let store = open_store(db)?;

    let dates = store.list_dates().unwrap_or_else(|e| {
        warn!("failed to list dates: {}", e);
        Vec::new()
    });

    if dates.is_empty() {
        println!("No dates stored yet.");
        return Ok(());
    }

    for d in &dates {
        println!("{}", d);
    }
    Ok(())
}

fn cmd_compare(
    db: &Path,
    date_a: String,
    date_b: String,
    csv_path: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    if date_a == date_b {
        bail!("comparison dates must differ (got '{}' twice)", date_a);
    }

    let store = open_store(db)?;

    let rows = store.compare(&date_a, &date_b).unwrap_or_else(|e| {
        warn!("comparison query failed: {}", e);
        Vec::new()
    });

    if rows.is_empty() {
        println!("No comparable data found for {} vs {}", date_a, date_b);
        return Ok(());
    }

    if json {
        println!("{}", ComparisonReport::to_json(&rows)?);
    } else {
        let report = ComparisonReport::from_rows(&rows, &date_a, &date_b);
        report.print(&rows);
    }

    if let Some(ref path) = csv_path {
        ComparisonReport::export_csv(&rows, path)
            .with_context(|| format!("failed to export CSV to {}", path.display()))?;
        println!("Comparison exported to {}", path.display());
    }

    Ok(())
}
