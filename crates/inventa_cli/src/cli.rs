//! Command-line surface and configuration resolution.
//!
//! Every global option can come from a flag or an `INVENTA_*` variable.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "inventa", version, about = "Inventory periods and book catalog")]
pub struct Cli {
    /// SQLite database file.
    #[arg(long, env = "INVENTA_DB", default_value = "inventa.sqlite3", global = true)]
    pub db: PathBuf,

    /// Absolute directory for rolling log files. Logs go to stderr when unset.
    #[arg(long, env = "INVENTA_LOG_DIR", global = true)]
    pub log_dir: Option<String>,

    /// trace|debug|info|warn|error. Defaults to debug in debug builds, info otherwise.
    #[arg(long, env = "INVENTA_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Acting user recorded as `created_by`.
    #[arg(long, env = "INVENTA_USER", global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the title/author guessed from an invoice description.
    Parse { description: String },
    /// Manage inventory periods.
    #[command(subcommand)]
    Period(PeriodCommand),
    /// Manage the book catalog.
    #[command(subcommand)]
    Catalog(CatalogCommand),
}

#[derive(Debug, Subcommand)]
pub enum PeriodCommand {
    /// List all periods, newest first.
    List,
    /// Show the open period, if any.
    Active,
    /// Filter periods by name, creator or status.
    Search {
        #[arg(default_value = "")]
        term: String,
    },
    /// Open a new period.
    Create { name: String },
    /// Close a period by id or exact name.
    Close { target: String },
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// Merge one invoice line into the catalog.
    Ingest(IngestArgs),
    /// List catalog entries by title.
    List {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    pub description: String,
    #[arg(long, short = 'q', default_value_t = 1)]
    pub quantity: u32,
    /// Unit price in cents.
    #[arg(long)]
    pub price_cents: Option<i64>,
}
