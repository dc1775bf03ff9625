use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pharmacy")]
#[command(about = "Pharmacy medicine catalog", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML config file (defaults to $PHARMACY_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List medicines
    #[command(alias = "ls")]
    List {
        /// Search term (case-insensitive substring)
        #[arg(short, long)]
        search: Option<String>,

        /// Fields to search
        #[arg(long, value_enum, default_value_t = SearchField::All)]
        by: SearchField,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Medicines sharing a formula
    Related { formula: String },

    /// Alternatives to a medicine, matched on selected attributes
    Alternatives {
        id: String,

        /// Do not require the same formula
        #[arg(long)]
        any_formula: bool,

        /// Require the same dosage
        #[arg(long)]
        dosage: bool,

        /// Require the same formulation
        #[arg(long)]
        formulation: bool,
    },

    /// Add a medicine
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        formula: String,
        #[arg(long, default_value = "")]
        dosage: String,
        #[arg(long, default_value = "")]
        formulation: String,
        #[arg(long, default_value_t = 0)]
        stock: u32,
    },

    /// Update fields of a medicine
    #[command(alias = "edit")]
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        formula: Option<String>,
        #[arg(long)]
        dosage: Option<String>,
        #[arg(long)]
        formulation: Option<String>,
        #[arg(long)]
        stock: Option<u32>,
    },

    /// Delete a medicine
    #[command(alias = "rm")]
    Delete { id: String },

    /// Add medicines from a JSON array file
    BulkAdd { file: PathBuf },

    /// Import medicines from a CSV file
    Import {
        file: PathBuf,

        /// Import rows that match an existing medicine
        #[arg(long)]
        keep_duplicates: bool,

        /// Validate and report without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Export the catalog as CSV
    Export {
        /// Output path (defaults to pharmacy-medicines-<date>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the CSV import template
    Template {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Seed the sample catalog into an empty store
    Seed,

    /// Refresh the offline cache from the store
    Sync {
        /// Keep running and refresh whenever the cache goes stale
        #[arg(long)]
        watch: bool,
    },

    /// Start an admin session
    Login {
        #[arg(long, env = "PHARMACY_PASSWORD")]
        password: String,
    },

    /// End the admin session
    Logout,

    /// Show session and cache status
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchField {
    Name,
    Formula,
    Both,
    All,
}

impl From<SearchField> for pharmacy_core::SearchBy {
    fn from(field: SearchField) -> Self {
        match field {
            SearchField::Name => pharmacy_core::SearchBy::Name,
            SearchField::Formula => pharmacy_core::SearchBy::Formula,
            SearchField::Both => pharmacy_core::SearchBy::Both,
            SearchField::All => pharmacy_core::SearchBy::All,
        }
    }
}
