//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ExpenseGL - Expense report normalization and GL import
#[derive(Parser)]
#[command(name = "expensegl")]
#[command(about = "Expense report lookups and GL import file generation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to <data dir>/expensegl/config.toml when present)
    ///
    /// Environment variables such as EXPENSE_CODES_CSV and GSA_API_KEY
    /// override values from the file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable function key authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, every request must carry a key from EXPENSEGL_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// Allowed CORS origins (comma-separated)
        #[arg(long, value_delimiter = ',')]
        allowed_origins: Vec<String>,
    },

    /// List account codes for a department/activity pair
    Codes {
        /// Department code (e.g. 620)
        #[arg(short, long)]
        department: String,

        /// Activity code (e.g. 770)
        #[arg(short, long)]
        activity: String,
    },

    /// Resolve a free-text department name to a ledger code
    Department {
        /// Department name, optionally prefixed with a code ("175 - Member Svcs")
        name: String,

        /// Employee email; a configured override takes precedence over the name
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Parse a travel date phrase ("next friday", "12/3", "2025-03-14")
    Date {
        /// Date text
        text: String,

        /// IANA time zone for "today" (defaults to the configured travel zone)
        #[arg(long)]
        timezone: Option<String>,
    },

    /// Render an expense payload as a GL import CSV
    ImportCsv {
        /// Payload file (JSON object, bare items array, or raw draft items)
        #[arg(short, long)]
        file: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Look up the federal per diem M&IE rate
    PerDiem {
        /// 5-digit ZIP or "City, ST"
        location: String,

        /// Travel date (any phrase `expensegl date` understands)
        #[arg(short, long)]
        date: Option<String>,
    },
}
