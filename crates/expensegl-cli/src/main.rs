//! ExpenseGL CLI - Expense report normalization and GL import
//!
//! Usage:
//!   expensegl serve --port 3000                 Start web server
//!   expensegl codes -d 620 -a 770               List account codes
//!   expensegl department "Member Svcs"          Resolve a department name
//!   expensegl import-csv --file payload.json    Render GL import rows

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let settings = commands::load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            port,
            host,
            no_auth,
            allowed_origins,
        } => commands::cmd_serve(settings, &host, port, no_auth, allowed_origins).await,
        Commands::Codes {
            department,
            activity,
        } => {
            let reference = commands::reference_data(&settings);
            commands::cmd_codes(&reference, &department, &activity)
        }
        Commands::Department { name, email } => {
            let reference = commands::reference_data(&settings);
            commands::cmd_department(&reference, &name, email.as_deref())
        }
        Commands::Date { text, timezone } => {
            let zone = timezone.as_deref().unwrap_or(&settings.travel_timezone);
            commands::cmd_date(&text, zone)
        }
        Commands::ImportCsv { file, out } => {
            let today = commands::today(&settings);
            commands::cmd_import_csv(&file, out.as_deref(), today).map(|_| ())
        }
        Commands::PerDiem { location, date } => {
            commands::cmd_per_diem(&settings, &location, date.as_deref()).await
        }
    }
}
