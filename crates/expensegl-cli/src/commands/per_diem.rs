//! Per diem command implementation

use anyhow::{Context, Result};
use expensegl_core::per_diem::require_service;
use expensegl_core::{parse_date, PerDiemLocation, PerDiemService, Settings};

use super::today;

pub async fn cmd_per_diem(settings: &Settings, location: &str, date: Option<&str>) -> Result<()> {
    let today = today(settings);

    let travel_date = match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(text) => Some(
            parse_date(text, today)
                .with_context(|| format!("Could not understand date \"{text}\""))?,
        ),
        None => None,
    };

    let location = PerDiemLocation::parse(location)?;
    let service = PerDiemService::from_settings(&settings.per_diem);
    let service = require_service(service.as_ref())?;

    println!("🔎 Looking up per diem rate...");
    let quote = service.lookup(&location, travel_date, today).await?;

    if !quote.zip_code.is_empty() {
        println!("   ZIP: {}", quote.zip_code);
    }
    if let Some(date) = quote.travel_date {
        println!("   Travel date: {}", date);
    }
    println!("   Fiscal year: {}", quote.fiscal_year);
    println!("   M&IE rate: ${:.2}/day", quote.mie_rate);

    Ok(())
}
