//! Shared utilities for commands
//!
//! This module contains:
//! - `load_settings` - Defaults, settings file, then environment
//! - `reference_data` - Ledger and overrides from settings
//! - `today` - Today's date in the travel time zone

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use expensegl_core::{ReferenceData, Settings, TravelTimezone};
use tracing::debug;

pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let settings = Settings::load(config).context("Failed to load settings")?;
    debug!(
        ledger = %settings.expense_codes_csv.display(),
        timezone = %settings.travel_timezone,
        "Settings loaded"
    );
    Ok(settings)
}

pub fn reference_data(settings: &Settings) -> ReferenceData {
    ReferenceData::from_csv_path(
        settings.expense_codes_csv.clone(),
        &settings.department_overrides_json,
    )
}

pub fn today(settings: &Settings) -> NaiveDate {
    TravelTimezone::resolve(&settings.travel_timezone).today()
}
