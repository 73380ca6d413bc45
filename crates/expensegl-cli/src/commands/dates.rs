//! Date command implementation

use anyhow::Result;
use expensegl_core::{parse_date, TravelTimezone};

pub fn cmd_date(text: &str, timezone: &str) -> Result<()> {
    let today = TravelTimezone::resolve(timezone).today();
    match parse_date(text, today) {
        Some(date) => {
            println!("{}", date.format("%Y-%m-%d"));
            Ok(())
        }
        None => anyhow::bail!("Could not understand date \"{}\" (today is {})", text.trim(), today),
    }
}
