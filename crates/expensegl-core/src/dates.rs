//! Tolerant travel-date parsing
//!
//! Chat users type dates every which way: "yesterday", "last tue", "12/3/25",
//! "Dec 12th". [`parse_date`] tries a fixed resolution order and returns
//! `None` when nothing matches. Callers treat `None` as "no date given",
//! never as today.
//!
//! Relative phrases resolve against a reference "today" computed in the
//! configured travel time zone (see [`TravelTimezone`]).

use std::sync::LazyLock;

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::debug;

/// Default travel time zone (Mountain Time, DST-aware)
pub const DEFAULT_TIMEZONE: &str = "America/Denver";

/// Fixed-offset aliases accepted when the name is not an IANA zone
const MOUNTAIN_STANDARD_ALIASES: &[&str] =
    &["MST", "UTC-7", "UTC-07", "UTC-07:00", "GMT-7", "GMT-07:00"];

static RE_RELATIVE_WEEKDAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(last|next|this)\s+([a-z]+)$").expect("valid regex"));

/// Numeric formats tried when the text carries a four-digit year
const FOUR_DIGIT_YEAR_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%m %d %Y"];

/// `MM/DD/YY`, `MM-DD-YY`, `MM DD YY`
static RE_US_NUMERIC_SHORT_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})(?:/(\d{1,2})/|-(\d{1,2})-|\s+(\d{1,2})\s+)(\d{2})$")
        .expect("valid regex")
});

/// `Mon DD YYYY`, `Month DD, YYYY` and two-digit-year variants
static RE_MONTH_NAME_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+)\s+(\d{1,2}),?\s+(\d{4}|\d{2})$").expect("valid regex")
});

/// `Dec 12`, `December 12th`
static RE_MONTH_NAME_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z]+)\s+(\d{1,2})(?:st|nd|rd|th)?$").expect("valid regex")
});

/// Time zone used to decide what "today" is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TravelTimezone {
    /// IANA zone (DST-aware)
    Named(Tz),
    /// Fixed UTC offset
    Fixed(FixedOffset),
    Utc,
}

impl TravelTimezone {
    /// Resolve a configured zone name.
    ///
    /// IANA names win; otherwise a Mountain Standard alias maps to UTC-7 and
    /// anything else falls back to UTC.
    pub fn resolve(name: &str) -> Self {
        let name = name.trim();
        let name = if name.is_empty() { DEFAULT_TIMEZONE } else { name };

        if let Ok(tz) = name.parse::<Tz>() {
            return Self::Named(tz);
        }

        let upper = name.to_uppercase();
        if MOUNTAIN_STANDARD_ALIASES.contains(&upper.as_str()) {
            if let Some(offset) = FixedOffset::west_opt(7 * 3600) {
                return Self::Fixed(offset);
            }
        }

        debug!(timezone = name, "Unrecognized travel timezone, using UTC");
        Self::Utc
    }

    /// Today's calendar date in this zone
    pub fn today(&self) -> NaiveDate {
        let now = Utc::now();
        match self {
            Self::Named(tz) => now.with_timezone(tz).date_naive(),
            Self::Fixed(offset) => now.with_timezone(offset).date_naive(),
            Self::Utc => now.date_naive(),
        }
    }
}

impl Default for TravelTimezone {
    fn default() -> Self {
        Self::resolve(DEFAULT_TIMEZONE)
    }
}

/// Weekday index (Mon=0..Sun=6) for a full or abbreviated English name
fn weekday_index(name: &str) -> Option<i64> {
    let idx = match name {
        "mon" | "monday" => 0,
        "tue" | "tues" | "tuesday" => 1,
        "wed" | "wednesday" => 2,
        "thu" | "thur" | "thurs" | "thursday" => 3,
        "fri" | "friday" => 4,
        "sat" | "saturday" => 5,
        "sun" | "sunday" => 6,
        _ => return None,
    };
    Some(idx)
}

/// Month number for a full or abbreviated English name (case-insensitive)
fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// Expand a 2- or 4-digit year; two-digit years pivot at 69 (69 → 1969, 68 → 2068)
fn expand_year(raw: &str) -> Option<i32> {
    let n: i32 = raw.parse().ok()?;
    Some(match raw.len() {
        2 if n >= 69 => 1900 + n,
        2 => 2000 + n,
        _ => n,
    })
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_relative_weekday(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = RE_RELATIVE_WEEKDAY.captures(lower)?;
    let target = weekday_index(&caps[2])?;
    let current = i64::from(today.weekday().num_days_from_monday());

    match &caps[1] {
        "last" => {
            let delta = match (current - target).rem_euclid(7) {
                0 => 7,
                d => d,
            };
            Some(today - Duration::days(delta))
        }
        "next" => {
            let delta = match (target - current).rem_euclid(7) {
                0 => 7,
                d => d,
            };
            Some(today + Duration::days(delta))
        }
        _ => Some(today + Duration::days((target - current).rem_euclid(7))),
    }
}

/// True when `s` leads with or ends in a standalone four-digit group.
/// chrono's `%Y` also takes two digits, which must go through [`expand_year`].
fn has_four_digit_year(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() <= 4 {
        return false;
    }
    let all_digits = |part: &[u8]| part.iter().all(u8::is_ascii_digit);
    let leading = all_digits(&b[..4]) && !b[4].is_ascii_digit();
    let trailing = all_digits(&b[b.len() - 4..]) && !b[b.len() - 5].is_ascii_digit();
    leading || trailing
}

fn parse_four_digit_year(s: &str) -> Option<NaiveDate> {
    if !has_four_digit_year(s) {
        return None;
    }
    for fmt in FOUR_DIGIT_YEAR_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

fn parse_us_numeric_short_year(s: &str) -> Option<NaiveDate> {
    let caps = RE_US_NUMERIC_SHORT_YEAR.captures(s)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps
        .get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))?
        .as_str()
        .parse()
        .ok()?;
    ymd(expand_year(&caps[5])?, month, day)
}

fn parse_month_name_with_year(s: &str) -> Option<NaiveDate> {
    let caps = RE_MONTH_NAME_YEAR.captures(s)?;
    let month = month_number(&caps[1])?;
    ymd(expand_year(&caps[3])?, month, caps[2].parse().ok()?)
}

fn parse_month_name_day(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = RE_MONTH_NAME_DAY.captures(lower)?;
    let month = month_number(&caps[1])?;
    let day: u32 = caps[2].parse().ok()?;

    let candidate = ymd(today.year(), month, day)?;
    if candidate > today {
        // Travel dates look backward: assume the most recent past occurrence
        return ymd(today.year() - 1, month, day);
    }
    Some(candidate)
}

fn parse_digits(s: &str) -> Option<NaiveDate> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 8 {
        return None;
    }
    let num = |range: std::ops::Range<usize>| digits[range].parse::<u32>().ok();

    let year = num(0..4)?;
    if (1900..=2100).contains(&year) {
        if let Some(d) = ymd(year as i32, num(4..6)?, num(6..8)?) {
            return Some(d);
        }
    }
    ymd(num(4..8)? as i32, num(0..2)?, num(2..4)?)
}

/// Parse a free-text date relative to `today`.
///
/// Resolution order (first match wins):
/// 1. `today` / `yesterday` / `tomorrow`
/// 2. `last|next|this <weekday>`: "last" and "next" never mean today, "this" may
/// 3. Four-digit-year numeric forms: `YYYY-MM-DD`, `MM/DD/YYYY`, `MM-DD-YYYY`, `MM DD YYYY`
/// 4. Two-digit-year numeric forms, then month-name forms with either year width
/// 5. Month name and day without a year, rolled back a year if in the future
/// 6. Bare digits: `YYYYMMDD` when the lead looks like a year, else `MMDDYYYY`
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    let lower = s.to_lowercase();

    match lower.as_str() {
        "today" => return Some(today),
        "yesterday" => return Some(today - Duration::days(1)),
        "tomorrow" => return Some(today + Duration::days(1)),
        _ => {}
    }

    parse_relative_weekday(&lower, today)
        .or_else(|| parse_four_digit_year(s))
        .or_else(|| parse_us_numeric_short_year(s))
        .or_else(|| parse_month_name_with_year(s))
        .or_else(|| parse_month_name_day(&lower, today))
        .or_else(|| parse_digits(s))
}
