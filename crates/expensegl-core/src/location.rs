//! US location parsing for per diem lookups

use chrono::{Datelike, NaiveDate};

/// Two-letter abbreviations and uppercase names of the 50 states plus DC
pub const US_STATES: &[(&str, &str)] = &[
    ("AL", "ALABAMA"),
    ("AK", "ALASKA"),
    ("AZ", "ARIZONA"),
    ("AR", "ARKANSAS"),
    ("CA", "CALIFORNIA"),
    ("CO", "COLORADO"),
    ("CT", "CONNECTICUT"),
    ("DE", "DELAWARE"),
    ("FL", "FLORIDA"),
    ("GA", "GEORGIA"),
    ("HI", "HAWAII"),
    ("ID", "IDAHO"),
    ("IL", "ILLINOIS"),
    ("IN", "INDIANA"),
    ("IA", "IOWA"),
    ("KS", "KANSAS"),
    ("KY", "KENTUCKY"),
    ("LA", "LOUISIANA"),
    ("ME", "MAINE"),
    ("MD", "MARYLAND"),
    ("MA", "MASSACHUSETTS"),
    ("MI", "MICHIGAN"),
    ("MN", "MINNESOTA"),
    ("MS", "MISSISSIPPI"),
    ("MO", "MISSOURI"),
    ("MT", "MONTANA"),
    ("NE", "NEBRASKA"),
    ("NV", "NEVADA"),
    ("NH", "NEW HAMPSHIRE"),
    ("NJ", "NEW JERSEY"),
    ("NM", "NEW MEXICO"),
    ("NY", "NEW YORK"),
    ("NC", "NORTH CAROLINA"),
    ("ND", "NORTH DAKOTA"),
    ("OH", "OHIO"),
    ("OK", "OKLAHOMA"),
    ("OR", "OREGON"),
    ("PA", "PENNSYLVANIA"),
    ("RI", "RHODE ISLAND"),
    ("SC", "SOUTH CAROLINA"),
    ("SD", "SOUTH DAKOTA"),
    ("TN", "TENNESSEE"),
    ("TX", "TEXAS"),
    ("UT", "UTAH"),
    ("VT", "VERMONT"),
    ("VA", "VIRGINIA"),
    ("WA", "WASHINGTON"),
    ("WV", "WEST VIRGINIA"),
    ("WI", "WISCONSIN"),
    ("WY", "WYOMING"),
    ("DC", "DISTRICT OF COLUMBIA"),
];

/// State abbreviation for an abbreviation or full name (case-insensitive)
pub fn state_abbreviation(token: &str) -> Option<&'static str> {
    let upper = token.trim().to_uppercase();
    US_STATES
        .iter()
        .find(|(abbr, name)| *abbr == upper || *name == upper)
        .map(|(abbr, _)| *abbr)
}

/// Parse `"City, ST"`, `"City ST"` or `"City, State Name"`.
///
/// With a comma the first comma splits; otherwise the last whitespace run does.
/// Returns the trimmed city and the state abbreviation.
pub fn parse_city_state(text: &str) -> Option<(String, &'static str)> {
    let s = text.trim();
    let (city, state) = match s.split_once(',') {
        Some(parts) => parts,
        None => s.rsplit_once(char::is_whitespace)?,
    };

    let city = city.trim();
    let state = state.trim();
    if city.is_empty() || state.is_empty() {
        return None;
    }

    Some((city.to_string(), state_abbreviation(state)?))
}

/// City as a per diem URL path segment: `"St. Mary's-Ville"` → `ST%20MARY%20S%20VILLE`
pub fn city_path_segment(city: &str) -> String {
    city.to_uppercase()
        .replace(['.', '\'', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("%20")
}

/// First five digits of the input when there are at least five
pub fn extract_zip(text: &str) -> Option<String> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).take(5).collect();
    (digits.len() == 5).then_some(digits)
}

/// Federal fiscal year (starts October 1)
pub fn fiscal_year(date: NaiveDate) -> i32 {
    if date.month() >= 10 {
        date.year() + 1
    } else {
        date.year()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_table_is_complete() {
        assert_eq!(US_STATES.len(), 51);
        assert_eq!(state_abbreviation("co"), Some("CO"));
        assert_eq!(state_abbreviation("District of Columbia"), Some("DC"));
        assert_eq!(state_abbreviation("ZZ"), None);
    }

    #[test]
    fn test_parse_city_state_with_comma() {
        assert_eq!(parse_city_state("Denver, CO"), Some(("Denver".to_string(), "CO")));
        assert_eq!(
            parse_city_state("Salt Lake City, utah"),
            Some(("Salt Lake City".to_string(), "UT"))
        );
        assert_eq!(
            parse_city_state("Washington, District of Columbia"),
            Some(("Washington".to_string(), "DC"))
        );
    }

    #[test]
    fn test_parse_city_state_without_comma() {
        assert_eq!(
            parse_city_state("Grand Junction CO"),
            Some(("Grand Junction".to_string(), "CO"))
        );
        // Multi-word state names need a comma
        assert_eq!(parse_city_state("Albany New York"), None);
    }

    #[test]
    fn test_parse_city_state_failures() {
        assert_eq!(parse_city_state(""), None);
        assert_eq!(parse_city_state("Denver"), None);
        assert_eq!(parse_city_state(", CO"), None);
        assert_eq!(parse_city_state("Paris, France"), None);
    }

    #[test]
    fn test_city_path_segment() {
        assert_eq!(city_path_segment("Denver"), "DENVER");
        assert_eq!(city_path_segment(" St. Mary's-Ville "), "ST%20MARY%20S%20VILLE");
        assert_eq!(city_path_segment("Salt  Lake City"), "SALT%20LAKE%20CITY");
    }

    #[test]
    fn test_extract_zip() {
        assert_eq!(extract_zip("80202"), Some("80202".to_string()));
        assert_eq!(extract_zip("ZIP 80202-1234"), Some("80202".to_string()));
        assert_eq!(extract_zip("802"), None);
        assert_eq!(extract_zip("Denver, CO"), None);
    }

    #[test]
    fn test_fiscal_year() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(fiscal_year(d(2025, 9, 30)), 2025);
        assert_eq!(fiscal_year(d(2025, 10, 1)), 2026);
        assert_eq!(fiscal_year(d(2026, 1, 7)), 2026);
    }
}
