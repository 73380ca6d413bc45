//! Text canonicalization for fuzzy comparison of ledger names

/// Canonicalize free text for comparison.
///
/// Uppercases, turns `&` into ` AND `, replaces every run of characters outside
/// `[A-Z0-9]` with a single space and trims. Idempotent.
pub fn normalize(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let upper = value.to_uppercase().replace('&', " AND ");

    let mut out = String::with_capacity(upper.len());
    let mut pending_space = false;
    for c in upper.chars() {
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Split a `"620 - INFORMATION TECHNOLOGY"` style cell into `(code, description)`.
///
/// Only the first `" - "` separates; a missing separator yields an empty description.
pub fn split_code_and_description(value: &str) -> (String, String) {
    if value.is_empty() {
        return (String::new(), String::new());
    }
    match value.split_once(" - ") {
        Some((code, desc)) => (code.trim().to_string(), desc.trim().to_string()),
        None => (value.trim().to_string(), String::new()),
    }
}

/// Space-split token set of an already normalized string
pub fn tokens(normalized: &str) -> std::collections::HashSet<String> {
    normalized.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ampersand() {
        assert_eq!(normalize("Power & Light"), "POWER AND LIGHT");
    }

    #[test]
    fn test_normalize_punctuation_runs() {
        assert_eq!(normalize("  info--tech / ops. "), "INFO TECH OPS");
        assert_eq!(normalize("R&D"), "R AND D");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("***"), "");
    }

    #[test]
    fn test_normalize_is_idempotent_and_case_insensitive() {
        for s in ["Power & Light", "member-services", "GIS/Mapping  Dept", "Ünïcode café"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
            assert_eq!(normalize(&s.to_lowercase()), normalize(&s.to_uppercase()));
        }
    }

    #[test]
    fn test_split_code_and_description() {
        assert_eq!(
            split_code_and_description("620 - INFORMATION TECHNOLOGY"),
            ("620".to_string(), "INFORMATION TECHNOLOGY".to_string())
        );
        assert_eq!(
            split_code_and_description(""),
            (String::new(), String::new())
        );
        assert_eq!(
            split_code_and_description("700"),
            ("700".to_string(), String::new())
        );
    }

    #[test]
    fn test_split_only_on_first_separator() {
        assert_eq!(
            split_code_and_description("561 - LOAD - DISPATCHING"),
            ("561".to_string(), "LOAD - DISPATCHING".to_string())
        );
        // Hyphen without surrounding spaces is not a separator
        assert_eq!(
            split_code_and_description("5500-TRAINING"),
            ("5500-TRAINING".to_string(), String::new())
        );
    }

    #[test]
    fn test_tokens() {
        let t = tokens("INFORMATION TECHNOLOGY");
        assert_eq!(t.len(), 2);
        assert!(t.contains("INFORMATION"));
    }
}
