//! Department resolution: free-text department name → ledger department code
//!
//! Resolution order:
//! 1. An explicit `"CODE - NAME"` hint with a numeric code is trusted as-is
//! 2. A name that normalizes to all digits is treated as a raw code
//! 3. A unique exact match on the normalized name
//! 4. Token-overlap fuzzy match, auto-accepted only when strong and unambiguous
//!
//! Anything else returns [`MatchType::None`] with ranked candidates so the
//! caller can ask a human to choose.

use serde::Serialize;

use crate::ledger::{DepartmentEntry, Ledger};
use crate::normalize::{normalize, split_code_and_description, tokens};
use crate::overrides::DepartmentOverrides;

/// Minimum fuzzy score for auto-acceptance
pub const FUZZY_ACCEPT_THRESHOLD: f64 = 0.9;

/// Number of ranked candidates returned
pub const MAX_CANDIDATES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Fuzzy,
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentCandidate {
    pub department_code: String,
    pub department_name: String,
}

impl From<&DepartmentEntry> for DepartmentCandidate {
    fn from(e: &DepartmentEntry) -> Self {
        Self {
            department_code: e.department_code.clone(),
            department_name: e.department_name.clone(),
        }
    }
}

/// Outcome of resolving a department name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentMatch {
    pub department_code: String,
    /// Canonical ledger name (or the caller's hint for explicit codes)
    pub department_name: String,
    pub match_type: MatchType,
    pub candidates: Vec<DepartmentCandidate>,
    /// Set when an email override decided the code
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub override_used: bool,
}

impl DepartmentMatch {
    fn none(candidates: Vec<DepartmentCandidate>) -> Self {
        Self {
            department_code: String::new(),
            department_name: String::new(),
            match_type: MatchType::None,
            candidates,
            override_used: false,
        }
    }

    fn exact(code: &str, name: &str) -> Self {
        Self {
            department_code: code.to_string(),
            department_name: name.to_string(),
            match_type: MatchType::Exact,
            candidates: Vec::new(),
            override_used: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.match_type != MatchType::None
    }
}

/// Resolve a free-text department name against the ledger's departments
pub fn resolve_department_code(input_name: &str, departments: &[DepartmentEntry]) -> DepartmentMatch {
    if input_name.trim().is_empty() {
        return DepartmentMatch::none(Vec::new());
    }

    let (code_hint, name_hint) = split_code_and_description(input_name);
    if is_all_digits(&code_hint) {
        let name = if name_hint.is_empty() {
            input_name
        } else {
            name_hint.as_str()
        };
        return DepartmentMatch::exact(&code_hint, name);
    }

    let query = normalize(input_name);
    if is_all_digits(&query) {
        return DepartmentMatch::exact(&query, "");
    }

    let mut exact = departments.iter().filter(|e| e.normalized_name == query);
    if let (Some(only), None) = (exact.next(), exact.next()) {
        return DepartmentMatch::exact(&only.department_code, &only.department_name);
    }

    let query_tokens = tokens(&query);
    if query_tokens.is_empty() {
        return DepartmentMatch::none(Vec::new());
    }

    let mut scored: Vec<(f64, &DepartmentEntry)> = departments
        .iter()
        .filter_map(|e| {
            let common = query_tokens.intersection(&e.tokens).count();
            (common > 0).then(|| (common as f64 / query_tokens.len() as f64, e))
        })
        .collect();

    // Stable sort keeps ledger order among equal scores
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let candidates: Vec<DepartmentCandidate> = scored
        .iter()
        .take(MAX_CANDIDATES)
        .map(|(_, e)| DepartmentCandidate::from(*e))
        .collect();

    let Some(&(best_score, best)) = scored.first() else {
        return DepartmentMatch::none(Vec::new());
    };
    let second_score = scored.get(1).map(|(s, _)| *s).unwrap_or(0.0);

    if best_score >= FUZZY_ACCEPT_THRESHOLD && best_score > second_score {
        return DepartmentMatch {
            department_code: best.department_code.clone(),
            department_name: best.department_name.clone(),
            match_type: MatchType::Fuzzy,
            candidates,
            override_used: false,
        };
    }

    DepartmentMatch::none(candidates)
}

/// Resolve a department for a person, letting an email override win
pub fn resolve_for_email(
    email: &str,
    department_name: &str,
    ledger: &Ledger,
    overrides: &DepartmentOverrides,
) -> DepartmentMatch {
    if let Some(code) = overrides.get(email) {
        let canonical = ledger.department_name_for_code(code);
        let name = if canonical.is_empty() {
            department_name.trim().to_string()
        } else {
            canonical
        };
        let mut m = DepartmentMatch::exact(code, &name);
        m.override_used = true;
        return m;
    }

    resolve_department_code(department_name, ledger.departments())
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn departments(pairs: &[(&str, &str)]) -> Vec<DepartmentEntry> {
        pairs
            .iter()
            .map(|(code, name)| DepartmentEntry::new(code, name))
            .collect()
    }

    #[test]
    fn test_exact_match() {
        let depts = departments(&[("620", "INFORMATION TECHNOLOGY")]);
        let m = resolve_department_code("Information Technology", &depts);
        assert_eq!(m.department_code, "620");
        assert_eq!(m.department_name, "INFORMATION TECHNOLOGY");
        assert_eq!(m.match_type, MatchType::Exact);
        assert!(m.candidates.is_empty());
    }

    #[test]
    fn test_weak_overlap_is_not_accepted() {
        let depts = departments(&[("620", "INFORMATION TECHNOLOGY")]);
        let m = resolve_department_code("IT Information", &depts);
        assert_eq!(m.department_code, "");
        assert_eq!(m.department_name, "");
        assert_eq!(m.match_type, MatchType::None);
        assert_eq!(m.candidates.len(), 1);
        assert_eq!(m.candidates[0].department_code, "620");
    }

    #[test]
    fn test_explicit_code_hint_is_trusted() {
        let depts = departments(&[("620", "INFORMATION TECHNOLOGY")]);
        let m = resolve_department_code("175 - Member Services", &depts);
        assert_eq!(m.department_code, "175");
        assert_eq!(m.department_name, "Member Services");
        assert_eq!(m.match_type, MatchType::Exact);
    }

    #[test]
    fn test_non_numeric_hint_is_not_trusted() {
        let depts = departments(&[("620", "INFORMATION TECHNOLOGY")]);
        let m = resolve_department_code("IT - Information Technology", &depts);
        // Normalized "IT INFORMATION TECHNOLOGY": 2 of 3 tokens overlap
        assert_eq!(m.match_type, MatchType::None);
        assert_eq!(m.candidates.len(), 1);
    }

    #[test]
    fn test_raw_digits() {
        // Bare code: the hint path keeps the caller's text as the name
        let m = resolve_department_code("620", &[]);
        assert_eq!(m.department_code, "620");
        assert_eq!(m.department_name, "620");
        assert_eq!(m.match_type, MatchType::Exact);

        // Decorated code only becomes digits after normalization
        let m = resolve_department_code("#620.", &[]);
        assert_eq!(m.department_code, "620");
        assert_eq!(m.department_name, "");
        assert_eq!(m.match_type, MatchType::Exact);
    }

    #[test]
    fn test_fuzzy_accepts_full_coverage_when_unique() {
        let depts = departments(&[
            ("620", "INFORMATION TECHNOLOGY SERVICES"),
            ("175", "MEMBER SERVICES"),
        ]);
        let m = resolve_department_code("Information Technology", &depts);
        assert_eq!(m.match_type, MatchType::Fuzzy);
        assert_eq!(m.department_code, "620");
        assert_eq!(m.candidates.len(), 1);
    }

    #[test]
    fn test_fuzzy_tie_is_not_accepted() {
        let depts = departments(&[
            ("100", "ENGINEERING NORTH"),
            ("200", "ENGINEERING SOUTH"),
        ]);
        let m = resolve_department_code("Engineering", &depts);
        assert_eq!(m.match_type, MatchType::None);
        assert_eq!(m.candidates.len(), 2);
        // Ledger order preserved among equal scores
        assert_eq!(m.candidates[0].department_code, "100");
    }

    #[test]
    fn test_duplicate_exact_names_fall_through() {
        let depts = departments(&[("100", "OPERATIONS"), ("200", "OPERATIONS")]);
        let m = resolve_department_code("operations", &depts);
        assert_eq!(m.match_type, MatchType::None);
        assert_eq!(m.candidates.len(), 2);
    }

    #[test]
    fn test_candidates_capped_and_ranked() {
        let depts = departments(&[
            ("1", "FIELD A"),
            ("2", "FIELD B"),
            ("3", "FIELD C"),
            ("4", "FIELD D"),
            ("5", "FIELD E"),
            ("6", "FIELD SERVICES CREW"),
            ("7", "UNRELATED"),
        ]);
        let m = resolve_department_code("Field Services", &depts);
        assert_eq!(m.match_type, MatchType::Fuzzy);
        assert_eq!(m.department_code, "6");
        assert_eq!(m.candidates.len(), MAX_CANDIDATES);
        assert_eq!(m.candidates[0].department_code, "6");
        assert_eq!(m.candidates[1].department_code, "1");
    }

    #[test]
    fn test_empty_and_symbol_only_input() {
        let depts = departments(&[("620", "INFORMATION TECHNOLOGY")]);
        assert_eq!(resolve_department_code("", &depts), DepartmentMatch::none(vec![]));
        assert_eq!(resolve_department_code("---", &depts), DepartmentMatch::none(vec![]));
        assert_eq!(resolve_department_code("Payroll", &depts), DepartmentMatch::none(vec![]));
    }

    #[test]
    fn test_email_override_wins() {
        let ledger = Ledger::from_parts(vec![], departments(&[("175", "MEMBER SERVICES")]));
        let overrides = DepartmentOverrides::from_pairs([("jdoe@corp.coop", "175")]);

        let m = resolve_for_email("JDoe@corp.coop", "Information Technology", &ledger, &overrides);
        assert_eq!(m.department_code, "175");
        assert_eq!(m.department_name, "MEMBER SERVICES");
        assert_eq!(m.match_type, MatchType::Exact);
        assert!(m.override_used);

        // Unknown override code keeps the directory's name
        let overrides = DepartmentOverrides::from_pairs([("jdoe@corp.coop", "999")]);
        let m = resolve_for_email("jdoe@corp.coop", "Line Crew", &ledger, &overrides);
        assert_eq!(m.department_code, "999");
        assert_eq!(m.department_name, "Line Crew");

        // No override → normal resolution
        let m = resolve_for_email("other@corp.coop", "Member Services", &ledger, &overrides);
        assert_eq!(m.department_code, "175");
        assert!(!m.override_used);
    }
}
