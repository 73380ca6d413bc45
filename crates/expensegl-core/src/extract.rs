//! Tolerant extraction from arbitrarily shaped JSON
//!
//! Upstream services (per diem API, directory search index, OCR) return JSON
//! whose shape drifts between versions and deployments. These helpers walk a
//! [`serde_json::Value`] and never fail: a missing or mistyped field is `None`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Keys that carry the combined meals & incidentals rate directly
const DAILY_RATE_KEYS: &[&str] = &["mie", "MIE", "mealsAndIncidental", "meals_incidental", "m_and_ie"];
const MEALS_KEYS: &[&str] = &["meals", "Meals"];
const INCIDENTAL_KEYS: &[&str] = &["incidental", "Incidentals", "incidentals"];

/// Keys that may hold a person's email in a directory document
const DOCUMENT_EMAIL_KEYS: &[&str] = &["email", "upn", "userPrincipalName", "mail", "Email", "UPN", "Mail"];

/// Same keys, in the order the embedded user JSON usually carries them
const CHUNK_EMAIL_KEYS: &[&str] = &["UPN", "Mail", "Email", "email", "upn", "userPrincipalName", "mail"];

static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

/// Email embedded in a document path, e.g. `KBOC/user@corp.coop.json`
static RE_PATH_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([^/\\]+@[^/\\]+\.[^/\\]+)\.json").expect("valid regex")
});

/// Parse a number from a JSON number or a `"$1,234.50"` style string
pub fn extract_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let stripped: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
            let cleaned = stripped.trim();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

/// Find a daily meals & incidentals rate anywhere in a JSON document.
///
/// At each object: a direct M&IE key wins; otherwise `meals` alone is the
/// full rate and `meals` + `incidentals` are summed. Failing both, nested
/// values are searched depth-first and the first hit is returned.
pub fn find_daily_rate(value: &Value) -> Option<f64> {
    match value {
        Value::Object(obj) => {
            if let Some(rate) = DAILY_RATE_KEYS
                .iter()
                .filter_map(|k| obj.get(*k))
                .find_map(extract_number)
            {
                return Some(rate);
            }

            // Later keys overwrite earlier ones, present-but-unparseable included
            let meals = last_present(obj, MEALS_KEYS);
            let incidental = last_present(obj, INCIDENTAL_KEYS);
            match (meals, incidental) {
                (Some(m), None) => return Some(m),
                (Some(m), Some(i)) => return Some(m + i),
                _ => {}
            }

            obj.values().find_map(find_daily_rate)
        }
        Value::Array(items) => items.iter().find_map(find_daily_rate),
        _ => None,
    }
}

fn last_present(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .last()
        .and_then(extract_number)
}

/// Render a scalar as trimmed text; `None` for null, containers and blanks
pub fn value_text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// First non-blank value among `keys`.
///
/// Each key is tried exactly, then case-insensitively, before moving on.
pub fn first_str(value: &Value, keys: &[&str]) -> Option<String> {
    let obj = value.as_object()?;
    keys.iter().find_map(|key| {
        obj.get(*key).and_then(value_text).or_else(|| {
            obj.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .and_then(|(_, v)| value_text(v))
        })
    })
}

/// First non-blank value among `keys`, exact key names only
pub fn first_exact_str(value: &Value, keys: &[&str]) -> Option<String> {
    let obj = value.as_object()?;
    keys.iter().find_map(|k| obj.get(*k).and_then(value_text))
}

/// Parse the JSON object some indexes store as a string in `chunk`.
///
/// Anything else (missing, not a string, not an object) is an empty object.
pub fn chunk_object(doc: &Value) -> Value {
    doc.get("chunk")
        .and_then(Value::as_str)
        .filter(|raw| raw.trim_start().starts_with('{'))
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .filter(Value::is_object)
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Lowercased email a directory document belongs to, if any.
///
/// Checked in order: a `title` that is itself an email, an email embedded in
/// `parent_id`, the configured field and common email keys, then the same
/// keys inside the `chunk` JSON.
pub fn document_email(doc: &Value, email_field: &str) -> Option<String> {
    if let Some(title) = doc.get("title").and_then(value_text) {
        let title = title.to_lowercase();
        if RE_EMAIL.is_match(&title) {
            return Some(title);
        }
    }

    let parent_id = doc
        .get("parent_id")
        .and_then(value_text)
        .or_else(|| doc.get("parentId").and_then(value_text));
    if let Some(parent_id) = parent_id {
        if let Some(caps) = RE_PATH_EMAIL.captures(&parent_id) {
            return Some(caps[1].trim().to_lowercase());
        }
    }

    let mut keys = Vec::with_capacity(DOCUMENT_EMAIL_KEYS.len() + 1);
    keys.push(email_field);
    keys.extend_from_slice(DOCUMENT_EMAIL_KEYS);
    if let Some(email) = first_exact_str(doc, &keys) {
        return Some(email.to_lowercase());
    }

    first_exact_str(&chunk_object(doc), CHUNK_EMAIL_KEYS).map(|e| e.to_lowercase())
}
