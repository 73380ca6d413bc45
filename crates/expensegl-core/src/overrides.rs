//! Email → department code overrides
//!
//! Escape hatch for directory data that cannot identify a unique department
//! (several cost centers sharing one org chart department name). Configured as
//! a JSON object, e.g. `{"user@corp.coop": "175"}`.

use std::collections::HashMap;

use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentOverrides {
    by_email: HashMap<String, String>,
}

impl DepartmentOverrides {
    /// Parse the configured JSON object.
    ///
    /// Malformed JSON, or anything other than an object, means "no overrides".
    /// Entries with an empty email or code are dropped.
    pub fn from_json(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::default();
        }

        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed department override JSON");
                return Self::default();
            }
        };

        let Some(obj) = value.as_object() else {
            warn!("Ignoring department overrides: expected a JSON object");
            return Self::default();
        };

        let by_email = obj
            .iter()
            .filter_map(|(email, code)| {
                let email = email.trim().to_lowercase();
                let code = match code {
                    serde_json::Value::String(s) => s.trim().to_string(),
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => String::new(),
                };
                (!email.is_empty() && !code.is_empty()).then_some((email, code))
            })
            .collect();

        Self { by_email }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self {
            by_email: pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_lowercase(), v.as_ref().trim().to_string()))
                .collect(),
        }
    }

    /// Department code for an email (case-insensitive)
    pub fn get(&self, email: &str) -> Option<&str> {
        let key = email.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.by_email.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let o = DepartmentOverrides::from_json(
            r#"{"User@Corp.coop": "175", " other@corp.coop ": 180, "": "1", "x@corp.coop": ""}"#,
        );
        assert_eq!(o.len(), 2);
        assert_eq!(o.get("user@corp.coop"), Some("175"));
        assert_eq!(o.get("  USER@CORP.COOP"), Some("175"));
        assert_eq!(o.get("other@corp.coop"), Some("180"));
        assert_eq!(o.get("x@corp.coop"), None);
    }

    #[test]
    fn test_malformed_overrides_fail_open() {
        assert!(DepartmentOverrides::from_json("{not json").is_empty());
        assert!(DepartmentOverrides::from_json(r#"["a", "b"]"#).is_empty());
        assert!(DepartmentOverrides::from_json("").is_empty());
    }
}
