//! Settings
//!
//! Resolved in layers: built-in defaults, then an optional TOML file, then
//! environment variables (the names used by the deployed functions).
//!
//! ```toml
//! expense_codes_csv = "/srv/expensegl/expense_codes.csv"
//! travel_timezone = "America/Denver"
//!
//! [department_overrides]
//! "jdoe@corp.coop" = "175"
//!
//! [directory]
//! endpoint = "corp-search"          # expands to https://corp-search.search.windows.net
//! index = "orgchart"
//! api_key = "..."
//!
//! [per_diem]
//! api_key = "..."
//!
//! [mail]
//! enabled = true
//! from_user = "expenses@corp.coop"
//! to_default = "ap@corp.coop"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::expense::parse_flag;

pub const DEFAULT_EXPENSE_CODES_CSV: &str = "expense_codes.csv";
pub const DEFAULT_SEARCH_API_VERSION: &str = "2023-11-01";
pub const DEFAULT_EMAIL_FIELD: &str = "email";
pub const DEFAULT_PER_DIEM_BASE_URL: &str = "https://api.gsa.gov/travel/perdiem/v2";
pub const DEFAULT_ZIP_GEOCODE_BASE_URL: &str = "https://api.zippopotam.us/us";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 7_000_000;

/// Directory search index connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySettings {
    pub endpoint: String,
    pub index: String,
    pub api_key: String,
    pub api_version: String,
    /// Document field holding the person's email
    pub email_field: String,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            index: String::new(),
            api_key: String::new(),
            api_version: DEFAULT_SEARCH_API_VERSION.to_string(),
            email_field: DEFAULT_EMAIL_FIELD.to_string(),
        }
    }
}

impl DirectorySettings {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.index.is_empty() && !self.api_key.is_empty()
    }

    /// Service base URL; a bare service name expands to the hosted domain
    pub fn base_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() || endpoint.to_lowercase().starts_with("http") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}.search.windows.net")
        }
    }

    /// Document search URL for the configured index
    pub fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.base_url(),
            self.index,
            self.api_version
        )
    }
}

/// Per diem rate API and ZIP geocoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerDiemSettings {
    pub api_key: String,
    pub base_url: String,
    pub zip_geocode_base_url: String,
}

impl Default for PerDiemSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_PER_DIEM_BASE_URL.to_string(),
            zip_geocode_base_url: DEFAULT_ZIP_GEOCODE_BASE_URL.to_string(),
        }
    }
}

/// Report mail delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    /// Master switch; a request alone can never send mail
    pub enabled: bool,
    pub from_user: String,
    pub to_default: String,
    pub access_token: String,
    pub graph_base_url: String,
    pub max_attachment_bytes: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            from_user: String::new(),
            to_default: String::new(),
            access_token: String::new(),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub expense_codes_csv: PathBuf,
    pub travel_timezone: String,
    /// JSON object of email → department code
    pub department_overrides_json: String,
    pub directory: DirectorySettings,
    pub per_diem: PerDiemSettings,
    pub mail: MailSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            expense_codes_csv: PathBuf::from(DEFAULT_EXPENSE_CODES_CSV),
            travel_timezone: crate::dates::DEFAULT_TIMEZONE.to_string(),
            department_overrides_json: String::new(),
            directory: DirectorySettings::default(),
            per_diem: PerDiemSettings::default(),
            mail: MailSettings::default(),
        }
    }
}

/// Default settings file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("expensegl").join("config.toml"))
}

impl Settings {
    /// Load defaults → settings file → process environment.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut settings = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Defaults plus the environment, no settings file
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env(|key| std::env::var(key).ok());
        settings
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::InvalidData(format!("Failed to read settings {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded settings file");
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawSettings = toml::from_str(content)?;
        let mut settings = Self::default();

        set_path(&mut settings.expense_codes_csv, raw.expense_codes_csv);
        set(&mut settings.travel_timezone, raw.travel_timezone);
        if let Some(overrides) = raw.department_overrides {
            settings.department_overrides_json = serde_json::to_string(&overrides)?;
        }

        if let Some(dir) = raw.directory {
            set(&mut settings.directory.endpoint, dir.endpoint);
            set(&mut settings.directory.index, dir.index);
            set(&mut settings.directory.api_key, dir.api_key);
            set(&mut settings.directory.api_version, dir.api_version);
            set(&mut settings.directory.email_field, dir.email_field);
        }

        if let Some(pd) = raw.per_diem {
            set(&mut settings.per_diem.api_key, pd.api_key);
            set(&mut settings.per_diem.base_url, pd.base_url);
            set(&mut settings.per_diem.zip_geocode_base_url, pd.zip_geocode_base_url);
        }

        if let Some(mail) = raw.mail {
            if let Some(enabled) = mail.enabled {
                settings.mail.enabled = enabled;
            }
            set(&mut settings.mail.from_user, mail.from_user);
            set(&mut settings.mail.to_default, mail.to_default);
            set(&mut settings.mail.access_token, mail.access_token);
            set(&mut settings.mail.graph_base_url, mail.graph_base_url);
            if let Some(max) = mail.max_attachment_bytes {
                settings.mail.max_attachment_bytes = max;
            }
        }

        Ok(settings)
    }

    /// Overlay environment variables; blank values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        set_path(&mut self.expense_codes_csv, var("EXPENSE_CODES_CSV"));
        set(&mut self.travel_timezone, var("TRAVEL_TIMEZONE"));
        set(&mut self.department_overrides_json, var("ORGCHART_DEPT_EMAIL_OVERRIDES"));

        set(&mut self.directory.endpoint, var("ORGCHART_SEARCH_ENDPOINT"));
        set(&mut self.directory.index, var("ORGCHART_SEARCH_INDEX"));
        set(&mut self.directory.api_key, var("ORGCHART_SEARCH_API_KEY"));
        set(&mut self.directory.api_version, var("ORGCHART_SEARCH_API_VERSION"));
        set(&mut self.directory.email_field, var("ORGCHART_SEARCH_EMAIL_FIELD"));

        set(&mut self.per_diem.api_key, var("GSA_API_KEY"));
        set(&mut self.per_diem.base_url, var("GSA_PER_DIEM_BASE_URL"));
        set(&mut self.per_diem.zip_geocode_base_url, var("ZIP_GEOCODE_BASE_URL"));

        if let Some(enabled) = var("ENABLE_EMAIL_SEND") {
            self.mail.enabled = parse_flag(&enabled).unwrap_or(false);
        }
        set(&mut self.mail.from_user, var("MAIL_FROM_USER"));
        set(&mut self.mail.to_default, var("MAIL_TO_DEFAULT"));
        set(&mut self.mail.access_token, var("GRAPH_ACCESS_TOKEN"));
        set(&mut self.mail.graph_base_url, var("GRAPH_BASE_URL"));
        if let Some(max) = var("GRAPH_MAX_ATTACHMENT_BYTES").and_then(|v| v.parse().ok()) {
            self.mail.max_attachment_bytes = max;
        }
    }
}

fn set(target: &mut String, value: Option<String>) {
    if let Some(v) = value {
        *target = v;
    }
}

fn set_path(target: &mut PathBuf, value: Option<String>) {
    if let Some(v) = value {
        *target = PathBuf::from(v);
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    expense_codes_csv: Option<String>,
    travel_timezone: Option<String>,
    department_overrides: Option<BTreeMap<String, String>>,
    directory: Option<RawDirectory>,
    per_diem: Option<RawPerDiem>,
    mail: Option<RawMail>,
}

#[derive(Debug, Deserialize)]
struct RawDirectory {
    endpoint: Option<String>,
    index: Option<String>,
    api_key: Option<String>,
    api_version: Option<String>,
    email_field: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPerDiem {
    api_key: Option<String>,
    base_url: Option<String>,
    zip_geocode_base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMail {
    enabled: Option<bool>,
    from_user: Option<String>,
    to_default: Option<String>,
    access_token: Option<String>,
    graph_base_url: Option<String>,
    max_attachment_bytes: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.expense_codes_csv, PathBuf::from("expense_codes.csv"));
        assert_eq!(s.travel_timezone, "America/Denver");
        assert_eq!(s.directory.api_version, "2023-11-01");
        assert_eq!(s.directory.email_field, "email");
        assert_eq!(s.per_diem.base_url, DEFAULT_PER_DIEM_BASE_URL);
        assert!(!s.mail.enabled);
        assert_eq!(s.mail.max_attachment_bytes, 7_000_000);
        assert!(!s.directory.is_configured());
    }

    #[test]
    fn test_toml_layer() {
        let s = Settings::from_toml(
            r#"
            expense_codes_csv = "/data/codes.csv"

            [department_overrides]
            "jdoe@corp.coop" = "175"

            [directory]
            endpoint = "corp-search"
            index = "orgchart"
            api_key = "k"

            [mail]
            enabled = true
            max_attachment_bytes = 100
            "#,
        )
        .unwrap();

        assert_eq!(s.expense_codes_csv, PathBuf::from("/data/codes.csv"));
        assert_eq!(s.department_overrides_json, r#"{"jdoe@corp.coop":"175"}"#);
        assert!(s.directory.is_configured());
        assert_eq!(s.directory.base_url(), "https://corp-search.search.windows.net");
        assert_eq!(
            s.directory.search_url(),
            "https://corp-search.search.windows.net/indexes/orgchart/docs/search?api-version=2023-11-01"
        );
        assert!(s.mail.enabled);
        assert_eq!(s.mail.max_attachment_bytes, 100);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(matches!(Settings::from_toml("expense_codes_csv = ["), Err(Error::Toml(_))));
    }

    #[test]
    fn test_env_layer_wins() {
        let mut s = Settings::from_toml("travel_timezone = \"UTC\"").unwrap();
        s.apply_env(env(&[
            ("TRAVEL_TIMEZONE", "America/Phoenix"),
            ("ORGCHART_SEARCH_ENDPOINT", "https://search.example.com/"),
            ("ENABLE_EMAIL_SEND", "yes"),
            ("GRAPH_MAX_ATTACHMENT_BYTES", "not a number"),
            ("MAIL_FROM_USER", "   "),
        ]));

        assert_eq!(s.travel_timezone, "America/Phoenix");
        assert_eq!(s.directory.base_url(), "https://search.example.com");
        assert!(s.mail.enabled);
        assert_eq!(s.mail.max_attachment_bytes, DEFAULT_MAX_ATTACHMENT_BYTES);
        assert_eq!(s.mail.from_user, "");
    }

    #[test]
    fn test_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[per_diem]\napi_key = \"abc\"\n").unwrap();

        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.per_diem.api_key, "abc");
        assert!(Settings::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
