//! Expense code ledger loading
//!
//! The ledger is a CSV export with (at least) `department`, `activity` and
//! `account` columns, each cell formatted `"<code> - <description>"`:
//!
//! ```text
//! department,activity,account
//! 620 - INFORMATION TECHNOLOGY,770 - TRAINING,5500 - CONFERENCES
//! ```
//!
//! Rows missing any of the three codes are skipped; they are a data-quality
//! issue in the export, not a load failure.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::normalize::{normalize, split_code_and_description, tokens};

/// One valid (department, activity, account) combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRow {
    pub department_code: String,
    pub activity_code: String,
    pub account_code: String,
    /// Description of the account code
    pub description: String,
}

/// A unique department as observed in the ledger (first occurrence wins)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentEntry {
    pub department_code: String,
    pub department_name: String,
    pub normalized_name: String,
    pub tokens: HashSet<String>,
}

impl DepartmentEntry {
    pub fn new(code: &str, name: &str) -> Self {
        let normalized_name = normalize(name);
        let tokens = tokens(&normalized_name);
        Self {
            department_code: code.to_string(),
            department_name: name.to_string(),
            normalized_name,
            tokens,
        }
    }
}

/// Account code available for a department/activity pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCode {
    pub account_code: String,
    pub description: String,
}

/// In-memory ledger: reference rows plus the derived department list
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    rows: Vec<ReferenceRow>,
    departments: Vec<DepartmentEntry>,
}

/// Column positions resolved from the header row
struct Columns {
    department: Option<usize>,
    activity: Option<usize>,
    account: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| {
            headers.iter().position(|h| {
                h.trim_start_matches('\u{feff}')
                    .trim()
                    .eq_ignore_ascii_case(name)
            })
        };
        Self {
            department: find("department"),
            activity: find("activity"),
            account: find("account"),
        }
    }

    fn cell<'a>(record: &'a StringRecord, index: Option<usize>) -> &'a str {
        index.and_then(|i| record.get(i)).unwrap_or("")
    }
}

impl Ledger {
    /// Parse a ledger from CSV data
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns = Columns::from_headers(rdr.headers()?);

        let mut rows = Vec::new();
        let mut departments = Vec::new();
        let mut seen_departments = HashSet::new();
        let mut skipped = 0usize;

        for (line, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    debug!(line = line + 2, error = %e, "Skipping unreadable ledger row");
                    skipped += 1;
                    continue;
                }
            };

            let (dept_code, dept_name) =
                split_code_and_description(Columns::cell(&record, columns.department));
            let (act_code, _) =
                split_code_and_description(Columns::cell(&record, columns.activity));
            let (acct_code, acct_desc) =
                split_code_and_description(Columns::cell(&record, columns.account));

            // Department list is built from every row that names a department,
            // even when the activity/account cells are unusable.
            if !dept_code.is_empty()
                && !dept_name.is_empty()
                && seen_departments.insert(dept_code.clone())
            {
                departments.push(DepartmentEntry::new(&dept_code, &dept_name));
            }

            if dept_code.is_empty() || act_code.is_empty() || acct_code.is_empty() {
                skipped += 1;
                continue;
            }

            rows.push(ReferenceRow {
                department_code: dept_code,
                activity_code: act_code,
                account_code: acct_code,
                description: acct_desc,
            });
        }

        debug!(
            rows = rows.len(),
            departments = departments.len(),
            skipped,
            "Parsed expense code ledger"
        );

        Ok(Self { rows, departments })
    }

    /// Load a ledger file; a missing file yields an empty ledger
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Expense code ledger not found, using empty ledger");
            return Ok(Self::default());
        }
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Build a ledger directly from parts (tests, alternate sources)
    pub fn from_parts(rows: Vec<ReferenceRow>, departments: Vec<DepartmentEntry>) -> Self {
        Self { rows, departments }
    }

    pub fn rows(&self) -> &[ReferenceRow] {
        &self.rows
    }

    pub fn departments(&self) -> &[DepartmentEntry] {
        &self.departments
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.departments.is_empty()
    }

    /// Account codes valid for a department/activity pair, deduplicated by code
    pub fn account_codes(&self, department_code: &str, activity_code: &str) -> Vec<AccountCode> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|r| r.department_code == department_code && r.activity_code == activity_code)
            .filter(|r| seen.insert(r.account_code.as_str()))
            .map(|r| AccountCode {
                account_code: r.account_code.clone(),
                description: r.description.clone(),
            })
            .collect()
    }

    /// Canonical department name for a code, empty when unknown
    pub fn department_name_for_code(&self, department_code: &str) -> String {
        let code = department_code.trim();
        if code.is_empty() {
            return String::new();
        }
        self.departments
            .iter()
            .find(|d| d.department_code == code)
            .map(|d| d.department_name.trim().to_string())
            .unwrap_or_default()
    }
}

/// Where the ledger comes from
///
/// The default source is a CSV file on disk; tests inject in-memory ledgers.
pub trait LedgerSource: Send + Sync {
    /// Human-readable description for logging
    fn describe(&self) -> String;

    /// Load the full ledger
    fn load(&self) -> Result<Ledger>;
}

/// Ledger read from a CSV file
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerSource for CsvFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Ledger> {
        Ledger::from_path(&self.path)
    }
}

/// Ledger that is already in memory
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    ledger: Ledger,
}

impl StaticSource {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Parse CSV text up front
    pub fn from_csv(csv: &str) -> Result<Self> {
        Ok(Self::new(Ledger::from_reader(csv.as_bytes())?))
    }
}

impl LedgerSource for StaticSource {
    fn describe(&self) -> String {
        "in-memory".to_string()
    }

    fn load(&self) -> Result<Ledger> {
        Ok(self.ledger.clone())
    }
}
