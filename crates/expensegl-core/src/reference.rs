//! Process-wide reference data: the expense code ledger and email overrides
//!
//! Both are loaded lazily on first use and then kept for the life of the
//! process. Two threads racing the first load may both compute it; the
//! result is identical and only one is kept.

use std::sync::OnceLock;

use tracing::{info, warn};

use crate::department::{resolve_department_code, resolve_for_email, DepartmentMatch};
use crate::ledger::{AccountCode, CsvFileSource, Ledger, LedgerSource, StaticSource};
use crate::overrides::DepartmentOverrides;

pub struct ReferenceData {
    source: Box<dyn LedgerSource>,
    overrides_json: String,
    ledger: OnceLock<Ledger>,
    overrides: OnceLock<DepartmentOverrides>,
}

impl std::fmt::Debug for ReferenceData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceData")
            .field("source", &self.source.describe())
            .field("ledger_loaded", &self.ledger.get().is_some())
            .finish()
    }
}

impl ReferenceData {
    pub fn new(source: Box<dyn LedgerSource>, overrides_json: impl Into<String>) -> Self {
        Self {
            source,
            overrides_json: overrides_json.into(),
            ledger: OnceLock::new(),
            overrides: OnceLock::new(),
        }
    }

    /// Ledger CSV on disk plus the configured override JSON
    pub fn from_csv_path(path: impl Into<std::path::PathBuf>, overrides_json: &str) -> Self {
        Self::new(Box::new(CsvFileSource::new(path)), overrides_json)
    }

    /// Already-loaded ledger (tests, embedding)
    pub fn from_ledger(ledger: Ledger, overrides: DepartmentOverrides) -> Self {
        let data = Self::new(Box::new(StaticSource::new(ledger)), "");
        let _ = data.overrides.set(overrides);
        data
    }

    /// The cached ledger, loading it on first use.
    ///
    /// A load failure is logged and cached as an empty ledger.
    pub fn ledger(&self) -> &Ledger {
        self.ledger.get_or_init(|| match self.source.load() {
            Ok(ledger) => {
                info!(
                    source = %self.source.describe(),
                    rows = ledger.rows().len(),
                    departments = ledger.departments().len(),
                    "Loaded expense code ledger"
                );
                ledger
            }
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "Failed to load expense code ledger");
                Ledger::default()
            }
        })
    }

    pub fn overrides(&self) -> &DepartmentOverrides {
        self.overrides
            .get_or_init(|| DepartmentOverrides::from_json(&self.overrides_json))
    }

    pub fn account_codes(&self, department_code: &str, activity_code: &str) -> Vec<AccountCode> {
        self.ledger().account_codes(department_code, activity_code)
    }

    pub fn department_name_for_code(&self, department_code: &str) -> String {
        self.ledger().department_name_for_code(department_code)
    }

    pub fn resolve_department(&self, department_name: &str) -> DepartmentMatch {
        resolve_department_code(department_name, self.ledger().departments())
    }

    /// Resolve for a person; an email override wins over the name
    pub fn resolve_department_for_email(&self, email: &str, department_name: &str) -> DepartmentMatch {
        resolve_for_email(email, department_name, self.ledger(), self.overrides())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::department::MatchType;
    use crate::error::{Error, Result};

    struct CountingSource {
        loads: Arc<AtomicUsize>,
        fail: bool,
    }

    impl LedgerSource for CountingSource {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        fn load(&self) -> Result<Ledger> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::InvalidData("boom".into()));
            }
            Ledger::from_reader(
                "department,activity,account\n620 - INFORMATION TECHNOLOGY,770 - TRAINING,5500 - CONFERENCES\n"
                    .as_bytes(),
            )
        }
    }

    #[test]
    fn test_ledger_loaded_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let data = ReferenceData::new(
            Box::new(CountingSource { loads: loads.clone(), fail: false }),
            "",
        );

        assert_eq!(data.account_codes("620", "770").len(), 1);
        assert_eq!(data.department_name_for_code("620"), "INFORMATION TECHNOLOGY");
        assert_eq!(data.resolve_department("information technology").match_type, MatchType::Exact);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_is_cached_empty() {
        let loads = Arc::new(AtomicUsize::new(0));
        let data = ReferenceData::new(
            Box::new(CountingSource { loads: loads.clone(), fail: true }),
            "",
        );

        assert!(data.ledger().is_empty());
        assert!(data.ledger().is_empty());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_overrides_from_config() {
        let data = ReferenceData::new(
            Box::new(StaticSource::default()),
            r#"{"jdoe@corp.coop": "175"}"#,
        );
        let m = data.resolve_department_for_email("JDOE@corp.coop", "Whatever");
        assert_eq!(m.department_code, "175");
        assert!(m.override_used);
    }

    #[test]
    fn test_concurrent_first_use() {
        let data = Arc::new(ReferenceData::from_ledger(Ledger::default(), DepartmentOverrides::default()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let data = data.clone();
                std::thread::spawn(move || data.ledger().rows().len())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 0);
        }
    }
}
