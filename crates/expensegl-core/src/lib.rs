//! ExpenseGL Core Library
//!
//! Shared functionality for the expense reporting assistant:
//! - Text normalization for fuzzy name matching
//! - Expense code ledger loading and queries
//! - Department name resolution with email overrides
//! - Free-text travel date parsing
//! - Tolerant extractors for heterogeneous upstream JSON
//! - GL import row generation (61-column CSV)
//! - Directory, per diem and mail clients behind pluggable traits
//! - Report submission with mail gating
//! - Receipt category suggestion

pub mod config;
pub mod dates;
pub mod department;
pub mod directory;
pub mod error;
pub mod expense;
pub mod extract;
pub mod gl_import;
pub mod ledger;
pub mod location;
pub mod normalize;
pub mod overrides;
pub mod per_diem;
pub mod receipt;
pub mod reference;
pub mod report;

/// Test utilities including mock upstream server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{default_config_path, DirectorySettings, MailSettings, PerDiemSettings, Settings};
pub use dates::{parse_date, TravelTimezone};
pub use department::{
    resolve_department_code, resolve_for_email, DepartmentCandidate, DepartmentMatch, MatchType,
};
pub use directory::{
    DirectoryClient, DirectoryLookup, DirectoryProfile, HttpSearchIndex, LookupAttempt,
    LookupOutcome, MockSearchIndex, SearchIndex,
};
pub use error::{Error, Result};
pub use expense::{ExpenseItem, ExpenseLine, ExpenseReport, ItemType, Requester};
pub use extract::{document_email, extract_number, find_daily_rate};
pub use gl_import::{build_import_rows, import_csv_string, write_import_csv, ImportRow, IMPORT_COLUMNS};
pub use ledger::{AccountCode, CsvFileSource, DepartmentEntry, Ledger, LedgerSource, ReferenceRow, StaticSource};
pub use location::{fiscal_year, parse_city_state};
pub use normalize::{normalize, split_code_and_description};
pub use overrides::DepartmentOverrides;
pub use per_diem::{
    HttpPerDiemApi, HttpZipGeocoder, MockPerDiemApi, MockZipGeocoder, PerDiemApi, PerDiemLocation,
    PerDiemQuote, PerDiemService, ZipGeocoder,
};
pub use receipt::{suggest_receipt_category, ReceiptCategory, ReceiptSummary};
pub use reference::ReferenceData;
pub use report::{
    submit_report, GraphMailer, Mailer, MockMailer, OutgoingMail, ReportSummary, SubmitResult,
};
