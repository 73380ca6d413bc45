//! Integration tests for expensegl-core
//!
//! These tests exercise the full ledger → department → GL import workflow.

use std::io::Write;

use chrono::NaiveDate;
use expensegl_core::{
    build_import_rows, import_csv_string, parse_date, report::ReportSummary, ExpenseReport,
    MatchType, ReferenceData, IMPORT_COLUMNS,
};
use serde_json::json;

/// Ledger export with a BOM, mixed-case headers and one junk row
fn ledger_csv() -> &'static str {
    "\u{feff}Department,Activity,Account\n\
     620 - INFORMATION TECHNOLOGY,100 - GENERAL,5510 - MILEAGE\n\
     620 - INFORMATION TECHNOLOGY,770 - TRAINING,5500 - CONFERENCES\n\
     620 - INFORMATION TECHNOLOGY,770 - TRAINING,5500 - CONFERENCES (DUP)\n\
     620 - INFORMATION TECHNOLOGY,770 - TRAINING,5520 - MEALS\n\
     175 - MEMBER SERVICES,100 - GENERAL,5510 - MILEAGE\n\
     ,,\n"
}

fn write_ledger() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(ledger_csv().as_bytes()).unwrap();
    file
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()
}

// =============================================================================
// Reference Data
// =============================================================================

#[test]
fn test_ledger_queries_from_file() {
    let file = write_ledger();
    let data = ReferenceData::from_csv_path(file.path(), "");

    let codes = data.account_codes("620", "770");
    let accounts: Vec<_> = codes.iter().map(|c| c.account_code.as_str()).collect();
    assert_eq!(accounts, vec!["5500", "5520"]);
    assert_eq!(codes[0].description, "CONFERENCES");

    assert_eq!(data.department_name_for_code("175"), "MEMBER SERVICES");
    assert_eq!(data.department_name_for_code("999"), "");
}

#[test]
fn test_missing_ledger_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let data = ReferenceData::from_csv_path(dir.path().join("missing.csv"), "");
    assert!(data.ledger().is_empty());
    assert!(data.account_codes("620", "770").is_empty());
    assert_eq!(data.resolve_department("Information Technology").match_type, MatchType::None);
}

#[test]
fn test_department_resolution_workflow() {
    let file = write_ledger();
    let data = ReferenceData::from_csv_path(file.path(), r#"{"boss@corp.coop": "175"}"#);

    let exact = data.resolve_department("Information-Technology");
    assert_eq!(exact.match_type, MatchType::Exact);
    assert_eq!(exact.department_code, "620");

    let by_code = data.resolve_department("175 - Member Svcs");
    assert_eq!(by_code.match_type, MatchType::Exact);
    assert_eq!(by_code.department_code, "175");

    let overridden = data.resolve_department_for_email(" Boss@Corp.coop ", "Information Technology");
    assert_eq!(overridden.department_code, "175");
    assert_eq!(overridden.department_name, "MEMBER SERVICES");
    assert!(overridden.override_used);

    let unknown = data.resolve_department("Facilities");
    assert_eq!(unknown.match_type, MatchType::None);
    assert!(unknown.department_code.is_empty());
}

// =============================================================================
// GL Import
// =============================================================================

#[test]
fn test_report_to_import_csv() {
    let report = ExpenseReport::from_body(
        &json!({
            "division": "0100",
            "requester": {"organizationName": "Doe, Jane", "firstName": "Jane", "lastName": "Doe"},
            "draftItemsJson": json!([
                {"type": "perdiem", "departmentCode": "620", "activityCode": "770",
                 "accountCode": "5520", "amount": 79, "description": "Denver 3/4-3/6"},
                {"type": "receipt", "departmentCode": "620", "activityCode": "100", "accountCode": "5510",
                 "glAccountOverride": "5590",
                 "lines": [{"amount": "10.50"}, {"amount": 4.5, "activityCode": "770"}]}
            ]).to_string()
        })
        .to_string(),
    );

    let rows: Vec<_> = build_import_rows(&report, today()).collect();
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0].gl_division, "0100");
    assert_eq!(rows[0].invoice, "PER DIEM 02-2026");
    assert_eq!(rows[0].reference, "TRAINING/EDUCATION");
    assert_eq!(rows[0].amount, "79.00");

    assert_eq!(rows[1].gl_account, "5590");
    assert_eq!(rows[1].gl_activity, "100");
    assert_eq!(rows[1].reference, "EXPENSES / MILEAGE");
    assert_eq!(
        rows[1].extended_reference,
        "ACCT=5510 | OVERRIDE=5590; ORIGINAL_ACCT=5510"
    );
    assert_eq!(rows[2].gl_activity, "770");

    let summary = ReportSummary::from_rows(&rows);
    assert_eq!(summary.line_count, 3);
    assert_eq!(summary.amount_total, 94.0);
    assert_eq!(summary.missing_gl_count, 0);

    let csv_text = import_csv_string(rows).unwrap();
    let mut reader = csv::ReaderBuilder::new().from_reader(csv_text.as_bytes());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), IMPORT_COLUMNS.len());
    assert_eq!(&headers[0], "GL Division");

    let records: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.len() == 61));
}

#[test]
fn test_malformed_payload_yields_no_rows() {
    let report = ExpenseReport::from_body("this is not json");
    assert_eq!(build_import_rows(&report, today()).count(), 0);

    let csv = import_csv_string(build_import_rows(&report, today())).unwrap();
    assert_eq!(csv.lines().count(), 1);
}

// =============================================================================
// Dates
// =============================================================================

#[test]
fn test_travel_dates_relative_to_today() {
    assert_eq!(parse_date("yesterday", today()), NaiveDate::from_ymd_opt(2026, 2, 2));
    assert_eq!(parse_date("Jan 20", today()), NaiveDate::from_ymd_opt(2026, 1, 20));
    assert_eq!(parse_date("March 3", today()), NaiveDate::from_ymd_opt(2025, 3, 3));
    assert_eq!(parse_date("sometime soon", today()), None);
}
