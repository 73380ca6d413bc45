//! GL import file generation
//!
//! Expands expense items into rows of the accounts-payable import format:
//! 61 fixed columns, one row per posting line, in payload order. Most columns
//! are always empty; the populated ones are described on [`ImportRow`].

use std::io::Write;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::error::Result;
use crate::expense::{ExpenseItem, ExpenseLine, ExpenseReport, Requester};

/// Column headers of the import format, in file order
pub const IMPORT_COLUMNS: [&str; 61] = [
    "GL Division",
    "GL Department",
    "GL Account",
    "GL Activity",
    "Reference",
    "Amount",
    "Vendor",
    "Organization Name",
    "First Name",
    "Last Name",
    "Joint Name",
    "Address Line 1",
    "Address Line 2",
    "Address Line 3",
    "City",
    "State",
    "ZIP",
    "Bank Account",
    "Due Date",
    "Invoice",
    "Customer",
    "Payment Type",
    "1099",
    "Type",
    "Invoice Date",
    "GL Post Date",
    "Discount",
    "Sales Tax",
    "Additional Charge 1 Code",
    "Additional Charge 1 Amount",
    "Addl Chg 1 Taxable",
    "Additional Charge 2 Code",
    "Additional Charge 2 Amount",
    "Addl Chg 2 Taxable",
    "Use Tax 1 Code",
    "Use Tax 1 Amount",
    "Use Tax 2 Code",
    "Use Tax 2 Amount",
    "Use Tax 3 Code",
    "Use Tax 3 Amount",
    "Use Tax 4 Code",
    "Use Tax 4 Amount",
    "Taxable",
    "Apply Addl Chg 1",
    "Apply Addl Chg 2",
    "Distribute Tax",
    "Distribute Addl Chg 1",
    "Distribute Addl Chg 2",
    "AP GL Division",
    "AP GL Account",
    "Dispute",
    "Separate Payment",
    "Times To Post",
    "Invoice Type",
    "Extended Reference",
    "Authorization Type",
    "Credit Card",
    "Paid Vendor",
    "Charge Dt",
    "BU Project",
    "GL Distribution Reference",
];

/// Maximum length of the free-text reference
pub const MAX_REFERENCE_LEN: usize = 40;

/// Activity code that posts as training rather than travel
pub const TRAINING_ACTIVITY: &str = "770";

pub const TRAINING_LABEL: &str = "TRAINING/EDUCATION";
pub const EXPENSES_LABEL: &str = "EXPENSES / MILEAGE";

/// Days from invoice date to due date
const DUE_DAYS: i64 = 7;

/// One GL import transaction line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub gl_division: String,
    pub gl_department: String,
    /// Override account when one was given, else the line's account
    pub gl_account: String,
    pub gl_activity: String,
    /// Category label, not the free-text reference
    pub reference: String,
    /// Two decimals, or empty when the amount was not a number
    pub amount: String,
    pub vendor: String,
    pub organization_name: String,
    pub first_name: String,
    pub last_name: String,
    pub address_line_1: String,
    pub due_date: String,
    pub invoice: String,
    pub invoice_date: String,
    pub gl_post_date: String,
    /// Free-text reference plus any override note
    pub extended_reference: String,
}

impl ImportRow {
    /// Value of a named column; unpopulated columns are empty
    pub fn column(&self, name: &str) -> &str {
        match name {
            "GL Division" => &self.gl_division,
            "GL Department" => &self.gl_department,
            "GL Account" => &self.gl_account,
            "GL Activity" => &self.gl_activity,
            "Reference" => &self.reference,
            "Amount" => &self.amount,
            "Vendor" => &self.vendor,
            "Organization Name" => &self.organization_name,
            "First Name" => &self.first_name,
            "Last Name" => &self.last_name,
            "Address Line 1" => &self.address_line_1,
            "Due Date" => &self.due_date,
            "Invoice" => &self.invoice,
            "Invoice Date" => &self.invoice_date,
            "GL Post Date" => &self.gl_post_date,
            "Extended Reference" => &self.extended_reference,
            _ => "",
        }
    }

    /// All 61 columns in file order
    pub fn record(&self) -> Vec<&str> {
        IMPORT_COLUMNS.iter().map(|c| self.column(c)).collect()
    }

    /// Parsed amount, `None` for an empty amount cell
    pub fn amount_value(&self) -> Option<f64> {
        self.amount.parse().ok()
    }

    pub fn is_missing_gl_account(&self) -> bool {
        self.gl_account.trim().is_empty()
    }
}

/// Format an amount with exactly two decimals; `None` formats as empty
pub fn format_amount(amount: Option<f64>) -> String {
    amount.map(|a| format!("{a:.2}")).unwrap_or_default()
}

/// Build the free-text reference, capped at 40 characters.
///
/// With a GL override and a known original account, `" ACCT=<original>"` is
/// appended; the base text is cut to make room so the suffix always survives.
pub fn make_reference(base_reference: &str, original_account_code: &str, gl_override: &str) -> String {
    let base = base_reference.trim();
    if gl_override.is_empty() || original_account_code.is_empty() {
        return take_chars(base, MAX_REFERENCE_LEN).to_string();
    }

    let suffix = format!(" ACCT={original_account_code}");
    let base_len = base.chars().count();
    let suffix_len = suffix.chars().count();

    let combined = if base_len + suffix_len <= MAX_REFERENCE_LEN {
        format!("{base}{suffix}")
    } else {
        let keep = MAX_REFERENCE_LEN.saturating_sub(suffix_len);
        format!("{}{suffix}", take_chars(base, keep).trim_end())
    };
    take_chars(&combined, MAX_REFERENCE_LEN).trim().to_string()
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Invoice number like `"EXP 02-2026"`
pub fn invoice_number(item: &ExpenseItem, today: NaiveDate) -> String {
    format!("{} {}", item.item_type.invoice_prefix(), today.format("%m-%Y"))
}

/// Category label for the `Reference` column
pub fn reference_label(activity_code: &str) -> &'static str {
    if activity_code.trim() == TRAINING_ACTIVITY {
        TRAINING_LABEL
    } else {
        EXPENSES_LABEL
    }
}

/// Report-wide values shared by every row
#[derive(Debug, Clone)]
struct RowDefaults {
    division: String,
    vendor: String,
    requester: Requester,
    today: NaiveDate,
    today_text: String,
    due_text: String,
}

impl RowDefaults {
    fn new(report: &ExpenseReport, today: NaiveDate) -> Self {
        Self {
            division: report.division(),
            vendor: report.vendor(),
            requester: report.requester(),
            today,
            today_text: today.format("%m/%d/%Y").to_string(),
            due_text: (today + Duration::days(DUE_DAYS)).format("%m/%d/%Y").to_string(),
        }
    }

    fn row(&self, item: &ExpenseItem, line: &ExpenseLine, invoice: &str) -> ImportRow {
        let gl_override = item.gl_account_override.as_str();
        let original_account = line.account_code.as_str();
        let gl_account = if gl_override.is_empty() {
            original_account
        } else {
            gl_override
        };

        let reference = make_reference(&item.reference, original_account, gl_override);

        let note = if !gl_override.is_empty() && !original_account.is_empty() {
            if item.description.is_empty() {
                format!("OVERRIDE={gl_override}; ORIGINAL_ACCT={original_account}")
            } else {
                item.description.clone()
            }
        } else {
            String::new()
        };

        let extended_reference = match (reference.is_empty(), note.is_empty()) {
            (false, false) => format!("{reference} | {note}"),
            (true, false) => note,
            _ => reference,
        };

        ImportRow {
            gl_division: self.division.clone(),
            gl_department: item.department_code.clone(),
            gl_account: gl_account.to_string(),
            gl_activity: line.activity_code.clone(),
            reference: reference_label(&line.activity_code).to_string(),
            amount: format_amount(line.amount),
            vendor: self.vendor.clone(),
            organization_name: self.requester.organization_name.clone(),
            first_name: self.requester.first_name.clone(),
            last_name: self.requester.last_name.clone(),
            address_line_1: ".".to_string(),
            due_date: self.due_text.clone(),
            invoice: invoice.to_string(),
            invoice_date: self.today_text.clone(),
            gl_post_date: self.today_text.clone(),
            extended_reference,
        }
    }
}

/// Expand a report into import rows: items in payload order, lines in item order.
///
/// Lazy and single-pass; call again to start over.
pub fn build_import_rows(report: &ExpenseReport, today: NaiveDate) -> impl Iterator<Item = ImportRow> {
    let defaults = RowDefaults::new(report, today);
    report.items().into_iter().flat_map(move |item| {
        let invoice = invoice_number(&item, defaults.today);
        item.posting_lines()
            .iter()
            .map(|line| defaults.row(&item, line, &invoice))
            .collect::<Vec<_>>()
    })
}

/// Write rows as CSV with a header row; returns the number of data rows
pub fn write_import_csv<W, I>(rows: I, writer: W) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = ImportRow>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(IMPORT_COLUMNS)?;

    let mut count = 0;
    for row in rows {
        wtr.write_record(row.record())?;
        count += 1;
    }
    wtr.flush()?;
    Ok(count)
}

/// Render rows as CSV text
pub fn import_csv_string<I>(rows: I) -> Result<String>
where
    I: IntoIterator<Item = ImportRow>,
{
    let mut buf = Vec::new();
    write_import_csv(rows, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
