//! GL import command implementation

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use expensegl_core::{build_import_rows, write_import_csv, ExpenseReport, ImportRow, ReportSummary};

/// Render the payload in `file` as import rows; returns the summary
pub fn cmd_import_csv(file: &Path, out: Option<&Path>, today: NaiveDate) -> Result<ReportSummary> {
    let body = fs::read_to_string(file)
        .with_context(|| format!("Failed to read payload: {}", file.display()))?;
    let report = ExpenseReport::from_body(&body);

    let rows: Vec<ImportRow> = build_import_rows(&report, today).collect();
    let summary = ReportSummary::from_rows(&rows);

    match out {
        Some(path) => {
            let out_file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_import_csv(rows, BufWriter::new(out_file))
                .context("Failed to write GL import CSV")?;
            println!("📤 Wrote {} row(s) to {}", summary.line_count, path.display());
            println!("   Total: {:.2}", summary.amount_total);
        }
        None => {
            write_import_csv(rows, io::stdout().lock()).context("Failed to write GL import CSV")?;
        }
    }

    if summary.missing_gl_count > 0 {
        eprintln!(
            "⚠️  {} line(s) have no GL account",
            summary.missing_gl_count
        );
    }

    Ok(summary)
}
