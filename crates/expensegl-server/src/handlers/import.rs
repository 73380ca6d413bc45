//! GL import CSV handler

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::{AppError, AppState};
use expensegl_core::report::CSV_FILENAME;
use expensegl_core::{build_import_rows, write_import_csv, ExpenseReport};

/// POST /api/import-csv - Render an expense payload as the 61-column import file
pub async fn import_csv(State(state): State<Arc<AppState>>, body: String) -> Result<Response, AppError> {
    let payload: serde_json::Value =
        serde_json::from_str(&body).map_err(|_| AppError::bad_request("Invalid JSON body"))?;
    let report = ExpenseReport::from_value(payload);

    let mut csv_bytes = Vec::new();
    let count = write_import_csv(build_import_rows(&report, state.today()), &mut csv_bytes)?;
    info!(rows = count, "Generated GL import CSV");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILENAME}\""),
            ),
        ],
        csv_bytes,
    )
        .into_response())
}
