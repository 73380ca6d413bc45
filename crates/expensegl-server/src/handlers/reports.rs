//! Report submission handler

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

use crate::{AppError, AppState};
use expensegl_core::report::merge_query_params;
use expensegl_core::{submit_report as submit, ExpenseReport, SubmitResult};

/// POST /api/submit-report - Build the import CSV and mail it to accounts payable.
///
/// The body may be a JSON object, a bare items array or raw draft-items
/// text. Query parameters fill payload fields that are missing.
pub async fn submit_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Result<Json<SubmitResult>, AppError> {
    let mut report = ExpenseReport::from_body(&body);
    merge_query_params(&mut report, &params);

    info!(
        fields = ?report.fields().keys().collect::<Vec<_>>(),
        "Submitting expense report"
    );

    let result = submit(
        &report,
        &state.settings.mail,
        state.mailer.as_deref(),
        state.today(),
    )
    .await?;

    Ok(Json(result))
}
