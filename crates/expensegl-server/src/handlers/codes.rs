//! Ledger lookup handlers: account codes and department resolution

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState};
use expensegl_core::{AccountCode, DepartmentMatch};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCodesQuery {
    pub department_code: Option<String>,
    pub activity_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCodesResponse {
    pub department_code: String,
    pub activity_code: String,
    pub matches: Vec<AccountCode>,
}

/// GET /api/expense-codes - Account codes for a department/activity pair
pub async fn expense_codes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExpenseCodesQuery>,
) -> Result<Json<ExpenseCodesResponse>, AppError> {
    let department_code = query.department_code.unwrap_or_default().trim().to_string();
    let activity_code = query.activity_code.unwrap_or_default().trim().to_string();

    if department_code.is_empty() || activity_code.is_empty() {
        return Err(AppError::bad_request(
            "departmentCode and activityCode are required",
        ));
    }

    let matches = state.reference.account_codes(&department_code, &activity_code);

    Ok(Json(ExpenseCodesResponse {
        department_code,
        activity_code,
        matches,
    }))
}

/// Request body for department resolution
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDepartmentRequest {
    pub department_name: Option<String>,
    /// When set, an email override takes precedence over the name
    pub email: Option<String>,
}

/// POST /api/resolve-department - Map a free-text department name to a code
pub async fn resolve_department(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResolveDepartmentRequest>,
) -> Json<DepartmentMatch> {
    let name = req.department_name.unwrap_or_default();
    let result = match req.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => state.reference.resolve_department_for_email(email, &name),
        _ => state.reference.resolve_department(&name),
    };
    Json(result)
}
