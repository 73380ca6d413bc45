//! Per diem lookup handler

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::{body_ci, param_ci, param_flag, AppState};
use expensegl_core::per_diem::require_service;
use expensegl_core::{parse_date, PerDiemLocation};

const LOCATION_NAMES: &[&str] = &["zipCode", "zip", "zipcode", "zip_code", "location"];
const DATE_NAMES: &[&str] = &["travelDate", "date", "travel_date"];

fn soft_error(message: impl Into<String>) -> Json<Value> {
    Json(json!({"ok": false, "error": message.into()}))
}

/// GET /api/per-diem-lookup - Daily M&IE rate for a ZIP or "City, ST".
///
/// Connectors are inconsistent about casing and sometimes send inputs in the
/// body even for GET, so parameters are read case-insensitively from the
/// query, then a JSON body, then the raw body text.
pub async fn per_diem_lookup(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Json<Value> {
    let body_json: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    let mut location_text = param_ci(&params, LOCATION_NAMES);
    if location_text.is_empty() {
        location_text = body_ci(&body_json, LOCATION_NAMES);
    }
    if location_text.is_empty() && !body_json.is_object() {
        location_text = body.trim().to_string();
    }

    let mut date_text = param_ci(&params, DATE_NAMES);
    if date_text.is_empty() {
        date_text = body_ci(&body_json, DATE_NAMES);
    }

    let debug = param_flag(&params, &["debug", "includeDebug"]);
    let today = state.today();
    let travel_date = parse_date(&date_text, today);

    let location = match PerDiemLocation::parse(&location_text) {
        Ok(location) => location,
        Err(e) => return soft_error(e.client_message()),
    };

    let service = match require_service(state.per_diem.as_ref()) {
        Ok(service) => service,
        Err(e) => return soft_error(e.client_message()),
    };

    match service.lookup(&location, travel_date, today).await {
        Ok(quote) => {
            info!(location = %location_text, mie_rate = quote.mie_rate, "Per diem lookup");
            let mut payload = json!({
                "ok": true,
                "zipCode": quote.zip_code,
                "travelDate": quote.travel_date.map(|d| d.to_string()),
                "fiscalYear": quote.fiscal_year,
                "mieRate": quote.mie_rate,
            });
            if debug {
                payload["debug"] = json!({"attempts": quote.attempts});
            }
            Json(payload)
        }
        Err(e) => soft_error(e.client_message()),
    }
}
