//! Travel date parsing handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use expensegl_core::{parse_date, TravelTimezone};

#[derive(Debug, Deserialize)]
pub struct ParseDateRequest {
    pub text: Option<String>,
    /// IANA zone overriding the configured travel time zone
    pub timezone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParseDateResponse {
    pub ok: bool,
    pub text: String,
    /// ISO date, `null` when the phrase is not understood
    pub date: Option<String>,
    pub today: String,
}

/// POST /api/parse-date - Resolve a free-text travel date phrase
pub async fn parse_travel_date(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ParseDateRequest>,
) -> Json<ParseDateResponse> {
    let today = match req.timezone.as_deref() {
        Some(tz) if !tz.trim().is_empty() => TravelTimezone::resolve(tz).today(),
        _ => state.today(),
    };
    let text = req.text.unwrap_or_default();
    let date = parse_date(&text, today).map(|d| d.to_string());

    Json(ParseDateResponse {
        ok: date.is_some(),
        text,
        date,
        today: today.to_string(),
    })
}
