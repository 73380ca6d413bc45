//! Health check handler

use axum::Json;
use serde_json::{json, Value};

/// GET /api/health - Liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
