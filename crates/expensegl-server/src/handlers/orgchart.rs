//! Directory (org chart) lookup handlers
//!
//! These always answer 200 so connector actions never hard-fail a chat
//! topic; problems are reported as `{"ok": false, "error": ...}`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::{param_ci, param_flag, AppState};
use expensegl_core::directory::require_client;
use expensegl_core::{DirectoryProfile, LookupOutcome};

/// Which fields of the found document the profile is read from
#[derive(Debug, Clone, Copy)]
enum ProfileSource {
    Document,
    Chunk,
}

/// GET /api/orgchart-lookup?email= - Directory profile and department code
pub async fn orgchart_lookup(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let email = param_ci(&params, &["email", "upn"]);
    if email.is_empty() {
        return Json(json!({"ok": false, "found": false, "error": "email is required"}));
    }
    lookup(&state, &email, param_flag(&params, &["debug"]), ProfileSource::Document).await
}

/// GET /api/orgchart-lookup-upn?upn= - Same lookup keyed by `upn`
pub async fn orgchart_lookup_upn(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let upn = param_ci(&params, &["upn", "email"]);
    if upn.is_empty() {
        return Json(json!({"ok": false, "found": false, "error": "upn is required"}));
    }
    lookup(&state, &upn, param_flag(&params, &["debug"]), ProfileSource::Chunk).await
}

async fn lookup(state: &AppState, email: &str, debug: bool, source: ProfileSource) -> Json<Value> {
    let requested = email.trim().to_lowercase();

    let client = match require_client(state.directory.as_ref()) {
        Ok(client) => client,
        Err(e) => {
            return Json(json!({
                "ok": false,
                "found": false,
                "email": requested,
                "error": e.client_message(),
            }))
        }
    };

    let result = client.find_by_email(&requested).await;
    let debug_info = || json!({"attempts": result.attempts});

    let doc = match &result.outcome {
        LookupOutcome::Found(doc) => doc,
        LookupOutcome::NotFound => {
            let mut payload = json!({"ok": true, "found": false, "email": requested});
            if debug {
                payload["debug"] = debug_info();
            }
            return Json(payload);
        }
        LookupOutcome::Failed(error) => {
            let mut payload = json!({"ok": false, "found": false, "email": requested, "error": error});
            if debug {
                payload["debug"] = debug_info();
            }
            return Json(payload);
        }
    };

    let profile = match source {
        ProfileSource::Document => DirectoryProfile::from_document(doc, &requested),
        ProfileSource::Chunk => DirectoryProfile::from_chunk(doc, &requested),
    };
    let department = state
        .reference
        .resolve_department_for_email(&profile.email, &profile.department_name);

    let mut payload = json!({
        "ok": true,
        "found": true,
        "email": profile.email,
        "displayName": profile.display_name,
        "jobTitle": profile.job_title,
        "departmentName": profile.department_name,
        "departmentCode": department.department_code,
        "departmentNameMapped": department.department_name,
        "departmentMatchType": department.match_type,
        "departmentCandidates": department.candidates,
    });
    if debug {
        let mut info = debug_info();
        if department.override_used {
            info["deptOverride"] = json!({
                "email": profile.email,
                "departmentCode": department.department_code,
            });
        }
        payload["debug"] = info;
    }
    Json(payload)
}
