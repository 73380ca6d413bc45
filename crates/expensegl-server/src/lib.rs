//! ExpenseGL Web Server
//!
//! Axum-based HTTP API consumed by the expense reporting chat assistant.
//!
//! Security features:
//! - Function key authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Request body size limit
//! - Sanitized error responses

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Query, Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde_json::Value;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use expensegl_core::{
    DirectoryClient, GraphMailer, Mailer, PerDiemService, ReferenceData, Settings, TravelTimezone,
};

mod handlers;

/// Maximum request body size (16 MB; receipts travel base64-encoded)
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Function key header sent by connector tools
const FUNCTION_KEY_HEADER: &str = "x-functions-key";

/// Query parameter alternative to the function key header
const FUNCTION_KEY_PARAM: &str = "code";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether a function key is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Accepted function keys
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    pub settings: Settings,
    /// Expense code ledger and email overrides, loaded on first use
    pub reference: ReferenceData,
    pub directory: Option<DirectoryClient>,
    pub per_diem: Option<PerDiemService>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub timezone: TravelTimezone,
}

impl AppState {
    /// Build state with HTTP upstream clients for whatever is configured
    pub fn from_settings(settings: Settings, config: ServerConfig) -> Self {
        let reference = ReferenceData::from_csv_path(
            settings.expense_codes_csv.clone(),
            &settings.department_overrides_json,
        );
        let directory = DirectoryClient::from_settings(&settings.directory);
        let per_diem = PerDiemService::from_settings(&settings.per_diem);
        let mailer = GraphMailer::from_settings(&settings.mail).map(|m| Arc::new(m) as Arc<dyn Mailer>);
        let timezone = TravelTimezone::resolve(&settings.travel_timezone);

        if directory.is_none() {
            info!("Directory search not configured (set ORGCHART_SEARCH_ENDPOINT/INDEX/API_KEY)");
        }
        if per_diem.is_none() {
            info!("Per diem lookup not configured (set GSA_API_KEY)");
        }
        if !settings.mail.enabled {
            info!("Email sending disabled (set ENABLE_EMAIL_SEND=true)");
        } else if mailer.is_none() {
            warn!("Email sending enabled but GRAPH_ACCESS_TOKEN is not set");
        }

        Self {
            config,
            settings,
            reference,
            directory,
            per_diem,
            mailer,
            timezone,
        }
    }

    /// Today in the travel time zone
    pub fn today(&self) -> NaiveDate {
        self.timezone.today()
    }
}

/// Authentication middleware - validates the function key from the
/// `x-functions-key` header, a Bearer token, or the `code` query parameter
async fn auth_middleware(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get(FUNCTION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bearer_key = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::to_string);
    let query_key = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(params)| params.get(FUNCTION_KEY_PARAM).cloned());

    let valid = [header_key, bearer_key, query_key]
        .into_iter()
        .flatten()
        .any(|key| validate_api_key(key.trim(), &state.config.api_keys));

    if valid {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid function key");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Constant-time comparison against each configured key
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();
    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// First non-blank value among `names`, matching parameter names case-insensitively
pub(crate) fn param_ci(params: &HashMap<String, String>, names: &[&str]) -> String {
    names
        .iter()
        .find_map(|name| {
            params
                .iter()
                .find(|(k, v)| k.eq_ignore_ascii_case(name) && !v.trim().is_empty())
                .map(|(_, v)| v.trim().to_string())
        })
        .unwrap_or_default()
}

/// Same as [`param_ci`] for a JSON object body
pub(crate) fn body_ci(body: &Value, names: &[&str]) -> String {
    let Some(obj) = body.as_object() else {
        return String::new();
    };
    names
        .iter()
        .find_map(|name| {
            obj.iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(name))
                .find_map(|(_, v)| expensegl_core::extract::value_text(v))
        })
        .unwrap_or_default()
}

/// Yes/no style query flag
pub(crate) fn param_flag(params: &HashMap<String, String>, names: &[&str]) -> bool {
    matches!(
        param_ci(params, names).to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();
    let state = Arc::new(state);

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Ledger
        .route("/expense-codes", get(handlers::expense_codes))
        .route("/resolve-department", post(handlers::resolve_department))
        // Directory
        .route("/orgchart-lookup", get(handlers::orgchart_lookup))
        .route("/orgchart-lookup-upn", get(handlers::orgchart_lookup_upn))
        // Per diem
        .route("/per-diem-lookup", get(handlers::per_diem_lookup))
        .route("/parse-date", post(handlers::parse_travel_date))
        // Reports
        .route("/import-csv", post(handlers::import_csv))
        .route("/submit-report", post(handlers::submit_report))
        .route("/receipt-category", post(handlers::receipt_category));

    // Build CORS layer
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let headers = [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(FUNCTION_KEY_HEADER),
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new().allow_methods(methods).allow_headers(headers)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    if !state.config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if state.config.api_keys.is_empty() {
        warn!("⚠️  No function keys configured - every request will be rejected");
    }

    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
