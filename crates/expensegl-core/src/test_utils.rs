//! Test utilities for expensegl-core
//!
//! A mock upstream server standing in for the directory search index, the
//! per diem rate API, the ZIP geocoder and Graph `sendMail`, so the real HTTP
//! clients can be exercised in integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::config::Settings;
use crate::directory::{MockSearchIndex, SearchIndex};
use crate::per_diem::{MockPerDiemApi, MockZipGeocoder, PerDiemApi};

pub const TEST_INDEX: &str = "people";
pub const TEST_API_KEY: &str = "test-key";
pub const TEST_ACCESS_TOKEN: &str = "test-token";

/// Canned upstream data served by [`MockUpstreamServer`]
#[derive(Debug, Clone, Default)]
pub struct UpstreamFixtures {
    pub directory: MockSearchIndex,
    pub per_diem: MockPerDiemApi,
    pub geocoder: MockZipGeocoder,
}

struct MockState {
    fixtures: UpstreamFixtures,
    sent_mail: Mutex<Vec<Value>>,
}

/// Mock upstream services for testing
pub struct MockUpstreamServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockUpstreamServer {
    /// Start the mock server on an available port
    pub async fn start(fixtures: UpstreamFixtures) -> Self {
        let state = Arc::new(MockState {
            fixtures,
            sent_mail: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/indexes/:index/docs/search", post(handle_search))
            .route("/perdiem/*path", get(handle_rates))
            .route("/zip/:zip", get(handle_geocode))
            .route("/graph/users/:user/sendMail", post(handle_send_mail))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Settings pointing every upstream client at this server, mail enabled
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.directory.endpoint = self.url();
        settings.directory.index = TEST_INDEX.to_string();
        settings.directory.api_key = TEST_API_KEY.to_string();
        settings.per_diem.api_key = TEST_API_KEY.to_string();
        settings.per_diem.base_url = format!("{}/perdiem", self.url());
        settings.per_diem.zip_geocode_base_url = format!("{}/zip", self.url());
        settings.mail.enabled = true;
        settings.mail.from_user = "bot@corp.coop".to_string();
        settings.mail.to_default = "ap@corp.coop".to_string();
        settings.mail.access_token = TEST_ACCESS_TOKEN.to_string();
        settings.mail.graph_base_url = format!("{}/graph", self.url());
        settings
    }

    /// `sendMail` requests received so far, as `{"from": .., "request": ..}`
    pub fn sent_mail(&self) -> Vec<Value> {
        self.state.sent_mail.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockUpstreamServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn has_header(headers: &HeaderMap, name: &str, value: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == value)
}

/// Search index documents endpoint
async fn handle_search(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_header(&headers, "api-key", TEST_API_KEY) {
        return (StatusCode::FORBIDDEN, "missing api-key").into_response();
    }
    match state.fixtures.directory.search(&body).await {
        Ok(response) => (
            StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            response.body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Per diem rates; the raw path is used so `%20` in city names is kept
async fn handle_rates(State(state): State<Arc<MockState>>, headers: HeaderMap, uri: Uri) -> Response {
    if !has_header(&headers, "x-api-key", TEST_API_KEY) {
        return (StatusCode::FORBIDDEN, "missing x-api-key").into_response();
    }
    let path = uri.path().trim_start_matches("/perdiem/");
    match state.fixtures.per_diem.get_rates(path).await {
        Ok(response) => match response.body {
            Some(body) => Json(body).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// ZIP geocoder, zippopotam.us response shape
async fn handle_geocode(State(state): State<Arc<MockState>>, Path(zip): Path<String>) -> Response {
    match state.fixtures.geocoder.places.get(&zip) {
        Some((city, st)) => Json(json!({
            "post code": zip,
            "places": [{"place name": city, "state abbreviation": st}]
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({}))).into_response(),
    }
}

/// Graph sendMail
async fn handle_send_mail(
    State(state): State<Arc<MockState>>,
    Path(user): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_header(&headers, "authorization", &format!("Bearer {TEST_ACCESS_TOKEN}")) {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    state
        .sent_mail
        .lock()
        .unwrap()
        .push(json!({"from": user, "request": body}));
    StatusCode::ACCEPTED.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let mut server = MockUpstreamServer::start(UpstreamFixtures::default()).await;
        let url = server.url();
        assert!(url.starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{url}/zip/99999")).await.unwrap();
        assert_eq!(response.status(), 404);

        server.stop();
    }
}
