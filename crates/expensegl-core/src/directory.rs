//! Org chart directory lookup
//!
//! Finds the one directory document belonging to an email address in a
//! search index whose schema is not under our control. The email may live in
//! a filterable field, in a title, in a document path or inside a JSON blob
//! stored as text, so several query shapes are tried in order:
//!
//! 1. filter on the configured email field (top 5)
//! 2. full-text search for the whole email (top 10)
//! 3. search for the local part (top 50)
//! 4. search for the normalized chunk id, `_0` suffixed then bare (top 50)
//!
//! Every strategy keeps only documents whose extracted email equals the
//! requested one. More than one such document is an error, never a guess.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::DirectorySettings;
use crate::error::{Error, Result};
use crate::extract::{chunk_object, document_email, first_exact_str, first_str};

/// Fields most likely to carry the email in free-text search
const SEARCH_FIELDS: &str = "title,parent_id,chunk,chunk_id";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Upstream error text is cut to this many characters
const MAX_ERROR_TEXT: usize = 500;

const DOCUMENT_EMAIL_KEYS: &[&str] = &["email", "upn", "userPrincipalName", "mail", "Email", "UPN", "Mail"];

/// Raw response from the search service
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub status: u16,
    pub body: String,
}

impl SearchResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    /// `value` array of a successful response; `None` when the body is not JSON
    fn documents(&self) -> Option<Vec<Value>> {
        let parsed: Value = serde_json::from_str(&self.body).ok()?;
        Some(
            parsed
                .get("value")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        )
    }
}

/// Search index transport
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// POST a search request body; transport failures are `Err`, HTTP errors are not
    async fn search(&self, body: &Value) -> Result<SearchResponse>;
}

/// Hosted search index over HTTP
#[derive(Clone)]
pub struct HttpSearchIndex {
    http_client: Client,
    url: String,
    api_key: String,
}

impl HttpSearchIndex {
    pub fn new(settings: &DirectorySettings) -> Self {
        Self {
            http_client: Client::new(),
            url: settings.search_url(),
            api_key: settings.api_key.clone(),
        }
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn search(&self, body: &Value) -> Result<SearchResponse> {
        let response = self
            .http_client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(SearchResponse { status, body })
    }
}

/// In-memory index for tests
///
/// Filters match the email field exactly (case-insensitive); searches return
/// every document whose JSON text contains the search text.
#[derive(Debug, Clone, Default)]
pub struct MockSearchIndex {
    pub documents: Vec<Value>,
    /// Answer filter queries with HTTP 400
    pub reject_filters: bool,
    /// Answer searches that restrict `searchFields` with HTTP 400
    pub reject_search_fields: bool,
    /// Answer every request with this status
    pub fail_status: Option<u16>,
}

impl MockSearchIndex {
    pub fn new(documents: Vec<Value>) -> Self {
        Self {
            documents,
            ..Default::default()
        }
    }
}

#[async_trait]
impl SearchIndex for MockSearchIndex {
    async fn search(&self, body: &Value) -> Result<SearchResponse> {
        if let Some(status) = self.fail_status {
            return Ok(SearchResponse {
                status,
                body: "service unavailable".to_string(),
            });
        }

        let top = body.get("top").and_then(Value::as_u64).unwrap_or(50) as usize;

        let docs: Vec<Value> = if let Some(filter) = body.get("filter").and_then(Value::as_str) {
            if self.reject_filters {
                return Ok(SearchResponse {
                    status: 400,
                    body: "field is not filterable".to_string(),
                });
            }
            let wanted = filter.rsplit(" eq ").next().unwrap_or("").trim_matches('\'');
            self.documents
                .iter()
                .filter(|d| {
                    first_exact_str(d, &["email"]).is_some_and(|e| e.to_lowercase() == wanted)
                })
                .cloned()
                .collect()
        } else {
            if self.reject_search_fields && body.get("searchFields").is_some() {
                return Ok(SearchResponse {
                    status: 400,
                    body: "unknown search field".to_string(),
                });
            }
            let text = body
                .get("search")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_lowercase();
            self.documents
                .iter()
                .filter(|d| d.to_string().to_lowercase().contains(&text))
                .cloned()
                .collect()
        };

        Ok(SearchResponse::ok(json!({
            "value": docs.into_iter().take(top).collect::<Vec<_>>()
        })))
    }
}

/// One query shape in the lookup chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Filter,
    Search { text: String, top: u32 },
}

impl Strategy {
    /// Strategies for an email, in the order they are tried
    pub fn chain(email: &str) -> Vec<Strategy> {
        let mut chain = vec![
            Strategy::Filter,
            Strategy::Search {
                text: email.to_string(),
                top: 10,
            },
        ];

        let local_part = email.split('@').next().unwrap_or("").trim();
        if !local_part.is_empty() {
            chain.push(Strategy::Search {
                text: local_part.to_string(),
                top: 50,
            });
        }

        let chunk_id = normalize_chunk_id(email);
        if !chunk_id.is_empty() {
            chain.push(Strategy::Search {
                text: format!("{chunk_id}_0"),
                top: 50,
            });
            chain.push(Strategy::Search {
                text: chunk_id,
                top: 50,
            });
        }
        chain
    }

    fn mode(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Search { .. } => "search",
        }
    }
}

/// `j.doe@corp.coop` → `j_doe_corp_coop`
pub fn normalize_chunk_id(email: &str) -> String {
    let mut out = String::with_capacity(email.len());
    let mut pending = false;
    for c in email.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending && !out.is_empty() {
                out.push('_');
            }
            pending = false;
            out.push(c);
        } else {
            pending = true;
        }
    }
    out
}

/// Result of running one strategy
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    /// Exactly one document matched
    Found(Value),
    /// Nothing matched; documents that came back anyway
    NotFound(Vec<Value>),
    /// Stop the chain
    Failed(String),
}

/// Diagnostic record of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupAttempt {
    pub mode: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    pub docs_count: usize,
    pub exact_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Value),
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryLookup {
    pub outcome: LookupOutcome,
    pub attempts: Vec<LookupAttempt>,
}

/// Directory lookups against a search index
#[derive(Clone)]
pub struct DirectoryClient {
    index: Arc<dyn SearchIndex>,
    email_field: String,
}

impl DirectoryClient {
    pub fn new(index: Arc<dyn SearchIndex>, email_field: &str) -> Self {
        Self {
            index,
            email_field: email_field.to_string(),
        }
    }

    /// HTTP client for the configured index; `None` when not configured
    pub fn from_settings(settings: &DirectorySettings) -> Option<Self> {
        if !settings.is_configured() {
            return None;
        }
        Some(Self::new(
            Arc::new(HttpSearchIndex::new(settings)),
            &settings.email_field,
        ))
    }

    /// Run the strategy chain for an email
    pub async fn find_by_email(&self, email: &str) -> DirectoryLookup {
        let email = email.trim().to_lowercase();
        let mut attempts = Vec::new();
        let mut saw_documents = false;

        for strategy in Strategy::chain(&email) {
            match self.run(&strategy, &email, &mut attempts).await {
                StrategyOutcome::Found(doc) => {
                    info!(mode = strategy.mode(), "Directory document found");
                    return DirectoryLookup {
                        outcome: LookupOutcome::Found(doc),
                        attempts,
                    };
                }
                StrategyOutcome::Failed(error) => {
                    return DirectoryLookup {
                        outcome: LookupOutcome::Failed(error),
                        attempts,
                    };
                }
                StrategyOutcome::NotFound(docs) => saw_documents |= !docs.is_empty(),
            }
        }

        let outcome = if saw_documents {
            LookupOutcome::Failed(format!(
                "Directory search returned results but none matched the email exactly. \
                 Check ORGCHART_SEARCH_EMAIL_FIELD (currently '{}').",
                self.email_field
            ))
        } else {
            LookupOutcome::NotFound
        };
        DirectoryLookup { outcome, attempts }
    }

    async fn run(&self, strategy: &Strategy, email: &str, attempts: &mut Vec<LookupAttempt>) -> StrategyOutcome {
        match strategy {
            Strategy::Filter => self.run_filter(email, attempts).await,
            Strategy::Search { text, top } => self.run_search(text, *top, email, attempts).await,
        }
    }

    async fn run_filter(&self, email: &str, attempts: &mut Vec<LookupAttempt>) -> StrategyOutcome {
        let body = json!({
            "search": "*",
            "filter": format!("tolower({}) eq '{}'", self.email_field, email.replace('\'', "''")),
            "top": 5,
        });

        let response = match self.index.search(&body).await {
            Ok(r) => r,
            Err(e) => return StrategyOutcome::Failed(format!("Directory search request failed: {e}")),
        };

        if response.status != 200 {
            debug!(status = response.status, "Directory filter query rejected, falling back to search");
            attempts.push(LookupAttempt {
                mode: "filter".to_string(),
                status: response.status,
                search_text: None,
                docs_count: 0,
                exact_count: 0,
            });
            return StrategyOutcome::NotFound(Vec::new());
        }

        self.match_documents(response, None, email, attempts)
    }

    async fn run_search(
        &self,
        text: &str,
        top: u32,
        email: &str,
        attempts: &mut Vec<LookupAttempt>,
    ) -> StrategyOutcome {
        let mut body = json!({
            "search": text,
            "top": top,
            "queryType": "simple",
            "searchMode": "all",
            "searchFields": SEARCH_FIELDS,
        });

        let mut response = match self.index.search(&body).await {
            Ok(r) => r,
            Err(e) => return StrategyOutcome::Failed(format!("Directory search request failed: {e}")),
        };

        if response.status == 400 {
            debug!("Index rejected searchFields, retrying without");
            if let Some(obj) = body.as_object_mut() {
                obj.remove("searchFields");
            }
            response = match self.index.search(&body).await {
                Ok(r) => r,
                Err(e) => return StrategyOutcome::Failed(format!("Directory search request failed: {e}")),
            };
        }

        if response.status != 200 {
            return StrategyOutcome::Failed(format!(
                "Directory search failed (HTTP {}). {}",
                response.status,
                truncate(response.body.trim(), MAX_ERROR_TEXT)
            )
            .trim()
            .to_string());
        }

        self.match_documents(response, Some(text), email, attempts)
    }

    fn match_documents(
        &self,
        response: SearchResponse,
        search_text: Option<&str>,
        email: &str,
        attempts: &mut Vec<LookupAttempt>,
    ) -> StrategyOutcome {
        let Some(docs) = response.documents() else {
            return StrategyOutcome::Failed("Directory search returned invalid JSON.".to_string());
        };

        let mut exact: Vec<&Value> = docs
            .iter()
            .filter(|d| d.is_object())
            .filter(|d| document_email(d, &self.email_field).as_deref() == Some(email))
            .collect();

        attempts.push(LookupAttempt {
            mode: if search_text.is_some() { "search" } else { "filter" }.to_string(),
            status: response.status,
            search_text: search_text.map(str::to_string),
            docs_count: docs.len(),
            exact_count: exact.len(),
        });

        match exact.len() {
            0 => StrategyOutcome::NotFound(docs),
            1 => StrategyOutcome::Found(exact.remove(0).clone()),
            _ => StrategyOutcome::Failed(
                "Directory search returned multiple exact matches for this email.".to_string(),
            ),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Person details extracted from a directory document (never phone numbers)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryProfile {
    pub email: String,
    pub display_name: String,
    pub job_title: String,
    pub department_name: String,
}

impl DirectoryProfile {
    /// Read top-level fields first, then the embedded `chunk` JSON
    pub fn from_document(doc: &Value, requested_email: &str) -> Self {
        let chunk = chunk_object(doc);
        let pick = |doc_keys: &[&str], chunk_keys: &[&str]| {
            first_exact_str(doc, doc_keys)
                .or_else(|| first_exact_str(&chunk, chunk_keys))
                .unwrap_or_default()
        };

        let email = first_exact_str(doc, DOCUMENT_EMAIL_KEYS)
            .or_else(|| first_exact_str(&chunk, DOCUMENT_EMAIL_KEYS))
            .unwrap_or_else(|| requested_email.trim().to_string())
            .to_lowercase();

        Self {
            email,
            display_name: pick(&["displayName", "name", "fullName"], &["DisplayName", "displayName"]),
            job_title: pick(&["jobTitle", "title"], &["JobTitle", "jobTitle"]),
            department_name: pick(&["department", "Department"], &["Department", "department"]),
        }
    }

    /// Read only the embedded `chunk` JSON (case-insensitive keys); the email
    /// is the one that was asked for
    pub fn from_chunk(doc: &Value, requested_email: &str) -> Self {
        let chunk = chunk_object(doc);
        let pick = |keys: &[&str]| first_str(&chunk, keys).unwrap_or_default();
        Self {
            email: requested_email.trim().to_lowercase(),
            display_name: pick(&["DisplayName", "displayName"]),
            job_title: pick(&["JobTitle", "jobTitle"]),
            department_name: pick(&["Department", "department"]),
        }
    }
}

/// Reject a lookup when the index is not configured
pub fn require_client(client: Option<&DirectoryClient>) -> Result<&DirectoryClient> {
    client.ok_or_else(|| {
        Error::NotConfigured(
            "Directory search is not configured (missing ORGCHART_SEARCH_ENDPOINT/INDEX/API_KEY)."
                .to_string(),
        )
    })
}
