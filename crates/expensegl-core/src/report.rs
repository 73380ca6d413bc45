//! Report submission: import CSV summary, mail gating and sending
//!
//! Submitting a report always renders the GL import CSV. Mail goes out only
//! when the caller asks for it and the deployment has mail enabled, and even
//! then it is refused for reports that would post without a GL account, with
//! oversized attachments, or without receipts that the items require.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::MailSettings;
use crate::error::{Error, Result};
use crate::expense::{parse_flag, ExpenseReport};
use crate::gl_import::{build_import_rows, import_csv_string, ImportRow};

pub const CSV_FILENAME: &str = "travel-expense.csv";
pub const DEFAULT_SUBJECT: &str = "Travel expense submission";

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Query parameters that may fill blank text fields of the payload
const QUERY_TEXT_FIELDS: &[&str] = &[
    "toEmail",
    "fromUser",
    "requesterEmail",
    "ccEmails",
    "subject",
    "bodyText",
    "bodyHtml",
    "receiptUploadId",
    "draftItemsJson",
];

/// Query parameters that may fill missing flags
const QUERY_FLAG_FIELDS: &[&str] = &["sendEmail", "ccRequester", "allowMissingReceipts"];

/// Totals over the generated import rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub line_count: usize,
    pub amount_total: f64,
    pub missing_gl_count: usize,
}

impl ReportSummary {
    pub fn from_rows(rows: &[ImportRow]) -> Self {
        let total: f64 = rows.iter().filter_map(ImportRow::amount_value).sum();
        Self {
            line_count: rows.len(),
            amount_total: (total * 100.0).round() / 100.0,
            missing_gl_count: rows.iter().filter(|r| r.is_missing_gl_account()).count(),
        }
    }
}

/// A decoded file to attach to the submission mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Magic-number sniffing for the receipt formats we accept
fn sniff_file_type(data: &[u8]) -> Option<(&'static str, &'static str)> {
    if data.starts_with(b"%PDF") {
        Some(("pdf", "application/pdf"))
    } else if data.starts_with(b"\x89PNG") {
        Some(("png", "image/png"))
    } else if data.starts_with(b"\xFF\xD8\xFF") {
        Some(("jpg", "image/jpeg"))
    } else {
        None
    }
}

/// Decode the payload's `attachments` list.
///
/// Each entry is `{name, contentType, contentBytes}` with base64 content.
/// Errors are client-facing messages naming the offending entry.
pub fn decode_attachments(report: &ExpenseReport) -> std::result::Result<Vec<Attachment>, String> {
    let Some(entries) = report.get("attachments").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let mut attachments = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let Some(entry) = entry.as_object() else {
            return Err(format!("attachments[{i}] must be an object"));
        };
        let field = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| entry.get(*k).and_then(Value::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let mut name = field(&["name"]).unwrap_or_else(|| format!("receipt-{}", i + 1));
        let mut content_type =
            field(&["contentType"]).unwrap_or_else(|| "application/octet-stream".to_string());
        let encoded = field(&["contentBytes", "contentBase64", "base64", "content", "data"]).unwrap_or_default();

        let bytes = STANDARD
            .decode(encoded.split_whitespace().collect::<String>())
            .map_err(|e| format!("attachments[{i}] invalid base64: {e}"))?;
        if bytes.is_empty() {
            return Err(format!("attachments[{i}] is empty"));
        }

        match sniff_file_type(&bytes) {
            Some((ext, sniffed)) => {
                if content_type == "application/octet-stream" {
                    content_type = sniffed.to_string();
                }
                if !name.contains('.') {
                    name = format!("{name}.{ext}");
                }
            }
            None if content_type == "application/octet-stream" => {
                return Err(format!("attachments[{i}] content type is unknown"));
            }
            None if matches!(content_type.as_str(), "application/pdf" | "image/png" | "image/jpeg") => {
                return Err(format!("attachments[{i}] content does not match {content_type}"));
            }
            None => {}
        }

        attachments.push(Attachment {
            name,
            content_type,
            bytes,
        });
    }
    Ok(attachments)
}

/// A ready-to-send submission mail
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub from_user: String,
    pub to: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub csv_text: String,
    pub attachments: Vec<Attachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Microsoft Graph `sendMail` with a pre-acquired bearer token
#[derive(Clone)]
pub struct GraphMailer {
    http_client: Client,
    base_url: String,
    access_token: String,
}

impl GraphMailer {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// `None` without an access token
    pub fn from_settings(settings: &MailSettings) -> Option<Self> {
        let token = settings.access_token.trim();
        (!token.is_empty()).then(|| Self::new(&settings.graph_base_url, token))
    }
}

/// Graph `sendMail` request body
pub fn graph_message(mail: &OutgoingMail) -> Value {
    let file = |name: &str, content_type: &str, bytes: &[u8]| {
        json!({
            "@odata.type": "#microsoft.graph.fileAttachment",
            "name": name,
            "contentType": content_type,
            "contentBytes": STANDARD.encode(bytes),
        })
    };

    let mut attachments = vec![file(CSV_FILENAME, "text/csv", mail.csv_text.as_bytes())];
    attachments.extend(
        mail.attachments
            .iter()
            .map(|a| file(&a.name, &a.content_type, &a.bytes)),
    );

    let body = match mail.body_html.as_deref().map(str::trim) {
        Some(html) if !html.is_empty() => json!({"contentType": "HTML", "content": html}),
        _ => json!({"contentType": "Text", "content": mail.body_text}),
    };

    let mut message = json!({
        "subject": mail.subject,
        "body": body,
        "toRecipients": [{"emailAddress": {"address": mail.to}}],
        "attachments": attachments,
    });
    if !mail.cc.is_empty() {
        message["ccRecipients"] = mail
            .cc
            .iter()
            .map(|address| json!({"emailAddress": {"address": address}}))
            .collect();
    }

    json!({"message": message, "saveToSentItems": "true"})
}

#[async_trait]
impl Mailer for GraphMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let url = format!("{}/users/{}/sendMail", self.base_url, mail.from_user);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&graph_message(mail))
            .timeout(SEND_TIMEOUT)
            .send()
            .await?;

        let status = response.status().as_u16();
        info!(status, "Graph sendMail request complete");
        if status == 200 || status == 202 {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(Error::Upstream(format!("Graph sendMail failed: {status} {text}")))
    }
}

/// Records mail instead of sending it
#[derive(Debug, Default, Clone)]
pub struct MockMailer {
    pub sent: Arc<Mutex<Vec<OutgoingMail>>>,
    pub fail_with: Option<String>,
}

impl MockMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        if let Some(message) = &self.fail_with {
            return Err(Error::Upstream(message.clone()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail.clone());
        }
        Ok(())
    }
}

/// Outcome of a submission, as returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub ok: bool,
    pub sent: bool,
    pub to_email: String,
    pub line_count: usize,
    pub amount_total: f64,
    pub missing_gl_count: usize,
    pub csv_filename: &'static str,
    pub email_error: Option<String>,
    pub attachment_count: usize,
    pub has_receipt_items: bool,
    pub allow_missing_receipts: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub upload_ids: Vec<String>,
    pub conversation_id: String,
}

/// Fill blank payload fields from query parameters
pub fn merge_query_params(report: &mut ExpenseReport, params: &HashMap<String, String>) {
    for key in QUERY_TEXT_FIELDS {
        if let Some(value) = params.get(*key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            report.set_if_missing(key, Value::String(value.to_string()));
        }
    }
    for key in QUERY_FLAG_FIELDS {
        if let Some(flag) = params.get(*key).and_then(|v| parse_flag(v)) {
            report.set_if_missing(key, Value::Bool(flag));
        }
    }
}

/// CC list: the requester (unless disabled or the recipient) then extra
/// addresses, lowercased and deduplicated
pub fn cc_recipients(report: &ExpenseReport, to_email: &str) -> Vec<String> {
    let to_email = to_email.to_lowercase();
    let requester = report.text(&["requesterEmail"]).to_lowercase();
    let cc_requester = report.flag("ccRequester").unwrap_or(!requester.is_empty());

    let mut cc = Vec::new();
    if cc_requester && !requester.is_empty() && requester != to_email {
        cc.push(requester);
    }

    let extra: Vec<String> = match ["ccEmails", "ccEmail", "cc"]
        .iter()
        .find_map(|k| report.get(k).filter(|v| !v.is_null()))
    {
        Some(Value::String(s)) => s.split([';', ',']).map(str::to_string).collect(),
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    for address in extra {
        let address = address.trim().to_lowercase();
        if !address.is_empty() && address != to_email && !cc.contains(&address) {
            cc.push(address);
        }
    }
    cc
}

/// Receipt upload ids referenced by receipt and boots items
fn upload_ids(report: &ExpenseReport) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in report.items().into_iter().flat_map(|item| item.upload_ids) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Render the report and send it if every gate passes.
///
/// Only CSV rendering failures are errors; every mail problem is reported
/// in [`SubmitResult::email_error`].
pub async fn submit_report(
    report: &ExpenseReport,
    settings: &MailSettings,
    mailer: Option<&dyn Mailer>,
    today: NaiveDate,
) -> Result<SubmitResult> {
    let rows: Vec<ImportRow> = build_import_rows(report, today).collect();
    let summary = ReportSummary::from_rows(&rows);
    let csv_text = import_csv_string(rows)?;

    let requested = report.flag("sendEmail").unwrap_or(true);
    let send_allowed = requested && settings.enabled;

    let to_email = {
        let to = report.text(&["toEmail"]);
        if to.is_empty() {
            settings.to_default.trim().to_string()
        } else {
            to
        }
    };
    let from_user = {
        let from = report.text(&["fromUser"]);
        if from.is_empty() {
            settings.from_user.trim().to_string()
        } else {
            from
        }
    };

    let has_receipt_items = report.items().iter().any(|item| item.kind.needs_receipt());
    let allow_missing_receipts = report.flag("allowMissingReceipts").unwrap_or(false);

    let mut email_error = None;
    let attachments = match decode_attachments(report) {
        Ok(a) => a,
        Err(e) => {
            email_error = Some(e);
            Vec::new()
        }
    };
    let attachment_count = attachments.len();
    let attachment_bytes: u64 = attachments.iter().map(|a| a.bytes.len() as u64).sum();

    if requested && has_receipt_items && attachments.is_empty() && !allow_missing_receipts {
        email_error = Some(
            "Receipt files missing: no attachments were provided. \
             Pass attachments, or set allowMissingReceipts=true to send without receipts."
                .to_string(),
        );
    }

    if requested && !settings.enabled {
        email_error = Some("Email sending is disabled (ENABLE_EMAIL_SEND is not true).".to_string());
    } else if requested && from_user.is_empty() {
        email_error = Some("MAIL_FROM_USER is required to send email via Graph.".to_string());
    } else if requested && summary.missing_gl_count > 0 {
        email_error = Some(format!(
            "Missing GL Account on {} line(s).",
            summary.missing_gl_count
        ));
    } else if requested && to_email.is_empty() {
        email_error = Some("No recipient: pass toEmail or set MAIL_TO_DEFAULT.".to_string());
    } else if send_allowed {
        if attachment_bytes > settings.max_attachment_bytes {
            email_error = Some(format!(
                "Attachments too large ({attachment_bytes} bytes). Reduce size or set GRAPH_MAX_ATTACHMENT_BYTES higher."
            ));
        }

        if email_error.is_none() {
            email_error = match mailer {
                None => Some("GRAPH_ACCESS_TOKEN is required to send email via Graph.".to_string()),
                Some(mailer) => {
                    let body_text = {
                        let text = report.text(&["bodyText"]);
                        if text.is_empty() {
                            format!(
                                "Travel expense submission generated by the bot.\nLines: {}\nTotal: {:.2}",
                                summary.line_count, summary.amount_total
                            )
                        } else {
                            text
                        }
                    };
                    let subject = {
                        let subject = report.text(&["subject"]);
                        if subject.is_empty() {
                            DEFAULT_SUBJECT.to_string()
                        } else {
                            subject
                        }
                    };
                    let mail = OutgoingMail {
                        from_user: from_user.clone(),
                        to: to_email.clone(),
                        cc: cc_recipients(report, &to_email),
                        subject,
                        body_text,
                        body_html: report.get("bodyHtml").and_then(Value::as_str).map(str::to_string),
                        csv_text,
                        attachments,
                    };
                    info!(
                        to = %mail.to,
                        cc = mail.cc.len(),
                        attachments = mail.attachments.len(),
                        bytes = attachment_bytes,
                        "Sending expense report"
                    );
                    mailer.send(&mail).await.err().map(|e| match e {
                        Error::Upstream(message) => message,
                        other => other.to_string(),
                    })
                }
            };
        }
    }

    if requested {
        if let Some(error) = &email_error {
            warn!(error = %error, "Expense report not sent");
        }
    }

    let sent = send_allowed && email_error.is_none();
    Ok(SubmitResult {
        ok: !requested || sent,
        sent,
        to_email,
        line_count: summary.line_count,
        amount_total: summary.amount_total,
        missing_gl_count: summary.missing_gl_count,
        csv_filename: CSV_FILENAME,
        email_error,
        attachment_count,
        has_receipt_items,
        allow_missing_receipts,
        upload_ids: upload_ids(report),
        conversation_id: report.text(&["conversationId", "ConversationId", "threadId", "ThreadId"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()
    }

    fn enabled() -> MailSettings {
        MailSettings {
            enabled: true,
            from_user: "bot@corp.coop".into(),
            to_default: "ap@corp.coop".into(),
            ..MailSettings::default()
        }
    }

    fn mileage_report(extra: Value) -> ExpenseReport {
        let mut payload = json!({
            "requesterEmail": "JDoe@corp.coop",
            "items": [
                {"type": "mileage", "departmentCode": "620", "activityCode": "100", "accountCode": "5510", "amount": 12.5},
                {"type": "mileage", "departmentCode": "620", "activityCode": "100", "accountCode": "5510", "amount": "7.25"}
            ]
        });
        if let (Some(p), Some(e)) = (payload.as_object_mut(), extra.as_object()) {
            p.extend(e.clone());
        }
        ExpenseReport::from_value(payload)
    }

    #[test]
    fn test_summary() {
        let report = ExpenseReport::from_value(json!({"items": [
            {"type": "receipt", "departmentCode": "620", "activityCode": "100", "amount": 10.004},
            {"type": "receipt", "departmentCode": "620", "activityCode": "100", "accountCode": "5500", "amount": 5}
        ]}));
        let rows: Vec<_> = build_import_rows(&report, today()).collect();
        let summary = ReportSummary::from_rows(&rows);
        assert_eq!(summary.line_count, 2);
        assert_eq!(summary.amount_total, 15.0);
        assert_eq!(summary.missing_gl_count, 1);
    }

    #[test]
    fn test_cc_recipients() {
        let report = ExpenseReport::from_value(json!({
            "requesterEmail": "JDoe@corp.coop",
            "ccEmails": "Boss@corp.coop; jdoe@corp.coop, ap@corp.coop,,"
        }));
        assert_eq!(cc_recipients(&report, "AP@corp.coop"), vec!["jdoe@corp.coop", "boss@corp.coop"]);

        let report = ExpenseReport::from_value(json!({
            "requesterEmail": "jdoe@corp.coop",
            "ccRequester": "no",
            "cc": ["A@corp.coop", "a@corp.coop", 7]
        }));
        assert_eq!(cc_recipients(&report, "ap@corp.coop"), vec!["a@corp.coop"]);
    }

    #[test]
    fn test_decode_attachments() {
        let pdf = STANDARD.encode(b"%PDF-1.7 receipt");
        let report = ExpenseReport::from_value(json!({"attachments": [
            {"name": "hotel", "contentBytes": pdf}
        ]}));
        let attachments = decode_attachments(&report).unwrap();
        assert_eq!(attachments[0].name, "hotel.pdf");
        assert_eq!(attachments[0].content_type, "application/pdf");

        let report = ExpenseReport::from_value(json!({"attachments": [
            {"name": "x.png", "contentType": "image/png", "contentBytes": STANDARD.encode(b"not a png")}
        ]}));
        assert_eq!(
            decode_attachments(&report).unwrap_err(),
            "attachments[0] content does not match image/png"
        );

        let report = ExpenseReport::from_value(json!({"attachments": ["nope"]}));
        assert_eq!(decode_attachments(&report).unwrap_err(), "attachments[0] must be an object");

        let report = ExpenseReport::from_value(json!({"attachments": [{"contentBytes": "@@@"}]}));
        assert!(decode_attachments(&report).unwrap_err().contains("invalid base64"));
    }

    #[test]
    fn test_graph_message() {
        let mail = OutgoingMail {
            from_user: "bot@corp.coop".into(),
            to: "ap@corp.coop".into(),
            cc: vec!["jdoe@corp.coop".into()],
            subject: DEFAULT_SUBJECT.into(),
            body_text: "hello".into(),
            body_html: Some("  ".into()),
            csv_text: "a,b\n".into(),
            attachments: vec![],
        };
        let message = graph_message(&mail);
        assert_eq!(message["message"]["body"]["contentType"], "Text");
        assert_eq!(message["message"]["attachments"][0]["name"], CSV_FILENAME);
        assert_eq!(message["message"]["attachments"][0]["contentBytes"], STANDARD.encode("a,b\n"));
        assert_eq!(message["message"]["ccRecipients"][0]["emailAddress"]["address"], "jdoe@corp.coop");
    }

    #[test]
    fn test_merge_query_params() {
        let mut report = ExpenseReport::from_value(json!({"toEmail": "", "subject": "kept"}));
        let params = HashMap::from([
            ("toEmail".to_string(), "ap@corp.coop".to_string()),
            ("subject".to_string(), "ignored".to_string()),
            ("sendEmail".to_string(), "false".to_string()),
            ("ccRequester".to_string(), "maybe".to_string()),
        ]);
        merge_query_params(&mut report, &params);
        assert_eq!(report.text(&["toEmail"]), "ap@corp.coop");
        assert_eq!(report.text(&["subject"]), "kept");
        assert_eq!(report.flag("sendEmail"), Some(false));
        assert_eq!(report.flag("ccRequester"), None);
    }

    #[tokio::test]
    async fn test_sends_when_enabled() {
        let mailer = MockMailer::default();
        let result = submit_report(&mileage_report(json!({})), &enabled(), Some(&mailer), today())
            .await
            .unwrap();

        assert!(result.ok);
        assert!(result.sent);
        assert_eq!(result.line_count, 2);
        assert_eq!(result.amount_total, 19.75);
        assert_eq!(result.email_error, None);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ap@corp.coop");
        assert_eq!(sent[0].cc, vec!["jdoe@corp.coop"]);
        assert_eq!(sent[0].subject, DEFAULT_SUBJECT);
        assert!(sent[0].body_text.ends_with("Lines: 2\nTotal: 19.75"));
        assert!(sent[0].csv_text.starts_with("GL Division,"));
    }

    #[tokio::test]
    async fn test_disabled_mail() {
        let mailer = MockMailer::default();
        let result = submit_report(&mileage_report(json!({})), &MailSettings::default(), Some(&mailer), today())
            .await
            .unwrap();
        assert!(!result.ok);
        assert!(!result.sent);
        assert_eq!(
            result.email_error.as_deref(),
            Some("Email sending is disabled (ENABLE_EMAIL_SEND is not true).")
        );
        assert!(mailer.sent().is_empty());

        let result = submit_report(
            &mileage_report(json!({"sendEmail": false})),
            &MailSettings::default(),
            Some(&mailer),
            today(),
        )
        .await
        .unwrap();
        assert!(result.ok);
        assert!(!result.sent);
    }

    #[tokio::test]
    async fn test_gates() {
        let mailer = MockMailer::default();

        let settings = MailSettings { from_user: String::new(), ..enabled() };
        let result = submit_report(&mileage_report(json!({})), &settings, Some(&mailer), today())
            .await
            .unwrap();
        assert!(result.email_error.unwrap().starts_with("MAIL_FROM_USER is required"));

        let report = ExpenseReport::from_value(json!({"items": [
            {"type": "mileage", "departmentCode": "620", "activityCode": "100", "amount": 3}
        ]}));
        let result = submit_report(&report, &enabled(), Some(&mailer), today()).await.unwrap();
        assert_eq!(result.email_error.as_deref(), Some("Missing GL Account on 1 line(s)."));

        let settings = MailSettings { max_attachment_bytes: 4, ..enabled() };
        let report = mileage_report(json!({"attachments": [
            {"name": "r.pdf", "contentBytes": STANDARD.encode(b"%PDF-1.7")}
        ]}));
        let result = submit_report(&report, &settings, Some(&mailer), today()).await.unwrap();
        assert!(result.email_error.unwrap().starts_with("Attachments too large (8 bytes)"));
        assert_eq!(result.attachment_count, 1);

        let result = submit_report(&mileage_report(json!({})), &enabled(), None, today()).await.unwrap();
        assert!(result.email_error.unwrap().starts_with("GRAPH_ACCESS_TOKEN"));

        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_receipts_required() {
        let mailer = MockMailer::default();
        let report = ExpenseReport::from_value(json!({
            "conversationId": "conv-1",
            "items": [{"type": "receipt", "departmentCode": "620", "activityCode": "100",
                       "accountCode": "5500", "amount": 20, "receiptUploadId": "u1"}]
        }));
        let result = submit_report(&report, &enabled(), Some(&mailer), today()).await.unwrap();
        assert!(!result.sent);
        assert!(result.has_receipt_items);
        assert!(result.email_error.unwrap().starts_with("Receipt files missing"));
        assert_eq!(result.upload_ids, vec!["u1"]);
        assert_eq!(result.conversation_id, "conv-1");

        let mut report = report;
        report.set_if_missing("allowMissingReceipts", Value::Bool(true));
        let result = submit_report(&report, &enabled(), Some(&mailer), today()).await.unwrap();
        assert!(result.sent);
        assert!(result.allow_missing_receipts);
    }

    #[tokio::test]
    async fn test_mailer_failure() {
        let mailer = MockMailer {
            fail_with: Some("Graph sendMail failed: 403 Forbidden".into()),
            ..MockMailer::default()
        };
        let result = submit_report(&mileage_report(json!({})), &enabled(), Some(&mailer), today())
            .await
            .unwrap();
        assert!(!result.ok);
        assert_eq!(result.email_error.as_deref(), Some("Graph sendMail failed: 403 Forbidden"));
    }
}
