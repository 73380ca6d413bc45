//! Expense report payloads
//!
//! Payloads arrive from a chat connector that is loose about shape: a JSON
//! object with an `items` array, an object whose items are a JSON string under
//! `draftItemsJson`, a bare JSON array, or even the raw array text as the
//! request body. [`ExpenseReport`] accepts all of them and exposes typed
//! [`ExpenseItem`]s without ever failing on a malformed item.

use std::fmt;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::extract::value_text;

/// Expense item type as used for invoice numbering and receipt rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemType {
    Receipt,
    Boots,
    Mileage,
    PerDiem,
    Other(String),
}

impl ItemType {
    /// Parse leniently: case and spaces are ignored (`"Per Diem"` → `PerDiem`)
    pub fn parse(raw: &str) -> Self {
        let key: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "" | "receipt" => Self::Receipt,
            "boots" => Self::Boots,
            "mileage" => Self::Mileage,
            "perdiem" => Self::PerDiem,
            _ => Self::Other(key),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Receipt => "receipt",
            Self::Boots => "boots",
            Self::Mileage => "mileage",
            Self::PerDiem => "perdiem",
            Self::Other(s) => s,
        }
    }

    /// Items that are backed by a receipt file
    pub fn needs_receipt(&self) -> bool {
        matches!(self, Self::Receipt | Self::Boots)
    }

    /// Invoice number prefix for this item type
    pub fn invoice_prefix(&self) -> &'static str {
        match self {
            Self::PerDiem => "PER DIEM",
            Self::Mileage => "MIL",
            Self::Receipt | Self::Boots | Self::Other(_) => "EXP",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One account split of an expense item
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseLine {
    /// Raw amount; `None` when the payload's value is not a number
    pub amount: Option<f64>,
    pub activity_code: String,
    pub account_code: String,
}

/// A caller-supplied expense item
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseItem {
    /// Type used for invoice numbering (`type` only; missing means receipt)
    pub item_type: ItemType,
    /// Type used for receipt rules (`type`, else `mode`)
    pub kind: ItemType,
    pub department_code: String,
    pub activity_code: String,
    pub account_code: String,
    pub reference: String,
    pub description: String,
    pub gl_account_override: String,
    /// Explicit lines from a non-empty `lines` array; entries that are not
    /// objects are dropped. `None` means "one line from the item itself".
    pub lines: Option<Vec<ExpenseLine>>,
    /// Item-level amount (`amountTotal`, else `amount`)
    pub amount: Option<f64>,
    /// Receipt upload identifiers referenced by this item
    pub upload_ids: Vec<String>,
}

impl ExpenseItem {
    /// Build an item from a JSON object; anything else is not an item
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let item_type_raw = text(obj, &["type"]);
        let item_type = ItemType::parse(&item_type_raw);
        let kind = if item_type_raw.is_empty() {
            ItemType::parse(&text(obj, &["mode"]))
        } else {
            item_type.clone()
        };

        let activity_code = text(obj, &["activityCode"]);
        let account_code = text(obj, &["accountCode"]);

        let lines = obj
            .get("lines")
            .and_then(Value::as_array)
            .filter(|lines| !lines.is_empty())
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|line| ExpenseLine {
                        amount: line.get("amount").and_then(parse_amount),
                        activity_code: or_else(text(line, &["activityCode"]), &activity_code),
                        account_code: or_else(text(line, &["accountCode"]), &account_code),
                    })
                    .collect()
            });

        let amount = obj
            .get("amountTotal")
            .filter(|v| is_truthy(v))
            .or_else(|| obj.get("amount"))
            .and_then(parse_amount);

        let mut upload_ids: Vec<String> = Vec::new();
        if kind.needs_receipt() {
            for keys in [
                &["receiptUploadId", "uploadId"][..],
                &["bootAuthorizationUploadId", "bootsAuthorizationUploadId", "authorizationUploadId"][..],
            ] {
                let id = text(obj, keys);
                if !id.is_empty() && !upload_ids.contains(&id) {
                    upload_ids.push(id);
                }
            }
        }

        Some(Self {
            item_type,
            kind,
            department_code: text(obj, &["departmentCode"]),
            activity_code,
            account_code,
            reference: text(obj, &["reference"]),
            description: text(obj, &["description"]),
            gl_account_override: text(obj, &["glAccountOverride"]),
            lines,
            amount,
            upload_ids,
        })
    }

    /// Lines to post, in order. An item with no `lines` (or an empty array)
    /// posts one line built from its own amount and codes.
    pub fn posting_lines(&self) -> Vec<ExpenseLine> {
        if let Some(lines) = &self.lines {
            return lines.clone();
        }
        vec![ExpenseLine {
            amount: self.amount,
            activity_code: self.activity_code.clone(),
            account_code: self.account_code.clone(),
        }]
    }
}

/// Requester identity printed on every import row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    pub organization_name: String,
    pub first_name: String,
    pub last_name: String,
}

/// A submitted expense report payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseReport {
    fields: Map<String, Value>,
}

impl ExpenseReport {
    /// Wrap a parsed JSON value; a bare array becomes the draft items
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            Value::Array(_) => Self::from_draft_items(value.to_string()),
            Value::Null => Self::default(),
            other => match other.as_str() {
                Some(s) => Self::from_draft_items(s.to_string()),
                None => Self::default(),
            },
        }
    }

    /// Accept any request body: JSON object, JSON array, or raw draft-items text
    pub fn from_body(body: &str) -> Self {
        let body = body.trim();
        if body.is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_value(value),
            Err(_) => {
                debug!("Request body is not JSON, treating it as draft items text");
                Self::from_draft_items(body.to_string())
            }
        }
    }

    fn from_draft_items(raw: String) -> Self {
        let mut fields = Map::new();
        fields.insert("draftItemsJson".to_string(), Value::String(raw));
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Raw field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// First non-blank text among `keys`, or ""
    pub fn text(&self, keys: &[&str]) -> String {
        text(&self.fields, keys)
    }

    /// Boolean flag accepting JSON booleans, numbers and yes/no strings
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.fields.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|n| n != 0.0),
            Value::String(s) => parse_flag(s),
            _ => None,
        }
    }

    /// Fill a field only when it is missing or blank
    pub fn set_if_missing(&mut self, key: &str, value: Value) {
        let blank = match self.fields.get(key) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if blank {
            self.fields.insert(key.to_string(), value);
        }
    }

    pub fn division(&self) -> String {
        or_else(self.text(&["division"]), "0000")
    }

    pub fn vendor(&self) -> String {
        or_else(self.text(&["vendor"]), "CORE")
    }

    pub fn requester(&self) -> Requester {
        let requester = self.fields.get("requester").and_then(Value::as_object);
        let field = |key: &str| requester.map(|r| text(r, &[key])).unwrap_or_default();
        Requester {
            organization_name: field("organizationName"),
            first_name: field("firstName"),
            last_name: field("lastName"),
        }
    }

    /// Expense items in payload order; malformed entries are dropped
    pub fn items(&self) -> Vec<ExpenseItem> {
        let parsed;
        let items = match self.fields.get("items") {
            Some(Value::Null) | None => match self.fields.get("draftItemsJson") {
                Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                    Ok(v) => {
                        parsed = v;
                        &parsed
                    }
                    Err(e) => {
                        warn!(error = %e, "draftItemsJson is not valid JSON");
                        return Vec::new();
                    }
                },
                _ => return Vec::new(),
            },
            Some(items) => items,
        };

        items
            .as_array()
            .map(|items| items.iter().filter_map(ExpenseItem::from_value).collect())
            .unwrap_or_default()
    }
}

/// Parse a yes/no style flag; unknown text is `None`
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Numeric amount from a JSON number or a plain numeric string
pub fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(value_text))
        .unwrap_or_default()
}

fn or_else(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_type_parse() {
        assert_eq!(ItemType::parse("Per Diem"), ItemType::PerDiem);
        assert_eq!(ItemType::parse("RECEIPT"), ItemType::Receipt);
        assert_eq!(ItemType::parse(""), ItemType::Receipt);
        assert_eq!(ItemType::parse("Toll Road"), ItemType::Other("tollroad".into()));
        assert_eq!(ItemType::parse("boots").invoice_prefix(), "EXP");
        assert_eq!(ItemType::parse("mileage").invoice_prefix(), "MIL");
        assert_eq!(ItemType::parse("tolls").invoice_prefix(), "EXP");
    }

    #[test]
    fn test_item_without_lines_posts_itself() {
        let item = ExpenseItem::from_value(&json!({
            "type": "receipt",
            "departmentCode": 620,
            "activityCode": "770",
            "accountCode": "5500",
            "amount": 42.5,
            "reference": "conf fee"
        }))
        .unwrap();

        assert_eq!(item.department_code, "620");
        let lines = item.posting_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].amount, Some(42.5));
        assert_eq!(lines[0].account_code, "5500");
    }

    #[test]
    fn test_split_lines_inherit_item_codes() {
        let item = ExpenseItem::from_value(&json!({
            "activityCode": "700",
            "accountCode": "5400",
            "lines": [
                {"amount": "10.00", "accountCode": "5410"},
                "junk",
                {"amount": 5, "activityCode": "770"}
            ]
        }))
        .unwrap();

        let lines = item.posting_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].activity_code, "700");
        assert_eq!(lines[0].account_code, "5410");
        assert_eq!(lines[1].activity_code, "770");
        assert_eq!(lines[1].account_code, "5400");
    }

    #[test]
    fn test_lines_without_objects_post_nothing() {
        let item = ExpenseItem::from_value(&json!({
            "amount": 5,
            "accountCode": "5400",
            "lines": ["junk", 7]
        }))
        .unwrap();
        assert_eq!(item.lines, Some(Vec::new()));
        assert!(item.posting_lines().is_empty());
    }

    #[test]
    fn test_empty_lines_post_item_itself() {
        let item = ExpenseItem::from_value(&json!({
            "amount": 5,
            "accountCode": "5400",
            "lines": []
        }))
        .unwrap();
        assert_eq!(item.lines, None);
        let lines = item.posting_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].amount, Some(5.0));
        assert_eq!(lines[0].account_code, "5400");
    }

    #[test]
    fn test_mode_only_drives_receipt_rules() {
        let item = ExpenseItem::from_value(&json!({"mode": "mileage", "uploadId": "u1"})).unwrap();
        assert_eq!(item.item_type, ItemType::Receipt);
        assert_eq!(item.item_type.invoice_prefix(), "EXP");
        assert_eq!(item.kind, ItemType::Mileage);
        assert!(item.upload_ids.is_empty());

        let item = ExpenseItem::from_value(&json!({"mode": "boots", "uploadId": "u1"})).unwrap();
        assert!(item.kind.needs_receipt());
        assert_eq!(item.upload_ids, vec!["u1"]);
    }

    #[test]
    fn test_amount_total_preferred_when_set() {
        let item = ExpenseItem::from_value(&json!({"amountTotal": 0, "amount": "12.34"})).unwrap();
        assert_eq!(item.amount, Some(12.34));
        let item = ExpenseItem::from_value(&json!({"amountTotal": 20, "amount": 12})).unwrap();
        assert_eq!(item.amount, Some(20.0));
        let item = ExpenseItem::from_value(&json!({"amount": "twelve"})).unwrap();
        assert_eq!(item.amount, None);
    }

    #[test]
    fn test_upload_ids_collected_for_receipts() {
        let item = ExpenseItem::from_value(&json!({
            "type": "boots",
            "uploadId": "u1",
            "bootAuthorizationUploadId": "u2"
        }))
        .unwrap();
        assert_eq!(item.upload_ids, vec!["u1", "u2"]);

        let item = ExpenseItem::from_value(&json!({"type": "mileage", "uploadId": "u1"})).unwrap();
        assert!(item.upload_ids.is_empty());
    }

    #[test]
    fn test_report_intake_shapes() {
        let items = json!([{"type": "receipt", "amount": 1}]);

        let object = ExpenseReport::from_body(&json!({"items": items}).to_string());
        let draft = ExpenseReport::from_body(&json!({"draftItemsJson": items.to_string()}).to_string());
        let bare = ExpenseReport::from_body(&items.to_string());

        assert_eq!(object.items().len(), 1);
        assert_eq!(draft.items().len(), 1);
        assert_eq!(bare.items().len(), 1);
        assert_eq!(bare.text(&["draftItemsJson"]), items.to_string());

        let raw = ExpenseReport::from_body("not json at all");
        assert_eq!(raw.text(&["draftItemsJson"]), "not json at all");
        assert!(raw.items().is_empty());

        assert!(ExpenseReport::from_body("").items().is_empty());
        assert!(ExpenseReport::from_value(json!({"items": "nope"})).items().is_empty());
    }

    #[test]
    fn test_report_defaults_and_requester() {
        let report = ExpenseReport::from_value(json!({
            "vendor": "ACME",
            "division": " ",
            "requester": {"firstName": "Jane", "lastName": "Doe"}
        }));
        assert_eq!(report.division(), "0000");
        assert_eq!(report.vendor(), "ACME");
        assert_eq!(
            report.requester(),
            Requester {
                organization_name: String::new(),
                first_name: "Jane".into(),
                last_name: "Doe".into()
            }
        );
    }

    #[test]
    fn test_flags() {
        let report = ExpenseReport::from_value(json!({
            "a": true, "b": "no", "c": 1, "d": "maybe"
        }));
        assert_eq!(report.flag("a"), Some(true));
        assert_eq!(report.flag("b"), Some(false));
        assert_eq!(report.flag("c"), Some(true));
        assert_eq!(report.flag("d"), None);
        assert_eq!(report.flag("missing"), None);
    }

    #[test]
    fn test_set_if_missing() {
        let mut report = ExpenseReport::from_value(json!({"toEmail": "", "subject": "Mine"}));
        report.set_if_missing("toEmail", json!("ap@corp.coop"));
        report.set_if_missing("subject", json!("Other"));
        assert_eq!(report.text(&["toEmail"]), "ap@corp.coop");
        assert_eq!(report.text(&["subject"]), "Mine");
    }
}
