//! Receipt categorization and OCR field summaries

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::extract_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptCategory {
    Hotel,
    Airfare,
    Transportation,
    Parking,
    Meal,
    Fuel,
    Other,
}

/// Checked in order; the first category with a matching keyword wins
const CATEGORY_KEYWORDS: &[(ReceiptCategory, &[&str])] = &[
    (
        ReceiptCategory::Hotel,
        &["hotel", "marriott", "hilton", "hyatt", "inn", "suites", "lodge"],
    ),
    (
        ReceiptCategory::Airfare,
        &["airline", "delta", "united", "american", "southwest", "flight"],
    ),
    (ReceiptCategory::Transportation, &["uber", "lyft", "taxi", "cab"]),
    (ReceiptCategory::Parking, &["parking", "garage"]),
    (
        ReceiptCategory::Meal,
        &[
            "restaurant", "cafe", "coffee", "starbucks", "mcdonald", "wendy", "subway", "chipotle",
            "diner", "grill", "kitchen", "bistro",
        ],
    ),
    (
        ReceiptCategory::Fuel,
        &["gas", "fuel", "shell", "chevron", "exxon", "bp", "conoco", "phillips"],
    ),
];

impl ReceiptCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hotel => "hotel",
            Self::Airfare => "airfare",
            Self::Transportation => "transportation",
            Self::Parking => "parking",
            Self::Meal => "meal",
            Self::Fuel => "fuel",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ReceiptCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guess a category from the merchant name by substring match.
///
/// Matching is plain substring, so "Holiday Inn" is a hotel and so is
/// anything else containing "inn".
pub fn suggest_receipt_category(merchant: &str) -> ReceiptCategory {
    let merchant = merchant.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| merchant.contains(kw)))
        .map(|(category, _)| *category)
        .unwrap_or(ReceiptCategory::Other)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLineItem {
    pub description: String,
    pub amount: f64,
    pub quantity: f64,
}

/// Summary of a receipt recognized by a document OCR service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    pub merchant: String,
    /// MM/DD/YYYY when the OCR date parses, else the raw text
    pub date: String,
    pub total: f64,
    pub subtotal: f64,
    pub tax: f64,
    pub items: Vec<ReceiptLineItem>,
    pub category: ReceiptCategory,
}

/// Typed value of one OCR field (`valueString`, `valueCurrency.amount`, ...)
fn field_value(field: &Value) -> Option<&Value> {
    const KEYS: &[&str] = &[
        "valueString",
        "valueNumber",
        "valueInteger",
        "valueDate",
        "valueCurrency",
        "valueArray",
        "valueObject",
        "content",
    ];
    let (key, value) = KEYS
        .iter()
        .find_map(|k| field.get(*k).filter(|v| !v.is_null()).map(|v| (*k, v)))?;
    if key == "valueCurrency" {
        return value.get("amount").or(Some(value));
    }
    Some(value)
}

fn field_text(fields: &Value, name: &str) -> String {
    match fields.get(name).and_then(field_value) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(v @ Value::Number(_)) => v.to_string(),
        _ => String::new(),
    }
}

fn field_number(fields: &Value, name: &str) -> f64 {
    fields
        .get(name)
        .and_then(field_value)
        .and_then(extract_number)
        .unwrap_or(0.0)
}

impl ReceiptSummary {
    /// Build from the `fields` object of the first analyzed document
    pub fn from_fields(fields: &Value) -> Self {
        let merchant = field_text(fields, "MerchantName");

        let raw_date = field_text(fields, "TransactionDate");
        let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
            .map(|d| d.format("%m/%d/%Y").to_string())
            .unwrap_or(raw_date);

        let items = fields
            .get("Items")
            .and_then(field_value)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        let item_fields = item.get("valueObject").unwrap_or(item);
                        ReceiptLineItem {
                            description: field_text(item_fields, "Description"),
                            amount: field_number(item_fields, "TotalPrice"),
                            quantity: field_number(item_fields, "Quantity"),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            category: suggest_receipt_category(&merchant),
            merchant,
            date,
            total: field_number(fields, "Total"),
            subtotal: field_number(fields, "Subtotal"),
            tax: field_number(fields, "TotalTax"),
            items,
        }
    }
}
