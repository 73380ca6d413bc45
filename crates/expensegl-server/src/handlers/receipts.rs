//! Receipt categorization handler

use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use expensegl_core::{suggest_receipt_category, ReceiptSummary};

#[derive(Debug, Deserialize)]
pub struct ReceiptCategoryRequest {
    pub merchant: Option<String>,
    /// OCR fields of an analyzed receipt (`MerchantName`, `Total`, ...)
    pub fields: Option<Value>,
}

/// POST /api/receipt-category - Suggest an expense category for a receipt
pub async fn receipt_category(Json(req): Json<ReceiptCategoryRequest>) -> Json<Value> {
    if let Some(fields) = req.fields.filter(Value::is_object) {
        let summary = ReceiptSummary::from_fields(&fields);
        return Json(json!({
            "ok": true,
            "merchant": summary.merchant,
            "category": summary.category,
            "summary": summary,
        }));
    }

    let merchant = req.merchant.unwrap_or_default().trim().to_string();
    let category = suggest_receipt_category(&merchant);
    Json(json!({
        "ok": true,
        "merchant": merchant,
        "category": category,
    }))
}
