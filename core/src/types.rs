//! Wire shapes: the uniform API envelope and normalized backend records.
//!
//! # Design
//! Backend payloads are navigated as `serde_json::Value` and normalized into
//! small owned structs here, because the backend serializes numbers
//! inconsistently (JSON numbers or numeric strings, sometimes null). The
//! `loose_*` helpers accept every observed form so a backend upgrade cannot
//! silently turn a stock amount into a parse failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform envelope returned by every API operation, success or failure:
/// `{"data": ..., "result": {"result": ..., "http_code": ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResult {
    pub data: Value,
    pub result: ResultInfo,
}

/// Outcome half of the envelope; `http_code` doubles as the HTTP status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultInfo {
    pub result: String,
    pub http_code: u16,
}

impl ApiResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            result: ResultInfo {
                result: "OK".to_string(),
                http_code: 200,
            },
        }
    }

    pub fn ok_empty() -> Self {
        Self::ok(Value::Null)
    }

    pub fn error(message: impl Into<String>, http_code: u16) -> Self {
        Self {
            data: Value::Null,
            result: ResultInfo {
                result: message.into(),
                http_code,
            },
        }
    }
}

/// Normalized product subset resolved from a barcode lookup. Fetched fresh
/// for every transaction, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub unit: String,
    pub stock_amount: f64,
    pub tare_weight: f64,
    pub tare_handling: bool,
    /// Purchase-to-stock quantity conversion factor.
    pub qu_factor: f64,
    /// `-1` means the product never expires.
    pub default_best_before_days: i64,
}

impl ProductSummary {
    /// Build from a `stock/products/by-barcode` payload. `None` when the
    /// payload carries no product (benign "not found" responses).
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let product = payload.get("product")?;
        Some(Self {
            id: product.get("id").and_then(loose_i64)?,
            name: product
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            unit: payload["quantity_unit_stock"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            stock_amount: payload
                .get("stock_amount")
                .and_then(loose_f64)
                .unwrap_or(0.0),
            tare_weight: product
                .get("tare_weight")
                .and_then(loose_f64)
                .unwrap_or(0.0),
            tare_handling: product
                .get("enable_tare_weight_handling")
                .map(loose_bool)
                .unwrap_or(false),
            qu_factor: product
                .get("qu_factor_purchase_to_stock")
                .and_then(loose_f64)
                .unwrap_or(1.0),
            default_best_before_days: product
                .get("default_best_before_days")
                .and_then(loose_i64)
                .unwrap_or(0),
        })
    }
}

/// Normalized product record resolved by id.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetails {
    pub id: i64,
    pub barcode: Option<String>,
    pub name: String,
    pub unit: String,
    pub stock_amount: f64,
    pub default_best_before_days: i64,
}

impl ProductDetails {
    /// Build from a `stock/products/{id}` payload; `None` when unmatched.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let product = payload.get("product")?;
        Some(Self {
            id: product.get("id").and_then(loose_i64)?,
            barcode: product
                .get("barcode")
                .and_then(Value::as_str)
                .map(str::to_string),
            name: product
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            unit: payload["quantity_unit_stock"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            stock_amount: payload
                .get("stock_amount")
                .and_then(loose_f64)
                .unwrap_or(0.0),
            default_best_before_days: product
                .get("default_best_before_days")
                .and_then(loose_i64)
                .unwrap_or(0),
        })
    }
}

/// Accept a JSON number or a numeric string.
pub(crate) fn loose_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accept a JSON integer or an integer string.
pub(crate) fn loose_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accept the backend's boolean spellings: `true`, `1`, `"1"`.
pub(crate) fn loose_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s == "1",
        _ => false,
    }
}
