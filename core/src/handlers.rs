//! Envelope-returning handlers behind the API surface.
//!
//! # Design
//! The HTTP host stays a thin adapter: it parses query/form fields into
//! `ScanParams` strings and hands them here. Validation happens before any
//! backend work — a malformed numeric override is a 400 envelope and never
//! reaches the backend client — and every handler returns the same
//! `{data, result}` envelope, matching status code included.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::config::AppConfig;
use crate::grocy::GrocyApi;
use crate::http::{Transport, UreqTransport};
use crate::pipeline::ScanPipeline;
use crate::scanmode::ScanModeState;
use crate::types::ApiResult;

/// Gateway version reported by `/api/system/info`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Integer form of the version for client-side comparisons.
pub fn version_int() -> i64 {
    crate::grocy::version_triple(VERSION)
        .map(|(major, minor, patch)| i64::from(major) * 1000 + i64::from(minor) * 100 + i64::from(patch) * 10)
        .unwrap_or(0)
}

/// Everything a route handler needs, built once at startup.
pub struct Gateway {
    config: AppConfig,
    state: Arc<ScanModeState>,
    api: Arc<GrocyApi>,
    pipeline: ScanPipeline,
}

/// Raw scan-route fields as the client sent them. Numeric fields stay
/// strings until validation.
#[derive(Debug, Default, Clone)]
pub struct ScanParams {
    /// POST `barcode` field.
    pub barcode: Option<String>,
    /// GET `text` parameter.
    pub text: Option<String>,
    /// GET `add` parameter.
    pub add: Option<String>,
    pub best_before_in_days: Option<String>,
    pub price: Option<String>,
}

impl ScanParams {
    /// POST `barcode` wins, then `text`, then `add`; empty strings count as
    /// absent.
    fn barcode(&self) -> Option<&str> {
        [&self.barcode, &self.text, &self.add]
            .into_iter()
            .flatten()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }
}

impl Gateway {
    pub fn new(config: AppConfig, transport: Arc<dyn Transport>) -> Self {
        let state = Arc::new(ScanModeState::default());
        let api = Arc::new(GrocyApi::new(&config, transport));
        let pipeline = ScanPipeline::new(api.clone(), state.clone(), config.barcodes.clone());
        Self {
            config,
            state,
            api,
            pipeline,
        }
    }

    /// Production construction: a ureq transport configured from `config`.
    pub fn from_config(config: AppConfig) -> Self {
        let transport = Arc::new(UreqTransport::new(
            Duration::from_secs(config.http.timeout_secs),
            config.http.allow_insecure_tls,
            &format!("scanbridge v{VERSION}"),
        ));
        Self::new(config, transport)
    }

    /// API-key gate; the header value wins over the query parameter.
    pub fn authorize(&self, header_key: Option<&str>, query_key: Option<&str>) -> bool {
        if !self.config.auth.require_api_key {
            return true;
        }
        let supplied = header_key.or(query_key).unwrap_or("");
        !supplied.is_empty() && self.config.auth.api_keys.iter().any(|key| key == supplied)
    }

    /// `GET/POST /api/action/scan`
    pub fn scan(&self, params: &ScanParams) -> ApiResult {
        let Some(barcode) = params.barcode() else {
            return ApiResult::error("No barcode supplied", 400);
        };
        let best_before_days = match parse_optional::<i64>(&params.best_before_in_days) {
            Ok(value) => value,
            Err(()) => {
                return ApiResult::error(
                    "Invalid parameter bestBeforeInDays: needs to be type int",
                    400,
                );
            }
        };
        let price = match parse_optional::<f64>(&params.price) {
            Ok(value) => value,
            Err(()) => {
                return ApiResult::error("Invalid parameter price: needs to be type float", 400);
            }
        };
        let outcome = self
            .pipeline
            .process_barcode(barcode, true, best_before_days, price);
        ApiResult::ok(json!({"result": outcome}))
    }

    /// `GET /api/state/getmode`
    pub fn get_mode(&self) -> ApiResult {
        ApiResult::ok(json!({"mode": self.state.get().value()}))
    }

    /// `POST /api/state/setmode`
    pub fn set_mode(&self, state: Option<&str>) -> ApiResult {
        let parsed = state.and_then(|value| value.trim().parse::<i64>().ok());
        match parsed {
            Some(value) if self.state.set(value).is_ok() => ApiResult::ok_empty(),
            _ => ApiResult::error("Invalid state provided", 400),
        }
    }

    /// `GET /api/system/barcodes`
    pub fn barcode_table(&self) -> ApiResult {
        match serde_json::to_value(&self.config.barcodes) {
            Ok(table) => ApiResult::ok(table),
            Err(err) => ApiResult::error(err.to_string(), 500),
        }
    }

    /// `GET /api/system/info`
    pub fn system_info(&self) -> ApiResult {
        ApiResult::ok(json!({"version": VERSION, "version_int": version_int()}))
    }

    /// Facade access for flows beyond the scan routes (connection checks,
    /// barcode administration, chores).
    pub fn backend(&self) -> &GrocyApi {
        &self.api
    }

    pub fn mode_state(&self) -> &ScanModeState {
        &self.state
    }
}

/// 404 envelope for unmatched paths.
pub fn not_found() -> ApiResult {
    ApiResult::error("API call not found", 404)
}

/// 401 envelope; the request terminates without touching a handler.
pub fn unauthorized() -> ApiResult {
    ApiResult::error("Unauthorized", 401)
}

/// Absent or empty fields are `None`; present fields must parse.
fn parse_optional<T: FromStr>(field: &Option<String>) -> Result<Option<T>, ()> {
    match field.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| ()),
    }
}
