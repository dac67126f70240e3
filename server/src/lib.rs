//! HTTP host for the scan gateway.
//!
//! # Design
//! A thin axum layer over the core handlers: the path→handler table is built
//! once at startup, the API-key gate runs as middleware before any handler
//! (including the 404 fallback), and every response is the core's
//! `{data, result}` envelope with `http_code` doubling as the HTTP status.
//! Outbound backend calls block, so scan work hops to the blocking pool —
//! each request runs synchronously on its own thread of control.

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use scanbridge_core::handlers::{self, Gateway, ScanParams};
use scanbridge_core::types::ApiResult;

/// Header carrying the gateway API key.
pub const API_KEY_HEADER: &str = "BBUDDY-API-KEY";

pub type SharedGateway = Arc<Gateway>;

/// The dispatch table. Unmatched paths produce the 404 envelope; the auth
/// layer wraps the fallback too, so unauthorized requests terminate first.
pub fn app(gateway: SharedGateway) -> Router {
    Router::new()
        .route("/api/action/scan", get(scan).post(scan))
        .route("/api/state/getmode", get(get_mode))
        .route("/api/state/setmode", post(set_mode))
        .route("/api/system/barcodes", get(barcode_table))
        .route("/api/system/info", get(system_info))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(gateway.clone(), require_api_key))
        .with_state(gateway)
}

fn envelope(result: ApiResult) -> Response {
    let status = StatusCode::from_u16(result.result.http_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(result)).into_response()
}

/// Run an envelope-producing closure on the blocking pool.
async fn run_blocking(task: impl FnOnce() -> ApiResult + Send + 'static) -> Response {
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => envelope(result),
        Err(err) => {
            tracing::error!("route task panicked: {err}");
            envelope(ApiResult::error("Internal server error", 500))
        }
    }
}

#[derive(Deserialize)]
struct AuthQuery {
    apikey: Option<String>,
}

async fn require_api_key(
    State(gateway): State<SharedGateway>,
    Query(query): Query<AuthQuery>,
    request: Request,
    next: Next,
) -> Response {
    let header_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if gateway.authorize(header_key, query.apikey.as_deref()) {
        next.run(request).await
    } else {
        envelope(handlers::unauthorized())
    }
}

#[derive(Deserialize)]
struct ScanQuery {
    text: Option<String>,
    add: Option<String>,
}

/// POST form fields of the scan route. Field names are part of the wire
/// contract.
#[derive(Deserialize, Default)]
struct ScanForm {
    barcode: Option<String>,
    #[serde(rename = "bestBeforeInDays")]
    best_before_in_days: Option<String>,
    price: Option<String>,
}

/// Serves GET (query parameters) and POST (urlencoded body) alike, tolerant
/// of the content-type headers barcode-scanner apps forget to send.
async fn scan(
    State(gateway): State<SharedGateway>,
    Query(query): Query<ScanQuery>,
    body: String,
) -> Response {
    let form: ScanForm = serde_urlencoded::from_str(&body).unwrap_or_default();
    let params = ScanParams {
        barcode: form.barcode,
        text: query.text,
        add: query.add,
        best_before_in_days: form.best_before_in_days,
        price: form.price,
    };
    run_blocking(move || gateway.scan(&params)).await
}

async fn get_mode(State(gateway): State<SharedGateway>) -> Response {
    envelope(gateway.get_mode())
}

#[derive(Deserialize, Default)]
struct SetModeForm {
    state: Option<String>,
}

async fn set_mode(State(gateway): State<SharedGateway>, body: String) -> Response {
    let form: SetModeForm = serde_urlencoded::from_str(&body).unwrap_or_default();
    envelope(gateway.set_mode(form.state.as_deref()))
}

async fn barcode_table(State(gateway): State<SharedGateway>) -> Response {
    envelope(gateway.barcode_table())
}

async fn system_info(State(gateway): State<SharedGateway>) -> Response {
    envelope(gateway.system_info())
}

async fn not_found() -> Response {
    envelope(handlers::not_found())
}
