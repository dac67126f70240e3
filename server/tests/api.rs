//! Route, auth and validation behavior of the API surface, driven in-process.
//!
//! The backend URL points at a dead port: every test here must succeed (or
//! fail with a 4xx envelope) without a single backend round-trip.

use std::sync::Arc;

use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use scanbridge_core::config::AppConfig;
use scanbridge_core::handlers::Gateway;
use scanbridge_server::app;
use serde_json::Value;
use tower::ServiceExt;

fn test_app() -> Router {
    let mut config = AppConfig::default();
    config.backend.url = "http://127.0.0.1:1/api/".to_string();
    config.auth.api_keys = vec!["secret".to_string()];
    config.http.timeout_secs = 1;
    app(Arc::new(Gateway::from_config(config)))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Every response must be the envelope: exactly `data` and `result` on top,
/// exactly `result` and `http_code` inside.
fn assert_envelope(body: &Value) {
    let keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["data", "result"]);
    let result_keys: Vec<&str> = body["result"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(result_keys, ["http_code", "result"]);
}

fn authed_get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header("BBUDDY-API-KEY", "secret")
        .body(String::new())
        .unwrap()
}

fn authed_form_post(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("BBUDDY-API-KEY", "secret")
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

// --- auth gate ---

#[tokio::test]
async fn missing_key_returns_401_envelope_and_no_data() {
    let resp = test_app()
        .oneshot(Request::builder().uri("/api/system/barcodes").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_envelope(&body);
    assert!(body["data"].is_null());
    assert_eq!(body["result"]["result"], "Unauthorized");
    assert_eq!(body["result"]["http_code"], 401);
}

#[tokio::test]
async fn wrong_key_returns_401() {
    let resp = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/system/barcodes")
                .header("BBUDDY-API-KEY", "nope")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn query_apikey_is_accepted() {
    let resp = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/system/barcodes?apikey=secret")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_gate_runs_before_route_lookup() {
    let resp = test_app()
        .oneshot(Request::builder().uri("/api/no/such/route").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- dispatch ---

#[tokio::test]
async fn unknown_route_returns_404_envelope() {
    let resp = test_app().oneshot(authed_get("/api/no/such/route")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_envelope(&body);
    assert_eq!(body["result"]["result"], "API call not found");
}

#[tokio::test]
async fn barcode_table_lists_configured_prefixes() {
    let resp = test_app().oneshot(authed_get("/api/system/barcodes")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_envelope(&body);
    let table = body["data"].as_object().unwrap();
    assert_eq!(table.len(), 8);
    assert_eq!(table["BARCODE_C"], "BBUDDY-C");
    assert_eq!(table["BARCODE_Q"], "BBUDDY-Q-");
}

#[tokio::test]
async fn system_info_reports_version_pair() {
    let resp = test_app().oneshot(authed_get("/api/system/info")).await.unwrap();
    let body = body_json(resp).await;
    assert_envelope(&body);
    assert!(body["data"]["version"].is_string());
    assert!(body["data"]["version_int"].is_i64());
}

// --- mode state ---

#[tokio::test]
async fn mode_roundtrip_through_routes() {
    let mut config = AppConfig::default();
    config.backend.url = "http://127.0.0.1:1/api/".to_string();
    config.auth.api_keys = vec!["secret".to_string()];
    let gateway = Arc::new(Gateway::from_config(config));

    let resp = app(gateway.clone()).oneshot(authed_get("/api/state/getmode")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["mode"], 0);

    let resp = app(gateway.clone())
        .oneshot(authed_form_post("/api/state/setmode", "state=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app(gateway).oneshot(authed_get("/api/state/getmode")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["mode"], 2);
}

#[tokio::test]
async fn setmode_rejects_out_of_range_and_missing() {
    for body in ["state=7", "state=-1", "state=abc", ""] {
        let resp = test_app()
            .oneshot(authed_form_post("/api/state/setmode", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body:?}");
        let json = body_json(resp).await;
        assert_envelope(&json);
        assert_eq!(json["result"]["result"], "Invalid state provided");
    }
}

// --- scan validation (never reaches the backend) ---

#[tokio::test]
async fn scan_without_barcode_is_400() {
    let resp = test_app()
        .oneshot(authed_form_post("/api/action/scan", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_envelope(&body);
    assert_eq!(body["result"]["result"], "No barcode supplied");
}

#[tokio::test]
async fn scan_with_non_numeric_best_before_is_400() {
    let resp = test_app()
        .oneshot(authed_form_post(
            "/api/action/scan",
            "barcode=4001234567890&bestBeforeInDays=tomorrow",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(
        body["result"]["result"],
        "Invalid parameter bestBeforeInDays: needs to be type int"
    );
}

#[tokio::test]
async fn scan_with_non_numeric_price_is_400() {
    let resp = test_app()
        .oneshot(authed_form_post("/api/action/scan", "barcode=400123&price=free"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(
        body["result"]["result"],
        "Invalid parameter price: needs to be type float"
    );
}

#[tokio::test]
async fn scan_control_barcode_ignores_current_mode() {
    // Mode is Consume; the purchase control barcode must still act, and the
    // outcome names the purchase action. No backend involved.
    let resp = test_app()
        .oneshot(authed_form_post("/api/action/scan", "barcode=BBUDDY-P"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_envelope(&body);
    let outcome = body["data"]["result"].as_str().unwrap();
    assert!(outcome.contains("purchase"), "outcome was {outcome}");
}

#[tokio::test]
async fn scan_accepts_get_query_parameters() {
    let resp = test_app()
        .oneshot(authed_get("/api/action/scan?text=BBUDDY-CA"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let outcome = body["data"]["result"].as_str().unwrap();
    assert!(outcome.contains("consume all"), "outcome was {outcome}");
}
