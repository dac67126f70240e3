//! Inventory service facade: one operation per backend capability.
//!
//! # Design
//! Every operation funnels its failures through one choke point that writes a
//! single classified log entry; callers get back absence (`Ok(None)`), a
//! sentinel, or the opaque `CallFailed` — never the classification itself.
//! The two exceptions are deliberate: `check_connection` exists to report the
//! classification as user-readable text, and the external name lookup
//! degrades to `"N/A"` because a missing name has a defined fallback.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::client::{BackendClient, Credentials};
use crate::config::{ensure_trailing_slash, AppConfig};
use crate::error::{BackendError, CallFailed};
use crate::http::{HttpMethod, Transport};
use crate::types::{ProductDetails, ProductSummary};

const ENDPOINT_OBJECT_PRODUCTS: &str = "objects/products";
const ENDPOINT_STOCK: &str = "stock/products";
const ENDPOINT_SHOPPING_LIST: &str = "stock/shoppinglist/";
const ENDPOINT_CHORES: &str = "objects/chores";
const ENDPOINT_CHORE_EXECUTE: &str = "chores/";
const ENDPOINT_SYSTEM_INFO: &str = "system/info";

/// Oldest backend release the gateway speaks to.
pub const MIN_BACKEND_VERSION: &str = "2.7.1";

/// Best-before-days sentinel meaning "never expires".
pub const NEVER_EXPIRES_DAYS: i64 = -1;
/// Fixed date the sentinel maps to; never computed arithmetically.
pub const NEVER_EXPIRES_DATE: &str = "2999-12-31";

/// Sentinel name for failed external lookups.
pub const NAME_NOT_AVAILABLE: &str = "N/A";

/// Facade over the inventory backend.
pub struct GrocyApi {
    client: BackendClient,
    auto_remove_from_shopping_list: bool,
    prefer_generic_name: bool,
    external_lookup_base: String,
}

impl GrocyApi {
    pub fn new(config: &AppConfig, transport: Arc<dyn Transport>) -> Self {
        let credentials = Credentials {
            base_url: config.backend_base(),
            api_key: config.backend.api_key.clone(),
        };
        Self {
            client: BackendClient::new(credentials, transport, config.http.debug_timing),
            auto_remove_from_shopping_list: config.scan.auto_remove_from_shopping_list,
            prefer_generic_name: config.scan.prefer_generic_name,
            external_lookup_base: config.scan.external_lookup_url.trim_end_matches('/').to_string(),
        }
    }

    /// Choke point for failed backend calls: one classified log entry,
    /// callers get the opaque failure.
    fn report(&self, err: &BackendError, context: &str) -> CallFailed {
        match err {
            BackendError::TransportUnavailable => {
                error!("could not reach backend: {context}");
            }
            BackendError::Unauthorized => error!("backend rejected the API key: {context}"),
            BackendError::MalformedResponse(message) => {
                error!("invalid backend response: {context}: {message}");
            }
            BackendError::TlsValidationFailure => error!("TLS validation failed: {context}"),
        }
        CallFailed
    }

    /// Normalized product by id; `Ok(None)` when the id is unmatched.
    pub fn product_info(&self, id: i64) -> Result<Option<ProductDetails>, CallFailed> {
        let payload = self
            .client
            .execute(
                &format!("{ENDPOINT_STOCK}/{id}"),
                HttpMethod::Get,
                None,
                None,
                false,
            )
            .map_err(|err| self.report(&err, "could not look up product info"))?;
        Ok(ProductDetails::from_payload(&payload))
    }

    /// Raw catalog list, unnormalized.
    pub fn product_list(&self) -> Result<Value, CallFailed> {
        self.client
            .execute(ENDPOINT_OBJECT_PRODUCTS, HttpMethod::Get, None, None, false)
            .map_err(|err| self.report(&err, "could not look up product list"))
    }

    /// Normalized product for a barcode; `Ok(None)` when no product carries
    /// it (the backend's "not found" error is on the benign allow-list).
    pub fn product_by_barcode(&self, barcode: &str) -> Result<Option<ProductSummary>, CallFailed> {
        let payload = self
            .client
            .execute(
                &format!("{ENDPOINT_STOCK}/by-barcode/{barcode}"),
                HttpMethod::Get,
                None,
                None,
                false,
            )
            .map_err(|err| self.report(&err, "could not look up barcode"))?;
        Ok(ProductSummary::from_payload(&payload))
    }

    /// Book a purchase. Returns whether a finite (non-sentinel) best-before
    /// date was used, so callers can warn about products that never get one.
    ///
    /// The follow-up shopping-list removal is best-effort: the purchase is
    /// already committed and cannot be rolled back if the removal fails, so
    /// the failure is logged through the choke point and dropped.
    pub fn purchase(
        &self,
        id: i64,
        amount: f64,
        best_before_days: Option<i64>,
        price: Option<f64>,
        default_override: Option<i64>,
    ) -> Result<bool, CallFailed> {
        let days = match best_before_days {
            Some(days) => days,
            None => match default_override {
                Some(days) => days,
                None => self.default_best_before_days(id)?,
            },
        };
        let mut body = json!({
            "amount": amount,
            "transaction_type": "purchase",
            "best_before_date": best_before_date(days),
        });
        if let Some(price) = price {
            body["price"] = json!(price);
        }
        self.client
            .execute(
                &format!("{ENDPOINT_STOCK}/{id}/add"),
                HttpMethod::Post,
                Some(&body),
                None,
                false,
            )
            .map_err(|err| self.report(&err, "could not add product to inventory"))?;
        if self.auto_remove_from_shopping_list {
            let _ = self.remove_from_shopping_list(id, amount);
        }
        Ok(days != 0 && days != NEVER_EXPIRES_DAYS)
    }

    fn default_best_before_days(&self, id: i64) -> Result<i64, CallFailed> {
        match self.product_info(id)? {
            Some(details) => Ok(details.default_best_before_days),
            None => {
                warn!(product_id = id, "product vanished while resolving best-before default");
                Err(CallFailed)
            }
        }
    }

    pub fn consume(&self, id: i64, amount: f64, spoiled: bool) -> Result<(), CallFailed> {
        let body = json!({
            "amount": amount,
            "transaction_type": "consume",
            "spoiled": spoiled,
        });
        self.client
            .execute(
                &format!("{ENDPOINT_STOCK}/{id}/consume"),
                HttpMethod::Post,
                Some(&body),
                None,
                false,
            )
            .map_err(|err| self.report(&err, "could not consume product"))?;
        Ok(())
    }

    pub fn open(&self, id: i64) -> Result<(), CallFailed> {
        let body = json!({"amount": 1});
        self.client
            .execute(
                &format!("{ENDPOINT_STOCK}/{id}/open"),
                HttpMethod::Post,
                Some(&body),
                None,
                false,
            )
            .map_err(|err| self.report(&err, "could not open product"))?;
        Ok(())
    }

    /// Overwrite **all** barcodes on a product. Destructive: callers that
    /// want to keep existing barcodes must merge them into `barcodes` first.
    pub fn set_barcodes(&self, id: i64, barcodes: &[String]) -> Result<(), CallFailed> {
        let body = json!({"barcode": barcodes.join(",")});
        self.client
            .execute(
                &format!("{ENDPOINT_OBJECT_PRODUCTS}/{id}"),
                HttpMethod::Put,
                Some(&body),
                None,
                false,
            )
            .map_err(|err| self.report(&err, "could not set product barcodes"))?;
        Ok(())
    }

    pub fn add_to_shopping_list(&self, id: i64, amount: f64) -> Result<(), CallFailed> {
        self.shopping_list_call("add-product", id, amount, "could not add item to shopping list")
    }

    pub fn remove_from_shopping_list(&self, id: i64, amount: f64) -> Result<(), CallFailed> {
        self.shopping_list_call(
            "remove-product",
            id,
            amount,
            "could not remove item from shopping list",
        )
    }

    fn shopping_list_call(
        &self,
        operation: &str,
        id: i64,
        amount: f64,
        context: &str,
    ) -> Result<(), CallFailed> {
        let body = json!({"product_id": id, "product_amount": amount});
        self.client
            .execute(
                &format!("{ENDPOINT_SHOPPING_LIST}{operation}"),
                HttpMethod::Post,
                Some(&body),
                None,
                false,
            )
            .map_err(|err| self.report(&err, context))?;
        Ok(())
    }

    /// One chore by id, or all chores when `id` is `None`. Raw payload.
    pub fn chores_info(&self, id: Option<i64>) -> Result<Value, CallFailed> {
        let endpoint = match id {
            Some(id) => format!("{ENDPOINT_CHORES}/{id}"),
            None => ENDPOINT_CHORES.to_string(),
        };
        self.client
            .execute(&endpoint, HttpMethod::Get, None, None, false)
            .map_err(|err| self.report(&err, "could not get chore info"))
    }

    pub fn execute_chore(&self, id: i64) -> Result<(), CallFailed> {
        let body = json!({"tracked_time": "", "done_by": ""});
        self.client
            .execute(
                &format!("{ENDPOINT_CHORE_EXECUTE}{id}/execute"),
                HttpMethod::Post,
                Some(&body),
                None,
                false,
            )
            .map_err(|err| self.report(&err, "could not execute chore"))?;
        Ok(())
    }

    /// Stock locations for a product. Raw payload.
    pub fn product_locations(&self, id: i64) -> Result<Value, CallFailed> {
        self.client
            .execute(
                &format!("{ENDPOINT_STOCK}/{id}/locations"),
                HttpMethod::Get,
                None,
                None,
                false,
            )
            .map_err(|err| self.report(&err, "could not look up product locations"))
    }

    /// Version string reported by the backend, if it provides one.
    pub fn backend_version(&self) -> Result<Option<String>, CallFailed> {
        let payload = self
            .client
            .execute(ENDPOINT_SYSTEM_INFO, HttpMethod::Get, None, None, false)
            .map_err(|err| self.report(&err, "could not look up backend version"))?;
        match payload["grocy_version"]["Version"].as_str() {
            Some(version) => Ok(Some(version.to_string())),
            None => {
                error!("backend did not provide a version number");
                Ok(None)
            }
        }
    }

    /// Probe an arbitrary backend with explicit credentials. The one path
    /// where classification reaches the caller, as user-readable text.
    pub fn check_connection(&self, url: &str, api_key: &str) -> Result<(), String> {
        let credentials = Credentials {
            base_url: ensure_trailing_slash(url),
            api_key: api_key.to_string(),
        };
        let payload = match self.client.execute(
            ENDPOINT_SYSTEM_INFO,
            HttpMethod::Get,
            None,
            Some(&credentials),
            false,
        ) {
            Ok(payload) => payload,
            Err(BackendError::TransportUnavailable) => {
                return Err("Could not connect to server".to_string());
            }
            Err(BackendError::Unauthorized) => return Err("Invalid API key".to_string()),
            Err(BackendError::MalformedResponse(message)) => {
                return Err(format!("Error: {message}"));
            }
            Err(BackendError::TlsValidationFailure) => {
                return Err(
                    "Invalid TLS certificate. If the server uses a self-signed certificate, \
                     enable allow_insecure_tls in the configuration"
                        .to_string(),
                );
            }
        };
        match payload["grocy_version"]["Version"].as_str() {
            Some(version) if is_supported_version(version) => Ok(()),
            Some(version) => Err(format!(
                "Version {MIN_BACKEND_VERSION} or newer required, server reports {version}"
            )),
            None => Err("Invalid response. Are you using the correct URL?".to_string()),
        }
    }

    /// Best-effort product-name lookup against the external barcode
    /// database. Never fails: every error degrades to the `"N/A"` sentinel
    /// and is logged non-fatal, since a missing name has a defined fallback.
    pub fn lookup_name_external(&self, barcode: &str) -> String {
        let url = format!(
            "{}/api/v0/product/{barcode}.json",
            self.external_lookup_base
        );
        let payload = match self.client.execute(&url, HttpMethod::Get, None, None, true) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("external barcode lookup failed: {err}");
                return NAME_NOT_AVAILABLE.to_string();
            }
        };
        if payload["status"] != 1 {
            return NAME_NOT_AVAILABLE.to_string();
        }
        let generic = non_empty(&payload["product"]["generic_name"]);
        let product = non_empty(&payload["product"]["product_name"]);
        let (first, second) = if self.prefer_generic_name {
            (generic, product)
        } else {
            (product, generic)
        };
        first
            .or(second)
            .unwrap_or_else(|| NAME_NOT_AVAILABLE.to_string())
    }
}

fn non_empty(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Resolve a day offset to a booking date. `-1` is the "never expires"
/// sentinel and maps to a fixed date, never to arithmetic.
pub fn best_before_date(days: i64) -> String {
    if days == NEVER_EXPIRES_DAYS {
        return NEVER_EXPIRES_DATE.to_string();
    }
    best_before_from(Local::now().date_naive(), days)
}

fn best_before_from(base: NaiveDate, days: i64) -> String {
    (base + chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

/// Component-wise (major.minor.patch) comparison against the supported
/// minimum; anything unparsable is unsupported.
pub fn is_supported_version(version: &str) -> bool {
    let minimum = version_triple(MIN_BACKEND_VERSION).expect("static version");
    version_triple(version).is_some_and(|triple| triple >= minimum)
}

pub(crate) fn version_triple(version: &str) -> Option<(u32, u32, u32)> {
    let mut parts = version.trim().splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::RecordingTransport;

    fn api(transport: Arc<RecordingTransport>) -> GrocyApi {
        let mut config = AppConfig::default();
        config.backend.url = "http://backend.test/api/".to_string();
        config.backend.api_key = "key-1".to_string();
        GrocyApi::new(&config, transport)
    }

    #[test]
    fn version_comparator() {
        assert!(is_supported_version("2.7.1"));
        assert!(!is_supported_version("2.6.9"));
        assert!(is_supported_version("2.8.0"));
        assert!(is_supported_version("3.0.0"));
        assert!(!is_supported_version("not-a-version"));
    }

    #[test]
    fn sentinel_maps_to_fixed_date() {
        assert_eq!(best_before_date(-1), "2999-12-31");
    }

    #[test]
    fn day_offset_crosses_month_boundary() {
        let base = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        assert_eq!(best_before_from(base, 5), "2024-02-04");
        assert_eq!(best_before_from(base, 0), "2024-01-30");
    }

    #[test]
    fn unmatched_barcode_is_absence_not_failure() {
        let transport = Arc::new(RecordingTransport::replying(
            400,
            r#"{"error_message":"No product with barcode 123 found"}"#,
        ));
        let result = api(transport).product_by_barcode("123").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn transport_failure_is_call_failed() {
        let transport = Arc::new(RecordingTransport::failing(
            crate::http::TransportFailure::Unreachable,
        ));
        assert_eq!(api(transport).product_by_barcode("123"), Err(CallFailed));
    }

    #[test]
    fn purchase_resolves_explicit_days_first() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push(200, "[]");
        transport.push(204, ""); // shopping list removal
        let finite = api(transport.clone())
            .purchase(7, 2.0, Some(5), Some(1.99), Some(10))
            .unwrap();
        assert!(finite);
        let booking = transport.requests()[0].clone();
        assert_eq!(booking.url, "http://backend.test/api/stock/products/7/add");
        let body: Value = serde_json::from_str(booking.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["transaction_type"], "purchase");
        assert_eq!(body["amount"], 2.0);
        assert_eq!(body["price"], 1.99);
        assert_eq!(
            body["best_before_date"],
            best_before_from(Local::now().date_naive(), 5)
        );
    }

    #[test]
    fn purchase_falls_back_to_override_then_product_default() {
        // Override wins when no explicit days are given.
        let transport = Arc::new(RecordingTransport::new());
        transport.push(200, "[]");
        transport.push(204, "");
        let finite = api(transport.clone())
            .purchase(7, 1.0, None, None, Some(NEVER_EXPIRES_DAYS))
            .unwrap();
        assert!(!finite, "sentinel is not a finite date");
        let body: Value =
            serde_json::from_str(transport.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["best_before_date"], NEVER_EXPIRES_DATE);

        // With neither, the product's configured default is fetched.
        let transport = Arc::new(RecordingTransport::new());
        transport.push(
            200,
            r#"{"product":{"id":7,"name":"Milk","default_best_before_days":3},
                "quantity_unit_stock":{"name":"Liter"},"stock_amount":1}"#,
        );
        transport.push(200, "[]");
        transport.push(204, "");
        let finite = api(transport.clone()).purchase(7, 1.0, None, None, None).unwrap();
        assert!(finite);
        let requests = transport.requests();
        assert_eq!(requests[0].url, "http://backend.test/api/stock/products/7");
        let body: Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body["best_before_date"],
            best_before_from(Local::now().date_naive(), 3)
        );
    }

    #[test]
    fn purchase_survives_failed_shopping_list_removal() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push(200, "[]");
        transport.push_failure(crate::http::TransportFailure::Unreachable);
        // The removal failure is logged and dropped; the purchase result
        // stands.
        let finite = api(transport.clone())
            .purchase(7, 1.0, Some(5), None, None)
            .unwrap();
        assert!(finite);
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn zero_days_is_not_a_finite_date() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push(200, "[]");
        transport.push(204, "");
        let finite = api(transport).purchase(7, 1.0, Some(0), None, None).unwrap();
        assert!(!finite);
    }

    #[test]
    fn check_connection_maps_failures_to_messages() {
        let cases: Vec<(Arc<RecordingTransport>, &str)> = vec![
            (
                Arc::new(RecordingTransport::failing(
                    crate::http::TransportFailure::Unreachable,
                )),
                "Could not connect to server",
            ),
            (
                Arc::new(RecordingTransport::replying(401, "")),
                "Invalid API key",
            ),
            (
                Arc::new(RecordingTransport::failing(
                    crate::http::TransportFailure::Tls,
                )),
                "Invalid TLS certificate. If the server uses a self-signed certificate, \
                 enable allow_insecure_tls in the configuration",
            ),
            (
                Arc::new(RecordingTransport::replying(200, r#"{"unexpected":true}"#)),
                "Invalid response. Are you using the correct URL?",
            ),
            (
                Arc::new(RecordingTransport::replying(
                    200,
                    r#"{"grocy_version":{"Version":"2.6.9"}}"#,
                )),
                "Version 2.7.1 or newer required, server reports 2.6.9",
            ),
        ];
        for (transport, expected) in cases {
            let err = api(transport)
                .check_connection("http://other.test/api", "probe-key")
                .unwrap_err();
            assert_eq!(err, expected);
        }
    }

    #[test]
    fn check_connection_accepts_supported_backend() {
        let transport = Arc::new(RecordingTransport::replying(
            200,
            r#"{"grocy_version":{"Version":"3.3.2"}}"#,
        ));
        api(transport.clone())
            .check_connection("http://other.test/api", "probe-key")
            .unwrap();
        // Overridden credentials, not the configured ones.
        let request = transport.last_request().unwrap();
        assert_eq!(request.url, "http://other.test/api/system/info");
        assert!(request
            .headers
            .contains(&("GROCY-API-KEY".to_string(), "probe-key".to_string())));
    }

    #[test]
    fn external_lookup_prefers_configured_name_order() {
        let body = r#"{"status":1,"product":{"product_name":"Brand Oats","generic_name":"Oats"}}"#;
        let transport = Arc::new(RecordingTransport::replying(200, body));
        assert_eq!(api(transport).lookup_name_external("42"), "Brand Oats");

        let transport = Arc::new(RecordingTransport::replying(200, body));
        let mut config = AppConfig::default();
        config.scan.prefer_generic_name = true;
        let api = GrocyApi::new(&config, transport);
        assert_eq!(api.lookup_name_external("42"), "Oats");
    }

    #[test]
    fn external_lookup_degrades_to_sentinel() {
        let transport = Arc::new(RecordingTransport::failing(
            crate::http::TransportFailure::Unreachable,
        ));
        assert_eq!(api(transport).lookup_name_external("42"), NAME_NOT_AVAILABLE);

        let transport = Arc::new(RecordingTransport::replying(200, r#"{"status":0}"#));
        assert_eq!(api(transport).lookup_name_external("42"), NAME_NOT_AVAILABLE);
    }

    #[test]
    fn set_barcodes_overwrites_all() {
        let transport = Arc::new(RecordingTransport::replying(204, ""));
        api(transport.clone())
            .set_barcodes(7, &["111".to_string(), "222".to_string()])
            .unwrap();
        let request = transport.last_request().unwrap();
        assert_eq!(request.url, "http://backend.test/api/objects/products/7");
        assert_eq!(request.method, HttpMethod::Put);
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["barcode"], "111,222");
    }

    #[test]
    fn chores_endpoints() {
        let transport = Arc::new(RecordingTransport::replying(200, "[]"));
        api(transport.clone()).chores_info(None).unwrap();
        assert_eq!(
            transport.last_request().unwrap().url,
            "http://backend.test/api/objects/chores"
        );

        let transport = Arc::new(RecordingTransport::replying(200, "{}"));
        api(transport.clone()).execute_chore(11).unwrap();
        let request = transport.last_request().unwrap();
        assert_eq!(request.url, "http://backend.test/api/chores/11/execute");
        assert_eq!(request.method, HttpMethod::Post);
    }
}
