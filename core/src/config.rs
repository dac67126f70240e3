//! Gateway configuration.
//!
//! Loaded once at startup from a TOML file, then overridden from the
//! environment and validated. Components receive the parts they need at
//! construction; nothing reads configuration ambiently.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::barcode::BarcodeTable;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub barcodes: BarcodeTable,
}

/// Inventory backend endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// API root of the backend, e.g. `https://grocy.example.com/api/`.
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_backend_url() -> String {
    "http://localhost:9283/api/".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            api_key: String::new(),
        }
    }
}

/// Outbound HTTP behavior shared by every backend call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Skip TLS verification for backends with self-signed certificates.
    #[serde(default)]
    pub allow_insecure_tls: bool,
    /// Log per-call timing at debug level.
    #[serde(default)]
    pub debug_timing: bool,
}

fn default_timeout_secs() -> u64 {
    20
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            allow_insecure_tls: false,
            debug_timing: false,
        }
    }
}

/// Inbound API-key enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub require_api_key: bool,
    /// Keys accepted from the `BBUDDY-API-KEY` header or `apikey` query
    /// parameter.
    #[serde(default)]
    pub api_keys: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_api_key: true,
            api_keys: Vec::new(),
        }
    }
}

/// Scan-pipeline behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// After a purchase, best-effort remove the same amount from the
    /// shopping list.
    #[serde(default = "default_true")]
    pub auto_remove_from_shopping_list: bool,
    /// Prefer the generic name over the product name in external lookups.
    #[serde(default)]
    pub prefer_generic_name: bool,
    /// Base URL of the external barcode database.
    #[serde(default = "default_lookup_url")]
    pub external_lookup_url: String,
}

fn default_lookup_url() -> String {
    "https://world.openfoodfacts.org".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            auto_remove_from_shopping_list: true,
            prefer_generic_name: false,
            external_lookup_url: default_lookup_url(),
        }
    }
}

/// Where the API surface listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_listen_address")]
    pub address: String,
}

fn default_listen_address() -> String {
    "127.0.0.1:8090".to_string()
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
        }
    }
}

impl AppConfig {
    /// Load order: defaults, then the file if it exists, then environment
    /// overrides. The result is validated before use.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => toml::from_str(&std::fs::read_to_string(path)?)?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SCANBRIDGE_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Ok(key) = std::env::var("SCANBRIDGE_BACKEND_KEY") {
            self.backend.api_key = key;
        }
        if let Ok(keys) = std::env::var("SCANBRIDGE_API_KEYS") {
            self.auth.api_keys = keys
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(address) = std::env::var("SCANBRIDGE_LISTEN") {
            self.listen.address = address;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.backend.url.starts_with("http://") && !self.backend.url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "backend.url must be an http(s) URL, got '{}'",
                self.backend.url
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Backend API root with the trailing slash the endpoint paths expect.
    pub fn backend_base(&self) -> String {
        ensure_trailing_slash(&self.backend.url)
    }
}

pub(crate) fn ensure_trailing_slash(url: &str) -> String {
    let mut url = url.to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
