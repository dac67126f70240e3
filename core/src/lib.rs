//! Core of the scanbridge gateway: barcode scans in, inventory transactions
//! out.
//!
//! # Overview
//! Adapts barcode-scan events into stock transactions against a
//! Grocy-compatible REST backend. The flow mirrors the module layout:
//! envelope `handlers` → `pipeline` → `grocy` facade → authenticated
//! `client` → `Transport`, with `scanmode` as the only shared mutable state.
//!
//! # Design
//! - The HTTP host lives in a separate crate; everything here runs without a
//!   server, with transports substituted at the `Transport` seam.
//! - Backend failures are classified once (`BackendError`), logged at one
//!   choke point in the facade, and reach callers only as absence, a
//!   sentinel, or the opaque `CallFailed`.
//! - Configuration is injected at construction; nothing reads it ambiently.

pub mod barcode;
pub mod client;
pub mod config;
pub mod error;
pub mod grocy;
pub mod handlers;
pub mod http;
pub mod pipeline;
pub mod scanmode;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use barcode::{BarcodeKind, BarcodeTable};
pub use client::{BackendClient, Credentials};
pub use config::AppConfig;
pub use error::{BackendError, CallFailed};
pub use grocy::GrocyApi;
pub use handlers::{Gateway, ScanParams};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use pipeline::ScanPipeline;
pub use scanmode::{ScanMode, ScanModeState};
pub use types::{ApiResult, ProductDetails, ProductSummary};
