//! Barcode transaction pipeline: (barcode, mode, overrides) → outcome.
//!
//! Control barcodes are classified first and act the same in every scan
//! mode; plain barcodes are interpreted according to the current mode. Every
//! outcome is a user-facing string — hard backend failures all collapse into
//! one generic message, because the facade has already logged the cause.

use std::sync::Arc;

use tracing::debug;

use crate::barcode::{BarcodeKind, BarcodeTable};
use crate::error::CallFailed;
use crate::grocy::GrocyApi;
use crate::scanmode::{ScanMode, ScanModeState};
use crate::types::ProductSummary;

/// Outcome for hard backend failures; the cause is in the server log.
pub const TRANSACTION_FAILED: &str = "Could not complete the transaction, see the server log";

pub struct ScanPipeline {
    api: Arc<GrocyApi>,
    state: Arc<ScanModeState>,
    barcodes: BarcodeTable,
}

impl ScanPipeline {
    pub fn new(api: Arc<GrocyApi>, state: Arc<ScanModeState>, barcodes: BarcodeTable) -> Self {
        Self {
            api,
            state,
            barcodes,
        }
    }

    /// Process one scanned barcode and return the outcome presented to the
    /// operator. Numeric overrides arrive pre-validated; `api_origin` only
    /// feeds the log.
    pub fn process_barcode(
        &self,
        raw: &str,
        api_origin: bool,
        best_before_days: Option<i64>,
        price: Option<f64>,
    ) -> String {
        let barcode = raw.trim();
        debug!(barcode, api_origin, "processing barcode");
        match self.barcodes.classify(barcode) {
            BarcodeKind::Control(mode) => {
                self.state.set_mode(mode);
                format!("Scan mode set to {}", mode.describe())
            }
            BarcodeKind::Quantity(amount) => match amount.parse::<f64>() {
                Ok(amount) if amount > 0.0 => {
                    debug!(amount, "ignoring quantity barcode");
                    "Quantity barcodes are not supported".to_string()
                }
                _ => format!("Invalid quantity barcode: {barcode}"),
            },
            BarcodeKind::Plain => self.process_product(barcode, best_before_days, price),
        }
    }

    fn process_product(
        &self,
        barcode: &str,
        best_before_days: Option<i64>,
        price: Option<f64>,
    ) -> String {
        let mode = self.state.get();
        let product = match self.api.product_by_barcode(barcode) {
            Ok(Some(product)) => product,
            Ok(None) => {
                // Unknown to the backend: degrade to the external lookup so
                // the operator at least learns the product name.
                let name = self.api.lookup_name_external(barcode);
                return format!("Unknown barcode {barcode}, name lookup: {name}");
            }
            Err(CallFailed) => return TRANSACTION_FAILED.to_string(),
        };

        let books_stock = matches!(
            mode,
            ScanMode::Consume
                | ScanMode::ConsumeSpoiled
                | ScanMode::ConsumeAll
                | ScanMode::Purchase
                | ScanMode::Open
        );
        if product.tare_handling && books_stock {
            return format!(
                "{} uses tare weight handling, scan transactions are not supported",
                product.name
            );
        }

        match mode {
            ScanMode::Consume => self.consume(&product, 1.0, false),
            ScanMode::ConsumeSpoiled => self.consume(&product, 1.0, true),
            ScanMode::ConsumeAll => self.consume(&product, product.stock_amount, false),
            ScanMode::Purchase => self.purchase(&product, best_before_days, price),
            ScanMode::Open => self.open(&product),
            ScanMode::GetStock => format!(
                "Stock of {}: {} {}",
                product.name, product.stock_amount, product.unit
            ),
            ScanMode::AddToShoppingList => match self.api.add_to_shopping_list(product.id, 1.0) {
                Ok(()) => format!("Added {} to the shopping list", product.name),
                Err(CallFailed) => TRANSACTION_FAILED.to_string(),
            },
        }
    }

    fn consume(&self, product: &ProductSummary, amount: f64, spoiled: bool) -> String {
        // Never book more than the backend holds.
        let amount = amount.min(product.stock_amount);
        if amount <= 0.0 {
            return format!("None of {} in stock", product.name);
        }
        match self.api.consume(product.id, amount, spoiled) {
            Ok(()) if spoiled => format!("Consuming {amount} {} (spoiled)", product.name),
            Ok(()) => format!("Consuming {amount} {}", product.name),
            Err(CallFailed) => TRANSACTION_FAILED.to_string(),
        }
    }

    fn purchase(
        &self,
        product: &ProductSummary,
        best_before_days: Option<i64>,
        price: Option<f64>,
    ) -> String {
        let amount = if product.qu_factor > 0.0 {
            product.qu_factor
        } else {
            1.0
        };
        match self.api.purchase(
            product.id,
            amount,
            best_before_days,
            price,
            Some(product.default_best_before_days),
        ) {
            Ok(finite_date) => {
                let mut outcome = format!("Adding {amount} {}", product.name);
                if !finite_date {
                    outcome.push_str(" (no best-before date set)");
                }
                outcome
            }
            Err(CallFailed) => TRANSACTION_FAILED.to_string(),
        }
    }

    fn open(&self, product: &ProductSummary) -> String {
        match self.api.open(product.id) {
            Ok(()) => format!("Opening 1 {}", product.name),
            Err(CallFailed) => TRANSACTION_FAILED.to_string(),
        }
    }
}
