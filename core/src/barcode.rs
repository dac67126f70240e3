//! Barcode classification against the configured prefix table.
//!
//! The table itself is configuration: eight entries, exposed verbatim to
//! clients via `/api/system/barcodes` so scanner apps can print matching
//! control sheets. Classification happens before any mode lookup; a control
//! barcode acts the same in every scan mode.

use serde::{Deserialize, Serialize};

use crate::scanmode::ScanMode;

/// The eight configurable control prefixes. Serialized field names match the
/// config keys clients already know.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BarcodeTable {
    #[serde(rename = "BARCODE_C", default = "default_consume")]
    pub consume: String,
    #[serde(rename = "BARCODE_CS", default = "default_consume_spoiled")]
    pub consume_spoiled: String,
    #[serde(rename = "BARCODE_P", default = "default_purchase")]
    pub purchase: String,
    #[serde(rename = "BARCODE_O", default = "default_open")]
    pub open: String,
    #[serde(rename = "BARCODE_GS", default = "default_get_stock")]
    pub get_stock: String,
    #[serde(rename = "BARCODE_Q", default = "default_quantity")]
    pub quantity: String,
    #[serde(rename = "BARCODE_AS", default = "default_add_to_shopping_list")]
    pub add_to_shopping_list: String,
    #[serde(rename = "BARCODE_CA", default = "default_consume_all")]
    pub consume_all: String,
}

fn default_consume() -> String {
    "BBUDDY-C".to_string()
}

fn default_consume_spoiled() -> String {
    "BBUDDY-CS".to_string()
}

fn default_purchase() -> String {
    "BBUDDY-P".to_string()
}

fn default_open() -> String {
    "BBUDDY-O".to_string()
}

fn default_get_stock() -> String {
    "BBUDDY-I".to_string()
}

fn default_quantity() -> String {
    "BBUDDY-Q-".to_string()
}

fn default_add_to_shopping_list() -> String {
    "BBUDDY-AS".to_string()
}

fn default_consume_all() -> String {
    "BBUDDY-CA".to_string()
}

impl Default for BarcodeTable {
    fn default() -> Self {
        Self {
            consume: default_consume(),
            consume_spoiled: default_consume_spoiled(),
            purchase: default_purchase(),
            open: default_open(),
            get_stock: default_get_stock(),
            quantity: default_quantity(),
            add_to_shopping_list: default_add_to_shopping_list(),
            consume_all: default_consume_all(),
        }
    }
}

/// Logical category of a scanned barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarcodeKind {
    /// Control barcode selecting a scan mode, independent of the current one.
    Control(ScanMode),
    /// Quantity barcode; the payload after the prefix is the embedded amount.
    Quantity(String),
    /// Anything else: a product barcode.
    Plain,
}

impl BarcodeTable {
    /// Control entries match exactly; the quantity entry is a prefix with the
    /// amount embedded after it.
    pub fn classify(&self, barcode: &str) -> BarcodeKind {
        if barcode == self.consume {
            return BarcodeKind::Control(ScanMode::Consume);
        }
        if barcode == self.consume_spoiled {
            return BarcodeKind::Control(ScanMode::ConsumeSpoiled);
        }
        if barcode == self.purchase {
            return BarcodeKind::Control(ScanMode::Purchase);
        }
        if barcode == self.open {
            return BarcodeKind::Control(ScanMode::Open);
        }
        if barcode == self.get_stock {
            return BarcodeKind::Control(ScanMode::GetStock);
        }
        if barcode == self.add_to_shopping_list {
            return BarcodeKind::Control(ScanMode::AddToShoppingList);
        }
        if barcode == self.consume_all {
            return BarcodeKind::Control(ScanMode::ConsumeAll);
        }
        if let Some(amount) = barcode.strip_prefix(self.quantity.as_str()) {
            return BarcodeKind::Quantity(amount.to_string());
        }
        BarcodeKind::Plain
    }
}
