//! Scan-mode state.
//!
//! A single process-wide integer decides how the next unprefixed barcode is
//! interpreted. It is read before every such decision and mutated only by an
//! explicit, range-checked set; there is no transition table, so any legal
//! mode is reachable from any other in one step.

use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;

/// Interpretation applied to the next unprefixed barcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScanMode {
    Consume = 0,
    ConsumeSpoiled = 1,
    Purchase = 2,
    Open = 3,
    GetStock = 4,
    AddToShoppingList = 5,
    ConsumeAll = 6,
}

/// Rejected scan-mode value; the state was left unchanged.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("scan mode {0} out of range")]
pub struct InvalidScanMode(pub i64);

impl ScanMode {
    pub const MIN: i64 = ScanMode::Consume as i64;
    pub const MAX: i64 = ScanMode::ConsumeAll as i64;

    /// Accepts only the legal range.
    pub fn from_value(value: i64) -> Option<ScanMode> {
        match value {
            0 => Some(ScanMode::Consume),
            1 => Some(ScanMode::ConsumeSpoiled),
            2 => Some(ScanMode::Purchase),
            3 => Some(ScanMode::Open),
            4 => Some(ScanMode::GetStock),
            5 => Some(ScanMode::AddToShoppingList),
            6 => Some(ScanMode::ConsumeAll),
            _ => None,
        }
    }

    pub fn value(self) -> i64 {
        self as i64
    }

    /// Action word used in scan outcomes.
    pub fn describe(self) -> &'static str {
        match self {
            ScanMode::Consume => "consume",
            ScanMode::ConsumeSpoiled => "consume spoiled",
            ScanMode::Purchase => "purchase",
            ScanMode::Open => "open",
            ScanMode::GetStock => "inventory",
            ScanMode::AddToShoppingList => "shopping list",
            ScanMode::ConsumeAll => "consume all",
        }
    }
}

/// Process-wide scan-mode cell.
#[derive(Debug)]
pub struct ScanModeState(AtomicU8);

impl ScanModeState {
    pub fn new(initial: ScanMode) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    pub fn get(&self) -> ScanMode {
        // Only `set`/`set_mode` store here, so the cell always holds a legal
        // discriminant.
        ScanMode::from_value(i64::from(self.0.load(Ordering::Relaxed)))
            .unwrap_or(ScanMode::Consume)
    }

    /// Range-checked set; rejection leaves the state untouched.
    pub fn set(&self, value: i64) -> Result<ScanMode, InvalidScanMode> {
        let mode = ScanMode::from_value(value).ok_or(InvalidScanMode(value))?;
        self.0.store(mode as u8, Ordering::Relaxed);
        Ok(mode)
    }

    pub fn set_mode(&self, mode: ScanMode) {
        self.0.store(mode as u8, Ordering::Relaxed);
    }
}

impl Default for ScanModeState {
    fn default() -> Self {
        Self::new(ScanMode::Consume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_value_in_range_is_accepted() {
        let state = ScanModeState::default();
        for value in ScanMode::MIN..=ScanMode::MAX {
            let mode = state.set(value).unwrap();
            assert_eq!(mode.value(), value);
            assert_eq!(state.get().value(), value);
        }
    }

    #[test]
    fn out_of_range_is_rejected_without_mutation() {
        let state = ScanModeState::default();
        state.set(4).unwrap();
        for value in [-1, 7, 42, i64::MIN, i64::MAX] {
            assert_eq!(state.set(value), Err(InvalidScanMode(value)));
            assert_eq!(state.get(), ScanMode::GetStock);
        }
    }

    #[test]
    fn any_mode_reachable_from_any_other() {
        let state = ScanModeState::new(ScanMode::ConsumeAll);
        state.set(ScanMode::Purchase.value()).unwrap();
        assert_eq!(state.get(), ScanMode::Purchase);
        state.set(ScanMode::Consume.value()).unwrap();
        assert_eq!(state.get(), ScanMode::Consume);
    }
}
