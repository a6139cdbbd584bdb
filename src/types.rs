//! Core types for bhavcopy ingestion and two-date comparison.

use serde::{Deserialize, Serialize};

/// One normalized settlement row for a (date, contract) pair.
///
/// Price and volume fields are `Option<f64>` because the source files carry
/// the occasional non-numeric cell ("-", blanks); lenient coercion turns
/// those into `None` rather than aborting the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// Trading date in ISO form (`YYYY-MM-DD`), derived from the filename.
    pub date: String,
    /// Canonical contract identifier, after the 6-character exchange prefix
    /// has been stripped from the source column.
    pub contract: String,
    pub previous_settlement: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub settlement: Option<f64>,
    pub net_change: Option<f64>,
    /// Open interest, in contracts outstanding.
    pub open_interest: Option<f64>,
    pub traded_qty: Option<f64>,
    pub trade_count: Option<f64>,
    pub traded_value: Option<f64>,
}

/// One row of a two-date comparison. Derived per request, never persisted.
///
/// `_a` fields come from the first (reference) date, `_b` from the
/// comparison date. Contracts absent on the comparison date never produce a
/// row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub contract: String,
    pub oi_a: f64,
    pub oi_b: f64,
    pub close_a: f64,
    pub close_b: f64,
    /// `oi_a - oi_b`, plain subtraction.
    pub oi_change: f64,
    /// `close_a - close_b`, plain subtraction.
    pub price_change: f64,
}

impl ComparisonRow {
    pub fn new(contract: String, oi_a: f64, oi_b: f64, close_a: f64, close_b: f64) -> Self {
        Self {
            contract,
            oi_a,
            oi_b,
            close_a,
            close_b,
            oi_change: oi_a - oi_b,
            price_change: close_a - close_b,
        }
    }
}
