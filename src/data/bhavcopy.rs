//! Bhavcopy file normalizer and batch import pipeline.
//!
//! Reads daily derivatives settlement CSVs, derives the trading date from
//! the filename, canonicalizes contract identifiers, and writes normalized
//! rows into the settlement store.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::SettlementRecord;

use super::store::SettlementStore;

/// Source column headers, in storage order. `date` is synthesized from the
/// filename rather than read from a column.
const COL_CONTRACT: &str = "CONTRACT_D";
const COL_PREVIOUS: &str = "PREVIOUS_S";
const COL_OPEN: &str = "OPEN_PRICE";
const COL_HIGH: &str = "HIGH_PRICE";
const COL_LOW: &str = "LOW_PRICE";
const COL_CLOSE: &str = "CLOSE_PRIC";
const COL_SETTLEMENT: &str = "SETTLEMENT";
const COL_NET_CHANGE: &str = "NET_CHANGE";
const COL_OI: &str = "OI_NO_CON";
const COL_TRADED_QTY: &str = "TRADED_QUA";
const COL_TRADE_COUNT: &str = "TRD_NO_CON";
const COL_TRADED_VAL: &str = "TRADED_VAL";

/// Length of the exchange prefix on the contract identifier column.
const CONTRACT_PREFIX_LEN: usize = 6;

/// Byte range of the DDMMYY date substring within the filename.
const FILENAME_DATE_RANGE: std::ops::Range<usize> = 2..8;

/// Why a single file could not be normalized. Batch import isolates these
/// per file; they never abort the batch.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("filename '{0}' does not carry a DDMMYY date at characters 3-8")]
    BadFilename(String),
    #[error("required column '{0}' is missing")]
    MissingColumn(&'static str),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Extract the ISO trading date from a bhavcopy filename.
///
/// The exchange names these files like `fo150124bhav.csv`: a two-character
/// segment prefix, then the trading day as DDMMYY.
pub fn parse_filename_date(name: &str) -> Result<String, NormalizeError> {
    let raw = name
        .get(FILENAME_DATE_RANGE)
        .ok_or_else(|| NormalizeError::BadFilename(name.to_string()))?;
    let date = chrono::NaiveDate::parse_from_str(raw, "%d%m%y")
        .map_err(|_| NormalizeError::BadFilename(name.to_string()))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Strip the fixed-length exchange prefix from a raw contract identifier.
pub fn strip_contract_prefix(raw: &str) -> String {
    raw.chars().skip(CONTRACT_PREFIX_LEN).collect()
}

/// Lenient numeric coercion: a cell that does not parse as f64 becomes
/// `None` instead of an error. Source files use "-" and blanks for untraded
/// contracts, and aborting a whole file over one cell is not worth it.
pub fn lenient_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// Header positions of the required source columns.
struct ColumnIndex {
    contract: usize,
    previous: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    settlement: usize,
    net_change: usize,
    oi: usize,
    traded_qty: usize,
    trade_count: usize,
    traded_val: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, NormalizeError> {
        let find = |name: &'static str| -> Result<usize, NormalizeError> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or(NormalizeError::MissingColumn(name))
        };
        Ok(Self {
            contract: find(COL_CONTRACT)?,
            previous: find(COL_PREVIOUS)?,
            open: find(COL_OPEN)?,
            high: find(COL_HIGH)?,
            low: find(COL_LOW)?,
            close: find(COL_CLOSE)?,
            settlement: find(COL_SETTLEMENT)?,
            net_change: find(COL_NET_CHANGE)?,
            oi: find(COL_OI)?,
            traded_qty: find(COL_TRADED_QTY)?,
            trade_count: find(COL_TRADE_COUNT)?,
            traded_val: find(COL_TRADED_VAL)?,
        })
    }
}

/// Normalize CSV content into settlement records, applying `date` uniformly
/// to every row. Extra columns in the source are ignored.
pub fn normalize_reader<R: Read>(
    reader: R,
    date: &str,
) -> Result<Vec<SettlementRecord>, NormalizeError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let idx = ColumnIndex::from_headers(rdr.headers()?)?;
    let cell = |rec: &csv::StringRecord, i: usize| lenient_f64(rec.get(i).unwrap_or(""));

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(SettlementRecord {
            date: date.to_string(),
            contract: strip_contract_prefix(record.get(idx.contract).unwrap_or("")),
            previous_settlement: cell(&record, idx.previous),
            open: cell(&record, idx.open),
            high: cell(&record, idx.high),
            low: cell(&record, idx.low),
            close: cell(&record, idx.close),
            settlement: cell(&record, idx.settlement),
            net_change: cell(&record, idx.net_change),
            open_interest: cell(&record, idx.oi),
            traded_qty: cell(&record, idx.traded_qty),
            trade_count: cell(&record, idx.trade_count),
            traded_value: cell(&record, idx.traded_val),
        });
    }
    Ok(rows)
}

/// Normalize one file, deriving the date from its filename.
pub fn normalize_file(path: &Path) -> Result<Vec<SettlementRecord>, NormalizeError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| NormalizeError::BadFilename(path.display().to_string()))?;
    let date = parse_filename_date(name)?;

    let file = fs::File::open(path)?;
    let rows = normalize_reader(file, &date)?;
    debug!("normalized {} rows from {} (date {})", rows.len(), name, date);
    Ok(rows)
}

/// Statistics from a batch import run.
#[derive(Debug, Default)]
pub struct ImportStats {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub rows_written: usize,
}

/// Import a batch of bhavcopy files into the store.
///
/// A file that fails to normalize or write is warned about and skipped; the
/// remaining files still land.
pub fn import_files(paths: &[PathBuf], store: &dyn SettlementStore) -> ImportStats {
    let mut stats = ImportStats::default();

    for path in paths {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("?");

        let rows = match normalize_file(path) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("skipping {}: {}", name, e);
                stats.files_skipped += 1;
                continue;
            }
        };

        match store.upsert_records(&rows) {
            Ok(written) => {
                stats.rows_written += written;
                stats.files_processed += 1;
            }
            Err(e) => {
                warn!("error writing {}: {}", name, e);
                stats.files_skipped += 1;
            }
        }
    }

    info!(
        "import done: {} files processed, {} skipped, {} rows written",
        stats.files_processed, stats.files_skipped, stats.rows_written
    );
    stats
}
