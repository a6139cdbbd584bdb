use anyhow::Result;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::types::{ComparisonRow, SettlementRecord};

use super::schema;

/// Abstraction over settlement storage.
pub trait SettlementStore {
    /// Idempotent schema creation; safe to call on every start.
    fn init(&self) -> Result<()>;
    /// Write rows, replacing any existing (date, contract) keys.
    /// Returns the number of rows that landed.
    fn upsert_records(&self, rows: &[SettlementRecord]) -> Result<usize>;
    /// Distinct stored dates, ascending, duplicate free.
    fn list_dates(&self) -> Result<Vec<String>>;
    /// Join `date_a` against `date_b` per contract and compute OI and close
    /// deltas. Contracts without usable data on `date_b` are dropped.
    fn compare(&self, date_a: &str, date_b: &str) -> Result<Vec<ComparisonRow>>;
}

/// SQLite-backed implementation.
///
/// Callers open one store per operation and drop it when done; the
/// connection closes on drop, so there is no long-lived ambient handle.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open a file-backed database.
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (useful for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Borrow the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Bulk append inside a single transaction. Any failure rolls the whole
    /// batch back when the transaction drops uncommitted.
    fn insert_all(&self, rows: &[SettlementRecord]) -> rusqlite::Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(schema::INSERT_SETTLEMENT)?;
            for r in rows {
                stmt.execute(record_params(r))?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Per-row `INSERT OR REPLACE` fallback. A failing row is reported and
    /// skipped; the remaining rows still land.
    fn replace_each(&self, rows: &[SettlementRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare_cached(schema::REPLACE_SETTLEMENT)?;
            for r in rows {
                match stmt.execute(record_params(r)) {
                    Ok(_) => written += 1,
                    Err(e) => {
                        warn!(
                            "failed to write row for {} on {}: {}",
                            r.contract, r.date, e
                        );
                    }
                }
            }
        }
        tx.commit()?;
        Ok(written)
    }
}

impl SettlementStore for SqliteStore {
    fn init(&self) -> Result<()> {
        self.conn.execute_batch(schema::CREATE_SETTLEMENTS)?;
        self.conn.execute_batch(schema::CREATE_INDEXES)?;
        Ok(())
    }

    fn upsert_records(&self, rows: &[SettlementRecord]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        match self.insert_all(rows) {
            Ok(n) => Ok(n),
            Err(e) if is_constraint_violation(&e) => {
                debug!("bulk append hit a key collision, retrying row by row");
                self.replace_each(rows)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list_dates(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(schema::LIST_DATES)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut dates = Vec::new();
        for r in rows {
            dates.push(r?);
        }
        Ok(dates)
    }

    fn compare(&self, date_a: &str, date_b: &str) -> Result<Vec<ComparisonRow>> {
        let mut stmt = self.conn.prepare(schema::COMPARE_DATES)?;
        let rows = stmt.query_map([date_a, date_b], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<f64>>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<f64>>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for r in rows {
            let (contract, oi_a, oi_b, close_a, close_b) = r?;
            // A contract without usable data on either side of the join has
            // nothing to compare against; drop it rather than emit nulls.
            if let (Some(oi_a), Some(oi_b), Some(close_a), Some(close_b)) =
                (oi_a, oi_b, close_a, close_b)
            {
                out.push(ComparisonRow::new(contract, oi_a, oi_b, close_a, close_b));
            }
        }

        debug!(
            "compared {} vs {}: {} contracts matched",
            date_a,
            date_b,
            out.len()
        );
        Ok(out)
    }
}

fn record_params(r: &SettlementRecord) -> [&dyn rusqlite::ToSql; 13] {
    [
        &r.date,
        &r.contract,
        &r.previous_settlement,
        &r.open,
        &r.high,
        &r.low,
        &r.close,
        &r.settlement,
        &r.net_change,
        &r.open_interest,
        &r.traded_qty,
        &r.trade_count,
        &r.traded_value,
    ]
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
