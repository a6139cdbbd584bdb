/// DDL and query strings for the bhavdiff SQLite store.

pub const CREATE_SETTLEMENTS: &str = "
CREATE TABLE IF NOT EXISTS settlements (
    date                TEXT NOT NULL,
    contract            TEXT NOT NULL,
    previous_settlement REAL,
    open_price          REAL,
    high_price          REAL,
    low_price           REAL,
    close_price         REAL,
    settlement          REAL,
    net_change          REAL,
    open_interest       REAL,
    traded_qty          REAL,
    trade_count         REAL,
    traded_value        REAL,
    PRIMARY KEY (date, contract)
);
";

pub const CREATE_INDEXES: &str = "
CREATE INDEX IF NOT EXISTS idx_settlements_contract ON settlements(contract);
";

/// Fast-path bulk append. Fails on a (date, contract) collision, at which
/// point the writer falls back to [`REPLACE_SETTLEMENT`] row by row.
pub const INSERT_SETTLEMENT: &str = "
INSERT INTO settlements
    (date, contract, previous_settlement, open_price, high_price, low_price,
     close_price, settlement, net_change, open_interest, traded_qty,
     trade_count, traded_value)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
";

pub const REPLACE_SETTLEMENT: &str = "
INSERT OR REPLACE INTO settlements
    (date, contract, previous_settlement, open_price, high_price, low_price,
     close_price, settlement, net_change, open_interest, traded_qty,
     trade_count, traded_value)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
";

/// Distinct stored dates, ascending.
pub const LIST_DATES: &str = "
SELECT DISTINCT date FROM settlements ORDER BY date
";

/// Two-date self join. Every contract on ?1 is a candidate, matched against
/// the same contract on ?2. NULL filtering and delta arithmetic happen in
/// Rust so the dropped-row policy stays in one place.
pub const COMPARE_DATES: &str = "
SELECT
    a.contract,
    a.open_interest AS oi_a,
    b.open_interest AS oi_b,
    a.close_price   AS close_a,
    b.close_price   AS close_b
FROM settlements a
LEFT JOIN settlements b
    ON b.contract = a.contract AND b.date = ?2
WHERE a.date = ?1
ORDER BY a.contract
";
