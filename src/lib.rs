//! bhavdiff — ingest daily derivatives bhavcopy files into SQLite and
//! compare open interest and close price between any two stored dates.

pub mod data;
pub mod report;
pub mod types;
