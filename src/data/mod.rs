pub mod bhavcopy;
pub mod schema;
pub mod store;

pub use bhavcopy::{import_files, normalize_file, normalize_reader, ImportStats, NormalizeError};
pub use store::{SettlementStore, SqliteStore};
