//! SQLite store holding observations, the completion ledger and station
//! metadata, one set of tables per data type.

pub mod ledger;
pub mod observations;
pub mod schema;
pub mod stations;

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;

pub use observations::dedupe_against_store;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("table `{table}` does not match its declared schema: {reason}")]
    SchemaMismatch { table: String, reason: String },
    #[error("table `{0}` has not been created")]
    MissingTable(String),
    #[error("ledger cell for station {station} year {year} holds `{value}`")]
    BadOutcome { station: u32, year: i32, value: String },
}

/// One connection for the whole run. Writers are assumed to be alone.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Ok(Store { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Store {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |_| Ok(()),
            )
            .optional()?;

        Ok(found.is_some())
    }

    fn require_table(&self, name: &str) -> Result<(), StoreError> {
        if self.table_exists(name)? {
            Ok(())
        } else {
            Err(StoreError::MissingTable(name.to_string()))
        }
    }
}
