//! # yousplit-db
//!
//! SQLite persistence for the splitter daemon.
//! Manages the single database at `$YOUSPLIT_DATA_DIR/yousplit.db`.
//!
//! ## Schema
//!
//! - WAL mode
//! - Foreign keys enforced
//! - `u128` amounts stored as decimal TEXT
//! - Timestamps are Unix epoch seconds
//! - Schema version stored in `PRAGMA user_version`

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

use yousplit_types::{Address, Amount, ADDRESS_LEN};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("stored pool rejected: {0}")]
    Splitter(#[from] yousplit_splitter::SplitterError),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

pub(crate) fn amount_to_sql(amount: Amount) -> String {
    amount.to_string()
}

pub(crate) fn amount_from_sql(text: &str) -> Result<Amount> {
    text.parse()
        .map_err(|e: std::num::ParseIntError| DbError::Corrupt(format!("amount '{text}': {e}")))
}

pub(crate) fn address_from_sql(bytes: &[u8]) -> Result<Address> {
    let raw: [u8; ADDRESS_LEN] = bytes
        .try_into()
        .map_err(|_| DbError::Corrupt(format!("address of {} bytes", bytes.len())))?;
    Ok(Address(raw))
}

/// Current Unix time in seconds.
pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
