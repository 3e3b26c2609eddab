//! Settings query functions.
//!
//! Besides plain key/value pairs, the in-process stable-token ledger is kept
//! here as one JSON document under [`TOKEN_LEDGER_KEY`].

use rusqlite::Connection;
use yousplit_splitter::token::MemoryTokenLedger;

use crate::{DbError, Result};

pub const TOKEN_LEDGER_KEY: &str = "token_ledger";

/// Get a setting value by key.
pub fn get(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::NotFound(format!("setting '{key}'"))
        }
        other => DbError::Sqlite(other),
    })
}

/// Set a setting value.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

pub fn save_token_ledger(conn: &Connection, ledger: &MemoryTokenLedger) -> Result<()> {
    let json = serde_json::to_string(ledger).map_err(|e| DbError::Serialization(e.to_string()))?;
    set(conn, TOKEN_LEDGER_KEY, &json)
}

/// Load the stored token ledger, or `None` if none was ever saved.
pub fn load_token_ledger(conn: &Connection) -> Result<Option<MemoryTokenLedger>> {
    match get(conn, TOKEN_LEDGER_KEY) {
        Ok(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| DbError::Serialization(e.to_string())),
        Err(DbError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
