//! SQL schema definitions.
//!
//! Amounts are `u128` and are stored as decimal TEXT; addresses are 20-byte
//! BLOBs.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Pool aggregate
-- ============================================================

CREATE TABLE IF NOT EXISTS pool (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    owner BLOB NOT NULL,
    address BLOB NOT NULL,
    stable_token BLOB,
    native_cumulative TEXT NOT NULL,
    native_held TEXT NOT NULL,
    stable_cumulative TEXT NOT NULL,
    stable_held TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Every address ever registered. `position` is the enumeration slot and is
-- NULL once the beneficiary has been removed.
CREATE TABLE IF NOT EXISTS beneficiaries (
    address BLOB PRIMARY KEY,
    share_bps INTEGER NOT NULL CHECK (share_bps BETWEEN 0 AND 10000),
    withdrawn_native TEXT NOT NULL,
    withdrawn_stable TEXT NOT NULL,
    eligible INTEGER NOT NULL DEFAULT 1,
    position INTEGER UNIQUE
);

-- ============================================================
-- Settlement history (append-only)
-- ============================================================

CREATE TABLE IF NOT EXISTS settlement_history (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    receipt_hash BLOB NOT NULL UNIQUE,
    kind TEXT NOT NULL CHECK (kind IN ('deposit', 'withdraw', 'onramp')),
    asset TEXT NOT NULL CHECK (asset IN ('native', 'stable')),
    party BLOB NOT NULL,
    amount TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_settlement_party ON settlement_history(party);

-- ============================================================
-- Settings
-- ============================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
