//! Settlement history query functions.
//!
//! Every committed deposit, withdrawal and onramp is appended here. Rows are
//! never updated. Each row carries a BLAKE3 receipt hash chained over the
//! previous row's receipt, so [`verify_chain`] detects edited or dropped rows.

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use yousplit_types::{Address, Amount, Asset};

use crate::{address_from_sql, amount_from_sql, amount_to_sql, now_secs, DbError, Result};

/// BLAKE3 derive-key context for settlement receipts.
pub const RECEIPT_CONTEXT: &str = "YouSplit v1 settlement-receipt";

/// Kind of settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    Deposit,
    Withdraw,
    Onramp,
}

impl SettlementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Onramp => "onramp",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdraw" => Ok(Self::Withdraw),
            "onramp" => Ok(Self::Onramp),
            other => Err(DbError::Corrupt(format!("settlement kind '{other}'"))),
        }
    }
}

/// A stored settlement row.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub seq: i64,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub receipt_hash: [u8; 32],
    pub kind: SettlementKind,
    pub asset: Asset,
    /// Depositor, withdrawing beneficiary, or onramping owner.
    pub party: Address,
    pub amount: Amount,
    pub timestamp: u64,
}

fn receipt_hash(
    previous: &[u8; 32],
    kind: SettlementKind,
    asset: Asset,
    party: &Address,
    amount: Amount,
    timestamp: u64,
) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(RECEIPT_CONTEXT);
    hasher.update(previous);
    hasher.update(kind.as_str().as_bytes());
    hasher.update(asset.as_str().as_bytes());
    hasher.update(party.as_bytes());
    hasher.update(&amount.to_le_bytes());
    hasher.update(&timestamp.to_le_bytes());
    *hasher.finalize().as_bytes()
}

fn last_receipt(conn: &Connection) -> Result<[u8; 32]> {
    let last: Option<Vec<u8>> = conn
        .query_row(
            "SELECT receipt_hash FROM settlement_history ORDER BY seq DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match last {
        None => Ok([0u8; 32]),
        Some(bytes) => to_hash(&bytes),
    }
}

fn to_hash(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| DbError::Corrupt(format!("receipt hash of {} bytes", bytes.len())))
}

/// Append a settlement and return its receipt hash.
pub fn record(
    conn: &Connection,
    kind: SettlementKind,
    asset: Asset,
    party: &Address,
    amount: Amount,
) -> Result<[u8; 32]> {
    let timestamp = now_secs();
    let previous = last_receipt(conn)?;
    let hash = receipt_hash(&previous, kind, asset, party, amount, timestamp);

    conn.execute(
        "INSERT INTO settlement_history (receipt_hash, kind, asset, party, amount, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            hash.as_slice(),
            kind.as_str(),
            asset.as_str(),
            party.as_bytes().as_slice(),
            amount_to_sql(amount),
            timestamp as i64,
        ],
    )?;
    tracing::trace!(kind = kind.as_str(), %asset, %party, amount, "settlement recorded");
    Ok(hash)
}

/// Settlements in insertion order, optionally restricted to one party.
pub fn list(conn: &Connection, party: Option<&Address>, limit: u32) -> Result<Vec<Settlement>> {
    let mut stmt = conn.prepare(
        "SELECT seq, receipt_hash, kind, asset, party, amount, timestamp
         FROM settlement_history
         WHERE ?1 IS NULL OR party = ?1
         ORDER BY seq ASC LIMIT ?2",
    )?;

    let raw = stmt
        .query_map(
            rusqlite::params![party.map(|p| p.0.to_vec()), limit],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(seq, hash, kind, asset, party, amount, timestamp)| {
            Ok(Settlement {
                seq,
                receipt_hash: to_hash(&hash)?,
                kind: SettlementKind::parse(&kind)?,
                asset: asset
                    .parse()
                    .map_err(|_| DbError::Corrupt(format!("asset '{asset}'")))?,
                party: address_from_sql(&party)?,
                amount: amount_from_sql(&amount)?,
                timestamp: timestamp as u64,
            })
        })
        .collect()
}

/// Recompute the receipt chain. Returns the number of verified rows.
///
/// # Errors
///
/// - [`DbError::Corrupt`] naming the first row whose receipt does not match
pub fn verify_chain(conn: &Connection) -> Result<usize> {
    let rows = list(conn, None, u32::MAX)?;
    let mut previous = [0u8; 32];
    for row in &rows {
        let expected = receipt_hash(
            &previous,
            row.kind,
            row.asset,
            &row.party,
            row.amount,
            row.timestamp,
        );
        if expected != row.receipt_hash {
            return Err(DbError::Corrupt(format!(
                "settlement {} receipt mismatch",
                row.seq
            )));
        }
        previous = row.receipt_hash;
    }
    Ok(rows.len())
}
