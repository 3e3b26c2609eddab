//! Pool snapshot query functions.
//!
//! A snapshot is written in a single transaction: the singleton `pool` row is
//! replaced and the `beneficiaries` table is rewritten from scratch. Loading
//! goes through [`Splitter::from_snapshot`], so a store that violates any
//! pool invariant is rejected.

use rusqlite::{Connection, OptionalExtension};
use yousplit_splitter::ledger::LedgerAccount;
use yousplit_splitter::registry::Beneficiary;
use yousplit_splitter::snapshot::{BeneficiaryEntry, PoolSnapshot};
use yousplit_splitter::Splitter;

use crate::{address_from_sql, amount_from_sql, amount_to_sql, now_secs, DbError, Result};

/// Persist the full pool state in its own transaction, replacing whatever
/// was stored.
pub fn save(conn: &Connection, pool: &Splitter) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    write(&tx, pool)?;
    tx.commit()?;
    Ok(())
}

/// Write the full pool state without opening a transaction. Callers that
/// combine the snapshot with other writes wrap this in their own.
pub fn write(conn: &Connection, pool: &Splitter) -> Result<()> {
    let snapshot = pool.snapshot();

    conn.execute(
        "INSERT OR REPLACE INTO pool
            (id, owner, address, stable_token,
             native_cumulative, native_held, stable_cumulative, stable_held, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            snapshot.owner.as_bytes().as_slice(),
            snapshot.address.as_bytes().as_slice(),
            snapshot.stable_token.map(|t| t.0.to_vec()),
            amount_to_sql(snapshot.native.cumulative_deposited),
            amount_to_sql(snapshot.native.held),
            amount_to_sql(snapshot.stable.cumulative_deposited),
            amount_to_sql(snapshot.stable.held),
            now_secs() as i64,
        ],
    )?;

    conn.execute("DELETE FROM beneficiaries", [])?;
    let mut stmt = conn.prepare(
        "INSERT INTO beneficiaries
            (address, share_bps, withdrawn_native, withdrawn_stable, eligible, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for entry in &snapshot.beneficiaries {
        let b = &entry.beneficiary;
        stmt.execute(rusqlite::params![
            entry.address.as_bytes().as_slice(),
            b.share_bps,
            amount_to_sql(b.withdrawn_native),
            amount_to_sql(b.withdrawn_stable),
            b.eligible,
            entry.position.map(|p| p as i64),
        ])?;
    }

    tracing::debug!(
        records = snapshot.beneficiaries.len(),
        "pool snapshot written"
    );
    Ok(())
}

/// Load the stored pool, or `None` if nothing was saved yet.
///
/// # Errors
///
/// - [`DbError::Corrupt`] on malformed columns
/// - [`DbError::Splitter`] if the stored state violates a pool invariant
pub fn load(conn: &Connection) -> Result<Option<Splitter>> {
    let header = conn
        .query_row(
            "SELECT owner, address, stable_token,
                    native_cumulative, native_held, stable_cumulative, stable_held
             FROM pool WHERE id = 1",
            [],
            |row| {
                Ok(PoolRow {
                    owner: row.get(0)?,
                    address: row.get(1)?,
                    stable_token: row.get(2)?,
                    native_cumulative: row.get(3)?,
                    native_held: row.get(4)?,
                    stable_cumulative: row.get(5)?,
                    stable_held: row.get(6)?,
                })
            },
        )
        .optional()?;
    let Some(header) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT address, share_bps, withdrawn_native, withdrawn_stable, eligible, position
         FROM beneficiaries",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(BeneficiaryRow {
                address: row.get(0)?,
                share_bps: row.get(1)?,
                withdrawn_native: row.get(2)?,
                withdrawn_stable: row.get(3)?,
                eligible: row.get(4)?,
                position: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let beneficiaries = rows
        .into_iter()
        .map(BeneficiaryRow::into_entry)
        .collect::<Result<Vec<_>>>()?;

    let snapshot = PoolSnapshot {
        owner: address_from_sql(&header.owner)?,
        address: address_from_sql(&header.address)?,
        stable_token: header
            .stable_token
            .as_deref()
            .map(address_from_sql)
            .transpose()?,
        native: LedgerAccount {
            cumulative_deposited: amount_from_sql(&header.native_cumulative)?,
            held: amount_from_sql(&header.native_held)?,
        },
        stable: LedgerAccount {
            cumulative_deposited: amount_from_sql(&header.stable_cumulative)?,
            held: amount_from_sql(&header.stable_held)?,
        },
        beneficiaries,
    };

    let pool = Splitter::from_snapshot(snapshot)?;
    Ok(Some(pool))
}

struct PoolRow {
    owner: Vec<u8>,
    address: Vec<u8>,
    stable_token: Option<Vec<u8>>,
    native_cumulative: String,
    native_held: String,
    stable_cumulative: String,
    stable_held: String,
}

struct BeneficiaryRow {
    address: Vec<u8>,
    share_bps: u32,
    withdrawn_native: String,
    withdrawn_stable: String,
    eligible: bool,
    position: Option<i64>,
}

impl BeneficiaryRow {
    fn into_entry(self) -> Result<BeneficiaryEntry> {
        let position = self
            .position
            .map(|p| {
                usize::try_from(p).map_err(|_| DbError::Corrupt(format!("position {p}")))
            })
            .transpose()?;
        Ok(BeneficiaryEntry {
            address: address_from_sql(&self.address)?,
            beneficiary: Beneficiary {
                share_bps: self.share_bps,
                withdrawn_native: amount_from_sql(&self.withdrawn_native)?,
                withdrawn_stable: amount_from_sql(&self.withdrawn_stable)?,
                eligible: self.eligible,
            },
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yousplit_splitter::{NativeTransfer, PoolParams, TransferError};
    use yousplit_types::{Address, Amount, Asset};

    const OWNER: Address = Address::repeat(0x0a);
    const POOL: Address = Address::repeat(0xee);
    const TOKEN: Address = Address::repeat(0xcc);
    const B1: Address = Address::repeat(0x01);
    const B2: Address = Address::repeat(0x02);
    const B3: Address = Address::repeat(0x03);

    struct Accept;

    impl NativeTransfer for Accept {
        fn send(
            &mut self,
            _pool: &mut Splitter,
            _to: &Address,
            _amount: Amount,
        ) -> std::result::Result<(), TransferError> {
            Ok(())
        }
    }

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn pool() -> Splitter {
        Splitter::new(
            PoolParams::new(OWNER, POOL, vec![B1, B2], vec![475, 475]).with_stable_token(TOKEN),
        )
        .expect("construct")
    }

    #[test]
    fn test_load_empty() {
        let conn = test_db();
        assert!(load(&conn).expect("load").is_none());
    }

    #[test]
    fn test_save_and_load_fresh_pool() {
        let conn = test_db();
        let pool = pool();
        save(&conn, &pool).expect("save");
        assert_eq!(load(&conn).expect("load"), Some(pool));
    }

    #[test]
    fn test_save_and_load_after_activity() {
        let conn = test_db();
        let mut pool = pool();
        pool.credit_native(u128::from(u64::MAX) * 3).expect("credit");
        pool.withdraw(&B1, &mut Accept).expect("withdraw");
        pool.remove_beneficiary(&OWNER, &B2).expect("remove");
        pool.set_beneficiary(&OWNER, B3, 100, false).expect("add");
        save(&conn, &pool).expect("save");

        let loaded = load(&conn).expect("load").expect("present");
        assert_eq!(loaded, pool);
        assert_eq!(loaded.get_beneficiaries().addresses, vec![OWNER, B1, B3]);
        assert_eq!(loaded.cumulative_deposited(Asset::Native), u128::from(u64::MAX) * 3);
        assert_eq!(loaded.beneficiaries(&B2).share_bps, 0);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let conn = test_db();
        let mut pool = pool();
        save(&conn, &pool).expect("first save");
        pool.remove_beneficiary(&OWNER, &B1).expect("remove");
        pool.credit_native(500).expect("credit");
        save(&conn, &pool).expect("second save");
        assert_eq!(load(&conn).expect("load"), Some(pool));
    }

    #[test]
    fn test_tampered_store_rejected() {
        let conn = test_db();
        let mut pool = pool();
        pool.credit_native(1_000).expect("credit");
        save(&conn, &pool).expect("save");

        conn.execute("UPDATE beneficiaries SET share_bps = 9600 WHERE position = 1", [])
            .expect("tamper");
        assert!(matches!(load(&conn), Err(DbError::Splitter(_))));
    }

    #[test]
    fn test_corrupt_amount_rejected() {
        let conn = test_db();
        save(&conn, &pool()).expect("save");
        conn.execute("UPDATE pool SET native_held = 'lots'", [])
            .expect("tamper");
        assert!(matches!(load(&conn), Err(DbError::Corrupt(_))));
    }
}
