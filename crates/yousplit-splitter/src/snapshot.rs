//! Export and validated restore of pool state.
//!
//! A [`PoolSnapshot`] is a flat, storage-friendly view of a [`Splitter`].
//! Restoring re-checks every invariant so a tampered or half-written store
//! is rejected instead of silently producing a pool that over-pays.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use yousplit_types::Address;

use crate::access::AccessController;
use crate::ledger::{DualLedger, LedgerAccount};
use crate::pool::Splitter;
use crate::registry::{Beneficiary, BeneficiaryRegistry};
use crate::{Result, SplitterError};

/// One stored beneficiary record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryEntry {
    pub address: Address,
    pub beneficiary: Beneficiary,
    /// Enumeration position; `None` once removed.
    pub position: Option<usize>,
}

/// Flat view of a pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub owner: Address,
    pub address: Address,
    pub stable_token: Option<Address>,
    pub native: LedgerAccount,
    pub stable: LedgerAccount,
    pub beneficiaries: Vec<BeneficiaryEntry>,
}

impl Splitter {
    pub fn snapshot(&self) -> PoolSnapshot {
        let positions: BTreeMap<Address, usize> = self
            .registry
            .order()
            .iter()
            .enumerate()
            .map(|(i, a)| (*a, i))
            .collect();

        let beneficiaries = self
            .registry
            .records()
            .iter()
            .map(|(address, beneficiary)| BeneficiaryEntry {
                address: *address,
                beneficiary: beneficiary.clone(),
                position: positions.get(address).copied(),
            })
            .collect();

        PoolSnapshot {
            owner: self.owner(),
            address: self.address,
            stable_token: self.stable_token,
            native: self.ledger.account(yousplit_types::Asset::Native).clone(),
            stable: self.ledger.account(yousplit_types::Asset::Stable).clone(),
            beneficiaries,
        }
    }

    /// Rebuild a pool from a snapshot.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::CorruptSnapshot`] on duplicate addresses or
    ///   positions, a missing owner record, or any violated invariant
    pub fn from_snapshot(snapshot: PoolSnapshot) -> Result<Self> {
        let mut records = BTreeMap::new();
        let mut listed: Vec<(usize, Address)> = Vec::new();

        for entry in snapshot.beneficiaries {
            if records.insert(entry.address, entry.beneficiary).is_some() {
                return Err(SplitterError::CorruptSnapshot(format!(
                    "duplicate record for {}",
                    entry.address
                )));
            }
            if let Some(position) = entry.position {
                listed.push((position, entry.address));
            }
        }

        if !records.contains_key(&snapshot.owner) {
            return Err(SplitterError::CorruptSnapshot(
                "owner has no beneficiary record".to_string(),
            ));
        }

        listed.sort_by_key(|(position, _)| *position);
        if listed.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(SplitterError::CorruptSnapshot(
                "two records share an enumeration position".to_string(),
            ));
        }
        let order = listed.into_iter().map(|(_, address)| address).collect();

        let pool = Self {
            address: snapshot.address,
            stable_token: snapshot.stable_token,
            access: AccessController::new(snapshot.owner),
            registry: BeneficiaryRegistry::from_parts(records, order)?,
            ledger: DualLedger::from_accounts(snapshot.native, snapshot.stable),
        };
        pool.check_invariants()?;

        tracing::debug!(
            owner = %pool.owner(),
            records = pool.registry.records().len(),
            "pool restored from snapshot"
        );
        Ok(pool)
    }
}
