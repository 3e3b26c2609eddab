//! Beneficiary records and the share-sum invariant.
//!
//! Every address ever registered keeps its record, so withdrawal history
//! survives removal. A separate insertion-ordered list holds the addresses
//! that are currently registered.
//!
//! ## Invariant
//!
//! ```text
//! sum(share_bps of active beneficiaries) <= 10000
//! ```
//!
//! A beneficiary is *active* when it is eligible and its share is non-zero.
//! Updates that would break the invariant are rejected without touching any
//! record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use yousplit_types::{Address, Amount, Asset, Bps, BPS_DENOMINATOR};

use crate::pool::Splitter;
use crate::{Result, SplitterError};

/// One beneficiary's stored state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    /// Share in basis points of [`BPS_DENOMINATOR`].
    pub share_bps: Bps,
    /// Native units paid out so far. Never decreases.
    pub withdrawn_native: Amount,
    /// Stable units paid out so far. Never decreases.
    pub withdrawn_stable: Amount,
    pub eligible: bool,
}

impl Beneficiary {
    pub fn is_active(&self) -> bool {
        self.eligible && self.share_bps > 0
    }

    /// Share counted toward the active total.
    pub fn active_share(&self) -> Bps {
        if self.is_active() {
            self.share_bps
        } else {
            0
        }
    }

    pub fn withdrawn(&self, asset: Asset) -> Amount {
        match asset {
            Asset::Native => self.withdrawn_native,
            Asset::Stable => self.withdrawn_stable,
        }
    }
}

/// All beneficiary records plus the enumeration order.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryRegistry {
    #[serde_as(as = "Vec<(_, _)>")]
    records: BTreeMap<Address, Beneficiary>,
    order: Vec<Address>,
    active_share_bps: Bps,
}

impl BeneficiaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from stored records and enumeration order.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::CorruptSnapshot`] if the order names an address
    ///   twice or one without a record
    /// - [`SplitterError::CorruptSnapshot`] if a share exceeds the whole or
    ///   the active shares exceed the limit
    pub fn from_parts(
        records: BTreeMap<Address, Beneficiary>,
        order: Vec<Address>,
    ) -> Result<Self> {
        let mut seen = std::collections::BTreeSet::new();
        for address in &order {
            if !records.contains_key(address) {
                return Err(SplitterError::CorruptSnapshot(format!(
                    "listed address {address} has no record"
                )));
            }
            if !seen.insert(*address) {
                return Err(SplitterError::CorruptSnapshot(format!(
                    "address {address} listed twice"
                )));
            }
        }

        if let Some((address, b)) = records.iter().find(|(_, b)| b.share_bps > BPS_DENOMINATOR) {
            return Err(SplitterError::CorruptSnapshot(format!(
                "{address} holds {} bps",
                b.share_bps
            )));
        }

        let total: u64 = records.values().map(|b| u64::from(b.active_share())).sum();
        if total > u64::from(BPS_DENOMINATOR) {
            return Err(SplitterError::CorruptSnapshot(format!(
                "active shares total {total} bps"
            )));
        }

        Ok(Self {
            records,
            order,
            active_share_bps: total as Bps,
        })
    }

    /// Insert a new beneficiary or update an existing one's share and
    /// eligibility. Withdrawal history is preserved.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::InvalidShareAllocation`] if `share_bps` exceeds the whole
    /// - [`SplitterError::InvalidShareAllocation`] if `share_bps` is zero for an
    ///   address that is not currently registered
    /// - [`SplitterError::InvalidShareAllocation`] if the active total would
    ///   exceed [`BPS_DENOMINATOR`]
    pub fn set(&mut self, address: Address, share_bps: Bps, eligible: bool) -> Result<()> {
        if share_bps > BPS_DENOMINATOR {
            return Err(SplitterError::share_out_of_range(share_bps));
        }

        let listed = self.is_registered(&address);
        if !listed && share_bps == 0 {
            return Err(SplitterError::InvalidShareAllocation(format!(
                "cannot register {address} with a zero share"
            )));
        }

        let existing = self.records.get(&address).cloned().unwrap_or_default();
        let updated = Beneficiary {
            share_bps,
            eligible,
            ..existing
        };

        let new_total = u64::from(self.active_share_bps) - u64::from(existing.active_share())
            + u64::from(updated.active_share());
        if new_total > u64::from(BPS_DENOMINATOR) {
            return Err(SplitterError::share_sum_exceeded(new_total));
        }

        self.records.insert(address, updated);
        if !listed {
            self.order.push(address);
        }
        self.active_share_bps = new_total as Bps;

        tracing::debug!(
            %address,
            share_bps,
            eligible,
            active_share_bps = self.active_share_bps,
            "beneficiary set"
        );

        Ok(())
    }

    /// Deactivate a registered beneficiary and drop it from the enumeration.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::UnknownBeneficiary`] if the address is not registered
    pub fn remove(&mut self, address: &Address) -> Result<()> {
        let position = self
            .order
            .iter()
            .position(|a| a == address)
            .ok_or(SplitterError::UnknownBeneficiary)?;

        let record = self
            .records
            .get_mut(address)
            .ok_or(SplitterError::UnknownBeneficiary)?;

        self.active_share_bps -= record.active_share();
        record.share_bps = 0;
        record.eligible = false;
        self.order.remove(position);

        tracing::debug!(%address, active_share_bps = self.active_share_bps, "beneficiary removed");

        Ok(())
    }

    /// Whether the address is currently registered (listed).
    pub fn is_registered(&self, address: &Address) -> bool {
        self.order.contains(address)
    }

    /// Record for the address, including removed ones.
    pub fn get(&self, address: &Address) -> Option<&Beneficiary> {
        self.records.get(address)
    }

    /// Currently registered beneficiaries, in insertion order.
    pub fn listed(&self) -> impl Iterator<Item = (Address, &Beneficiary)> + '_ {
        self.order
            .iter()
            .filter_map(|a| self.records.get(a).map(|b| (*a, b)))
    }

    /// Every record ever registered, keyed by address.
    pub fn records(&self) -> &BTreeMap<Address, Beneficiary> {
        &self.records
    }

    pub fn order(&self) -> &[Address] {
        &self.order
    }

    pub fn active_share_bps(&self) -> Bps {
        self.active_share_bps
    }

    /// Sum of amounts withdrawn by every beneficiary ever registered.
    pub fn total_withdrawn(&self, asset: Asset) -> Amount {
        self.records
            .values()
            .fold(0, |acc: Amount, b| acc.saturating_add(b.withdrawn(asset)))
    }

    pub(crate) fn record_withdrawal(
        &mut self,
        address: &Address,
        asset: Asset,
        amount: Amount,
    ) -> Result<()> {
        let record = self
            .records
            .get_mut(address)
            .ok_or(SplitterError::UnknownBeneficiary)?;
        let counter = match asset {
            Asset::Native => &mut record.withdrawn_native,
            Asset::Stable => &mut record.withdrawn_stable,
        };
        *counter = counter.checked_add(amount).ok_or(SplitterError::Overflow)?;
        Ok(())
    }
}

impl Splitter {
    /// Owner-only insert or update of a beneficiary.
    ///
    /// See [`BeneficiaryRegistry::set`] for the share rules.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::NotOwner`] if `caller` is not the owner
    /// - [`SplitterError::InvalidShareAllocation`] on a share-rule violation
    pub fn set_beneficiary(
        &mut self,
        caller: &Address,
        address: Address,
        share_bps: Bps,
        eligible: bool,
    ) -> Result<()> {
        self.access.require_owner(caller)?;
        if let Err(e) = self.registry.set(address, share_bps, eligible) {
            tracing::warn!(%address, share_bps, eligible, error = %e, "set_beneficiary rejected");
            return Err(e);
        }
        tracing::info!(%address, share_bps, eligible, "beneficiary updated");
        Ok(())
    }

    /// Owner-only removal of a beneficiary. History is retained.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::NotOwner`] if `caller` is not the owner
    /// - [`SplitterError::UnknownBeneficiary`] if the address is not registered
    pub fn remove_beneficiary(&mut self, caller: &Address, address: &Address) -> Result<()> {
        self.access.require_owner(caller)?;
        self.registry.remove(address)?;
        tracing::info!(%address, "beneficiary removed");
        Ok(())
    }
}
