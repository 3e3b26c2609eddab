//! The pool aggregate and its read-only query surface.
//!
//! A [`Splitter`] owns the owner gate, the beneficiary registry and the dual
//! ledger. Every operation takes the aggregate by reference; nothing lives in
//! globals. Mutating operations are defined next to the component they
//! drive ([`registry`](crate::registry), [`ledger`](crate::ledger),
//! [`onramp`](crate::onramp), [`withdraw`](crate::withdraw)).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use yousplit_types::beneficiary::{BeneficiaryInfo, BeneficiaryList, BeneficiaryRecord};
use yousplit_types::{Address, Amount, Asset, Bps, DEFAULT_OWNER_SHARE_BPS};

use crate::access::AccessController;
use crate::ledger::DualLedger;
use crate::registry::BeneficiaryRegistry;
use crate::withdraw::withdrawable;
use crate::{Result, SplitterError};

/// Construction arguments for a pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Deploying identity; becomes the owner and is registered first.
    pub owner: Address,
    /// The pool's own identity on external ledgers.
    pub address: Address,
    pub beneficiaries: Vec<Address>,
    pub shares: Vec<Bps>,
    /// External stable-token ledger, if the pool accepts onramps.
    pub stable_token: Option<Address>,
    /// Share registered for the owner.
    pub owner_share_bps: Bps,
}

impl PoolParams {
    /// Native-only pool with the default owner share.
    pub fn new(
        owner: Address,
        address: Address,
        beneficiaries: Vec<Address>,
        shares: Vec<Bps>,
    ) -> Self {
        Self {
            owner,
            address,
            beneficiaries,
            shares,
            stable_token: None,
            owner_share_bps: DEFAULT_OWNER_SHARE_BPS,
        }
    }

    pub fn with_stable_token(mut self, stable_token: Address) -> Self {
        self.stable_token = Some(stable_token);
        self
    }

    pub fn with_owner_share(mut self, owner_share_bps: Bps) -> Self {
        self.owner_share_bps = owner_share_bps;
        self
    }
}

/// Shares, cumulative deposits and withdrawal history of one pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Splitter {
    pub(crate) address: Address,
    pub(crate) stable_token: Option<Address>,
    pub(crate) access: AccessController,
    pub(crate) registry: BeneficiaryRegistry,
    pub(crate) ledger: DualLedger,
}

impl Splitter {
    /// Construct a pool, registering the owner with its reserved share and
    /// then every listed beneficiary, all eligible.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::MismatchedInput`] if the sequences differ in length
    /// - [`SplitterError::DuplicateBeneficiary`] if an address (including the
    ///   owner) appears twice
    /// - [`SplitterError::InvalidShareAllocation`] if a share is zero or the
    ///   shares total more than the whole
    pub fn new(params: PoolParams) -> Result<Self> {
        if params.beneficiaries.len() != params.shares.len() {
            return Err(SplitterError::MismatchedInput {
                beneficiaries: params.beneficiaries.len(),
                shares: params.shares.len(),
            });
        }

        let mut seen = BTreeSet::from([params.owner]);
        for address in &params.beneficiaries {
            if !seen.insert(*address) {
                return Err(SplitterError::DuplicateBeneficiary(address.to_string()));
            }
        }

        let mut registry = BeneficiaryRegistry::new();
        registry.set(params.owner, params.owner_share_bps, true)?;
        for (address, share) in params.beneficiaries.iter().zip(&params.shares) {
            registry.set(*address, *share, true)?;
        }

        tracing::info!(
            owner = %params.owner,
            address = %params.address,
            beneficiaries = registry.order().len(),
            active_share_bps = registry.active_share_bps(),
            stable = params.stable_token.is_some(),
            "pool constructed"
        );

        Ok(Self {
            address: params.address,
            stable_token: params.stable_token,
            access: AccessController::new(params.owner),
            registry,
            ledger: DualLedger::new(),
        })
    }

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    /// The pool's own identity.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn stable_token(&self) -> Option<Address> {
        self.stable_token
    }

    pub fn registry(&self) -> &BeneficiaryRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &DualLedger {
        &self.ledger
    }

    pub fn cumulative_deposited(&self, asset: Asset) -> Amount {
        self.ledger.cumulative_deposited(asset)
    }

    pub fn active_share_bps(&self) -> Bps {
        self.registry.active_share_bps()
    }

    /// Stored fields for `address`; all zero when it was never registered.
    pub fn beneficiaries(&self, address: &Address) -> BeneficiaryRecord {
        self.registry
            .get(address)
            .map(|b| BeneficiaryRecord {
                share_bps: b.share_bps,
                withdrawn_native: b.withdrawn_native,
                eligible: b.eligible,
            })
            .unwrap_or_default()
    }

    /// Currently registered beneficiaries as parallel sequences in insertion
    /// order. Ineligible entries are included; removed ones are not.
    pub fn get_beneficiaries(&self) -> BeneficiaryList {
        let mut list = BeneficiaryList::default();
        for (address, b) in self.registry.listed() {
            list.addresses.push(address);
            list.shares.push(b.share_bps);
            list.withdrawn.push(b.withdrawn_native);
            list.eligible.push(b.eligible);
        }
        list
    }

    /// Stored fields plus the amounts withdrawable right now.
    pub fn get_beneficiary_info(&self, address: &Address) -> BeneficiaryInfo {
        let Some(b) = self.registry.get(address) else {
            return BeneficiaryInfo::default();
        };
        BeneficiaryInfo {
            share_bps: b.share_bps,
            withdrawn_native: b.withdrawn_native,
            withdrawn_stable: b.withdrawn_stable,
            eligible: b.eligible,
            eligible_amount: self.withdrawable(address, Asset::Native),
            stable_eligible_amount: self.withdrawable(address, Asset::Stable),
        }
    }

    /// Amount of `asset` the address could withdraw now. Zero for unknown or
    /// ineligible addresses.
    pub fn withdrawable(&self, address: &Address, asset: Asset) -> Amount {
        match self.registry.get(address) {
            Some(b) if b.eligible && self.registry.is_registered(address) => withdrawable(
                b.share_bps,
                self.ledger.cumulative_deposited(asset),
                b.withdrawn(asset),
            ),
            _ => 0,
        }
    }

    /// Verify the share-sum and custody invariants.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::CorruptSnapshot`] naming the first violated invariant
    pub fn check_invariants(&self) -> Result<()> {
        let active: u64 = self
            .registry
            .records()
            .values()
            .map(|b| u64::from(b.active_share()))
            .sum();
        if active > u64::from(yousplit_types::BPS_DENOMINATOR)
            || active != u64::from(self.registry.active_share_bps())
        {
            return Err(SplitterError::CorruptSnapshot(format!(
                "active shares total {active} bps, tracked {}",
                self.registry.active_share_bps()
            )));
        }

        for asset in Asset::ALL {
            let withdrawn = self.registry.total_withdrawn(asset);
            let expected = self
                .ledger
                .cumulative_deposited(asset)
                .checked_sub(withdrawn)
                .ok_or_else(|| {
                    SplitterError::CorruptSnapshot(format!(
                        "{asset}: withdrawn {withdrawn} exceeds deposits"
                    ))
                })?;
            let held = self.ledger.held(asset);
            if held != expected {
                return Err(SplitterError::CorruptSnapshot(format!(
                    "{asset}: held {held}, expected {expected}"
                )));
            }
        }
        Ok(())
    }
}
