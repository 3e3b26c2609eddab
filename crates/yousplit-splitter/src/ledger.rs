//! Dual cumulative-deposit ledger.
//!
//! One [`LedgerAccount`] per asset class. `cumulative_deposited` only ever
//! grows; `held` is the balance actually in custody.
//!
//! ## Invariant
//!
//! ```text
//! held(asset) == cumulative_deposited(asset) - sum(withdrawn(b, asset))
//! ```
//!
//! over every beneficiary ever registered.

use serde::{Deserialize, Serialize};
use yousplit_types::{Amount, Asset};

use crate::pool::Splitter;
use crate::{Result, SplitterError};

/// Counters for one asset class.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub cumulative_deposited: Amount,
    pub held: Amount,
}

impl LedgerAccount {
    fn check_credit(&self, amount: Amount) -> Result<()> {
        self.cumulative_deposited
            .checked_add(amount)
            .and(self.held.checked_add(amount))
            .map(|_| ())
            .ok_or(SplitterError::Overflow)
    }

    fn credit(&mut self, amount: Amount) -> Result<()> {
        self.check_credit(amount)?;
        self.cumulative_deposited += amount;
        self.held += amount;
        Ok(())
    }
}

/// The native and stable ledgers of one pool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualLedger {
    native: LedgerAccount,
    stable: LedgerAccount,
}

impl DualLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_accounts(native: LedgerAccount, stable: LedgerAccount) -> Self {
        Self { native, stable }
    }

    pub fn account(&self, asset: Asset) -> &LedgerAccount {
        match asset {
            Asset::Native => &self.native,
            Asset::Stable => &self.stable,
        }
    }

    fn account_mut(&mut self, asset: Asset) -> &mut LedgerAccount {
        match asset {
            Asset::Native => &mut self.native,
            Asset::Stable => &mut self.stable,
        }
    }

    pub fn cumulative_deposited(&self, asset: Asset) -> Amount {
        self.account(asset).cumulative_deposited
    }

    pub fn held(&self, asset: Asset) -> Amount {
        self.account(asset).held
    }

    /// Fail with [`SplitterError::Overflow`] if crediting `amount` would
    /// overflow either counter.
    pub fn check_credit(&self, asset: Asset, amount: Amount) -> Result<()> {
        self.account(asset).check_credit(amount)
    }

    pub(crate) fn credit(&mut self, asset: Asset, amount: Amount) -> Result<()> {
        self.account_mut(asset).credit(amount)
    }

    /// Fail with [`SplitterError::TransferFailed`] if fewer than `amount`
    /// units are held.
    pub fn check_available(&self, asset: Asset, amount: Amount) -> Result<()> {
        let held = self.held(asset);
        if held < amount {
            return Err(SplitterError::TransferFailed(format!(
                "pool holds {held} {asset} units, {amount} requested"
            )));
        }
        Ok(())
    }

    pub(crate) fn debit(&mut self, asset: Asset, amount: Amount) -> Result<()> {
        self.check_available(asset, amount)?;
        self.account_mut(asset).held -= amount;
        Ok(())
    }
}

impl Splitter {
    /// Record native value that has arrived at the pool.
    ///
    /// Called by the hosting runtime in the same step that moves the value
    /// into custody.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::Overflow`] if the counters would overflow
    pub fn credit_native(&mut self, amount: Amount) -> Result<()> {
        self.ledger.credit(Asset::Native, amount)?;
        tracing::info!(
            amount,
            cumulative = self.ledger.cumulative_deposited(Asset::Native),
            held = self.ledger.held(Asset::Native),
            "native funds received"
        );
        Ok(())
    }

    /// Native units currently held.
    pub fn total_balance(&self) -> Amount {
        self.ledger.held(Asset::Native)
    }

    /// Stable units currently held.
    pub fn get_total_funds(&self) -> Amount {
        self.ledger.held(Asset::Stable)
    }
}
