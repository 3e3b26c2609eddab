//! Entitlement math and settlement.
//!
//! ## Formula
//!
//! ```text
//! entitlement(b, a)  = share_bps(b) * cumulative_deposited(a) / 10000   (truncating)
//! withdrawable(b, a) = max(0, entitlement(b, a) - withdrawn(b, a))
//! ```
//!
//! Nothing per-beneficiary is accrued; both values are recomputed from the
//! stored share and counters on every call. The truncated remainder stays in
//! the pool and is picked up once later deposits push the rounded value up.
//!
//! ## Settlement order
//!
//! The withdrawn counter and the held balance are committed *before* value
//! leaves the pool. A transfer that re-enters the pool therefore observes a
//! withdrawable amount of zero. If the transfer fails, the pool is restored
//! to its state before the call, including anything a re-entrant call did.

use yousplit_types::{Address, Amount, Asset, Bps, BPS_DENOMINATOR};

use crate::pool::Splitter;
use crate::token::StableToken;
use crate::{Result, SplitterError};

/// Failure of an outbound native transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct TransferError {
    pub reason: String,
}

impl TransferError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Outbound native value transfer performed by the hosting runtime.
///
/// The pool is passed back in so that the receiving side may call any entry
/// point before the transfer returns.
pub trait NativeTransfer {
    fn send(
        &mut self,
        pool: &mut Splitter,
        to: &Address,
        amount: Amount,
    ) -> std::result::Result<(), TransferError>;
}

/// Truncating `share_bps * cumulative / 10000` without overflow.
pub fn entitlement(share_bps: Bps, cumulative: Amount) -> Amount {
    let denom = Amount::from(BPS_DENOMINATOR);
    let share = Amount::from(share_bps);
    (cumulative / denom)
        .saturating_mul(share)
        .saturating_add((cumulative % denom) * share / denom)
}

/// Entitlement not yet withdrawn, floored at zero.
pub fn withdrawable(share_bps: Bps, cumulative: Amount, withdrawn: Amount) -> Amount {
    entitlement(share_bps, cumulative).saturating_sub(withdrawn)
}

impl Splitter {
    /// Withdrawable amount for `caller`, or why there is none.
    fn claimable(&self, caller: &Address, asset: Asset) -> Result<Amount> {
        let beneficiary = self
            .registry
            .get(caller)
            .filter(|b| b.eligible && self.registry.is_registered(caller))
            .ok_or(SplitterError::NotEligible)?;

        let amount = withdrawable(
            beneficiary.share_bps,
            self.ledger.cumulative_deposited(asset),
            beneficiary.withdrawn(asset),
        );
        if amount == 0 {
            return Err(SplitterError::NothingToWithdraw);
        }
        self.ledger.check_available(asset, amount)?;
        Ok(amount)
    }

    /// Commit a withdrawal of `amount` to the registry and ledger.
    fn commit_withdrawal(&mut self, caller: &Address, asset: Asset, amount: Amount) -> Result<()> {
        self.registry.record_withdrawal(caller, asset, amount)?;
        self.ledger.debit(asset, amount)
    }

    /// Pay `caller` its native withdrawable amount.
    ///
    /// Returns the amount transferred.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::NotEligible`] if `caller` is unregistered or ineligible
    /// - [`SplitterError::NothingToWithdraw`] if nothing is withdrawable
    /// - [`SplitterError::TransferFailed`] if the pool cannot cover the amount
    ///   or the transfer fails; the pool is left unchanged
    pub fn withdraw(
        &mut self,
        caller: &Address,
        transfer: &mut dyn NativeTransfer,
    ) -> Result<Amount> {
        let amount = self.claimable(caller, Asset::Native)?;

        let checkpoint = self.clone();
        let mut outcome = self.commit_withdrawal(caller, Asset::Native, amount);
        if outcome.is_ok() {
            outcome = transfer
                .send(self, caller, amount)
                .map_err(|e| SplitterError::TransferFailed(e.reason));
        }
        if let Err(e) = outcome {
            *self = checkpoint;
            tracing::warn!(%caller, amount, error = %e, "native withdrawal reverted");
            return Err(e);
        }

        tracing::info!(%caller, amount, held = self.total_balance(), "native withdrawal");
        Ok(amount)
    }

    /// Pay `caller` its stable withdrawable amount out of the pool's token
    /// balance.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::StableTokenNotConfigured`] on a native-only pool
    /// - [`SplitterError::NotEligible`] if `caller` is unregistered or ineligible
    /// - [`SplitterError::NothingToWithdraw`] if nothing is withdrawable
    /// - [`SplitterError::TransferFailed`] if `token` is not the configured
    ///   ledger or it rejects the transfer; the pool is left unchanged
    pub fn withdraw_stable<T: StableToken + ?Sized>(
        &mut self,
        caller: &Address,
        token: &mut T,
    ) -> Result<Amount> {
        self.require_stable_token(token)?;
        let amount = self.claimable(caller, Asset::Stable)?;

        let checkpoint = self.clone();
        let mut outcome = self.commit_withdrawal(caller, Asset::Stable, amount);
        if outcome.is_ok() {
            outcome = token
                .transfer(&self.address, caller, amount)
                .map_err(|e| SplitterError::TransferFailed(e.to_string()));
        }
        if let Err(e) = outcome {
            *self = checkpoint;
            tracing::warn!(%caller, amount, error = %e, "stable withdrawal reverted");
            return Err(e);
        }

        tracing::info!(%caller, amount, held = self.get_total_funds(), "stable withdrawal");
        Ok(amount)
    }
}
