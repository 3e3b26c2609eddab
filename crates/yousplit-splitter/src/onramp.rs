//! Pulling stable-token royalties into the pool.
//!
//! The owner grants the pool an allowance on the external stable-token
//! ledger beforehand; `onramp_royalties` then pulls the tokens and credits
//! the stable ledger in the same call. A rejected pull leaves the pool
//! untouched.

use yousplit_types::{Address, Amount, Asset};

use crate::pool::Splitter;
use crate::token::StableToken;
use crate::{Result, SplitterError};

impl Splitter {
    /// Fail unless a stable token is configured and `token` is that ledger.
    pub(crate) fn require_stable_token<T: StableToken + ?Sized>(&self, token: &T) -> Result<()> {
        let configured = self
            .stable_token
            .ok_or(SplitterError::StableTokenNotConfigured)?;
        let offered = token.token_address();
        if offered != configured {
            return Err(SplitterError::TransferFailed(format!(
                "token ledger {offered} is not the configured stable token {configured}"
            )));
        }
        Ok(())
    }

    /// Owner-only pull of `amount` stable units from the owner into the pool.
    ///
    /// # Errors
    ///
    /// - [`SplitterError::NotOwner`] if `caller` is not the owner
    /// - [`SplitterError::StableTokenNotConfigured`] on a native-only pool
    /// - [`SplitterError::Overflow`] if the stable counters would overflow
    /// - [`SplitterError::TransferFailed`] if the token ledger rejects the pull
    pub fn onramp_royalties<T: StableToken + ?Sized>(
        &mut self,
        caller: &Address,
        amount: Amount,
        token: &mut T,
    ) -> Result<()> {
        self.access.require_owner(caller)?;
        self.require_stable_token(token)?;
        self.ledger.check_credit(Asset::Stable, amount)?;

        let owner = self.access.owner();
        if let Err(e) = token.transfer_from(&self.address, &owner, &self.address, amount) {
            tracing::warn!(amount, error = %e, "stable onramp rejected by token ledger");
            return Err(SplitterError::TransferFailed(e.to_string()));
        }
        self.ledger.credit(Asset::Stable, amount)?;

        tracing::info!(
            amount,
            cumulative = self.ledger.cumulative_deposited(Asset::Stable),
            held = self.get_total_funds(),
            "royalties onramped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolParams;
    use crate::token::MemoryTokenLedger;

    const OWNER: Address = Address::repeat(0x0a);
    const POOL: Address = Address::repeat(0xee);
    const TOKEN: Address = Address::repeat(0xcc);
    const B1: Address = Address::repeat(0x01);

    fn setup() -> (Splitter, MemoryTokenLedger) {
        let pool = Splitter::new(
            PoolParams::new(OWNER, POOL, vec![B1], vec![475]).with_stable_token(TOKEN),
        )
        .expect("construct");
        let mut token = MemoryTokenLedger::new(TOKEN);
        token.mint(&OWNER, 1_000_000).expect("mint");
        (pool, token)
    }

    #[test]
    fn test_onramp_credits_stable_ledger() {
        let (mut pool, mut token) = setup();
        token.approve(&OWNER, &POOL, 5_000);

        pool.onramp_royalties(&OWNER, 5_000, &mut token).expect("onramp");
        assert_eq!(pool.get_total_funds(), 5_000);
        assert_eq!(pool.cumulative_deposited(Asset::Stable), 5_000);
        assert_eq!(pool.cumulative_deposited(Asset::Native), 0);
        assert_eq!(token.balance_of(&POOL), 5_000);
        assert_eq!(token.allowance(&OWNER, &POOL), 0);
    }

    #[test]
    fn test_onramp_without_allowance_fails_cleanly() {
        let (mut pool, mut token) = setup();
        let before = pool.clone();

        let result = pool.onramp_royalties(&OWNER, 5_000, &mut token);
        assert!(matches!(result, Err(SplitterError::TransferFailed(_))));
        assert_eq!(pool, before);
        assert_eq!(token.balance_of(&OWNER), 1_000_000);
    }

    #[test]
    fn test_onramp_owner_only() {
        let (mut pool, mut token) = setup();
        token.approve(&OWNER, &POOL, 5_000);
        let result = pool.onramp_royalties(&B1, 5_000, &mut token);
        assert_eq!(result, Err(SplitterError::NotOwner));
        assert_eq!(pool.get_total_funds(), 0);
    }

    #[test]
    fn test_onramp_native_only_pool() {
        let mut pool =
            Splitter::new(PoolParams::new(OWNER, POOL, vec![B1], vec![475])).expect("construct");
        let mut token = MemoryTokenLedger::new(TOKEN);
        let result = pool.onramp_royalties(&OWNER, 1, &mut token);
        assert_eq!(result, Err(SplitterError::StableTokenNotConfigured));
    }

    #[test]
    fn test_onramp_wrong_token_ledger() {
        let (mut pool, _) = setup();
        let mut other = MemoryTokenLedger::new(Address::repeat(0xdd));
        other.mint(&OWNER, 10).expect("mint");
        other.approve(&OWNER, &POOL, 10);
        let result = pool.onramp_royalties(&OWNER, 10, &mut other);
        assert!(matches!(result, Err(SplitterError::TransferFailed(_))));
        assert_eq!(other.balance_of(&OWNER), 10);
    }
}
