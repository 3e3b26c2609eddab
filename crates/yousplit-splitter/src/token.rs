//! Stable-token ledger interface.
//!
//! The pool only ever talks to the external stable-token ledger through
//! [`StableToken`]: a balance read, a pull transfer against a prior
//! allowance, and a plain transfer out of the pool's own balance.
//! [`MemoryTokenLedger`] is an in-process ledger with the usual
//! balance/allowance semantics, used by the daemon and in tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use yousplit_types::{Address, Amount};

/// Failure reported by a stable-token ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Spender's allowance is too small.
    #[error("insufficient allowance: have {allowance}, need {required}")]
    InsufficientAllowance {
        /// Current allowance.
        allowance: Amount,
        /// Requested amount.
        required: Amount,
    },

    /// Holder's balance is too small.
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        /// Current balance.
        available: Amount,
        /// Requested amount.
        required: Amount,
    },

    /// Balance arithmetic overflow.
    #[error("token balance overflow")]
    Overflow,
}

/// The narrow stable-token surface consumed by the pool.
pub trait StableToken {
    /// Identity of this token ledger.
    fn token_address(&self) -> Address;

    fn balance_of(&self, holder: &Address) -> Amount;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// the allowance `from` granted to `spender`.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Move `amount` out of `from`'s own balance.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError>;
}

/// In-memory stable-token ledger.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTokenLedger {
    address: Address,
    #[serde_as(as = "Vec<(_, _)>")]
    balances: BTreeMap<Address, Amount>,
    #[serde_as(as = "Vec<(_, _)>")]
    allowances: BTreeMap<(Address, Address), Amount>,
}

impl MemoryTokenLedger {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Create units out of thin air. Used to seed balances.
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let balance = self.balances.entry(*to).or_default();
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        Ok(())
    }

    /// Set the amount `spender` may pull from `owner`.
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) {
        if amount == 0 {
            self.allowances.remove(&(*owner, *spender));
        } else {
            self.allowances.insert((*owner, *spender), amount);
        }
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn move_balance(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.balances.insert(*from, available - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

impl StableToken for MemoryTokenLedger {
    fn token_address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                allowance,
                required: amount,
            });
        }
        self.move_balance(from, to, amount)?;
        self.approve(from, spender, allowance - amount);
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        self.move_balance(from, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: Address = Address::repeat(0xcc);
    const ALICE: Address = Address::repeat(0x01);
    const BOB: Address = Address::repeat(0x02);
    const POOL: Address = Address::repeat(0x03);

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut token = MemoryTokenLedger::new(TOKEN);
        token.mint(&ALICE, 1_000).expect("mint");
        token.approve(&ALICE, &POOL, 600);

        token
            .transfer_from(&POOL, &ALICE, &POOL, 400)
            .expect("pull");
        assert_eq!(token.balance_of(&ALICE), 600);
        assert_eq!(token.balance_of(&POOL), 400);
        assert_eq!(token.allowance(&ALICE, &POOL), 200);
    }

    #[test]
    fn test_transfer_from_without_allowance() {
        let mut token = MemoryTokenLedger::new(TOKEN);
        token.mint(&ALICE, 1_000).expect("mint");
        let result = token.transfer_from(&POOL, &ALICE, &POOL, 1);
        assert_eq!(
            result,
            Err(TokenError::InsufficientAllowance {
                allowance: 0,
                required: 1
            })
        );
        assert_eq!(token.balance_of(&ALICE), 1_000);
    }

    #[test]
    fn test_transfer_from_insufficient_balance_keeps_allowance() {
        let mut token = MemoryTokenLedger::new(TOKEN);
        token.mint(&ALICE, 10).expect("mint");
        token.approve(&ALICE, &POOL, 100);
        let result = token.transfer_from(&POOL, &ALICE, &POOL, 50);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
        assert_eq!(token.allowance(&ALICE, &POOL), 100);
    }

    #[test]
    fn test_transfer() {
        let mut token = MemoryTokenLedger::new(TOKEN);
        token.mint(&POOL, 50).expect("mint");
        token.transfer(&POOL, &BOB, 20).expect("transfer");
        assert_eq!(token.balance_of(&POOL), 30);
        assert_eq!(token.balance_of(&BOB), 20);
        assert!(token.transfer(&POOL, &BOB, 31).is_err());
    }

    #[test]
    fn test_ledger_serde_roundtrip() {
        let mut token = MemoryTokenLedger::new(TOKEN);
        token.mint(&ALICE, 5).expect("mint");
        token.approve(&ALICE, &POOL, 3);
        let json = serde_json::to_string(&token).expect("serialize");
        let back: MemoryTokenLedger = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, token);
        assert_eq!(back.token_address(), TOKEN);
    }
}
