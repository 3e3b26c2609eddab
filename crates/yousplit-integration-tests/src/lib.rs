//! Shared fixtures for the cross-crate integration tests.
//!
//! The scenarios themselves live under `tests/`:
//! ```sh
//! cargo test -p yousplit-integration-tests
//! ```

use ed25519_dalek::{Signer, SigningKey};
use yousplit_daemon::auth::{address_of, challenge_message, Session};
use yousplit_splitter::{NativeTransfer, PoolParams, Splitter, TransferError};
use yousplit_types::{Address, Amount};

pub const OWNER: Address = Address::repeat(0x0a);
pub const POOL: Address = Address::repeat(0xee);
pub const TOKEN: Address = Address::repeat(0xcc);
pub const B1: Address = Address::repeat(0x01);
pub const B2: Address = Address::repeat(0x02);
pub const B3: Address = Address::repeat(0x03);
pub const STRANGER: Address = Address::repeat(0x99);

/// `[B1, B2]` at 475 bps each, native only.
pub fn native_pool() -> Splitter {
    Splitter::new(PoolParams::new(OWNER, POOL, vec![B1, B2], vec![475, 475]))
        .expect("construct native pool")
}

/// `[B1, B2]` at 475 bps each, with the stable token configured.
pub fn dual_pool() -> Splitter {
    Splitter::new(
        PoolParams::new(OWNER, POOL, vec![B1, B2], vec![475, 475]).with_stable_token(TOKEN),
    )
    .expect("construct dual pool")
}

/// Accepts every payout and remembers it.
#[derive(Debug, Default)]
pub struct Recorder {
    pub payouts: Vec<(Address, Amount)>,
}

impl Recorder {
    pub fn total_to(&self, to: &Address) -> Amount {
        self.payouts
            .iter()
            .filter(|(a, _)| a == to)
            .map(|(_, amount)| amount)
            .sum()
    }
}

impl NativeTransfer for Recorder {
    fn send(
        &mut self,
        _pool: &mut Splitter,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.payouts.push((*to, amount));
        Ok(())
    }
}

/// Rejects every payout.
pub struct Rejecting;

impl NativeTransfer for Rejecting {
    fn send(
        &mut self,
        _pool: &mut Splitter,
        _to: &Address,
        _amount: Amount,
    ) -> Result<(), TransferError> {
        Err(TransferError::new("recipient rejected value"))
    }
}

/// A daemon client identified by a deterministic Ed25519 key.
#[derive(Clone, Copy, Debug)]
pub struct Party(pub u8);

impl Party {
    pub fn key(self) -> SigningKey {
        SigningKey::from_bytes(&[self.0; 32])
    }

    pub fn address(self) -> Address {
        address_of(&self.key().verifying_key())
    }

    /// `0x`-prefixed address, as it appears on the wire.
    pub fn hex(self) -> String {
        self.address().to_string()
    }

    /// Sign `challenge` the way `authenticate` expects.
    pub fn answer(self, challenge: &[u8; 32]) -> ed25519_dalek::Signature {
        self.key().sign(&challenge_message(challenge))
    }

    /// A fresh connection session that completed the handshake.
    pub fn session(self) -> Session {
        let mut session = Session::new();
        let signature = self.answer(session.challenge());
        session
            .authenticate(&self.key().verifying_key(), &signature)
            .expect("authenticate");
        session
    }
}
