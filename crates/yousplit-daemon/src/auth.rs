//! Caller identity for RPC connections.
//!
//! Every connection gets a [`Session`] holding a fresh random challenge. A
//! client proves control of an Ed25519 key by signing
//! `AUTH_CONTEXT || challenge` and calling `authenticate`; from then on every
//! mutating method on that connection acts as the address derived from the
//! key. Caller fields in request params are never consulted.
//!
//! The socket itself is created `0600`, so only the daemon's own user can
//! connect at all. The signature binds which pool identity that user acts as.

use ed25519_dalek::{Signature, VerifyingKey};
use rand::RngCore;
use yousplit_types::{Address, ADDRESS_LEN};

use crate::rpc::RpcError;

/// Domain separation prefix for signed challenges.
pub const AUTH_CONTEXT: &[u8] = b"yousplit-auth-v1:";

const ADDRESS_CONTEXT: &str = "YouSplit v1 caller address";

/// Pool address controlled by an Ed25519 public key.
///
/// `address = BLAKE3-derive_key(ADDRESS_CONTEXT, public_key)[:20]`
pub fn address_of(key: &VerifyingKey) -> Address {
    let digest = blake3::derive_key(ADDRESS_CONTEXT, key.as_bytes());
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(&digest[..ADDRESS_LEN]);
    Address(out)
}

/// The bytes a client signs to answer `challenge`.
pub fn challenge_message(challenge: &[u8; 32]) -> Vec<u8> {
    let mut message = Vec::with_capacity(AUTH_CONTEXT.len() + challenge.len());
    message.extend_from_slice(AUTH_CONTEXT);
    message.extend_from_slice(challenge);
    message
}

/// Per-connection authentication state.
#[derive(Debug)]
pub struct Session {
    challenge: [u8; 32],
    caller: Option<Address>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// An unauthenticated session with a fresh challenge.
    pub fn new() -> Self {
        Self {
            challenge: fresh_challenge(),
            caller: None,
        }
    }

    /// The challenge the next `authenticate` call must sign.
    pub fn challenge(&self) -> &[u8; 32] {
        &self.challenge
    }

    /// The authenticated caller.
    ///
    /// # Errors
    ///
    /// `UNAUTHENTICATED` until `authenticate` has succeeded.
    pub fn caller(&self) -> Result<Address, RpcError> {
        self.caller
            .ok_or_else(|| RpcError::unauthenticated("authenticate before calling this method"))
    }

    /// Verify `signature` over the current challenge and bind the session to
    /// the key's address. The challenge rotates either way, so a signature
    /// is good for one attempt.
    pub fn authenticate(
        &mut self,
        public_key: &VerifyingKey,
        signature: &Signature,
    ) -> Result<Address, RpcError> {
        let message = challenge_message(&self.challenge);
        self.challenge = fresh_challenge();
        public_key
            .verify_strict(&message, signature)
            .map_err(|_| RpcError::unauthenticated("signature does not match challenge"))?;
        let address = address_of(public_key);
        self.caller = Some(address);
        tracing::info!(%address, "session authenticated");
        Ok(address)
    }
}

fn fresh_challenge() -> [u8; 32] {
    let mut challenge = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut challenge);
    challenge
}
