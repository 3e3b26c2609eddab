//! # yousplit-types
//!
//! Shared domain types used across the YouSplit workspace: account
//! identities, asset classes, basis-point constants, and the read-only
//! query views consumed by the presentation layer.

pub mod beneficiary;
pub mod events;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Smallest transferable unit of either asset class.
pub type Amount = u128;

/// Basis points, where [`BPS_DENOMINATOR`] equals 100%.
pub type Bps = u32;

/// The whole of a share table, in basis points.
pub const BPS_DENOMINATOR: Bps = 10_000;

/// Share reserved for the owner at construction (5%).
pub const DEFAULT_OWNER_SHARE_BPS: Bps = 500;

/// Length of an account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account identity.
///
/// Displayed, parsed and serialized as `0x`-prefixed lowercase hex. Parsing
/// also accepts bare hex.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Build an address whose every byte is `byte`. Handy for fixtures.
    pub const fn repeat(byte: u8) -> Self {
        Address([byte; ADDRESS_LEN])
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Error returned when parsing an [`Address`] from text.
#[derive(Debug, thiserror::Error)]
pub enum AddressParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid address length: expected {ADDRESS_LEN} bytes, got {0}")]
    Length(usize),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(trimmed)?;
        let len = bytes.len();
        let array: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressParseError::Length(len))?;
        Ok(Address(array))
    }
}

/// The two independent asset classes held by a pool.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ts_rs::TS,
)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    /// The host platform's directly transferable value.
    Native,
    /// Units of the external stable-token ledger.
    Stable,
}

impl Asset {
    pub const ALL: [Asset; 2] = [Asset::Native, Asset::Stable];

    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Native => "native",
            Asset::Stable => "stable",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Asset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Asset::Native),
            "stable" => Ok(Asset::Stable),
            other => Err(format!("unknown asset '{other}'")),
        }
    }
}
