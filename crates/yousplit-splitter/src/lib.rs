//! # yousplit-splitter
//!
//! Basis-point revenue splitting over a shared pool.
//!
//! Funds arrive in two independent asset classes (native value and an
//! onramped stable token) and accumulate in cumulative-deposit counters.
//! Each beneficiary's entitlement is derived on demand from its share and
//! the cumulative deposits, so claims stay exactly-once as shares,
//! eligibility and deposits change.
//!
//! ## Modules
//!
//! - [`access`]: Owner gate for administrative operations
//! - [`registry`]: Beneficiary records and the share-sum invariant
//! - [`ledger`]: Dual cumulative-deposit ledger
//! - [`onramp`]: Pulling stable-token royalties into the pool
//! - [`withdraw`]: Entitlement math and settlement
//! - [`token`]: Stable-token ledger interface and in-memory ledger
//! - [`pool`]: The [`Splitter`] aggregate and its query surface
//! - [`snapshot`]: Export and validated restore of pool state

pub mod access;
pub mod ledger;
pub mod onramp;
pub mod pool;
pub mod registry;
pub mod snapshot;
pub mod token;
pub mod withdraw;

pub use pool::{PoolParams, Splitter};
pub use withdraw::{NativeTransfer, TransferError};

use yousplit_types::Bps;

/// Error types for pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SplitterError {
    /// Caller is not the pool owner.
    #[error("caller is not the owner")]
    NotOwner,

    /// Caller is not a registered, eligible beneficiary.
    #[error("you are not eligible to withdraw")]
    NotEligible,

    /// Address is not a registered beneficiary.
    #[error("unknown beneficiary")]
    UnknownBeneficiary,

    /// Withdrawable amount is zero.
    #[error("nothing to withdraw")]
    NothingToWithdraw,

    /// Share update would break the share-sum invariant.
    #[error("invalid share allocation: {0}")]
    InvalidShareAllocation(String),

    /// An outbound or inbound value transfer did not complete.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// Beneficiary and share sequences differ in length.
    #[error("mismatched input: {beneficiaries} beneficiaries, {shares} shares")]
    MismatchedInput {
        /// Number of beneficiary addresses supplied.
        beneficiaries: usize,
        /// Number of shares supplied.
        shares: usize,
    },

    /// The same address was supplied twice at construction.
    #[error("duplicate beneficiary {0}")]
    DuplicateBeneficiary(String),

    /// Stable operation on a pool constructed without a stable token.
    #[error("no stable token configured")]
    StableTokenNotConfigured,

    /// Arithmetic overflow in a ledger counter.
    #[error("arithmetic overflow")]
    Overflow,

    /// Persisted state violates a pool invariant.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

impl SplitterError {
    pub(crate) fn share_sum_exceeded(total: u64) -> Self {
        SplitterError::InvalidShareAllocation(format!(
            "active shares would total {total} bps, limit is {}",
            yousplit_types::BPS_DENOMINATOR
        ))
    }

    pub(crate) fn share_out_of_range(share_bps: Bps) -> Self {
        SplitterError::InvalidShareAllocation(format!(
            "share {share_bps} bps exceeds {}",
            yousplit_types::BPS_DENOMINATOR
        ))
    }
}

/// Convenience result type for pool operations.
pub type Result<T> = std::result::Result<T, SplitterError>;
