//! Pool events pushed from the hosting runtime to subscribers.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{Address, Amount, Asset, Bps};

/// A committed state change of a pool.
///
/// Amounts serialize as decimal strings.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PoolEvent {
    FundsReceived {
        #[ts(type = "string")]
        from: Address,
        #[serde_as(as = "DisplayFromStr")]
        #[ts(type = "string")]
        amount: Amount,
    },
    Withdrawn {
        #[ts(type = "string")]
        beneficiary: Address,
        asset: Asset,
        #[serde_as(as = "DisplayFromStr")]
        #[ts(type = "string")]
        amount: Amount,
    },
    BeneficiaryUpdated {
        #[ts(type = "string")]
        beneficiary: Address,
        share_bps: Bps,
        eligible: bool,
    },
    BeneficiaryRemoved {
        #[ts(type = "string")]
        beneficiary: Address,
    },
    RoyaltiesOnramped {
        #[serde_as(as = "DisplayFromStr")]
        #[ts(type = "string")]
        amount: Amount,
    },
}

impl PoolEvent {
    /// The `event_type` tag this event carries on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            PoolEvent::FundsReceived { .. } => "funds_received",
            PoolEvent::Withdrawn { .. } => "withdrawn",
            PoolEvent::BeneficiaryUpdated { .. } => "beneficiary_updated",
            PoolEvent::BeneficiaryRemoved { .. } => "beneficiary_removed",
            PoolEvent::RoyaltiesOnramped { .. } => "royalties_onramped",
        }
    }

    /// The beneficiary this event concerns, if any.
    pub fn beneficiary(&self) -> Option<Address> {
        match self {
            PoolEvent::Withdrawn { beneficiary, .. }
            | PoolEvent::BeneficiaryUpdated { beneficiary, .. }
            | PoolEvent::BeneficiaryRemoved { beneficiary } => Some(*beneficiary),
            PoolEvent::FundsReceived { .. } | PoolEvent::RoyaltiesOnramped { .. } => None,
        }
    }
}
