//! Read-only beneficiary views returned by the query surface.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Bps};

/// Stored fields of one beneficiary, as returned by `beneficiaries(address)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct BeneficiaryRecord {
    pub share_bps: Bps,
    pub withdrawn_native: Amount,
    pub eligible: bool,
}

/// Full per-beneficiary view including amounts computed on demand.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct BeneficiaryInfo {
    pub share_bps: Bps,
    pub withdrawn_native: Amount,
    pub withdrawn_stable: Amount,
    pub eligible: bool,
    /// Native amount withdrawable right now.
    pub eligible_amount: Amount,
    /// Stable amount withdrawable right now.
    pub stable_eligible_amount: Amount,
}

/// Parallel, insertion-ordered sequences describing every listed beneficiary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct BeneficiaryList {
    #[ts(type = "string[]")]
    pub addresses: Vec<Address>,
    pub shares: Vec<Bps>,
    pub withdrawn: Vec<Amount>,
    pub eligible: Vec<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_addresses_use_prefixed_hex() {
        let list = BeneficiaryList {
            addresses: vec![Address::repeat(1)],
            shares: vec![475],
            withdrawn: vec![10],
            eligible: vec![true],
        };
        let json = serde_json::to_value(&list).expect("serialize");
        assert_eq!(json["addresses"][0], format!("0x{}", "01".repeat(20)));
        assert_eq!(json["shares"][0], 475);
    }

    #[test]
    fn test_info_serializes_snake_case() {
        let info = BeneficiaryInfo {
            share_bps: 475,
            eligible: true,
            eligible_amount: 475,
            ..Default::default()
        };
        let json = serde_json::to_value(&info).expect("serialize");
        assert_eq!(json["share_bps"], 475);
        assert_eq!(json["eligible_amount"], 475);
        assert_eq!(json["withdrawn_stable"], 0);
    }
}
