//! Owner gate for administrative operations.
//!
//! The owner is fixed when the pool is constructed. There is no transfer
//! of ownership.

use serde::{Deserialize, Serialize};
use yousplit_types::Address;

use crate::{Result, SplitterError};

/// Holds the single immutable owner identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessController {
    owner: Address,
}

impl AccessController {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Fail with [`SplitterError::NotOwner`] unless `caller` is the owner.
    pub fn require_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            tracing::warn!(%caller, "rejected administrative call from non-owner");
            return Err(SplitterError::NotOwner);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_passes() {
        let owner = Address::repeat(0x0a);
        let access = AccessController::new(owner);
        access.require_owner(&owner).expect("owner allowed");
        assert_eq!(access.owner(), owner);
    }

    #[test]
    fn test_non_owner_rejected() {
        let access = AccessController::new(Address::repeat(0x0a));
        let result = access.require_owner(&Address::repeat(0x0b));
        assert_eq!(result, Err(SplitterError::NotOwner));
    }
}
