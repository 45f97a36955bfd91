//! Audit log of ledger mutations.
//!
//! Every transfer, mint, burn, and index mutation performed through the
//! in-memory ledger is appended here, so tests and the dry-run report can
//! account for exactly which movements a migration produced.

use luna_types::{AccAddress, Coins, Shares, UnbondingId, ValAddress};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    Transfer {
        from: AccAddress,
        to: AccAddress,
        amount: Coins,
    },
    Mint {
        module: String,
        amount: Coins,
    },
    Burn {
        module: String,
        amount: Coins,
    },
    AccountSet {
        address: AccAddress,
    },
    RewardsWithdrawn {
        delegator: AccAddress,
        validator: ValAddress,
        amount: Coins,
    },
    Unbonded {
        delegator: AccAddress,
        validator: ValAddress,
        shares: Shares,
        tokens: u128,
    },
    UnbondingIndexDeleted {
        id: UnbondingId,
    },
    ValidatorModified {
        operator: ValAddress,
    },
}

impl LedgerEvent {
    pub fn is_transfer(&self) -> bool {
        matches!(self, LedgerEvent::Transfer { .. })
    }

    pub fn is_burn(&self) -> bool {
        matches!(self, LedgerEvent::Burn { .. })
    }
}
