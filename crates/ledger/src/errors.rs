//! Error types for the ledger primitives

use luna_types::{AccAddress, CoinError, Decimal, ModulePermission, ValAddress};
use thiserror::Error;

/// Errors that can occur while reading or mutating ledger state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("account {0} not found")]
    AccountNotFound(AccAddress),

    #[error("module account {0} does not exist")]
    UnknownModule(String),

    #[error("insufficient funds on {address}: {available}{denom} available, {requested}{denom} requested")]
    InsufficientFunds {
        address: AccAddress,
        denom: String,
        available: u128,
        requested: u128,
    },

    #[error("{requested}{denom} on {address} is locked by a vesting schedule")]
    LockedFunds {
        address: AccAddress,
        denom: String,
        requested: u128,
    },

    #[error("validator {0} does not exist")]
    UnknownValidator(ValAddress),

    #[error("no delegation from {delegator} to {validator}")]
    DelegationNotFound {
        delegator: AccAddress,
        validator: ValAddress,
    },

    #[error("insufficient shares: {available} available, {requested} requested")]
    InsufficientShares {
        available: Decimal,
        requested: Decimal,
    },

    #[error("module {module} lacks the {permission:?} permission")]
    MissingPermission {
        module: String,
        permission: ModulePermission,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid staking parameter: {0}")]
    InvalidParams(String),

    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    #[error(transparent)]
    Coin(#[from] CoinError),
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
