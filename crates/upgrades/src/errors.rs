//! Error types for network upgrade handlers

use luna_ledger::LedgerError;
use luna_types::{AccAddress, AddressError, CoinError, ValAddress};
use thiserror::Error;

/// Errors that abort a migration plan.
///
/// A plan that returns any of these commits nothing; the host halts the
/// chain at the upgrade height.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Target account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(AccAddress),

    /// Malformed address in a plan or network table
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// A transfer or burn exceeded the available balance
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// A subtraction would have produced a negative amount
    #[error("Negative result: {0}")]
    NegativeResult(String),

    #[error("Unknown validator: {0}")]
    UnknownValidator(ValAddress),

    /// Custody pool balances disagree with validator and unbonding records
    #[error("Pool invariant violated: {0}")]
    PoolInvariantViolation(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    /// Network table overrides could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host's module migrations failed
    #[error("Module migration failed: {0}")]
    ModuleMigration(String),

    /// Remaining ledger faults
    #[error("Ledger error: {0}")]
    Ledger(#[source] LedgerError),
}

impl From<LedgerError> for MigrationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(address) => MigrationError::AccountNotFound(address),
            LedgerError::UnknownValidator(operator) => MigrationError::UnknownValidator(operator),
            LedgerError::InsufficientFunds { .. } | LedgerError::LockedFunds { .. } => {
                MigrationError::InsufficientBalance(err.to_string())
            }
            LedgerError::InvalidParams(msg) => MigrationError::InvalidParameter(msg),
            LedgerError::Coin(CoinError::Negative { .. }) => {
                MigrationError::NegativeResult(err.to_string())
            }
            other => MigrationError::Ledger(other),
        }
    }
}

impl From<CoinError> for MigrationError {
    fn from(err: CoinError) -> Self {
        LedgerError::from(err).into()
    }
}

impl From<toml::de::Error> for MigrationError {
    fn from(err: toml::de::Error) -> Self {
        MigrationError::Config(err.to_string())
    }
}

/// Result type for migration operations
pub type Result<T> = std::result::Result<T, MigrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_map_to_migration_kinds() {
        let address = AccAddress::from_bytes(&[1; 20]).unwrap();
        let err: MigrationError = LedgerError::InsufficientFunds {
            address: address.clone(),
            denom: "uluna".into(),
            available: 1,
            requested: 2,
        }
        .into();
        assert!(matches!(err, MigrationError::InsufficientBalance(_)));

        let err: MigrationError = LedgerError::AccountNotFound(address).into();
        assert!(matches!(err, MigrationError::AccountNotFound(_)));

        let err: MigrationError = CoinError::Negative {
            denom: "uluna".into(),
        }
        .into();
        assert!(matches!(err, MigrationError::NegativeResult(_)));

        let err: MigrationError = LedgerError::UnknownModule("gov".into()).into();
        assert!(matches!(err, MigrationError::Ledger(LedgerError::UnknownModule(_))));
    }
}
