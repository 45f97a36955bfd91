//! Luna ledger primitives
//!
//! Keeper traits for the account, bank, staking, and distribution stores
//! that network upgrade handlers run against, plus [`InMemoryLedger`], a
//! deterministic reference store used by tests and the upgrade simulator.

pub mod distribution;
pub mod errors;
pub mod events;
pub mod keepers;
pub mod memory;
mod setup;
pub mod staking;

pub use distribution::FeePool;
pub use errors::{LedgerError, Result};
pub use events::LedgerEvent;
pub use keepers::{
    AccountKeeper, BankKeeper, DistributionKeeper, HeaderInfo, Ledger, StakingKeeper,
};
pub use memory::InMemoryLedger;

/// Custody pool for tokens delegated to bonded validators.
pub const BONDED_POOL_NAME: &str = "bonded_tokens_pool";
/// Custody pool for tokens of non-bonded validators and unbonding entries.
pub const NOT_BONDED_POOL_NAME: &str = "not_bonded_tokens_pool";
pub const DISTRIBUTION_MODULE_NAME: &str = "distribution";
pub const MINT_MODULE_NAME: &str = "mint";
