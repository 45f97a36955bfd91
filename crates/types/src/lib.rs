//! Luna ledger data model
//!
//! Shared types for the ledger primitives and the network upgrade handlers:
//! - Addresses (accounts, validators, module accounts)
//! - Coins and decimal coins with checked arithmetic
//! - Validators, delegations, unbonding delegations, redelegations
//! - Accounts, including continuous, delayed, and periodic vesting
//! - Block header and module version maps
//!
//! Every collection that is iterated during state transitions is ordered, so
//! two nodes walking the same state visit records in the same order.

pub mod account;
pub mod address;
pub mod chain;
pub mod coin;
pub mod math;
pub mod staking;

pub use account::*;
pub use address::*;
pub use chain::*;
pub use coin::*;
pub use staking::*;

/// Re-exported so downstream crates agree on the decimal type.
pub use rust_decimal::Decimal;
