//! Luna network upgrade handlers
//!
//! One-shot state migrations executed at coordinated upgrade heights:
//! - Stake unwind: dissolve an account's delegations, unbonding entries, and
//!   redelegations without the unbonding window, then burn its balances
//! - Custody pool burns: every burn passes through a staking pool module
//!   account holding the `Burner` permission
//! - Commission floor: raise every validator's commission to a minimum
//! - Selective asset burn from accounts and the community pool
//! - Orchestrator: schedules plans, runs each atomically, hands off to the
//!   host's module migrations
//!
//! Everything here is deterministic: ordered iteration, integer and
//! fixed-point decimal arithmetic only.

pub mod asset_burn;
pub mod commission;
pub mod custody;
pub mod errors;
pub mod networks;
pub mod orchestrator;
pub mod plan;
pub mod registry;
pub mod unwind;

pub use asset_burn::{burn_community_pool_filtered, burn_filtered, DenomAllowList};
pub use commission::{
    enforce_commission_floor, set_min_commission_param, CommissionFloor, CommissionReport,
};
pub use custody::{check_pool_invariant, CustodyPools, PoolBalances};
pub use errors::{MigrationError, Result};
pub use networks::{AssetBurnGate, NetworkOverrides, NetworkTable, UnwindGate};
pub use orchestrator::{ModuleMigrationRunner, Orchestrator, PlanState, StaticModuleRunner};
pub use plan::{MigrationPlan, MigrationStep, PlanReport, StepReport};
pub use registry::{find_plan, upgrade_plans, upgrade_plans_with};
pub use unwind::{unwind_account, UnwindReport};
