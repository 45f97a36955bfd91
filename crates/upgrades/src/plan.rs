//! Migration plans and the steps they are made of.

use crate::asset_burn::{burn_community_pool_filtered, burn_filtered, DenomAllowList};
use crate::commission::{
    enforce_commission_floor, set_min_commission_param, CommissionFloor, CommissionReport,
};
use crate::custody::CustodyPools;
use crate::errors::{MigrationError, Result};
use crate::unwind::{unwind_account, UnwindReport};
use luna_ledger::Ledger;
use luna_types::{AccAddress, Coins, VersionMap};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One state transition of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum MigrationStep {
    /// Raise commissions to the floor and record it as the staking minimum.
    EnforceCommissionFloor { floor: CommissionFloor },
    UnwindAndBurn { accounts: Vec<AccAddress> },
    BurnCommunityPool { allowlist: DenomAllowList },
    BurnFromAccount {
        account: AccAddress,
        allowlist: DenomAllowList,
    },
    /// Seed the stored version of a module added by this upgrade so the
    /// module runner does not run its genesis initialisation.
    AdoptModuleVersion { module: String },
}

impl MigrationStep {
    pub fn name(&self) -> &'static str {
        match self {
            MigrationStep::EnforceCommissionFloor { .. } => "enforce_commission_floor",
            MigrationStep::UnwindAndBurn { .. } => "unwind_and_burn",
            MigrationStep::BurnCommunityPool { .. } => "burn_community_pool",
            MigrationStep::BurnFromAccount { .. } => "burn_from_account",
            MigrationStep::AdoptModuleVersion { .. } => "adopt_module_version",
        }
    }

    /// Whether the step moves staked tokens out of the custody pools.
    pub fn touches_stake(&self) -> bool {
        matches!(self, MigrationStep::UnwindAndBurn { .. })
    }
}

/// Result of one executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepReport {
    CommissionFloor(CommissionReport),
    Unwind { accounts: Vec<UnwindReport> },
    CommunityPoolBurn { burned: Coins },
    AccountBurn { account: AccAddress, burned: Coins },
    ModuleAdopted { module: String, version: u64 },
}

impl StepReport {
    /// Coins this step destroyed.
    pub fn burned(&self) -> Coins {
        match self {
            StepReport::Unwind { accounts } => accounts
                .iter()
                .flat_map(UnwindReport::total_burned)
                .collect(),
            StepReport::CommunityPoolBurn { burned } | StepReport::AccountBurn { burned, .. } => {
                burned.clone()
            }
            StepReport::CommissionFloor(_) | StepReport::ModuleAdopted { .. } => Coins::new(),
        }
    }

    /// Coins burned straight out of the staking custody pools.
    pub(crate) fn custodied_burned(&self) -> Coins {
        match self {
            StepReport::Unwind { accounts } => accounts
                .iter()
                .flat_map(UnwindReport::custodied_burned)
                .collect(),
            _ => Coins::new(),
        }
    }
}

/// Everything a plan did, as returned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanReport {
    pub plan: String,
    pub height: u64,
    pub chain_id: String,
    pub steps: Vec<StepReport>,
    /// Module versions after the host's module migrations ran.
    pub version_map: VersionMap,
}

impl PlanReport {
    pub fn total_burned(&self) -> Coins {
        self.steps.iter().flat_map(StepReport::burned).collect()
    }
}

/// A named upgrade handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub name: String,
    /// Module versions this plan brings the chain to. Empty when the plan
    /// only changes state.
    #[serde(default)]
    pub targets: VersionMap,
    #[serde(default)]
    pub steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            targets: VersionMap::new(),
            steps: Vec::new(),
        }
    }

    pub fn with_target(mut self, module: impl Into<String>, version: u64) -> Self {
        self.targets.insert(module.into(), version);
        self
    }

    pub fn with_step(mut self, step: MigrationStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn touches_stake(&self) -> bool {
        self.steps.iter().any(MigrationStep::touches_stake)
    }

    /// Run every step in order against `ledger`, updating `versions` for
    /// adopted modules. `current` holds the binary's module versions.
    pub(crate) fn execute_steps<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        pools: &CustodyPools,
        versions: &mut VersionMap,
        current: &VersionMap,
    ) -> Result<Vec<StepReport>> {
        let mut reports = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            info!(target: "upgrades", plan = %self.name, index, step = step.name(), "running step");
            let report = match step {
                MigrationStep::EnforceCommissionFloor { floor } => {
                    set_min_commission_param(ledger, *floor)?;
                    StepReport::CommissionFloor(enforce_commission_floor(ledger, *floor))
                }
                MigrationStep::UnwindAndBurn { accounts } => {
                    let mut unwound = Vec::with_capacity(accounts.len());
                    for account in accounts {
                        unwound.push(unwind_account(ledger, pools, account)?);
                    }
                    StepReport::Unwind { accounts: unwound }
                }
                MigrationStep::BurnCommunityPool { allowlist } => StepReport::CommunityPoolBurn {
                    burned: burn_community_pool_filtered(ledger, pools, allowlist)?,
                },
                MigrationStep::BurnFromAccount { account, allowlist } => StepReport::AccountBurn {
                    account: account.clone(),
                    burned: burn_filtered(ledger, pools, account, allowlist)?,
                },
                MigrationStep::AdoptModuleVersion { module } => {
                    let version = current.get(module).copied().ok_or_else(|| {
                        MigrationError::InvalidParameter(format!(
                            "module {module} is not registered with the runner"
                        ))
                    })?;
                    versions.insert(module.clone(), version);
                    StepReport::ModuleAdopted {
                        module: module.clone(),
                        version,
                    }
                }
            };
            reports.push(report);
        }
        Ok(reports)
    }
}
