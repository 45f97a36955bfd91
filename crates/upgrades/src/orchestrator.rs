//! Migration orchestrator.
//!
//! Holds the registered plans, fires the one scheduled for the current
//! height, and makes each plan all-or-nothing: steps run on a scratch copy
//! of the ledger that replaces the live ledger only when every step, the
//! pool checks, and the host's module migrations succeed.

use crate::custody::{check_pool_invariant, CustodyPools};
use crate::errors::{MigrationError, Result};
use crate::plan::{MigrationPlan, PlanReport};
use luna_ledger::Ledger;
use luna_types::{modules_behind, VersionMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Host hook that runs per-module state migrations after a plan's own
/// steps.
pub trait ModuleMigrationRunner {
    /// Versions of the modules compiled into the running binary.
    fn current_versions(&self) -> VersionMap;

    /// Migrate every module whose stored version in `from` is behind, and
    /// return the resulting version map.
    fn run_migrations(&mut self, from: &VersionMap) -> Result<VersionMap>;
}

/// Runner that advances each module straight to its configured version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticModuleRunner {
    versions: VersionMap,
    /// Modules migrated by the most recent run, in name order.
    #[serde(skip)]
    last_migrated: Vec<String>,
}

impl StaticModuleRunner {
    pub fn new(versions: VersionMap) -> Self {
        Self {
            versions,
            last_migrated: Vec::new(),
        }
    }

    pub fn last_migrated(&self) -> &[String] {
        &self.last_migrated
    }
}

impl ModuleMigrationRunner for StaticModuleRunner {
    fn current_versions(&self) -> VersionMap {
        self.versions.clone()
    }

    fn run_migrations(&mut self, from: &VersionMap) -> Result<VersionMap> {
        let mut next = from.clone();
        self.last_migrated = modules_behind(from, &self.versions)
            .into_iter()
            .map(str::to_string)
            .collect();
        for module in &self.last_migrated {
            if let Some(version) = self.versions.get(module) {
                next.insert(module.clone(), *version);
            }
        }
        Ok(next)
    }
}

/// Lifecycle of a registered plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    Registered,
    Due,
    Running,
    Applied,
}

#[derive(Debug, Clone)]
struct PlanEntry {
    plan: MigrationPlan,
    state: PlanState,
    height: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    plans: BTreeMap<String, PlanEntry>,
    pools: CustodyPools,
}

impl Orchestrator {
    pub fn new(pools: CustodyPools) -> Self {
        Self {
            plans: BTreeMap::new(),
            pools,
        }
    }

    pub fn with_plans(
        pools: CustodyPools,
        plans: impl IntoIterator<Item = MigrationPlan>,
    ) -> Result<Self> {
        let mut orchestrator = Self::new(pools);
        for plan in plans {
            orchestrator.register(plan)?;
        }
        Ok(orchestrator)
    }

    pub fn register(&mut self, plan: MigrationPlan) -> Result<()> {
        if self.plans.contains_key(&plan.name) {
            return Err(MigrationError::InvalidParameter(format!(
                "plan {} is already registered",
                plan.name
            )));
        }
        self.plans.insert(
            plan.name.clone(),
            PlanEntry {
                plan,
                state: PlanState::Registered,
                height: None,
            },
        );
        Ok(())
    }

    /// Set the height at which `name` fires.
    pub fn schedule(&mut self, name: &str, height: u64) -> Result<()> {
        let entry = self
            .plans
            .get_mut(name)
            .ok_or_else(|| MigrationError::UnknownPlan(name.to_string()))?;
        if entry.state == PlanState::Applied {
            return Err(MigrationError::InvalidParameter(format!(
                "plan {name} has already been applied"
            )));
        }
        entry.height = Some(height);
        info!(target: "upgrades", plan = name, height, "plan scheduled");
        Ok(())
    }

    pub fn state(&self, name: &str) -> Option<PlanState> {
        self.plans.get(name).map(|entry| entry.state)
    }

    pub fn scheduled_height(&self, name: &str) -> Option<u64> {
        self.plans.get(name).and_then(|entry| entry.height)
    }

    pub fn plan(&self, name: &str) -> Option<&MigrationPlan> {
        self.plans.get(name).map(|entry| &entry.plan)
    }

    pub fn plan_names(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }

    /// Block hook: run the plan scheduled at or below the current height,
    /// if any.
    ///
    /// Returns `Ok(None)` when nothing is due. On error the live ledger is
    /// untouched, the plan stays `Due`, and the error is handed to the host.
    pub fn begin_block<L, R>(
        &mut self,
        ledger: &mut L,
        runner: &mut R,
        stored: &VersionMap,
    ) -> Result<Option<PlanReport>>
    where
        L: Ledger + Clone,
        R: ModuleMigrationRunner + ?Sized,
    {
        let height = ledger.header().height;
        let Some(name) = self.next_due(height) else {
            return Ok(None);
        };
        let Some(entry) = self.plans.get_mut(&name) else {
            return Ok(None);
        };

        if !entry.plan.targets.is_empty() && modules_behind(stored, &entry.plan.targets).is_empty()
        {
            warn!(
                target: "upgrades",
                plan = %name,
                "stored module versions already satisfy the plan; marking applied"
            );
            entry.state = PlanState::Applied;
            return Ok(None);
        }

        entry.state = PlanState::Running;
        let plan = entry.plan.clone();
        info!(target: "upgrades", plan = %name, height, chain_id = %ledger.header().chain_id, "applying upgrade");

        let mut scratch = ledger.clone();
        let outcome = run_plan(&plan, &self.pools, &mut scratch, runner, stored);

        let Some(entry) = self.plans.get_mut(&name) else {
            return Err(MigrationError::UnknownPlan(name));
        };
        match outcome {
            Ok(report) => {
                *ledger = scratch;
                entry.state = PlanState::Applied;
                info!(
                    target: "upgrades",
                    plan = %name,
                    burned = %report.total_burned(),
                    "upgrade applied"
                );
                Ok(Some(report))
            }
            Err(err) => {
                entry.state = PlanState::Due;
                error!(target: "upgrades", plan = %name, error = %err, "upgrade failed; state discarded");
                Err(err)
            }
        }
    }

    /// Lowest-scheduled plan that is reachable at `height` and not applied.
    /// Plans that become reachable are marked `Due`.
    fn next_due(&mut self, height: u64) -> Option<String> {
        let mut due: Vec<(u64, &String)> = Vec::new();
        for (name, entry) in self.plans.iter_mut() {
            let Some(at) = entry.height else { continue };
            if at > height || entry.state == PlanState::Applied {
                continue;
            }
            entry.state = PlanState::Due;
            due.push((at, name));
        }
        due.sort();
        due.first().map(|(_, name)| (*name).clone())
    }
}

fn run_plan<L, R>(
    plan: &MigrationPlan,
    pools: &CustodyPools,
    ledger: &mut L,
    runner: &mut R,
    stored: &VersionMap,
) -> Result<PlanReport>
where
    L: Ledger,
    R: ModuleMigrationRunner + ?Sized,
{
    let bond_denom = ledger.staking_params().bond_denom;
    let before = if plan.touches_stake() {
        Some(check_pool_invariant(ledger, pools, &bond_denom)?)
    } else {
        None
    };

    let mut versions = stored.clone();
    let steps = plan.execute_steps(ledger, pools, &mut versions, &runner.current_versions())?;

    if let Some(before) = before {
        let after = check_pool_invariant(ledger, pools, &bond_denom)?;
        let burned: u128 = steps
            .iter()
            .map(|step| step.custodied_burned().amount_of(&bond_denom))
            .fold(0u128, u128::saturating_add);
        after.expect_reduction(&before, burned)?;
    }

    let mut version_map = runner.run_migrations(&versions)?;
    // Targets the host runner does not know about (plan markers) are
    // recorded here so a restarted node never reapplies the plan.
    for (module, version) in &plan.targets {
        let recorded = version_map.entry(module.clone()).or_insert(*version);
        *recorded = (*recorded).max(*version);
    }
    let header = ledger.header();
    Ok(PlanReport {
        plan: plan.name.clone(),
        height: header.height,
        chain_id: header.chain_id.clone(),
        steps,
        version_map,
    })
}
