//! Dry-run of one upgrade plan against a ledger snapshot.

use anyhow::{Context, Result};
use luna_ledger::{HeaderInfo, InMemoryLedger, LedgerEvent};
use luna_types::VersionMap;
use luna_upgrades::{
    find_plan, CustodyPools, NetworkOverrides, Orchestrator, PlanReport, PlanState,
    StaticModuleRunner,
};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// What a simulated upgrade did.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub plan: String,
    pub chain_id: String,
    pub height: u64,
    pub state: PlanState,
    /// `None` when the stored versions already satisfied the plan's targets.
    pub report: Option<PlanReport>,
    /// Modules the runner migrated.
    pub migrated_modules: Vec<String>,
    pub events: Vec<LedgerEvent>,
}

/// Parameters of one simulation run.
#[derive(Debug, Clone, Default)]
pub struct Simulation {
    pub plan: String,
    pub chain_id: Option<String>,
    pub height: Option<u64>,
    pub overrides: NetworkOverrides,
    pub modules: VersionMap,
    pub stored_versions: VersionMap,
}

impl Simulation {
    /// Run the plan on `ledger` as if its upgrade height were reached at the
    /// snapshot's block.
    pub fn run(&self, ledger: &mut InMemoryLedger) -> Result<SimulationReport> {
        let mut header = ledger.header().clone();
        if let Some(chain_id) = &self.chain_id {
            header.chain_id = chain_id.clone();
        }
        if let Some(height) = self.height {
            header.height = height;
        }
        ledger.set_header(header.clone());
        // Events from before the snapshot are not part of this run.
        ledger.take_events();

        let plan = find_plan(&header.chain_id, &self.overrides, &self.plan)?;

        let mut orchestrator = Orchestrator::new(CustodyPools::default());
        orchestrator.register(plan)?;
        orchestrator.schedule(&self.plan, header.height)?;

        let mut runner = StaticModuleRunner::new(self.modules.clone());
        let report = orchestrator
            .begin_block(ledger, &mut runner, &self.stored_versions)
            .with_context(|| format!("upgrade {} failed", self.plan))?;

        let state = orchestrator.state(&self.plan).unwrap_or(PlanState::Registered);
        info!(
            target: "upgrade_sim",
            plan = %self.plan,
            chain_id = %header.chain_id,
            height = header.height,
            state = ?state,
            "simulation finished"
        );

        Ok(SimulationReport {
            plan: self.plan.clone(),
            chain_id: header.chain_id,
            height: header.height,
            state,
            report,
            migrated_modules: runner.last_migrated().to_vec(),
            events: ledger.take_events(),
        })
    }
}

pub fn load_ledger(path: &Path) -> Result<InMemoryLedger> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read ledger snapshot {}", path.display()))?;
    InMemoryLedger::from_json(&raw)
        .with_context(|| format!("failed to parse ledger snapshot {}", path.display()))
}

pub fn write_ledger(path: &Path, ledger: &InMemoryLedger) -> Result<()> {
    let json = ledger
        .to_json_pretty()
        .context("failed to serialize ledger")?;
    fs::write(path, json).with_context(|| format!("failed to write ledger {}", path.display()))
}

pub fn load_overrides(path: Option<&Path>) -> Result<NetworkOverrides> {
    match path {
        Some(path) => NetworkOverrides::load(path)
            .with_context(|| format!("failed to load network overrides {}", path.display())),
        None => Ok(NetworkOverrides::default()),
    }
}
