mod common;

use common::*;
use luna_ledger::{BankKeeper, DistributionKeeper, HeaderInfo, InMemoryLedger, StakingKeeper};
use luna_types::*;
use luna_upgrades::registry::{
    plan_marker, LOCAL_TEST_CHAIN_ID, V2_10, V2_12, V2_13, V2_14, V2_3_0,
};
use luna_upgrades::*;

fn runner() -> StaticModuleRunner {
    StaticModuleRunner::new(
        [
            ("bank".to_string(), 4),
            ("staking".to_string(), 4),
            ("tokenfactory".to_string(), 3),
        ]
        .into_iter()
        .collect(),
    )
}

fn stored() -> VersionMap {
    [("bank".to_string(), 3), ("staking".to_string(), 4)]
        .into_iter()
        .collect()
}

fn at_height(ledger: &mut InMemoryLedger, height: u64) {
    let header = ledger.header().clone();
    ledger.set_header(BlockHeader::new(header.chain_id, height, header.time));
}

fn orchestrator(chain_id: &str) -> Orchestrator {
    Orchestrator::with_plans(CustodyPools::default(), upgrade_plans(chain_id).unwrap()).unwrap()
}

#[test]
fn nothing_runs_before_the_scheduled_height() {
    let mut ledger = staked_ledger(MAINNET_CHAIN_ID);
    let mut orch = orchestrator(MAINNET_CHAIN_ID);
    orch.schedule(V2_10, 2_000).unwrap();

    let outcome = orch.begin_block(&mut ledger, &mut runner(), &stored()).unwrap();
    assert!(outcome.is_none());
    assert_eq!(orch.state(V2_10), Some(PlanState::Registered));
}

#[test]
fn v2_12_on_mainnet_enforces_floor_and_burns_targets() {
    let mut ledger = staked_ledger(MAINNET_CHAIN_ID);
    let targets = registry::v2_12_networks()
        .unwrap()
        .resolve(MAINNET_CHAIN_ID)
        .accounts
        .clone();
    for target in &targets {
        ledger.fund_account(target, &luna(1_000)).unwrap();
        ledger.delegate(target, &val(0xB0), 600).unwrap();
        ledger
            .begin_unbonding(target, &val(0xB0), Decimal::from(100))
            .unwrap();
    }
    ledger.fund_account(&acc(5), &luna(250)).unwrap();
    ledger.delegate(&acc(5), &val(0xB0), 250).unwrap();

    let mut orch = orchestrator(MAINNET_CHAIN_ID);
    orch.schedule(V2_12, 1_000).unwrap();
    let mut runner = runner();

    let report = orch
        .begin_block(&mut ledger, &mut runner, &stored())
        .unwrap()
        .unwrap();

    assert_eq!(orch.state(V2_12), Some(PlanState::Applied));
    assert_eq!(report.total_burned().amount_of(BOND_DENOM), 2_000);
    assert_eq!(ledger.supply(BOND_DENOM), 250);
    for target in &targets {
        assert!(ledger.all_balances(target).is_empty());
        assert!(ledger.delegator_delegations(target).is_empty());
    }

    // 0xC0 started below the floor, 0xB0 above it.
    let low = ledger.validator(&val(0xC0)).unwrap().commission;
    assert_eq!(low.rate, dec("0.05"));
    assert_eq!(low.max_rate, dec("0.05"));
    assert_eq!(ledger.validator(&val(0xB0)).unwrap().commission.rate, dec("0.10"));
    assert_eq!(ledger.staking_params().min_commission_rate, dec("0.05"));

    assert_eq!(report.version_map.get("bank"), Some(&4));
    assert_eq!(runner.last_migrated(), &["bank".to_string(), "tokenfactory".to_string()]);
}

#[test]
fn plan_applies_at_most_once() {
    let mut ledger = staked_ledger(MAINNET_CHAIN_ID);
    let mut orch = orchestrator(MAINNET_CHAIN_ID);
    orch.schedule(V2_10, 1_000).unwrap();

    assert!(orch
        .begin_block(&mut ledger, &mut runner(), &stored())
        .unwrap()
        .is_some());
    at_height(&mut ledger, 1_001);
    assert!(orch
        .begin_block(&mut ledger, &mut runner(), &stored())
        .unwrap()
        .is_none());
    assert_eq!(orch.state(V2_10), Some(PlanState::Applied));
    assert!(orch.schedule(V2_10, 5_000).is_err());
}

#[test]
fn failed_plan_leaves_ledger_untouched() {
    let mut ledger = staked_ledger(MAINNET_CHAIN_ID);
    ledger.fund_account(&acc(1), &luna(100)).unwrap();
    ledger.delegate(&acc(1), &val(0xB0), 100).unwrap();
    let before = ledger.to_json_pretty().unwrap();

    let plan = MigrationPlan::new("broken")
        .with_step(MigrationStep::EnforceCommissionFloor {
            floor: CommissionFloor::new(dec("0.05")).unwrap(),
        })
        .with_step(MigrationStep::UnwindAndBurn {
            accounts: vec![acc(1), acc(2)],
        });
    let mut orch = Orchestrator::with_plans(CustodyPools::default(), [plan]).unwrap();
    orch.schedule("broken", 1_000).unwrap();

    let err = orch
        .begin_block(&mut ledger, &mut runner(), &stored())
        .unwrap_err();
    assert!(matches!(err, MigrationError::AccountNotFound(_)));
    assert_eq!(orch.state("broken"), Some(PlanState::Due));
    assert_eq!(ledger.to_json_pretty().unwrap(), before);
}

struct FailingRunner;

impl ModuleMigrationRunner for FailingRunner {
    fn current_versions(&self) -> VersionMap {
        VersionMap::new()
    }

    fn run_migrations(&mut self, _from: &VersionMap) -> luna_upgrades::Result<VersionMap> {
        Err(MigrationError::ModuleMigration("staking v5 migration failed".into()))
    }
}

#[test]
fn module_runner_failure_discards_plan_state() {
    let mut ledger = staked_ledger("columbus-5");
    let before = ledger.to_json_pretty().unwrap();
    let mut orch = orchestrator("columbus-5");
    orch.schedule(V2_12, 1_000).unwrap();

    let err = orch
        .begin_block(&mut ledger, &mut FailingRunner, &stored())
        .unwrap_err();
    assert!(matches!(err, MigrationError::ModuleMigration(_)));
    // The commission floor step ran on the scratch copy only.
    assert_eq!(ledger.to_json_pretty().unwrap(), before);
    assert_eq!(orch.state(V2_12), Some(PlanState::Due));
}

#[test]
fn unknown_network_changes_no_balances() {
    let mut ledger = staked_ledger("columbus-5");
    let recovery: AccAddress =
        "terra2b1f43b48b319cd775bd28bfd7b3db216d21d0556ac012e52299740f17866e47"
            .parse()
            .unwrap();
    let bridged = "ibc/B3504E092456BA618CC28AC671A71FB08C6CA0FD0BE7C8A5B5A3E2DD933CC9E4";
    ledger
        .fund_account(&recovery, &Coins::single(Coin::new(bridged, 500)))
        .unwrap();
    ledger
        .fund_community_pool(&Coins::single(Coin::new(bridged, 40)))
        .unwrap();

    let mut orch = orchestrator("columbus-5");
    orch.schedule(V2_13, 1_000).unwrap();
    orch.begin_block(&mut ledger, &mut runner(), &stored())
        .unwrap()
        .unwrap();

    assert_eq!(ledger.balance(&recovery, bridged), 500);
    assert_eq!(ledger.supply(bridged), 540);
    assert_eq!(orch.state(V2_13), Some(PlanState::Applied));
}

#[test]
fn v2_13_burns_bridged_assets_on_mainnet() {
    let mut ledger = staked_ledger(MAINNET_CHAIN_ID);
    let gate = registry::v2_13_networks()
        .unwrap()
        .resolve(MAINNET_CHAIN_ID)
        .clone();
    let recovery = gate.holder.clone().unwrap();
    let usdc = "ibc/B3504E092456BA618CC28AC671A71FB08C6CA0FD0BE7C8A5B5A3E2DD933CC9E4";
    ledger
        .fund_account(
            &recovery,
            &Coins::from_pairs([(usdc, 1_000u128), (BOND_DENOM, 10)]).unwrap(),
        )
        .unwrap();
    ledger
        .fund_community_pool(&Coins::from_pairs([(usdc, 300u128), (BOND_DENOM, 20)]).unwrap())
        .unwrap();

    let mut orch = orchestrator(MAINNET_CHAIN_ID);
    orch.schedule(V2_13, 1_000).unwrap();
    let report = orch
        .begin_block(&mut ledger, &mut runner(), &stored())
        .unwrap()
        .unwrap();

    assert_eq!(report.total_burned().amount_of(usdc), 1_300);
    assert_eq!(ledger.balance(&recovery, usdc), 0);
    assert_eq!(ledger.balance(&recovery, BOND_DENOM), 10);
    assert!(ledger.fee_pool().community_pool.amount_of(usdc).is_zero());
    assert_eq!(
        ledger.fee_pool().community_pool.amount_of(BOND_DENOM),
        Decimal::from(20)
    );
    assert_eq!(ledger.supply(usdc), 0);
}

#[test]
fn v2_14_local_gate_burns_test_asset() {
    let mut ledger = staked_ledger(LOCAL_TEST_CHAIN_ID);
    let gate = registry::v2_14_networks()
        .unwrap()
        .resolve(LOCAL_TEST_CHAIN_ID)
        .clone();
    let holder = gate.holder.clone().unwrap();
    let denom = gate.allowlist.iter().next().unwrap().to_string();
    ledger
        .fund_account(&holder, &Coins::single(Coin::new(denom.clone(), 42)))
        .unwrap();

    let mut orch = orchestrator(LOCAL_TEST_CHAIN_ID);
    orch.schedule(V2_14, 1_000).unwrap();
    orch.begin_block(&mut ledger, &mut runner(), &stored())
        .unwrap()
        .unwrap();
    assert_eq!(ledger.balance(&holder, &denom), 0);
}

#[test]
fn restarted_node_does_not_reapply_recorded_plan() {
    let mut ledger = staked_ledger(LOCAL_TEST_CHAIN_ID);
    let gate = registry::v2_14_networks()
        .unwrap()
        .resolve(LOCAL_TEST_CHAIN_ID)
        .clone();
    let holder = gate.holder.clone().unwrap();
    let denom = gate.allowlist.iter().next().unwrap().to_string();
    ledger
        .fund_account(&holder, &Coins::single(Coin::new(denom.clone(), 42)))
        .unwrap();

    let mut orch = orchestrator(LOCAL_TEST_CHAIN_ID);
    orch.schedule(V2_14, 1_000).unwrap();
    let first = orch
        .begin_block(&mut ledger, &mut runner(), &stored())
        .unwrap()
        .unwrap();
    assert_eq!(first.version_map.get(&plan_marker(V2_14)), Some(&1));

    // Fresh deposit after the upgrade; a new process registers every plan
    // again and hands in the recorded version map.
    ledger
        .fund_account(&holder, &Coins::single(Coin::new(denom.clone(), 5)))
        .unwrap();
    at_height(&mut ledger, 1_001);
    let mut restarted = orchestrator(LOCAL_TEST_CHAIN_ID);
    restarted.schedule(V2_14, 1_000).unwrap();

    let second = restarted
        .begin_block(&mut ledger, &mut runner(), &first.version_map)
        .unwrap();
    assert!(second.is_none());
    assert_eq!(restarted.state(V2_14), Some(PlanState::Applied));
    assert_eq!(ledger.balance(&holder, &denom), 5);
}

#[test]
fn adopted_module_is_not_migrated_by_runner() {
    let mut ledger = staked_ledger(MAINNET_CHAIN_ID);
    let mut orch = orchestrator(MAINNET_CHAIN_ID);
    orch.schedule(V2_3_0, 1_000).unwrap();
    let mut runner = runner();

    let report = orch
        .begin_block(&mut ledger, &mut runner, &stored())
        .unwrap()
        .unwrap();
    assert_eq!(report.version_map.get("tokenfactory"), Some(&3));
    assert_eq!(runner.last_migrated(), &["bank".to_string()]);
}

#[test]
fn satisfied_targets_mark_plan_applied_without_running() {
    let mut ledger = staked_ledger(MAINNET_CHAIN_ID);
    ledger.fund_account(&acc(1), &luna(10)).unwrap();
    let plan = MigrationPlan::new("already")
        .with_target("staking", 4)
        .with_step(MigrationStep::UnwindAndBurn {
            accounts: vec![acc(1)],
        });
    let mut orch = Orchestrator::with_plans(CustodyPools::default(), [plan]).unwrap();
    orch.schedule("already", 1_000).unwrap();

    assert!(orch
        .begin_block(&mut ledger, &mut runner(), &stored())
        .unwrap()
        .is_none());
    assert_eq!(orch.state("already"), Some(PlanState::Applied));
    assert_eq!(ledger.balance(&acc(1), BOND_DENOM), 10);
}

#[test]
fn earliest_due_plan_runs_first() {
    let mut ledger = staked_ledger(MAINNET_CHAIN_ID);
    let mut orch = orchestrator(MAINNET_CHAIN_ID);
    orch.schedule(V2_14, 900).unwrap();
    orch.schedule(V2_10, 950).unwrap();

    let first = orch
        .begin_block(&mut ledger, &mut runner(), &stored())
        .unwrap()
        .unwrap();
    assert_eq!(first.plan, V2_14);
    assert_eq!(orch.state(V2_10), Some(PlanState::Due));

    let second = orch
        .begin_block(&mut ledger, &mut runner(), &stored())
        .unwrap()
        .unwrap();
    assert_eq!(second.plan, V2_10);
}

#[test]
fn scheduling_unknown_plan_fails() {
    let mut orch = orchestrator(MAINNET_CHAIN_ID);
    assert!(matches!(
        orch.schedule("v0.0", 1),
        Err(MigrationError::UnknownPlan(_))
    ));
    assert!(matches!(
        Orchestrator::with_plans(
            CustodyPools::default(),
            [MigrationPlan::new("x"), MigrationPlan::new("x")]
        ),
        Err(MigrationError::InvalidParameter(_))
    ));
}
