mod common;

use common::*;
use luna_ledger::{BankKeeper, LedgerEvent, StakingKeeper, BONDED_POOL_NAME, NOT_BONDED_POOL_NAME};
use luna_types::*;
use luna_upgrades::{check_pool_invariant, unwind_account, CustodyPools};

#[test]
fn delegation_and_unbonding_entry_are_burned() {
    let mut ledger = staked_ledger("phoenix-1");
    let target = acc(1);
    ledger.fund_account(&target, &luna(150)).unwrap();
    ledger.delegate(&target, &val(0xB0), 150).unwrap();
    ledger
        .begin_unbonding(&target, &val(0xB0), Decimal::from(50))
        .unwrap();

    // A second delegator keeps the validator alive.
    ledger.fund_account(&acc(2), &luna(400)).unwrap();
    ledger.delegate(&acc(2), &val(0xB0), 400).unwrap();

    let pools_before = pool_total(&ledger);
    let shares_before = ledger.validator(&val(0xB0)).unwrap().delegator_shares;

    let report = unwind_account(&mut ledger, &CustodyPools::default(), &target).unwrap();

    assert_eq!(ledger.balance(&target, BOND_DENOM), 0);
    assert_eq!(pool_total(&ledger), pools_before - 150);
    assert_eq!(
        ledger.validator(&val(0xB0)).unwrap().delegator_shares,
        shares_before - Decimal::from(100)
    );
    assert_eq!(report.burned_from_bonded.amount_of(BOND_DENOM), 100);
    assert_eq!(report.burned_from_not_bonded.amount_of(BOND_DENOM), 50);
    assert_eq!(report.unbonding_entries_removed, 1);
    assert!(check_pool_invariant(&ledger, &CustodyPools::default(), BOND_DENOM).is_ok());
}

#[test]
fn redelegation_entry_is_retired_without_pool_movement() {
    let mut ledger = staked_ledger("phoenix-1");
    let other = acc(9);
    ledger.fund_account(&other, &luna(60)).unwrap();
    ledger.delegate(&other, &val(0xB0), 60).unwrap();
    for _ in 0..6 {
        ledger
            .begin_unbonding(&other, &val(0xB0), Decimal::from(1))
            .unwrap();
    }

    let target = acc(1);
    ledger.create_validator(val(0xD0), BondStatus::Bonded, commission("0.1", "0.2")).unwrap();
    ledger.fund_account(&target, &luna(30)).unwrap();
    ledger.delegate(&target, &val(0xB0), 30).unwrap();
    let id = ledger
        .begin_redelegation(&target, &val(0xB0), &val(0xD0), Decimal::from(30))
        .unwrap();
    assert_eq!(id, 7);
    let red = &ledger.delegator_redelegations(&target)[0];
    assert_eq!(red.entries[0].initial_balance, 30);

    let pools_before = pool_total(&ledger);
    ledger.take_events();
    let report = unwind_account(&mut ledger, &CustodyPools::default(), &target).unwrap();

    assert!(ledger.delegator_redelegations(&target).is_empty());
    assert!(ledger.unbonding_ref(7).is_none());
    assert_eq!(report.redelegation_entries_removed, 1);
    // Only the destination delegation's stake leaves the pools.
    assert_eq!(pool_total(&ledger), pools_before - 30);
    assert!(!ledger
        .events()
        .iter()
        .any(|event| event.is_transfer()));
    assert!(ledger
        .events()
        .contains(&LedgerEvent::UnbondingIndexDeleted { id: 7 }));
    // The other delegator's entries are still indexed.
    for other_id in 1..=6 {
        assert!(ledger.unbonding_ref(other_id).is_some());
    }
}

#[test]
fn unwind_leaves_nothing_behind() {
    let mut ledger = staked_ledger("phoenix-1");
    let target = acc(1);
    ledger
        .fund_account(
            &target,
            &Coins::from_pairs([(BOND_DENOM, 1_000u128), ("uusd", 77), ("ibc/ABC", 3)]).unwrap(),
        )
        .unwrap();
    ledger.delegate(&target, &val(0xB0), 300).unwrap();
    ledger.delegate(&target, &val(0xC0), 200).unwrap();
    ledger
        .begin_unbonding(&target, &val(0xB0), Decimal::from(100))
        .unwrap();
    ledger
        .begin_unbonding(&target, &val(0xC0), Decimal::from(50))
        .unwrap();
    ledger.create_validator(val(0xD0), BondStatus::Bonded, commission("0.1", "0.2")).unwrap();
    ledger
        .begin_redelegation(&target, &val(0xB0), &val(0xD0), Decimal::from(100))
        .unwrap();
    ledger
        .accrue_rewards(&target, &val(0xB0), &Coins::single(Coin::new("uusd", 5)))
        .unwrap();

    let supply_before = ledger.supply(BOND_DENOM);
    let report = unwind_account(&mut ledger, &CustodyPools::default(), &target).unwrap();

    assert!(ledger.delegator_delegations(&target).is_empty());
    assert!(ledger.delegator_unbonding_delegations(&target).is_empty());
    assert!(ledger.delegator_redelegations(&target).is_empty());
    assert!(ledger.all_balances(&target).is_empty());
    assert_eq!(ledger.unbonding_index_len(), 0);
    assert_eq!(ledger.supply("uusd"), 0);
    assert_eq!(ledger.supply(BOND_DENOM), supply_before - 1_000);
    assert_eq!(report.total_burned().amount_of(BOND_DENOM), 1_000);
    assert_eq!(report.total_burned().amount_of("uusd"), 82);
    assert!(check_pool_invariant(&ledger, &CustodyPools::default(), BOND_DENOM).is_ok());
}

#[test]
fn non_bonded_stake_burns_from_not_bonded_pool() {
    let mut ledger = staked_ledger("phoenix-1");
    let target = acc(1);
    ledger.fund_account(&target, &luna(80)).unwrap();
    ledger.delegate(&target, &val(0xC0), 80).unwrap();

    let report = unwind_account(&mut ledger, &CustodyPools::default(), &target).unwrap();
    assert!(report.burned_from_bonded.is_empty());
    assert_eq!(report.burned_from_not_bonded.amount_of(BOND_DENOM), 80);
    // The unbonded validator lost its last shares and is gone.
    assert!(ledger.validator(&val(0xC0)).is_none());
    assert_eq!(pool_total(&ledger), 0);
}

#[test]
fn slashed_validator_burns_at_current_rate() {
    let mut ledger = staked_ledger("phoenix-1");
    let target = acc(1);
    ledger.fund_account(&target, &luna(500)).unwrap();
    ledger.delegate(&target, &val(0xB0), 500).unwrap();
    ledger.fund_account(&acc(2), &luna(500)).unwrap();
    ledger.delegate(&acc(2), &val(0xB0), 500).unwrap();
    ledger.slash_validator(&val(0xB0), dec("0.2")).unwrap();

    let report = unwind_account(&mut ledger, &CustodyPools::default(), &target).unwrap();
    assert_eq!(report.burned_from_bonded.amount_of(BOND_DENOM), 400);
    assert_eq!(ledger.validator(&val(0xB0)).unwrap().tokens, 400);
}

#[test]
fn large_slashed_stakes_unwind_exactly() {
    const STAKE: u128 = 200_000_000_000_000;
    let mut ledger = staked_ledger("phoenix-1");
    let target = acc(1);
    ledger.fund_account(&target, &luna(STAKE)).unwrap();
    ledger.delegate(&target, &val(0xB0), STAKE).unwrap();
    ledger.fund_account(&acc(2), &luna(STAKE)).unwrap();
    ledger.delegate(&acc(2), &val(0xB0), STAKE).unwrap();
    ledger.slash_validator(&val(0xB0), dec("0.1")).unwrap();

    let report = unwind_account(&mut ledger, &CustodyPools::default(), &target).unwrap();

    assert_eq!(report.burned_from_bonded.amount_of(BOND_DENOM), 180_000_000_000_000);
    let validator = ledger.validator(&val(0xB0)).unwrap();
    assert_eq!(validator.tokens, 180_000_000_000_000);
    assert_eq!(validator.delegator_shares, Decimal::from(STAKE as u64));
    assert!(check_pool_invariant(&ledger, &CustodyPools::default(), BOND_DENOM).is_ok());
}

#[test]
fn emptied_unbonding_entry_is_dropped_without_burning() {
    let mut ledger = staked_ledger("phoenix-1");
    let target = acc(1);
    ledger.fund_account(&target, &luna(100)).unwrap();
    ledger.delegate(&target, &val(0xB0), 100).unwrap();
    let id = ledger
        .begin_unbonding(&target, &val(0xB0), Decimal::from(40))
        .unwrap();
    ledger
        .slash_unbonding_delegation(&target, &val(0xB0), Decimal::ONE)
        .unwrap();
    assert_eq!(ledger.delegator_unbonding_delegations(&target)[0].entries[0].balance, 0);

    ledger.take_events();
    let report = unwind_account(&mut ledger, &CustodyPools::default(), &target).unwrap();

    assert_eq!(report.unbonding_entries_removed, 1);
    assert!(report.burned_from_not_bonded.is_empty());
    assert!(!ledger.events().iter().any(|event| matches!(
        event,
        LedgerEvent::Burn { module, .. } if module == NOT_BONDED_POOL_NAME
    )));
    assert!(ledger
        .events()
        .contains(&LedgerEvent::UnbondingIndexDeleted { id }));
    assert!(ledger.unbonding_ref(id).is_none());
    assert!(ledger.delegator_unbonding_delegations(&target).is_empty());
    assert_eq!(report.burned_from_bonded.amount_of(BOND_DENOM), 60);
}

#[test]
fn pool_follows_status_at_conversion_time() {
    let mut ledger = staked_ledger("phoenix-1");
    let target = acc(1);
    ledger.fund_account(&target, &luna(120)).unwrap();
    ledger.delegate(&target, &val(0xB0), 120).unwrap();
    ledger.fund_account(&acc(2), &luna(100)).unwrap();
    ledger.delegate(&acc(2), &val(0xB0), 100).unwrap();

    // Delegated while bonded, converted after the validator left the set.
    ledger
        .set_validator_status(&val(0xB0), BondStatus::Unbonding)
        .unwrap();
    let report = unwind_account(&mut ledger, &CustodyPools::default(), &target).unwrap();

    assert!(report.burned_from_bonded.is_empty());
    assert_eq!(report.burned_from_not_bonded.amount_of(BOND_DENOM), 120);
    assert_eq!(
        ledger.balance(&AccAddress::for_module(BONDED_POOL_NAME), BOND_DENOM),
        0
    );
    assert_eq!(
        ledger.balance(&AccAddress::for_module(NOT_BONDED_POOL_NAME), BOND_DENOM),
        100
    );
    assert!(check_pool_invariant(&ledger, &CustodyPools::default(), BOND_DENOM).is_ok());
}

#[test]
fn vesting_account_is_unwrapped_and_fully_burned() {
    let mut ledger = staked_ledger("phoenix-1");
    let target = acc(1);
    let start_time = ledger_time(&ledger);
    let end_time = start_time + chrono::Duration::days(720);
    ledger.create_account(Account::ContinuousVesting {
        vesting: BaseVestingAccount {
            base: BaseAccount::new(target.clone(), 77),
            original_vesting: luna(1_000),
            delegated_free: Coins::new(),
            delegated_vesting: Coins::new(),
            end_time,
        },
        start_time,
    });
    ledger.fund_account(&target, &luna(1_000)).unwrap();
    ledger.delegate(&target, &val(0xB0), 400).unwrap();

    let report = unwind_account(&mut ledger, &CustodyPools::default(), &target).unwrap();
    assert!(report.vesting_unwrapped);
    assert_eq!(report.liquid_burned.amount_of(BOND_DENOM), 600);

    let account = luna_ledger::AccountKeeper::account(&ledger, &target).unwrap();
    assert!(!account.is_vesting());
    assert_eq!(account.base().account_number, 77);
    assert_eq!(ledger.supply(BOND_DENOM), 0);
}

fn ledger_time(ledger: &luna_ledger::InMemoryLedger) -> chrono::DateTime<chrono::Utc> {
    luna_ledger::HeaderInfo::header(ledger).time
}
