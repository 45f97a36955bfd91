//! Stake unwind engine.
//!
//! Dissolves every staking position of an account without waiting for the
//! unbonding window, then burns everything the account holds. Steps run in a
//! fixed order: delegations, unbonding entries, redelegation entries,
//! vesting unwrap, liquid balances.

use crate::custody::CustodyPools;
use crate::errors::{MigrationError, Result};
use luna_ledger::Ledger;
use luna_types::{AccAddress, BondStatus, Coin, Coins};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What an unwind removed and burned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnwindReport {
    pub account: AccAddress,
    pub delegations_unbonded: usize,
    pub rewards_withdrawn: Coins,
    /// Stake of bonded validators, burned from the bonded pool.
    pub burned_from_bonded: Coins,
    /// Stake of non-bonded validators and unbonding balances, burned from
    /// the not-bonded pool.
    pub burned_from_not_bonded: Coins,
    pub unbonding_entries_removed: usize,
    pub redelegation_entries_removed: usize,
    pub vesting_unwrapped: bool,
    pub liquid_burned: Coins,
}

impl UnwindReport {
    fn new(account: AccAddress) -> Self {
        Self {
            account,
            delegations_unbonded: 0,
            rewards_withdrawn: Coins::new(),
            burned_from_bonded: Coins::new(),
            burned_from_not_bonded: Coins::new(),
            unbonding_entries_removed: 0,
            redelegation_entries_removed: 0,
            vesting_unwrapped: false,
            liquid_burned: Coins::new(),
        }
    }

    /// Coins burned straight out of the custody pools.
    pub fn custodied_burned(&self) -> Coins {
        self.burned_from_bonded
            .iter()
            .chain(self.burned_from_not_bonded.iter())
            .collect()
    }

    /// Everything the unwind destroyed.
    pub fn total_burned(&self) -> Coins {
        self.custodied_burned()
            .iter()
            .chain(self.liquid_burned.iter())
            .collect()
    }
}

/// Unbond, unwind, and burn everything held by `account`.
///
/// Fails with [`MigrationError::AccountNotFound`] before touching any state
/// when the account does not exist. Any later error leaves the ledger
/// partially unwound; callers run this on a scratch copy.
pub fn unwind_account<L: Ledger + ?Sized>(
    ledger: &mut L,
    pools: &CustodyPools,
    account: &AccAddress,
) -> Result<UnwindReport> {
    if ledger.account(account).is_none() {
        return Err(MigrationError::AccountNotFound(account.clone()));
    }
    let bond_denom = ledger.staking_params().bond_denom;
    let mut report = UnwindReport::new(account.clone());

    unwind_delegations(ledger, pools, account, &bond_denom, &mut report)?;
    retire_unbonding_entries(ledger, pools, account, &bond_denom, &mut report)?;
    retire_redelegation_entries(ledger, account, &mut report);

    if let Some(stored) = ledger.account(account) {
        if stored.is_vesting() {
            debug!(target: "upgrades", account = %account, "unwrapping vesting account");
            ledger.set_account(stored.into_base());
            report.vesting_unwrapped = true;
        }
    }

    let liquid = ledger.all_balances(account);
    for coin in liquid.iter() {
        pools.burn_from_account(ledger, account, &Coins::single(coin))?;
    }
    report.liquid_burned = liquid;

    info!(
        target: "upgrades",
        account = %account,
        delegations = report.delegations_unbonded,
        unbonding_entries = report.unbonding_entries_removed,
        redelegation_entries = report.redelegation_entries_removed,
        burned = %report.total_burned(),
        "account unwound"
    );
    Ok(report)
}

fn unwind_delegations<L: Ledger + ?Sized>(
    ledger: &mut L,
    pools: &CustodyPools,
    account: &AccAddress,
    bond_denom: &str,
    report: &mut UnwindReport,
) -> Result<()> {
    for delegation in ledger.delegator_delegations(account) {
        let operator = &delegation.validator;
        let rewards = ledger.withdraw_delegation_rewards(account, operator)?;
        report.rewards_withdrawn = report.rewards_withdrawn.checked_add(&rewards)?;

        // The custodying pool is the one matching the status at conversion
        // time; the validator record may disappear once its last shares go.
        let status = ledger
            .validator(operator)
            .map(|v| v.status)
            .ok_or_else(|| MigrationError::UnknownValidator(operator.clone()))?;
        let tokens = ledger.unbond(account, operator, delegation.shares)?;
        let burned = Coins::single(Coin::new(bond_denom, tokens));
        pools.burn_custodied(ledger, pools.for_status(status), &burned)?;

        let bucket = if status == BondStatus::Bonded {
            &mut report.burned_from_bonded
        } else {
            &mut report.burned_from_not_bonded
        };
        *bucket = bucket.checked_add(&burned)?;
        report.delegations_unbonded += 1;

        debug!(
            target: "upgrades",
            validator = %operator,
            shares = %delegation.shares,
            tokens,
            ?status,
            "delegation unbonded and burned"
        );
    }
    Ok(())
}

fn retire_unbonding_entries<L: Ledger + ?Sized>(
    ledger: &mut L,
    pools: &CustodyPools,
    account: &AccAddress,
    bond_denom: &str,
    report: &mut UnwindReport,
) -> Result<()> {
    for mut ubd in ledger.delegator_unbonding_delegations(account) {
        let balance = ubd.total_balance();
        let entries = std::mem::take(&mut ubd.entries);
        for entry in &entries {
            ledger.delete_unbonding_index(entry.unbonding_id);
            if entry.balance > 0 {
                let burned = Coins::single(Coin::new(bond_denom, entry.balance));
                pools.burn_custodied(ledger, &pools.not_bonded, &burned)?;
                report.burned_from_not_bonded = report.burned_from_not_bonded.checked_add(&burned)?;
            }
        }
        report.unbonding_entries_removed += entries.len();

        // No entry survives, so the emptied record is dropped.
        ledger.remove_unbonding_delegation(&ubd.delegator, &ubd.validator);
        debug!(
            target: "upgrades",
            validator = %ubd.validator,
            entries = entries.len(),
            balance,
            "unbonding delegation retired"
        );
    }
    Ok(())
}

/// Redelegated tokens never leave the custody pools, so retiring a
/// redelegation only clears its records.
fn retire_redelegation_entries<L: Ledger + ?Sized>(
    ledger: &mut L,
    account: &AccAddress,
    report: &mut UnwindReport,
) {
    for mut red in ledger.delegator_redelegations(account) {
        let entries = std::mem::take(&mut red.entries);
        for entry in &entries {
            ledger.delete_unbonding_index(entry.unbonding_id);
        }
        report.redelegation_entries_removed += entries.len();
        ledger.remove_redelegation(&red.delegator, &red.validator_src, &red.validator_dst);
    }
}
