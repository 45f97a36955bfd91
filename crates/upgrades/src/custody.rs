//! Custody pools and the burn protocol.
//!
//! Staked tokens never sit on the delegator's account: bonded validators'
//! tokens are held by the bonded pool, while tokens of non-bonded
//! validators and of unbonding entries are held by the not-bonded pool.
//! Only module accounts with the `Burner` permission can destroy coins, so
//! every burn is "move into a pool, then burn from the pool".

use crate::errors::{MigrationError, Result};
use luna_ledger::{Ledger, BONDED_POOL_NAME, NOT_BONDED_POOL_NAME};
use luna_types::{AccAddress, BondStatus, Coins};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Handles to the two staking custody pools.
///
/// Passed explicitly to every operation that moves stake, so tests can
/// substitute their own module accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyPools {
    pub bonded: String,
    pub not_bonded: String,
}

impl Default for CustodyPools {
    fn default() -> Self {
        Self {
            bonded: BONDED_POOL_NAME.to_string(),
            not_bonded: NOT_BONDED_POOL_NAME.to_string(),
        }
    }
}

impl CustodyPools {
    pub fn new(bonded: impl Into<String>, not_bonded: impl Into<String>) -> Self {
        Self {
            bonded: bonded.into(),
            not_bonded: not_bonded.into(),
        }
    }

    /// Pool holding the tokens of a validator in `status`.
    pub fn for_status(&self, status: BondStatus) -> &str {
        match status {
            BondStatus::Bonded => &self.bonded,
            BondStatus::Unbonding | BondStatus::Unbonded => &self.not_bonded,
        }
    }

    /// Move `coins` from a plain account into the not-bonded pool and burn
    /// them there.
    pub fn burn_from_account<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        account: &AccAddress,
        coins: &Coins,
    ) -> Result<()> {
        ledger.send_coins_from_account_to_module(account, &self.not_bonded, coins)?;
        ledger.burn_coins(&self.not_bonded, coins)?;
        debug!(target: "upgrades", account = %account, amount = %coins, "burned from account");
        Ok(())
    }

    /// Move `coins` from another module account into the not-bonded pool
    /// and burn them there.
    pub fn burn_from_module<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        module: &str,
        coins: &Coins,
    ) -> Result<()> {
        ledger.send_coins_from_module_to_module(module, &self.not_bonded, coins)?;
        ledger.burn_coins(&self.not_bonded, coins)?;
        debug!(target: "upgrades", module, amount = %coins, "burned from module");
        Ok(())
    }

    /// Burn value already custodied by `pool`.
    pub fn burn_custodied<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        pool: &str,
        coins: &Coins,
    ) -> Result<()> {
        if pool != self.bonded && pool != self.not_bonded {
            return Err(MigrationError::InvalidParameter(format!(
                "{pool} is not a custody pool"
            )));
        }
        ledger.burn_coins(pool, coins)?;
        debug!(target: "upgrades", pool, amount = %coins, "burned custodied stake");
        Ok(())
    }
}

/// Pool balances of one denomination at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolBalances {
    pub bonded: u128,
    pub not_bonded: u128,
}

impl PoolBalances {
    pub fn snapshot<L: Ledger + ?Sized>(ledger: &L, pools: &CustodyPools, denom: &str) -> Self {
        Self {
            bonded: ledger.balance(&ledger.module_address(&pools.bonded), denom),
            not_bonded: ledger.balance(&ledger.module_address(&pools.not_bonded), denom),
        }
    }

    pub fn total(&self) -> u128 {
        self.bonded.saturating_add(self.not_bonded)
    }

    /// Check that the pools shrank by exactly `burned` between `before` and
    /// `self`.
    pub fn expect_reduction(&self, before: &PoolBalances, burned: u128) -> Result<()> {
        let expected = before.total().checked_sub(burned).ok_or_else(|| {
            MigrationError::PoolInvariantViolation(format!(
                "burned {burned} but the pools only held {}",
                before.total()
            ))
        })?;
        if self.total() != expected {
            error!(
                target: "upgrades",
                before = before.total(),
                after = self.total(),
                burned,
                "custody pools leaked"
            );
            return Err(MigrationError::PoolInvariantViolation(format!(
                "pool total {} after burning {burned}, expected {expected}",
                self.total()
            )));
        }
        Ok(())
    }
}

/// Verify that the pools hold exactly what validator and unbonding records
/// say they custody:
///
/// - bonded pool = Σ tokens of bonded validators
/// - not-bonded pool = Σ tokens of other validators + Σ unbonding entry balances
pub fn check_pool_invariant<L: Ledger + ?Sized>(
    ledger: &L,
    pools: &CustodyPools,
    bond_denom: &str,
) -> Result<PoolBalances> {
    let mut bonded: u128 = 0;
    let mut not_bonded: u128 = 0;
    for validator in ledger.all_validators() {
        let slot = if validator.is_bonded() {
            &mut bonded
        } else {
            &mut not_bonded
        };
        *slot = slot.checked_add(validator.tokens).ok_or_else(overflow)?;
    }
    for ubd in ledger.all_unbonding_delegations() {
        for entry in &ubd.entries {
            not_bonded = not_bonded.checked_add(entry.balance).ok_or_else(overflow)?;
        }
    }

    let actual = PoolBalances::snapshot(ledger, pools, bond_denom);
    if actual.bonded != bonded || actual.not_bonded != not_bonded {
        return Err(MigrationError::PoolInvariantViolation(format!(
            "pools hold {}/{} {bond_denom}, records account for {bonded}/{not_bonded}",
            actual.bonded, actual.not_bonded
        )));
    }
    Ok(actual)
}

fn overflow() -> MigrationError {
    MigrationError::PoolInvariantViolation("custodied total overflows".into())
}
