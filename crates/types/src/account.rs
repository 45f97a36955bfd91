//! Account records, including vesting variants.
//!
//! A vesting account locks part of its balance until a schedule releases it.
//! Locked coins cannot be transferred; `into_base` strips the schedule.

use crate::address::AccAddress;
use crate::coin::{Coin, Coins};
use crate::math::mul_div_floor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capabilities granted to a module account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulePermission {
    Minter,
    Burner,
    Staking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseAccount {
    pub address: AccAddress,
    pub account_number: u64,
    pub sequence: u64,
}

impl BaseAccount {
    pub fn new(address: AccAddress, account_number: u64) -> Self {
        Self {
            address,
            account_number,
            sequence: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAccount {
    pub base: BaseAccount,
    pub name: String,
    pub permissions: Vec<ModulePermission>,
}

impl ModuleAccount {
    pub fn has_permission(&self, permission: ModulePermission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Bookkeeping shared by every vesting schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseVestingAccount {
    pub base: BaseAccount,
    pub original_vesting: Coins,
    #[serde(default)]
    pub delegated_free: Coins,
    #[serde(default)]
    pub delegated_vesting: Coins,
    pub end_time: DateTime<Utc>,
}

impl BaseVestingAccount {
    /// Coins locked given the still-vesting amount: vesting coins not already
    /// delegated stay locked in the bank balance.
    fn locked_from(&self, vesting: &Coins) -> Coins {
        vesting.saturating_sub(&self.delegated_vesting)
    }
}

/// One release step of a periodic schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingPeriod {
    pub length_secs: i64,
    pub amount: Coins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Account {
    Base(BaseAccount),
    Module(ModuleAccount),
    ContinuousVesting {
        vesting: BaseVestingAccount,
        start_time: DateTime<Utc>,
    },
    DelayedVesting {
        vesting: BaseVestingAccount,
    },
    PeriodicVesting {
        vesting: BaseVestingAccount,
        start_time: DateTime<Utc>,
        periods: Vec<VestingPeriod>,
    },
}

impl Account {
    pub fn address(&self) -> &AccAddress {
        &self.base().address
    }

    pub fn base(&self) -> &BaseAccount {
        match self {
            Account::Base(base) => base,
            Account::Module(module) => &module.base,
            Account::ContinuousVesting { vesting, .. }
            | Account::DelayedVesting { vesting }
            | Account::PeriodicVesting { vesting, .. } => &vesting.base,
        }
    }

    pub fn is_vesting(&self) -> bool {
        matches!(
            self,
            Account::ContinuousVesting { .. }
                | Account::DelayedVesting { .. }
                | Account::PeriodicVesting { .. }
        )
    }

    pub fn as_module(&self) -> Option<&ModuleAccount> {
        match self {
            Account::Module(module) => Some(module),
            _ => None,
        }
    }

    pub fn vesting_mut(&mut self) -> Option<&mut BaseVestingAccount> {
        match self {
            Account::ContinuousVesting { vesting, .. }
            | Account::DelayedVesting { vesting }
            | Account::PeriodicVesting { vesting, .. } => Some(vesting),
            Account::Base(_) | Account::Module(_) => None,
        }
    }

    /// Drop any vesting schedule, keeping the underlying base account.
    pub fn into_base(self) -> Account {
        match self {
            Account::ContinuousVesting { vesting, .. }
            | Account::DelayedVesting { vesting }
            | Account::PeriodicVesting { vesting, .. } => Account::Base(vesting.base),
            other => other,
        }
    }

    /// Coins still vesting at `now`.
    pub fn vesting_coins(&self, now: DateTime<Utc>) -> Coins {
        match self {
            Account::Base(_) | Account::Module(_) => Coins::new(),
            Account::DelayedVesting { vesting } => {
                if now >= vesting.end_time {
                    Coins::new()
                } else {
                    vesting.original_vesting.clone()
                }
            }
            Account::ContinuousVesting {
                vesting,
                start_time,
            } => {
                let vested = continuous_vested(vesting, *start_time, now);
                vesting.original_vesting.saturating_sub(&vested)
            }
            Account::PeriodicVesting {
                vesting,
                start_time,
                periods,
            } => {
                let vested = periodic_vested(vesting, *start_time, periods, now);
                vesting.original_vesting.saturating_sub(&vested)
            }
        }
    }

    /// Coins that may not leave the account at `now`.
    pub fn locked_coins(&self, now: DateTime<Utc>) -> Coins {
        match self {
            Account::Base(_) | Account::Module(_) => Coins::new(),
            Account::ContinuousVesting { vesting, .. }
            | Account::DelayedVesting { vesting }
            | Account::PeriodicVesting { vesting, .. } => {
                vesting.locked_from(&self.vesting_coins(now))
            }
        }
    }
}

fn continuous_vested(
    vesting: &BaseVestingAccount,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Coins {
    if now <= start {
        return Coins::new();
    }
    if now >= vesting.end_time {
        return vesting.original_vesting.clone();
    }

    let elapsed = u128::try_from((now - start).num_seconds()).unwrap_or(0);
    let total = u128::try_from((vesting.end_time - start).num_seconds()).unwrap_or(0);
    if total == 0 {
        return vesting.original_vesting.clone();
    }

    vesting
        .original_vesting
        .iter()
        .map(|coin| {
            let vested = mul_div_floor(coin.amount, elapsed, total).unwrap_or(coin.amount);
            Coin::new(coin.denom, vested)
        })
        .collect()
}

fn periodic_vested(
    vesting: &BaseVestingAccount,
    start: DateTime<Utc>,
    periods: &[VestingPeriod],
    now: DateTime<Utc>,
) -> Coins {
    if now <= start {
        return Coins::new();
    }
    if now >= vesting.end_time {
        return vesting.original_vesting.clone();
    }

    let mut vested = Coins::new();
    let mut cursor = start;
    for period in periods {
        cursor += chrono::Duration::seconds(period.length_secs);
        if now < cursor {
            break;
        }
        for coin in period.amount.iter() {
            if vested.checked_add_coin(&coin).is_err() {
                return vesting.original_vesting.clone();
            }
        }
    }
    vested.min(&vesting.original_vesting)
}
