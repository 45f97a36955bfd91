//! Staking records
//!
//! Validators, delegations, and the two kinds of in-flight positions
//! (unbonding delegations and redelegations). Shares are decimal ownership
//! units of a validator's token pool; the exchange rate is
//! `tokens / delegator_shares` and changes on slashing.

use crate::address::{AccAddress, ValAddress};
use crate::math::{mul_div_decimal_floor, ratio_to_decimal};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Global identifier of an unbonding or redelegation entry.
pub type UnbondingId = u64;

/// Decimal ownership units of a validator's bonded pool.
pub type Shares = Decimal;

/// Bonding state of a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondStatus {
    Bonded,
    Unbonding,
    Unbonded,
}

/// Validator commission settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    pub rate: Decimal,
    pub max_rate: Decimal,
    pub max_change_rate: Decimal,
    /// Last time the rate changed; normal edits are limited to one per day.
    pub update_time: DateTime<Utc>,
}

impl Commission {
    pub fn new(
        rate: Decimal,
        max_rate: Decimal,
        max_change_rate: Decimal,
        update_time: DateTime<Utc>,
    ) -> Self {
        Self {
            rate,
            max_rate,
            max_change_rate,
            update_time,
        }
    }

    /// `rate ≤ max_rate` and both in `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        self.rate >= Decimal::ZERO
            && self.max_rate <= Decimal::ONE
            && self.rate <= self.max_rate
            && self.max_change_rate <= self.max_rate
    }
}

/// A validator as tracked by the staking store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub operator: ValAddress,
    pub status: BondStatus,
    pub tokens: u128,
    pub delegator_shares: Shares,
    pub commission: Commission,
    #[serde(default)]
    pub jailed: bool,
}

impl Validator {
    pub fn new(operator: ValAddress, status: BondStatus, commission: Commission) -> Self {
        Self {
            operator,
            status,
            tokens: 0,
            delegator_shares: Decimal::ZERO,
            commission,
            jailed: false,
        }
    }

    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }

    /// Token value of `shares`, truncated toward zero.
    ///
    /// Returns `None` when the validator has no shares outstanding or
    /// `shares` is negative.
    pub fn tokens_from_shares(&self, shares: Shares) -> Option<u128> {
        if self.delegator_shares.is_zero() {
            return None;
        }
        mul_div_decimal_floor(self.tokens, shares, self.delegator_shares)
    }

    /// Shares minted for a deposit of `amount` tokens at the current rate.
    pub fn shares_from_tokens(&self, amount: u128) -> Option<Shares> {
        if self.tokens == 0 {
            return Decimal::from_u128(amount);
        }
        ratio_to_decimal(amount, self.delegator_shares, self.tokens)
    }
}

/// Proportional ownership of a validator's bonded pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub shares: Shares,
}

/// Tokens in transit from bonded to liquid during the unbonding window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegationEntry {
    pub creation_height: u64,
    pub completion_time: DateTime<Utc>,
    pub initial_balance: u128,
    /// Remaining balance after any slashing while unbonding.
    pub balance: u128,
    pub unbonding_id: UnbondingId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegation {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub entries: Vec<UnbondingDelegationEntry>,
}

impl UnbondingDelegation {
    pub fn total_balance(&self) -> u128 {
        self.entries
            .iter()
            .fold(0u128, |acc, e| acc.saturating_add(e.balance))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedelegationEntry {
    pub creation_height: u64,
    pub completion_time: DateTime<Utc>,
    pub initial_balance: u128,
    pub shares_dst: Shares,
    pub unbonding_id: UnbondingId,
}

/// Shares moving between validators without leaving the bonded pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redelegation {
    pub delegator: AccAddress,
    pub validator_src: ValAddress,
    pub validator_dst: ValAddress,
    pub entries: Vec<RedelegationEntry>,
}

/// Which record owns an unbonding id in the global index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnbondingRef {
    Unbonding {
        delegator: AccAddress,
        validator: ValAddress,
    },
    Redelegation {
        delegator: AccAddress,
        validator_src: ValAddress,
        validator_dst: ValAddress,
    },
}

/// Staking module parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    pub bond_denom: String,
    pub unbonding_time_secs: u64,
    pub max_entries: u32,
    pub min_commission_rate: Decimal,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            bond_denom: crate::coin::BOND_DENOM.to_string(),
            // 21 days
            unbonding_time_secs: 21 * 24 * 3600,
            max_entries: 7,
            min_commission_rate: Decimal::ZERO,
        }
    }
}
