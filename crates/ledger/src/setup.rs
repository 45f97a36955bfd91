//! Fixture operations for building ledger state.
//!
//! These mirror what ordinary transactions would do before an upgrade
//! height (funding, delegating, starting unbondings and redelegations) and
//! keep the custody pools consistent with validator tokens while doing it.

use crate::distribution::DistributionState;
use crate::errors::{LedgerError, Result};
use crate::keepers::{AccountKeeper, BankKeeper, StakingKeeper};
use crate::memory::InMemoryLedger;
use crate::staking::StakingState;
use crate::{BONDED_POOL_NAME, DISTRIBUTION_MODULE_NAME, MINT_MODULE_NAME, NOT_BONDED_POOL_NAME};
use luna_types::*;
use std::collections::BTreeMap;
use tracing::debug;

impl InMemoryLedger {
    /// Empty ledger with the staking, distribution, and mint module
    /// accounts registered.
    pub fn new(header: BlockHeader) -> Self {
        let mut ledger = Self {
            header,
            accounts: BTreeMap::new(),
            next_account_number: 0,
            balances: BTreeMap::new(),
            supply: Coins::new(),
            staking: StakingState::default(),
            distribution: DistributionState::default(),
            events: Vec::new(),
        };
        ledger.register_module(
            BONDED_POOL_NAME,
            vec![ModulePermission::Burner, ModulePermission::Staking],
        );
        ledger.register_module(
            NOT_BONDED_POOL_NAME,
            vec![ModulePermission::Burner, ModulePermission::Staking],
        );
        ledger.register_module(DISTRIBUTION_MODULE_NAME, Vec::new());
        ledger.register_module(MINT_MODULE_NAME, vec![ModulePermission::Minter]);
        ledger
    }

    /// Register an additional module account.
    pub fn add_module_account(&mut self, name: &str, permissions: Vec<ModulePermission>) {
        self.register_module(name, permissions);
    }

    /// Store a prebuilt account (e.g. a vesting account) without emitting a
    /// replacement event.
    pub fn create_account(&mut self, account: Account) {
        self.accounts.insert(account.address().clone(), account);
    }

    /// Mint `coins` and credit them to `address`, creating a base account
    /// if none exists.
    pub fn fund_account(&mut self, address: &AccAddress, coins: &Coins) -> Result<()> {
        self.ensure_account(address);
        self.mint_coins(MINT_MODULE_NAME, coins)?;
        self.send_coins_from_module_to_account(MINT_MODULE_NAME, address, coins)
    }

    pub fn create_validator(
        &mut self,
        operator: ValAddress,
        status: BondStatus,
        commission: Commission,
    ) -> Result<()> {
        if self.staking.validators.contains_key(&operator) {
            return Err(LedgerError::InvalidParams(format!(
                "validator {operator} already exists"
            )));
        }
        if !commission.is_valid() {
            return Err(LedgerError::InvalidParams(format!(
                "commission of {operator} must satisfy 0 <= rate <= max_rate <= 1 \
                 and max_change_rate <= max_rate"
            )));
        }
        debug!(target: "ledger", operator = %operator, ?status, "validator created");
        self.set_validator(Validator::new(operator, status, commission));
        Ok(())
    }

    /// Move a validator between bond states, carrying its tokens to the
    /// matching custody pool.
    pub fn set_validator_status(&mut self, operator: &ValAddress, status: BondStatus) -> Result<()> {
        let mut validator = self
            .validator(operator)
            .ok_or_else(|| LedgerError::UnknownValidator(operator.clone()))?;
        let tokens = self.bond_coins(validator.tokens);
        let (from, to) = (pool_for(validator.status), pool_for(status));
        if from != to {
            self.send_coins_from_module_to_module(from, to, &tokens)?;
        }
        validator.status = status;
        self.set_validator(validator);
        Ok(())
    }

    /// Delegate `amount` of the bond denomination; returns the shares issued.
    ///
    /// Locked vesting coins may be delegated; the account's delegated
    /// vesting and delegated free totals are tracked the usual way.
    pub fn delegate(
        &mut self,
        delegator: &AccAddress,
        operator: &ValAddress,
        amount: u128,
    ) -> Result<Shares> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("delegation of zero tokens".into()));
        }
        let validator = self
            .validator(operator)
            .ok_or_else(|| LedgerError::UnknownValidator(operator.clone()))?;

        let coins = self.bond_coins(amount);
        let pool = self.module_address(pool_for(validator.status));
        self.move_coins(delegator, &pool, &coins, false)?;
        self.track_delegation(delegator, &coins)?;

        self.add_shares(delegator, operator, amount)
    }

    /// Start undelegating `shares`; the tokens wait in the not-bonded pool
    /// until the unbonding window ends.
    pub fn begin_unbonding(
        &mut self,
        delegator: &AccAddress,
        operator: &ValAddress,
        shares: Shares,
    ) -> Result<UnbondingId> {
        let status = self
            .validator(operator)
            .map(|v| v.status)
            .ok_or_else(|| LedgerError::UnknownValidator(operator.clone()))?;

        let mut ubd = self
            .staking
            .unbonding
            .get(delegator)
            .and_then(|by_validator| by_validator.get(operator))
            .cloned()
            .unwrap_or_else(|| UnbondingDelegation {
                delegator: delegator.clone(),
                validator: operator.clone(),
                entries: Vec::new(),
            });
        self.ensure_entry_capacity(ubd.entries.len())?;

        let tokens = self.unbond(delegator, operator, shares)?;
        if status == BondStatus::Bonded {
            let coins = self.bond_coins(tokens);
            self.send_coins_from_module_to_module(BONDED_POOL_NAME, NOT_BONDED_POOL_NAME, &coins)?;
        }

        let id = self.staking.allocate_unbonding_id();
        ubd.entries.push(UnbondingDelegationEntry {
            creation_height: self.header.height,
            completion_time: self.completion_time(),
            initial_balance: tokens,
            balance: tokens,
            unbonding_id: id,
        });
        self.set_unbonding_delegation(ubd);
        self.staking.unbonding_index.insert(
            id,
            UnbondingRef::Unbonding {
                delegator: delegator.clone(),
                validator: operator.clone(),
            },
        );
        debug!(target: "ledger", delegator = %delegator, validator = %operator, id, tokens, "unbonding started");
        Ok(id)
    }

    /// Move `shares` from `src` to `dst` without leaving the bonded state.
    pub fn begin_redelegation(
        &mut self,
        delegator: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
        shares: Shares,
    ) -> Result<UnbondingId> {
        if src == dst {
            return Err(LedgerError::InvalidParams(
                "cannot redelegate to the same validator".into(),
            ));
        }
        let src_status = self
            .validator(src)
            .map(|v| v.status)
            .ok_or_else(|| LedgerError::UnknownValidator(src.clone()))?;
        let dst_status = self
            .validator(dst)
            .map(|v| v.status)
            .ok_or_else(|| LedgerError::UnknownValidator(dst.clone()))?;

        let mut red = self
            .staking
            .redelegations
            .get(delegator)
            .and_then(|by_src| by_src.get(src))
            .and_then(|by_dst| by_dst.get(dst))
            .cloned()
            .unwrap_or_else(|| Redelegation {
                delegator: delegator.clone(),
                validator_src: src.clone(),
                validator_dst: dst.clone(),
                entries: Vec::new(),
            });
        self.ensure_entry_capacity(red.entries.len())?;

        let tokens = self.unbond(delegator, src, shares)?;
        let (from, to) = (pool_for(src_status), pool_for(dst_status));
        if from != to {
            let coins = self.bond_coins(tokens);
            self.send_coins_from_module_to_module(from, to, &coins)?;
        }
        let shares_dst = self.add_shares(delegator, dst, tokens)?;

        let id = self.staking.allocate_unbonding_id();
        red.entries.push(RedelegationEntry {
            creation_height: self.header.height,
            completion_time: self.completion_time(),
            initial_balance: tokens,
            shares_dst,
            unbonding_id: id,
        });
        self.set_redelegation(red);
        self.staking.unbonding_index.insert(
            id,
            UnbondingRef::Redelegation {
                delegator: delegator.clone(),
                validator_src: src.clone(),
                validator_dst: dst.clone(),
            },
        );
        debug!(target: "ledger", delegator = %delegator, src = %src, dst = %dst, id, tokens, "redelegation started");
        Ok(id)
    }

    /// Credit rewards owed to a delegation; the coins are held by the
    /// distribution module until withdrawn.
    pub fn accrue_rewards(
        &mut self,
        delegator: &AccAddress,
        operator: &ValAddress,
        coins: &Coins,
    ) -> Result<()> {
        self.mint_coins(MINT_MODULE_NAME, coins)?;
        self.send_coins_from_module_to_module(MINT_MODULE_NAME, DISTRIBUTION_MODULE_NAME, coins)?;

        let owed = self
            .distribution
            .rewards
            .entry(delegator.clone())
            .or_default()
            .entry(operator.clone())
            .or_default();
        *owed = owed.checked_add(coins)?;
        Ok(())
    }

    /// Add `coins` to the community pool, backed by the distribution module.
    pub fn fund_community_pool(&mut self, coins: &Coins) -> Result<()> {
        let dec = DecCoins::from_coins(coins)?;
        self.mint_coins(MINT_MODULE_NAME, coins)?;
        self.send_coins_from_module_to_module(MINT_MODULE_NAME, DISTRIBUTION_MODULE_NAME, coins)?;

        for (denom, amount) in dec.iter() {
            self.distribution
                .fee_pool
                .community_pool
                .add_amount(denom, amount);
        }
        Ok(())
    }

    /// Burn `fraction` of a validator's tokens, lowering its exchange rate.
    /// Returns the amount burned.
    pub fn slash_validator(&mut self, operator: &ValAddress, fraction: Decimal) -> Result<u128> {
        if fraction < Decimal::ZERO || fraction > Decimal::ONE {
            return Err(LedgerError::InvalidParams(format!(
                "slash fraction {fraction} outside [0, 1]"
            )));
        }
        let mut validator = self
            .validator(operator)
            .ok_or_else(|| LedgerError::UnknownValidator(operator.clone()))?;

        let slashed = math::mul_div_decimal_floor(validator.tokens, fraction, Decimal::ONE)
            .ok_or_else(|| LedgerError::Overflow(format!("slash of {operator}")))?;

        let burned = self.bond_coins(slashed);
        self.burn_coins(pool_for(validator.status), &burned)?;
        validator.tokens -= slashed;
        self.set_validator(validator);
        debug!(target: "ledger", operator = %operator, slashed, "validator slashed");
        Ok(slashed)
    }

    /// Slash the in-flight unbonding entries of one delegation by
    /// `fraction` of their initial balance, burning from the not-bonded
    /// pool. An entry never drops below zero. Returns the amount burned.
    pub fn slash_unbonding_delegation(
        &mut self,
        delegator: &AccAddress,
        operator: &ValAddress,
        fraction: Decimal,
    ) -> Result<u128> {
        if fraction < Decimal::ZERO || fraction > Decimal::ONE {
            return Err(LedgerError::InvalidParams(format!(
                "slash fraction {fraction} outside [0, 1]"
            )));
        }
        let Some(mut ubd) = self
            .staking
            .unbonding
            .get(delegator)
            .and_then(|by_validator| by_validator.get(operator))
            .cloned()
        else {
            return Ok(0);
        };

        let mut slashed = 0u128;
        for entry in &mut ubd.entries {
            let cut = math::mul_div_decimal_floor(entry.initial_balance, fraction, Decimal::ONE)
                .ok_or_else(|| {
                    LedgerError::Overflow(format!("slash of unbonding entry {}", entry.unbonding_id))
                })?
                .min(entry.balance);
            entry.balance -= cut;
            slashed = slashed
                .checked_add(cut)
                .ok_or_else(|| LedgerError::Overflow(format!("slash of {operator}")))?;
        }

        let burned = self.bond_coins(slashed);
        self.burn_coins(NOT_BONDED_POOL_NAME, &burned)?;
        self.set_unbonding_delegation(ubd);
        debug!(target: "ledger", delegator = %delegator, validator = %operator, slashed, "unbonding entries slashed");
        Ok(slashed)
    }

    fn bond_coins(&self, amount: u128) -> Coins {
        Coins::single(Coin::new(self.staking.params.bond_denom.clone(), amount))
    }

    fn completion_time(&self) -> chrono::DateTime<chrono::Utc> {
        let window = i64::try_from(self.staking.params.unbonding_time_secs).unwrap_or(i64::MAX);
        self.header.time + chrono::Duration::seconds(window)
    }

    fn ensure_entry_capacity(&self, entries: usize) -> Result<()> {
        let max = self.staking.params.max_entries as usize;
        if entries >= max {
            return Err(LedgerError::InvalidParams(format!(
                "too many in-flight entries (max {max})"
            )));
        }
        Ok(())
    }

    /// Issue shares for `amount` freshly custodied tokens.
    fn add_shares(
        &mut self,
        delegator: &AccAddress,
        operator: &ValAddress,
        amount: u128,
    ) -> Result<Shares> {
        let mut validator = self
            .validator(operator)
            .ok_or_else(|| LedgerError::UnknownValidator(operator.clone()))?;
        let shares = validator
            .shares_from_tokens(amount)
            .ok_or_else(|| LedgerError::Overflow(format!("shares for {amount} on {operator}")))?;

        validator.tokens = validator
            .tokens
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(format!("tokens of {operator}")))?;
        validator.delegator_shares += shares;
        self.set_validator(validator);

        let delegation = self
            .staking
            .delegations
            .entry(delegator.clone())
            .or_default()
            .entry(operator.clone())
            .or_insert_with(|| Delegation {
                delegator: delegator.clone(),
                validator: operator.clone(),
                shares: Decimal::ZERO,
            });
        delegation.shares += shares;
        Ok(shares)
    }

    fn track_delegation(&mut self, delegator: &AccAddress, coins: &Coins) -> Result<()> {
        let now = self.header.time;
        let Some(account) = self.accounts.get_mut(delegator) else {
            return Ok(());
        };
        let still_vesting = account.vesting_coins(now);
        let Some(vesting) = account.vesting_mut() else {
            return Ok(());
        };
        for coin in coins.iter() {
            let lockable = still_vesting
                .amount_of(&coin.denom)
                .saturating_sub(vesting.delegated_vesting.amount_of(&coin.denom));
            let from_vesting = lockable.min(coin.amount);
            let from_free = coin.amount - from_vesting;
            vesting
                .delegated_vesting
                .checked_add_coin(&Coin::new(coin.denom.clone(), from_vesting))?;
            vesting
                .delegated_free
                .checked_add_coin(&Coin::new(coin.denom, from_free))?;
        }
        Ok(())
    }
}

fn pool_for(status: BondStatus) -> &'static str {
    match status {
        BondStatus::Bonded => BONDED_POOL_NAME,
        BondStatus::Unbonding | BondStatus::Unbonded => NOT_BONDED_POOL_NAME,
    }
}
