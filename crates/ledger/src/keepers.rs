//! Keeper interfaces over ledger state.
//!
//! Upgrade handlers only talk to the ledger through these traits, so any
//! store that implements them (the persistent node store, or
//! [`InMemoryLedger`](crate::InMemoryLedger) in tests and simulations) can
//! be migrated.

use crate::distribution::FeePool;
use crate::errors::Result;
use luna_types::{
    AccAddress, Account, BlockHeader, Coins, Delegation, ModuleAccount, Redelegation, Shares,
    StakingParams, UnbondingDelegation, UnbondingId, UnbondingRef, ValAddress, Validator,
};

/// Access to the header of the block being executed.
pub trait HeaderInfo {
    fn header(&self) -> &BlockHeader;
}

/// Account records.
pub trait AccountKeeper {
    fn account(&self, address: &AccAddress) -> Option<Account>;

    /// Insert or replace the account stored at `account.address()`.
    fn set_account(&mut self, account: Account);

    fn module_address(&self, name: &str) -> AccAddress {
        AccAddress::for_module(name)
    }

    fn module_account(&self, name: &str) -> Result<ModuleAccount>;
}

/// Balances, transfers, and supply.
pub trait BankKeeper {
    fn balance(&self, address: &AccAddress, denom: &str) -> u128;

    /// All balances of `address`, sorted by denomination.
    fn all_balances(&self, address: &AccAddress) -> Coins;

    /// Balances minus coins locked by a vesting schedule at the current block time.
    fn spendable_coins(&self, address: &AccAddress) -> Coins;

    fn supply(&self, denom: &str) -> u128;

    fn send_coins(&mut self, from: &AccAddress, to: &AccAddress, amount: &Coins) -> Result<()>;

    fn send_coins_from_account_to_module(
        &mut self,
        sender: &AccAddress,
        module: &str,
        amount: &Coins,
    ) -> Result<()>;

    fn send_coins_from_module_to_module(
        &mut self,
        sender: &str,
        recipient: &str,
        amount: &Coins,
    ) -> Result<()>;

    fn send_coins_from_module_to_account(
        &mut self,
        module: &str,
        recipient: &AccAddress,
        amount: &Coins,
    ) -> Result<()>;

    /// Mint into a module account holding the `Minter` permission.
    fn mint_coins(&mut self, module: &str, amount: &Coins) -> Result<()>;

    /// Destroy coins held by a module account holding the `Burner` permission,
    /// decrementing total supply.
    fn burn_coins(&mut self, module: &str, amount: &Coins) -> Result<()>;
}

/// Validators and staking positions.
pub trait StakingKeeper {
    fn staking_params(&self) -> StakingParams;

    fn set_staking_params(&mut self, params: StakingParams) -> Result<()>;

    fn validator(&self, operator: &ValAddress) -> Option<Validator>;

    fn set_validator(&mut self, validator: Validator);

    /// All validators, ordered by operator address.
    fn all_validators(&self) -> Vec<Validator>;

    fn delegation(&self, delegator: &AccAddress, validator: &ValAddress) -> Option<Delegation>;

    /// Delegations of `delegator`, ordered by validator address.
    fn delegator_delegations(&self, delegator: &AccAddress) -> Vec<Delegation>;

    /// Remove `shares` from a delegation without queueing an unbonding entry.
    ///
    /// Returns the token amount the shares were worth at the validator's
    /// current exchange rate. The tokens stay in whichever pool custodies the
    /// validator's stake.
    fn unbond(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        shares: Shares,
    ) -> Result<u128>;

    /// Unbonding delegations of `delegator`, ordered by validator address.
    fn delegator_unbonding_delegations(&self, delegator: &AccAddress)
        -> Vec<UnbondingDelegation>;

    fn all_unbonding_delegations(&self) -> Vec<UnbondingDelegation>;

    fn set_unbonding_delegation(&mut self, ubd: UnbondingDelegation);

    fn remove_unbonding_delegation(&mut self, delegator: &AccAddress, validator: &ValAddress);

    /// Redelegations of `delegator`, ordered by (source, destination).
    fn delegator_redelegations(&self, delegator: &AccAddress) -> Vec<Redelegation>;

    fn set_redelegation(&mut self, red: Redelegation);

    fn remove_redelegation(
        &mut self,
        delegator: &AccAddress,
        validator_src: &ValAddress,
        validator_dst: &ValAddress,
    );

    fn unbonding_ref(&self, id: UnbondingId) -> Option<UnbondingRef>;

    fn delete_unbonding_index(&mut self, id: UnbondingId);

    /// Notify dependent modules that a validator record is about to change.
    fn before_validator_modified(&mut self, operator: &ValAddress);
}

/// Reward accounting and the community pool.
pub trait DistributionKeeper {
    /// Pay out accrued rewards for a delegation to the delegator.
    fn withdraw_delegation_rewards(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Coins>;

    fn fee_pool(&self) -> FeePool;

    fn set_fee_pool(&mut self, pool: FeePool);
}

/// Everything an upgrade handler may touch.
pub trait Ledger: HeaderInfo + AccountKeeper + BankKeeper + StakingKeeper + DistributionKeeper {}

impl<T> Ledger for T where
    T: HeaderInfo + AccountKeeper + BankKeeper + StakingKeeper + DistributionKeeper
{
}
