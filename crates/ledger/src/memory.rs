//! In-memory ledger store.
//!
//! `InMemoryLedger` holds the full state an upgrade handler can touch. It is
//! `Clone`, so callers can run a migration against a scratch copy and keep
//! the result only when the whole plan succeeds.

use crate::distribution::DistributionState;
use crate::errors::{LedgerError, Result};
use crate::events::LedgerEvent;
use crate::keepers::{AccountKeeper, BankKeeper, HeaderInfo};
use crate::staking::StakingState;
use luna_types::{
    AccAddress, Account, BaseAccount, BlockHeader, Coins, ModuleAccount, ModulePermission,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryLedger {
    pub(crate) header: BlockHeader,
    pub(crate) accounts: BTreeMap<AccAddress, Account>,
    pub(crate) next_account_number: u64,
    pub(crate) balances: BTreeMap<AccAddress, Coins>,
    pub(crate) supply: Coins,
    pub(crate) staking: StakingState,
    pub(crate) distribution: DistributionState,
    #[serde(default)]
    pub(crate) events: Vec<LedgerEvent>,
}

impl InMemoryLedger {
    /// Mutations recorded since the ledger was created or last drained.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn set_header(&mut self, header: BlockHeader) {
        self.header = header;
    }

    /// All accounts, ordered by address.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Total supply of every denomination.
    pub fn total_supply(&self) -> &Coins {
        &self.supply
    }

    pub(crate) fn next_account_number(&mut self) -> u64 {
        let number = self.next_account_number;
        self.next_account_number += 1;
        number
    }

    /// Create a base account at `address` unless one exists already.
    pub(crate) fn ensure_account(&mut self, address: &AccAddress) {
        if self.accounts.contains_key(address) {
            return;
        }
        let number = self.next_account_number();
        trace!(target: "ledger", address = %address, number, "creating account");
        self.accounts.insert(
            address.clone(),
            Account::Base(BaseAccount::new(address.clone(), number)),
        );
    }

    pub(crate) fn register_module(&mut self, name: &str, permissions: Vec<ModulePermission>) {
        let address = AccAddress::for_module(name);
        let number = self.next_account_number();
        self.accounts.insert(
            address.clone(),
            Account::Module(ModuleAccount {
                base: BaseAccount::new(address, number),
                name: name.to_string(),
                permissions,
            }),
        );
    }

    fn write_balance(&mut self, address: &AccAddress, coins: Coins) {
        if coins.is_empty() {
            self.balances.remove(address);
        } else {
            self.balances.insert(address.clone(), coins);
        }
    }

    fn ensure_balance(&self, address: &AccAddress, amount: &Coins) -> Result<()> {
        let balances = self.all_balances(address);
        for coin in amount.iter() {
            let available = balances.amount_of(&coin.denom);
            if available < coin.amount {
                return Err(LedgerError::InsufficientFunds {
                    address: address.clone(),
                    denom: coin.denom,
                    available,
                    requested: coin.amount,
                });
            }
        }
        Ok(())
    }

    /// Fail unless `address` holds, and may spend, every coin in `amount`.
    fn ensure_spendable(&self, address: &AccAddress, amount: &Coins) -> Result<()> {
        self.ensure_balance(address, amount)?;
        let spendable = self.spendable_coins(address);
        for coin in amount.iter() {
            if spendable.amount_of(&coin.denom) < coin.amount {
                return Err(LedgerError::LockedFunds {
                    address: address.clone(),
                    denom: coin.denom,
                    requested: coin.amount,
                });
            }
        }
        Ok(())
    }

    /// Move coins between two addresses, refusing coins locked by vesting.
    pub(crate) fn transfer(
        &mut self,
        from: &AccAddress,
        to: &AccAddress,
        amount: &Coins,
    ) -> Result<()> {
        self.move_coins(from, to, amount, true)
    }

    /// Move coins between two addresses. Nothing is written unless both
    /// sides of the transfer succeed. Delegation moves locked coins too, so
    /// it passes `respect_locks = false`.
    pub(crate) fn move_coins(
        &mut self,
        from: &AccAddress,
        to: &AccAddress,
        amount: &Coins,
        respect_locks: bool,
    ) -> Result<()> {
        if amount.is_empty() {
            return Ok(());
        }
        if respect_locks {
            self.ensure_spendable(from, amount)?;
        } else {
            self.ensure_balance(from, amount)?;
        }
        if from == to {
            return Ok(());
        }

        let debited = self
            .all_balances(from)
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::Overflow(format!("debit of {amount} from {from}")))?;
        let credited = self.all_balances(to).checked_add(amount)?;

        self.ensure_account(to);
        self.write_balance(from, debited);
        self.write_balance(to, credited);

        trace!(target: "ledger", from = %from, to = %to, amount = %amount, "transfer");
        self.events.push(LedgerEvent::Transfer {
            from: from.clone(),
            to: to.clone(),
            amount: amount.clone(),
        });
        Ok(())
    }

    fn module_with_permission(
        &self,
        name: &str,
        permission: ModulePermission,
    ) -> Result<ModuleAccount> {
        let module = self.module_account(name)?;
        if !module.has_permission(permission) {
            return Err(LedgerError::MissingPermission {
                module: name.to_string(),
                permission,
            });
        }
        Ok(module)
    }
}

impl HeaderInfo for InMemoryLedger {
    fn header(&self) -> &BlockHeader {
        &self.header
    }
}

impl AccountKeeper for InMemoryLedger {
    fn account(&self, address: &AccAddress) -> Option<Account> {
        self.accounts.get(address).cloned()
    }

    fn set_account(&mut self, account: Account) {
        let address = account.address().clone();
        debug!(target: "ledger", address = %address, vesting = account.is_vesting(), "set account");
        self.accounts.insert(address.clone(), account);
        self.events.push(LedgerEvent::AccountSet { address });
    }

    fn module_account(&self, name: &str) -> Result<ModuleAccount> {
        self.accounts
            .get(&AccAddress::for_module(name))
            .and_then(Account::as_module)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownModule(name.to_string()))
    }
}

impl BankKeeper for InMemoryLedger {
    fn balance(&self, address: &AccAddress, denom: &str) -> u128 {
        self.balances
            .get(address)
            .map(|coins| coins.amount_of(denom))
            .unwrap_or(0)
    }

    fn all_balances(&self, address: &AccAddress) -> Coins {
        self.balances.get(address).cloned().unwrap_or_default()
    }

    fn spendable_coins(&self, address: &AccAddress) -> Coins {
        let balances = self.all_balances(address);
        match self.accounts.get(address) {
            Some(account) if account.is_vesting() => {
                balances.saturating_sub(&account.locked_coins(self.header.time))
            }
            _ => balances,
        }
    }

    fn supply(&self, denom: &str) -> u128 {
        self.supply.amount_of(denom)
    }

    fn send_coins(&mut self, from: &AccAddress, to: &AccAddress, amount: &Coins) -> Result<()> {
        self.transfer(from, to, amount)
    }

    fn send_coins_from_account_to_module(
        &mut self,
        sender: &AccAddress,
        module: &str,
        amount: &Coins,
    ) -> Result<()> {
        let recipient = self.module_account(module)?.base.address;
        self.transfer(sender, &recipient, amount)
    }

    fn send_coins_from_module_to_module(
        &mut self,
        sender: &str,
        recipient: &str,
        amount: &Coins,
    ) -> Result<()> {
        let from = self.module_account(sender)?.base.address;
        let to = self.module_account(recipient)?.base.address;
        self.transfer(&from, &to, amount)
    }

    fn send_coins_from_module_to_account(
        &mut self,
        module: &str,
        recipient: &AccAddress,
        amount: &Coins,
    ) -> Result<()> {
        let from = self.module_account(module)?.base.address;
        self.transfer(&from, recipient, amount)
    }

    fn mint_coins(&mut self, module: &str, amount: &Coins) -> Result<()> {
        let address = self
            .module_with_permission(module, ModulePermission::Minter)?
            .base
            .address;
        if amount.is_empty() {
            return Ok(());
        }

        let supply = self.supply.checked_add(amount)?;
        let credited = self.all_balances(&address).checked_add(amount)?;
        self.supply = supply;
        self.write_balance(&address, credited);

        debug!(target: "ledger", module, amount = %amount, "minted");
        self.events.push(LedgerEvent::Mint {
            module: module.to_string(),
            amount: amount.clone(),
        });
        Ok(())
    }

    fn burn_coins(&mut self, module: &str, amount: &Coins) -> Result<()> {
        let address = self
            .module_with_permission(module, ModulePermission::Burner)?
            .base
            .address;
        if amount.is_empty() {
            return Ok(());
        }
        self.ensure_spendable(&address, amount)?;

        let mut supply = self.supply.clone();
        for coin in amount.iter() {
            supply.checked_sub_coin(&coin)?;
        }
        let debited = self
            .all_balances(&address)
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::Overflow(format!("burn of {amount} from {module}")))?;
        self.supply = supply;
        self.write_balance(&address, debited);

        debug!(target: "ledger", module, amount = %amount, "burned");
        self.events.push(LedgerEvent::Burn {
            module: module.to_string(),
            amount: amount.clone(),
        });
        Ok(())
    }
}
