//! Distribution state: accrued delegation rewards and the community pool.

use crate::errors::Result;
use crate::events::LedgerEvent;
use crate::keepers::{BankKeeper, DistributionKeeper};
use crate::memory::InMemoryLedger;
use crate::DISTRIBUTION_MODULE_NAME;
use luna_types::{AccAddress, Coins, DecCoins, ValAddress};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Global distribution accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePool {
    /// Tracked community pool total; backed by the distribution module
    /// account balance.
    pub community_pool: DecCoins,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct DistributionState {
    pub(crate) fee_pool: FeePool,
    /// delegator → validator → rewards owed, held by the distribution module.
    pub(crate) rewards: BTreeMap<AccAddress, BTreeMap<ValAddress, Coins>>,
    /// Count of "before validator modified" notifications per validator.
    pub(crate) validator_modifications: BTreeMap<ValAddress, u64>,
}

impl DistributionKeeper for InMemoryLedger {
    fn withdraw_delegation_rewards(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Coins> {
        let owed = self
            .distribution
            .rewards
            .get(delegator)
            .and_then(|by_validator| by_validator.get(validator))
            .cloned()
            .unwrap_or_default();

        if owed.is_empty() {
            return Ok(owed);
        }

        self.send_coins_from_module_to_account(DISTRIBUTION_MODULE_NAME, delegator, &owed)?;

        if let Some(by_validator) = self.distribution.rewards.get_mut(delegator) {
            by_validator.remove(validator);
            if by_validator.is_empty() {
                self.distribution.rewards.remove(delegator);
            }
        }

        debug!(
            target: "ledger",
            delegator = %delegator,
            validator = %validator,
            amount = %owed,
            "withdrew delegation rewards"
        );
        self.events.push(LedgerEvent::RewardsWithdrawn {
            delegator: delegator.clone(),
            validator: validator.clone(),
            amount: owed.clone(),
        });

        Ok(owed)
    }

    fn fee_pool(&self) -> FeePool {
        self.distribution.fee_pool.clone()
    }

    fn set_fee_pool(&mut self, pool: FeePool) {
        self.distribution.fee_pool = pool;
    }
}

impl InMemoryLedger {
    /// Rewards accrued but not yet withdrawn for a delegation.
    pub fn pending_rewards(&self, delegator: &AccAddress, validator: &ValAddress) -> Coins {
        self.distribution
            .rewards
            .get(delegator)
            .and_then(|by_validator| by_validator.get(validator))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of "before validator modified" notifications seen for `operator`.
    pub fn validator_modifications(&self, operator: &ValAddress) -> u64 {
        self.distribution
            .validator_modifications
            .get(operator)
            .copied()
            .unwrap_or(0)
    }
}
