//! Staking store backing [`StakingKeeper`] for the in-memory ledger.

use crate::errors::{LedgerError, Result};
use crate::events::LedgerEvent;
use crate::keepers::StakingKeeper;
use crate::memory::InMemoryLedger;
use luna_types::{
    AccAddress, BondStatus, Decimal, Delegation, Redelegation, Shares, StakingParams,
    UnbondingDelegation, UnbondingId, UnbondingRef, ValAddress, Validator,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

type ByValidator<T> = BTreeMap<AccAddress, BTreeMap<ValAddress, T>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StakingState {
    pub(crate) params: StakingParams,
    pub(crate) validators: BTreeMap<ValAddress, Validator>,
    pub(crate) delegations: ByValidator<Delegation>,
    pub(crate) unbonding: ByValidator<UnbondingDelegation>,
    /// delegator → source → destination → redelegation.
    pub(crate) redelegations: ByValidator<BTreeMap<ValAddress, Redelegation>>,
    pub(crate) unbonding_index: BTreeMap<UnbondingId, UnbondingRef>,
    pub(crate) next_unbonding_id: UnbondingId,
}

impl StakingState {
    pub(crate) fn allocate_unbonding_id(&mut self) -> UnbondingId {
        self.next_unbonding_id += 1;
        self.next_unbonding_id
    }
}

fn validate_params(params: &StakingParams) -> Result<()> {
    if params.bond_denom.is_empty() {
        return Err(LedgerError::InvalidParams("bond denom is empty".into()));
    }
    if params.max_entries == 0 {
        return Err(LedgerError::InvalidParams("max entries must be positive".into()));
    }
    if params.min_commission_rate < Decimal::ZERO || params.min_commission_rate > Decimal::ONE {
        return Err(LedgerError::InvalidParams(format!(
            "min commission rate {} outside [0, 1]",
            params.min_commission_rate
        )));
    }
    Ok(())
}

impl StakingKeeper for InMemoryLedger {
    fn staking_params(&self) -> StakingParams {
        self.staking.params.clone()
    }

    fn set_staking_params(&mut self, params: StakingParams) -> Result<()> {
        validate_params(&params)?;
        debug!(
            target: "ledger",
            min_commission_rate = %params.min_commission_rate,
            "staking params updated"
        );
        self.staking.params = params;
        Ok(())
    }

    fn validator(&self, operator: &ValAddress) -> Option<Validator> {
        self.staking.validators.get(operator).cloned()
    }

    fn set_validator(&mut self, validator: Validator) {
        self.staking
            .validators
            .insert(validator.operator.clone(), validator);
    }

    fn all_validators(&self) -> Vec<Validator> {
        self.staking.validators.values().cloned().collect()
    }

    fn delegation(&self, delegator: &AccAddress, validator: &ValAddress) -> Option<Delegation> {
        self.staking
            .delegations
            .get(delegator)
            .and_then(|by_validator| by_validator.get(validator))
            .cloned()
    }

    fn delegator_delegations(&self, delegator: &AccAddress) -> Vec<Delegation> {
        self.staking
            .delegations
            .get(delegator)
            .map(|by_validator| by_validator.values().cloned().collect())
            .unwrap_or_default()
    }

    fn unbond(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        shares: Shares,
    ) -> Result<u128> {
        let mut val = self
            .validator(validator)
            .ok_or_else(|| LedgerError::UnknownValidator(validator.clone()))?;
        let mut delegation =
            self.delegation(delegator, validator)
                .ok_or_else(|| LedgerError::DelegationNotFound {
                    delegator: delegator.clone(),
                    validator: validator.clone(),
                })?;

        if shares > delegation.shares || shares > val.delegator_shares {
            return Err(LedgerError::InsufficientShares {
                available: delegation.shares,
                requested: shares,
            });
        }

        // Removing every outstanding share takes every token so no dust is
        // stranded by truncation.
        let tokens = if shares == val.delegator_shares {
            val.tokens
        } else {
            val.tokens_from_shares(shares).ok_or_else(|| {
                LedgerError::Overflow(format!("token value of {shares} shares on {validator}"))
            })?
        };

        val.tokens = val
            .tokens
            .checked_sub(tokens)
            .ok_or_else(|| LedgerError::Overflow(format!("tokens of {validator}")))?;
        val.delegator_shares -= shares;
        delegation.shares -= shares;

        if delegation.shares.is_zero() {
            if let Some(by_validator) = self.staking.delegations.get_mut(delegator) {
                by_validator.remove(validator);
                if by_validator.is_empty() {
                    self.staking.delegations.remove(delegator);
                }
            }
        } else {
            self.staking
                .delegations
                .entry(delegator.clone())
                .or_default()
                .insert(validator.clone(), delegation);
        }

        if val.status == BondStatus::Unbonded && val.delegator_shares.is_zero() {
            trace!(target: "ledger", validator = %validator, "removing empty unbonded validator");
            self.staking.validators.remove(validator);
        } else {
            self.set_validator(val);
        }

        self.events.push(LedgerEvent::Unbonded {
            delegator: delegator.clone(),
            validator: validator.clone(),
            shares,
            tokens,
        });
        Ok(tokens)
    }

    fn delegator_unbonding_delegations(
        &self,
        delegator: &AccAddress,
    ) -> Vec<UnbondingDelegation> {
        self.staking
            .unbonding
            .get(delegator)
            .map(|by_validator| by_validator.values().cloned().collect())
            .unwrap_or_default()
    }

    fn all_unbonding_delegations(&self) -> Vec<UnbondingDelegation> {
        self.staking
            .unbonding
            .values()
            .flat_map(|by_validator| by_validator.values().cloned())
            .collect()
    }

    fn set_unbonding_delegation(&mut self, ubd: UnbondingDelegation) {
        self.staking
            .unbonding
            .entry(ubd.delegator.clone())
            .or_default()
            .insert(ubd.validator.clone(), ubd);
    }

    fn remove_unbonding_delegation(&mut self, delegator: &AccAddress, validator: &ValAddress) {
        if let Some(by_validator) = self.staking.unbonding.get_mut(delegator) {
            by_validator.remove(validator);
            if by_validator.is_empty() {
                self.staking.unbonding.remove(delegator);
            }
        }
    }

    fn delegator_redelegations(&self, delegator: &AccAddress) -> Vec<Redelegation> {
        self.staking
            .redelegations
            .get(delegator)
            .map(|by_src| {
                by_src
                    .values()
                    .flat_map(|by_dst| by_dst.values().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_redelegation(&mut self, red: Redelegation) {
        self.staking
            .redelegations
            .entry(red.delegator.clone())
            .or_default()
            .entry(red.validator_src.clone())
            .or_default()
            .insert(red.validator_dst.clone(), red);
    }

    fn remove_redelegation(
        &mut self,
        delegator: &AccAddress,
        validator_src: &ValAddress,
        validator_dst: &ValAddress,
    ) {
        let Some(by_src) = self.staking.redelegations.get_mut(delegator) else {
            return;
        };
        if let Some(by_dst) = by_src.get_mut(validator_src) {
            by_dst.remove(validator_dst);
            if by_dst.is_empty() {
                by_src.remove(validator_src);
            }
        }
        if by_src.is_empty() {
            self.staking.redelegations.remove(delegator);
        }
    }

    fn unbonding_ref(&self, id: UnbondingId) -> Option<UnbondingRef> {
        self.staking.unbonding_index.get(&id).cloned()
    }

    fn delete_unbonding_index(&mut self, id: UnbondingId) {
        if self.staking.unbonding_index.remove(&id).is_some() {
            self.events.push(LedgerEvent::UnbondingIndexDeleted { id });
        }
    }

    fn before_validator_modified(&mut self, operator: &ValAddress) {
        *self
            .distribution
            .validator_modifications
            .entry(operator.clone())
            .or_insert(0) += 1;
        self.events.push(LedgerEvent::ValidatorModified {
            operator: operator.clone(),
        });
    }
}

impl InMemoryLedger {
    /// Number of live entries in the global unbonding index.
    pub fn unbonding_index_len(&self) -> usize {
        self.staking.unbonding_index.len()
    }
}
