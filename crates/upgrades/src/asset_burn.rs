//! Selective asset burn.
//!
//! Burns only allow-listed denominations, either from an account or from the
//! community pool. Everything else is left untouched.

use crate::custody::CustodyPools;
use crate::errors::{MigrationError, Result};
use luna_ledger::{Ledger, DISTRIBUTION_MODULE_NAME};
use luna_types::{AccAddress, Coins};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Ordered set of denominations that may be burned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DenomAllowList(BTreeSet<String>);

impl DenomAllowList {
    pub fn new<I, S>(denoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(denoms.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, denom: &str) -> bool {
        self.0.contains(denom)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Burn every balance of `account` whose denomination is allow-listed.
/// Returns the coins burned.
pub fn burn_filtered<L: Ledger + ?Sized>(
    ledger: &mut L,
    pools: &CustodyPools,
    account: &AccAddress,
    allowlist: &DenomAllowList,
) -> Result<Coins> {
    let targets = ledger
        .all_balances(account)
        .filter(|denom| allowlist.contains(denom));

    for coin in targets.iter() {
        debug!(target: "upgrades", account = %account, coin = %coin, "burning allow-listed balance");
        pools.burn_from_account(ledger, account, &Coins::single(coin))?;
    }

    info!(
        target: "upgrades",
        account = %account,
        burned = %targets,
        "allow-listed balances burned"
    );
    Ok(targets)
}

/// Burn the whole-unit part of every allow-listed community pool balance.
///
/// The tracked community pool total is decremented before the coins leave
/// the distribution module; a decrement that would go negative aborts with
/// [`MigrationError::NegativeResult`]. Fractional remainders stay tracked.
pub fn burn_community_pool_filtered<L: Ledger + ?Sized>(
    ledger: &mut L,
    pools: &CustodyPools,
    allowlist: &DenomAllowList,
) -> Result<Coins> {
    let (whole, _) = ledger.fee_pool().community_pool.truncate();
    let targets = whole.filter(|denom| allowlist.contains(denom));

    for coin in targets.iter() {
        let burned = Coins::single(coin);
        let mut fee_pool = ledger.fee_pool();
        fee_pool.community_pool = fee_pool
            .community_pool
            .safe_sub(&burned)
            .map_err(|err| MigrationError::NegativeResult(format!("community pool: {err}")))?;
        ledger.set_fee_pool(fee_pool);

        pools.burn_from_module(ledger, DISTRIBUTION_MODULE_NAME, &burned)?;
    }

    info!(target: "upgrades", burned = %targets, "community pool assets burned");
    Ok(targets)
}
