//! Coin amounts and denomination multisets
//!
//! Token amounts are non-negative `u128` integers in the smallest unit of a
//! denomination. `Coins` keeps denominations sorted and never stores zero
//! amounts, so iteration order is the same on every node.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Native staking denomination.
pub const BOND_DENOM: &str = "uluna";

/// Errors produced by coin arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoinError {
    #[error("denomination must not be empty")]
    EmptyDenom,
    #[error("arithmetic overflow on {denom}")]
    Overflow { denom: String },
    #[error("result would be negative for {denom}")]
    Negative { denom: String },
    #[error("decimal amount {0} cannot be represented")]
    Unrepresentable(String),
}

/// A single `(denom, amount)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Sorted, zero-free set of coins keyed by denomination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build a coin set from pairs, merging duplicate denominations.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, CoinError>
    where
        I: IntoIterator<Item = (S, u128)>,
        S: Into<String>,
    {
        let mut coins = Coins::new();
        for (denom, amount) in pairs {
            coins.checked_add_coin(&Coin::new(denom, amount))?;
        }
        Ok(coins)
    }

    pub fn single(coin: Coin) -> Self {
        let mut coins = Coins::new();
        if !coin.is_zero() {
            coins.0.insert(coin.denom, coin.amount);
        }
        coins
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn denoms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate coins in ascending denomination order.
    pub fn iter(&self) -> impl Iterator<Item = Coin> + '_ {
        self.0
            .iter()
            .map(|(denom, amount)| Coin::new(denom.clone(), *amount))
    }

    pub fn checked_add_coin(&mut self, coin: &Coin) -> Result<(), CoinError> {
        if coin.denom.is_empty() {
            return Err(CoinError::EmptyDenom);
        }
        if coin.is_zero() {
            return Ok(());
        }
        let current = self.amount_of(&coin.denom);
        let next = current
            .checked_add(coin.amount)
            .ok_or_else(|| CoinError::Overflow {
                denom: coin.denom.clone(),
            })?;
        self.0.insert(coin.denom.clone(), next);
        Ok(())
    }

    pub fn checked_sub_coin(&mut self, coin: &Coin) -> Result<(), CoinError> {
        if coin.is_zero() {
            return Ok(());
        }
        let current = self.amount_of(&coin.denom);
        let next = current
            .checked_sub(coin.amount)
            .ok_or_else(|| CoinError::Negative {
                denom: coin.denom.clone(),
            })?;
        if next == 0 {
            self.0.remove(&coin.denom);
        } else {
            self.0.insert(coin.denom.clone(), next);
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Coins) -> Result<Coins, CoinError> {
        let mut out = self.clone();
        for coin in other.iter() {
            out.checked_add_coin(&coin)?;
        }
        Ok(out)
    }

    /// Subtract `other`, returning `None` if any denomination would go negative.
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        let mut out = self.clone();
        for coin in other.iter() {
            out.checked_sub_coin(&coin).ok()?;
        }
        Some(out)
    }

    /// `self - other` per denomination, clamped at zero.
    pub fn saturating_sub(&self, other: &Coins) -> Coins {
        let mut out = Coins::new();
        for coin in self.iter() {
            let remaining = coin.amount.saturating_sub(other.amount_of(&coin.denom));
            if remaining > 0 {
                out.0.insert(coin.denom, remaining);
            }
        }
        out
    }

    /// Per-denomination minimum of the two sets.
    pub fn min(&self, other: &Coins) -> Coins {
        let mut out = Coins::new();
        for coin in self.iter() {
            let amount = coin.amount.min(other.amount_of(&coin.denom));
            if amount > 0 {
                out.0.insert(coin.denom, amount);
            }
        }
        out
    }

    /// Keep only the denominations accepted by `keep`.
    pub fn filter<F>(&self, mut keep: F) -> Coins
    where
        F: FnMut(&str) -> bool,
    {
        Coins(
            self.0
                .iter()
                .filter(|(denom, _)| keep(denom))
                .map(|(denom, amount)| (denom.clone(), *amount))
                .collect(),
        )
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        f.write_str(&rendered.join(","))
    }
}

impl IntoIterator for Coins {
    type Item = Coin;
    type IntoIter = std::iter::Map<
        std::collections::btree_map::IntoIter<String, u128>,
        fn((String, u128)) -> Coin,
    >;

    fn into_iter(self) -> Self::IntoIter {
        let to_coin: fn((String, u128)) -> Coin = |(denom, amount)| Coin { denom, amount };
        self.0.into_iter().map(to_coin)
    }
}

impl FromIterator<Coin> for Coins {
    fn from_iter<T: IntoIterator<Item = Coin>>(iter: T) -> Self {
        let mut coins = Coins::new();
        for coin in iter {
            if coin.is_zero() || coin.denom.is_empty() {
                continue;
            }
            let entry = coins.0.entry(coin.denom).or_insert(0);
            *entry = entry.saturating_add(coin.amount);
        }
        coins
    }
}

/// Decimal coin amounts, used by accounting ledgers that track fractional
/// remainders (e.g. the community pool).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecCoins(BTreeMap<String, Decimal>);

impl DecCoins {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn amount_of(&self, denom: &str) -> Decimal {
        self.0.get(denom).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> + '_ {
        self.0.iter().map(|(denom, amount)| (denom.as_str(), *amount))
    }

    pub fn add_amount(&mut self, denom: &str, amount: Decimal) {
        if amount.is_zero() {
            return;
        }
        let next = self.amount_of(denom) + amount;
        if next.is_zero() {
            self.0.remove(denom);
        } else {
            self.0.insert(denom.to_string(), next);
        }
    }

    pub fn from_coins(coins: &Coins) -> Result<Self, CoinError> {
        let mut out = DecCoins::new();
        for coin in coins.iter() {
            let amount = Decimal::from_u128(coin.amount)
                .ok_or_else(|| CoinError::Unrepresentable(coin.amount.to_string()))?;
            out.add_amount(&coin.denom, amount);
        }
        Ok(out)
    }

    /// Subtract whole coins; `Err(Negative)` if any denomination would drop
    /// below zero.
    pub fn safe_sub(&self, coins: &Coins) -> Result<DecCoins, CoinError> {
        let mut out = self.clone();
        for coin in coins.iter() {
            let amount = Decimal::from_u128(coin.amount)
                .ok_or_else(|| CoinError::Unrepresentable(coin.amount.to_string()))?;
            let current = out.amount_of(&coin.denom);
            if current < amount {
                return Err(CoinError::Negative { denom: coin.denom });
            }
            out.add_amount(&coin.denom, -amount);
        }
        Ok(out)
    }

    /// Split into whole coins (truncated) and the remaining decimal change.
    pub fn truncate(&self) -> (Coins, DecCoins) {
        let mut whole = Coins::new();
        let mut change = DecCoins::new();
        for (denom, amount) in self.iter() {
            let truncated = amount.trunc();
            if let Some(units) = truncated.to_u128() {
                if units > 0 {
                    whole.0.insert(denom.to_string(), units);
                }
            }
            change.add_amount(denom, amount - truncated);
        }
        (whole, change)
    }
}
