//! Per-network plan parameters.
//!
//! Which accounts and assets a plan touches depends on the chain it runs
//! on. Those choices live in [`NetworkTable`]s resolved once when the plan
//! registry is built; unknown chains get the table's default gate, which
//! does nothing.

use crate::asset_burn::DenomAllowList;
use crate::errors::{MigrationError, Result};
use luna_types::AccAddress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Chain id → gate, with a fallback for unlisted chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTable<G> {
    default: G,
    networks: BTreeMap<String, G>,
}

impl<G: Default> Default for NetworkTable<G> {
    fn default() -> Self {
        Self::new(G::default())
    }
}

impl<G> NetworkTable<G> {
    pub fn new(default: G) -> Self {
        Self {
            default,
            networks: BTreeMap::new(),
        }
    }

    pub fn with(mut self, chain_id: impl Into<String>, gate: G) -> Self {
        self.insert(chain_id, gate);
        self
    }

    pub fn insert(&mut self, chain_id: impl Into<String>, gate: G) {
        self.networks.insert(chain_id.into(), gate);
    }

    pub fn resolve(&self, chain_id: &str) -> &G {
        self.networks.get(chain_id).unwrap_or(&self.default)
    }

    pub fn is_listed(&self, chain_id: &str) -> bool {
        self.networks.contains_key(chain_id)
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = &str> {
        self.networks.keys().map(String::as_str)
    }
}

/// Accounts whose stake and balances are unwound and burned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnwindGate {
    pub accounts: Vec<AccAddress>,
}

impl UnwindGate {
    pub fn is_noop(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Allow-listed assets to burn from the community pool and from a holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetBurnGate {
    pub community_pool: DenomAllowList,
    pub holder: Option<AccAddress>,
    pub allowlist: DenomAllowList,
}

impl AssetBurnGate {
    pub fn is_noop(&self) -> bool {
        self.community_pool.is_empty() && (self.holder.is_none() || self.allowlist.is_empty())
    }
}

/// Operator-supplied gates merged over the built-in tables, keyed by plan
/// name and then chain id:
///
/// ```toml
/// [unwind."v2.12"."localterra"]
/// accounts = ["terra0101010101010101010101010101010101010101"]
///
/// [asset_burn."v2.14"."localterra"]
/// holder = "terra0202020202020202020202020202020202020202"
/// allowlist = ["factory/test"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkOverrides {
    pub unwind: BTreeMap<String, BTreeMap<String, UnwindGate>>,
    pub asset_burn: BTreeMap<String, BTreeMap<String, AssetBurnGate>>,
}

impl NetworkOverrides {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| MigrationError::Config(format!("{}: {err}", path.display())))?;
        let overrides = Self::from_toml_str(&raw)?;
        debug!(target: "upgrades", path = %path.display(), "network overrides loaded");
        Ok(overrides)
    }

    pub fn apply_unwind(&self, plan: &str, table: &mut NetworkTable<UnwindGate>) {
        for (chain_id, gate) in self.unwind.get(plan).into_iter().flatten() {
            table.insert(chain_id.clone(), gate.clone());
        }
    }

    pub fn apply_asset_burn(&self, plan: &str, table: &mut NetworkTable<AssetBurnGate>) {
        for (chain_id, gate) in self.asset_burn.get(plan).into_iter().flatten() {
            table.insert(chain_id.clone(), gate.clone());
        }
    }
}
