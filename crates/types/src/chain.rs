//! Block context and module schema versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chain identifier of the live mainnet.
pub const MAINNET_CHAIN_ID: &str = "phoenix-1";
/// Chain identifier of the public testnet.
pub const TESTNET_CHAIN_ID: &str = "pisco-1";

/// Module name → schema version.
pub type VersionMap = BTreeMap<String, u64>;

/// Header of the block whose state transition is executing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub chain_id: String,
    pub height: u64,
    pub time: DateTime<Utc>,
}

impl BlockHeader {
    pub fn new(chain_id: impl Into<String>, height: u64, time: DateTime<Utc>) -> Self {
        Self {
            chain_id: chain_id.into(),
            height,
            time,
        }
    }
}

/// Modules whose version in `stored` is behind `targets`, in name order.
pub fn modules_behind<'a>(stored: &VersionMap, targets: &'a VersionMap) -> Vec<&'a str> {
    targets
        .iter()
        .filter(|(module, target)| stored.get(*module).copied().unwrap_or(0) < **target)
        .map(|(module, _)| module.as_str())
        .collect()
}
