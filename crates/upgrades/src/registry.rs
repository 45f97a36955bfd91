//! Built-in upgrade plans.
//!
//! Every plan this chain has shipped, with its per-network parameters.
//! Plans are built for one chain id at a time; the network tables are
//! resolved here and nowhere else.

use crate::asset_burn::DenomAllowList;
use crate::commission::CommissionFloor;
use crate::errors::{MigrationError, Result};
use crate::networks::{AssetBurnGate, NetworkOverrides, NetworkTable, UnwindGate};
use crate::plan::{MigrationPlan, MigrationStep};
use luna_types::{AccAddress, Decimal, MAINNET_CHAIN_ID, TESTNET_CHAIN_ID};
use tracing::debug;

/// Chain id used by the local integration network.
pub const LOCAL_TEST_CHAIN_ID: &str = "test-1";

pub const V2_3_0: &str = "v2.3.0";
pub const V2_6: &str = "v2.6";
pub const V2_7: &str = "v2.7";
pub const V2_9: &str = "v2.9";
pub const V2_10: &str = "v2.10";
pub const V2_12: &str = "v2.12";
pub const V2_13: &str = "v2.13";
pub const V2_14: &str = "v2.14";

/// Module introduced by v2.3.0 whose version is adopted rather than
/// initialised by the module runner.
pub const TOKENFACTORY_MODULE: &str = "tokenfactory";

/// Version-map key recording that the plan called `name` has been applied.
pub fn plan_marker(name: &str) -> String {
    format!("upgrade/{name}")
}

/// Empty built-in plan whose target is its own applied marker, so a
/// version map that records it keeps the plan from running again.
fn builtin(name: &str) -> MigrationPlan {
    MigrationPlan::new(name).with_target(plan_marker(name), 1)
}

/// Commission floor applied by v2.12: 5%.
pub fn v2_12_commission_floor() -> Result<CommissionFloor> {
    CommissionFloor::new(Decimal::new(5, 2))
}

const V2_12_MAINNET_ACCOUNTS: [&str; 2] = [
    "terra734ebc14fcdbcdac17f5d32e87bd1c6891fce53f",
    "terra337800a75deddf34ac21e645ee07fac707b25bf1c19b9b56f47770ef5e6f48cb",
];

const MAINNET_RECOVERY_CONTRACT: &str =
    "terra2b1f43b48b319cd775bd28bfd7b3db216d21d0556ac012e52299740f17866e47";
const TESTNET_RECOVERY_CONTRACT: &str =
    "terrac441f605475a22c2aaabe9ce018cbd3920e7743dc6dff1190576d18a800317f6";
const LOCAL_RECOVERY_CONTRACT: &str =
    "terraade4a5f5803a439835c636395a8d648dee57b2fc90d98dc17fa887159b69638b";

/// Bridged assets burned on mainnet (axlWBTC, axlUSDT, axlUSDC).
const MAINNET_BRIDGED_ASSETS: [&str; 3] = [
    "ibc/05D299885B07905B6886F554B39346EA6761246076A1120B1950049B92B922DD",
    "ibc/CBF67A2BCF6CAE343FDF251E510C8E18C361FC02B23430C121116E0811835DEF",
    "ibc/B3504E092456BA618CC28AC671A71FB08C6CA0FD0BE7C8A5B5A3E2DD933CC9E4",
];
const TESTNET_BURN_ASSET: &str = "factory/terra1azcpczz2jfysyl6m3wx3scpunt4lgcujpkyzt2/test-burn";
const LOCAL_BURN_ASSET: &str = "factory/terra1v0eee20gjl68fuk0chyrkch2z7suw2mhg3wkxf/test";

pub fn v2_12_networks() -> Result<NetworkTable<UnwindGate>> {
    let accounts = V2_12_MAINNET_ACCOUNTS
        .iter()
        .map(|raw| raw.parse::<AccAddress>())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(NetworkTable::default().with(MAINNET_CHAIN_ID, UnwindGate { accounts }))
}

pub fn v2_13_networks() -> Result<NetworkTable<AssetBurnGate>> {
    let assets = DenomAllowList::new(MAINNET_BRIDGED_ASSETS);
    Ok(NetworkTable::default().with(
        MAINNET_CHAIN_ID,
        AssetBurnGate {
            community_pool: assets.clone(),
            holder: Some(MAINNET_RECOVERY_CONTRACT.parse()?),
            allowlist: assets,
        },
    ))
}

pub fn v2_14_networks() -> Result<NetworkTable<AssetBurnGate>> {
    let recovery_burn = |holder: &str, assets: DenomAllowList| -> Result<AssetBurnGate> {
        Ok(AssetBurnGate {
            community_pool: DenomAllowList::default(),
            holder: Some(holder.parse()?),
            allowlist: assets,
        })
    };
    Ok(NetworkTable::default()
        .with(
            MAINNET_CHAIN_ID,
            recovery_burn(
                MAINNET_RECOVERY_CONTRACT,
                DenomAllowList::new(MAINNET_BRIDGED_ASSETS),
            )?,
        )
        .with(
            TESTNET_CHAIN_ID,
            recovery_burn(
                TESTNET_RECOVERY_CONTRACT,
                DenomAllowList::new([TESTNET_BURN_ASSET]),
            )?,
        )
        .with(
            LOCAL_TEST_CHAIN_ID,
            recovery_burn(LOCAL_RECOVERY_CONTRACT, DenomAllowList::new([LOCAL_BURN_ASSET]))?,
        ))
}

fn asset_burn_steps(gate: &AssetBurnGate) -> Vec<MigrationStep> {
    let mut steps = Vec::new();
    if !gate.community_pool.is_empty() {
        steps.push(MigrationStep::BurnCommunityPool {
            allowlist: gate.community_pool.clone(),
        });
    }
    if let Some(holder) = &gate.holder {
        if !gate.allowlist.is_empty() {
            steps.push(MigrationStep::BurnFromAccount {
                account: holder.clone(),
                allowlist: gate.allowlist.clone(),
            });
        }
    }
    steps
}

/// Built-in plans for `chain_id`.
pub fn upgrade_plans(chain_id: &str) -> Result<Vec<MigrationPlan>> {
    upgrade_plans_with(chain_id, &NetworkOverrides::default())
}

/// Built-in plans for `chain_id`, with operator overrides merged over the
/// network tables.
pub fn upgrade_plans_with(
    chain_id: &str,
    overrides: &NetworkOverrides,
) -> Result<Vec<MigrationPlan>> {
    let mut v2_12_table = v2_12_networks()?;
    overrides.apply_unwind(V2_12, &mut v2_12_table);
    let mut v2_13_table = v2_13_networks()?;
    overrides.apply_asset_burn(V2_13, &mut v2_13_table);
    let mut v2_14_table = v2_14_networks()?;
    overrides.apply_asset_burn(V2_14, &mut v2_14_table);

    let v2_3_0 = builtin(V2_3_0).with_step(MigrationStep::AdoptModuleVersion {
        module: TOKENFACTORY_MODULE.to_string(),
    });

    // Their parameter writes (feeshare, interchain queries, IBC light
    // clients) belong to modules this ledger does not model; they only
    // advance module versions.
    let v2_6 = builtin(V2_6);
    let v2_7 = builtin(V2_7);
    let v2_9 = builtin(V2_9);
    let v2_10 = builtin(V2_10);

    let mut v2_12 = builtin(V2_12).with_step(MigrationStep::EnforceCommissionFloor {
        floor: v2_12_commission_floor()?,
    });
    let unwind = v2_12_table.resolve(chain_id);
    if !unwind.is_noop() {
        v2_12 = v2_12.with_step(MigrationStep::UnwindAndBurn {
            accounts: unwind.accounts.clone(),
        });
    }

    let mut v2_13 = builtin(V2_13);
    v2_13.steps = asset_burn_steps(v2_13_table.resolve(chain_id));

    let mut v2_14 = builtin(V2_14);
    v2_14.steps = asset_burn_steps(v2_14_table.resolve(chain_id));

    let plans = vec![v2_3_0, v2_6, v2_7, v2_9, v2_10, v2_12, v2_13, v2_14];
    debug!(
        target: "upgrades",
        chain_id,
        plans = plans.len(),
        "built-in upgrade plans resolved"
    );
    Ok(plans)
}

/// The built-in plan called `name`, if any.
pub fn find_plan(
    chain_id: &str,
    overrides: &NetworkOverrides,
    name: &str,
) -> Result<MigrationPlan> {
    upgrade_plans_with(chain_id, overrides)?
        .into_iter()
        .find(|plan| plan.name == name)
        .ok_or_else(|| MigrationError::UnknownPlan(name.to_string()))
}
