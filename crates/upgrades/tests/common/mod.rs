#![allow(dead_code)]

use luna_ledger::{BankKeeper, InMemoryLedger, BONDED_POOL_NAME, NOT_BONDED_POOL_NAME};
use luna_types::*;

pub fn acc(byte: u8) -> AccAddress {
    AccAddress::from_bytes(&[byte; 20]).unwrap()
}

pub fn val(byte: u8) -> ValAddress {
    ValAddress::from_bytes(&[byte; 20]).unwrap()
}

pub fn dec(raw: &str) -> Decimal {
    raw.parse().unwrap()
}

pub fn luna(amount: u128) -> Coins {
    Coins::single(Coin::new(BOND_DENOM, amount))
}

pub fn commission(rate: &str, max_rate: &str) -> Commission {
    Commission::new(dec(rate), dec(max_rate), dec("0.01"), Default::default())
}

pub fn ledger(chain_id: &str) -> InMemoryLedger {
    InMemoryLedger::new(BlockHeader::new(chain_id, 1_000, Default::default()))
}

/// Ledger with a bonded validator `0xB0` and an unbonded validator `0xC0`.
pub fn staked_ledger(chain_id: &str) -> InMemoryLedger {
    let mut ledger = ledger(chain_id);
    ledger
        .create_validator(val(0xB0), BondStatus::Bonded, commission("0.10", "0.20"))
        .unwrap();
    ledger
        .create_validator(val(0xC0), BondStatus::Unbonded, commission("0.02", "0.04"))
        .unwrap();
    ledger
}

pub fn pool_total(ledger: &InMemoryLedger) -> u128 {
    ledger.balance(&AccAddress::for_module(BONDED_POOL_NAME), BOND_DENOM)
        + ledger.balance(&AccAddress::for_module(NOT_BONDED_POOL_NAME), BOND_DENOM)
}
