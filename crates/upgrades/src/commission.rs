//! Commission floor enforcement.

use crate::errors::{MigrationError, Result};
use luna_ledger::Ledger;
use luna_types::{Decimal, ValAddress};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A minimum commission rate in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct CommissionFloor(Decimal);

impl CommissionFloor {
    pub fn new(rate: Decimal) -> Result<Self> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(MigrationError::InvalidParameter(format!(
                "commission floor {rate} outside [0, 1]"
            )));
        }
        Ok(Self(rate))
    }

    pub fn rate(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for CommissionFloor {
    type Error = MigrationError;

    fn try_from(rate: Decimal) -> Result<Self> {
        Self::new(rate)
    }
}

impl From<CommissionFloor> for Decimal {
    fn from(floor: CommissionFloor) -> Self {
        floor.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionReport {
    pub floor: Decimal,
    pub examined: usize,
    /// Validators whose commission was raised, in operator order.
    pub raised: Vec<ValAddress>,
}

/// Raise every validator's `max_rate` and `rate` to at least `floor`.
///
/// Changed validators get `update_time` set to the block time and fire the
/// "before validator modified" hook; validators already at or above the
/// floor are left alone, so a second pass changes nothing. The normal
/// once-per-day and max-change-rate limits on commission edits do not apply.
pub fn enforce_commission_floor<L: Ledger + ?Sized>(
    ledger: &mut L,
    floor: CommissionFloor,
) -> CommissionReport {
    let now = ledger.header().time;
    let floor_rate = floor.rate();
    let validators = ledger.all_validators();
    let mut report = CommissionReport {
        floor: floor_rate,
        examined: validators.len(),
        raised: Vec::new(),
    };

    for mut validator in validators {
        let commission = &mut validator.commission;
        let mut changed = false;
        if commission.max_rate < floor_rate {
            commission.max_rate = floor_rate;
            changed = true;
        }
        if commission.rate < floor_rate {
            commission.rate = floor_rate;
            changed = true;
        }
        if !changed {
            continue;
        }

        commission.update_time = now;
        debug!(
            target: "upgrades",
            validator = %validator.operator,
            rate = %commission.rate,
            max_rate = %commission.max_rate,
            "commission raised to floor"
        );
        ledger.before_validator_modified(&validator.operator);
        report.raised.push(validator.operator.clone());
        ledger.set_validator(validator);
    }

    info!(
        target: "upgrades",
        floor = %floor_rate,
        examined = report.examined,
        raised = report.raised.len(),
        "commission floor enforced"
    );
    report
}

/// Record the floor as the staking `min_commission_rate` so later commission
/// edits and new validators respect it.
pub fn set_min_commission_param<L: Ledger + ?Sized>(
    ledger: &mut L,
    floor: CommissionFloor,
) -> Result<()> {
    let mut params = ledger.staking_params();
    params.min_commission_rate = floor.rate();
    ledger.set_staking_params(params)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use luna_ledger::{InMemoryLedger, StakingKeeper};
    use luna_types::{BlockHeader, BondStatus, Commission};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_floor_outside_unit_range_is_rejected() {
        assert!(CommissionFloor::new(dec("-0.01")).is_err());
        assert!(CommissionFloor::new(dec("1.01")).is_err());
        assert!(CommissionFloor::new(dec("1")).is_ok());
    }

    #[test]
    fn test_floor_serializes_as_decimal() {
        let floor = CommissionFloor::new(dec("0.05")).unwrap();
        let json = serde_json::to_string(&floor).unwrap();
        assert_eq!(json, "\"0.05\"");
        assert!(serde_json::from_str::<CommissionFloor>("\"2\"").is_err());
    }

    #[test]
    fn test_min_commission_param_is_set() {
        let mut ledger = InMemoryLedger::new(BlockHeader::new("phoenix-1", 1, Default::default()));
        let floor = CommissionFloor::new(dec("0.05")).unwrap();
        set_min_commission_param(&mut ledger, floor).unwrap();
        assert_eq!(ledger.staking_params().min_commission_rate, dec("0.05"));
    }

    #[test]
    fn test_only_low_validators_are_touched() {
        let mut ledger = InMemoryLedger::new(BlockHeader::new("phoenix-1", 1, Default::default()));
        let low = ValAddress::from_bytes(&[1; 20]).unwrap();
        let high = ValAddress::from_bytes(&[2; 20]).unwrap();
        ledger
            .create_validator(
                low.clone(),
                BondStatus::Bonded,
                Commission::new(dec("0.01"), dec("0.03"), dec("0.01"), Default::default()),
            )
            .unwrap();
        ledger
            .create_validator(
                high.clone(),
                BondStatus::Bonded,
                Commission::new(dec("0.10"), dec("0.20"), dec("0.01"), Default::default()),
            )
            .unwrap();

        let report = enforce_commission_floor(&mut ledger, CommissionFloor::new(dec("0.05")).unwrap());
        assert_eq!(report.examined, 2);
        assert_eq!(report.raised, vec![low.clone()]);

        let low_commission = ledger.validator(&low).unwrap().commission;
        assert_eq!(low_commission.rate, dec("0.05"));
        assert_eq!(low_commission.max_rate, dec("0.05"));
        assert_eq!(ledger.validator_modifications(&low), 1);
        assert_eq!(ledger.validator_modifications(&high), 0);
        assert_eq!(ledger.validator(&high).unwrap().commission.rate, dec("0.10"));
    }
}
