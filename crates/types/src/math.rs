//! Exact ratio arithmetic for token amounts and decimal shares.
//!
//! A token amount times a share count overflows the 96-bit mantissa of
//! `Decimal` long before either operand does (two 2e14 positions already
//! exceed it), so the products here are computed in arbitrary precision and
//! only the final quotient is narrowed.

use num_bigint::BigUint;
use rust_decimal::Decimal;

/// Fractional digits kept when a ratio is stored as shares.
pub const SHARE_PRECISION: u32 = 18;

/// `floor(value * numerator / denominator)`.
///
/// `None` when the denominator is zero or the quotient does not fit `u128`.
pub fn mul_div_floor(value: u128, numerator: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    let quotient = BigUint::from(value) * BigUint::from(numerator) / BigUint::from(denominator);
    u128::try_from(quotient).ok()
}

/// `floor(value * numerator / denominator)` for non-negative decimal
/// operands.
pub fn mul_div_decimal_floor(value: u128, numerator: Decimal, denominator: Decimal) -> Option<u128> {
    if denominator.is_zero() {
        return None;
    }
    let (num_mantissa, num_scale) = decompose(numerator)?;
    let (den_mantissa, den_scale) = decompose(denominator)?;
    let quotient =
        BigUint::from(value) * num_mantissa * den_scale / (den_mantissa * num_scale);
    u128::try_from(quotient).ok()
}

/// `value * numerator / denominator` as a decimal, truncated to at most
/// [`SHARE_PRECISION`] fractional digits (fewer when the integer part needs
/// the room).
pub fn ratio_to_decimal(value: u128, numerator: Decimal, denominator: u128) -> Option<Decimal> {
    if denominator == 0 {
        return None;
    }
    let (num_mantissa, num_scale) = decompose(numerator)?;
    let dividend = BigUint::from(value) * num_mantissa;
    let divisor = BigUint::from(denominator) * num_scale;

    for scale in (0..=SHARE_PRECISION).rev() {
        let scaled = &dividend * BigUint::from(10u32).pow(scale) / &divisor;
        let Ok(mantissa) = i128::try_from(scaled) else {
            continue;
        };
        if let Ok(ratio) = Decimal::try_from_i128_with_scale(mantissa, scale) {
            return Some(ratio.normalize());
        }
    }
    None
}

/// `(mantissa, 10^scale)` of a non-negative decimal.
fn decompose(value: Decimal) -> Option<(BigUint, BigUint)> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let mantissa = u128::try_from(value.mantissa()).ok()?;
    Some((BigUint::from(mantissa), BigUint::from(10u32).pow(value.scale())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    #[test]
    fn mul_div_truncates() {
        assert_eq!(mul_div_floor(10, 2, 3), Some(6));
        assert_eq!(mul_div_floor(u128::MAX, 3, 3), Some(u128::MAX));
        assert_eq!(mul_div_floor(u128::MAX, 2, 1), None);
        assert_eq!(mul_div_floor(1, 1, 0), None);
    }

    #[test]
    fn decimal_products_past_the_mantissa_range() {
        // 2e14 * 4e14 = 8e28 does not fit a Decimal mantissa.
        let value = mul_div_decimal_floor(
            400_000_000_000_000,
            dec("200000000000000"),
            dec("400000000000000"),
        );
        assert_eq!(value, Some(200_000_000_000_000));
        assert_eq!(mul_div_decimal_floor(900, dec("333"), dec("1000")), Some(299));
        assert_eq!(mul_div_decimal_floor(900, dec("-1"), dec("1000")), None);
        assert_eq!(mul_div_decimal_floor(900, dec("1"), Decimal::ZERO), None);
    }

    #[test]
    fn ratio_keeps_share_precision() {
        assert_eq!(ratio_to_decimal(100, dec("1000"), 900), Some(dec("111.111111111111111111")));
        assert_eq!(ratio_to_decimal(300, dec("300"), 300), Some(Decimal::from(300)));

        let big = ratio_to_decimal(
            200_000_000_000_000,
            dec("400000000000000.5"),
            400_000_000_000_000,
        )
        .unwrap();
        assert_eq!(big.trunc(), Decimal::from(200_000_000_000_000u64));
        assert!(big > Decimal::from(200_000_000_000_000u64));
    }
}
