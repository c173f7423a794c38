//! Fixed-point arithmetic helpers.
//!
//! Every product and quotient is rounded to [`constants::DECIMAL_PRECISION`]
//! fractional digits with banker's rounding, so the same inputs produce the
//! same digits on every replica. Overflow surfaces as
//! [`AmmbatchError::Overflow`] instead of a panic.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{AmmbatchError, Result, constants::DECIMAL_PRECISION};

/// Round to the engine precision (banker's rounding).
#[must_use]
pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PRECISION, RoundingStrategy::MidpointNearestEven)
}

/// `a + b`, failing with [`AmmbatchError::Overflow`] outside the decimal range.
pub fn add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| AmmbatchError::overflow(format!("{a} + {b}")))
}

pub fn sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b)
        .ok_or_else(|| AmmbatchError::overflow(format!("{a} - {b}")))
}

/// `a * b`, rounded to the engine precision.
pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_mul(b)
        .map(round)
        .ok_or_else(|| AmmbatchError::overflow(format!("{a} * {b}")))
}

/// `a * b`, truncated to the engine precision.
pub fn mul_truncate(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_mul(b)
        .map(|v| v.round_dp_with_strategy(DECIMAL_PRECISION, RoundingStrategy::ToZero))
        .ok_or_else(|| AmmbatchError::overflow(format!("{a} * {b}")))
}

/// `a / b`, rounded to the engine precision.
pub fn quo(a: Decimal, b: Decimal) -> Result<Decimal> {
    if b.is_zero() {
        return Err(AmmbatchError::DivisionByZero {
            operation: format!("{a} / 0"),
        });
    }
    a.checked_div(b)
        .map(round)
        .ok_or_else(|| AmmbatchError::overflow(format!("{a} / {b}")))
}

/// `a / b`, truncated to the engine precision.
pub fn quo_truncate(a: Decimal, b: Decimal) -> Result<Decimal> {
    if b.is_zero() {
        return Err(AmmbatchError::DivisionByZero {
            operation: format!("{a} / 0"),
        });
    }
    a.checked_div(b)
        .map(|v| v.round_dp_with_strategy(DECIMAL_PRECISION, RoundingStrategy::ToZero))
        .ok_or_else(|| AmmbatchError::overflow(format!("{a} / {b}")))
}

/// Smallest integer `>= value`.
#[must_use]
pub fn ceil(value: Decimal) -> Decimal {
    value.ceil()
}

/// Largest integer `<= value`.
#[must_use]
pub fn floor(value: Decimal) -> Decimal {
    value.floor()
}

/// Integer part of `value` (rounds toward zero).
#[must_use]
pub fn truncate(value: Decimal) -> Decimal {
    value.trunc()
}

/// Whether `value` has no fractional part.
#[must_use]
pub fn is_integral(value: Decimal) -> bool {
    value.fract().is_zero()
}

/// Checked multiply-then-divide round trip over `a` and `b`.
///
/// Fails with [`AmmbatchError::Overflow`] when `a * b`, `a / b`, or `b / a`
/// cannot be represented, including when either operand is zero.
pub fn check_overflow(a: Decimal, b: Decimal) -> Result<()> {
    let op = || format!("overflow check of {a} and {b}");
    if a.checked_mul(b).is_none() {
        return Err(AmmbatchError::overflow(op()));
    }
    if b.is_zero() || a.checked_div(b).is_none() {
        return Err(AmmbatchError::overflow(op()));
    }
    if a.is_zero() || b.checked_div(a).is_none() {
        return Err(AmmbatchError::overflow(op()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn quo_rounds_to_eighteen_digits() {
        let third = quo(Decimal::ONE, Decimal::new(3, 0)).unwrap();
        assert_eq!(third, dec("0.333333333333333333"));
        let two_thirds = quo(Decimal::TWO, Decimal::new(3, 0)).unwrap();
        assert_eq!(two_thirds, dec("0.666666666666666667"));
    }

    #[test]
    fn truncating_variants_round_toward_zero() {
        let two_thirds = quo_truncate(Decimal::TWO, Decimal::new(3, 0)).unwrap();
        assert_eq!(two_thirds, dec("0.666666666666666666"));
        let product = mul_truncate(dec("0.666666666666666666"), dec("0.5")).unwrap();
        assert_eq!(product, dec("0.333333333333333333"));
    }

    #[test]
    fn mul_uses_bankers_rounding() {
        // 0.0000000000000000005 sits exactly on the midpoint at 18 digits.
        let v = mul(dec("0.000000000000000001"), dec("0.5")).unwrap();
        assert_eq!(v, Decimal::ZERO);
        let v = mul(dec("0.000000000000000003"), dec("0.5")).unwrap();
        assert_eq!(v, dec("0.000000000000000002"));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let err = quo(Decimal::ONE, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, AmmbatchError::DivisionByZero { .. }));
    }

    #[test]
    fn rounding_primitives() {
        assert_eq!(ceil(dec("349.000000000000000001")), Decimal::new(350, 0));
        assert_eq!(floor(dec("-0.5")), Decimal::NEGATIVE_ONE);
        assert_eq!(truncate(dec("-0.5")), Decimal::ZERO);
        assert_eq!(truncate(dec("150.9")), Decimal::new(150, 0));
        assert!(is_integral(Decimal::new(1000, 0)));
        assert!(!is_integral(dec("10.01")));
    }

    #[test]
    fn overflow_check_round_trip() {
        assert!(check_overflow(Decimal::new(10_000, 0), dec("1.1")).is_ok());
        assert!(check_overflow(Decimal::MAX, Decimal::TWO).unwrap_err().is_overflow());
        assert!(check_overflow(Decimal::ZERO, Decimal::ONE).unwrap_err().is_overflow());
    }

    #[test]
    fn mul_overflow_is_error_not_panic() {
        let err = mul(Decimal::MAX, Decimal::new(10, 0)).unwrap_err();
        assert!(err.is_overflow());
    }

    #[test]
    fn add_and_sub_report_overflow() {
        assert_eq!(add(Decimal::ONE, Decimal::TWO).unwrap(), Decimal::new(3, 0));
        assert!(add(Decimal::MAX, Decimal::ONE).unwrap_err().is_overflow());
        assert!(sub(Decimal::MIN, Decimal::ONE).unwrap_err().is_overflow());
    }
}
