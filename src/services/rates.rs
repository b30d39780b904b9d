//! Landing-rate arithmetic.
//!
//! All money is `rust_decimal::Decimal`, rounded half-up (midpoint away from
//! zero) to two places at the points documented below. Products and sums of
//! amounts saturate at `Decimal::MAX` instead of overflowing.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::numeric::clamp_non_negative;

pub const CURRENCY_DECIMAL_PLACES: u32 = 2;
pub const VOLUME_DECIMAL_PLACES: u32 = 3;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

fn bound(negative: bool) -> Decimal {
    if negative {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

/// `a * b`, saturating at `Decimal::MAX` / `Decimal::MIN`.
pub fn saturating_mul(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b)
        .unwrap_or_else(|| bound(a.is_sign_negative() != b.is_sign_negative()))
}

/// `a + b`, saturating at `Decimal::MAX` / `Decimal::MIN`.
pub fn saturating_add(a: Decimal, b: Decimal) -> Decimal {
    // Overflow needs both operands on the same side of zero.
    a.checked_add(b).unwrap_or_else(|| bound(b.is_sign_negative()))
}

/// Rounds a money amount to two places, half-up.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a volume (litres) to three places, half-up.
pub fn round_volume(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(VOLUME_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Tax-inclusive unit price: `basic + basic * tax% / 100`, rounded to 2 places.
///
/// Negative inputs are treated as zero.
pub fn compute_landing_rate(basic_rate: Decimal, tax_rate_percent: Decimal) -> Decimal {
    round_currency(unrounded_landing_rate(basic_rate, tax_rate_percent))
}

fn unrounded_landing_rate(basic_rate: Decimal, tax_rate_percent: Decimal) -> Decimal {
    let basic = clamp_non_negative(basic_rate);
    let tax = clamp_non_negative(tax_rate_percent);
    saturating_add(basic, saturating_mul(basic, tax / HUNDRED))
}

/// `landing_rate * quantity`, rounded to 2 places.
pub fn compute_line_total(landing_rate: Decimal, quantity: u64) -> Decimal {
    round_currency(saturating_mul(
        clamp_non_negative(landing_rate),
        Decimal::from(quantity),
    ))
}

/// Derived tax carried by one line: `round(landing) * qty - basic * qty`.
///
/// Left unrounded so callers summing many lines round only once.
pub fn line_tax(basic_rate: Decimal, tax_rate_percent: Decimal, quantity: u64) -> Decimal {
    let qty = Decimal::from(quantity);
    let landing = compute_landing_rate(basic_rate, tax_rate_percent);
    saturating_mul(landing, qty) - saturating_mul(clamp_non_negative(basic_rate), qty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(100), dec!(18), dec!(118.00))]
    #[case(dec!(50), dec!(0), dec!(50.00))]
    #[case(dec!(450), dec!(12), dec!(504.00))]
    #[case(dec!(99.99), dec!(5), dec!(104.99))]
    #[case(dec!(0), dec!(28), dec!(0.00))]
    fn landing_rate_examples(
        #[case] basic: Decimal,
        #[case] tax: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(compute_landing_rate(basic, tax), expected);
    }

    #[test]
    fn landing_rate_rounds_half_up() {
        // 10.05 * 1.05 = 10.5525 -> 10.55
        assert_eq!(compute_landing_rate(dec!(10.05), dec!(5)), dec!(10.55));
        // 0.10 * 1.05 = 0.105 -> 0.11 (banker's rounding would give 0.10)
        assert_eq!(compute_landing_rate(dec!(0.10), dec!(5)), dec!(0.11));
    }

    #[test]
    fn negative_inputs_are_treated_as_zero() {
        assert_eq!(compute_landing_rate(dec!(-10), dec!(18)), dec!(0));
        assert_eq!(compute_landing_rate(dec!(100), dec!(-18)), dec!(100.00));
        assert_eq!(compute_line_total(dec!(-5), 3), dec!(0));
    }

    #[test]
    fn line_total_multiplies_and_rounds() {
        assert_eq!(compute_line_total(dec!(118.00), 2), dec!(236.00));
        assert_eq!(compute_line_total(dec!(10.555), 1), dec!(10.56));
        assert_eq!(compute_line_total(dec!(118.00), 0), dec!(0.00));
    }

    #[test]
    fn line_tax_is_landing_minus_basic() {
        assert_eq!(line_tax(dec!(100), dec!(18), 2), dec!(36.00));
        assert_eq!(line_tax(dec!(50), dec!(0), 4), dec!(0));
    }

    #[test]
    fn extreme_magnitudes_saturate() {
        assert_eq!(compute_landing_rate(Decimal::MAX, dec!(18)), Decimal::MAX);
        assert_eq!(compute_line_total(Decimal::MAX, u64::MAX), Decimal::MAX);
        assert_eq!(compute_line_total(dec!(1000000000000), u64::MAX), Decimal::MAX);
        assert_eq!(line_tax(Decimal::MAX, dec!(18), u64::MAX), Decimal::ZERO);
        assert_eq!(saturating_add(Decimal::MAX, dec!(0.01)), Decimal::MAX);
        assert_eq!(saturating_add(Decimal::MIN, dec!(-1)), Decimal::MIN);
        assert_eq!(saturating_mul(Decimal::MAX, dec!(-2)), Decimal::MIN);
        assert_eq!(saturating_mul(dec!(2), dec!(3)), dec!(6));
    }

    #[test]
    fn round_currency_keeps_two_places() {
        assert_eq!(round_currency(dec!(1234.5)), dec!(1234.50));
        assert_eq!(round_currency(dec!(1234.567)).to_string(), "1234.57");
        assert_eq!(round_currency(dec!(2.345)), dec!(2.35));
    }
}
