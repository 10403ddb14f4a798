//! Discount arithmetic
//!
//! Minor-unit helpers shared by the result types: percentages of an amount,
//! line totals, and proportional allocation of a discount across lines.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::MoneyError;
use smallvec::SmallVec;
use thiserror::Error;

/// Errors specific to discount calculations.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// Minor unit arithmetic overflowed.
    #[error("minor unit arithmetic overflowed")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Build a percentage from percent points (`10` means 10%).
///
/// # Errors
///
/// Returns `DiscountError::PercentConversion` if `points` is not finite.
pub fn percentage_from_points(points: f64) -> Result<Percentage, DiscountError> {
    if !points.is_finite() {
        return Err(DiscountError::PercentConversion);
    }

    Ok(Percentage::from(points / 100.0))
}

/// Convert a fractional percentage back to percent points for display.
pub fn percent_points(percent: Percentage) -> Decimal {
    (percent * Decimal::ONE_HUNDRED).round_dp(2).normalize()
}

/// Calculate the discount amount in minor units based on a percentage and a minor unit amount.
///
/// # Errors
///
/// Returns `DiscountError::PercentConversion` if the calculation overflows or
/// cannot be represented in minor units.
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    ((*percent) * Decimal::ONE) // decimal_percentage doesn't expose the underlying Decimal
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}

/// Multiply a unit price in minor units by a quantity.
///
/// # Errors
///
/// Returns `DiscountError::Overflow` if the product does not fit in an `i64`.
pub fn line_minor(unit_minor: i64, quantity: u32) -> Result<i64, DiscountError> {
    unit_minor
        .checked_mul(i64::from(quantity))
        .ok_or(DiscountError::Overflow)
}

/// Split `amount` across `weights` in proportion to each weight.
///
/// Uses largest-remainder rounding, so the returned shares always sum to
/// `amount`. Remainder ties go to the earliest weight. When every weight is
/// zero (or negative) nothing can be allocated and all shares are zero.
///
/// # Errors
///
/// Returns `DiscountError::Overflow` if intermediate sums overflow.
pub fn allocate_minor(amount: i64, weights: &[i64]) -> Result<SmallVec<[i64; 8]>, DiscountError> {
    let total = weights
        .iter()
        .map(|weight| (*weight).max(0))
        .try_fold(0_i64, i64::checked_add)
        .ok_or(DiscountError::Overflow)?;

    if total == 0 || amount == 0 {
        return Ok(weights.iter().map(|_| 0).collect());
    }

    let amount_dec = Decimal::from_i64(amount).ok_or(DiscountError::Overflow)?;
    let total_dec = Decimal::from_i64(total).ok_or(DiscountError::Overflow)?;

    let mut shares: SmallVec<[i64; 8]> = SmallVec::with_capacity(weights.len());
    let mut remainders: SmallVec<[(usize, Decimal); 8]> = SmallVec::with_capacity(weights.len());

    for (idx, weight) in weights.iter().enumerate() {
        let weight_dec = Decimal::from_i64((*weight).max(0)).ok_or(DiscountError::Overflow)?;

        let exact = amount_dec
            .checked_mul(weight_dec)
            .and_then(|value| value.checked_div(total_dec))
            .ok_or(DiscountError::Overflow)?;

        let floor = exact.floor();

        shares.push(floor.to_i64().ok_or(DiscountError::Overflow)?);
        remainders.push((idx, exact - floor));
    }

    let allocated = shares
        .iter()
        .try_fold(0_i64, |acc, share| acc.checked_add(*share))
        .ok_or(DiscountError::Overflow)?;

    let mut leftover = amount - allocated;

    // Stable sort keeps earlier lines first on equal remainders.
    remainders.sort_by(|a, b| b.1.cmp(&a.1));

    for (idx, _) in remainders {
        if leftover <= 0 {
            break;
        }

        if let Some(share) = shares.get_mut(idx) {
            *share += 1;
            leftover -= 1;
        }
    }

    Ok(shares)
}
