//! Daily compounding arithmetic.
//!
//! Rates are multiplicative growth factors per day scaled by [`UNIT`]; a rate
//! of `UNIT` means no growth. Only whole elapsed days count.

use crate::types::price::{mul_div, UNIT};
use crate::types::{Timestamp, DAY};

/// Whole days between `since` and `now` (0 if `now` is earlier).
#[inline]
pub fn elapsed_days(since: Timestamp, now: Timestamp) -> u64 {
    now.saturating_sub(since) / DAY
}

/// `rate^days / UNIT^(days - 1)`, i.e. the growth factor over `days` scaled
/// by `UNIT`.
///
/// Exponentiation by squaring; every multiplication floors. Returns `None`
/// when the factor no longer fits in `u128`.
///
/// ```
/// use pegged_exchange::ledger::compound;
/// use pegged_exchange::types::price::UNIT;
///
/// assert_eq!(compound(2 * UNIT, 3), Some(8 * u128::from(UNIT)));
/// assert_eq!(compound(2 * UNIT, 0), Some(u128::from(UNIT)));
/// ```
pub fn compound(rate: u64, days: u64) -> Option<u128> {
    let unit = u128::from(UNIT);
    let mut result = unit;
    let mut base = u128::from(rate);
    let mut n = days;
    while n > 0 {
        if n & 1 == 1 {
            result = mul_div(result, base, unit)?;
        }
        n >>= 1;
        if n > 0 {
            base = mul_div(base, base, unit)?;
        }
    }
    Some(result)
}

/// `principal` grown at `rate` for `days` (floor).
pub fn accrue(principal: u64, rate: u64, days: u64) -> Option<u64> {
    if days == 0 || principal == 0 {
        return Some(principal);
    }
    let factor = compound(rate, days)?;
    let grown = mul_div(principal.into(), factor, UNIT.into())?;
    u64::try_from(grown).ok()
}

/// Growth only: `accrue(principal, rate, days) - principal`.
pub fn growth(principal: u64, rate: u64, days: u64) -> Option<u64> {
    accrue(principal, rate, days).map(|grown| grown.saturating_sub(principal))
}
