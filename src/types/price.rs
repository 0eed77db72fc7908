//! Fixed-point amount, rate and price utilities.
//!
//! ## Overview
//!
//! Token amounts are `u64` raw units in each token's own decimals (6 for both
//! tokens by default). Rates, the exchange fee and the price floor use a
//! separate fixed-point base, [`UNIT`] = 10^18. All intermediate products are
//! computed in `u128` and truncated toward zero.
//!
//! ## Prices
//!
//! An order's implied limit price is `dest / src`. Before two amounts in
//! different tokens are compared they are brought to a common scale, the larger
//! of the two token precisions; see [`Normalizer`].
//!
//! ## Examples
//!
//! ```
//! use pegged_exchange::types::price::{to_units, from_units};
//!
//! let amount = to_units("1.008", 6).unwrap();
//! assert_eq!(amount, 1_008_000);
//! assert_eq!(from_units(amount, 6), "1.008000");
//! ```

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::types::Asset;

/// Fixed-point base for rates, fees and prices: 10^18.
pub const UNIT: u64 = 1_000_000_000_000_000_000;

/// Largest token precision accepted by the configuration.
pub const MAX_DECIMALS: u8 = 18;

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert a decimal string to raw token units, truncating extra digits.
///
/// Returns `None` for negative values, parse errors and values that do not
/// fit in `u64`.
///
/// ```
/// use pegged_exchange::types::price::to_units;
///
/// assert_eq!(to_units("1", 6), Some(1_000_000));
/// assert_eq!(to_units("0.0000019", 6), Some(1));
/// assert_eq!(to_units("-1", 6), None);
/// ```
pub fn to_units(s: &str, decimals: u8) -> Option<u64> {
    let decimal = Decimal::from_str(s).ok()?;
    if decimal.is_sign_negative() || decimals > MAX_DECIMALS {
        return None;
    }
    let scale = Decimal::from(10u64.checked_pow(decimals.into())?);
    decimal.checked_mul(scale)?.trunc().to_u64()
}

/// Format raw token units with exactly `decimals` fractional digits.
///
/// ```
/// use pegged_exchange::types::price::from_units;
///
/// assert_eq!(from_units(992_000, 6), "0.992000");
/// ```
pub fn from_units(value: u64, decimals: u8) -> String {
    let decimal = Decimal::from_i128_with_scale(value.into(), decimals.into());
    format!("{:.*}", usize::from(decimals), decimal)
}

/// Format raw token units with trailing zeros removed.
pub fn from_units_trimmed(value: u64, decimals: u8) -> String {
    let decimal = Decimal::from_i128_with_scale(value.into(), decimals.into());
    format!("{}", decimal.normalize())
}

// ============================================================================
// Arithmetic
// ============================================================================

/// `floor(a * b / c)` without intermediate overflow of `a * b`.
///
/// Returns `None` when `c == 0` or the result does not fit in `u128`.
///
/// ```
/// use pegged_exchange::types::price::mul_div;
///
/// assert_eq!(mul_div(10, 3, 4), Some(7));
/// assert_eq!(mul_div(u128::MAX, 2, 4), Some(u128::MAX / 2));
/// ```
pub fn mul_div(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    // floor(a*b/c) == (a/c)*b + floor((a%c)*b/c)
    let whole = (a / c).checked_mul(b)?;
    let rest = (a % c).checked_mul(b)? / c;
    whole.checked_add(rest)
}

/// `ceil(a * b / c)`.
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> Option<u128> {
    let floor = mul_div(a, b, c)?;
    // a*b mod c == ((a mod c) * b) mod c
    if (a % c).checked_mul(b)? % c == 0 {
        Some(floor)
    } else {
        floor.checked_add(1)
    }
}

/// `floor(a * b / c)` narrowed to `u64`.
pub fn mul_div_u64(a: u64, b: u64, c: u64) -> Option<u64> {
    mul_div(a.into(), b.into(), c.into()).and_then(|v| u64::try_from(v).ok())
}

/// Compare `a * b` with `c * d` exactly, using a 256-bit product.
///
/// ```
/// use std::cmp::Ordering;
/// use pegged_exchange::types::price::mul_cmp;
///
/// assert_eq!(mul_cmp(u128::MAX, 2, u128::MAX, 3), Ordering::Less);
/// assert_eq!(mul_cmp(6, 4, 8, 3), Ordering::Equal);
/// ```
pub fn mul_cmp(a: u128, b: u128, c: u128, d: u128) -> Ordering {
    widening_mul(a, b).cmp(&widening_mul(c, d))
}

/// Full product as `(high, low)` halves.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let lo_lo = a_lo * b_lo;
    let hi_lo = a_hi * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_hi = a_hi * b_hi;

    // At most 3 * (2^64 - 1), no overflow
    let mid = (lo_lo >> 64) + (hi_lo & MASK) + (lo_hi & MASK);
    let low = (lo_lo & MASK) | (mid << 64);
    let high = hi_hi + (hi_lo >> 64) + (lo_hi >> 64) + (mid >> 64);
    (high, low)
}

/// Compare two values with a tolerance (for testing)
pub fn approx_eq(a: u64, b: u64, tolerance: u64) -> bool {
    a.abs_diff(b) <= tolerance
}

// ============================================================================
// Price normalization
// ============================================================================

/// Brings amounts of both tokens to a common precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    native_decimals: u8,
    stable_decimals: u8,
}

impl Normalizer {
    pub fn new(native_decimals: u8, stable_decimals: u8) -> Self {
        Self {
            native_decimals: native_decimals.min(MAX_DECIMALS),
            stable_decimals: stable_decimals.min(MAX_DECIMALS),
        }
    }

    pub fn decimals(&self, asset: Asset) -> u8 {
        match asset {
            Asset::Native => self.native_decimals,
            Asset::Stable => self.stable_decimals,
        }
    }

    fn factor(&self, asset: Asset) -> u128 {
        let common = self.native_decimals.max(self.stable_decimals);
        10u128.pow(u32::from(common - self.decimals(asset)))
    }

    /// Amount expressed at the common precision.
    pub fn normalize(&self, asset: Asset, amount: u64) -> u128 {
        u128::from(amount) * self.factor(asset)
    }

    /// Convert a common-precision amount back to raw units (floor).
    pub fn denormalize(&self, asset: Asset, amount: u128) -> Option<u64> {
        u64::try_from(amount / self.factor(asset)).ok()
    }

    /// Implied limit price `dest / src` scaled by [`UNIT`].
    ///
    /// `src_asset` is the asset being sold; `dest` is denominated in the other
    /// asset.
    pub fn price(&self, src_asset: Asset, src: u64, dest: u64) -> Option<u128> {
        let src = self.normalize(src_asset, src);
        let dest = self.normalize(src_asset.other(), dest);
        mul_div(dest, UNIT.into(), src)
    }

    /// Stable value of `native` units at `price` stable-per-native (floor).
    pub fn native_to_stable(&self, native: u64, price: u64) -> Option<u64> {
        let value = mul_div(self.normalize(Asset::Native, native), price.into(), UNIT.into())?;
        self.denormalize(Asset::Stable, value)
    }

    /// Native units bought by `stable` at `price` stable-per-native (floor).
    pub fn stable_to_native(&self, stable: u64, price: u64) -> Option<u64> {
        let value = mul_div(self.normalize(Asset::Stable, stable), UNIT.into(), price.into())?;
        self.denormalize(Asset::Native, value)
    }

    /// Native units needed to be worth at least `stable` at `price` (ceil).
    pub fn stable_to_native_ceil(&self, stable: u64, price: u64) -> Option<u64> {
        let value = mul_div_ceil(self.normalize(Asset::Stable, stable), UNIT.into(), price.into())?;
        u64::try_from(value.div_ceil(self.factor(Asset::Native))).ok()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(6, 6)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
