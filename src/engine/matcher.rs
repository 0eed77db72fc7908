//! Crossing detection and fill quoting.
//!
//! Everything here is pure arithmetic on order amounts; settlement lives in
//! [`crate::engine::Exchange`].
//!
//! ## Crossing
//!
//! A maker gives `maker.src` for `maker.dest`, a taker gives `taker.src` for
//! `taker.dest`, and `maker.src` is the asset the taker wants. They cross iff
//! the maker asks no more than the taker offers:
//!
//! ```text
//! maker.dest / maker.src <= taker.src / taker.dest
//! <=> maker.src * taker.src >= maker.dest * taker.dest
//! ```
//!
//! Both sides of the inequality are in `(asset A) * (asset B)` raw units, so
//! token decimals cancel out.

use std::cmp::Ordering;

use crate::types::price::{mul_cmp, mul_div_ceil, mul_div_u64, Normalizer, UNIT};
use crate::types::{Asset, Order};

/// Amounts exchanged by one fill, before any fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    /// Units of the maker's source asset (what the taker wants)
    pub maker_gives: u64,
    /// Units of the taker's source asset
    pub taker_gives: u64,
}

/// Whether `maker` satisfies the limit of `taker`.
pub fn crosses(maker: &Order, taker: &Order) -> bool {
    u128::from(maker.src_amount) * u128::from(taker.src_amount)
        >= u128::from(maker.dest_amount) * u128::from(taker.dest_amount)
}

/// Fill against a resting maker, priced at the maker's own ratio.
///
/// The maker delivers as much as the taker's remaining source buys, capped by
/// the maker's remainder; the taker pays `y * maker.dest / maker.src`. Both
/// amounts floor. Returns `None` when either side would be zero.
///
/// ```
/// use pegged_exchange::engine::quote;
/// use pegged_exchange::types::{Address, Order, Side, Uid};
///
/// // Maker sells 0.9 native for 1.0 stable
/// let maker = Order::new(Uid::new(Side::Sell, 1, Address::from_low_u64_be(1)), 900_000, 1_000_000);
/// let leg = quote(&maker, 500_000).unwrap();
/// assert_eq!(leg.maker_gives, 450_000);
/// assert_eq!(leg.taker_gives, 500_000);
/// ```
pub fn quote(maker: &Order, taker_remaining: u64) -> Option<Leg> {
    let affordable = mul_div_u64(taker_remaining, maker.src_amount, maker.dest_amount)?;
    let maker_gives = maker.remaining().min(affordable);
    if maker_gives == 0 {
        return None;
    }
    let taker_gives = mul_div_u64(maker_gives, maker.dest_amount, maker.src_amount)?;
    if taker_gives == 0 {
        return None;
    }
    Some(Leg {
        maker_gives,
        taker_gives,
    })
}

/// Split a gross native amount into `(net, fee)`.
///
/// `net = gross * UNIT / fee_rate` (floor), the fee is the rest, so rounding
/// dust goes to the fee.
///
/// ```
/// use pegged_exchange::engine::split_fee;
///
/// assert_eq!(split_fee(1_008_000, 1_008_000_000_000_000_000), Some((1_000_000, 8_000)));
/// ```
pub fn split_fee(gross: u64, fee_rate: u64) -> Option<(u64, u64)> {
    let net = mul_div_u64(gross, UNIT, fee_rate)?;
    Some((net, gross - net))
}

/// Gross native amount whose net after fee is at least `net`.
pub fn gross_for_net(net: u64, fee_rate: u64) -> Option<u64> {
    let gross = mul_div_ceil(net.into(), fee_rate.into(), UNIT.into())?;
    u64::try_from(gross).ok()
}

/// Whether the native price implied by `stable` for `native` is at least
/// `min_price`.
pub fn at_or_above_floor(normalizer: &Normalizer, native: u64, stable: u64, min_price: u64) -> bool {
    mul_cmp(
        normalizer.normalize(Asset::Stable, stable),
        UNIT.into(),
        normalizer.normalize(Asset::Native, native),
        min_price.into(),
    ) != Ordering::Less
}

/// Inventory sale: the exchange sells native to a buyer at `min_price`.
///
/// `stable_remaining` is what the buyer still offers, `native_available` the
/// exchange's own native balance.
pub fn quote_inventory_sale(
    normalizer: &Normalizer,
    stable_remaining: u64,
    native_available: u64,
    min_price: u64,
) -> Option<Leg> {
    let wanted = normalizer.stable_to_native(stable_remaining, min_price)?;
    let native = wanted.min(native_available);
    if native == 0 {
        return None;
    }
    let stable = normalizer.native_to_stable(native, min_price)?;
    if stable == 0 {
        return None;
    }
    Some(Leg {
        maker_gives: native,
        taker_gives: stable,
    })
}

/// Inventory purchase: the exchange buys native from a seller at `min_price`,
/// paying for the amount net of fee.
///
/// `native_remaining` is what the seller still offers (fee included),
/// `stable_available` the exchange's own stable balance. When the stable
/// balance caps the fill, the seller delivers just enough native to cover it.
pub fn quote_inventory_purchase(
    normalizer: &Normalizer,
    native_remaining: u64,
    stable_available: u64,
    min_price: u64,
    fee_rate: u64,
) -> Option<Leg> {
    let (net, _) = split_fee(native_remaining, fee_rate)?;
    let stable = normalizer.native_to_stable(net, min_price)?;
    let gross = if stable <= stable_available {
        native_remaining
    } else {
        let net_needed = normalizer.stable_to_native_ceil(stable_available, min_price)?;
        gross_for_net(net_needed, fee_rate)?.min(native_remaining)
    };

    let (net, _) = split_fee(gross, fee_rate)?;
    let stable = normalizer
        .native_to_stable(net, min_price)?
        .min(stable_available);
    if gross == 0 || stable == 0 {
        return None;
    }
    Some(Leg {
        maker_gives: stable,
        taker_gives: gross,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, Side, Uid};

    const FEE: u64 = 1_008_000_000_000_000_000;

    fn order(side: Side, src: u64, dest: u64) -> Order {
        Order::new(Uid::new(side, 1, Address::from_low_u64_be(1)), src, dest)
    }

    #[test]
    fn test_crosses_exact_and_better() {
        // Maker sells 0.9 native for 1.0 stable; taker gives 1.0 stable for 0.9 native
        let maker = order(Side::Sell, 900_000, 1_000_000);
        assert!(crosses(&maker, &order(Side::Buy, 1_000_000, 900_000)));
        assert!(crosses(&maker, &order(Side::Buy, 1_000_000, 800_000)));
        assert!(!crosses(&maker, &order(Side::Buy, 1_000_000, 950_000)));
    }

    #[test]
    fn test_quote_capped_by_maker() {
        let maker = order(Side::Sell, 100, 200);
        let leg = quote(&maker, 1_000).unwrap();
        assert_eq!(leg, Leg { maker_gives: 100, taker_gives: 200 });
    }

    #[test]
    fn test_quote_rounds_down_to_none() {
        // One unit of stable cannot buy anything at 3 stable per native
        let maker = order(Side::Sell, 100, 300);
        assert_eq!(quote(&maker, 2), None);
        assert_eq!(quote(&maker, 3), Some(Leg { maker_gives: 1, taker_gives: 3 }));
    }

    #[test]
    fn test_split_fee_rounds_toward_protocol() {
        assert_eq!(split_fee(900_000, FEE), Some((892_857, 7_143)));
        assert_eq!(split_fee(1, FEE), Some((0, 1)));
        assert_eq!(split_fee(0, FEE), Some((0, 0)));
        assert_eq!(split_fee(500, UNIT), Some((500, 0)));
    }

    #[test]
    fn test_gross_for_net_round_trips() {
        let gross = gross_for_net(1_000_000, FEE).unwrap();
        assert_eq!(gross, 1_008_000);
        let gross = gross_for_net(333_334, FEE).unwrap();
        assert!(split_fee(gross, FEE).unwrap().0 >= 333_334);
    }

    #[test]
    fn test_floor_check() {
        let n = Normalizer::default();
        assert!(at_or_above_floor(&n, 1_000_000, 1_000_000, UNIT));
        assert!(!at_or_above_floor(&n, 1_000_001, 1_000_000, UNIT));
        assert!(at_or_above_floor(&n, 100_000, 1_000_000, UNIT));
    }

    #[test]
    fn test_inventory_sale_one_to_one() {
        let n = Normalizer::default();
        let leg = quote_inventory_sale(&n, 1_000_000, u64::MAX, UNIT).unwrap();
        assert_eq!(leg, Leg { maker_gives: 1_000_000, taker_gives: 1_000_000 });

        let capped = quote_inventory_sale(&n, 1_000_000, 400_000, UNIT).unwrap();
        assert_eq!(capped, Leg { maker_gives: 400_000, taker_gives: 400_000 });

        assert_eq!(quote_inventory_sale(&n, 1_000_000, 0, UNIT), None);
    }

    #[test]
    fn test_inventory_purchase_fee_included() {
        let n = Normalizer::default();
        let leg = quote_inventory_purchase(&n, 1_008_000, u64::MAX, UNIT, FEE).unwrap();
        assert_eq!(leg, Leg { maker_gives: 1_000_000, taker_gives: 1_008_000 });
    }

    #[test]
    fn test_inventory_purchase_capped_by_stable() {
        let n = Normalizer::default();
        let leg = quote_inventory_purchase(&n, 1_008_000, 500_000, UNIT, FEE).unwrap();
        assert_eq!(leg.maker_gives, 500_000);
        assert_eq!(leg.taker_gives, 504_000);
        assert_eq!(quote_inventory_purchase(&n, 1_008_000, 0, UNIT, FEE), None);
    }
}
