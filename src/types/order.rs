//! Order types for the exchange.
//!
//! ## Direction
//!
//! Every order sells one of the two assets for the other. [`Side`] names the
//! direction relative to the native token: a `Buy` order sells the stable token
//! to buy native, a `Sell` order sells native for the stable token.
//!
//! ## Amounts
//!
//! `src_amount` is what the trader gives, `dest_amount` what they want in
//! return; both are raw units of their own token. The implied limit price is
//! `dest_amount / src_amount`. `filled` counts `src_amount` units already
//! delivered.
//!
//! ## SSZ Serialization
//!
//! [`OrderSnapshot`] derives `SimpleSerialize` so the book can commit to its
//! content with a deterministic encoding.

use ssz_rs::prelude::*;

use crate::types::{price, Address, Uid};

// ============================================================================
// Asset enum
// ============================================================================

/// One of the two tokens of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Asset {
    /// The interest-accruing token
    Native,
    /// The pegged counter-asset
    Stable,
}

impl Asset {
    /// The other token of the pair
    pub fn other(self) -> Self {
        match self {
            Asset::Native => Asset::Stable,
            Asset::Stable => Asset::Native,
        }
    }
}

// ============================================================================
// Side enum
// ============================================================================

/// Order direction: which asset is being sold.
///
/// Represented as u8 for SSZ compatibility and uid encoding:
/// - Buy = 0 (sells stable, buys native)
/// - Sell = 1 (sells native, buys stable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

impl Side {
    /// Convert to u8 for serialization
    pub fn to_u8(self) -> u8 {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }

    /// Convert from u8 for deserialization
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Side::Buy),
            1 => Some(Side::Sell),
            _ => None,
        }
    }

    /// Returns the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// The asset an order on this side gives away.
    pub fn src_asset(self) -> Asset {
        match self {
            Side::Buy => Asset::Stable,
            Side::Sell => Asset::Native,
        }
    }

    /// The asset an order on this side receives.
    pub fn dest_asset(self) -> Asset {
        self.src_asset().other()
    }

    /// The side whose orders sell `asset`.
    pub fn selling(asset: Asset) -> Self {
        match asset {
            Asset::Stable => Side::Buy,
            Asset::Native => Side::Sell,
        }
    }
}

// ============================================================================
// Order struct
// ============================================================================

/// A resting (or incoming) limit order.
///
/// The zero value (`Order::default()`) is the "absent" sentinel returned by
/// lookups of unknown uids.
///
/// ## Example
///
/// ```
/// use pegged_exchange::types::{Address, Order, Side, Uid};
///
/// let owner = Address::from_low_u64_be(7);
/// let uid = Uid::new(Side::Buy, 1, owner);
/// // Give 1.0 stable for 0.9 native
/// let order = Order::new(uid, 1_000_000, 900_000);
/// assert_eq!(order.side(), Side::Buy);
/// assert_eq!(order.remaining(), 1_000_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Order {
    /// Composite identifier; also encodes the side and the owner
    pub uid: Uid,

    /// Account that placed the order
    pub trader: Address,

    /// Amount of the sold asset (raw units)
    pub src_amount: u64,

    /// Amount of the bought asset wanted for the whole `src_amount`
    pub dest_amount: u64,

    /// `src_amount` units already delivered
    pub filled: u64,
}

impl Order {
    /// Create a new unfilled order owned by the uid's owner.
    pub fn new(uid: Uid, src_amount: u64, dest_amount: u64) -> Self {
        Self {
            uid,
            trader: uid.owner,
            src_amount,
            dest_amount,
            filled: 0,
        }
    }

    /// Get the order side
    #[inline]
    pub fn side(&self) -> Side {
        self.uid.side
    }

    /// True for the zero-order sentinel
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.src_amount == 0 && self.uid.sequence == 0
    }

    /// Source units still to be delivered
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.src_amount.saturating_sub(self.filled)
    }

    /// Check if the order is fully filled
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.remaining() == 0
    }

    /// Destination units still wanted, pro-rata to the remaining source (floor).
    pub fn remaining_dest(&self) -> u64 {
        price::mul_div_u64(self.dest_amount, self.remaining(), self.src_amount).unwrap_or(0)
    }

    /// Fill a portion of this order
    ///
    /// # Returns
    ///
    /// The actual quantity filled (may be less if order doesn't have enough remaining)
    pub fn fill(&mut self, fill_qty: u64) -> u64 {
        let actual_fill = fill_qty.min(self.remaining());
        self.filled += actual_fill;
        actual_fill
    }

    /// Fixed-size snapshot used for state commitments
    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            uid: self.uid.encode(),
            trader: self.trader.to_word(),
            side_raw: self.side().to_u8(),
            src_amount: self.src_amount,
            dest_amount: self.dest_amount,
            filled: self.filled,
        }
    }
}

/// SSZ-encodable view of an [`Order`].
///
/// Total size: 32 + 32 + 1 + 8 + 8 + 8 = 89 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct OrderSnapshot {
    pub uid: [u8; 32],
    pub trader: [u8; 32],
    pub side_raw: u8,
    pub src_amount: u64,
    pub dest_amount: u64,
    pub filled: u64,
}

// ============================================================================
// Unit Tests
// ============================================================================
