//! Fill records and the receipt returned by a trade.
//!
//! ## Price Discovery
//!
//! A fill always settles at the maker's price: the resting order's own
//! `dest/src` ratio, or `minPrice` when the exchange inventory is the maker.

use crate::types::{Address, Side, Uid};

/// Who supplied the liquidity for a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counterparty {
    /// A resting order in the book
    Order(Uid),
    /// The exchange's own token balances, priced at `minPrice`
    Inventory,
}

/// A single leg pair between a taker and one maker.
///
/// ## Example
///
/// ```
/// use pegged_exchange::types::{Address, Counterparty, Fill, Side};
///
/// let fill = Fill {
///     maker: Counterparty::Inventory,
///     maker_trader: Address::from_low_u64_be(1),
///     taker: Address::from_low_u64_be(2),
///     taker_side: Side::Buy,
///     paid: 1_000_000,
///     received: 1_000_000,
///     fee: 0,
///     price: 1_000_000_000_000_000_000,
/// };
/// assert!(fill.is_inventory());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// Liquidity source
    pub maker: Counterparty,

    /// Account that delivered the maker leg (the exchange for inventory fills)
    pub maker_trader: Address,

    /// Account that consumed the liquidity
    pub taker: Address,

    /// Direction of the taker
    pub taker_side: Side,

    /// Units of the taker's source asset delivered to the maker
    pub paid: u64,

    /// Units of the taker's destination asset received, net of fee
    pub received: u64,

    /// Native units withheld as exchange fee on this fill
    pub fee: u64,

    /// Settlement price, stable per native, scaled by `UNIT`
    pub price: u128,
}

impl Fill {
    pub fn is_inventory(&self) -> bool {
        matches!(self.maker, Counterparty::Inventory)
    }
}

/// Outcome of `trade` / `continue_trade`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TradeReceipt {
    /// Resting order holding the unfilled remainder, if any
    pub order: Option<Uid>,

    /// Fills in execution order
    pub fills: Vec<Fill>,

    /// Total source units delivered by the taker
    pub spent: u64,

    /// Total destination units received by the taker, net of fees
    pub received: u64,

    /// Total native units withheld as fees across all fills
    pub fees: u64,
}

impl TradeReceipt {
    pub(crate) fn record(&mut self, fill: Fill) {
        self.spent += fill.paid;
        self.received += fill.received;
        self.fees += fill.fee;
        self.fills.push(fill);
    }

    /// True when nothing was left resting
    pub fn is_complete(&self) -> bool {
        self.order.is_none()
    }

    /// Number of fills against resting orders
    pub fn book_fills(&self) -> usize {
        self.fills.iter().filter(|f| !f.is_inventory()).count()
    }
}
