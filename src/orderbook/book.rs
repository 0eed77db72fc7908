//! Price-bucketed index of resting orders.
//!
//! ## Architecture
//!
//! - **Slab**: order nodes, O(1) insert/remove/lookup by key
//! - **BTreeMap per side**: buckets keyed by normalized price, ascending
//! - **HashMap**: uid to slab key
//! - **Per-owner lists**: each owner's uids in creation order
//!
//! ## Price Ordering
//!
//! A bucket key is the order's normalized `dest / src` ratio. For both sides a
//! lower key means the maker asks less per unit it gives, so ascending
//! traversal is best-first for a taker.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound::{Excluded, Unbounded};

use slab::Slab;

use crate::error::{ExchangeError, Result};
use crate::orderbook::{OrderNode, PriceLevel};
use crate::types::price::Normalizer;
use crate::types::{Address, Order, Side, StateHasher, StateRoot, Uid};

/// Resting orders of both sides.
#[derive(Debug, Clone)]
pub struct OrderBook {
    nodes: Slab<OrderNode>,
    buys: BTreeMap<u128, PriceLevel>,
    sells: BTreeMap<u128, PriceLevel>,
    index: HashMap<Uid, usize>,
    by_owner: HashMap<Address, Vec<Uid>>,
    /// Last sequence handed out, per side
    last_buy_sequence: u64,
    last_sell_sequence: u64,
    normalizer: Normalizer,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new(Normalizer::default())
    }
}

impl OrderBook {
    pub fn new(normalizer: Normalizer) -> Self {
        Self::with_capacity(0, normalizer)
    }

    /// Pre-allocate room for `capacity` resting orders.
    pub fn with_capacity(capacity: usize, normalizer: Normalizer) -> Self {
        Self {
            nodes: Slab::with_capacity(capacity),
            buys: BTreeMap::new(),
            sells: BTreeMap::new(),
            index: HashMap::with_capacity(capacity),
            by_owner: HashMap::new(),
            last_buy_sequence: 0,
            last_sell_sequence: 0,
            normalizer,
        }
    }

    pub fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    // ========================================================================
    // Size
    // ========================================================================

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of non-empty buckets on `side`.
    pub fn level_count(&self, side: Side) -> usize {
        self.levels(side).len()
    }

    fn levels(&self, side: Side) -> &BTreeMap<u128, PriceLevel> {
        match side {
            Side::Buy => &self.buys,
            Side::Sell => &self.sells,
        }
    }

    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<u128, PriceLevel> {
        match side {
            Side::Buy => &mut self.buys,
            Side::Sell => &mut self.sells,
        }
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    /// Mint the next uid of `side` for `owner`. Sequences start at 1.
    pub fn next_uid(&mut self, side: Side, owner: Address) -> Uid {
        let counter = match side {
            Side::Buy => &mut self.last_buy_sequence,
            Side::Sell => &mut self.last_sell_sequence,
        };
        *counter += 1;
        Uid::new(side, *counter, owner)
    }

    /// Bucket key of an order.
    pub fn price_of(&self, order: &Order) -> Option<u128> {
        self.normalizer
            .price(order.side().src_asset(), order.remaining(), order.remaining_dest())
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// File `order` at the tail of its bucket.
    ///
    /// The bucket key is computed from the order's remaining amounts, so an
    /// order re-filed after a partial fill keeps its limit price up to
    /// rounding.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if order.remaining() == 0 || order.remaining_dest() == 0 {
            return Err(ExchangeError::Validation("zero amount".to_string()));
        }
        if self.index.contains_key(&order.uid) {
            return Err(ExchangeError::Validation(format!("duplicate uid {}", order.uid)));
        }
        let price = self.price_of(&order).ok_or_else(ExchangeError::overflow)?;
        let uid = order.uid;
        let side = order.side();

        let key = self.nodes.insert(OrderNode::new(order, price));
        let Self { nodes, buys, sells, .. } = self;
        let levels = match side {
            Side::Buy => buys,
            Side::Sell => sells,
        };
        levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .push_back(key, nodes);

        self.index.insert(uid, key);
        self.by_owner.entry(uid.owner).or_default().push(uid);
        Ok(())
    }

    /// Detach and return an order. Unknown uids are a no-op.
    pub fn remove(&mut self, uid: &Uid) -> Option<Order> {
        let key = self.index.remove(uid)?;
        let price = self.nodes.get(key)?.price;
        let side = uid.side;

        let Self { nodes, buys, sells, .. } = self;
        let levels = match side {
            Side::Buy => buys,
            Side::Sell => sells,
        };
        if let Some(level) = levels.get_mut(&price) {
            level.remove(key, nodes);
            if level.is_empty() {
                levels.remove(&price);
            }
        }

        if let Some(uids) = self.by_owner.get_mut(&uid.owner) {
            uids.retain(|u| u != uid);
            if uids.is_empty() {
                self.by_owner.remove(&uid.owner);
            }
        }
        Some(self.nodes.remove(key).order)
    }

    /// Advance `filled` of a resting order; returns the amount applied.
    pub fn fill(&mut self, uid: &Uid, amount: u64) -> u64 {
        let Some(&key) = self.index.get(uid) else {
            return 0;
        };
        let Some(node) = self.nodes.get_mut(key) else {
            return 0;
        };
        let applied = node.fill(amount);
        let price = node.price;
        if let Some(level) = self.levels_mut(uid.side).get_mut(&price) {
            level.reduce_remaining(applied);
        }
        applied
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    #[inline]
    pub fn contains(&self, uid: &Uid) -> bool {
        self.index.contains_key(uid)
    }

    pub fn get(&self, uid: &Uid) -> Option<&Order> {
        let key = self.index.get(uid)?;
        self.nodes.get(*key).map(|node| &node.order)
    }

    /// The resting order, or the zero order when absent.
    pub fn get_order_by_uid(&self, uid: &Uid) -> Order {
        self.get(uid).copied().unwrap_or_default()
    }

    /// Resting uids of `owner` in creation order.
    pub fn orders_of(&self, owner: &Address) -> &[Uid] {
        self.by_owner.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    // ========================================================================
    // Price Traversal
    // ========================================================================

    /// Lowest bucket key on `side`.
    pub fn best_price(&self, side: Side) -> Option<u128> {
        self.levels(side).keys().next().copied()
    }

    /// Lowest bucket key strictly above `price`.
    pub fn price_after(&self, side: Side, price: u128) -> Option<u128> {
        self.levels(side)
            .range((Excluded(price), Unbounded))
            .next()
            .map(|(p, _)| *p)
    }

    /// Like [`OrderBook::price_after`], with 0 standing for "none".
    pub fn get_next_price(&self, side: Side, after: u128) -> u128 {
        self.price_after(side, after).unwrap_or(0)
    }

    /// Uids resting at exactly `price`, oldest first.
    pub fn get_uids_by_price(&self, side: Side, price: u128) -> Vec<Uid> {
        self.levels(side)
            .get(&price)
            .map(|level| level.uids(&self.nodes))
            .unwrap_or_default()
    }

    /// `(price, remaining source units, order count)` per bucket, best first.
    pub fn depth(&self, side: Side) -> Vec<(u128, u64, usize)> {
        self.levels(side)
            .values()
            .map(|level| (level.price, level.total_remaining, level.order_count))
            .collect()
    }

    // ========================================================================
    // Commitment
    // ========================================================================

    /// Commitment over every resting order in uid order.
    pub fn state_root(&self) -> Result<StateRoot> {
        let mut uids: Vec<&Uid> = self.index.keys().collect();
        uids.sort();
        let mut hasher = StateHasher::new(b"book");
        for uid in uids {
            if let Some(order) = self.get(uid) {
                hasher.absorb(&order.snapshot())?;
            }
        }
        Ok(hasher.finish())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
