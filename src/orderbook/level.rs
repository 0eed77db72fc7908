//! Price buckets: all resting orders of one side at one normalized price.
//!
//! ## Queue Structure
//!
//! ```text
//! head (oldest) <-> order2 <-> order3 <-> tail (newest)
//! ```
//!
//! - New orders are appended at the tail
//! - Matching walks from the head
//! - Any order can be unlinked in O(1) using its slab key

use slab::Slab;

use crate::orderbook::OrderNode;
use crate::types::Uid;

/// Queue metadata for one bucket. Order data lives in the slab.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Normalized price of every order in the bucket
    pub price: u128,

    /// Sum of the source units still to be delivered
    pub total_remaining: u64,

    /// Oldest order (slab key), matched first
    pub head: Option<usize>,

    /// Newest order (slab key)
    pub tail: Option<usize>,

    pub order_count: usize,
}

impl PriceLevel {
    pub fn new(price: u128) -> Self {
        Self {
            price,
            total_remaining: 0,
            head: None,
            tail: None,
            order_count: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }

    /// Append the node at `key` to the tail of the queue.
    ///
    /// Keys missing from the slab are ignored.
    pub fn push_back(&mut self, key: usize, slab: &mut Slab<OrderNode>) {
        let Some(node) = slab.get_mut(key) else {
            return;
        };
        let remaining = node.remaining();
        node.prev = self.tail;
        node.next = None;

        match self.tail.and_then(|tail| slab.get_mut(tail)) {
            Some(tail_node) => tail_node.next = Some(key),
            None => self.head = Some(key),
        }

        self.tail = Some(key);
        self.order_count += 1;
        self.total_remaining = self.total_remaining.saturating_add(remaining);
    }

    /// Unlink the node at `key`; returns its remaining source units.
    pub fn remove(&mut self, key: usize, slab: &mut Slab<OrderNode>) -> u64 {
        let Some(node) = slab.get_mut(key) else {
            return 0;
        };
        let remaining = node.remaining();
        let prev_key = node.prev.take();
        let next_key = node.next.take();

        match prev_key.and_then(|prev| slab.get_mut(prev)) {
            Some(prev_node) => prev_node.next = next_key,
            None => self.head = next_key,
        }
        match next_key.and_then(|next| slab.get_mut(next)) {
            Some(next_node) => next_node.prev = prev_key,
            None => self.tail = prev_key,
        }

        self.order_count = self.order_count.saturating_sub(1);
        self.total_remaining = self.total_remaining.saturating_sub(remaining);
        remaining
    }

    /// Update the total after a partial fill.
    pub fn reduce_remaining(&mut self, filled: u64) {
        self.total_remaining = self.total_remaining.saturating_sub(filled);
    }

    /// Uids in FIFO order.
    pub fn uids(&self, slab: &Slab<OrderNode>) -> Vec<Uid> {
        let mut uids = Vec::with_capacity(self.order_count);
        let mut cursor = self.head;
        while let Some(node) = cursor.and_then(|key| slab.get(key)) {
            uids.push(node.uid());
            cursor = node.next;
        }
        uids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, Order, Side};

    fn create_test_node(slab: &mut Slab<OrderNode>, sequence: u64, quantity: u64) -> usize {
        let uid = Uid::new(Side::Sell, sequence, Address::from_low_u64_be(100));
        slab.insert(OrderNode::new(Order::new(uid, quantity, quantity), 1))
    }

    #[test]
    fn test_price_level_new() {
        let level = PriceLevel::new(1);
        assert_eq!(level.total_remaining, 0);
        assert!(level.head.is_none());
        assert!(level.tail.is_none());
        assert!(level.is_empty());
    }

    #[test]
    fn test_price_level_push_multiple() {
        let mut slab = Slab::with_capacity(10);
        let mut level = PriceLevel::new(1);

        let key1 = create_test_node(&mut slab, 1, 100);
        let key2 = create_test_node(&mut slab, 2, 200);
        let key3 = create_test_node(&mut slab, 3, 300);
        level.push_back(key1, &mut slab);
        level.push_back(key2, &mut slab);
        level.push_back(key3, &mut slab);

        assert_eq!(level.order_count, 3);
        assert_eq!(level.total_remaining, 600);
        assert_eq!(level.head, Some(key1));
        assert_eq!(level.tail, Some(key3));

        // key1 <-> key2 <-> key3
        assert_eq!(slab[key1].next, Some(key2));
        assert_eq!(slab[key2].prev, Some(key1));
        assert_eq!(slab[key2].next, Some(key3));
        assert_eq!(slab[key3].prev, Some(key2));

        let sequences: Vec<u64> = level.uids(&slab).iter().map(|u| u.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn test_price_level_remove_middle() {
        let mut slab = Slab::with_capacity(10);
        let mut level = PriceLevel::new(1);

        let key1 = create_test_node(&mut slab, 1, 100);
        let key2 = create_test_node(&mut slab, 2, 200);
        let key3 = create_test_node(&mut slab, 3, 300);
        level.push_back(key1, &mut slab);
        level.push_back(key2, &mut slab);
        level.push_back(key3, &mut slab);

        assert_eq!(level.remove(key2, &mut slab), 200);
        assert_eq!(level.order_count, 2);
        assert_eq!(level.total_remaining, 400);
        assert_eq!(slab[key1].next, Some(key3));
        assert_eq!(slab[key3].prev, Some(key1));
        assert!(slab[key2].is_unlinked());
    }

    #[test]
    fn test_price_level_remove_head_and_tail() {
        let mut slab = Slab::with_capacity(10);
        let mut level = PriceLevel::new(1);

        let key1 = create_test_node(&mut slab, 1, 100);
        let key2 = create_test_node(&mut slab, 2, 200);
        level.push_back(key1, &mut slab);
        level.push_back(key2, &mut slab);

        level.remove(key1, &mut slab);
        assert_eq!(level.head, Some(key2));
        assert_eq!(level.tail, Some(key2));

        level.remove(key2, &mut slab);
        assert!(level.is_empty());
        assert!(level.head.is_none());
        assert!(level.tail.is_none());
        assert_eq!(level.total_remaining, 0);
    }

    #[test]
    fn test_price_level_reduce_remaining() {
        let mut level = PriceLevel::new(1);
        level.total_remaining = 1_000;
        level.reduce_remaining(300);
        assert_eq!(level.total_remaining, 700);
        level.reduce_remaining(1_000);
        assert_eq!(level.total_remaining, 0);
    }
}
