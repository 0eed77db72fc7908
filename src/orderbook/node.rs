//! Order node for slab-based storage.
//!
//! ## Design
//!
//! `OrderNode` wraps an [`Order`] with doubly-linked list pointers so an
//! order can leave its price bucket in O(1) once its slab key is known.
//!
//! ## Linked List
//!
//! Orders in the same bucket form a doubly-linked list:
//! - `next`: the next (newer) order in the bucket
//! - `prev`: the previous (older) order in the bucket

use crate::types::{Order, Uid};

/// Order node stored in the slab.
///
/// The pointers are slab keys (`usize`), not references. `price` is the
/// normalized bucket key the node was filed under.
#[derive(Debug, Clone)]
pub struct OrderNode {
    pub order: Order,

    /// Bucket key (normalized `dest / src`, scaled by `UNIT`)
    pub price: u128,

    /// Next order in the bucket queue; `None` at the tail
    pub next: Option<usize>,

    /// Previous order in the bucket queue; `None` at the head
    pub prev: Option<usize>,
}

impl OrderNode {
    /// Create a new, unlinked node.
    ///
    /// ```
    /// use pegged_exchange::orderbook::OrderNode;
    /// use pegged_exchange::types::{Address, Order, Side, Uid};
    ///
    /// let uid = Uid::new(Side::Sell, 1, Address::from_low_u64_be(3));
    /// let node = OrderNode::new(Order::new(uid, 1_000_000, 1_100_000), 1);
    ///
    /// assert!(node.is_unlinked());
    /// ```
    #[inline]
    pub fn new(order: Order, price: u128) -> Self {
        Self {
            order,
            price,
            next: None,
            prev: None,
        }
    }

    #[inline]
    pub fn is_unlinked(&self) -> bool {
        self.next.is_none() && self.prev.is_none()
    }

    #[inline]
    pub fn uid(&self) -> Uid {
        self.order.uid
    }

    #[inline]
    pub fn remaining(&self) -> u64 {
        self.order.remaining()
    }

    /// Fill a portion of this order; returns the amount actually filled.
    #[inline]
    pub fn fill(&mut self, quantity: u64) -> u64 {
        self.order.fill(quantity)
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.order.is_filled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, Side};

    fn node(src: u64) -> OrderNode {
        let uid = Uid::new(Side::Buy, 7, Address::from_low_u64_be(100));
        OrderNode::new(Order::new(uid, src, src), 42)
    }

    #[test]
    fn test_order_node_new() {
        let node = node(100);
        assert_eq!(node.uid().sequence, 7);
        assert_eq!(node.price, 42);
        assert_eq!(node.remaining(), 100);
        assert!(node.is_unlinked());
    }

    #[test]
    fn test_order_node_fill() {
        let mut node = node(100);
        assert_eq!(node.fill(30), 30);
        assert_eq!(node.remaining(), 70);
        assert!(!node.is_filled());

        assert_eq!(node.fill(100), 70);
        assert!(node.is_filled());
    }

    #[test]
    fn test_order_node_linking() {
        let mut node = node(100);
        node.next = Some(2);
        assert!(!node.is_unlinked());
        node.next = None;
        node.prev = Some(0);
        assert!(!node.is_unlinked());
    }
}
