//! Order book index for the matching engine.
//!
//! ## Architecture
//!
//! - **Slab-based storage**: O(1) order insertion, removal, and lookup
//! - **Price buckets**: orders grouped by normalized price using BTreeMap
//! - **Price-time priority**: FIFO ordering inside each bucket
//!
//! ## Components
//!
//! - [`OrderNode`]: wrapper around `Order` with linked-list pointers
//! - [`PriceLevel`]: the FIFO queue of one bucket
//! - [`OrderBook`]: both sides, the uid index and per-owner lists
//!
//! ## Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Insert order | O(log n) |
//! | Remove by uid | O(log n + k), k = owner's resting orders |
//! | Best price | O(log n) |
//! | Next price | O(log n) |
//!
//! ## Example
//!
//! ```
//! use pegged_exchange::orderbook::OrderBook;
//! use pegged_exchange::types::{Address, Order, Side};
//!
//! let mut book = OrderBook::default();
//! let uid = book.next_uid(Side::Sell, Address::from_low_u64_be(1));
//! book.insert(Order::new(uid, 1_000_000, 1_050_000)).unwrap();
//!
//! assert_eq!(book.best_price(Side::Sell), Some(1_050_000_000_000_000_000));
//! ```

pub mod book;
pub mod level;
pub mod node;

pub use book::OrderBook;
pub use level::PriceLevel;
pub use node::OrderNode;
