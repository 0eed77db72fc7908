//! Core data types for the exchange
//!
//! ## Types
//!
//! - [`Address`], [`CallContext`]: who calls, and when
//! - [`Asset`], [`Side`]: the two tokens and the trade direction
//! - [`Order`]: a resting limit order
//! - [`Uid`]: composite order identifier (side, sequence, owner)
//! - [`Fill`], [`TradeReceipt`]: what a trade produced
//! - [`StateRoot`]: SHA-256 commitment over SSZ-encoded state
//! - [`HolderSnapshot`], [`BalanceSnapshot`]: committed ledger records
//!
//! ## Fixed-Point Arithmetic
//!
//! Amounts are `u64` raw units of their token. Rates and prices are scaled by
//! [`price::UNIT`] (10^18).

mod address;
mod order;
mod receipt;
mod root;
mod snapshot;
mod uid;
pub mod price;

// Re-export all types at module level
pub use address::{Address, CallContext, Timestamp, DAY};
pub use order::{Asset, Order, OrderSnapshot, Side};
pub use receipt::{Counterparty, Fill, TradeReceipt};
pub use root::{StateHasher, StateRoot};
pub use snapshot::{BalanceSnapshot, HolderSnapshot};
pub use uid::{Uid, UID_LEN};
