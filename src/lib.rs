//! # Pegged Exchange
//!
//! Single-pair limit order book between a fixed-supply stable token and an
//! interest-accruing native token.
//!
//! ## Architecture
//!
//! - **Types**: addresses, orders, composite uids, fills and receipts
//! - **Ledger**: the compounding native ledger with referrals, and the plain
//!   stable token
//! - **OrderBook**: slab-backed price buckets with FIFO priority
//! - **Engine**: matching, fees and the exchange's own inventory
//! - **Venue**: both tokens and the exchange behind one all-or-nothing surface
//!
//! ## Design Principles
//!
//! 1. **Determinism**: identical call sequences produce identical state roots
//! 2. **No Floating Point**: amounts are `u64`, rates are scaled by 10^18
//! 3. **Explicit Time**: every call carries its own timestamp
//! 4. **Synchronous Execution**: one call runs to completion before the next

// ============================================================================
// Module declarations
// ============================================================================

/// Venue parameters and TOML loading
pub mod config;

/// Matching engine: order matching and settlement
pub mod engine;

/// Error type shared by every operation
pub mod error;

/// Native and stable token ledgers
pub mod ledger;

/// Order book: price buckets with slab-based storage
pub mod orderbook;

/// Core data types: Address, Order, Uid, TradeReceipt
pub mod types;

/// All-or-nothing call surface over tokens and exchange
pub mod venue;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::{ConfigError, ExchangeParams, LedgerParams, StableParams, VenueConfig};
pub use engine::Exchange;
pub use error::{ExchangeError, Result};
pub use ledger::{Ledger, StableToken, Token, TokenStore};
pub use orderbook::OrderBook;
pub use types::{Address, Asset, CallContext, Order, Side, TradeReceipt, Uid};
pub use venue::Venue;
