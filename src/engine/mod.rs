//! Matching engine for the native/stable pair.
//!
//! ## Design Principles
//!
//! 1. **Determinism**: same call sequence, same state
//! 2. **Fixed-Point Math**: `u64` amounts, `u128` intermediates, floor rounding
//! 3. **Synchronous Execution**: one call runs to completion
//! 4. **Price-Time Priority**: best price first, then FIFO
//!
//! ## Matching Rules
//!
//! - An incoming trade walks the opposite side's buckets in ascending order
//! - Fills settle at the maker's price
//! - Makers owned by the taker are skipped; makers that can no longer cover
//!   their remainder are pruned
//! - Exchange inventory fills what resting liquidity cannot, at `min_price`
//! - The unfilled remainder rests on the book
//!
//! ## Example
//!
//! ```
//! use pegged_exchange::{Venue, VenueConfig};
//! use pegged_exchange::types::{Address, CallContext};
//!
//! let owner = Address::from_low_u64_be(1);
//! let bob = Address::from_low_u64_be(2);
//! let config = VenueConfig::default();
//! let mut venue = Venue::new(config.clone(), owner);
//! venue.init(&CallContext::new(owner, 0)).unwrap();
//!
//! let ctx = CallContext::new(owner, 0);
//! venue.transfer(&ctx, &config.stable.address, bob, 1_000_000).unwrap();
//! let bob_ctx = CallContext::new(bob, 0);
//! venue.approve(&bob_ctx, &config.stable.address, config.exchange.address, 1_000_000).unwrap();
//!
//! // 1.0 stable for 1.0 native, filled from exchange inventory
//! let receipt = venue
//!     .trade(&bob_ctx, config.stable.address, 1_000_000, config.native.address, 1_000_000, Address::ZERO)
//!     .unwrap();
//! assert!(receipt.is_complete());
//! assert_eq!(venue.native_balance_of(&bob, 0), 1_000_000);
//! ```

pub mod exchange;
pub mod matcher;

pub use exchange::{
    check_exchange_fee, check_min_price, check_referral_bonus, Exchange, MAX_EXCHANGE_FEE,
    MIN_PRICE_CEILING, MIN_PRICE_FLOOR,
};
pub use matcher::{crosses, gross_for_net, quote, split_fee, Leg};
