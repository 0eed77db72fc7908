//! Token ledgers for both sides of the pair.
//!
//! ## Components
//!
//! - [`Ledger`]: the native token; balances compound daily and referrers earn
//!   on their referees' principal
//! - [`StableToken`]: the fixed-supply counter-asset
//! - [`ReferralBook`]: one-time `referee -> referrer` edges
//! - [`Token`]: the surface the matching engine trades through
//! - [`TokenStore`]: owns both tokens and resolves assets
//!
//! ## Example
//!
//! ```
//! use pegged_exchange::config::LedgerParams;
//! use pegged_exchange::ledger::{Ledger, Token};
//! use pegged_exchange::types::{Address, CallContext, DAY};
//!
//! let owner = Address::from_low_u64_be(1);
//! let exchange = Address::from_low_u64_be(2);
//! let mut ledger = Ledger::new(owner, &LedgerParams::default());
//! ledger.init(&CallContext::new(owner, 0), exchange).unwrap();
//!
//! let now = 30 * DAY;
//! assert!(ledger.balance_of(&exchange, now) > ledger.balance_of(&exchange, 0));
//! ```

mod interest;
#[allow(clippy::module_inception)]
mod ledger;
mod referral;
mod token;

pub use interest::{accrue, compound, elapsed_days, growth};
pub use ledger::{
    check_rate, Ledger, EXCHANGE_SHARE_PERCENT, MAX_RATE, RESERVE_SHARE_PERCENT,
};
pub use referral::{ReferralBook, ReferralEdge};
pub use token::{StableToken, Token, TokenStore};
