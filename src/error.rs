//! Error taxonomy shared by the ledger, the order book and the matching engine.
//!
//! Every variant aborts the call that produced it; the venue restores the state
//! it had before the call. Stale orders are pruned silently and never surface
//! here.

use thiserror::Error;

use crate::types::Uid;

/// Errors returned by every fallible operation in the crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// Privileged call by a non-owner, or cancel by someone other than the
    /// order's owner.
    #[error("unauthorized: {0}")]
    Authorization(String),

    /// Wrong pair, sub-floor price, out-of-range parameter, re-initialization,
    /// malformed identifiers and arithmetic overflow.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Balance or allowance shortfall.
    #[error("insufficient resource: {0}")]
    InsufficientResource(String),

    /// Operation on a uid that is not resting in the book.
    #[error("order not found: {0}")]
    NotFound(Uid),
}

impl ExchangeError {
    pub(crate) fn overflow() -> Self {
        ExchangeError::Validation("arithmetic overflow".to_string())
    }

    pub(crate) fn not_owner() -> Self {
        ExchangeError::Authorization("caller is not the owner".to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ExchangeError>;
