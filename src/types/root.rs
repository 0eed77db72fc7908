//! State commitments.
//!
//! Each component hashes the SSZ encoding of its records, in a fixed order,
//! into a [`StateRoot`]. Replaying the same call sequence yields the same
//! roots, which is how determinism is checked.

use std::fmt;

use sha2::{Digest, Sha256};
use ssz_rs::prelude::*;

use crate::error::{ExchangeError, Result};

/// A 32-byte SHA-256 commitment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateRoot(pub [u8; 32]);

impl StateRoot {
    /// SHA-256 of raw bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        StateRoot(hash)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for StateRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for StateRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateRoot({})", self.to_hex())
    }
}

/// Incremental hasher over SSZ-encoded records.
///
/// ```
/// use pegged_exchange::types::{Order, StateHasher};
///
/// let mut a = StateHasher::new(b"book");
/// a.absorb(&Order::default().snapshot()).unwrap();
/// let mut b = StateHasher::new(b"book");
/// b.absorb(&Order::default().snapshot()).unwrap();
/// assert_eq!(a.finish(), b.finish());
/// ```
pub struct StateHasher {
    inner: Sha256,
}

impl StateHasher {
    /// Start a commitment; `domain` separates the components.
    pub fn new(domain: &[u8]) -> Self {
        let mut inner = Sha256::new();
        inner.update(domain);
        Self { inner }
    }

    pub fn absorb<T: SimpleSerialize>(&mut self, record: &T) -> Result<()> {
        let bytes = ssz_rs::serialize(record)
            .map_err(|e| ExchangeError::Validation(format!("snapshot encoding failed: {e}")))?;
        self.inner.update(&bytes);
        Ok(())
    }

    /// Fold another commitment in.
    pub fn absorb_root(&mut self, root: &StateRoot) {
        self.inner.update(root.0);
    }

    pub fn finish(self) -> StateRoot {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&self.inner.finalize());
        StateRoot(hash)
    }
}
