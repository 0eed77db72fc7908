//! Composite order identifier.
//!
//! A [`Uid`] is both the primary key of a resting order and the proof of who
//! owns it: the owner address is part of the identifier, so a cancel request
//! can be authorized without a lookup.
//!
//! ## Encoding
//!
//! ```text
//! byte  0       side tag (0 = Buy, 1 = Sell)
//! bytes 1..4    zero
//! bytes 4..12   sequence, u64 big-endian
//! bytes 12..32  owner address
//! ```
//!
//! Sequences are allocated per side starting at 1, so uids of one side compare
//! in creation order. Two uids are never equal because the `(side, sequence)`
//! pair is never reused.

use std::fmt;
use std::str::FromStr;

use crate::error::ExchangeError;
use crate::types::{Address, Side};

/// Encoded length in bytes.
pub const UID_LEN: usize = 32;

/// `(side, sequence, owner)` identifier of an order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uid {
    pub side: Side,
    pub sequence: u64,
    pub owner: Address,
}

impl Uid {
    pub fn new(side: Side, sequence: u64, owner: Address) -> Self {
        Self { side, sequence, owner }
    }

    /// Pack into the 32-byte wire form.
    pub fn encode(&self) -> [u8; UID_LEN] {
        let mut out = [0u8; UID_LEN];
        out[0] = self.side.to_u8();
        out[4..12].copy_from_slice(&self.sequence.to_be_bytes());
        out[12..].copy_from_slice(&self.owner.0);
        out
    }

    /// Unpack the 32-byte wire form.
    ///
    /// ```
    /// use pegged_exchange::types::{Address, Side, Uid};
    ///
    /// let uid = Uid::new(Side::Sell, 42, Address::from_low_u64_be(9));
    /// assert_eq!(Uid::decode(&uid.encode()).unwrap(), uid);
    /// ```
    pub fn decode(bytes: &[u8; UID_LEN]) -> Result<Self, ExchangeError> {
        let side = Side::from_u8(bytes[0])
            .ok_or_else(|| ExchangeError::Validation(format!("unknown uid side tag {}", bytes[0])))?;
        if bytes[1..4] != [0u8; 3] {
            return Err(ExchangeError::Validation("malformed uid padding".to_string()));
        }
        let mut sequence = [0u8; 8];
        sequence.copy_from_slice(&bytes[4..12]);
        let mut owner = [0u8; 20];
        owner.copy_from_slice(&bytes[12..]);
        Ok(Self {
            side,
            sequence: u64::from_be_bytes(sequence),
            owner: Address(owner),
        })
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.encode()))
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({:?}#{} {})", self.side, self.sequence, self.owner)
    }
}

impl FromStr for Uid {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|_| ExchangeError::Validation(format!("malformed uid: {s}")))?;
        let bytes: [u8; UID_LEN] = bytes
            .try_into()
            .map_err(|_| ExchangeError::Validation(format!("uid must be {UID_LEN} bytes")))?;
        Uid::decode(&bytes)
    }
}
