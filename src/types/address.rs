//! Account addresses and the per-call execution context.
//!
//! Addresses are 20-byte identifiers displayed as `0x`-prefixed hex. The
//! all-zero address is the "empty" address: it never holds funds and is used
//! as the "no referrer" marker on trades.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ExchangeError;

/// Seconds since an arbitrary epoch, supplied by the caller.
pub type Timestamp = u64;

/// Length of an accrual period (one day) in seconds.
pub const DAY: Timestamp = 86_400;

/// A 20-byte account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The empty address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Build an address with every byte set to `byte`.
    pub const fn repeat_byte(byte: u8) -> Self {
        Address([byte; 20])
    }

    /// Build an address whose low 8 bytes hold `value` (big-endian).
    ///
    /// ```
    /// use pegged_exchange::types::Address;
    ///
    /// let a = Address::from_low_u64_be(1);
    /// assert_eq!(a.to_string(), "0x0000000000000000000000000000000000000001");
    /// ```
    pub const fn from_low_u64_be(value: u64) -> Self {
        let low = value.to_be_bytes();
        let mut bytes = [0u8; 20];
        let mut i = 0;
        while i < 8 {
            bytes[12 + i] = low[i];
            i += 1;
        }
        Address(bytes)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Left-pad to 32 bytes (used by SSZ snapshots).
    pub fn to_word(self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|_| ExchangeError::Validation(format!("malformed address: {s}")))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| ExchangeError::Validation(format!("address must be 20 bytes: {s}")))?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Who is calling and when.
///
/// Every state-mutating operation receives one of these; there is no implicit
/// sender or clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }

    /// Same timestamp, different caller.
    pub fn as_caller(&self, caller: Address) -> Self {
        Self { caller, now: self.now }
    }
}
