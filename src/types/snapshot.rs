//! SSZ records for the token ledgers' state commitments.
//!
//! Kept beside [`super::OrderSnapshot`] so every committed record is encoded
//! the same way.

use ssz_rs::prelude::*;

/// Native holder record as committed in the state root.
///
/// Total size: 32 + 8 + 8 + 32 + 8 = 88 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct HolderSnapshot {
    pub holder: [u8; 32],
    pub principal: u64,
    pub last_accrual: u64,
    pub referrer: [u8; 32],
    pub referral_anchor: u64,
}

/// Balance record of a plain token.
///
/// Total size: 32 + 8 = 40 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct BalanceSnapshot {
    pub holder: [u8; 32],
    pub amount: u64,
}
