//! Referral edges between native-token holders.
//!
//! Each holder has at most one referrer, assigned once and never changed.
//! Every edge carries an anchor timestamp: the referrer's pending growth on
//! that edge is measured from the anchor, and settling the edge moves the
//! anchor forward by the whole days that were paid out.

use std::collections::HashMap;

use crate::types::{Address, Timestamp, DAY};

/// A `referee -> referrer` link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralEdge {
    pub referrer: Address,
    /// Start of the not-yet-settled referral period
    pub anchor: Timestamp,
}

/// All referral edges, indexed both ways.
#[derive(Debug, Clone, Default)]
pub struct ReferralBook {
    parents: HashMap<Address, ReferralEdge>,
    /// Referees per referrer, in attachment order
    children: HashMap<Address, Vec<Address>>,
}

impl ReferralBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `holder` to `referrer` starting at `now`.
    ///
    /// Returns `false` (and changes nothing) when the holder already has a
    /// referrer, the referrer is empty, or the two are the same account.
    pub fn attach(&mut self, holder: Address, referrer: Address, now: Timestamp) -> bool {
        if referrer.is_zero() || holder.is_zero() || holder == referrer {
            return false;
        }
        if self.parents.contains_key(&holder) {
            return false;
        }
        self.parents.insert(holder, ReferralEdge { referrer, anchor: now });
        self.children.entry(referrer).or_default().push(holder);
        true
    }

    pub fn edge(&self, referee: &Address) -> Option<&ReferralEdge> {
        self.parents.get(referee)
    }

    pub fn referrer_of(&self, referee: &Address) -> Option<Address> {
        self.parents.get(referee).map(|edge| edge.referrer)
    }

    /// Referees of `referrer` in the order they were attached.
    pub fn referrals_of(&self, referrer: &Address) -> &[Address] {
        self.children.get(referrer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Move the edge anchor forward by `days` whole days.
    pub(crate) fn advance(&mut self, referee: &Address, days: u64) {
        if let Some(edge) = self.parents.get_mut(referee) {
            edge.anchor = edge.anchor.saturating_add(days.saturating_mul(DAY));
        }
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
