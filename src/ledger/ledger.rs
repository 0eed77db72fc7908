//! Native token ledger with lazily compounded balances.
//!
//! ## Balance Model
//!
//! A holder is stored as `{principal, last_accrual}`. The balance at any
//! instant is a projection that is never written back by reads:
//!
//! ```text
//! balance(h, now) = principal(h) * rate^days / UNIT^days
//!                 + sum over referees r of h:
//!                       principal(r) * (referralRate^days_r - UNIT^days_r) / UNIT^days_r
//! ```
//!
//! Any balance-affecting call first *materializes* the projection into
//! principal. Materialization only moves whole days and advances the anchors
//! by those days, so it never changes a balance; it only changes where the
//! value is stored.
//!
//! ## Funding
//!
//! Interest and referral growth are paid out of the reserve's principal. The
//! reserve itself never accrues. When the reserve runs dry the shortfall is
//! minted and `total_supply` grows.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::config::LedgerParams;
use crate::error::{ExchangeError, Result};
use crate::ledger::interest::{accrue, elapsed_days, growth};
use crate::ledger::{ReferralBook, ReferralEdge, Token};
use crate::types::price::{mul_div_u64, UNIT};
use crate::types::{
    Address, CallContext, HolderSnapshot, StateHasher, StateRoot, Timestamp, DAY,
};

/// Share of the initial supply minted to the exchange, in percent.
pub const EXCHANGE_SHARE_PERCENT: u64 = 70;

/// Share of the initial supply minted to the reserve, in percent.
pub const RESERVE_SHARE_PERCENT: u64 = 20;

/// Highest accepted daily growth factor (doubling per day).
pub const MAX_RATE: u64 = 2 * UNIT;

/// Accepted range for both interest rates: `[UNIT, MAX_RATE]`.
pub fn check_rate(rate: u64) -> Result<()> {
    if rate < UNIT {
        return Err(ExchangeError::Validation("negative growth is forbidden".to_string()));
    }
    if rate > MAX_RATE {
        return Err(ExchangeError::Validation(format!(
            "growth rate {rate} exceeds {MAX_RATE}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Holder {
    principal: u64,
    last_accrual: Timestamp,
}

/// Pending growth on one referral edge.
struct PendingReferral {
    referrer: Address,
    days: u64,
    /// `None` when the growth overflows
    bonus: Option<u64>,
}

/// The interest-accruing native token.
#[derive(Debug, Clone)]
pub struct Ledger {
    address: Address,
    owner: Address,
    reserve: Address,
    exchange: Option<Address>,
    decimals: u8,
    initial_supply: u64,
    total_supply: u64,
    daily_interest: u64,
    referral_interest: u64,
    /// Address order keeps rate changes and commitments deterministic
    holders: BTreeMap<Address, Holder>,
    allowances: HashMap<(Address, Address), u64>,
    referrals: ReferralBook,
    holders_counter: u64,
}

impl Ledger {
    /// Create an empty, uninitialized ledger. Nothing is minted until
    /// [`Ledger::init`].
    pub fn new(owner: Address, params: &LedgerParams) -> Self {
        Self {
            address: params.address,
            owner,
            reserve: params.reserve,
            exchange: None,
            decimals: params.decimals,
            initial_supply: params.total_supply,
            total_supply: 0,
            daily_interest: params.daily_interest,
            referral_interest: params.referral_interest,
            holders: BTreeMap::new(),
            allowances: HashMap::new(),
            referrals: ReferralBook::new(),
            holders_counter: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn reserve(&self) -> Address {
        self.reserve
    }

    /// The exchange bound by `init`, if any.
    pub fn exchange(&self) -> Option<Address> {
        self.exchange
    }

    pub fn is_initialized(&self) -> bool {
        self.exchange.is_some()
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    pub fn daily_interest(&self) -> u64 {
        self.daily_interest
    }

    pub fn referral_interest(&self) -> u64 {
        self.referral_interest
    }

    /// Number of addresses with a strictly positive principal.
    pub fn holders_counter(&self) -> u64 {
        self.holders_counter
    }

    /// Stored principal, without any pending growth.
    pub fn principal_of(&self, holder: &Address) -> u64 {
        self.holders.get(holder).map_or(0, |h| h.principal)
    }

    pub fn referrer_of(&self, holder: &Address) -> Option<Address> {
        self.referrals.referrer_of(holder)
    }

    /// Referees of `referrer` in attachment order.
    pub fn referrals_of(&self, referrer: &Address) -> &[Address] {
        self.referrals.referrals_of(referrer)
    }

    /// Referees of the caller.
    pub fn get_my_referrals(&self, ctx: &CallContext) -> Vec<Address> {
        self.referrals_of(&ctx.caller).to_vec()
    }

    // ========================================================================
    // Projection
    // ========================================================================

    fn projected_principal(&self, holder: &Address, now: Timestamp) -> u64 {
        let Some(record) = self.holders.get(holder) else {
            return 0;
        };
        if *holder == self.reserve {
            return record.principal;
        }
        let days = elapsed_days(record.last_accrual, now);
        accrue(record.principal, self.daily_interest, days).unwrap_or(u64::MAX)
    }

    fn pending_referral(&self, referee: &Address, edge: &ReferralEdge, now: Timestamp) -> PendingReferral {
        let days = elapsed_days(edge.anchor, now);
        let referee_principal = self.principal_of(referee);
        let bonus = if days == 0 || referee_principal == 0 || self.principal_of(&edge.referrer) == 0 {
            Some(0)
        } else {
            growth(referee_principal, self.referral_interest, days)
        };
        PendingReferral {
            referrer: edge.referrer,
            days,
            bonus,
        }
    }

    /// Referral growth owed to `referrer` and not yet materialized.
    pub fn pending_referral_bonus(&self, referrer: &Address, now: Timestamp) -> u64 {
        self.referrals
            .referrals_of(referrer)
            .iter()
            .filter_map(|referee| {
                let edge = self.referrals.edge(referee)?;
                Some(self.pending_referral(referee, edge, now).bonus.unwrap_or(u64::MAX))
            })
            .fold(0u64, u64::saturating_add)
    }

    // ========================================================================
    // Materialization
    // ========================================================================

    fn credit(&mut self, holder: Address, amount: u64, now: Timestamp) -> Result<()> {
        let record = self.holders.entry(holder).or_insert(Holder {
            principal: 0,
            last_accrual: now,
        });
        if record.principal == 0 {
            record.last_accrual = now;
        }
        let before = record.principal;
        record.principal = before.checked_add(amount).ok_or_else(ExchangeError::overflow)?;
        if before == 0 && amount > 0 {
            self.holders_counter += 1;
        }
        Ok(())
    }

    fn debit(&mut self, holder: Address, amount: u64) -> Result<()> {
        let record = self.holders.entry(holder).or_default();
        if amount > record.principal {
            return Err(ExchangeError::InsufficientResource("not enough balance".to_string()));
        }
        let before = record.principal;
        record.principal -= amount;
        if before > 0 && record.principal == 0 {
            self.holders_counter -= 1;
        }
        Ok(())
    }

    /// Pay `amount` of growth out of the reserve, minting any shortfall.
    fn fund(&mut self, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let drawn = amount.min(self.principal_of(&self.reserve));
        self.debit(self.reserve, drawn)?;
        let minted = amount - drawn;
        if minted > 0 {
            self.total_supply = self
                .total_supply
                .checked_add(minted)
                .ok_or_else(ExchangeError::overflow)?;
            warn!(minted, "reserve exhausted, minting interest");
        }
        Ok(())
    }

    /// Compound the holder's own principal up to `now`.
    fn accrue_own(&mut self, holder: Address, now: Timestamp) -> Result<()> {
        if holder == self.reserve {
            return Ok(());
        }
        let Some(record) = self.holders.get(&holder).copied() else {
            return Ok(());
        };
        if record.principal == 0 {
            if let Some(record) = self.holders.get_mut(&holder) {
                record.last_accrual = now;
            }
            return Ok(());
        }
        let days = elapsed_days(record.last_accrual, now);
        if days == 0 {
            return Ok(());
        }
        let grown = accrue(record.principal, self.daily_interest, days)
            .ok_or_else(ExchangeError::overflow)?;
        let interest = grown - record.principal;
        self.fund(interest)?;
        if let Some(record) = self.holders.get_mut(&holder) {
            record.principal = grown;
            record.last_accrual += days * DAY;
        }
        debug!(%holder, days, interest, "interest accrued");
        Ok(())
    }

    /// Pay the referrer of `referee` whatever accumulated on their edge.
    fn settle_referral(&mut self, referee: Address, now: Timestamp) -> Result<()> {
        let Some(edge) = self.referrals.edge(&referee).copied() else {
            return Ok(());
        };
        let pending = self.pending_referral(&referee, &edge, now);
        if pending.days == 0 {
            return Ok(());
        }
        let bonus = pending.bonus.ok_or_else(ExchangeError::overflow)?;
        // The referrer's principal is about to grow; its own upline has to be
        // paid on the old principal first. Edges never form a cycle.
        self.settle_referral(pending.referrer, now)?;
        self.accrue_own(pending.referrer, now)?;
        if bonus > 0 {
            self.fund(bonus)?;
            self.credit(pending.referrer, bonus, now)?;
            debug!(referrer = %pending.referrer, %referee, days = pending.days, bonus, "referral growth settled");
        }
        self.referrals.advance(&referee, pending.days);
        Ok(())
    }

    /// Realize every pending growth that involves `holder`.
    ///
    /// Afterwards `balance_of(holder, now) == principal_of(holder)`.
    pub(crate) fn materialize(&mut self, holder: Address, now: Timestamp) -> Result<()> {
        if holder.is_zero() || holder == self.reserve {
            return Ok(());
        }
        self.settle_referral(holder, now)?;
        let referees = self.referrals.referrals_of(&holder).to_vec();
        for referee in referees {
            self.settle_referral(referee, now)?;
        }
        self.accrue_own(holder, now)
    }

    fn materialize_all(&mut self, now: Timestamp) -> Result<()> {
        let holders: Vec<Address> = self.holders.keys().copied().collect();
        for holder in holders {
            self.materialize(holder, now)?;
        }
        Ok(())
    }

    /// Force-materialize the caller's pending interest and referral growth.
    pub fn accrue_interest(&mut self, ctx: &CallContext) -> Result<()> {
        self.materialize(ctx.caller, ctx.now)
    }

    // ========================================================================
    // Transfers
    // ========================================================================

    fn move_principal(&mut self, from: Address, to: Address, amount: u64, now: Timestamp) -> Result<()> {
        if to.is_zero() {
            return Err(ExchangeError::Validation("transfer to the empty address".to_string()));
        }
        if amount > self.balance_of(&from, now) {
            return Err(ExchangeError::InsufficientResource("not enough balance".to_string()));
        }
        self.materialize(from, now)?;
        self.materialize(to, now)?;
        if amount == 0 || from == to {
            return Ok(());
        }
        self.debit(from, amount)?;
        self.credit(to, amount, now)?;
        debug!(%from, %to, amount, "native transfer");
        Ok(())
    }

    // ========================================================================
    // Administration
    // ========================================================================

    fn only_owner(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.owner {
            return Err(ExchangeError::not_owner());
        }
        Ok(())
    }

    /// Bind the exchange and mint the initial supply. Owner-only, once.
    ///
    /// The exchange receives 70%, the reserve 20% and the caller the rest.
    pub fn init(&mut self, ctx: &CallContext, exchange: Address) -> Result<()> {
        self.only_owner(ctx)?;
        if exchange.is_zero() {
            return Err(ExchangeError::Validation("exchange address is empty".to_string()));
        }
        if self.is_initialized() {
            return Err(ExchangeError::Validation("re-initialization".to_string()));
        }
        if exchange == self.reserve {
            return Err(ExchangeError::Validation("exchange cannot be the reserve".to_string()));
        }

        let supply = self.initial_supply;
        let to_exchange =
            mul_div_u64(supply, EXCHANGE_SHARE_PERCENT, 100).ok_or_else(ExchangeError::overflow)?;
        let to_reserve =
            mul_div_u64(supply, RESERVE_SHARE_PERCENT, 100).ok_or_else(ExchangeError::overflow)?;
        let to_owner = supply - to_exchange - to_reserve;

        self.exchange = Some(exchange);
        self.credit(exchange, to_exchange, ctx.now)?;
        self.credit(self.reserve, to_reserve, ctx.now)?;
        self.credit(ctx.caller, to_owner, ctx.now)?;
        self.total_supply = supply;

        info!(%exchange, supply, to_exchange, to_reserve, "native ledger initialized");
        Ok(())
    }

    /// Change the daily growth factor. Everyone is settled at the old rate
    /// first.
    pub fn set_daily_interest(&mut self, ctx: &CallContext, rate: u64) -> Result<()> {
        self.only_owner(ctx)?;
        check_rate(rate)?;
        self.materialize_all(ctx.now)?;
        let previous = std::mem::replace(&mut self.daily_interest, rate);
        info!(previous, rate, "daily interest updated");
        Ok(())
    }

    /// Change the referral growth factor. Every edge is settled at the old
    /// rate first.
    pub fn set_referral_interest(&mut self, ctx: &CallContext, rate: u64) -> Result<()> {
        self.only_owner(ctx)?;
        check_rate(rate)?;
        self.materialize_all(ctx.now)?;
        let previous = std::mem::replace(&mut self.referral_interest, rate);
        info!(previous, rate, "referral interest updated");
        Ok(())
    }

    /// Record `referrer` as the referrer of `holder`. Exchange-only.
    ///
    /// Returns whether an edge was created. The call is inert when the holder
    /// already has a referrer, the referrer is empty, the holder itself, one
    /// of the holder's own referees (directly or further down), or the
    /// reserve.
    pub fn set_parent_referral(
        &mut self,
        ctx: &CallContext,
        holder: Address,
        referrer: Address,
    ) -> Result<bool> {
        if self.exchange != Some(ctx.caller) {
            return Err(ExchangeError::Authorization("caller is not the exchange".to_string()));
        }
        if holder == self.reserve || referrer == self.reserve || self.is_downline(&referrer, &holder) {
            return Ok(false);
        }
        let attached = self.referrals.attach(holder, referrer, ctx.now);
        if attached {
            info!(%holder, %referrer, "referral attached");
        }
        Ok(attached)
    }

    /// Whether `candidate` sits below `root` in the referral tree.
    fn is_downline(&self, candidate: &Address, root: &Address) -> bool {
        let mut cursor = self.referrals.referrer_of(candidate);
        while let Some(parent) = cursor {
            if parent == *root {
                return true;
            }
            cursor = self.referrals.referrer_of(&parent);
        }
        false
    }

    // ========================================================================
    // Commitment
    // ========================================================================

    /// Commitment over every holder record in address order.
    pub fn state_root(&self) -> Result<StateRoot> {
        let mut hasher = StateHasher::new(b"native");
        for (address, holder) in &self.holders {
            let edge = self.referrals.edge(address);
            hasher.absorb(&HolderSnapshot {
                holder: address.to_word(),
                principal: holder.principal,
                last_accrual: holder.last_accrual,
                referrer: edge.map_or(Address::ZERO, |e| e.referrer).to_word(),
                referral_anchor: edge.map_or(0, |e| e.anchor),
            })?;
        }
        Ok(hasher.finish())
    }
}

impl Token for Ledger {
    fn address(&self) -> Address {
        self.address
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Principal compounded to `now` plus pending referral growth.
    /// Saturates instead of failing.
    fn balance_of(&self, holder: &Address, now: Timestamp) -> u64 {
        self.projected_principal(holder, now)
            .saturating_add(self.pending_referral_bonus(holder, now))
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn approve(&mut self, ctx: &CallContext, spender: Address, amount: u64) -> Result<()> {
        if spender.is_zero() {
            return Err(ExchangeError::Validation("approve to the empty address".to_string()));
        }
        self.allowances.insert((ctx.caller, spender), amount);
        Ok(())
    }

    fn transfer(&mut self, ctx: &CallContext, to: Address, amount: u64) -> Result<()> {
        self.move_principal(ctx.caller, to, amount, ctx.now)
    }

    fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: Address,
        to: Address,
        amount: u64,
    ) -> Result<()> {
        let allowed = self.allowance(&from, &ctx.caller);
        if amount > allowed {
            return Err(ExchangeError::InsufficientResource("not enough allowance".to_string()));
        }
        self.move_principal(from, to, amount, ctx.now)?;
        self.allowances.insert((from, ctx.caller), allowed - amount);
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
