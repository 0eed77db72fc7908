//! The venue: both tokens and the exchange behind one call surface.
//!
//! Every state-mutating call is all-or-nothing. Calls that can fail after
//! they started writing (trades, native transfers, accrual, rate changes) run
//! against a snapshot that is put back on failure, so a failed trade never
//! leaves a half-settled fill behind. Calls that finish every check before
//! their single write (approvals, stable transfers, cancels and the exchange
//! setters) skip the snapshot.

use tracing::debug;

use crate::config::VenueConfig;
use crate::engine::Exchange;
use crate::error::{ExchangeError, Result};
use crate::ledger::{Ledger, StableToken, Token, TokenStore};
use crate::types::price::Normalizer;
use crate::types::{
    Address, Asset, CallContext, Order, StateHasher, StateRoot, Timestamp, TradeReceipt, Uid,
};

/// In-memory exchange venue.
#[derive(Debug, Clone)]
pub struct Venue {
    tokens: TokenStore,
    exchange: Exchange,
}

impl Venue {
    /// Build the pair from `config`. The native ledger still needs
    /// [`Venue::init`]; the stable supply is minted to `owner` right away.
    pub fn new(config: VenueConfig, owner: Address) -> Self {
        let native = Ledger::new(owner, &config.native);
        let stable = StableToken::new(owner, &config.stable);
        let normalizer = Normalizer::new(config.native.decimals, config.stable.decimals);
        let exchange = Exchange::new(
            config.exchange.address,
            owner,
            config.native.address,
            config.stable.address,
            normalizer,
            &config.exchange,
        );
        Self {
            tokens: TokenStore::new(native, stable),
            exchange,
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    pub fn native_token(&self) -> Address {
        self.tokens.native.address()
    }

    pub fn stable_token(&self) -> Address {
        self.tokens.stable.address()
    }

    pub fn exchange_address(&self) -> Address {
        self.exchange.address()
    }

    /// Run `call` against the state, restoring the previous state on error.
    ///
    /// Clones the whole state; reserved for calls that write before they can
    /// fail.
    fn atomically<T>(
        &mut self,
        call: impl FnOnce(&mut TokenStore, &mut Exchange) -> Result<T>,
    ) -> Result<T> {
        let tokens = self.tokens.clone();
        let exchange = self.exchange.clone();
        match call(&mut self.tokens, &mut self.exchange) {
            Ok(value) => Ok(value),
            Err(error) => {
                debug!(%error, "call reverted");
                self.tokens = tokens;
                self.exchange = exchange;
                Err(error)
            }
        }
    }

    fn asset(&self, token: &Address) -> Result<Asset> {
        self.tokens
            .asset_of(token)
            .ok_or_else(|| ExchangeError::Validation(format!("unknown token {token}")))
    }

    // ========================================================================
    // Token surface
    // ========================================================================

    pub fn balance_of(&self, token: &Address, holder: &Address, now: Timestamp) -> Result<u64> {
        let asset = self.asset(token)?;
        Ok(self.tokens.token(asset).balance_of(holder, now))
    }

    pub fn native_balance_of(&self, holder: &Address, now: Timestamp) -> u64 {
        self.tokens.native.balance_of(holder, now)
    }

    pub fn stable_balance_of(&self, holder: &Address, now: Timestamp) -> u64 {
        self.tokens.stable.balance_of(holder, now)
    }

    pub fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Result<u64> {
        let asset = self.asset(token)?;
        Ok(self.tokens.token(asset).allowance(owner, spender))
    }

    pub fn approve(
        &mut self,
        ctx: &CallContext,
        token: &Address,
        spender: Address,
        amount: u64,
    ) -> Result<()> {
        let asset = self.asset(token)?;
        self.tokens.token_mut(asset).approve(ctx, spender, amount)
    }

    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        token: &Address,
        to: Address,
        amount: u64,
    ) -> Result<()> {
        match self.asset(token)? {
            Asset::Stable => self.tokens.stable.transfer(ctx, to, amount),
            Asset::Native => self.atomically(|tokens, _| tokens.native.transfer(ctx, to, amount)),
        }
    }

    pub fn transfer_from(
        &mut self,
        ctx: &CallContext,
        token: &Address,
        from: Address,
        to: Address,
        amount: u64,
    ) -> Result<()> {
        match self.asset(token)? {
            Asset::Stable => self.tokens.stable.transfer_from(ctx, from, to, amount),
            Asset::Native => {
                self.atomically(|tokens, _| tokens.native.transfer_from(ctx, from, to, amount))
            }
        }
    }

    // ========================================================================
    // Native ledger surface
    // ========================================================================

    /// Mint the native supply and bind the ledger to this venue's exchange.
    pub fn init(&mut self, ctx: &CallContext) -> Result<()> {
        let exchange = self.exchange.address();
        self.atomically(|tokens, _| tokens.native.init(ctx, exchange))
    }

    pub fn accrue_interest(&mut self, ctx: &CallContext) -> Result<()> {
        self.atomically(|tokens, _| tokens.native.accrue_interest(ctx))
    }

    pub fn set_daily_interest(&mut self, ctx: &CallContext, rate: u64) -> Result<()> {
        self.atomically(|tokens, _| tokens.native.set_daily_interest(ctx, rate))
    }

    pub fn set_referral_interest(&mut self, ctx: &CallContext, rate: u64) -> Result<()> {
        self.atomically(|tokens, _| tokens.native.set_referral_interest(ctx, rate))
    }

    pub fn daily_interest(&self) -> u64 {
        self.tokens.native.daily_interest()
    }

    pub fn referral_interest(&self) -> u64 {
        self.tokens.native.referral_interest()
    }

    pub fn holders_counter(&self) -> u64 {
        self.tokens.native.holders_counter()
    }

    pub fn total_supply(&self) -> u64 {
        self.tokens.native.total_supply()
    }

    pub fn get_my_referrals(&self, ctx: &CallContext) -> Vec<Address> {
        self.tokens.native.get_my_referrals(ctx)
    }

    pub fn referrer_of(&self, holder: &Address) -> Option<Address> {
        self.tokens.native.referrer_of(holder)
    }

    // ========================================================================
    // Trade surface
    // ========================================================================

    pub fn trade(
        &mut self,
        ctx: &CallContext,
        src_token: Address,
        src_amount: u64,
        dest_token: Address,
        dest_amount: u64,
        referrer: Address,
    ) -> Result<TradeReceipt> {
        self.atomically(|tokens, exchange| {
            exchange.trade(tokens, ctx, src_token, src_amount, dest_token, dest_amount, referrer)
        })
    }

    pub fn continue_trade(&mut self, ctx: &CallContext, uid: &Uid) -> Result<TradeReceipt> {
        self.atomically(|tokens, exchange| exchange.continue_trade(tokens, ctx, uid))
    }

    pub fn cancel(&mut self, ctx: &CallContext, uid: &Uid) -> Result<Order> {
        self.exchange.cancel(ctx, uid)
    }

    pub fn get_my_orders(&self, ctx: &CallContext) -> Vec<Uid> {
        self.exchange.get_my_orders(&self.tokens, ctx)
    }

    pub fn get_order_by_uid(&self, uid: &Uid) -> Order {
        self.exchange.get_order_by_uid(uid)
    }

    pub fn get_next_price(&self, token: &Address, after: u128) -> Result<u128> {
        self.exchange.get_next_price(token, after)
    }

    pub fn get_uids_by_price(&self, token: &Address, price: u128) -> Result<Vec<Uid>> {
        self.exchange.get_uids_by_price(token, price)
    }

    pub fn min_price(&self) -> u64 {
        self.exchange.min_price()
    }

    pub fn exchange_fee(&self) -> u64 {
        self.exchange.exchange_fee()
    }

    pub fn referral_bonus(&self) -> u64 {
        self.exchange.referral_bonus()
    }

    pub fn collected_fees(&self) -> u64 {
        self.exchange.collected_fees()
    }

    pub fn set_min_price(&mut self, ctx: &CallContext, value: u64) -> Result<()> {
        self.exchange.set_min_price(ctx, value)
    }

    pub fn set_exchange_fee(&mut self, ctx: &CallContext, value: u64) -> Result<()> {
        self.exchange.set_exchange_fee(ctx, value)
    }

    pub fn set_referral_bonus(&mut self, ctx: &CallContext, value: u64) -> Result<()> {
        self.exchange.set_referral_bonus(ctx, value)
    }

    // ========================================================================
    // Commitment
    // ========================================================================

    /// Commitment over both ledgers and the order book.
    pub fn state_root(&self) -> Result<StateRoot> {
        let mut hasher = StateHasher::new(b"venue");
        hasher.absorb_root(&self.tokens.native.state_root()?);
        hasher.absorb_root(&self.tokens.stable.state_root()?);
        hasher.absorb_root(&self.exchange.book().state_root()?);
        Ok(hasher.finish())
    }
}
