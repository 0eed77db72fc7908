//! The single-pair exchange: trade intake, the fill loop and settlement.
//!
//! ## Trade Flow
//!
//! 1. Validate the pair, the amounts and the price floor
//! 2. Check the trader's balance and allowance, prune their stale orders
//! 3. Walk the opposite side best-first, FIFO inside a bucket
//! 4. Fall back to exchange inventory at `min_price`
//! 5. Rest the unfilled remainder as a new order
//!
//! ## Fees
//!
//! Native delivered by an external trader is charged `exchange_fee`: the
//! receiver gets `native * UNIT / exchange_fee` and the exchange keeps the
//! rest. A `referral_bonus` share of that fee is forwarded to the fee payer's
//! referrer. Native delivered out of exchange inventory is never charged.

use std::cmp::Ordering;

use tracing::{debug, info, warn};

use crate::config::ExchangeParams;
use crate::engine::matcher::{
    at_or_above_floor, crosses, quote, quote_inventory_purchase, quote_inventory_sale, split_fee,
    Leg,
};
use crate::error::{ExchangeError, Result};
use crate::ledger::{Token, TokenStore};
use crate::orderbook::OrderBook;
use crate::types::price::{mul_cmp, mul_div_u64, Normalizer, UNIT};
use crate::types::{
    Address, Asset, CallContext, Counterparty, Fill, Order, Side, Timestamp, TradeReceipt, Uid,
};

/// Lowest accepted `min_price`: 0.01 stable per native.
pub const MIN_PRICE_FLOOR: u64 = UNIT / 100;

/// Highest accepted `min_price`: 10 stable per native.
pub const MIN_PRICE_CEILING: u64 = 10 * UNIT;

/// Highest accepted `exchange_fee`: 10%.
pub const MAX_EXCHANGE_FEE: u64 = UNIT + UNIT / 10;

pub fn check_min_price(value: u64) -> Result<()> {
    if !(MIN_PRICE_FLOOR..=MIN_PRICE_CEILING).contains(&value) {
        return Err(ExchangeError::Validation(format!(
            "min price {value} outside [{MIN_PRICE_FLOOR}, {MIN_PRICE_CEILING}]"
        )));
    }
    Ok(())
}

pub fn check_exchange_fee(value: u64) -> Result<()> {
    if !(UNIT..=MAX_EXCHANGE_FEE).contains(&value) {
        return Err(ExchangeError::Validation(format!(
            "exchange fee {value} outside [{UNIT}, {MAX_EXCHANGE_FEE}]"
        )));
    }
    Ok(())
}

pub fn check_referral_bonus(value: u64) -> Result<()> {
    if value > UNIT {
        return Err(ExchangeError::Validation(format!(
            "referral bonus {value} exceeds {UNIT}"
        )));
    }
    Ok(())
}

/// How a native amount moves between two accounts.
struct NativeDelivery {
    seller: Address,
    buyer: Address,
    amount: u64,
    charge_fee: bool,
}

/// Matching engine and order book of one pair.
#[derive(Debug, Clone)]
pub struct Exchange {
    address: Address,
    owner: Address,
    native_token: Address,
    stable_token: Address,
    min_price: u64,
    exchange_fee: u64,
    referral_bonus: u64,
    book: OrderBook,
    /// Native units withheld as fees, before referral payouts
    collected_fees: u64,
    /// Native units forwarded to referrers
    referral_payouts: u64,
}

impl Exchange {
    /// Bind the exchange to its pair.
    ///
    /// Parameters are taken as given; [`crate::config::VenueConfig`]
    /// validates them before construction.
    pub fn new(
        address: Address,
        owner: Address,
        native_token: Address,
        stable_token: Address,
        normalizer: Normalizer,
        params: &ExchangeParams,
    ) -> Self {
        Self {
            address,
            owner,
            native_token,
            stable_token,
            min_price: params.min_price,
            exchange_fee: params.exchange_fee,
            referral_bonus: params.referral_bonus,
            book: OrderBook::new(normalizer),
            collected_fees: 0,
            referral_payouts: 0,
        }
    }

    // ========================================================================
    // Read surface
    // ========================================================================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn min_price(&self) -> u64 {
        self.min_price
    }

    pub fn exchange_fee(&self) -> u64 {
        self.exchange_fee
    }

    pub fn referral_bonus(&self) -> u64 {
        self.referral_bonus
    }

    pub fn collected_fees(&self) -> u64 {
        self.collected_fees
    }

    pub fn referral_payouts(&self) -> u64 {
        self.referral_payouts
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    fn normalizer(&self) -> Normalizer {
        self.book.normalizer()
    }

    /// Asset at `token`, or `None` for a token outside the pair.
    pub fn asset_of(&self, token: &Address) -> Option<Asset> {
        if *token == self.native_token {
            Some(Asset::Native)
        } else if *token == self.stable_token {
            Some(Asset::Stable)
        } else {
            None
        }
    }

    /// The side whose orders sell `token`.
    fn side_selling(&self, token: &Address) -> Result<Side> {
        self.asset_of(token)
            .map(Side::selling)
            .ok_or_else(|| ExchangeError::Validation(format!("unknown token {token}")))
    }

    pub fn get_order_by_uid(&self, uid: &Uid) -> Order {
        self.book.get_order_by_uid(uid)
    }

    /// Next resting price above `after` among orders selling `token`; 0 if
    /// none.
    pub fn get_next_price(&self, token: &Address, after: u128) -> Result<u128> {
        Ok(self.book.get_next_price(self.side_selling(token)?, after))
    }

    /// Orders selling `token` at exactly `price`, oldest first.
    pub fn get_uids_by_price(&self, token: &Address, price: u128) -> Result<Vec<Uid>> {
        Ok(self.book.get_uids_by_price(self.side_selling(token)?, price))
    }

    /// The caller's resting orders that are still covered, in creation order.
    pub fn get_my_orders(&self, tokens: &TokenStore, ctx: &CallContext) -> Vec<Uid> {
        self.book
            .orders_of(&ctx.caller)
            .iter()
            .filter(|uid| {
                self.book
                    .get(uid)
                    .is_some_and(|order| self.is_covered(tokens, order, ctx.now))
            })
            .copied()
            .collect()
    }

    /// Whether the trader can still deliver the order's remainder.
    fn is_covered(&self, tokens: &TokenStore, order: &Order, now: Timestamp) -> bool {
        let token = tokens.token(order.side().src_asset());
        token.spendable(&order.trader, &self.address, now) >= order.remaining()
    }

    // ========================================================================
    // Trade surface
    // ========================================================================

    /// Submit a trade intent: give `src_amount` of `src_token` for at least
    /// `dest_amount` of `dest_token`.
    ///
    /// Whatever cannot be filled immediately rests as a new order. A non-empty
    /// `referrer` is recorded as the trader's referrer if they have none.
    #[allow(clippy::too_many_arguments)]
    pub fn trade(
        &mut self,
        tokens: &mut TokenStore,
        ctx: &CallContext,
        src_token: Address,
        src_amount: u64,
        dest_token: Address,
        dest_amount: u64,
        referrer: Address,
    ) -> Result<TradeReceipt> {
        let src_asset = self
            .asset_of(&src_token)
            .ok_or_else(|| ExchangeError::Validation("wrong src".to_string()))?;
        if self.asset_of(&dest_token) != Some(src_asset.other()) {
            return Err(ExchangeError::Validation("wrong dest".to_string()));
        }
        if src_amount == 0 || dest_amount == 0 {
            return Err(ExchangeError::Validation("zero amount".to_string()));
        }
        let trader = ctx.caller;
        if trader == self.address {
            return Err(ExchangeError::Validation("exchange cannot trade with itself".to_string()));
        }
        let side = Side::selling(src_asset);
        self.check_price_floor(side, src_amount, dest_amount)?;

        let token = tokens.token(src_asset);
        if token.balance_of(&trader, ctx.now) < src_amount {
            return Err(ExchangeError::InsufficientResource("not enough balance".to_string()));
        }
        if token.allowance(&trader, &self.address) < src_amount {
            return Err(ExchangeError::InsufficientResource("not enough allowance".to_string()));
        }

        self.prune_orders_of(tokens, trader, ctx.now);
        self.attach_referral(tokens, ctx, referrer)?;

        // The uid is only minted if something rests
        let mut taker = Order {
            uid: Uid::new(side, 0, trader),
            trader,
            src_amount,
            dest_amount,
            filled: 0,
        };
        let mut receipt = TradeReceipt::default();
        self.match_taker(tokens, ctx.now, &mut taker, &mut receipt)?;

        let remaining_dest = taker.remaining_dest();
        if taker.remaining() > 0 && remaining_dest > 0 {
            let uid = self.book.next_uid(side, trader);
            self.book.insert(Order::new(uid, taker.remaining(), remaining_dest))?;
            info!(
                %uid,
                ?side,
                src = taker.remaining(),
                dest = remaining_dest,
                "order placed"
            );
            receipt.order = Some(uid);
        }
        Ok(receipt)
    }

    /// Re-run matching for a resting order as the taker.
    ///
    /// A no-op for absent or filled orders; an order whose owner can no
    /// longer cover it is pruned instead.
    pub fn continue_trade(
        &mut self,
        tokens: &mut TokenStore,
        ctx: &CallContext,
        uid: &Uid,
    ) -> Result<TradeReceipt> {
        let Some(mut taker) = self.book.get(uid).copied() else {
            return Ok(TradeReceipt::default());
        };
        if taker.is_filled() {
            self.book.remove(uid);
            return Ok(TradeReceipt::default());
        }
        if !self.is_covered(tokens, &taker, ctx.now) {
            self.prune(uid);
            return Ok(TradeReceipt::default());
        }

        let before = taker.filled;
        let mut receipt = TradeReceipt::default();
        self.match_taker(tokens, ctx.now, &mut taker, &mut receipt)?;
        self.book.fill(uid, taker.filled - before);

        if taker.is_filled() || taker.remaining_dest() == 0 {
            self.book.remove(uid);
        } else {
            receipt.order = Some(*uid);
        }
        Ok(receipt)
    }

    /// Remove one of the caller's resting orders.
    pub fn cancel(&mut self, ctx: &CallContext, uid: &Uid) -> Result<Order> {
        if uid.owner != ctx.caller {
            return Err(ExchangeError::Authorization("caller does not own the order".to_string()));
        }
        let order = self.book.remove(uid).ok_or(ExchangeError::NotFound(*uid))?;
        info!(%uid, remaining = order.remaining(), "order cancelled");
        Ok(order)
    }

    // ========================================================================
    // Admin surface
    // ========================================================================

    fn only_owner(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.owner {
            return Err(ExchangeError::not_owner());
        }
        Ok(())
    }

    pub fn set_min_price(&mut self, ctx: &CallContext, value: u64) -> Result<()> {
        self.only_owner(ctx)?;
        check_min_price(value)?;
        let previous = std::mem::replace(&mut self.min_price, value);
        info!(previous, value, "min price updated");
        Ok(())
    }

    pub fn set_exchange_fee(&mut self, ctx: &CallContext, value: u64) -> Result<()> {
        self.only_owner(ctx)?;
        check_exchange_fee(value)?;
        let previous = std::mem::replace(&mut self.exchange_fee, value);
        info!(previous, value, "exchange fee updated");
        Ok(())
    }

    pub fn set_referral_bonus(&mut self, ctx: &CallContext, value: u64) -> Result<()> {
        self.only_owner(ctx)?;
        check_referral_bonus(value)?;
        let previous = std::mem::replace(&mut self.referral_bonus, value);
        info!(previous, value, "referral bonus updated");
        Ok(())
    }

    // ========================================================================
    // Validation helpers
    // ========================================================================

    /// Reject intents that price native below `min_price`.
    ///
    /// A seller's native amount includes the fee, so the floor applies to
    /// what the buyer actually receives.
    fn check_price_floor(&self, side: Side, src_amount: u64, dest_amount: u64) -> Result<()> {
        let normalizer = self.normalizer();
        let above = match side {
            Side::Buy => at_or_above_floor(&normalizer, dest_amount, src_amount, self.min_price),
            Side::Sell => {
                // dest * fee >= min_price * src, at common precision
                mul_cmp(
                    normalizer.normalize(Asset::Stable, dest_amount),
                    self.exchange_fee.into(),
                    normalizer.normalize(Asset::Native, src_amount),
                    self.min_price.into(),
                ) != Ordering::Less
            }
        };
        if !above {
            return Err(ExchangeError::Validation("price too low".to_string()));
        }
        Ok(())
    }

    /// Whether a buyer's limit covers the exchange's asking price
    /// `min_price`.
    fn inventory_accepts_purchase(&self, taker: &Order) -> bool {
        at_or_above_floor(
            &self.normalizer(),
            taker.dest_amount,
            taker.src_amount,
            self.min_price,
        )
    }

    /// Whether a seller's net limit lets the exchange buy at `min_price`.
    fn inventory_accepts_sale(&self, taker: &Order) -> bool {
        let normalizer = self.normalizer();
        mul_cmp(
            normalizer.normalize(Asset::Stable, taker.dest_amount),
            self.exchange_fee.into(),
            normalizer.normalize(Asset::Native, taker.src_amount),
            self.min_price.into(),
        ) != Ordering::Greater
    }

    fn attach_referral(
        &mut self,
        tokens: &mut TokenStore,
        ctx: &CallContext,
        referrer: Address,
    ) -> Result<()> {
        if referrer.is_zero() || tokens.native.exchange() != Some(self.address) {
            return Ok(());
        }
        tokens
            .native
            .set_parent_referral(&ctx.as_caller(self.address), ctx.caller, referrer)?;
        Ok(())
    }

    // ========================================================================
    // Pruning
    // ========================================================================

    fn prune(&mut self, uid: &Uid) {
        if let Some(order) = self.book.remove(uid) {
            warn!(%uid, remaining = order.remaining(), "order pruned: remainder no longer covered");
        }
    }

    /// Drop every resting order of `trader` that is no longer covered.
    fn prune_orders_of(&mut self, tokens: &TokenStore, trader: Address, now: Timestamp) {
        let stale: Vec<Uid> = self
            .book
            .orders_of(&trader)
            .iter()
            .filter(|uid| {
                self.book
                    .get(uid)
                    .is_some_and(|order| !self.is_covered(tokens, order, now))
            })
            .copied()
            .collect();
        for uid in stale {
            self.prune(&uid);
        }
    }

    // ========================================================================
    // Fill loop
    // ========================================================================

    fn match_taker(
        &mut self,
        tokens: &mut TokenStore,
        now: Timestamp,
        taker: &mut Order,
        receipt: &mut TradeReceipt,
    ) -> Result<()> {
        let maker_side = taker.side().opposite();
        let mut price = self.book.best_price(maker_side);

        'levels: while let Some(level_price) = price {
            for maker_uid in self.book.get_uids_by_price(maker_side, level_price) {
                if taker.is_filled() {
                    break 'levels;
                }
                let Some(maker) = self.book.get(&maker_uid).copied() else {
                    continue;
                };
                if !crosses(&maker, taker) {
                    break 'levels;
                }
                if maker.trader == taker.trader {
                    continue;
                }
                if !self.is_covered(tokens, &maker, now) {
                    self.prune(&maker_uid);
                    continue;
                }
                let Some(leg) = quote(&maker, taker.remaining()) else {
                    break 'levels;
                };
                self.fill_against_order(tokens, now, &maker, taker, leg, receipt)?;
            }
            price = self.book.price_after(maker_side, level_price);
        }

        if taker.remaining() > 0 {
            self.fill_against_inventory(tokens, now, taker, receipt)?;
        }
        Ok(())
    }

    fn fill_against_order(
        &mut self,
        tokens: &mut TokenStore,
        now: Timestamp,
        maker: &Order,
        taker: &mut Order,
        leg: Leg,
        receipt: &mut TradeReceipt,
    ) -> Result<()> {
        // (native seller, stable seller, native amount, stable amount)
        let (native_seller, stable_seller, native, stable) = match taker.side() {
            Side::Buy => (maker.trader, taker.trader, leg.maker_gives, leg.taker_gives),
            Side::Sell => (taker.trader, maker.trader, leg.taker_gives, leg.maker_gives),
        };

        tokens.settle(Asset::Stable, self.address, stable_seller, native_seller, stable, now)?;
        let (net, fee) = self.deliver_native(
            tokens,
            now,
            NativeDelivery {
                seller: native_seller,
                buyer: stable_seller,
                amount: native,
                charge_fee: true,
            },
        )?;

        self.book.fill(&maker.uid, leg.maker_gives);
        taker.fill(leg.taker_gives);
        if self.book.get(&maker.uid).is_some_and(|o| o.is_filled() || o.remaining_dest() == 0) {
            self.book.remove(&maker.uid);
        }

        let received = match taker.side() {
            Side::Buy => net,
            Side::Sell => stable,
        };
        let fill = Fill {
            maker: Counterparty::Order(maker.uid),
            maker_trader: maker.trader,
            taker: taker.trader,
            taker_side: taker.side(),
            paid: leg.taker_gives,
            received,
            fee,
            price: self.normalizer().price(Asset::Native, native, stable).unwrap_or(0),
        };
        debug!(
            maker = %maker.uid,
            taker = %taker.trader,
            paid = fill.paid,
            received = fill.received,
            fee,
            "order filled"
        );
        receipt.record(fill);
        Ok(())
    }

    /// Trade the taker's remainder against the exchange's own balances at
    /// `min_price`.
    fn fill_against_inventory(
        &mut self,
        tokens: &mut TokenStore,
        now: Timestamp,
        taker: &mut Order,
        receipt: &mut TradeReceipt,
    ) -> Result<()> {
        let normalizer = self.normalizer();
        let (leg, net, fee) = match taker.side() {
            Side::Buy => {
                if !self.inventory_accepts_purchase(taker) {
                    return Ok(());
                }
                let available = tokens.native.balance_of(&self.address, now);
                let Some(leg) =
                    quote_inventory_sale(&normalizer, taker.remaining(), available, self.min_price)
                else {
                    return Ok(());
                };
                tokens.settle(
                    Asset::Stable,
                    self.address,
                    taker.trader,
                    self.address,
                    leg.taker_gives,
                    now,
                )?;
                let (net, fee) = self.deliver_native(
                    tokens,
                    now,
                    NativeDelivery {
                        seller: self.address,
                        buyer: taker.trader,
                        amount: leg.maker_gives,
                        charge_fee: false,
                    },
                )?;
                (leg, net, fee)
            }
            Side::Sell => {
                if !self.inventory_accepts_sale(taker) {
                    return Ok(());
                }
                let available = tokens.stable.balance_of(&self.address, now);
                let Some(leg) = quote_inventory_purchase(
                    &normalizer,
                    taker.remaining(),
                    available,
                    self.min_price,
                    self.exchange_fee,
                ) else {
                    return Ok(());
                };
                let (_, fee) = self.deliver_native(
                    tokens,
                    now,
                    NativeDelivery {
                        seller: taker.trader,
                        buyer: self.address,
                        amount: leg.taker_gives,
                        charge_fee: true,
                    },
                )?;
                tokens.settle(
                    Asset::Stable,
                    self.address,
                    self.address,
                    taker.trader,
                    leg.maker_gives,
                    now,
                )?;
                (leg, leg.maker_gives, fee)
            }
        };

        taker.fill(leg.taker_gives);
        let fill = Fill {
            maker: Counterparty::Inventory,
            maker_trader: self.address,
            taker: taker.trader,
            taker_side: taker.side(),
            paid: leg.taker_gives,
            received: net,
            fee,
            price: self.min_price.into(),
        };
        debug!(
            taker = %taker.trader,
            paid = fill.paid,
            received = fill.received,
            fee,
            "inventory fill"
        );
        receipt.record(fill);
        Ok(())
    }

    /// Move native from seller to buyer, withholding the fee when the seller
    /// is an external trader. Returns `(net, fee)`.
    fn deliver_native(
        &mut self,
        tokens: &mut TokenStore,
        now: Timestamp,
        delivery: NativeDelivery,
    ) -> Result<(u64, u64)> {
        let NativeDelivery {
            seller,
            buyer,
            amount,
            charge_fee,
        } = delivery;
        if !charge_fee || seller == self.address {
            tokens.settle(Asset::Native, self.address, seller, buyer, amount, now)?;
            return Ok((amount, 0));
        }

        let (net, fee) = split_fee(amount, self.exchange_fee).ok_or_else(ExchangeError::overflow)?;
        tokens.settle(Asset::Native, self.address, seller, buyer, net, now)?;
        tokens.settle(Asset::Native, self.address, seller, self.address, fee, now)?;
        self.collected_fees = self
            .collected_fees
            .checked_add(fee)
            .ok_or_else(ExchangeError::overflow)?;

        if let Some(referrer) = tokens.native.referrer_of(&seller) {
            let bonus = mul_div_u64(fee, self.referral_bonus, UNIT).ok_or_else(ExchangeError::overflow)?;
            if bonus > 0 {
                tokens.settle(Asset::Native, self.address, self.address, referrer, bonus, now)?;
                self.referral_payouts = self
                    .referral_payouts
                    .checked_add(bonus)
                    .ok_or_else(ExchangeError::overflow)?;
                debug!(%seller, %referrer, bonus, "fee share paid to referrer");
            }
        }
        Ok((net, fee))
    }
}
