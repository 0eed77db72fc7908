//! The token surface shared by both assets of the pair.
//!
//! The matching engine never touches balances directly: it reads spendable
//! amounts and moves value through [`Token`]. [`TokenStore`] owns the two
//! concrete tokens and resolves an [`Asset`] or a token address to one of
//! them.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::config::StableParams;
use crate::error::{ExchangeError, Result};
use crate::ledger::Ledger;
use crate::types::{
    Address, Asset, BalanceSnapshot, CallContext, StateHasher, StateRoot, Timestamp,
};

/// Balance and allowance surface of a fungible token.
pub trait Token {
    fn address(&self) -> Address;

    fn decimals(&self) -> u8;

    /// Balance as of `now`. Pure.
    fn balance_of(&self, holder: &Address, now: Timestamp) -> u64;

    fn allowance(&self, owner: &Address, spender: &Address) -> u64;

    fn approve(&mut self, ctx: &CallContext, spender: Address, amount: u64) -> Result<()>;

    fn transfer(&mut self, ctx: &CallContext, to: Address, amount: u64) -> Result<()>;

    /// Move `amount` from `from` to `to` using the caller's allowance.
    fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: Address,
        to: Address,
        amount: u64,
    ) -> Result<()>;

    /// What `spender` can currently pull from `holder`.
    fn spendable(&self, holder: &Address, spender: &Address, now: Timestamp) -> u64 {
        self.balance_of(holder, now).min(self.allowance(holder, spender))
    }
}

// ============================================================================
// Stable token
// ============================================================================

/// Fixed-supply token with no interest. The whole supply is minted to the
/// owner at construction.
#[derive(Debug, Clone)]
pub struct StableToken {
    address: Address,
    decimals: u8,
    total_supply: u64,
    balances: BTreeMap<Address, u64>,
    allowances: HashMap<(Address, Address), u64>,
}

impl StableToken {
    pub fn new(owner: Address, params: &StableParams) -> Self {
        let mut balances = BTreeMap::new();
        if params.total_supply > 0 {
            balances.insert(owner, params.total_supply);
        }
        Self {
            address: params.address,
            decimals: params.decimals,
            total_supply: params.total_supply,
            balances,
            allowances: HashMap::new(),
        }
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: u64) -> Result<()> {
        if to.is_zero() {
            return Err(ExchangeError::Validation("transfer to the empty address".to_string()));
        }
        let available = self.balances.get(&from).copied().unwrap_or(0);
        if amount > available {
            return Err(ExchangeError::InsufficientResource("not enough balance".to_string()));
        }
        if amount == 0 || from == to {
            return Ok(());
        }
        let credited = self
            .balances
            .get(&to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(ExchangeError::overflow)?;

        if available == amount {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, available - amount);
        }
        self.balances.insert(to, credited);
        debug!(%from, %to, amount, "stable transfer");
        Ok(())
    }

    /// Commitment over every non-zero balance in address order.
    pub fn state_root(&self) -> Result<StateRoot> {
        let mut hasher = StateHasher::new(b"stable");
        for (holder, amount) in &self.balances {
            hasher.absorb(&BalanceSnapshot {
                holder: holder.to_word(),
                amount: *amount,
            })?;
        }
        Ok(hasher.finish())
    }
}

impl Token for StableToken {
    fn address(&self) -> Address {
        self.address
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn balance_of(&self, holder: &Address, _now: Timestamp) -> u64 {
        self.balances.get(holder).copied().unwrap_or(0)
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
        self.move_balance(ctx.caller, to, amount)
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
        self.move_balance(from, to, amount)?;
        self.allowances.insert((from, ctx.caller), allowed - amount);
        Ok(())
    }
}

// ============================================================================
// Token store
// ============================================================================

/// Owner of both tokens of the pair.
#[derive(Debug, Clone)]
pub struct TokenStore {
    pub native: Ledger,
    pub stable: StableToken,
}

impl TokenStore {
    pub fn new(native: Ledger, stable: StableToken) -> Self {
        Self { native, stable }
    }

    pub fn token(&self, asset: Asset) -> &dyn Token {
        match asset {
            Asset::Native => &self.native,
            Asset::Stable => &self.stable,
        }
    }

    pub fn token_mut(&mut self, asset: Asset) -> &mut dyn Token {
        match asset {
            Asset::Native => &mut self.native,
            Asset::Stable => &mut self.stable,
        }
    }

    /// Which asset lives at `token`, if either.
    pub fn asset_of(&self, token: &Address) -> Option<Asset> {
        if *token == self.native.address() {
            Some(Asset::Native)
        } else if *token == self.stable.address() {
            Some(Asset::Stable)
        } else {
            None
        }
    }

    pub fn decimals(&self, asset: Asset) -> u8 {
        self.token(asset).decimals()
    }

    /// Move `amount` of `asset` on behalf of `agent`.
    ///
    /// The agent spends its own balance directly and pulls anyone else's
    /// through the allowance they granted it.
    pub fn settle(
        &mut self,
        asset: Asset,
        agent: Address,
        from: Address,
        to: Address,
        amount: u64,
        now: Timestamp,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let ctx = CallContext::new(agent, now);
        let token = self.token_mut(asset);
        if from == agent {
            token.transfer(&ctx, to, amount)
        } else {
            token.transfer_from(&ctx, from, to, amount)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerParams;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn stable(supply: u64) -> StableToken {
        StableToken::new(
            addr(1),
            &StableParams {
                total_supply: supply,
                ..StableParams::default()
            },
        )
    }

    #[test]
    fn test_supply_minted_to_owner() {
        let token = stable(1_000);
        assert_eq!(token.balance_of(&addr(1), 0), 1_000);
        assert_eq!(token.total_supply(), 1_000);
    }

    #[test]
    fn test_transfer_and_overdraft() {
        let mut token = stable(1_000);
        let ctx = CallContext::new(addr(1), 0);
        token.transfer(&ctx, addr(2), 400).unwrap();
        assert_eq!(token.balance_of(&addr(1), 0), 600);
        assert_eq!(token.balance_of(&addr(2), 0), 400);

        let err = token.transfer(&ctx, addr(2), 601).unwrap_err();
        assert_eq!(err, ExchangeError::InsufficientResource("not enough balance".to_string()));
    }

    #[test]
    fn test_transfer_to_empty_address_fails() {
        let mut token = stable(1_000);
        let ctx = CallContext::new(addr(1), 0);
        assert!(matches!(
            token.transfer(&ctx, Address::ZERO, 1),
            Err(ExchangeError::Validation(_))
        ));
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let mut token = stable(1_000);
        token.approve(&CallContext::new(addr(1), 0), addr(9), 300).unwrap();
        assert_eq!(token.spendable(&addr(1), &addr(9), 0), 300);

        let agent = CallContext::new(addr(9), 0);
        token.transfer_from(&agent, addr(1), addr(2), 200).unwrap();
        assert_eq!(token.allowance(&addr(1), &addr(9)), 100);

        let err = token.transfer_from(&agent, addr(1), addr(2), 101).unwrap_err();
        assert_eq!(err, ExchangeError::InsufficientResource("not enough allowance".to_string()));
    }

    #[test]
    fn test_store_resolves_assets() {
        let ledger = Ledger::new(addr(1), &LedgerParams::default());
        let store = TokenStore::new(ledger, stable(10));
        let native = store.native.address();
        let stable_address = store.stable.address();

        assert_eq!(store.asset_of(&native), Some(Asset::Native));
        assert_eq!(store.asset_of(&stable_address), Some(Asset::Stable));
        assert_eq!(store.asset_of(&addr(12345)), None);
        assert_eq!(store.token(Asset::Stable).balance_of(&addr(1), 0), 10);
    }

    #[test]
    fn test_store_settle_uses_allowance_for_others() {
        let ledger = Ledger::new(addr(1), &LedgerParams::default());
        let mut store = TokenStore::new(ledger, stable(1_000));
        let agent = addr(50);

        // Pulling from the owner needs an allowance
        assert!(store.settle(Asset::Stable, agent, addr(1), agent, 10, 0).is_err());
        store
            .stable
            .approve(&CallContext::new(addr(1), 0), agent, 10)
            .unwrap();
        store.settle(Asset::Stable, agent, addr(1), agent, 10, 0).unwrap();

        // The agent spends its own balance directly
        store.settle(Asset::Stable, agent, agent, addr(2), 10, 0).unwrap();
        assert_eq!(store.stable.balance_of(&addr(2), 0), 10);
    }

    #[test]
    fn test_state_root_tracks_balances() {
        let mut token = stable(1_000);
        let before = token.state_root().unwrap();
        token
            .transfer(&CallContext::new(addr(1), 0), addr(2), 1)
            .unwrap();
        assert_ne!(before, token.state_root().unwrap());
    }
}
