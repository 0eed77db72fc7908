//! Venue configuration loaded from TOML.
//!
//! Every section is optional; missing fields take the defaults of the
//! reference deployment (both tokens with 6 decimals, 100 000 000 native
//! tokens, 0.8% exchange fee, 1:1 price floor).
//!
//! ```toml
//! [native]
//! total_supply = 100000000000000
//! daily_interest = 1000200000000000000
//!
//! [exchange]
//! exchange_fee = 1008000000000000000
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine;
use crate::ledger;
use crate::types::price::{MAX_DECIMALS, UNIT};
use crate::types::Address;

/// Default address of the native (interest-accruing) token.
pub const NATIVE_TOKEN_ADDRESS: Address = Address::from_low_u64_be(0xE570_0001);
/// Default address of the stable token.
pub const STABLE_TOKEN_ADDRESS: Address = Address::from_low_u64_be(0x05D7_0001);
/// Default address of the exchange account.
pub const EXCHANGE_ADDRESS: Address = Address::from_low_u64_be(0xEC00_0001);
/// Default address of the interest reserve.
pub const RESERVE_ADDRESS: Address = Address::from_low_u64_be(0x5E5E_0001);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Native token ledger parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerParams {
    pub address: Address,
    pub decimals: u8,
    /// Minted once by `init`, split between exchange, reserve and owner
    pub total_supply: u64,
    /// Account that funds interest and never accrues itself
    pub reserve: Address,
    /// Daily growth factor, scaled by 10^18
    pub daily_interest: u64,
    /// Daily growth factor of referral bonuses, scaled by 10^18
    pub referral_interest: u64,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            address: NATIVE_TOKEN_ADDRESS,
            decimals: 6,
            total_supply: 100_000_000_000_000,
            reserve: RESERVE_ADDRESS,
            daily_interest: 1_000_200_000_000_000_000,
            referral_interest: 1_000_100_000_000_000_000,
        }
    }
}

/// Stable token parameters. The whole supply is minted to the venue owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StableParams {
    pub address: Address,
    pub decimals: u8,
    pub total_supply: u64,
}

impl Default for StableParams {
    fn default() -> Self {
        Self {
            address: STABLE_TOKEN_ADDRESS,
            decimals: 6,
            total_supply: 1_000_000_000_000_000,
        }
    }
}

/// Matching engine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeParams {
    pub address: Address,
    /// Floor price, stable per native, scaled by 10^18
    pub min_price: u64,
    /// Fee factor applied to native sold by traders (1.008 = 0.8%)
    pub exchange_fee: u64,
    /// Share of each fee forwarded to the fee payer's referrer
    pub referral_bonus: u64,
}

impl Default for ExchangeParams {
    fn default() -> Self {
        Self {
            address: EXCHANGE_ADDRESS,
            min_price: UNIT,
            exchange_fee: 1_008_000_000_000_000_000,
            referral_bonus: UNIT / 4,
        }
    }
}

/// Everything needed to build a [`crate::Venue`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    pub native: LedgerParams,
    pub stable: StableParams,
    pub exchange: ExchangeParams,
}

impl VenueConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: VenueConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, decimals) in [("native", self.native.decimals), ("stable", self.stable.decimals)] {
            if decimals > MAX_DECIMALS {
                return Err(ConfigError::Invalid(format!(
                    "{name} decimals {decimals} exceed {MAX_DECIMALS}"
                )));
            }
        }

        let accounts = [
            ("native token", self.native.address),
            ("stable token", self.stable.address),
            ("exchange", self.exchange.address),
            ("reserve", self.native.reserve),
        ];
        let mut seen = HashSet::new();
        for (name, address) in accounts {
            if address.is_zero() {
                return Err(ConfigError::Invalid(format!("{name} address is empty")));
            }
            if !seen.insert(address) {
                return Err(ConfigError::Invalid(format!("{name} address {address} is reused")));
            }
        }

        let invalid = |e: crate::ExchangeError| ConfigError::Invalid(e.to_string());
        ledger::check_rate(self.native.daily_interest).map_err(invalid)?;
        ledger::check_rate(self.native.referral_interest).map_err(invalid)?;
        engine::check_min_price(self.exchange.min_price).map_err(invalid)?;
        engine::check_exchange_fee(self.exchange.exchange_fee).map_err(invalid)?;
        engine::check_referral_bonus(self.exchange.referral_bonus).map_err(invalid)?;
        Ok(())
    }
}
