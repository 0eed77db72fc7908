//! Pegged Exchange - demo binary
//!
//! Boots a venue from a TOML config (or the defaults), runs a buy against the
//! exchange inventory and a fee-paying sell, then lets interest accrue.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pegged_exchange::types::price::from_units;
use pegged_exchange::types::{Address, CallContext, DAY};
use pegged_exchange::{Venue, VenueConfig};

#[derive(Debug, Parser)]
#[command(name = "pegged-exchange", about = "Run a scripted session against an in-memory venue")]
struct Args {
    /// TOML venue configuration; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Days to let interest accrue after trading
    #[arg(long, default_value_t = 30)]
    days: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "pegged_exchange=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => VenueConfig::from_file(path)?,
        None => VenueConfig::default(),
    };
    let native_decimals = config.native.decimals;
    let stable_decimals = config.stable.decimals;

    let owner = Address::from_low_u64_be(0x0A11);
    let bob = Address::from_low_u64_be(0x0B0B);
    let mut venue = Venue::new(config, owner);
    venue.init(&CallContext::new(owner, 0))?;

    let native = venue.native_token();
    let stable = venue.stable_token();
    let exchange = venue.exchange_address();
    let one_native = 10u64.pow(u32::from(native_decimals));
    let one_stable = 10u64.pow(u32::from(stable_decimals));

    // Bob buys 1 native for 1 stable from the exchange inventory
    let owner_ctx = CallContext::new(owner, 0);
    let bob_ctx = CallContext::new(bob, 0);
    venue.transfer(&owner_ctx, &stable, bob, one_stable)?;
    venue.approve(&bob_ctx, &stable, exchange, one_stable)?;
    let receipt = venue.trade(&bob_ctx, stable, one_stable, native, one_native, owner)?;
    info!(fills = receipt.fills.len(), received = receipt.received, "bob bought native");

    // A day later Bob sells half back; the fee comes out of the native he delivers
    let sell_ctx = CallContext::new(bob, DAY);
    let (gross, net) = (one_native / 2 * 1_008 / 1_000, one_stable / 2);
    venue.approve(&sell_ctx, &native, exchange, gross)?;
    let receipt = venue.trade(&sell_ctx, native, gross, stable, net, Address::ZERO)?;
    info!(
        received = %from_units(receipt.received, stable_decimals),
        fee = %from_units(receipt.fees, native_decimals),
        "bob sold native"
    );

    let later = DAY * (1 + args.days);
    venue.accrue_interest(&CallContext::new(owner, later))?;
    for (name, who) in [("owner", owner), ("bob", bob), ("exchange", exchange)] {
        info!(
            holder = name,
            native = %from_units(venue.native_balance_of(&who, later), native_decimals),
            stable = %from_units(venue.stable_balance_of(&who, later), stable_decimals),
            "balance after {} days", args.days
        );
    }
    info!(
        holders = venue.holders_counter(),
        supply = %from_units(venue.total_supply(), native_decimals),
        root = %venue.state_root()?,
        "venue state"
    );
    Ok(())
}
