//! Randomized stress tests for the venue.
//!
//! These tests verify:
//! 1. Long random call sequences never panic
//! 2. Failed calls leave no trace in the state root
//! 3. Stable units are conserved and resting orders stay consistent
//! 4. Determinism is preserved across runs
//!
//! ## Running Stress Tests
//!
//! ```bash
//! cargo test --release --test stress_test -- --nocapture
//! ```

use std::time::Instant;

use pegged_exchange::types::{Address, CallContext, Side, Timestamp, Uid, DAY};
use pegged_exchange::{Venue, VenueConfig};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ============================================================================
// TEST CONSTANTS
// ============================================================================

const ONE: u64 = 1_000_000;

/// Number of simulated traders
const TRADERS: u64 = 16;

/// Stable handed to every trader up front
const STARTING_STABLE: u64 = 1_000 * ONE;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn owner() -> Address {
    Address::from_low_u64_be(0x0A11)
}

fn trader(i: u64) -> Address {
    Address::from_low_u64_be(0x1000 + i)
}

/// Venue with every trader funded and both tokens approved for the exchange.
fn funded_venue() -> Venue {
    let mut venue = Venue::new(VenueConfig::default(), owner());
    venue.init(&CallContext::new(owner(), 0)).unwrap();
    let (stable, native) = (venue.stable_token(), venue.native_token());
    let exchange = venue.exchange_address();

    for i in 0..TRADERS {
        let ctx = CallContext::new(trader(i), 0);
        venue
            .transfer(&CallContext::new(owner(), 0), &stable, trader(i), STARTING_STABLE)
            .unwrap();
        venue.approve(&ctx, &stable, exchange, u64::MAX).unwrap();
        venue.approve(&ctx, &native, exchange, u64::MAX).unwrap();
    }
    venue
}

#[derive(Debug, Default)]
struct Stats {
    calls: usize,
    failed: usize,
    fills: usize,
    rested: usize,
    cancelled: usize,
}

/// Drive `steps` random calls against `venue`, checking invariants as it goes.
fn run_random_sequence(venue: &mut Venue, seed: u64, steps: usize) -> (Stats, Timestamp) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (stable, native) = (venue.stable_token(), venue.native_token());
    let mut resting: Vec<Uid> = Vec::new();
    let mut stats = Stats::default();
    let mut now: Timestamp = 0;

    for _ in 0..steps {
        now += rng.gen_range(0..3_600);
        let who = trader(rng.gen_range(0..TRADERS));
        let ctx = CallContext::new(who, now);
        let referrer = if rng.gen_bool(0.2) {
            trader(rng.gen_range(0..TRADERS))
        } else {
            Address::ZERO
        };
        let before = venue.state_root().unwrap();

        let result = match rng.gen_range(0..10) {
            // Buy native, limit between 1.0 and 1.2 stable per native
            0..=3 => {
                let spend = rng.gen_range(ONE / 10..=5 * ONE);
                let ratio = rng.gen_range(1_000..=1_200);
                let want = spend * 1_000 / ratio;
                venue
                    .trade(&ctx, stable, spend, native, want, referrer)
                    .map(Some)
            }
            // Sell native, net limit at or above the floor
            4..=7 => {
                let held = venue.native_balance_of(&who, now);
                if held < ONE / 10 {
                    Ok(None)
                } else {
                    let give = rng.gen_range(ONE / 10..=held.min(3 * ONE));
                    let ratio = rng.gen_range(1_010..=1_300);
                    let want = give * ratio / 1_008;
                    venue
                        .trade(&ctx, native, give, stable, want, referrer)
                        .map(Some)
                }
            }
            8 if !resting.is_empty() => {
                let uid = resting.swap_remove(rng.gen_range(0..resting.len()));
                let ctx = CallContext::new(uid.owner, now);
                match venue.cancel(&ctx, &uid) {
                    Ok(_) => {
                        stats.cancelled += 1;
                        Ok(None)
                    }
                    // Filled or pruned since it was placed
                    Err(_) => Ok(None),
                }
            }
            9 if !resting.is_empty() => {
                let uid = resting[rng.gen_range(0..resting.len())];
                venue
                    .continue_trade(&CallContext::new(uid.owner, now), &uid)
                    .map(Some)
            }
            _ => venue.accrue_interest(&ctx).map(|()| None),
        };
        stats.calls += 1;

        match result {
            Ok(Some(receipt)) => {
                stats.fills += receipt.fills.len();
                if let Some(uid) = receipt.order {
                    if !resting.contains(&uid) {
                        stats.rested += 1;
                        resting.push(uid);
                    }
                }
            }
            Ok(None) => {}
            Err(_) => {
                stats.failed += 1;
                assert_eq!(venue.state_root().unwrap(), before, "failed call changed state");
            }
        }
        check_invariants(venue, now);
    }
    (stats, now)
}

fn check_invariants(venue: &Venue, now: Timestamp) {
    // Stable units only ever move
    let exchange = venue.exchange_address();
    let mut total = venue.stable_balance_of(&owner(), now) + venue.stable_balance_of(&exchange, now);
    for i in 0..TRADERS {
        total += venue.stable_balance_of(&trader(i), now);
    }
    assert_eq!(total, VenueConfig::default().stable.total_supply);

    // Bucket totals agree with the orders they hold
    let book = venue.exchange().book();
    for side in [Side::Buy, Side::Sell] {
        let depth = book.depth(side);
        assert_eq!(depth.len(), book.level_count(side));
        for (price, remaining, count) in depth {
            let uids = book.get_uids_by_price(side, price);
            assert_eq!(uids.len(), count);
            let sum: u64 = uids.iter().map(|uid| book.get_order_by_uid(uid).remaining()).sum();
            assert_eq!(sum, remaining);
        }
    }

    // Withheld fees always cover what was paid out to referrers
    assert!(venue.collected_fees() >= venue.exchange().referral_payouts());

    // Every order a trader is shown is one they can deliver
    for i in 0..TRADERS {
        let ctx = CallContext::new(trader(i), now);
        for uid in venue.get_my_orders(&ctx) {
            let order = venue.get_order_by_uid(&uid);
            assert_eq!(order.trader, trader(i));
            let balance = match uid.side {
                Side::Buy => venue.stable_balance_of(&trader(i), now),
                Side::Sell => venue.native_balance_of(&trader(i), now),
            };
            assert!(balance >= order.remaining());
        }
    }
}

// ============================================================================
// STRESS TESTS
// ============================================================================

/// Long random sequence: no panics, no partial state on failure.
#[test]
fn stress_random_sequence() {
    println!("\n=== STRESS TEST: random venue calls ===\n");

    const STEPS: usize = 2_000;
    let mut venue = funded_venue();

    let start = Instant::now();
    let (stats, now) = run_random_sequence(&mut venue, 42, STEPS);
    let elapsed = start.elapsed();

    println!("  Calls:             {:>12}", stats.calls);
    println!("  Failed:            {:>12}", stats.failed);
    println!("  Fills:             {:>12}", stats.fills);
    println!("  Orders rested:     {:>12}", stats.rested);
    println!("  Orders cancelled:  {:>12}", stats.cancelled);
    println!("  Final book size:   {:>12}", venue.exchange().book().len());
    println!("  Simulated days:    {:>12}", now / DAY);
    println!("  Elapsed time:      {:>12.2?}", elapsed);
    println!("  State root:        {}", venue.state_root().unwrap());

    assert_eq!(stats.calls, STEPS);
    assert!(stats.fills > 0, "expected some fills");
    assert!(stats.rested > 0, "expected some orders to rest");

    println!("\n=== STRESS TEST PASSED ===\n");
}

/// Same seed, same state root; different seed, different root.
#[test]
fn verify_determinism() {
    println!("\n=== DETERMINISM TEST ===\n");

    const STEPS: usize = 500;
    const SEED: u64 = 12345;

    let run = |seed| {
        let mut venue = funded_venue();
        run_random_sequence(&mut venue, seed, STEPS);
        venue.state_root().unwrap()
    };

    let root1 = run(SEED);
    let root2 = run(SEED);
    println!("  Run 1 state root: {root1}");
    println!("  Run 2 state root: {root2}");
    assert_eq!(root1, root2, "State roots must match for determinism");

    let root3 = run(SEED + 1);
    println!("  Different seed:   {root3}");
    assert_ne!(root1, root3, "Different seeds should produce different roots");

    println!("\n=== DETERMINISM VERIFIED ===\n");
}

/// Interest keeps accruing over a long quiet period without breaking reads.
#[test]
fn stress_long_idle_accrual() {
    let mut venue = funded_venue();
    let (stats, now) = run_random_sequence(&mut venue, 7, 300);
    assert!(stats.fills > 0);

    let later = now + 3_650 * DAY;
    let mut previous: Vec<u64> = (0..TRADERS)
        .map(|i| venue.native_balance_of(&trader(i), now))
        .collect();
    for year in 1..=10 {
        let at = now + year * 365 * DAY;
        for (i, prev) in previous.iter_mut().enumerate() {
            let balance = venue.native_balance_of(&trader(i as u64), at);
            assert!(balance >= *prev);
            *prev = balance;
        }
    }

    for i in 0..TRADERS {
        venue.accrue_interest(&CallContext::new(trader(i), later)).unwrap();
    }
    check_invariants(&venue, later);
}
