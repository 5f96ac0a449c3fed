//! Builds the initial pool of a run.
//!
//! Every token starts with `constant / start_price` units, so each pool begins
//! at an equilibrium point with equal dollar depth on every side.

use crate::config::{K_SEED_OFFSET, SimulationConfig};
use mmsim_domain::error::ConfigError;
use mmsim_domain::pool::{PairSeed, PoolState, TokenSeed};
use mmsim_domain::token::TokenId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::debug;

/// Used by curves that ignore k.
const NEUTRAL_K: f64 = 1.0;

/// Curve parameter of every token.
///
/// A fixed `k` applies to all tokens. With `random_k` each token draws from
/// the grid {0.001, ..., 0.999}, in configuration order, from a generator
/// seeded off the run seed.
#[must_use]
pub fn token_k(config: &SimulationConfig) -> BTreeMap<TokenId, f64> {
    let mm = &config.market_maker;
    if mm.random_k {
        let mut rng = StdRng::seed_from_u64(config.component_seed(K_SEED_OFFSET));
        config
            .token_ids()
            .map(|t| (t.clone(), f64::from(rng.random_range(1..1000u32)) / 1000.0))
            .collect()
    } else {
        let k = mm.k.unwrap_or(NEUTRAL_K);
        config.token_ids().map(|t| (t.clone(), k)).collect()
    }
}

/// Creates the pool described by a validated configuration.
///
/// Pairwise variants get one pool per unordered token pair, with k the mean
/// of the two tokens' k. Shared variants get a single pool; the pair k is
/// resolved per swap by the pool itself.
///
/// # Errors
/// Returns [`ConfigError`] when a balance or k is out of range.
pub fn build_pool(config: &SimulationConfig) -> Result<PoolState, ConfigError> {
    let ks = token_k(config);
    let constant = config.market_maker.constant;
    let balances: Vec<(TokenId, f64)> = config
        .tokens
        .iter()
        .map(|t| (t.symbol.clone(), constant / t.start_price))
        .collect();
    let k_of = |token: &TokenId| ks.get(token).copied().unwrap_or(NEUTRAL_K);

    let pool = if config.market_maker.multi_token() {
        PoolState::shared(balances.iter().map(|(token, balance)| TokenSeed {
            token: token.clone(),
            balance: *balance,
            k: k_of(token),
        }))?
    } else {
        let mut seeds = Vec::new();
        for (i, (a, balance_a)) in balances.iter().enumerate() {
            for (b, balance_b) in &balances[i + 1..] {
                seeds.push(PairSeed {
                    a: a.clone(),
                    b: b.clone(),
                    balance_a: *balance_a,
                    balance_b: *balance_b,
                    k: (k_of(a) + k_of(b)) / 2.0,
                });
            }
        }
        PoolState::pairwise(seeds)?
    };

    debug!(
        kind = %config.market_maker.kind,
        tokens = balances.len(),
        multi_token = pool.is_multi_token(),
        "Pool initialized"
    );
    Ok(pool)
}
