//! Pool balances and liquidity-provider deposits.
//!
//! A pool is either a set of independent two-token pools (pairwise topology)
//! or one pool shared by every token (multi-token topology). Deposits are
//! fixed at creation; only balances move.

use crate::enums::Topology;
use crate::error::{ConfigError, SwapError};
use crate::token::TokenId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Balance of one token together with the amount deposited at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reserve {
    pub balance: f64,
    pub deposit: f64,
}

impl Reserve {
    pub fn new(deposit: f64) -> Self {
        Self {
            balance: deposit,
            deposit,
        }
    }

    pub fn reset(&mut self) {
        self.balance = self.deposit;
    }
}

/// Unordered token pair; the tokens are stored sorted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub first: TokenId,
    pub second: TokenId,
}

impl PairKey {
    pub fn new(a: TokenId, b: TokenId) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    pub fn contains(&self, token: &TokenId) -> bool {
        &self.first == token || &self.second == token
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairPool {
    pub first: Reserve,
    pub second: Reserve,
    pub k: f64,
}

impl PairPool {
    fn oriented(&self, key: &PairKey, token_in: &TokenId) -> (Reserve, Reserve) {
        if &key.first == token_in {
            (self.first, self.second)
        } else {
            (self.second, self.first)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenReserve {
    pub reserve: Reserve,
    pub k: f64,
}

/// Seed for one pairwise pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSeed {
    pub a: TokenId,
    pub b: TokenId,
    pub balance_a: f64,
    pub balance_b: f64,
    pub k: f64,
}

/// Seed for one token of the shared pool.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSeed {
    pub token: TokenId,
    pub balance: f64,
    pub k: f64,
}

/// Numbers a pricing curve needs for a swap from one token into another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairView {
    pub balance_in: f64,
    pub balance_out: f64,
    pub deposit_in: f64,
    pub deposit_out: f64,
    pub k: f64,
}

impl PairView {
    pub fn fill_in(&self) -> f64 {
        self.balance_in / self.deposit_in
    }

    pub fn fill_out(&self) -> f64 {
        self.balance_out / self.deposit_out
    }

    /// Same pair with different balances, deposits untouched.
    pub fn with_balances(&self, balance_in: f64, balance_out: f64) -> Self {
        Self {
            balance_in,
            balance_out,
            ..*self
        }
    }

    /// The pair seen from the other direction.
    pub fn reversed(&self) -> Self {
        Self {
            balance_in: self.balance_out,
            balance_out: self.balance_in,
            deposit_in: self.deposit_out,
            deposit_out: self.deposit_in,
            k: self.k,
        }
    }
}

/// Serializable view of one reserve, used for summaries and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveSnapshot {
    /// Pool label: `A/B` for pairwise pools, `shared` otherwise.
    pub pool: String,
    pub token: TokenId,
    pub balance: f64,
    pub deposit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PoolState {
    Pairwise(BTreeMap<PairKey, PairPool>),
    Shared(BTreeMap<TokenId, TokenReserve>),
}

fn check_seed(field: &str, balance: f64, k: f64) -> Result<(), ConfigError> {
    if !balance.is_finite() || balance <= 0.0 {
        return Err(ConfigError::invalid(
            field,
            format!("initial balance must be positive, got {balance}"),
        ));
    }
    if !(0.0..=1.0).contains(&k) {
        return Err(ConfigError::invalid(field, format!("k must lie in [0, 1], got {k}")));
    }
    Ok(())
}

impl PoolState {
    /// Creates one independent pool per token pair.
    ///
    /// # Errors
    /// Returns [`ConfigError`] on empty input, duplicate pairs, a pair of a
    /// token with itself, non-positive balances or k outside [0, 1].
    pub fn pairwise(seeds: impl IntoIterator<Item = PairSeed>) -> Result<Self, ConfigError> {
        let mut pools = BTreeMap::new();
        for seed in seeds {
            let label = format!("pool {}/{}", seed.a, seed.b);
            if seed.a == seed.b {
                return Err(ConfigError::invalid(label, "a pool needs two distinct tokens"));
            }
            check_seed(&label, seed.balance_a, seed.k)?;
            check_seed(&label, seed.balance_b, seed.k)?;

            let key = PairKey::new(seed.a.clone(), seed.b.clone());
            let (first, second) = if key.first == seed.a {
                (seed.balance_a, seed.balance_b)
            } else {
                (seed.balance_b, seed.balance_a)
            };
            let pool = PairPool {
                first: Reserve::new(first),
                second: Reserve::new(second),
                k: seed.k,
            };
            if pools.insert(key, pool).is_some() {
                return Err(ConfigError::invalid(label, "duplicate pool"));
            }
        }
        if pools.is_empty() {
            return Err(ConfigError::Missing("pools".to_string()));
        }
        debug!(pools = pools.len(), "Pairwise pool created");
        Ok(Self::Pairwise(pools))
    }

    /// Creates a single pool shared by every token.
    ///
    /// # Errors
    /// Returns [`ConfigError`] on fewer than two tokens, duplicates,
    /// non-positive balances or k outside [0, 1].
    pub fn shared(seeds: impl IntoIterator<Item = TokenSeed>) -> Result<Self, ConfigError> {
        let mut reserves = BTreeMap::new();
        for seed in seeds {
            let label = format!("token {}", seed.token);
            check_seed(&label, seed.balance, seed.k)?;
            let reserve = TokenReserve {
                reserve: Reserve::new(seed.balance),
                k: seed.k,
            };
            if reserves.insert(seed.token, reserve).is_some() {
                return Err(ConfigError::invalid(label, "duplicate token"));
            }
        }
        if reserves.len() < 2 {
            return Err(ConfigError::invalid("tokens", "a shared pool needs at least two tokens"));
        }
        debug!(tokens = reserves.len(), "Shared pool created");
        Ok(Self::Shared(reserves))
    }

    pub fn topology(&self) -> Topology {
        match self {
            Self::Pairwise(_) => Topology::Pairwise,
            Self::Shared(_) => Topology::Shared,
        }
    }

    pub fn is_multi_token(&self) -> bool {
        self.topology() == Topology::Shared
    }

    /// Every token held by the pool, sorted.
    pub fn tokens(&self) -> Vec<TokenId> {
        match self {
            Self::Pairwise(pools) => {
                let mut tokens: Vec<TokenId> = pools
                    .keys()
                    .flat_map(|k| [k.first.clone(), k.second.clone()])
                    .collect();
                tokens.sort();
                tokens.dedup();
                tokens
            }
            Self::Shared(reserves) => reserves.keys().cloned().collect(),
        }
    }

    /// Every tradable (input, output) direction in a fixed order.
    pub fn directed_pairs(&self) -> Vec<(TokenId, TokenId)> {
        let mut pairs = Vec::new();
        match self {
            Self::Pairwise(pools) => {
                for key in pools.keys() {
                    pairs.push((key.first.clone(), key.second.clone()));
                    pairs.push((key.second.clone(), key.first.clone()));
                }
            }
            Self::Shared(reserves) => {
                let tokens: Vec<&TokenId> = reserves.keys().collect();
                for (i, a) in tokens.iter().enumerate() {
                    for b in &tokens[i + 1..] {
                        pairs.push(((*a).clone(), (*b).clone()));
                        pairs.push(((*b).clone(), (*a).clone()));
                    }
                }
            }
        }
        pairs
    }

    /// Balances, deposits and k for a swap from `token_in` into `token_out`.
    ///
    /// In the shared pool the pair's k is the larger of the two tokens' k.
    ///
    /// # Errors
    /// [`SwapError::UnknownToken`] when the pool does not trade the pair.
    pub fn view(&self, token_in: &TokenId, token_out: &TokenId) -> Result<PairView, SwapError> {
        if token_in == token_out {
            return Err(SwapError::UnknownToken(token_out.clone()));
        }
        match self {
            Self::Pairwise(pools) => {
                let key = PairKey::new(token_in.clone(), token_out.clone());
                let pool = pools
                    .get(&key)
                    .ok_or_else(|| SwapError::UnknownToken(token_out.clone()))?;
                let (r_in, r_out) = pool.oriented(&key, token_in);
                Ok(PairView {
                    balance_in: r_in.balance,
                    balance_out: r_out.balance,
                    deposit_in: r_in.deposit,
                    deposit_out: r_out.deposit,
                    k: pool.k,
                })
            }
            Self::Shared(reserves) => {
                let r_in = reserves
                    .get(token_in)
                    .ok_or_else(|| SwapError::UnknownToken(token_in.clone()))?;
                let r_out = reserves
                    .get(token_out)
                    .ok_or_else(|| SwapError::UnknownToken(token_out.clone()))?;
                Ok(PairView {
                    balance_in: r_in.reserve.balance,
                    balance_out: r_out.reserve.balance,
                    deposit_in: r_in.reserve.deposit,
                    deposit_out: r_out.reserve.deposit,
                    k: r_in.k.max(r_out.k),
                })
            }
        }
    }

    /// Writes the post-swap balances of both tokens of a pair.
    ///
    /// Both reserves are resolved before either is written, so a failed
    /// lookup leaves the pool untouched.
    ///
    /// # Errors
    /// [`SwapError::UnknownToken`] when the pool does not trade the pair.
    pub fn set_balances(
        &mut self,
        token_in: &TokenId,
        token_out: &TokenId,
        balance_in: f64,
        balance_out: f64,
    ) -> Result<(), SwapError> {
        self.view(token_in, token_out)?;
        match self {
            Self::Pairwise(pools) => {
                let key = PairKey::new(token_in.clone(), token_out.clone());
                let pool = pools
                    .get_mut(&key)
                    .ok_or_else(|| SwapError::UnknownToken(token_out.clone()))?;
                if &key.first == token_in {
                    pool.first.balance = balance_in;
                    pool.second.balance = balance_out;
                } else {
                    pool.second.balance = balance_in;
                    pool.first.balance = balance_out;
                }
            }
            Self::Shared(reserves) => {
                if let Some(r) = reserves.get_mut(token_in) {
                    r.reserve.balance = balance_in;
                }
                if let Some(r) = reserves.get_mut(token_out) {
                    r.reserve.balance = balance_out;
                }
            }
        }
        Ok(())
    }

    /// Restores every balance to its deposit.
    pub fn reset(&mut self) {
        debug!(topology = ?self.topology(), "Restoring balances to deposits");
        match self {
            Self::Pairwise(pools) => {
                for pool in pools.values_mut() {
                    pool.first.reset();
                    pool.second.reset();
                }
            }
            Self::Shared(reserves) => {
                for r in reserves.values_mut() {
                    r.reserve.reset();
                }
            }
        }
    }

    pub fn snapshot(&self) -> Vec<ReserveSnapshot> {
        match self {
            Self::Pairwise(pools) => pools
                .iter()
                .flat_map(|(key, pool)| {
                    let label = format!("{}/{}", key.first, key.second);
                    [
                        ReserveSnapshot {
                            pool: label.clone(),
                            token: key.first.clone(),
                            balance: pool.first.balance,
                            deposit: pool.first.deposit,
                        },
                        ReserveSnapshot {
                            pool: label,
                            token: key.second.clone(),
                            balance: pool.second.balance,
                            deposit: pool.second.deposit,
                        },
                    ]
                })
                .collect(),
            Self::Shared(reserves) => reserves
                .iter()
                .map(|(token, r)| ReserveSnapshot {
                    pool: "shared".to_string(),
                    token: token.clone(),
                    balance: r.reserve.balance,
                    deposit: r.reserve.deposit,
                })
                .collect(),
        }
    }
}
