//! Price stream generators.
//!
//! A price stream holds one [`PriceSnapshot`] per batch. The first snapshot
//! always carries the configured start prices.

use crate::config::{PRICE_SEED_OFFSET, SimulationConfig};
use mmsim_domain::token::{PriceSnapshot, TokenId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Prices never fall below this floor, so a crashing token stays priced.
const MIN_PRICE: f64 = 1e-12;

pub trait PriceStreamGenerator {
    /// Returns one snapshot per batch.
    fn generate(&mut self, batches: usize) -> Vec<PriceSnapshot>;
}

/// Walk parameters of one token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWalk {
    /// Token the walk prices.
    pub token: TokenId,
    /// Price of the first batch.
    pub start_price: f64,
    /// Mean relative change when the price moves.
    pub drift: f64,
    /// Standard deviation of the relative change.
    pub volatility: f64,
    /// Probability that the price moves in a batch.
    pub change_probability: f64,
}

/// Seeded random walk: each batch a token's price moves with probability
/// `change_probability` to `(1 + drift + volatility * z) * price`.
#[derive(Debug, Clone)]
pub struct RandomWalkPrices {
    walks: Vec<TokenWalk>,
    rng: StdRng,
}

impl RandomWalkPrices {
    #[must_use]
    pub fn new(walks: Vec<TokenWalk>, seed: u64) -> Self {
        Self {
            walks,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Builds the walk of every configured token, applying per-token overrides.
    #[must_use]
    pub fn from_config(config: &SimulationConfig) -> Self {
        let defaults = &config.prices;
        let walks = config
            .tokens
            .iter()
            .map(|t| TokenWalk {
                token: t.symbol.clone(),
                start_price: t.start_price,
                drift: config.drift_of(t),
                volatility: t.volatility.unwrap_or(defaults.volatility),
                change_probability: t.change_probability.unwrap_or(defaults.change_probability),
            })
            .collect();
        Self::new(walks, config.component_seed(PRICE_SEED_OFFSET))
    }

    fn snapshot(&self, prices: &[f64]) -> PriceSnapshot {
        self.walks
            .iter()
            .zip(prices)
            .map(|(w, p)| (w.token.clone(), *p))
            .collect()
    }
}

impl PriceStreamGenerator for RandomWalkPrices {
    fn generate(&mut self, batches: usize) -> Vec<PriceSnapshot> {
        let mut stream = Vec::with_capacity(batches);
        if batches == 0 {
            return stream;
        }

        let mut prices: Vec<f64> = self.walks.iter().map(|w| w.start_price).collect();
        stream.push(self.snapshot(&prices));

        for _ in 1..batches {
            for (walk, price) in self.walks.iter().zip(prices.iter_mut()) {
                if !self.rng.random_bool(walk.change_probability) {
                    continue;
                }
                let z: f64 = self.rng.sample(StandardNormal);
                let change = walk.drift + walk.volatility * z;
                *price = (*price * (1.0 + change)).max(MIN_PRICE);
            }
            stream.push(self.snapshot(&prices));
        }
        stream
    }
}

/// Replays a fixed list of snapshots.
#[derive(Debug, Clone, Default)]
pub struct DeterministicPrices {
    pub snapshots: Vec<PriceSnapshot>,
}

impl DeterministicPrices {
    #[must_use]
    pub fn new(snapshots: Vec<PriceSnapshot>) -> Self {
        Self { snapshots }
    }
}

impl PriceStreamGenerator for DeterministicPrices {
    fn generate(&mut self, batches: usize) -> Vec<PriceSnapshot> {
        self.snapshots.iter().take(batches).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MarketMakerConfig, TokenConfig};
    use mmsim_domain::enums::MarketMakerType;

    fn config() -> SimulationConfig {
        let mut cfg = SimulationConfig::new(
            MarketMakerConfig::new(MarketMakerType::Amm, 1_000.0),
            vec![
                TokenConfig::new("BTC", 23_004.0),
                TokenConfig::new("UST", 1.0).with_drift(-0.05),
            ],
        );
        cfg.prices.volatility = 0.01;
        cfg.prices.change_probability = 1.0;
        cfg
    }

    #[test]
    fn test_random_walk_generation() {
        let path = RandomWalkPrices::from_config(&config()).generate(10);

        assert_eq!(path.len(), 10);
        assert_eq!(path[0].get(&"BTC".into()), Some(23_004.0));
        assert_eq!(path[0].get(&"UST".into()), Some(1.0));

        let all_same = path.iter().all(|p| p.get(&"BTC".into()) == Some(23_004.0));
        assert!(!all_same);
        // strong negative drift dominates the noise
        assert!(path[9].get(&"UST".into()).unwrap() < 1.0);
        assert!(path.iter().all(|p| p.iter().all(|(_, v)| v > 0.0)));
    }

    #[test]
    fn test_random_walk_is_seeded() {
        let cfg = config().with_seed(5);
        let first = RandomWalkPrices::from_config(&cfg).generate(20);
        let second = RandomWalkPrices::from_config(&cfg).generate(20);
        assert_eq!(first, second);

        let other = RandomWalkPrices::from_config(&cfg.with_seed(6)).generate(20);
        assert_ne!(first, other);
    }

    #[test]
    fn test_frozen_prices() {
        let mut cfg = config();
        cfg.prices.change_probability = 0.0;
        cfg.tokens[1].change_probability = Some(0.0);
        let path = RandomWalkPrices::from_config(&cfg).generate(5);
        assert!(path.iter().all(|p| *p == path[0]));
    }

    #[test]
    fn test_deterministic_replay() {
        let snapshots = vec![
            PriceSnapshot::new().with_price("X", 1.0),
            PriceSnapshot::new().with_price("X", 2.0),
        ];
        let mut replay = DeterministicPrices::new(snapshots.clone());
        assert_eq!(replay.generate(2), snapshots);
        assert_eq!(replay.generate(1).len(), 1);
    }
}
