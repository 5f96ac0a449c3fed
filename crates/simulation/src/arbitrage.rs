//! Corrective swaps that pull pool rates toward the market rate.
//!
//! Each action scans every tradable direction in a fixed order, scores how
//! far the pool's average rate to equilibrium is below the market rate, and
//! trades a fraction of the gap on the most profitable direction.

use crate::config::ArbitrageConfig;
use crate::executor::SwapExecutor;
use mmsim_domain::pool::PoolState;
use mmsim_domain::swap::Swap;
use mmsim_domain::token::{PriceOracle, TokenId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use tracing::debug;

/// One corrective swap chosen by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ArbitrageAction {
    /// Swap to execute.
    pub swap: Swap,
    /// Market rate over the pool's average rate to equilibrium.
    pub score: f64,
    /// Input needed to reach equilibrium in one swap.
    pub gap: f64,
}

/// Arbitrage engine with its own seeded random source.
#[derive(Debug, Clone)]
pub struct ArbitrageEngine {
    config: ArbitrageConfig,
    rng: StdRng,
    protected: BTreeSet<TokenId>,
}

impl ArbitrageEngine {
    /// Creates an engine. `protected` tokens are never withdrawn from the pool.
    #[must_use]
    pub fn new(config: ArbitrageConfig, seed: u64, protected: BTreeSet<TokenId>) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            protected,
        }
    }

    /// Returns whether the engine acts at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Corrective swaps issued per arbitrage event.
    #[must_use]
    pub fn actions_per_event(&self) -> usize {
        self.config.actions
    }

    /// Whether the stream entry at `index` of its batch is an arbitrage event.
    #[must_use]
    pub fn triggers(&self, swap: &Swap, index: usize) -> bool {
        self.is_enabled() && swap.is_arb && index >= self.config.start_index
    }

    /// Picks the next corrective swap, or `None` when no direction pays.
    ///
    /// Directions whose equilibrium cannot be computed are passed over.
    pub fn next_action(
        &mut self,
        pool: &PoolState,
        oracle: &PriceOracle,
        executor: &SwapExecutor,
    ) -> Option<ArbitrageAction> {
        let curve = executor.curve();
        let mut best: Option<(TokenId, TokenId, f64, f64)> = None;

        for (token_in, token_out) in pool.directed_pairs() {
            if self.protected.contains(&token_out) {
                continue;
            }
            let Ok(view) = pool.view(&token_in, &token_out) else {
                continue;
            };
            let Ok(market) = executor.market(oracle, &token_in, &token_out) else {
                continue;
            };
            let eq = match curve.equilibrium_point(&view, &market) {
                Ok(eq) => eq,
                Err(e) => {
                    debug!(token_in = %token_in, token_out = %token_out, error = %e, "No equilibrium");
                    continue;
                }
            };

            let in_amt = eq.input - view.balance_in;
            let out_amt = view.balance_out - eq.output;
            if in_amt <= self.config.min_input || out_amt <= 0.0 {
                continue;
            }
            let score = market.rate() / (in_amt / out_amt);
            if !score.is_finite() {
                continue;
            }
            if best.as_ref().is_none_or(|(_, _, s, _)| score > *s) {
                best = Some((token_in, token_out, score, in_amt));
            }
        }

        let (token_in, token_out, score, gap) = best?;
        if score <= 1.0 {
            return None;
        }

        let noise = if self.config.jitter > 0.0 {
            self.config.jitter * self.rng.random_range(-1.0..=1.0)
        } else {
            0.0
        };
        let amount = self.config.step_fraction * gap * (1.0 + noise);
        Some(ArbitrageAction {
            swap: Swap::arbitrage_event(token_in, token_out, amount),
            score,
            gap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmsim_domain::curve::PricingCurve;
    use mmsim_domain::pool::PairSeed;
    use mmsim_domain::token::PriceSnapshot;

    fn pool() -> PoolState {
        PoolState::pairwise([PairSeed {
            a: "X".into(),
            b: "Y".into(),
            balance_a: 1_000.0,
            balance_b: 1_000.0,
            k: 0.5,
        }])
        .unwrap()
    }

    fn oracle(price_x: f64, price_y: f64) -> PriceOracle {
        let mut oracle = PriceOracle::new();
        oracle.advance(
            0,
            PriceSnapshot::new().with_price("X", price_x).with_price("Y", price_y),
        );
        oracle
    }

    fn engine(protected: &[&str]) -> ArbitrageEngine {
        ArbitrageEngine::new(
            ArbitrageConfig::enabled(3),
            42,
            protected.iter().map(|t| TokenId::from(*t)).collect(),
        )
    }

    #[test]
    fn test_buys_the_cheap_token() {
        // Y doubled: the pool still sells Y at 1 X, so pay X and take Y
        let executor = SwapExecutor::new(PricingCurve::ConstantProduct);
        let action = engine(&[])
            .next_action(&pool(), &oracle(1.0, 2.0), &executor)
            .unwrap();
        assert_eq!(action.swap.token_in.as_str(), "X");
        assert_eq!(action.swap.token_out.as_str(), "Y");
        assert!(action.swap.is_arb);
        assert!(action.score > 1.0);
        assert!((action.swap.amount_in - 0.5 * action.gap).abs() < 1e-12);
    }

    #[test]
    fn test_no_action_at_market_rate() {
        let executor = SwapExecutor::new(PricingCurve::ConstantProduct);
        assert!(engine(&[]).next_action(&pool(), &oracle(1.0, 1.0), &executor).is_none());
    }

    #[test]
    fn test_constant_sum_never_arbitrages() {
        let executor = SwapExecutor::new(PricingCurve::ConstantSum);
        assert!(engine(&[]).next_action(&pool(), &oracle(1.0, 3.0), &executor).is_none());
    }

    #[test]
    fn test_protected_token_never_withdrawn() {
        let executor = SwapExecutor::new(PricingCurve::ConstantProduct);
        assert!(engine(&["Y"]).next_action(&pool(), &oracle(1.0, 2.0), &executor).is_none());
    }

    #[test]
    fn test_actions_converge_toward_market() {
        let executor = SwapExecutor::new(PricingCurve::Proactive);
        let mut engine = engine(&[]);
        let mut pool = pool();
        let oracle = oracle(1.0, 1.0);
        // a pool at its deposits already quotes the market rate
        assert!(engine.next_action(&pool, &oracle, &executor).is_none());

        executor
            .execute(&mut pool, &oracle, &Swap::new("X", "Y", 300.0))
            .unwrap();
        let mut last_score = f64::INFINITY;
        for _ in 0..3 {
            let action = engine.next_action(&pool, &oracle, &executor).unwrap();
            assert!(action.score < last_score);
            last_score = action.score;
            executor.execute(&mut pool, &oracle, &action.swap).unwrap();
        }
    }

    #[test]
    fn test_triggers_respect_start_index() {
        let engine = ArbitrageEngine::new(
            ArbitrageConfig::enabled(1).with_start_index(2),
            0,
            BTreeSet::new(),
        );
        let event = Swap::arbitrage_event("X", "Y", 1.0);
        assert!(!engine.triggers(&event, 1));
        assert!(engine.triggers(&event, 2));
        assert!(!engine.triggers(&Swap::new("X", "Y", 1.0), 5));
    }

    #[test]
    fn test_disabled_engine_never_triggers() {
        let engine = ArbitrageEngine::new(ArbitrageConfig::default(), 0, BTreeSet::new());
        assert!(!engine.is_enabled());
        let event = Swap::arbitrage_event("X", "Y", 1.0);
        assert!((0..4).all(|index| !engine.triggers(&event, index)));
    }
}
