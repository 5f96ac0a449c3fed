//! Applies single swaps to a pool.
//!
//! [`SwapExecutor`] is the only code that writes pool balances. It prices the
//! swap through the configured [`PricingCurve`], enforces the cap limit and
//! measures the swap before committing it.

use crate::config::CapPolicy;
use mmsim_domain::curve::PricingCurve;
use mmsim_domain::error::SwapError;
use mmsim_domain::math::{FLOAT_TOLERANCE, PairMarket, SwapQuote};
use mmsim_domain::metrics::impermanent_loss::calculate_il_ratio;
use mmsim_domain::metrics::{SwapMetrics, TokenRatio};
use mmsim_domain::pool::{PairView, PoolState};
use mmsim_domain::swap::Swap;
use mmsim_domain::token::{PriceOracle, TokenId};
use tracing::debug;

/// Priced swap that passed the cap check, not yet applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckedQuote {
    /// Pool view the quote was computed on.
    pub view: PairView,
    /// Prices used for the quote.
    pub market: PairMarket,
    /// Curve output.
    pub quote: SwapQuote,
    /// Whether the input was reduced to respect the cap.
    pub clamped: bool,
}

/// Prices, checks and applies swaps for one market maker.
#[derive(Debug, Clone, Copy)]
pub struct SwapExecutor {
    curve: PricingCurve,
    cap_limit: Option<f64>,
    cap_policy: CapPolicy,
}

impl SwapExecutor {
    /// Creates an executor without cap limit.
    #[must_use]
    pub fn new(curve: PricingCurve) -> Self {
        Self {
            curve,
            cap_limit: None,
            cap_policy: CapPolicy::default(),
        }
    }

    /// Sets the cap limit and the policy for swaps that breach it.
    #[must_use]
    pub fn with_cap(mut self, cap_limit: Option<f64>, cap_policy: CapPolicy) -> Self {
        self.cap_limit = cap_limit;
        self.cap_policy = cap_policy;
        self
    }

    /// The curve swaps are priced against.
    #[must_use]
    pub fn curve(&self) -> PricingCurve {
        self.curve
    }

    /// Live prices of a pair.
    ///
    /// # Errors
    /// [`SwapError::UnknownToken`] when the oracle has no price for a token.
    pub fn market(
        &self,
        oracle: &PriceOracle,
        token_in: &TokenId,
        token_out: &TokenId,
    ) -> Result<PairMarket, SwapError> {
        Ok(PairMarket::new(oracle.price(token_in)?, oracle.price(token_out)?)
            .with_cap_limit(self.cap_limit))
    }

    /// Prices a swap and enforces the cap limit without touching the pool.
    ///
    /// The cap is checked per pool: a token's market cap is its balance in
    /// the pool times its price. A token already above the cap blocks the
    /// swap. An input that would push its token over the cap is clamped to
    /// the largest amount that fits, or rejected under [`CapPolicy::Reject`].
    ///
    /// # Errors
    /// Any [`SwapError`] from the oracle, the pool or the curve, or
    /// [`SwapError::CapacityExceeded`].
    pub fn check(
        &self,
        pool: &PoolState,
        oracle: &PriceOracle,
        swap: &Swap,
    ) -> Result<CheckedQuote, SwapError> {
        let view = pool.view(&swap.token_in, &swap.token_out)?;
        let market = self.market(oracle, &swap.token_in, &swap.token_out)?;

        let Some(cap) = self.cap_limit else {
            let quote = self.curve.compute_output(&view, &market, swap.amount_in)?;
            return Ok(CheckedQuote {
                view,
                market,
                quote,
                clamped: false,
            });
        };

        let over = |value: f64| value > cap * (1.0 + FLOAT_TOLERANCE);
        for (token, value) in [
            (&swap.token_in, view.balance_in * market.price_in),
            (&swap.token_out, view.balance_out * market.price_out),
        ] {
            if over(value) {
                return Err(capacity_exceeded(token, cap, value));
            }
        }

        let mut quote = self.curve.compute_output(&view, &market, swap.amount_in)?;
        let mut clamped = false;
        let value_in = quote.balance_in_after * market.price_in;
        if over(value_in) {
            if self.cap_policy == CapPolicy::Reject {
                return Err(capacity_exceeded(&swap.token_in, cap, value_in));
            }
            let room = cap / market.price_in - view.balance_in;
            if room <= 0.0 {
                return Err(capacity_exceeded(&swap.token_in, cap, value_in));
            }
            quote = self.curve.compute_output(&view, &market, room)?;
            clamped = true;

            let value_in = quote.balance_in_after * market.price_in;
            if over(value_in) {
                return Err(capacity_exceeded(&swap.token_in, cap, value_in));
            }
        }

        Ok(CheckedQuote {
            view,
            market,
            quote,
            clamped,
        })
    }

    /// Executes one swap and returns its measurements.
    ///
    /// Balances are written only after pricing, cap check and measurement
    /// all succeed; on error the pool is untouched.
    ///
    /// # Errors
    /// See [`SwapExecutor::check`]. A swap that would return nothing fails
    /// with [`SwapError::InsufficientLiquidity`].
    pub fn execute(
        &self,
        pool: &mut PoolState,
        oracle: &PriceOracle,
        swap: &Swap,
    ) -> Result<SwapMetrics, SwapError> {
        let checked = self.check(pool, oracle, swap)?;
        let CheckedQuote {
            view,
            market,
            quote,
            clamped,
        } = checked;

        let Some(swap_rate) = quote.rate() else {
            return Err(SwapError::InsufficientLiquidity(format!(
                "swap of {} {} returns no {}",
                swap.amount_in, swap.token_in, swap.token_out
            )));
        };

        let after = view.with_balances(quote.balance_in_after, quote.balance_out_after);
        let price_impact = self
            .curve
            .compute_output(&after, &market, quote.amount_in)
            .ok()
            .and_then(|repeat| repeat.rate())
            .map(|repeat_rate| repeat_rate / swap_rate);

        let impermanent_loss = [
            (&swap.token_in, quote.balance_in_after, view.deposit_in),
            (&swap.token_out, quote.balance_out_after, view.deposit_out),
        ]
        .into_iter()
        .filter_map(|(token, balance, deposit)| {
            calculate_il_ratio(balance, deposit)
                .ok()
                .map(|ratio| TokenRatio {
                    token: token.clone(),
                    ratio,
                })
        })
        .collect();

        let metrics = SwapMetrics {
            amount_in: quote.amount_in,
            amount_out: quote.amount_out,
            capital_efficiency: swap_rate / market.rate(),
            price_impact,
            drained: quote.amount_out / view.balance_out,
            impermanent_loss,
            clamped,
        };

        pool.set_balances(
            &swap.token_in,
            &swap.token_out,
            quote.balance_in_after,
            quote.balance_out_after,
        )?;

        debug!(
            token_in = %swap.token_in,
            token_out = %swap.token_out,
            amount_in = quote.amount_in,
            amount_out = quote.amount_out,
            capital_efficiency = metrics.capital_efficiency,
            clamped,
            "Swap executed"
        );
        Ok(metrics)
    }
}

fn capacity_exceeded(token: &TokenId, cap_limit: f64, value: f64) -> SwapError {
    SwapError::CapacityExceeded {
        token: token.clone(),
        cap_limit,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmsim_domain::pool::PairSeed;
    use mmsim_domain::token::PriceSnapshot;

    fn pool(balance_x: f64, balance_y: f64) -> PoolState {
        PoolState::pairwise([PairSeed {
            a: "X".into(),
            b: "Y".into(),
            balance_a: balance_x,
            balance_b: balance_y,
            k: 1.0,
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

    #[test]
    fn test_execute_constant_product() {
        let mut pool = pool(1_000.0, 1_000.0);
        let executor = SwapExecutor::new(PricingCurve::ConstantProduct);
        let metrics = executor
            .execute(&mut pool, &oracle(1.0, 1.0), &Swap::new("X", "Y", 100.0))
            .unwrap();

        assert!((metrics.amount_out - 90.909_090_9).abs() < 1e-6);
        // 100 paid for 90.9 at market rate 1
        assert!((metrics.capital_efficiency - 1.1).abs() < 1e-9);
        assert!(metrics.price_impact.unwrap() > 1.0);
        assert!((metrics.drained - 0.090_909_09).abs() < 1e-6);
        assert_eq!(metrics.impermanent_loss.len(), 2);
        assert!((metrics.impermanent_loss[0].ratio - 1.1).abs() < 1e-12);

        let view = pool.view(&"X".into(), &"Y".into()).unwrap();
        assert_eq!(view.balance_in, 1_100.0);
        assert!((view.balance_out - 909.090_909).abs() < 1e-5);
    }

    #[test]
    fn test_constant_sum_truncation_and_drained_pool() {
        let mut pool = pool(500.0, 500.0);
        let executor = SwapExecutor::new(PricingCurve::ConstantSum);
        let oracle = oracle(1.0, 1.0);

        let metrics = executor
            .execute(&mut pool, &oracle, &Swap::new("X", "Y", 600.0))
            .unwrap();
        assert_eq!(metrics.amount_out, 500.0);
        assert_eq!(metrics.amount_in, 500.0);
        assert_eq!(metrics.drained, 1.0);
        // nothing left to repeat against
        assert_eq!(metrics.price_impact, None);

        let err = executor
            .execute(&mut pool, &oracle, &Swap::new("X", "Y", 1.0))
            .unwrap_err();
        assert!(matches!(err, SwapError::InsufficientLiquidity(_)));
    }

    #[test]
    fn test_cap_clamps_input() {
        let mut pool = pool(1_000.0, 1_000.0);
        let executor =
            SwapExecutor::new(PricingCurve::ConstantProduct).with_cap(Some(1_200.0), CapPolicy::Clamp);
        let metrics = executor
            .execute(&mut pool, &oracle(1.0, 1.0), &Swap::new("X", "Y", 500.0))
            .unwrap();
        assert!(metrics.clamped);
        assert!((metrics.amount_in - 200.0).abs() < 1e-9);

        let view = pool.view(&"X".into(), &"Y".into()).unwrap();
        assert!(view.balance_in * 1.0 <= 1_200.0 * (1.0 + FLOAT_TOLERANCE));
    }

    #[test]
    fn test_cap_reject_policy() {
        let mut pool = pool(1_000.0, 1_000.0);
        let executor =
            SwapExecutor::new(PricingCurve::ConstantSum).with_cap(Some(1_200.0), CapPolicy::Reject);
        let err = executor
            .execute(&mut pool, &oracle(1.0, 1.0), &Swap::new("X", "Y", 500.0))
            .unwrap_err();
        assert!(matches!(err, SwapError::CapacityExceeded { .. }));
        // untouched
        assert_eq!(pool.view(&"X".into(), &"Y".into()).unwrap().balance_in, 1_000.0);
    }

    #[test]
    fn test_token_already_over_cap() {
        let mut pool = pool(1_000.0, 1_000.0);
        let executor =
            SwapExecutor::new(PricingCurve::ConstantProduct).with_cap(Some(1_500.0), CapPolicy::Clamp);
        // X is worth 2_000 in the pool
        let err = executor
            .execute(&mut pool, &oracle(2.0, 1.0), &Swap::new("X", "Y", 1.0))
            .unwrap_err();
        assert!(matches!(err, SwapError::CapacityExceeded { ref token, .. } if token.as_str() == "X"));
    }

    #[test]
    fn test_unknown_token_is_local_error() {
        let mut pool = pool(1_000.0, 1_000.0);
        let executor = SwapExecutor::new(PricingCurve::ConstantProduct);
        let err = executor
            .execute(&mut pool, &oracle(1.0, 1.0), &Swap::new("X", "Z", 1.0))
            .unwrap_err();
        assert!(matches!(err, SwapError::UnknownToken(_)));
    }
}
