//! Pricing curves behind the six market-maker variants.
//!
//! Every variant maps onto one [`PricingCurve`]; the pool topology (pairwise
//! or shared) is carried by [`crate::pool::PoolState`] and is invisible here.

use crate::enums::{CurveKind, MarketMakerType};
use crate::error::SwapError;
use crate::math::{
    Equilibrium, PairMarket, SwapQuote, constant_product, constant_sum, equilibrium, proactive,
};
use crate::pool::PairView;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingCurve {
    ConstantProduct,
    ConstantSum,
    Proactive,
    MultiProactive,
}

impl PricingCurve {
    pub fn for_market_maker(kind: MarketMakerType) -> Self {
        kind.curve_kind().into()
    }

    /// Prices `amount_in` of the input token against the pair.
    ///
    /// # Errors
    /// [`SwapError::InsufficientLiquidity`] outside the curve's domain and
    /// [`SwapError::CurveSolveError`] when a proactive equilibrium cannot be found.
    pub fn compute_output(
        &self,
        view: &PairView,
        market: &PairMarket,
        amount_in: f64,
    ) -> Result<SwapQuote, SwapError> {
        match self {
            Self::ConstantProduct => {
                constant_product::calculate_out_amount(amount_in, view.balance_in, view.balance_out)
            }
            Self::ConstantSum => {
                constant_sum::fill(amount_in, view.balance_in, view.balance_out, market.rate())
            }
            Self::Proactive | Self::MultiProactive => {
                let eq = self.equilibrium_point(view, market)?;
                proactive::quote(view, market, &eq, amount_in)
            }
        }
    }

    /// Balances of the pair at which the pool rate equals the market rate.
    ///
    /// Constant-sum pools always trade at the market rate, so their
    /// equilibrium is wherever they currently are.
    ///
    /// # Errors
    /// [`SwapError::CurveSolveError`] when the proactive solvers find no root.
    pub fn equilibrium_point(
        &self,
        view: &PairView,
        market: &PairMarket,
    ) -> Result<Equilibrium, SwapError> {
        match self {
            Self::ConstantProduct => Ok(constant_product::equilibrium(
                view.balance_in,
                view.balance_out,
                market.rate(),
            )),
            Self::ConstantSum => Ok(Equilibrium {
                input: view.balance_in,
                output: view.balance_out,
            }),
            Self::Proactive => equilibrium::pair_equilibrium(view, market),
            Self::MultiProactive => equilibrium::multi_equilibrium(view, market),
        }
    }

    /// Whether a swap may take a balance all the way to zero.
    pub fn allows_drain(&self) -> bool {
        matches!(self, Self::ConstantSum)
    }
}

impl From<CurveKind> for PricingCurve {
    fn from(kind: CurveKind) -> Self {
        match kind {
            CurveKind::ConstantProduct => Self::ConstantProduct,
            CurveKind::ConstantSum => Self::ConstantSum,
            CurveKind::Proactive => Self::Proactive,
            CurveKind::MultiProactive => Self::MultiProactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(balance_in: f64, balance_out: f64, deposit_in: f64, deposit_out: f64, k: f64) -> PairView {
        PairView {
            balance_in,
            balance_out,
            deposit_in,
            deposit_out,
            k,
        }
    }

    #[test]
    fn test_scenario_constant_product() {
        let curve = PricingCurve::for_market_maker(MarketMakerType::Amm);
        let v = view(1_000.0, 1_000.0, 1_000.0, 1_000.0, 1.0);
        let q = curve.compute_output(&v, &PairMarket::new(1.0, 1.0), 100.0).unwrap();
        assert!((q.amount_out - 90.9091).abs() < 1e-4);
        assert_eq!(q.balance_in_after, 1_100.0);
        assert!((q.balance_out_after - 909.0909).abs() < 1e-4);
    }

    #[test]
    fn test_scenario_constant_sum() {
        let curve = PricingCurve::for_market_maker(MarketMakerType::Csmm);
        let v = view(500.0, 500.0, 500.0, 500.0, 0.0);
        let q = curve.compute_output(&v, &PairMarket::new(1.0, 1.0), 600.0).unwrap();
        assert_eq!(q.amount_out, 500.0);
        assert_eq!(q.amount_in, 500.0);
        assert_eq!(q.balance_out_after, 0.0);
        assert_eq!(q.balance_in_after, 1_000.0);
    }

    #[test]
    fn test_constant_sum_exact_within_balance() {
        let curve = PricingCurve::ConstantSum;
        let v = view(500.0, 500.0, 500.0, 500.0, 0.0);
        // input is worth 4, output worth 2: one input buys two outputs
        let q = curve.compute_output(&v, &PairMarket::new(4.0, 2.0), 100.0).unwrap();
        assert_eq!(q.amount_out, 200.0);
    }

    #[test]
    fn test_proactive_k_one_matches_constant_product_on_priced_deposit_curve() {
        // only holds with deposits priced at the market rate and the state
        // on the x*y curve through them
        let market = PairMarket::new(1.0, 2.0);
        let (d_in, d_out) = (2_000.0, 1_000.0);
        let product = d_in * d_out;

        for balance_in in [1_200.0, 2_000.0, 3_100.0] {
            let v = view(balance_in, product / balance_in, d_in, d_out, 1.0);
            for amount in [1.0, 150.0, 900.0, 4_000.0] {
                let cp = PricingCurve::ConstantProduct
                    .compute_output(&v, &market, amount)
                    .unwrap();
                let pmm = PricingCurve::Proactive
                    .compute_output(&v, &market, amount)
                    .unwrap();
                assert!(
                    (cp.amount_out - pmm.amount_out).abs() < 1e-6,
                    "balance_in={balance_in} amount={amount}: {} vs {}",
                    cp.amount_out,
                    pmm.amount_out
                );
            }
        }
    }

    #[test]
    fn test_constant_sum_never_arbitrages() {
        let v = view(300.0, 700.0, 500.0, 500.0, 0.0);
        let eq = PricingCurve::ConstantSum
            .equilibrium_point(&v, &PairMarket::new(1.0, 3.0))
            .unwrap();
        assert_eq!(eq.input, 300.0);
        assert_eq!(eq.output, 700.0);
    }

    #[test]
    fn test_constant_product_equilibrium_targets_market_rate() {
        let v = view(1_000.0, 1_000.0, 1_000.0, 1_000.0, 1.0);
        let eq = PricingCurve::ConstantProduct
            .equilibrium_point(&v, &PairMarket::new(1.0, 4.0))
            .unwrap();
        assert!((eq.input / eq.output - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_multi_proactive_balanced_pool_trades() {
        let v = view(1_000.0, 1_000.0, 1_000.0, 1_000.0, 0.5);
        let q = PricingCurve::MultiProactive
            .compute_output(&v, &PairMarket::new(1.0, 1.0), 50.0)
            .unwrap();
        assert!(q.amount_out > 0.0 && q.amount_out < 50.0);
    }

    #[test]
    fn test_constant_sum_output_never_shrinks() {
        let v = view(500.0, 500.0, 500.0, 500.0, 0.0);
        let market = PairMarket::new(3.0, 2.0);
        let mut last = 0.0;
        for amount in [1.0, 50.0, 200.0, 333.0, 334.0, 600.0, 5_000.0] {
            let q = PricingCurve::ConstantSum
                .compute_output(&v, &market, amount)
                .unwrap();
            assert!(q.amount_out >= last, "amount={amount}: {} < {last}", q.amount_out);
            assert!(q.amount_out <= 500.0);
            last = q.amount_out;
        }
        assert_eq!(last, 500.0);
    }

    #[test]
    fn test_multi_proactive_output_grows_with_input() {
        for (k, market) in [
            (0.2, PairMarket::new(1.0, 1.0)),
            (0.5, PairMarket::new(1.0, 2.0)),
            (0.8, PairMarket::new(3.0, 1.0)),
        ] {
            let v = view(1_000.0, 1_000.0, 1_000.0, 1_000.0, k);
            let mut last = 0.0;
            for amount in [1.0, 10.0, 100.0, 500.0, 1_000.0, 5_000.0] {
                let q = PricingCurve::MultiProactive
                    .compute_output(&v, &market, amount)
                    .unwrap();
                assert!(q.amount_out > last, "k={k} amount={amount}");
                assert!(q.balance_out_after > 0.0);
                last = q.amount_out;
            }
        }
    }

    #[test]
    fn test_only_constant_sum_drains() {
        assert!(PricingCurve::ConstantSum.allows_drain());
        assert!(!PricingCurve::Proactive.allows_drain());
        assert!(!PricingCurve::ConstantProduct.allows_drain());
    }
}
