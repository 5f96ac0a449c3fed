//! Proactive market-maker curve.
//!
//! The curve is split at an equilibrium point into a regime where the input
//! token is in shortage and one where it is in excess. Each regime blends a
//! constant-sum line (k = 0) with a constant-product hyperbola (k = 1).
//!
//! Terminology: the "long" token is held in excess of its equilibrium balance,
//! the "short" token below it. `p` is always quoted as long units per short
//! unit.

use crate::error::SwapError;
use crate::math::{Equilibrium, PairMarket, SwapQuote};
use crate::pool::PairView;

/// Long-token balance on the curve for a given short-token balance `x`.
pub fn solve_long(x: f64, l_e: f64, s_e: f64, p: f64, k: f64) -> f64 {
    l_e - p * (x - s_e) * (1.0 - k + k * s_e / x)
}

/// Short-token balance on the curve for a given long-token balance `y`.
///
/// Positive root of `(1-k)p x^2 + b x - p k S^2 = 0` with
/// `b = y - L - pS + 2kpS`, evaluated in the cancellation-free form.
///
/// # Errors
/// [`SwapError::InsufficientLiquidity`] when the curve has no real root for `y`.
pub fn solve_short(y: f64, l_e: f64, s_e: f64, p: f64, k: f64) -> Result<f64, SwapError> {
    let a = (1.0 - k) * p;
    let b = y - l_e - p * s_e + 2.0 * k * p * s_e;
    let c = p * k * s_e * s_e;
    let disc = b * b + 4.0 * a * c;
    if !disc.is_finite() || disc < 0.0 {
        return Err(SwapError::InsufficientLiquidity(format!(
            "no curve point for excess balance {y}"
        )));
    }
    let root = disc.sqrt();

    if b >= 0.0 {
        let denom = b + root;
        if denom <= 0.0 {
            return Ok(0.0);
        }
        Ok(2.0 * c / denom)
    } else {
        if a <= 0.0 {
            return Err(SwapError::InsufficientLiquidity(format!(
                "no curve point for excess balance {y}"
            )));
        }
        Ok((-b + root) / (2.0 * a))
    }
}

/// Prices a swap against the proactive curve anchored at `eq`.
///
/// # Errors
/// [`SwapError::InsufficientLiquidity`] when the output balance would reach
/// zero or leave the curve's domain.
pub fn quote(
    view: &PairView,
    market: &PairMarket,
    eq: &Equilibrium,
    amount_in: f64,
) -> Result<SwapQuote, SwapError> {
    if !amount_in.is_finite() || amount_in <= 0.0 {
        return Err(SwapError::InsufficientLiquidity(format!(
            "input amount must be positive, got {amount_in}"
        )));
    }
    let (i0, o0, k) = (view.balance_in, view.balance_out, view.k);
    let rate = market.rate();
    let new_in = i0 + amount_in;

    let new_out = if o0 / eq.output > i0 / eq.input {
        // input token is short; it turns long once it passes its equilibrium
        let headroom = eq.input - i0;
        if headroom < amount_in {
            solve_short(new_in, eq.input, eq.output, rate, k)?
        } else {
            solve_long(new_in, eq.output, eq.input, 1.0 / rate, k)
        }
    } else {
        solve_short(new_in, eq.input, eq.output, rate, k)?
    };

    if !new_out.is_finite() || new_out <= 0.0 {
        return Err(SwapError::InsufficientLiquidity(format!(
            "swap of {amount_in} would drain the output reserve"
        )));
    }
    let amount_out = o0 - new_out;
    if amount_out < 0.0 {
        return Err(SwapError::InsufficientLiquidity(format!(
            "curve returned negative output {amount_out}"
        )));
    }

    Ok(SwapQuote {
        amount_in,
        amount_out,
        balance_in_after: new_in,
        balance_out_after: new_out,
    })
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
    fn test_solve_short_inverts_solve_long() {
        let (l_e, s_e, p) = (1_000.0, 800.0, 1.25);
        for k in [0.0, 0.1, 0.5, 0.9, 1.0] {
            for x in [100.0, 400.0, 799.0] {
                let y = solve_long(x, l_e, s_e, p, k);
                let back = solve_short(y, l_e, s_e, p, k).unwrap();
                assert!((back - x).abs() < 1e-6, "k={k} x={x} back={back}");
            }
        }
    }

    #[test]
    fn test_solve_long_at_equilibrium() {
        assert_eq!(solve_long(800.0, 1_000.0, 800.0, 2.0, 0.3), 1_000.0);
    }

    #[test]
    fn test_k_zero_is_linear_at_market_rate() {
        // balanced pool, 1 output costs 2 input
        let v = view(2_000.0, 1_000.0, 2_000.0, 1_000.0, 0.0);
        let market = PairMarket::new(1.0, 2.0);
        let eq = Equilibrium {
            input: 2_000.0,
            output: 1_000.0,
        };
        let q = quote(&v, &market, &eq, 200.0).unwrap();
        assert!((q.amount_out - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_output_monotonic_within_regime() {
        let excess = solve_long(900.0, 1_000.0, 1_000.0, 1.0, 0.4);
        let v = view(900.0, excess, 1_000.0, 1_000.0, 0.4);
        let market = PairMarket::new(1.0, 1.0);
        let eq = Equilibrium {
            input: 1_000.0,
            output: 1_000.0,
        };
        let mut last = 0.0;
        // stays below the input equilibrium (headroom 100)
        for amount in [1.0, 10.0, 50.0, 99.0] {
            let q = quote(&v, &market, &eq, amount).unwrap();
            assert!(q.amount_out > last);
            last = q.amount_out;
        }
        // crosses into the other regime
        for amount in [150.0, 500.0, 5_000.0] {
            let q = quote(&v, &market, &eq, amount).unwrap();
            assert!(q.amount_out > last);
            last = q.amount_out;
        }
    }

    #[test]
    fn test_rejects_draining_swap() {
        // linear curve runs out of output before the input is absorbed
        let v = view(1_000.0, 1_000.0, 1_000.0, 1_000.0, 0.0);
        let market = PairMarket::new(1.0, 1.0);
        let eq = Equilibrium {
            input: 1_000.0,
            output: 1_000.0,
        };
        let err = quote(&v, &market, &eq, 2_000.0).unwrap_err();
        assert!(matches!(err, SwapError::InsufficientLiquidity(_)));
    }
}
