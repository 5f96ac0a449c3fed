//! Equilibrium-point solvers for the proactive curves.
//!
//! Both solvers work on the long/short orientation of a pair: the token with
//! the larger balance-to-deposit ratio is long. The single-pair solver pins
//! the long token's target to its deposit and solves the curve for the short
//! token's target. The multi-token solver also frees the long target and
//! picks the point on the curve through the current balances that is closest
//! (in relative terms) to both deposits.

use crate::error::SwapError;
use crate::math::{Equilibrium, PairMarket, approx_eq};
use crate::pool::PairView;
use std::f64::consts::PI;

/// Below this k the multi-token objective is solved as the k -> 0 limit.
pub const LINEAR_K_THRESHOLD: f64 = 1e-9;

/// A pair seen as long/short instead of input/output.
#[derive(Debug, Clone, Copy)]
struct Sides {
    input_long: bool,
    long_balance: f64,
    long_deposit: f64,
    short_balance: f64,
    short_deposit: f64,
    long_price: f64,
    /// Long units per short unit.
    p: f64,
    k: f64,
}

impl Sides {
    fn orient(view: &PairView, market: &PairMarket) -> Self {
        if view.fill_in() >= view.fill_out() {
            Self {
                input_long: true,
                long_balance: view.balance_in,
                long_deposit: view.deposit_in,
                short_balance: view.balance_out,
                short_deposit: view.deposit_out,
                long_price: market.price_in,
                p: market.price_out / market.price_in,
                k: view.k,
            }
        } else {
            Self {
                input_long: false,
                long_balance: view.balance_out,
                long_deposit: view.deposit_out,
                short_balance: view.balance_in,
                short_deposit: view.deposit_in,
                long_price: market.price_out,
                p: market.price_in / market.price_out,
                k: view.k,
            }
        }
    }

    fn equilibrium(&self, long: f64, short: f64) -> Equilibrium {
        if self.input_long {
            Equilibrium {
                input: long,
                output: short,
            }
        } else {
            Equilibrium {
                input: short,
                output: long,
            }
        }
    }
}

/// Short-token target of the curve that passes through `(l, s)` and has its
/// long-token target at `l_e`.
///
/// # Errors
/// [`SwapError::CurveSolveError`] when no positive real target exists.
pub fn short_equilibrium(l: f64, l_e: f64, s: f64, p: f64, k: f64) -> Result<f64, SwapError> {
    let u = 4.0 * k * (l - l_e) / (s * p);
    if !u.is_finite() || 1.0 + u < 0.0 {
        return Err(SwapError::CurveSolveError(format!(
            "complex short equilibrium (l={l}, l_e={l_e}, s={s}, p={p}, k={k})"
        )));
    }
    let s_e = s + 2.0 * (l - l_e) / p / ((1.0 + u).sqrt() + 1.0);
    if !s_e.is_finite() || s_e <= 0.0 {
        return Err(SwapError::CurveSolveError(format!(
            "non-positive short equilibrium {s_e}"
        )));
    }
    Ok(s_e)
}

/// Equilibrium point of a single-pair proactive pool.
///
/// The long token's target is its deposit; the short token's target is
/// recomputed from the live market price every time.
///
/// # Errors
/// [`SwapError::CurveSolveError`] when the short target is not real and positive.
pub fn pair_equilibrium(view: &PairView, market: &PairMarket) -> Result<Equilibrium, SwapError> {
    let sides = Sides::orient(view, market);
    let s_e = short_equilibrium(
        sides.long_balance,
        sides.long_deposit,
        sides.short_balance,
        sides.p,
        sides.k,
    )?;
    Ok(sides.equilibrium(sides.long_deposit, s_e))
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    long: f64,
    short: f64,
    objective: f64,
}

fn objective(long: f64, short: f64, sides: &Sides) -> f64 {
    (1.0 - short / sides.short_deposit).powi(2) + (1.0 - long / sides.long_deposit).powi(2)
}

/// Equilibrium point of a shared multi-token proactive pool.
///
/// Minimizes `(1 - s_e/S)^2 + (1 - l_e/L)^2` over the curve through the
/// current balances. With `t = sqrt(1 + 4k(l - l_e)/(s p))` both targets are
/// polynomials in `t` and the stationarity condition is a depressed cubic,
/// solved in closed form.
///
/// Root selection: roots must be real, non-negative, local minima, give
/// positive targets and respect the cap limit. Among the survivors the one
/// whose long target is nearest the current long balance wins; ties go to the
/// lower objective, then to the smaller long target.
///
/// Balances already proportional to the deposits are returned unchanged.
///
/// # Errors
/// [`SwapError::CurveSolveError`] when no root survives.
pub fn multi_equilibrium(view: &PairView, market: &PairMarket) -> Result<Equilibrium, SwapError> {
    if approx_eq(view.fill_in(), view.fill_out()) {
        return Ok(Equilibrium {
            input: view.balance_in,
            output: view.balance_out,
        });
    }

    let sides = Sides::orient(view, market);
    let upper = market.cap_limit.map(|cap| cap / sides.long_price);

    let candidates = if sides.k < LINEAR_K_THRESHOLD {
        linear_candidates(&sides)
    } else {
        cubic_candidates(&sides)
    };

    let best = select_root(candidates, sides.long_balance, upper).ok_or_else(|| {
        SwapError::CurveSolveError(format!(
            "no feasible equilibrium (l={}, s={}, L={}, S={}, p={}, k={})",
            sides.long_balance,
            sides.short_balance,
            sides.long_deposit,
            sides.short_deposit,
            sides.p,
            sides.k
        ))
    })?;

    Ok(sides.equilibrium(best.long, best.short))
}

/// Picks the surviving root nearest `current_long`, then the lower
/// objective, then the smaller long target. Roots with non-positive or
/// non-finite targets, or a long target above `upper`, are dropped.
fn select_root(
    candidates: Vec<Candidate>,
    current_long: f64,
    upper: Option<f64>,
) -> Option<Candidate> {
    candidates
        .into_iter()
        .filter(|c| c.long > 0.0 && c.short > 0.0 && c.long.is_finite() && c.short.is_finite())
        .filter(|c| upper.is_none_or(|max| c.long <= max))
        .min_by(|a, b| {
            let da = (a.long - current_long).abs();
            let db = (b.long - current_long).abs();
            da.total_cmp(&db)
                .then(a.objective.total_cmp(&b.objective))
                .then(a.long.total_cmp(&b.long))
        })
}

/// k -> 0: the curve is the line `s_e = s + (l - l_e)/p` and the objective is
/// a convex quadratic in `l_e`.
fn linear_candidates(sides: &Sides) -> Vec<Candidate> {
    let (l, s, big_l, big_s, p) = (
        sides.long_balance,
        sides.short_balance,
        sides.long_deposit,
        sides.short_deposit,
        sides.p,
    );
    let a = 1.0 / (p * big_s);
    let alpha = (s + l / p) / big_s;
    let long = (a * (alpha - 1.0) + 1.0 / big_l) / (a * a + 1.0 / (big_l * big_l));
    let short = s + (l - long) / p;
    vec![Candidate {
        long,
        short,
        objective: objective(long, short, sides),
    }]
}

fn cubic_candidates(sides: &Sides) -> Vec<Candidate> {
    let (l, s, big_l, big_s, p, k) = (
        sides.long_balance,
        sides.short_balance,
        sides.long_deposit,
        sides.short_deposit,
        sides.p,
        sides.k,
    );
    // l_e = lambda0 + lambda2 t^2, s_e = sigma0 + sigma1 t
    let lambda2 = -s * p / (4.0 * k);
    let lambda0 = l - lambda2;
    let sigma1 = s / (2.0 * k);
    let sigma0 = s - sigma1;

    let c3 = 2.0 * lambda2 * lambda2 / (big_l * big_l);
    let c1 = sigma1 * sigma1 / (big_s * big_s) + (2.0 * lambda2 / big_l) * (lambda0 / big_l - 1.0);
    let c0 = (sigma1 / big_s) * (sigma0 / big_s - 1.0);

    solve_depressed_cubic(c1 / c3, c0 / c3)
        .into_iter()
        .filter(|t| *t >= 0.0 && 3.0 * c3 * t * t + c1 >= 0.0)
        .map(|t| {
            let long = lambda0 + lambda2 * t * t;
            let short = sigma0 + sigma1 * t;
            Candidate {
                long,
                short,
                objective: objective(long, short, sides),
            }
        })
        .collect()
}

/// Real roots of `t^3 + p t + q = 0`.
pub fn solve_depressed_cubic(p: f64, q: f64) -> Vec<f64> {
    if !p.is_finite() || !q.is_finite() {
        return Vec::new();
    }
    let disc = (q / 2.0).powi(2) + (p / 3.0).powi(3);

    if disc > 0.0 {
        let root = disc.sqrt();
        vec![(-q / 2.0 + root).cbrt() + (-q / 2.0 - root).cbrt()]
    } else if disc < 0.0 {
        // three distinct real roots, p < 0 here
        let r = 2.0 * (-p / 3.0).sqrt();
        let cos_arg = ((3.0 * q) / (2.0 * p) * (-3.0 / p).sqrt()).clamp(-1.0, 1.0);
        let phi = cos_arg.acos();
        (0..3)
            .map(|j| r * ((phi - 2.0 * PI * f64::from(j)) / 3.0).cos())
            .collect()
    } else if p == 0.0 {
        vec![0.0]
    } else {
        vec![3.0 * q / p, -3.0 * q / (2.0 * p)]
    }
}
