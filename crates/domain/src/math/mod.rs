//! Closed-form pricing math for every curve family.

pub mod constant_product;
pub mod constant_sum;
pub mod equilibrium;
pub mod proactive;

use serde::{Deserialize, Serialize};

/// Relative tolerance used when comparing balances and fill ratios.
pub const FLOAT_TOLERANCE: f64 = 1e-12;

/// Market prices of the two tokens of a swap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairMarket {
    pub price_in: f64,
    pub price_out: f64,
    /// Maximum tolerated market cap of any token, if limited.
    pub cap_limit: Option<f64>,
}

impl PairMarket {
    pub fn new(price_in: f64, price_out: f64) -> Self {
        Self {
            price_in,
            price_out,
            cap_limit: None,
        }
    }

    pub fn with_cap_limit(mut self, cap_limit: Option<f64>) -> Self {
        self.cap_limit = cap_limit;
        self
    }

    /// Market rate in input units per output unit.
    pub fn rate(&self) -> f64 {
        self.price_out / self.price_in
    }
}

/// Outcome of pricing one swap against a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwapQuote {
    /// Input actually taken by the pool (may be less than requested).
    pub amount_in: f64,
    pub amount_out: f64,
    pub balance_in_after: f64,
    pub balance_out_after: f64,
}

impl SwapQuote {
    /// Realized rate in input units per output unit.
    pub fn rate(&self) -> Option<f64> {
        (self.amount_out > 0.0).then(|| self.amount_in / self.amount_out)
    }
}

/// Balances of the input and output token at which the pool rate matches the
/// market rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equilibrium {
    pub input: f64,
    pub output: f64,
}

pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= FLOAT_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}
