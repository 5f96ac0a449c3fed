//! Synthetic swap stream.
//!
//! Each entry picks an input and a distinct output token by weight, draws a
//! dollar size and converts it to input-token units at the batch's price.

use crate::config::{SimulationConfig, TRAFFIC_SEED_OFFSET};
use mmsim_domain::error::ConfigError;
use mmsim_domain::swap::{Batch, Swap};
use mmsim_domain::token::{PriceSnapshot, TokenId};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Draws before a non-positive normal size falls back to the mean.
const MAX_DRAWS: usize = 1_000;

/// Dollar size distribution of swaps paying in one token.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AmountModel {
    mean: f64,
    stdv: f64,
    max: f64,
}

/// Seeded generator of swap batches.
#[derive(Debug, Clone)]
pub struct TrafficGenerator {
    tokens: Vec<TokenId>,
    amounts: Vec<AmountModel>,
    inputs: WeightedIndex<f64>,
    /// Output choice per input token; `None` falls back to uniform.
    outputs: Vec<Option<WeightedIndex<f64>>>,
    batch_size: usize,
    normal: bool,
    arb_probability: f64,
    rng: StdRng,
}

/// Fills unset weights with an even share of the remaining mass.
fn resolve_weights(weights: &[Option<f64>]) -> Vec<f64> {
    let set: f64 = weights.iter().flatten().sum();
    let unset = weights.iter().filter(|w| w.is_none()).count();
    let share = if unset > 0 {
        (1.0 - set).max(0.0) / unset as f64
    } else {
        0.0
    };
    weights.iter().map(|w| w.unwrap_or(share)).collect()
}

impl TrafficGenerator {
    /// Builds the generator of a validated configuration.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] when no token can be picked as input.
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        let traffic = &config.traffic;
        let tokens: Vec<TokenId> = config.token_ids().cloned().collect();

        let in_weights = resolve_weights(
            &config.tokens.iter().map(|t| t.in_weight).collect::<Vec<_>>(),
        );
        let out_weights = resolve_weights(
            &config.tokens.iter().map(|t| t.out_weight).collect::<Vec<_>>(),
        );
        let inputs = WeightedIndex::new(&in_weights)
            .map_err(|e| ConfigError::invalid("tokens.in_weight", e.to_string()))?;
        let outputs = (0..tokens.len())
            .map(|i| {
                let masked = out_weights
                    .iter()
                    .enumerate()
                    .map(|(j, w)| if i == j { 0.0 } else { *w });
                WeightedIndex::new(masked).ok()
            })
            .collect();

        let amounts = config
            .tokens
            .iter()
            .map(|t| AmountModel {
                mean: t.amount_mean.unwrap_or(traffic.amount_mean),
                stdv: t.amount_stdv.unwrap_or(traffic.amount_stdv),
                max: t.max_amount.unwrap_or(traffic.max_amount),
            })
            .collect();

        Ok(Self {
            tokens,
            amounts,
            inputs,
            outputs,
            batch_size: traffic.batch_size,
            normal: traffic.normal,
            arb_probability: traffic.arb_probability,
            rng: StdRng::seed_from_u64(config.component_seed(TRAFFIC_SEED_OFFSET)),
        })
    }

    fn pick_output(&mut self, input: usize) -> usize {
        if let Some(dist) = &self.outputs[input] {
            return dist.sample(&mut self.rng);
        }
        let other = self.rng.random_range(0..self.tokens.len() - 1);
        if other >= input { other + 1 } else { other }
    }

    fn dollar_amount(&mut self, model: AmountModel) -> f64 {
        let drawn = if self.normal {
            (0..MAX_DRAWS)
                .map(|_| {
                    let z: f64 = self.rng.sample(StandardNormal);
                    model.mean + model.stdv * z
                })
                .find(|v| *v > 0.0)
                .unwrap_or(model.mean)
        } else {
            (0..MAX_DRAWS)
                .map(|_| self.rng.random_range(0.0..model.max))
                .find(|v| *v > 0.0)
                .unwrap_or(model.max)
        };
        drawn.min(model.max)
    }

    /// Generates one batch per price snapshot.
    ///
    /// # Errors
    /// [`ConfigError::StreamMismatch`] when a snapshot lacks a token price.
    pub fn generate(&mut self, prices: &[PriceSnapshot]) -> Result<Vec<Batch>, ConfigError> {
        let mut batches = Vec::with_capacity(prices.len());
        for (index, snapshot) in prices.iter().enumerate() {
            let mut swaps = Vec::with_capacity(self.batch_size);
            for _ in 0..self.batch_size {
                let input = self.inputs.sample(&mut self.rng);
                let output = self.pick_output(input);
                let dollars = self.dollar_amount(self.amounts[input]);
                let is_arb = self.rng.random_bool(self.arb_probability);

                let token_in = &self.tokens[input];
                let price = snapshot.get(token_in).ok_or_else(|| {
                    ConfigError::StreamMismatch(format!("batch {index} has no price for {token_in}"))
                })?;
                swaps.push(Swap {
                    token_in: token_in.clone(),
                    token_out: self.tokens[output].clone(),
                    amount_in: dollars / price,
                    is_arb,
                });
            }
            batches.push(Batch::new(swaps));
        }
        Ok(batches)
    }
}
