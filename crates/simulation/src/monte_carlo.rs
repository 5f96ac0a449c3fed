//! Multi-seed, multi-variant runs.
//!
//! Every variant of one iteration consumes the same generated streams, each
//! in its own isolated [`SimulationDriver`]. Iteration `i` uses seed
//! `config.seed + i`.

use crate::config::SimulationConfig;
use crate::driver::{SimulationDriver, SimulationOutcome};
use crate::streams::Streams;
use mmsim_domain::enums::MarketMakerType;
use mmsim_domain::error::ConfigError;
use mmsim_domain::metrics::stats::Summary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Runs one variant on pre-generated streams.
///
/// # Errors
/// Returns [`ConfigError`] when the variant's configuration or the streams
/// are invalid.
pub fn run_variant(
    config: &SimulationConfig,
    kind: MarketMakerType,
    streams: &Streams,
) -> Result<SimulationOutcome, ConfigError> {
    let config = config.clone().with_kind(kind);
    SimulationDriver::new(&config)?.run(&streams.prices, &streams.swaps)
}

/// Results of one variant across iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantAggregate {
    /// Market-maker variant.
    pub variant: MarketMakerType,
    /// Completed runs.
    pub runs: usize,
    /// Distribution of the per-run median capital efficiency.
    pub capital_efficiency: Option<Summary>,
    /// Distribution of the per-run median price impact.
    pub price_impact: Option<Summary>,
    /// Distribution of the final pool value against holding.
    pub pool_vs_hold: Option<Summary>,
    /// 5th percentile of `pool_vs_hold`.
    pub var_95_pool_vs_hold: Option<f64>,
    /// Executed swaps over all runs.
    pub executed: usize,
    /// Skipped swaps over all runs.
    pub skipped: usize,
}

/// Repeats a configuration over several seeds and variants.
#[derive(Debug, Clone)]
pub struct MonteCarloRunner {
    /// Base configuration; its variant is replaced per run.
    pub config: SimulationConfig,
    /// Variants to compare.
    pub variants: Vec<MarketMakerType>,
    /// Number of seeds.
    pub iterations: usize,
}

impl MonteCarloRunner {
    /// Runs only the configured variant.
    #[must_use]
    pub fn new(config: SimulationConfig, iterations: usize) -> Self {
        let variants = vec![config.market_maker.kind];
        Self {
            config,
            variants,
            iterations,
        }
    }

    /// Sets the variants to compare.
    #[must_use]
    pub fn with_variants(mut self, variants: Vec<MarketMakerType>) -> Self {
        self.variants = variants;
        self
    }

    /// Runs every iteration and aggregates per variant.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`]; per-swap failures never abort.
    pub fn run(&self) -> Result<Vec<VariantAggregate>, ConfigError> {
        let mut outcomes: BTreeMap<MarketMakerType, Vec<SimulationOutcome>> = BTreeMap::new();

        for i in 0..self.iterations {
            let config = self
                .config
                .clone()
                .with_seed(self.config.seed.wrapping_add(i as u64));
            let streams = Streams::generate(&config)?;
            for kind in &self.variants {
                let outcome = run_variant(&config, *kind, &streams)?;
                outcomes.entry(*kind).or_default().push(outcome);
            }
            info!(iteration = i, seed = config.seed, "Iteration completed");
        }

        Ok(self
            .variants
            .iter()
            .map(|kind| {
                let runs = outcomes.get(kind).map(Vec::as_slice).unwrap_or_default();
                aggregate(*kind, runs)
            })
            .collect())
    }
}

fn aggregate(variant: MarketMakerType, results: &[SimulationOutcome]) -> VariantAggregate {
    let medians = |pick: fn(&SimulationOutcome) -> Option<f64>| -> Vec<f64> {
        results.iter().filter_map(pick).collect()
    };
    let capital_efficiency = medians(|o| {
        o.summary
            .metrics
            .capital_efficiency
            .all
            .map(|s| s.median)
    });
    let price_impact = medians(|o| o.summary.metrics.price_impact.all.map(|s| s.median));
    let mut pool_vs_hold = medians(|o| o.summary.pool_vs_hold);
    pool_vs_hold.sort_by(f64::total_cmp);

    let var_idx = (pool_vs_hold.len() as f64 * 0.05).floor() as usize;
    VariantAggregate {
        variant,
        runs: results.len(),
        capital_efficiency: Summary::from_values(&capital_efficiency),
        price_impact: Summary::from_values(&price_impact),
        pool_vs_hold: Summary::from_values(&pool_vs_hold),
        var_95_pool_vs_hold: pool_vs_hold
            .get(var_idx.min(pool_vs_hold.len().saturating_sub(1)))
            .copied(),
        executed: results.iter().map(|o| o.summary.metrics.executed).sum(),
        skipped: results.iter().map(|o| o.summary.metrics.skipped_total()).sum(),
    }
}
