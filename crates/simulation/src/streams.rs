//! Price and swap streams of one run.

use crate::config::SimulationConfig;
use crate::price_path::{PriceStreamGenerator, RandomWalkPrices};
use crate::traffic::TrafficGenerator;
use mmsim_domain::error::ConfigError;
use mmsim_domain::swap::Batch;
use mmsim_domain::token::PriceSnapshot;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pre-materialized inputs of a run, shareable across market makers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Streams {
    /// One snapshot per batch.
    pub prices: Vec<PriceSnapshot>,
    /// One batch of swaps per snapshot.
    pub swaps: Vec<Batch>,
}

impl Streams {
    /// Generates both streams from the configuration's seed.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the configuration is invalid.
    pub fn generate(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let prices = RandomWalkPrices::from_config(config).generate(config.traffic.batches);
        let swaps = TrafficGenerator::new(config)?.generate(&prices)?;
        debug!(
            seed = config.seed,
            batches = prices.len(),
            entries = swaps.iter().map(Batch::len).sum::<usize>(),
            "Streams generated"
        );
        Ok(Self { prices, swaps })
    }

    /// Number of batches.
    #[must_use]
    pub fn batches(&self) -> usize {
        self.swaps.len()
    }
}
