//! Batch loop of one market-maker run.
//!
//! [`SimulationDriver`] owns the pool, the oracle and every collaborator of a
//! single variant. It consumes pre-materialized price and swap streams in
//! order, so later swaps always observe the effects of earlier ones. The loop
//! never inspects the variant: all curve behavior sits behind the executor.

use crate::arbitrage::ArbitrageEngine;
use crate::collector::MetricsCollector;
use crate::config::{ResetScope, SimulationConfig};
use crate::event::{EventLog, SimulationEvent};
use crate::executor::SwapExecutor;
use crate::initializer::build_pool;
use crate::state::{DriverState, RunSummary, pool_vs_hold};
use mmsim_domain::curve::PricingCurve;
use mmsim_domain::enums::{MarketMakerType, SwapOrigin};
use mmsim_domain::error::ConfigError;
use mmsim_domain::metrics::{MetricSample, SampleStatus};
use mmsim_domain::pool::PoolState;
use mmsim_domain::swap::{Batch, Swap};
use mmsim_domain::token::{PriceOracle, PriceSnapshot};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct SimulationOutcome {
    /// Aggregated view of the run.
    pub summary: RunSummary,
    /// Every sample in execution order.
    pub samples: Vec<MetricSample>,
    /// Event log of the run.
    pub events: EventLog,
    /// Pool at the end of the run.
    pub pool: PoolState,
}

/// Drives one market maker through a run.
#[derive(Debug)]
pub struct SimulationDriver {
    variant: MarketMakerType,
    seed: u64,
    batches: usize,
    batch_size: usize,
    reset: Option<ResetScope>,
    pool: PoolState,
    oracle: PriceOracle,
    executor: SwapExecutor,
    arbitrage: ArbitrageEngine,
    collector: MetricsCollector,
    events: EventLog,
    state: DriverState,
    entries: usize,
}

impl SimulationDriver {
    /// Validates the configuration and builds every collaborator.
    ///
    /// # Errors
    /// Returns [`ConfigError`] before any pool state exists.
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mm = &config.market_maker;
        let pool = build_pool(config)?;
        let executor = SwapExecutor::new(PricingCurve::for_market_maker(mm.kind))
            .with_cap(mm.cap_limit, mm.cap_policy);
        let protected = config.protected_tokens();
        let arbitrage =
            ArbitrageEngine::new(config.arbitrage.clone(), config.seed, protected.clone());

        info!(
            variant = %mm.kind,
            seed = config.seed,
            batches = config.traffic.batches,
            batch_size = config.traffic.batch_size,
            arbitrage = arbitrage.is_enabled(),
            "Simulation driver ready"
        );

        Ok(Self {
            variant: mm.kind,
            seed: config.seed,
            batches: config.traffic.batches,
            batch_size: config.traffic.batch_size,
            reset: mm.reset_tx.then_some(mm.reset_scope),
            pool,
            oracle: PriceOracle::new(),
            executor,
            arbitrage,
            collector: MetricsCollector::new(mm.kind, protected),
            events: EventLog::new(),
            state: DriverState::Idle,
            entries: 0,
        })
    }

    /// Current state of the batch loop.
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Current pool.
    #[must_use]
    pub fn pool(&self) -> &PoolState {
        &self.pool
    }

    /// Samples recorded so far.
    #[must_use]
    pub fn collector(&self) -> &MetricsCollector {
        &self.collector
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    fn transition_to(&mut self, next: DriverState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "Driver transition");
        self.state = next;
    }

    /// Checks that external streams fit the configured run and the pool.
    ///
    /// # Errors
    /// [`ConfigError::StreamMismatch`] on wrong batch count or size, a
    /// missing or non-positive price, a token outside the pool or a
    /// non-positive swap amount.
    pub fn validate_streams(
        &self,
        prices: &[PriceSnapshot],
        swaps: &[Batch],
    ) -> Result<(), ConfigError> {
        if prices.len() != swaps.len() {
            return Err(ConfigError::StreamMismatch(format!(
                "{} price snapshots for {} swap batches",
                prices.len(),
                swaps.len()
            )));
        }
        if swaps.len() != self.batches {
            return Err(ConfigError::StreamMismatch(format!(
                "expected {} batches, got {}",
                self.batches,
                swaps.len()
            )));
        }

        for (index, (snapshot, batch)) in prices.iter().zip(swaps).enumerate() {
            self.validate_batch(index, snapshot, batch)?;
        }
        Ok(())
    }

    /// Checks one batch and its snapshot against the configured batch size
    /// and the pool's tokens.
    fn validate_batch(
        &self,
        index: usize,
        snapshot: &PriceSnapshot,
        batch: &Batch,
    ) -> Result<(), ConfigError> {
        if batch.len() != self.batch_size {
            return Err(ConfigError::StreamMismatch(format!(
                "batch {index} holds {} swaps, expected {}",
                batch.len(),
                self.batch_size
            )));
        }

        let tokens: BTreeSet<_> = self.pool.tokens().into_iter().collect();
        for token in &tokens {
            match snapshot.get(token) {
                Some(p) if p.is_finite() && p > 0.0 => {}
                Some(p) => {
                    return Err(ConfigError::StreamMismatch(format!(
                        "batch {index} prices {token} at {p}"
                    )));
                }
                None => {
                    return Err(ConfigError::StreamMismatch(format!(
                        "batch {index} has no price for {token}"
                    )));
                }
            }
        }
        for swap in batch.iter() {
            for token in [&swap.token_in, &swap.token_out] {
                if !tokens.contains(token) {
                    return Err(ConfigError::StreamMismatch(format!(
                        "batch {index} references unknown token {token}"
                    )));
                }
            }
            if !swap.amount_in.is_finite() || swap.amount_in <= 0.0 {
                return Err(ConfigError::StreamMismatch(format!(
                    "batch {index} holds a swap of {} {}",
                    swap.amount_in, swap.token_in
                )));
            }
        }
        Ok(())
    }

    /// Runs every batch and returns what the run produced.
    ///
    /// # Errors
    /// Returns [`ConfigError::StreamMismatch`] before touching the pool when
    /// the streams do not fit. Per-swap failures never abort the run.
    pub fn run(
        mut self,
        prices: &[PriceSnapshot],
        swaps: &[Batch],
    ) -> Result<SimulationOutcome, ConfigError> {
        self.validate_streams(prices, swaps)?;
        for (snapshot, batch) in prices.iter().zip(swaps) {
            let index = self.next_index()?;
            self.run_batch(index, snapshot.clone(), batch);
        }
        self.finish();

        let summary = self.summary();
        info!(
            variant = %self.variant,
            entries = summary.entries,
            executed = summary.metrics.executed,
            skipped = summary.metrics.skipped_total(),
            resets = summary.resets,
            "Simulation finished"
        );
        Ok(SimulationOutcome {
            summary,
            samples: self.collector.into_samples(),
            events: self.events,
            pool: self.pool,
        })
    }

    /// Runs a single batch against its price snapshot.
    ///
    /// The batch is checked like [`SimulationDriver::validate_streams`]
    /// checks a whole stream; a rejected batch leaves the driver untouched.
    ///
    /// # Errors
    /// [`ConfigError::StreamMismatch`] when every configured batch has
    /// already run or the batch does not fit the run.
    pub fn step(&mut self, prices: PriceSnapshot, batch: &Batch) -> Result<DriverState, ConfigError> {
        let index = self.next_index()?;
        self.validate_batch(index, &prices, batch)?;
        Ok(self.run_batch(index, prices, batch))
    }

    fn next_index(&self) -> Result<usize, ConfigError> {
        let index = self.state.next_batch();
        if self.state.is_terminal() || index >= self.batches {
            return Err(ConfigError::StreamMismatch(format!(
                "batch {index} exceeds the configured {} batches",
                self.batches
            )));
        }
        Ok(index)
    }

    fn run_batch(&mut self, index: usize, prices: PriceSnapshot, batch: &Batch) -> DriverState {
        self.oracle.advance(index, prices);
        self.transition_to(DriverState::BatchRunning { batch: index });
        self.events
            .record(SimulationEvent::batch_started(index, batch.len()));

        for (position, swap) in batch.iter().enumerate() {
            self.process_entry(index, position, swap);
            self.entries += 1;
            if self.reset == Some(ResetScope::Swap) {
                self.pool.reset();
                self.events.record(SimulationEvent::pool_reset(
                    index,
                    Some(position),
                    ResetScope::Swap,
                ));
            }
        }

        self.transition_to(DriverState::BatchComplete { batch: index });
        self.events
            .record(SimulationEvent::batch_completed(index, batch.len()));

        if let Some(scope) = self.reset {
            self.pool.reset();
            self.events
                .record(SimulationEvent::pool_reset(index, None, scope));
            debug!(batch = index, "Pool balances restored");
            self.transition_to(DriverState::Reset { batch: index });
        } else {
            self.transition_to(DriverState::NextBatch { batch: index });
        }
        info!(batch = index, entries = batch.len(), "Batch completed");

        if index + 1 == self.batches {
            self.finish();
        }
        self.state
    }

    fn finish(&mut self) {
        if !self.state.is_terminal() {
            self.transition_to(DriverState::Done);
        }
    }

    fn process_entry(&mut self, batch: usize, index: usize, swap: &Swap) {
        if !self.arbitrage.triggers(swap, index) {
            self.execute(batch, index, swap, SwapOrigin::Organic);
            return;
        }

        for _ in 0..self.arbitrage.actions_per_event() {
            let Some(action) = self
                .arbitrage
                .next_action(&self.pool, &self.oracle, &self.executor)
            else {
                debug!(batch, swap = index, "No profitable arbitrage");
                break;
            };
            debug!(
                batch,
                swap = index,
                token_in = %action.swap.token_in,
                token_out = %action.swap.token_out,
                score = action.score,
                "Arbitrage action"
            );
            if !self.execute(batch, index, &action.swap, SwapOrigin::Arbitrage) {
                break;
            }
        }
    }

    /// Executes one swap and records its sample. Returns whether it executed.
    fn execute(&mut self, batch: usize, index: usize, swap: &Swap, origin: SwapOrigin) -> bool {
        let status = match self.executor.execute(&mut self.pool, &self.oracle, swap) {
            Ok(metrics) => {
                self.events.record(SimulationEvent::swap_executed(
                    batch,
                    index,
                    origin,
                    swap.token_in.clone(),
                    swap.token_out.clone(),
                    metrics.amount_in,
                    metrics.amount_out,
                ));
                SampleStatus::Executed(metrics)
            }
            Err(e) => {
                warn!(
                    batch,
                    swap = index,
                    token_in = %swap.token_in,
                    token_out = %swap.token_out,
                    amount_in = swap.amount_in,
                    error = %e,
                    "Swap skipped"
                );
                self.events.record(SimulationEvent::swap_skipped(
                    batch,
                    index,
                    origin,
                    e.kind(),
                    e.to_string(),
                ));
                SampleStatus::Skipped {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        };
        let executed = matches!(status, SampleStatus::Executed(_));
        self.collector.record(MetricSample {
            batch,
            index,
            origin,
            token_in: swap.token_in.clone(),
            token_out: swap.token_out.clone(),
            status,
        });
        executed
    }

    /// Summary of everything processed so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let final_reserves = self.pool.snapshot();
        RunSummary {
            variant: self.variant,
            seed: self.seed,
            batches: self.oracle.batch().map_or(0, |b| b + 1),
            entries: self.entries,
            resets: self.events.reset_count(),
            pool_vs_hold: pool_vs_hold(&final_reserves, self.oracle.snapshot()),
            final_reserves,
            metrics: self.collector.summarize(),
        }
    }
}
