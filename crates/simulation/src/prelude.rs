//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use mmsim_simulation::prelude::*;
//! ```

// Arbitrage
pub use crate::arbitrage::{ArbitrageAction, ArbitrageEngine};

// Metrics
pub use crate::collector::{Distribution, MetricsCollector, MetricsSummary, TokenMetrics};

// Configuration
pub use crate::config::{
    ArbitrageConfig, CapPolicy, MarketMakerConfig, PriceGenConfig, ResetScope, SimulationConfig,
    TokenConfig, TrafficConfig,
};

// Driver
pub use crate::driver::{SimulationDriver, SimulationOutcome};

// Events
pub use crate::event::{EventData, EventLog, SimulationEvent, SimulationEventType};

// Execution
pub use crate::executor::{CheckedQuote, SwapExecutor};

// Initialization
pub use crate::initializer::{build_pool, token_k};

// Monte Carlo
pub use crate::monte_carlo::{MonteCarloRunner, VariantAggregate, run_variant};

// Price stream generators
pub use crate::price_path::{DeterministicPrices, PriceStreamGenerator, RandomWalkPrices, TokenWalk};

// State management
pub use crate::state::{DriverState, RunSummary, pool_vs_hold};

// Streams
pub use crate::streams::Streams;
pub use crate::traffic::TrafficGenerator;
