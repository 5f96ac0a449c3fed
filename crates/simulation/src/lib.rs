//! Batch simulation of market-maker pools.
//!
//! This crate drives the pricing curves of `mmsim-domain` through a run:
//! - Configuration and validation
//! - Pool initialization
//! - Swap execution with cap enforcement
//! - Arbitrage against the market price
//! - The batch state machine and its event log
//! - Metric aggregation
//! - Seeded price and swap stream generators
//! - Multi-seed, multi-variant runs

/// Prelude module for convenient imports.
pub mod prelude;

/// Corrective swaps toward the market rate.
pub mod arbitrage;
/// Metric aggregation.
pub mod collector;
/// Run configuration.
pub mod config;
/// Batch loop of one market maker.
pub mod driver;
/// Simulation events.
pub mod event;
/// Swap execution.
pub mod executor;
/// Initial pool construction.
pub mod initializer;
/// Multi-seed, multi-variant runs.
pub mod monte_carlo;
/// Price stream generators.
pub mod price_path;
/// Driver states and run summaries.
pub mod state;
/// Generated run inputs.
pub mod streams;
/// Swap stream generator.
pub mod traffic;
