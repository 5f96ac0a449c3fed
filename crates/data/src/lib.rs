//! File-backed persistence for simulation runs.
//!
//! Runs are stored as plain JSON under a store root so sample logs can be
//! re-aggregated after the fact and generated streams reused across market
//! makers.

pub mod repositories;

pub use repositories::{RunStore, SimulationRecord, SimulationRepository, StreamRepository};
