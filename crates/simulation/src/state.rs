//! Simulation state management.
//!
//! This module provides the driver's batch state machine and the summary
//! captured once a run reaches [`DriverState::Done`].

use crate::collector::MetricsSummary;
use mmsim_domain::enums::MarketMakerType;
use mmsim_domain::metrics::impermanent_loss::calculate_il_vs_hold;
use mmsim_domain::pool::ReserveSnapshot;
use mmsim_domain::token::PriceSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of the driver in its batch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DriverState {
    /// Nothing processed yet.
    #[default]
    Idle,
    /// Prices advanced; consuming the batch's swaps.
    BatchRunning {
        /// Batch being consumed.
        batch: usize,
    },
    /// Every entry of the batch was consumed.
    BatchComplete {
        /// Completed batch.
        batch: usize,
    },
    /// Balances were restored to the deposits.
    Reset {
        /// Batch after which the reset happened.
        batch: usize,
    },
    /// Balances carry over to the next batch.
    NextBatch {
        /// Batch just completed.
        batch: usize,
    },
    /// Every configured batch was consumed.
    Done,
}

impl DriverState {
    /// Whether the driver may move from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: &DriverState) -> bool {
        match (*self, *next) {
            (Self::Idle, Self::BatchRunning { batch }) => batch == 0,
            (Self::BatchRunning { batch: a }, Self::BatchComplete { batch: b }) => a == b,
            (Self::BatchComplete { batch: a }, Self::Reset { batch: b })
            | (Self::BatchComplete { batch: a }, Self::NextBatch { batch: b }) => a == b,
            (Self::Reset { batch: a }, Self::BatchRunning { batch: b })
            | (Self::NextBatch { batch: a }, Self::BatchRunning { batch: b }) => b == a + 1,
            (Self::Idle | Self::Reset { .. } | Self::NextBatch { .. }, Self::Done) => true,
            _ => false,
        }
    }

    /// Batch the state refers to, if any.
    #[must_use]
    pub fn batch(&self) -> Option<usize> {
        match self {
            Self::BatchRunning { batch }
            | Self::BatchComplete { batch }
            | Self::Reset { batch }
            | Self::NextBatch { batch } => Some(*batch),
            Self::Idle | Self::Done => None,
        }
    }

    /// Index of the next batch to run.
    #[must_use]
    pub fn next_batch(&self) -> usize {
        match self {
            Self::Reset { batch } | Self::NextBatch { batch } => batch + 1,
            _ => 0,
        }
    }

    /// Whether the run is over.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::BatchRunning { batch } => write!(f, "batch_running({batch})"),
            Self::BatchComplete { batch } => write!(f, "batch_complete({batch})"),
            Self::Reset { batch } => write!(f, "reset({batch})"),
            Self::NextBatch { batch } => write!(f, "next_batch({batch})"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// End-of-run view of one market maker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Market-maker variant.
    pub variant: MarketMakerType,
    /// Root seed of the run.
    pub seed: u64,
    /// Batches consumed.
    pub batches: usize,
    /// Stream entries consumed.
    pub entries: usize,
    /// Balance resets performed.
    pub resets: usize,
    /// Balances at the end of the run.
    pub final_reserves: Vec<ReserveSnapshot>,
    /// Pool value relative to holding the deposits, at the last prices.
    pub pool_vs_hold: Option<f64>,
    /// Metric distributions.
    pub metrics: MetricsSummary,
}

/// Relative value of the pool against the held deposits.
///
/// Returns `None` when a reserve's token has no price.
#[must_use]
pub fn pool_vs_hold(reserves: &[ReserveSnapshot], prices: &PriceSnapshot) -> Option<f64> {
    let entries: Option<Vec<(f64, f64, f64)>> = reserves
        .iter()
        .map(|r| prices.get(&r.token).map(|p| (r.balance, r.deposit, p)))
        .collect();
    calculate_il_vs_hold(&entries?).ok()
}
