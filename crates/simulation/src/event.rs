//! Simulation events for tracking what happens during a run.
//!
//! This module defines event types that can occur during a simulation,
//! such as batch boundaries, swaps, skipped swaps and pool resets.

use crate::config::ResetScope;
use mmsim_domain::enums::SwapOrigin;
use mmsim_domain::error::SkipKind;
use mmsim_domain::token::TokenId;

/// Types of events that can occur during simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEventType {
    /// Prices advanced and a batch started.
    BatchStarted,
    /// Every entry of a batch was consumed.
    BatchCompleted,
    /// A swap changed pool balances.
    SwapExecuted,
    /// A swap failed and was skipped.
    SwapSkipped,
    /// Balances were restored to the deposits.
    PoolReset,
}

/// A simulation event with full context.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationEvent {
    /// Batch the event belongs to.
    pub batch: usize,
    /// Index of the triggering entry within the batch, if any.
    pub index: Option<usize>,
    /// Type of event.
    pub event_type: SimulationEventType,
    /// Additional event-specific data.
    pub data: EventData,
}

/// Event-specific data payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    /// Batch boundary data.
    Batch {
        /// Number of entries in the batch.
        entries: usize,
    },
    /// Swap event data.
    Swap {
        /// Organic or corrective.
        origin: SwapOrigin,
        /// Token paid in.
        token_in: TokenId,
        /// Token taken out.
        token_out: TokenId,
        /// Input taken by the pool.
        amount_in: f64,
        /// Output paid by the pool.
        amount_out: f64,
    },
    /// Skipped swap data.
    Skipped {
        /// Organic or corrective.
        origin: SwapOrigin,
        /// Error category.
        kind: SkipKind,
        /// Error message.
        reason: String,
    },
    /// Reset data.
    Reset {
        /// Granularity that triggered the reset.
        scope: ResetScope,
    },
}

impl SimulationEvent {
    /// Creates a batch started event.
    #[must_use]
    pub fn batch_started(batch: usize, entries: usize) -> Self {
        Self {
            batch,
            index: None,
            event_type: SimulationEventType::BatchStarted,
            data: EventData::Batch { entries },
        }
    }

    /// Creates a batch completed event.
    #[must_use]
    pub fn batch_completed(batch: usize, entries: usize) -> Self {
        Self {
            batch,
            index: None,
            event_type: SimulationEventType::BatchCompleted,
            data: EventData::Batch { entries },
        }
    }

    /// Creates a swap executed event.
    #[must_use]
    pub fn swap_executed(
        batch: usize,
        index: usize,
        origin: SwapOrigin,
        token_in: TokenId,
        token_out: TokenId,
        amount_in: f64,
        amount_out: f64,
    ) -> Self {
        Self {
            batch,
            index: Some(index),
            event_type: SimulationEventType::SwapExecuted,
            data: EventData::Swap {
                origin,
                token_in,
                token_out,
                amount_in,
                amount_out,
            },
        }
    }

    /// Creates a swap skipped event.
    #[must_use]
    pub fn swap_skipped(
        batch: usize,
        index: usize,
        origin: SwapOrigin,
        kind: SkipKind,
        reason: String,
    ) -> Self {
        Self {
            batch,
            index: Some(index),
            event_type: SimulationEventType::SwapSkipped,
            data: EventData::Skipped {
                origin,
                kind,
                reason,
            },
        }
    }

    /// Creates a pool reset event.
    #[must_use]
    pub fn pool_reset(batch: usize, index: Option<usize>, scope: ResetScope) -> Self {
        Self {
            batch,
            index,
            event_type: SimulationEventType::PoolReset,
            data: EventData::Reset { scope },
        }
    }
}

/// Event log for collecting all events during simulation.
#[derive(Debug, Default)]
pub struct EventLog {
    /// All recorded events.
    events: Vec<SimulationEvent>,
}

impl EventLog {
    /// Creates a new empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Records an event.
    pub fn record(&mut self, event: SimulationEvent) {
        self.events.push(event);
    }

    /// Returns all events.
    #[must_use]
    pub fn events(&self) -> &[SimulationEvent] {
        &self.events
    }

    /// Returns events of a specific type.
    #[must_use]
    pub fn events_of_type(&self, event_type: SimulationEventType) -> Vec<&SimulationEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Returns the count of events by type.
    #[must_use]
    pub fn count_by_type(&self, event_type: SimulationEventType) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// Returns total reset count.
    #[must_use]
    pub fn reset_count(&self) -> usize {
        self.count_by_type(SimulationEventType::PoolReset)
    }

    /// Returns total skipped swap count.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count_by_type(SimulationEventType::SwapSkipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_record_and_query() {
        let mut log = EventLog::new();

        log.record(SimulationEvent::batch_started(0, 2));
        log.record(SimulationEvent::swap_executed(
            0,
            0,
            SwapOrigin::Organic,
            "X".into(),
            "Y".into(),
            100.0,
            90.9,
        ));
        log.record(SimulationEvent::swap_skipped(
            0,
            1,
            SwapOrigin::Arbitrage,
            SkipKind::CurveSolve,
            "no root".to_string(),
        ));
        log.record(SimulationEvent::batch_completed(0, 2));
        log.record(SimulationEvent::pool_reset(0, None, ResetScope::Batch));

        assert_eq!(log.events().len(), 5);
        assert_eq!(log.skipped_count(), 1);
        assert_eq!(log.reset_count(), 1);
        assert_eq!(log.count_by_type(SimulationEventType::SwapExecuted), 1);
        assert_eq!(
            log.events_of_type(SimulationEventType::SwapSkipped)[0].index,
            Some(1)
        );
    }

    #[test]
    fn test_every_event_carries_its_payload() {
        let events = [
            SimulationEvent::batch_started(0, 3),
            SimulationEvent::batch_completed(0, 3),
            SimulationEvent::swap_executed(
                0,
                1,
                SwapOrigin::Organic,
                "X".into(),
                "Y".into(),
                1.0,
                0.9,
            ),
            SimulationEvent::swap_skipped(
                0,
                2,
                SwapOrigin::Organic,
                SkipKind::InsufficientLiquidity,
                "drained".to_string(),
            ),
            SimulationEvent::pool_reset(0, Some(2), ResetScope::Swap),
        ];
        for event in &events {
            let matches = match (event.event_type, &event.data) {
                (
                    SimulationEventType::BatchStarted | SimulationEventType::BatchCompleted,
                    EventData::Batch { entries },
                ) => *entries == 3,
                (SimulationEventType::SwapExecuted, EventData::Swap { .. }) => true,
                (SimulationEventType::SwapSkipped, EventData::Skipped { kind, .. }) => {
                    *kind == SkipKind::InsufficientLiquidity
                }
                (SimulationEventType::PoolReset, EventData::Reset { scope }) => {
                    *scope == ResetScope::Swap
                }
                _ => false,
            };
            assert!(matches, "unexpected payload for {:?}", event.event_type);
        }
    }
}
