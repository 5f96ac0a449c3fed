use crate::enums::SwapOrigin;
use crate::error::SkipKind;
use crate::token::TokenId;
use serde::{Deserialize, Serialize};

pub mod impermanent_loss;
pub mod stats;

/// Post-swap balance over deposit for one token touched by a swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRatio {
    pub token: TokenId,
    pub ratio: f64,
}

/// Measurements of one executed swap. Rates are input units per output unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapMetrics {
    pub amount_in: f64,
    pub amount_out: f64,
    /// Pool rate divided by market rate; 1.0 is a perfect fill.
    pub capital_efficiency: f64,
    /// Rate of an immediate identical repeat swap over this swap's rate.
    /// `None` when the repeat swap would not execute.
    pub price_impact: Option<f64>,
    /// Share of the output balance removed by the swap.
    pub drained: f64,
    pub impermanent_loss: Vec<TokenRatio>,
    /// The input was reduced to respect the cap limit.
    #[serde(default)]
    pub clamped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Executed(SwapMetrics),
    Skipped { kind: SkipKind, message: String },
}

/// Record of one swap attempt, executed or skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub batch: usize,
    /// Position of the triggering entry within its batch.
    pub index: usize,
    pub origin: SwapOrigin,
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub status: SampleStatus,
}

impl MetricSample {
    pub fn metrics(&self) -> Option<&SwapMetrics> {
        match &self.status {
            SampleStatus::Executed(m) => Some(m),
            SampleStatus::Skipped { .. } => None,
        }
    }

    pub fn skip_kind(&self) -> Option<SkipKind> {
        match &self.status {
            SampleStatus::Executed(_) => None,
            SampleStatus::Skipped { kind, .. } => Some(*kind),
        }
    }

    pub fn is_executed(&self) -> bool {
        self.metrics().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_json_shape() {
        let sample = MetricSample {
            batch: 1,
            index: 4,
            origin: SwapOrigin::Arbitrage,
            token_in: TokenId::from("ETH"),
            token_out: TokenId::from("USDC"),
            status: SampleStatus::Skipped {
                kind: SkipKind::CapacityExceeded,
                message: "over cap".to_string(),
            },
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("\"origin\":\"arbitrage\""));
        assert!(json.contains("\"capacity_exceeded\""));

        let back: MetricSample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
        assert_eq!(back.skip_kind(), Some(SkipKind::CapacityExceeded));
        assert!(!back.is_executed());
    }
}
