use crate::token::TokenId;
use serde::{Deserialize, Serialize};

/// One entry of the swap stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swap {
    pub token_in: TokenId,
    pub token_out: TokenId,
    /// Denominated in input-token units.
    pub amount_in: f64,
    /// Marks an arbitrage opportunity rather than an organic trade.
    #[serde(default)]
    pub is_arb: bool,
}

impl Swap {
    pub fn new(token_in: impl Into<TokenId>, token_out: impl Into<TokenId>, amount_in: f64) -> Self {
        Self {
            token_in: token_in.into(),
            token_out: token_out.into(),
            amount_in,
            is_arb: false,
        }
    }

    /// Same as [`Swap::new`] but flagged as an arbitrage event.
    pub fn arbitrage_event(
        token_in: impl Into<TokenId>,
        token_out: impl Into<TokenId>,
        amount_in: f64,
    ) -> Self {
        Self {
            is_arb: true,
            ..Self::new(token_in, token_out, amount_in)
        }
    }

    pub fn with_amount(&self, amount_in: f64) -> Self {
        Self {
            amount_in,
            ..self.clone()
        }
    }
}

/// Ordered swaps sharing one price snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch {
    pub swaps: Vec<Swap>,
}

impl Batch {
    pub fn new(swaps: Vec<Swap>) -> Self {
        Self { swaps }
    }

    pub fn len(&self) -> usize {
        self.swaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Swap> {
        self.swaps.iter()
    }
}

impl From<Vec<Swap>> for Batch {
    fn from(swaps: Vec<Swap>) -> Self {
        Self::new(swaps)
    }
}
