use crate::error::SwapError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TokenId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Market price of every token in the reference currency for one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSnapshot {
    prices: BTreeMap<TokenId, f64>,
}

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, token: impl Into<TokenId>, price: f64) -> Self {
        self.insert(token.into(), price);
        self
    }

    pub fn insert(&mut self, token: TokenId, price: f64) {
        self.prices.insert(token, price);
    }

    pub fn get(&self, token: &TokenId) -> Option<f64> {
        self.prices.get(token).copied()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TokenId> {
        self.prices.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TokenId, f64)> {
        self.prices.iter().map(|(t, p)| (t, *p))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(TokenId, f64)> for PriceSnapshot {
    fn from_iter<I: IntoIterator<Item = (TokenId, f64)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}

/// Holds the live market price of each token, advanced once per batch.
#[derive(Debug, Clone, Default)]
pub struct PriceOracle {
    current: PriceSnapshot,
    batch: Option<usize>,
}

impl PriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current prices with the snapshot of `batch`.
    pub fn advance(&mut self, batch: usize, snapshot: PriceSnapshot) {
        self.current = snapshot;
        self.batch = Some(batch);
    }

    pub fn batch(&self) -> Option<usize> {
        self.batch
    }

    pub fn snapshot(&self) -> &PriceSnapshot {
        &self.current
    }

    pub fn price(&self, token: &TokenId) -> Result<f64, SwapError> {
        self.current
            .get(token)
            .ok_or_else(|| SwapError::UnknownToken(token.clone()))
    }

    /// Market exchange rate in input units per output unit.
    pub fn rate(&self, token_in: &TokenId, token_out: &TokenId) -> Result<f64, SwapError> {
        Ok(self.price(token_out)? / self.price(token_in)?)
    }
}
