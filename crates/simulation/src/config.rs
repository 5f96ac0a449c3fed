//! Run configuration.
//!
//! Every component gets an explicit, fully enumerated configuration struct.
//! [`SimulationConfig::validate`] runs once before any pool is built and is
//! the only place these values are checked.

use mmsim_domain::enums::MarketMakerType;
use mmsim_domain::error::ConfigError;
use mmsim_domain::token::{PriceSnapshot, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Seed offset of the price stream generator.
pub const PRICE_SEED_OFFSET: u64 = 1;
/// Seed offset of the traffic generator.
pub const TRAFFIC_SEED_OFFSET: u64 = 2;
/// Seed offset of the random k draw.
pub const K_SEED_OFFSET: u64 = 3;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// What to do with a swap whose input would push a token over the cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapPolicy {
    /// Shrink the input to the largest amount that respects the cap.
    #[default]
    Clamp,
    /// Skip the swap with `CapacityExceeded`.
    Reject,
}

/// How often balances are restored when `reset_tx` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    /// After every batch.
    #[default]
    Batch,
    /// After every stream entry, and after every batch.
    Swap,
}

/// Pool construction and swap-execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketMakerConfig {
    /// Market-maker variant.
    #[serde(rename = "type")]
    pub kind: MarketMakerType,
    /// Initial dollar depth of every token balance.
    pub constant: f64,
    /// Curve sharpness applied to every pool.
    #[serde(default)]
    pub k: Option<f64>,
    /// Draw k per token instead of using a fixed value.
    #[serde(default)]
    pub random_k: bool,
    /// Maximum market cap (balance x price) of any token in a pool.
    #[serde(default)]
    pub cap_limit: Option<f64>,
    /// Clamp or reject swaps that breach the cap.
    #[serde(default)]
    pub cap_policy: CapPolicy,
    /// Restore balances to the deposits between batches.
    #[serde(default)]
    pub reset_tx: bool,
    /// Granularity of the reset.
    #[serde(default)]
    pub reset_scope: ResetScope,
    /// Topology override; derived from `kind` when absent.
    #[serde(default)]
    pub multi_token: Option<bool>,
}

impl MarketMakerConfig {
    /// Creates a config with default settings for the given variant.
    #[must_use]
    pub fn new(kind: MarketMakerType, constant: f64) -> Self {
        Self {
            kind,
            constant,
            k: None,
            random_k: false,
            cap_limit: None,
            cap_policy: CapPolicy::default(),
            reset_tx: false,
            reset_scope: ResetScope::default(),
            multi_token: None,
        }
    }

    /// Shared-pool topology, explicit or derived from the variant.
    #[must_use]
    pub fn multi_token(&self) -> bool {
        self.multi_token.unwrap_or_else(|| self.kind.is_multi_token())
    }
}

/// Corrective-swap settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageConfig {
    /// Honor arbitrage events in the swap stream.
    #[serde(default, rename = "arb")]
    pub enabled: bool,
    /// Corrective swaps issued per arbitrage event.
    #[serde(default = "default_arb_actions", rename = "arb_actions")]
    pub actions: usize,
    /// Entries before this index within a batch never trigger arbitrage.
    #[serde(default)]
    pub start_index: usize,
    /// Share of the distance to equilibrium closed by one action.
    #[serde(default = "default_step_fraction")]
    pub step_fraction: f64,
    /// Relative noise on the action size, drawn from the seeded generator.
    #[serde(default)]
    pub jitter: f64,
    /// Gaps to equilibrium at or below this input size are ignored.
    #[serde(default = "default_min_input")]
    pub min_input: f64,
}

fn default_arb_actions() -> usize {
    1
}

fn default_step_fraction() -> f64 {
    0.5
}

fn default_min_input() -> f64 {
    1e-9
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            actions: default_arb_actions(),
            start_index: 0,
            step_fraction: default_step_fraction(),
            jitter: 0.0,
            min_input: default_min_input(),
        }
    }
}

impl ArbitrageConfig {
    /// Enabled arbitrage with `actions` corrective swaps per event.
    #[must_use]
    pub fn enabled(actions: usize) -> Self {
        Self {
            enabled: true,
            actions,
            ..Self::default()
        }
    }

    /// Sets the share of the gap closed per action.
    #[must_use]
    pub fn with_step_fraction(mut self, step_fraction: f64) -> Self {
        self.step_fraction = step_fraction;
        self
    }

    /// Sets the relative size noise.
    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets the first batch index that may trigger arbitrage.
    #[must_use]
    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = start_index;
        self
    }
}

/// One tradable token with optional per-token generator overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token symbol.
    pub symbol: TokenId,
    /// Price of the first batch.
    pub start_price: f64,
    /// Per-batch price drift; negative marks the token as crashing.
    #[serde(default)]
    pub drift: Option<f64>,
    /// Per-batch price volatility.
    #[serde(default)]
    pub volatility: Option<f64>,
    /// Probability that the price moves in a batch.
    #[serde(default)]
    pub change_probability: Option<f64>,
    /// Probability of being picked as swap input.
    #[serde(default)]
    pub in_weight: Option<f64>,
    /// Probability of being picked as swap output.
    #[serde(default)]
    pub out_weight: Option<f64>,
    /// Mean dollar size of swaps paying in this token.
    #[serde(default)]
    pub amount_mean: Option<f64>,
    /// Dollar size deviation of swaps paying in this token.
    #[serde(default)]
    pub amount_stdv: Option<f64>,
    /// Dollar size cap of swaps paying in this token.
    #[serde(default)]
    pub max_amount: Option<f64>,
}

impl TokenConfig {
    /// Creates a token with no overrides.
    #[must_use]
    pub fn new(symbol: impl Into<TokenId>, start_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            start_price,
            drift: None,
            volatility: None,
            change_probability: None,
            in_weight: None,
            out_weight: None,
            amount_mean: None,
            amount_stdv: None,
            max_amount: None,
        }
    }

    /// Sets the price drift.
    #[must_use]
    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = Some(drift);
        self
    }

    /// Sets the input and output weights.
    #[must_use]
    pub fn with_weights(mut self, in_weight: f64, out_weight: f64) -> Self {
        self.in_weight = Some(in_weight);
        self.out_weight = Some(out_weight);
        self
    }
}

/// Shape and size distribution of the synthetic swap stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficConfig {
    /// Number of batches.
    pub batches: usize,
    /// Swaps per batch.
    pub batch_size: usize,
    /// Mean dollar size of a swap.
    pub amount_mean: f64,
    /// Dollar size standard deviation.
    pub amount_stdv: f64,
    /// Upper bound on the dollar size of a swap.
    pub max_amount: f64,
    /// Normally distributed sizes; uniform in `[0, max_amount)` otherwise.
    #[serde(default = "default_true")]
    pub normal: bool,
    /// Probability that an entry is an arbitrage event.
    #[serde(default)]
    pub arb_probability: f64,
}

fn default_true() -> bool {
    true
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            batches: 10,
            batch_size: 100,
            amount_mean: 10_000.0,
            amount_stdv: 2_000.0,
            max_amount: 20_000.0,
            normal: true,
            arb_probability: 0.0,
        }
    }
}

impl TrafficConfig {
    /// Creates a traffic shape with default size distribution.
    #[must_use]
    pub fn new(batches: usize, batch_size: usize) -> Self {
        Self {
            batches,
            batch_size,
            ..Self::default()
        }
    }

    /// Sets the arbitrage event probability.
    #[must_use]
    pub fn with_arb_probability(mut self, arb_probability: f64) -> Self {
        self.arb_probability = arb_probability;
        self
    }
}

/// Default random-walk parameters of the price stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceGenConfig {
    /// Mean relative price change per batch.
    #[serde(default)]
    pub drift: f64,
    /// Standard deviation of the relative price change.
    #[serde(default = "default_volatility")]
    pub volatility: f64,
    /// Probability that a price moves in a batch.
    #[serde(default = "default_change_probability")]
    pub change_probability: f64,
}

fn default_volatility() -> f64 {
    0.00025
}

fn default_change_probability() -> f64 {
    0.5
}

impl Default for PriceGenConfig {
    fn default() -> Self {
        Self {
            drift: 0.0,
            volatility: default_volatility(),
            change_probability: default_change_probability(),
        }
    }
}

/// Complete configuration of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Root seed; every random source derives from it.
    #[serde(default)]
    pub seed: u64,
    /// Pool and execution settings.
    pub market_maker: MarketMakerConfig,
    /// Arbitrage settings.
    #[serde(default)]
    pub arbitrage: ArbitrageConfig,
    /// Tokens in the pool.
    pub tokens: Vec<TokenConfig>,
    /// Swap stream generator settings.
    #[serde(default)]
    pub traffic: TrafficConfig,
    /// Price stream generator settings.
    #[serde(default)]
    pub prices: PriceGenConfig,
}

impl SimulationConfig {
    /// Creates a configuration with default generator settings.
    #[must_use]
    pub fn new(market_maker: MarketMakerConfig, tokens: Vec<TokenConfig>) -> Self {
        Self {
            seed: 0,
            market_maker,
            arbitrage: ArbitrageConfig::default(),
            tokens,
            traffic: TrafficConfig::default(),
            prices: PriceGenConfig::default(),
        }
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] when the document does not parse.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::invalid("config", e.to_string()))
    }

    /// Sets the root seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Switches the market-maker variant, letting the topology follow it.
    #[must_use]
    pub fn with_kind(mut self, kind: MarketMakerType) -> Self {
        self.market_maker.kind = kind;
        self.market_maker.multi_token = None;
        self
    }

    /// Sets a fixed k.
    #[must_use]
    pub fn with_k(mut self, k: f64) -> Self {
        self.market_maker.k = Some(k);
        self.market_maker.random_k = false;
        self
    }

    /// Sets the cap limit and policy.
    #[must_use]
    pub fn with_cap_limit(mut self, cap_limit: f64, policy: CapPolicy) -> Self {
        self.market_maker.cap_limit = Some(cap_limit);
        self.market_maker.cap_policy = policy;
        self
    }

    /// Enables balance resets.
    #[must_use]
    pub fn with_reset(mut self, scope: ResetScope) -> Self {
        self.market_maker.reset_tx = true;
        self.market_maker.reset_scope = scope;
        self
    }

    /// Sets the arbitrage settings.
    #[must_use]
    pub fn with_arbitrage(mut self, arbitrage: ArbitrageConfig) -> Self {
        self.arbitrage = arbitrage;
        self
    }

    /// Sets the traffic settings.
    #[must_use]
    pub fn with_traffic(mut self, traffic: TrafficConfig) -> Self {
        self.traffic = traffic;
        self
    }

    /// Sets the price generator settings.
    #[must_use]
    pub fn with_prices(mut self, prices: PriceGenConfig) -> Self {
        self.prices = prices;
        self
    }

    /// Seed of one collaborator, derived from the root seed.
    #[must_use]
    pub fn component_seed(&self, offset: u64) -> u64 {
        self.seed.wrapping_add(offset)
    }

    /// Token ids in configuration order.
    pub fn token_ids(&self) -> impl Iterator<Item = &TokenId> {
        self.tokens.iter().map(|t| &t.symbol)
    }

    /// Prices of the first batch.
    #[must_use]
    pub fn start_prices(&self) -> PriceSnapshot {
        self.tokens
            .iter()
            .map(|t| (t.symbol.clone(), t.start_price))
            .collect()
    }

    /// Effective drift of a token's price.
    #[must_use]
    pub fn drift_of(&self, token: &TokenConfig) -> f64 {
        token.drift.unwrap_or(self.prices.drift)
    }

    /// Tokens whose price is configured to fall. Arbitrage never withdraws
    /// them and aggregate metrics leave them out.
    #[must_use]
    pub fn protected_tokens(&self) -> BTreeSet<TokenId> {
        self.tokens
            .iter()
            .filter(|t| self.drift_of(t) < 0.0)
            .map(|t| t.symbol.clone())
            .collect()
    }

    /// Checks every field once.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_market_maker()?;
        self.validate_tokens()?;
        self.validate_arbitrage()?;
        self.validate_generators()
    }

    fn validate_market_maker(&self) -> Result<(), ConfigError> {
        let mm = &self.market_maker;
        if !mm.constant.is_finite() || mm.constant <= 0.0 {
            return Err(ConfigError::invalid(
                "market_maker.constant",
                format!("must be positive, got {}", mm.constant),
            ));
        }
        if let Some(k) = mm.k {
            if mm.random_k {
                return Err(ConfigError::invalid(
                    "market_maker.k",
                    "cannot be combined with random_k",
                ));
            }
            if !(0.0..=1.0).contains(&k) {
                return Err(ConfigError::invalid(
                    "market_maker.k",
                    format!("must lie in [0, 1], got {k}"),
                ));
            }
        }
        let proactive = matches!(mm.kind, MarketMakerType::Pmm | MarketMakerType::Mpmm);
        if proactive && mm.k.is_none() && !mm.random_k {
            return Err(ConfigError::Missing("market_maker.k".to_string()));
        }
        if let Some(cap) = mm.cap_limit {
            if !cap.is_finite() || cap <= 0.0 {
                return Err(ConfigError::invalid(
                    "market_maker.cap_limit",
                    format!("must be positive, got {cap}"),
                ));
            }
        }
        if mm.multi_token() != mm.kind.is_multi_token() {
            return Err(ConfigError::invalid(
                "market_maker.multi_token",
                format!("{} does not support this topology", mm.kind),
            ));
        }
        Ok(())
    }

    fn validate_tokens(&self) -> Result<(), ConfigError> {
        if self.tokens.len() < 2 {
            return Err(ConfigError::invalid("tokens", "at least two tokens are required"));
        }
        let mut seen = BTreeSet::new();
        for token in &self.tokens {
            let field = format!("tokens.{}", token.symbol);
            if !seen.insert(&token.symbol) {
                return Err(ConfigError::invalid(field, "duplicate token"));
            }
            if !token.start_price.is_finite() || token.start_price <= 0.0 {
                return Err(ConfigError::invalid(
                    field,
                    format!("start_price must be positive, got {}", token.start_price),
                ));
            }
            for (name, value) in [
                ("in_weight", token.in_weight),
                ("out_weight", token.out_weight),
                ("change_probability", token.change_probability),
            ] {
                if let Some(v) = value {
                    if !(0.0..=1.0).contains(&v) {
                        return Err(ConfigError::invalid(
                            format!("{field}.{name}"),
                            format!("must lie in [0, 1], got {v}"),
                        ));
                    }
                }
            }
            if token.volatility.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err(ConfigError::invalid(
                    format!("{field}.volatility"),
                    "must be non-negative",
                ));
            }
            if token.max_amount.is_some_and(|v| !v.is_finite() || v <= 0.0) {
                return Err(ConfigError::invalid(
                    format!("{field}.max_amount"),
                    "must be positive",
                ));
            }
            if token.amount_mean.is_some_and(|v| !v.is_finite() || v <= 0.0) {
                return Err(ConfigError::invalid(
                    format!("{field}.amount_mean"),
                    "must be positive",
                ));
            }
            if token.amount_stdv.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err(ConfigError::invalid(
                    format!("{field}.amount_stdv"),
                    "must be non-negative",
                ));
            }
        }
        check_weights("in_weight", self.tokens.iter().map(|t| t.in_weight))?;
        check_weights("out_weight", self.tokens.iter().map(|t| t.out_weight))
    }

    fn validate_arbitrage(&self) -> Result<(), ConfigError> {
        let arb = &self.arbitrage;
        if !arb.enabled {
            return Ok(());
        }
        if arb.actions == 0 {
            return Err(ConfigError::invalid(
                "arbitrage.arb_actions",
                "must be at least 1 when arbitrage is enabled",
            ));
        }
        if !(arb.step_fraction > 0.0 && arb.step_fraction <= 1.0) {
            return Err(ConfigError::invalid(
                "arbitrage.step_fraction",
                format!("must lie in (0, 1], got {}", arb.step_fraction),
            ));
        }
        if !(0.0..1.0).contains(&arb.jitter) {
            return Err(ConfigError::invalid(
                "arbitrage.jitter",
                format!("must lie in [0, 1), got {}", arb.jitter),
            ));
        }
        if !arb.min_input.is_finite() || arb.min_input < 0.0 {
            return Err(ConfigError::invalid(
                "arbitrage.min_input",
                "must be non-negative",
            ));
        }
        Ok(())
    }

    fn validate_generators(&self) -> Result<(), ConfigError> {
        let traffic = &self.traffic;
        if traffic.batches == 0 || traffic.batch_size == 0 {
            return Err(ConfigError::invalid(
                "traffic",
                "batches and batch_size must be positive",
            ));
        }
        if !traffic.amount_mean.is_finite() || traffic.amount_mean <= 0.0 {
            return Err(ConfigError::invalid("traffic.amount_mean", "must be positive"));
        }
        if !traffic.max_amount.is_finite() || traffic.max_amount <= 0.0 {
            return Err(ConfigError::invalid("traffic.max_amount", "must be positive"));
        }
        if !traffic.amount_stdv.is_finite() || traffic.amount_stdv < 0.0 {
            return Err(ConfigError::invalid("traffic.amount_stdv", "must be non-negative"));
        }
        if !(0.0..=1.0).contains(&traffic.arb_probability) {
            return Err(ConfigError::invalid(
                "traffic.arb_probability",
                format!("must lie in [0, 1], got {}", traffic.arb_probability),
            ));
        }
        let prices = &self.prices;
        if !prices.volatility.is_finite() || prices.volatility < 0.0 {
            return Err(ConfigError::invalid("prices.volatility", "must be non-negative"));
        }
        if !(0.0..=1.0).contains(&prices.change_probability) {
            return Err(ConfigError::invalid(
                "prices.change_probability",
                format!("must lie in [0, 1], got {}", prices.change_probability),
            ));
        }
        Ok(())
    }
}

fn check_weights(
    field: &str,
    weights: impl Iterator<Item = Option<f64>>,
) -> Result<(), ConfigError> {
    let (mut total, mut unset) = (0.0, 0usize);
    for w in weights {
        match w {
            Some(v) => total += v,
            None => unset += 1,
        }
    }
    if total > 1.0 + WEIGHT_TOLERANCE {
        return Err(ConfigError::invalid(
            field,
            format!("weights sum to {total}, above 1"),
        ));
    }
    if unset == 0 && total <= 0.0 {
        return Err(ConfigError::invalid(field, "every weight is zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Vec<TokenConfig> {
        vec![
            TokenConfig::new("BTC", 23_004.0),
            TokenConfig::new("ETH", 1_600.0),
            TokenConfig::new("USDC", 1.0),
        ]
    }

    fn config(kind: MarketMakerType) -> SimulationConfig {
        SimulationConfig::new(MarketMakerConfig::new(kind, 1_000_000.0), tokens())
    }

    #[test]
    fn test_valid_config() {
        assert!(config(MarketMakerType::Amm).validate().is_ok());
        assert!(config(MarketMakerType::Pmm).with_k(0.5).validate().is_ok());
    }

    #[test]
    fn test_proactive_requires_k() {
        let err = config(MarketMakerType::Mpmm).validate().unwrap_err();
        assert_eq!(err, ConfigError::Missing("market_maker.k".to_string()));

        let mut cfg = config(MarketMakerType::Mpmm);
        cfg.market_maker.random_k = true;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_k_with_random_k() {
        let mut cfg = config(MarketMakerType::Pmm).with_k(0.3);
        cfg.market_maker.random_k = true;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_rejects_topology_mismatch() {
        let mut cfg = config(MarketMakerType::Amm);
        cfg.market_maker.multi_token = Some(true);
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "market_maker.multi_token"));
    }

    #[test]
    fn test_rejects_bad_values() {
        let cfg = config(MarketMakerType::Amm).with_cap_limit(-1.0, CapPolicy::Clamp);
        assert!(cfg.validate().is_err());

        let cfg = config(MarketMakerType::Amm).with_arbitrage(ArbitrageConfig::enabled(0));
        assert!(cfg.validate().is_err());

        let cfg = config(MarketMakerType::Amm).with_traffic(TrafficConfig::new(0, 10));
        assert!(cfg.validate().is_err());

        let mut cfg = config(MarketMakerType::Amm);
        cfg.tokens.push(TokenConfig::new("ETH", 1.0));
        assert!(cfg.validate().is_err());

        let mut cfg = config(MarketMakerType::Amm);
        cfg.tokens[0].in_weight = Some(0.7);
        cfg.tokens[1].in_weight = Some(0.6);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_protected_tokens_follow_drift() {
        let mut cfg = config(MarketMakerType::Amm);
        cfg.tokens[1] = TokenConfig::new("ETH", 1_600.0).with_drift(-0.0075);
        let protected = cfg.protected_tokens();
        assert_eq!(protected.len(), 1);
        assert!(protected.contains(&TokenId::from("ETH")));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "seed": 7,
            "market_maker": { "type": "MPMM", "constant": 1000000, "k": 0.5, "cap_limit": 1e12 },
            "arbitrage": { "arb": true, "arb_actions": 3 },
            "tokens": [
                { "symbol": "BTC", "start_price": 23004 },
                { "symbol": "UST", "start_price": 1, "drift": -0.0075, "in_weight": 0.5 }
            ],
            "traffic": { "batches": 5, "batch_size": 20, "amount_mean": 100, "amount_stdv": 10, "max_amount": 200 }
        }"#;
        let cfg = SimulationConfig::from_json(json).unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.market_maker.kind, MarketMakerType::Mpmm);
        assert!(cfg.market_maker.multi_token());
        assert_eq!(cfg.market_maker.cap_policy, CapPolicy::Clamp);
        assert_eq!(cfg.arbitrage.actions, 3);
        assert_eq!(cfg.arbitrage.step_fraction, 0.5);
        assert!(cfg.traffic.normal);
        assert!(cfg.validate().is_ok());

        assert!(SimulationConfig::from_json("{").is_err());
    }
}
