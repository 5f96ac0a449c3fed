//! Aggregation of per-swap samples into distributions.
//!
//! The collector only reads samples; it never touches simulation state and
//! can be rebuilt from a persisted sample log.

use mmsim_domain::enums::{MarketMakerType, SwapOrigin};
use mmsim_domain::error::SkipKind;
use mmsim_domain::metrics::impermanent_loss::IlDirection;
use mmsim_domain::metrics::stats::{DEFAULT_TRIM_FRACTION, Summary, trim_outliers};
use mmsim_domain::metrics::{MetricSample, SwapMetrics};
use mmsim_domain::token::TokenId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Summary of one metric, raw and with outliers trimmed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Statistics over every sample.
    pub all: Option<Summary>,
    /// Statistics after dropping the samples farthest from the median.
    pub trimmed: Option<Summary>,
}

impl Distribution {
    /// Builds both views of a series.
    #[must_use]
    pub fn from_values(values: &[f64], trim_fraction: f64) -> Self {
        Self {
            all: Summary::from_values(values),
            trimmed: Summary::from_values(&trim_outliers(values, trim_fraction)),
        }
    }

    /// Sample count of the raw view.
    #[must_use]
    pub fn count(&self) -> usize {
        self.all.map_or(0, |s| s.count)
    }
}

/// Distributions of one token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMetrics {
    /// Capital efficiency of swaps paying in this token.
    pub capital_efficiency: Distribution,
    /// Price impact of swaps paying in this token.
    pub price_impact: Distribution,
    /// Balance ratios above 1.
    pub impermanent_gain: Distribution,
    /// Balance ratios below 1.
    pub impermanent_loss: Distribution,
}

/// Aggregated view of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Market-maker variant.
    pub variant: MarketMakerType,
    /// Samples recorded, executed or skipped.
    pub samples: usize,
    /// Executed swaps.
    pub executed: usize,
    /// Executed organic swaps.
    pub organic: usize,
    /// Executed arbitrage swaps.
    pub arbitrage: usize,
    /// Executed swaps whose input was clamped by the cap.
    pub clamped: usize,
    /// Executed swaps left out because they touch a protected token.
    pub excluded: usize,
    /// Skipped swaps per cause.
    pub skipped: BTreeMap<SkipKind, usize>,
    /// Capital efficiency over all included swaps.
    pub capital_efficiency: Distribution,
    /// Price impact over all included swaps.
    pub price_impact: Distribution,
    /// Impermanent gain ratios over all included swaps.
    pub impermanent_gain: Distribution,
    /// Impermanent loss ratios over all included swaps.
    pub impermanent_loss: Distribution,
    /// Per-token breakdown.
    pub per_token: BTreeMap<TokenId, TokenMetrics>,
}

impl MetricsSummary {
    /// Total number of skipped swaps.
    #[must_use]
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

#[derive(Default)]
struct Series {
    capital_efficiency: Vec<f64>,
    price_impact: Vec<f64>,
    gain: Vec<f64>,
    loss: Vec<f64>,
}

impl Series {
    fn push_swap(&mut self, metrics: &SwapMetrics) {
        self.capital_efficiency.push(metrics.capital_efficiency);
        if let Some(impact) = metrics.price_impact {
            self.price_impact.push(impact);
        }
    }

    fn push_ratio(&mut self, ratio: f64) {
        match IlDirection::of(ratio) {
            IlDirection::Gain => self.gain.push(ratio),
            IlDirection::Loss => self.loss.push(ratio),
            IlDirection::Flat => {}
        }
    }

    fn token_metrics(&self, trim: f64) -> TokenMetrics {
        TokenMetrics {
            capital_efficiency: Distribution::from_values(&self.capital_efficiency, trim),
            price_impact: Distribution::from_values(&self.price_impact, trim),
            impermanent_gain: Distribution::from_values(&self.gain, trim),
            impermanent_loss: Distribution::from_values(&self.loss, trim),
        }
    }
}

/// Accumulates the samples of one market-maker run.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    variant: MarketMakerType,
    protected: BTreeSet<TokenId>,
    trim_fraction: f64,
    samples: Vec<MetricSample>,
}

impl MetricsCollector {
    /// Creates an empty collector. Swaps touching a `protected` token are
    /// kept in the log but left out of the distributions.
    #[must_use]
    pub fn new(variant: MarketMakerType, protected: BTreeSet<TokenId>) -> Self {
        Self {
            variant,
            protected,
            trim_fraction: DEFAULT_TRIM_FRACTION,
            samples: Vec::new(),
        }
    }

    /// Rebuilds a collector from a persisted sample log.
    #[must_use]
    pub fn from_samples(
        variant: MarketMakerType,
        protected: BTreeSet<TokenId>,
        samples: Vec<MetricSample>,
    ) -> Self {
        Self {
            samples,
            ..Self::new(variant, protected)
        }
    }

    /// Sets the share of samples trimmed as outliers.
    #[must_use]
    pub fn with_trim_fraction(mut self, trim_fraction: f64) -> Self {
        self.trim_fraction = trim_fraction;
        self
    }

    /// Records one sample.
    pub fn record(&mut self, sample: MetricSample) {
        self.samples.push(sample);
    }

    /// Returns all samples in recording order.
    #[must_use]
    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Consumes the collector and returns its samples.
    #[must_use]
    pub fn into_samples(self) -> Vec<MetricSample> {
        self.samples
    }

    fn is_protected(&self, sample: &MetricSample) -> bool {
        self.protected.contains(&sample.token_in) || self.protected.contains(&sample.token_out)
    }

    /// Computes the distributions of every metric.
    #[must_use]
    pub fn summarize(&self) -> MetricsSummary {
        let trim = self.trim_fraction;
        let mut overall = Series::default();
        let mut per_token: BTreeMap<TokenId, Series> = BTreeMap::new();
        let mut summary = MetricsSummary {
            variant: self.variant,
            samples: self.samples.len(),
            executed: 0,
            organic: 0,
            arbitrage: 0,
            clamped: 0,
            excluded: 0,
            skipped: BTreeMap::new(),
            capital_efficiency: Distribution::default(),
            price_impact: Distribution::default(),
            impermanent_gain: Distribution::default(),
            impermanent_loss: Distribution::default(),
            per_token: BTreeMap::new(),
        };

        for sample in &self.samples {
            let Some(metrics) = sample.metrics() else {
                if let Some(kind) = sample.skip_kind() {
                    *summary.skipped.entry(kind).or_default() += 1;
                }
                continue;
            };

            summary.executed += 1;
            match sample.origin {
                SwapOrigin::Organic => summary.organic += 1,
                SwapOrigin::Arbitrage => summary.arbitrage += 1,
            }
            if metrics.clamped {
                summary.clamped += 1;
            }
            if self.is_protected(sample) {
                summary.excluded += 1;
                continue;
            }

            overall.push_swap(metrics);
            per_token
                .entry(sample.token_in.clone())
                .or_default()
                .push_swap(metrics);
            for il in &metrics.impermanent_loss {
                overall.push_ratio(il.ratio);
                per_token.entry(il.token.clone()).or_default().push_ratio(il.ratio);
            }
        }

        let totals = overall.token_metrics(trim);
        summary.capital_efficiency = totals.capital_efficiency;
        summary.price_impact = totals.price_impact;
        summary.impermanent_gain = totals.impermanent_gain;
        summary.impermanent_loss = totals.impermanent_loss;
        summary.per_token = per_token
            .iter()
            .map(|(token, series)| (token.clone(), series.token_metrics(trim)))
            .collect();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmsim_domain::metrics::{SampleStatus, TokenRatio};

    fn executed(token_in: &str, token_out: &str, efficiency: f64, origin: SwapOrigin) -> MetricSample {
        MetricSample {
            batch: 0,
            index: 0,
            origin,
            token_in: token_in.into(),
            token_out: token_out.into(),
            status: SampleStatus::Executed(SwapMetrics {
                amount_in: 10.0,
                amount_out: 9.0,
                capital_efficiency: efficiency,
                price_impact: Some(1.01),
                drained: 0.01,
                impermanent_loss: vec![
                    TokenRatio {
                        token: token_in.into(),
                        ratio: 1.01,
                    },
                    TokenRatio {
                        token: token_out.into(),
                        ratio: 0.99,
                    },
                ],
                clamped: false,
            }),
        }
    }

    fn skipped(kind: SkipKind) -> MetricSample {
        MetricSample {
            batch: 0,
            index: 1,
            origin: SwapOrigin::Organic,
            token_in: "X".into(),
            token_out: "Y".into(),
            status: SampleStatus::Skipped {
                kind,
                message: "skipped".to_string(),
            },
        }
    }

    #[test]
    fn test_summarize_counts_and_distributions() {
        let mut collector = MetricsCollector::new(MarketMakerType::Amm, BTreeSet::new());
        collector.record(executed("X", "Y", 1.1, SwapOrigin::Organic));
        collector.record(executed("Y", "X", 1.3, SwapOrigin::Arbitrage));
        collector.record(skipped(SkipKind::InsufficientLiquidity));
        collector.record(skipped(SkipKind::InsufficientLiquidity));
        collector.record(skipped(SkipKind::CapacityExceeded));

        let summary = collector.summarize();
        assert_eq!(summary.samples, 5);
        assert_eq!(summary.executed, 2);
        assert_eq!(summary.organic, 1);
        assert_eq!(summary.arbitrage, 1);
        assert_eq!(summary.skipped_total(), 3);
        assert_eq!(summary.skipped[&SkipKind::InsufficientLiquidity], 2);

        let ce = summary.capital_efficiency.all.unwrap();
        assert_eq!(ce.count, 2);
        assert!((ce.median - 1.2).abs() < 1e-12);
        assert_eq!(summary.impermanent_gain.count(), 2);
        assert_eq!(summary.impermanent_loss.count(), 2);

        let x = &summary.per_token[&TokenId::from("X")];
        assert_eq!(x.capital_efficiency.count(), 1);
        assert_eq!(x.impermanent_gain.count(), 1);
        assert_eq!(x.impermanent_loss.count(), 1);
    }

    #[test]
    fn test_protected_tokens_are_excluded() {
        let protected: BTreeSet<TokenId> = [TokenId::from("LUNA")].into_iter().collect();
        let mut collector = MetricsCollector::new(MarketMakerType::Pmm, protected);
        collector.record(executed("X", "LUNA", 1.5, SwapOrigin::Organic));
        collector.record(executed("X", "Y", 1.1, SwapOrigin::Organic));

        let summary = collector.summarize();
        assert_eq!(summary.executed, 2);
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.capital_efficiency.count(), 1);
        assert!(!summary.per_token.contains_key(&TokenId::from("LUNA")));
    }

    #[test]
    fn test_rebuild_from_samples() {
        let samples = vec![executed("X", "Y", 1.1, SwapOrigin::Organic)];
        let collector =
            MetricsCollector::from_samples(MarketMakerType::Csmm, BTreeSet::new(), samples.clone());
        assert_eq!(collector.samples(), samples.as_slice());
        assert_eq!(collector.summarize().executed, 1);
    }
}
