//! Simulation repository for run records, sample logs and summaries.

use super::{read_json, run_dir, runs_dir, write_json};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mmsim_domain::enums::MarketMakerType;
use mmsim_domain::metrics::MetricSample;
use mmsim_simulation::collector::{MetricsCollector, MetricsSummary};
use mmsim_simulation::config::SimulationConfig;
use mmsim_simulation::state::RunSummary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;
use uuid::Uuid;

const RECORD_FILE: &str = "record.json";
const SAMPLES_FILE: &str = "samples.jsonl";
const SUMMARY_FILE: &str = "summary.json";

/// Stored description of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Market-maker variant.
    pub variant: MarketMakerType,
    /// Root seed of the run.
    pub seed: u64,
    /// Full configuration the run used.
    pub config: SimulationConfig,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Repository for simulation runs.
#[derive(Debug, Clone)]
pub struct SimulationRepository {
    root: Arc<PathBuf>,
}

impl SimulationRepository {
    /// Creates a new SimulationRepository.
    #[must_use]
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }

    fn file(&self, id: Uuid, name: &str) -> PathBuf {
        run_dir(&self.root, id).join(name)
    }

    /// Registers a new run of `config`.
    ///
    /// # Errors
    /// Returns an error if the record cannot be written.
    pub async fn create(&self, config: &SimulationConfig) -> Result<SimulationRecord> {
        let record = SimulationRecord {
            id: Uuid::new_v4(),
            variant: config.market_maker.kind,
            seed: config.seed,
            config: config.clone(),
            created_at: Utc::now(),
        };
        write_json(&self.file(record.id, RECORD_FILE), &record).await?;
        debug!(id = %record.id, variant = %record.variant, "Run record saved");
        Ok(record)
    }

    /// Writes the sample log of a run, one JSON document per line.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub async fn save_samples(&self, id: Uuid, samples: &[MetricSample]) -> Result<()> {
        let path = self.file(id, SAMPLES_FILE);
        let file = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for sample in samples {
            let line = serde_json::to_string(sample).context("Failed to serialize sample")?;
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
        writer
            .flush()
            .await
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        debug!(id = %id, samples = samples.len(), "Sample log saved");
        Ok(())
    }

    /// Writes the run summary.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub async fn save_summary(&self, id: Uuid, summary: &RunSummary) -> Result<()> {
        write_json(&self.file(id, SUMMARY_FILE), summary).await
    }

    /// Finds a run by ID.
    ///
    /// # Errors
    /// Returns an error if the record exists but cannot be read.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<SimulationRecord>> {
        read_json(&self.file(id, RECORD_FILE)).await
    }

    /// Loads the stored summary of a run.
    ///
    /// # Errors
    /// Returns an error if the summary exists but cannot be read.
    pub async fn load_summary(&self, id: Uuid) -> Result<Option<RunSummary>> {
        read_json(&self.file(id, SUMMARY_FILE)).await
    }

    /// Loads the sample log of a run in recording order.
    ///
    /// # Errors
    /// Returns an error if the log is missing or a line does not parse.
    pub async fn load_samples(&self, id: Uuid) -> Result<Vec<MetricSample>> {
        let path = self.file(id, SAMPLES_FILE);
        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut lines = BufReader::new(file).lines();
        let mut samples = Vec::new();
        let mut number = 0usize;
        while let Some(line) = lines.next_line().await? {
            number += 1;
            if line.trim().is_empty() {
                continue;
            }
            let sample = serde_json::from_str(&line)
                .with_context(|| format!("Invalid sample on line {number} of {}", path.display()))?;
            samples.push(sample);
        }
        Ok(samples)
    }

    /// Recomputes the metric distributions of a run from its sample log.
    ///
    /// # Errors
    /// Returns an error if the run or its sample log is missing.
    pub async fn rebuild_summary(&self, id: Uuid) -> Result<MetricsSummary> {
        let record = self
            .find_by_id(id)
            .await?
            .with_context(|| format!("Run {id} not found"))?;
        let samples = self.load_samples(id).await?;
        let collector = MetricsCollector::from_samples(
            record.variant,
            record.config.protected_tokens(),
            samples,
        );
        Ok(collector.summarize())
    }

    /// Finds recent runs, newest first.
    ///
    /// # Errors
    /// Returns an error if the store cannot be listed.
    pub async fn find_recent(&self, limit: usize) -> Result<Vec<SimulationRecord>> {
        let runs = runs_dir(&self.root);
        if !tokio::fs::try_exists(&runs).await? {
            return Ok(Vec::new());
        }
        let mut entries = tokio::fs::read_dir(&runs)
            .await
            .with_context(|| format!("Failed to list {}", runs.display()))?;
        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path().join(RECORD_FILE);
            if let Some(record) = read_json::<SimulationRecord>(&path).await? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::RunStore;
    use mmsim_simulation::config::{MarketMakerConfig, TokenConfig, TrafficConfig};
    use mmsim_simulation::driver::SimulationDriver;
    use mmsim_simulation::streams::Streams;

    fn config() -> SimulationConfig {
        SimulationConfig::new(
            MarketMakerConfig::new(MarketMakerType::Amm, 10_000.0),
            vec![TokenConfig::new("X", 1.0), TokenConfig::new("Y", 2.0)],
        )
        .with_traffic(TrafficConfig::new(2, 5))
        .with_seed(4)
    }

    #[tokio::test]
    async fn test_save_and_rebuild_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::open(dir.path()).await.unwrap();
        let repo = store.simulations();

        let cfg = config();
        let streams = Streams::generate(&cfg).unwrap();
        let outcome = SimulationDriver::new(&cfg)
            .unwrap()
            .run(&streams.prices, &streams.swaps)
            .unwrap();

        let record = repo.create(&cfg).await.unwrap();
        repo.save_samples(record.id, &outcome.samples).await.unwrap();
        repo.save_summary(record.id, &outcome.summary).await.unwrap();

        let found = repo.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
        assert_eq!(found.variant, MarketMakerType::Amm);
        assert_eq!(found.seed, 4);
        assert_eq!(found.config.tokens.len(), 2);

        let samples = repo.load_samples(record.id).await.unwrap();
        assert_eq!(samples.len(), outcome.samples.len());

        let rebuilt = repo.rebuild_summary(record.id).await.unwrap();
        assert_eq!(rebuilt.samples, outcome.summary.metrics.samples);
        assert_eq!(rebuilt.executed, outcome.summary.metrics.executed);

        let summary = repo.load_summary(record.id).await.unwrap().unwrap();
        assert_eq!(summary.entries, 10);
    }

    #[tokio::test]
    async fn test_missing_run() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RunStore::open(dir.path()).await.unwrap().simulations();
        let id = Uuid::new_v4();
        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert!(repo.load_summary(id).await.unwrap().is_none());
        assert!(repo.load_samples(id).await.is_err());
        assert!(repo.rebuild_summary(id).await.is_err());
    }

    #[tokio::test]
    async fn test_find_recent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RunStore::open(dir.path()).await.unwrap().simulations();
        let first = repo.create(&config()).await.unwrap();
        let second = repo
            .create(&config().with_kind(MarketMakerType::Csmm))
            .await
            .unwrap();

        let recent = repo.find_recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].created_at >= recent[1].created_at);
        let ids: Vec<Uuid> = recent.iter().map(|r| r.id).collect();
        assert!(ids.contains(&first.id) && ids.contains(&second.id));
        assert_eq!(repo.find_recent(1).await.unwrap().len(), 1);
    }
}
