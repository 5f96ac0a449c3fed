//! Repository implementations for file-backed persistence.
//!
//! This module provides repository patterns for storing and retrieving
//! simulation runs, their sample logs, summaries and input streams. Every run
//! lives in its own directory `runs/<id>/` under the store root.

mod simulation_repository;
mod stream_repository;

pub use simulation_repository::{SimulationRecord, SimulationRepository};
pub use stream_repository::StreamRepository;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

const RUNS_DIR: &str = "runs";

/// Store wrapper handing out repositories.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: Arc<PathBuf>,
}

impl RunStore {
    /// Wraps an existing directory without touching the filesystem.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    /// Opens a store, creating its directory layout if needed.
    ///
    /// # Errors
    /// Returns an error if the directories cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        let runs = runs_dir(&store.root);
        tokio::fs::create_dir_all(&runs)
            .await
            .with_context(|| format!("Failed to create store at {}", runs.display()))?;
        Ok(store)
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates a SimulationRepository instance.
    #[must_use]
    pub fn simulations(&self) -> SimulationRepository {
        SimulationRepository::new(self.root.clone())
    }

    /// Creates a StreamRepository instance.
    #[must_use]
    pub fn streams(&self) -> StreamRepository {
        StreamRepository::new(self.root.clone())
    }
}

pub(crate) fn runs_dir(root: &Path) -> PathBuf {
    root.join(RUNS_DIR)
}

pub(crate) fn run_dir(root: &Path, id: Uuid) -> PathBuf {
    runs_dir(root).join(id.to_string())
}

pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Reads a JSON document, or `None` when the file does not exist.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("Failed to probe {}", path.display()))?
    {
        return Ok(None);
    }
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}
