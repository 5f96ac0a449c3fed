//! Stream repository for caching generated price and swap streams.

use super::{read_json, run_dir, write_json};
use anyhow::Result;
use mmsim_simulation::streams::Streams;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const STREAMS_FILE: &str = "streams.json";

/// Repository for the input streams of a run.
#[derive(Debug, Clone)]
pub struct StreamRepository {
    root: Arc<PathBuf>,
}

impl StreamRepository {
    /// Creates a new StreamRepository.
    #[must_use]
    pub fn new(root: Arc<PathBuf>) -> Self {
        Self { root }
    }

    fn path(&self, id: Uuid) -> PathBuf {
        run_dir(&self.root, id).join(STREAMS_FILE)
    }

    /// Saves the streams of a run.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, id: Uuid, streams: &Streams) -> Result<()> {
        write_json(&self.path(id), streams).await?;
        debug!(id = %id, batches = streams.batches(), "Streams cached");
        Ok(())
    }

    /// Loads the streams of a run, if cached.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read.
    pub async fn load(&self, id: Uuid) -> Result<Option<Streams>> {
        read_json(&self.path(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::RunStore;
    use mmsim_domain::swap::{Batch, Swap};
    use mmsim_domain::token::PriceSnapshot;

    #[tokio::test]
    async fn test_save_and_load_streams() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RunStore::open(dir.path()).await.unwrap().streams();
        let streams = Streams {
            prices: vec![PriceSnapshot::new().with_price("X", 1.0).with_price("Y", 2.0)],
            swaps: vec![Batch::new(vec![
                Swap::new("X", "Y", 10.0),
                Swap::arbitrage_event("Y", "X", 4.0),
            ])],
        };

        let id = Uuid::new_v4();
        assert!(repo.load(id).await.unwrap().is_none());
        repo.save(id, &streams).await.unwrap();
        assert_eq!(repo.load(id).await.unwrap(), Some(streams));
    }
}
