//! The sync loop — fetch a window, ingest it, hand it to the chain resolver,
//! advance the cursor.
//!
//! ```text
//! checkpoint ─→ fetch_batch(low_hash) ─→ BatchIngestor::ingest ─→ commit
//!                                                                  │
//!                  cursor advance ←─ ChainResolver::on_batch_committed
//! ```
//!
//! The resolver only ever sees committed batches. A batch that fails (in
//! ingestion or in the resolver) leaves the cursor where it was, so the same
//! window is fetched again; ingestion of an already-committed window is a
//! no-op.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::checkpoint::{CheckpointManager, CheckpointStore};
use crate::config::{SyncConfig, SyncState};
use crate::error::SyncError;
use crate::ingest::{BatchIngestor, IngestReport};
use crate::store::DagStore;
use crate::types::BlockBatch;

/// The node-fetch collaborator.
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// Fetch the window of blocks starting at `low_hash`, or at the DAG root
    /// when `None`. An empty batch means there is nothing to fetch yet.
    async fn fetch_batch(&self, low_hash: Option<&str>) -> Result<BlockBatch, SyncError>;
}

/// The selected-chain resolver, invoked after each commit.
///
/// This is the only component allowed to change a block's chain flag
/// (through [`DagStore::set_chain_membership`]).
#[async_trait]
pub trait ChainResolver: Send + Sync {
    async fn on_batch_committed(
        &self,
        store: &dyn DagStore,
        batch: &BlockBatch,
        report: &IngestReport,
    ) -> Result<(), SyncError>;
}

/// Drives a [`BatchSource`] into a [`DagStore`].
pub struct SyncLoop<S: BatchSource> {
    config: SyncConfig,
    source: S,
    ingestor: BatchIngestor,
    resolver: Option<Arc<dyn ChainResolver>>,
    checkpoint: CheckpointManager,
    cursor: Option<(String, u64)>,
    state: SyncState,
}

impl<S: BatchSource> SyncLoop<S> {
    pub fn new(
        config: SyncConfig,
        source: S,
        store: Arc<dyn DagStore>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        let mut ingestor = BatchIngestor::new(store);
        if let Some(limit) = config.batch_timeout() {
            ingestor = ingestor.with_timeout(limit);
        }
        let checkpoint = CheckpointManager::new(
            checkpoints,
            &config.network,
            &config.id,
            config.checkpoint_interval,
        );
        Self {
            source,
            ingestor,
            resolver: None,
            checkpoint,
            cursor: None,
            state: SyncState::Idle,
            config,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ChainResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Hash the next window will be requested from.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_ref().map(|(hash, _)| hash.as_str())
    }

    /// Load the saved cursor, if any.
    pub async fn resume(&mut self) -> Result<(), SyncError> {
        if let Some(cp) = self.checkpoint.load().await? {
            info!(low_hash = %cp.low_hash, blue_score = cp.blue_score, "Resuming from checkpoint");
            self.cursor = Some((cp.low_hash, cp.blue_score));
        }
        Ok(())
    }

    /// Fetch, ingest and resolve one window.
    ///
    /// Returns `None` if the source had nothing to report.
    pub async fn step(&mut self) -> Result<Option<IngestReport>, SyncError> {
        let batch = self.source.fetch_batch(self.cursor()).await?;
        if batch.is_empty() {
            return Ok(None);
        }

        let report = self.ingestor.ingest(&batch).await?;

        if let Some(resolver) = &self.resolver {
            resolver
                .on_batch_committed(self.ingestor.store().as_ref(), &batch, &report)
                .await?;
        }

        if let Some(tip) = batch.tip() {
            if self.cursor() != Some(tip.hash.as_str()) {
                self.checkpoint.maybe_save(&tip.hash, tip.blue_score).await?;
                self.cursor = Some((tip.hash.clone(), tip.blue_score));
            }
        }
        Ok(Some(report))
    }

    /// Run until caught up, or forever in follow mode.
    pub async fn run(&mut self) -> Result<(), SyncError> {
        self.resume().await?;
        self.state = SyncState::Syncing;
        info!(network = %self.config.network, id = %self.config.id, "Starting sync");

        loop {
            match self.step().await {
                Ok(Some(report)) if !report.new_blocks.is_empty() => {
                    self.state = SyncState::Syncing;
                }
                Ok(_) => {
                    if !self.config.follow {
                        self.stop().await?;
                        return Ok(());
                    }
                    if self.state != SyncState::Live {
                        info!(cursor = ?self.cursor(), "Caught up, following");
                    }
                    self.state = SyncState::Live;
                    tokio::time::sleep(self.config.poll_interval()).await;
                }
                Err(err) if self.config.follow && err.is_retryable() => {
                    warn!(error = %err, "Transient failure, retrying window");
                    tokio::time::sleep(self.config.poll_interval()).await;
                }
                Err(err) => {
                    self.state = SyncState::Error;
                    return Err(err);
                }
            }
        }
    }

    async fn stop(&mut self) -> Result<(), SyncError> {
        if let Some((hash, blue_score)) = &self.cursor {
            self.checkpoint.force_save(hash, *blue_score).await?;
        }
        self.state = SyncState::Stopped;
        info!(cursor = ?self.cursor(), "Sync stopped");
        Ok(())
    }
}
