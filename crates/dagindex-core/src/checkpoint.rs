//! Checkpoint manager — persists the sync cursor across restarts.
//!
//! A DAG has no height to resume from, so the cursor is the hash of the
//! deepest block (highest blue score) of the last committed batch. The node
//! is asked for blocks starting at that hash; the overlap is filtered by the
//! ingestor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// A persisted sync cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Network slug (e.g. `"kaspa-mainnet"`).
    pub network: String,
    /// Unique syncer identifier.
    pub indexer_id: String,
    /// Hash to request the next window from.
    pub low_hash: String,
    /// Blue score of `low_hash`.
    pub blue_score: u64,
    /// Unix timestamp of when this checkpoint was saved.
    pub updated_at: i64,
}

/// Storage for checkpoints.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, network: &str, indexer_id: &str) -> Result<Option<Checkpoint>, SyncError>;

    /// Save (upsert) a checkpoint.
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), SyncError>;

    /// Delete a checkpoint (e.g. when resetting a syncer).
    async fn delete(&self, network: &str, indexer_id: &str) -> Result<(), SyncError>;
}

/// Manages checkpoint reads/writes for one syncer.
pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    network: String,
    indexer_id: String,
    /// How often to save (every N batches).
    save_interval: u64,
    /// Batches since last save.
    counter: u64,
}

impl CheckpointManager {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        network: impl Into<String>,
        indexer_id: impl Into<String>,
        save_interval: u64,
    ) -> Self {
        Self {
            store,
            network: network.into(),
            indexer_id: indexer_id.into(),
            save_interval: save_interval.max(1),
            counter: 0,
        }
    }

    pub async fn load(&self) -> Result<Option<Checkpoint>, SyncError> {
        self.store.load(&self.network, &self.indexer_id).await
    }

    /// Save every `save_interval` calls. Call after each committed batch.
    pub async fn maybe_save(&mut self, low_hash: &str, blue_score: u64) -> Result<(), SyncError> {
        self.counter += 1;
        if self.counter >= self.save_interval {
            self.force_save(low_hash, blue_score).await?;
            self.counter = 0;
        }
        Ok(())
    }

    /// Immediately save a checkpoint (used on shutdown).
    pub async fn force_save(&self, low_hash: &str, blue_score: u64) -> Result<(), SyncError> {
        let cp = Checkpoint {
            network: self.network.clone(),
            indexer_id: self.indexer_id.clone(),
            low_hash: low_hash.to_string(),
            blue_score,
            updated_at: chrono::Utc::now().timestamp(),
        };
        self.store.save(cp).await
    }

    /// Forget the saved cursor; the next run starts from the DAG root.
    pub async fn reset(&self) -> Result<(), SyncError> {
        self.store.delete(&self.network, &self.indexer_id).await
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

/// In-memory checkpoint store for tests and ephemeral syncers.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    data: Mutex<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(network: &str, indexer_id: &str) -> String {
        format!("{network}:{indexer_id}")
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Checkpoint>>, SyncError> {
        self.data
            .lock()
            .map_err(|_| SyncError::Storage("checkpoint store lock poisoned".into()))
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, network: &str, indexer_id: &str) -> Result<Option<Checkpoint>, SyncError> {
        Ok(self.entries()?.get(&Self::key(network, indexer_id)).cloned())
    }

    async fn save(&self, checkpoint: Checkpoint) -> Result<(), SyncError> {
        let key = Self::key(&checkpoint.network, &checkpoint.indexer_id);
        self.entries()?.insert(key, checkpoint);
        Ok(())
    }

    async fn delete(&self, network: &str, indexer_id: &str) -> Result<(), SyncError> {
        self.entries()?.remove(&Self::key(network, indexer_id));
        Ok(())
    }
}
