//! In-memory storage backend.
//!
//! Keeps the block DAG, transactions, linkage and checkpoints in RAM.
//! Useful for testing and short-lived syncers that don't need persistence.
//!
//! Units of work are serialized: [`InMemoryStorage::begin`] takes the table
//! lock for the lifetime of the transaction and works on a private copy that
//! replaces the shared tables on commit. The copy costs O(rows) per batch,
//! which is fine for the data sizes this backend is meant for.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use dagindex_core::checkpoint::{Checkpoint, CheckpointStore};
use dagindex_core::error::SyncError;
use dagindex_core::records::{
    BlockParentRecord, BlockRecord, RowId, StoreStats, StoredBlock, StoredTransaction,
    TransactionBlockRecord, TransactionRecord,
};
use dagindex_core::store::{DagStore, StoreTx};

#[derive(Debug, Clone, Default)]
struct Tables {
    /// Row `i` has id `i + 1`.
    blocks: Vec<StoredBlock>,
    block_ids: HashMap<String, u64>,
    block_parents: BTreeSet<BlockParentRecord>,
    transactions: Vec<StoredTransaction>,
    transaction_ids: HashMap<String, u64>,
    /// (block_id, transaction_id) → index
    transaction_blocks: BTreeMap<(u64, u64), u32>,
    subnetworks: Vec<String>,
    subnetwork_ids: HashMap<String, u64>,
}

fn lookup(ids: &HashMap<String, u64>, keys: &[String]) -> Vec<RowId> {
    let mut rows: Vec<RowId> = keys
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|key| ids.get(key).map(|id| RowId::new(key.clone(), *id)))
        .collect();
    rows.sort_by_key(|row| row.id);
    rows
}

fn unique_violation(column: &str, key: impl std::fmt::Display) -> SyncError {
    SyncError::Storage(format!("UNIQUE constraint failed: {column} ({key})"))
}

fn foreign_key_violation(column: &str, id: u64) -> SyncError {
    SyncError::Storage(format!("FOREIGN KEY constraint failed: {column} ({id})"))
}

impl Tables {
    fn has_block(&self, id: u64) -> bool {
        id >= 1 && id as usize <= self.blocks.len()
    }

    fn has_transaction(&self, id: u64) -> bool {
        id >= 1 && id as usize <= self.transactions.len()
    }

    fn register_subnetwork(&mut self, subnetwork_id: &str) -> u64 {
        if let Some(id) = self.subnetwork_ids.get(subnetwork_id) {
            return *id;
        }
        self.subnetworks.push(subnetwork_id.to_string());
        let id = self.subnetworks.len() as u64;
        self.subnetwork_ids.insert(subnetwork_id.to_string(), id);
        id
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            blocks: self.blocks.len() as u64,
            block_parents: self.block_parents.len() as u64,
            transactions: self.transactions.len() as u64,
            transaction_blocks: self.transaction_blocks.len() as u64,
            subnetworks: self.subnetworks.len() as u64,
        }
    }
}

// ─── InMemoryStorage ─────────────────────────────────────────────────────────

/// In-memory DAG storage.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStorage {
    tables: Arc<AsyncMutex<Tables>>,
    checkpoints: Mutex<HashMap<String, Checkpoint>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register subnetwork IDs (insert if absent) and return their identifiers.
    pub async fn register_subnetworks(&self, subnetwork_ids: &[String]) -> Vec<RowId> {
        let mut tables = self.tables.lock().await;
        subnetwork_ids
            .iter()
            .map(|sid| RowId::new(sid.clone(), tables.register_subnetwork(sid)))
            .collect()
    }

    fn checkpoint_key(network: &str, indexer_id: &str) -> String {
        format!("{network}:{indexer_id}")
    }

    fn checkpoint_entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Checkpoint>>, SyncError> {
        self.checkpoints
            .lock()
            .map_err(|_| SyncError::Storage("checkpoint lock poisoned".into()))
    }
}

#[async_trait]
impl DagStore for InMemoryStorage {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, SyncError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<StoredBlock>, SyncError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .block_ids
            .get(hash)
            .and_then(|id| tables.blocks.get(*id as usize - 1))
            .cloned())
    }

    async fn block_by_id(&self, id: u64) -> Result<Option<StoredBlock>, SyncError> {
        let tables = self.tables.lock().await;
        if !tables.has_block(id) {
            return Ok(None);
        }
        Ok(tables.blocks.get(id as usize - 1).cloned())
    }

    async fn parent_ids(&self, block_id: u64) -> Result<Vec<u64>, SyncError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .block_parents
            .iter()
            .filter(|edge| edge.block_id == block_id)
            .map(|edge| edge.parent_block_id)
            .collect())
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<StoredTransaction>, SyncError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .transaction_ids
            .get(hash)
            .and_then(|id| tables.transactions.get(*id as usize - 1))
            .cloned())
    }

    async fn block_transactions(&self, block_id: u64) -> Result<Vec<TransactionBlockRecord>, SyncError> {
        let tables = self.tables.lock().await;
        let mut links: Vec<TransactionBlockRecord> = tables
            .transaction_blocks
            .range((block_id, 0)..=(block_id, u64::MAX))
            .map(|(&(block_id, transaction_id), &index)| TransactionBlockRecord {
                block_id,
                transaction_id,
                index,
            })
            .collect();
        links.sort_by_key(|link| link.index);
        Ok(links)
    }

    async fn set_chain_membership(&self, block_ids: &[u64], is_chain_block: bool) -> Result<(), SyncError> {
        let mut tables = self.tables.lock().await;
        for id in block_ids {
            if let Some(block) = tables.blocks.get_mut((*id as usize).wrapping_sub(1)) {
                block.record.is_chain_block = is_chain_block;
            }
        }
        debug!(blocks = block_ids.len(), is_chain_block, "chain membership updated");
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, SyncError> {
        Ok(self.tables.lock().await.stats())
    }
}

// ─── MemoryTx ────────────────────────────────────────────────────────────────

/// A serialized unit of work over a private copy of the tables.
pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn existing_block_hashes(&mut self, hashes: &[String]) -> Result<Vec<String>, SyncError> {
        Ok(lookup(&self.working.block_ids, hashes)
            .into_iter()
            .map(|row| row.key)
            .collect())
    }

    async fn blocks_by_hashes(&mut self, hashes: &[String]) -> Result<Vec<RowId>, SyncError> {
        Ok(lookup(&self.working.block_ids, hashes))
    }

    async fn transactions_by_hashes(&mut self, hashes: &[String]) -> Result<Vec<RowId>, SyncError> {
        Ok(lookup(&self.working.transaction_ids, hashes))
    }

    async fn subnetworks_by_ids(&mut self, subnetwork_ids: &[String]) -> Result<Vec<RowId>, SyncError> {
        Ok(lookup(&self.working.subnetwork_ids, subnetwork_ids))
    }

    async fn transaction_blocks_for(
        &mut self,
        block_ids: &[u64],
    ) -> Result<Vec<TransactionBlockRecord>, SyncError> {
        let wanted: BTreeSet<u64> = block_ids.iter().copied().collect();
        Ok(self
            .working
            .transaction_blocks
            .iter()
            .filter(|((block_id, _), _)| wanted.contains(block_id))
            .map(|(&(block_id, transaction_id), &index)| TransactionBlockRecord {
                block_id,
                transaction_id,
                index,
            })
            .collect())
    }

    async fn insert_blocks(&mut self, blocks: &[BlockRecord]) -> Result<(), SyncError> {
        let mut incoming = BTreeSet::new();
        for block in blocks {
            if self.working.block_ids.contains_key(&block.block_hash)
                || !incoming.insert(block.block_hash.as_str())
            {
                return Err(unique_violation("blocks.block_hash", &block.block_hash));
            }
        }
        for block in blocks {
            let id = self.working.blocks.len() as u64 + 1;
            self.working.block_ids.insert(block.block_hash.clone(), id);
            self.working.blocks.push(StoredBlock {
                id,
                record: block.clone(),
            });
        }
        Ok(())
    }

    async fn insert_block_parents(&mut self, edges: &[BlockParentRecord]) -> Result<(), SyncError> {
        let mut incoming = BTreeSet::new();
        for edge in edges {
            if !self.working.has_block(edge.block_id) {
                return Err(foreign_key_violation("block_parents.block_id", edge.block_id));
            }
            if !self.working.has_block(edge.parent_block_id) {
                return Err(foreign_key_violation(
                    "block_parents.parent_block_id",
                    edge.parent_block_id,
                ));
            }
            if self.working.block_parents.contains(edge) || !incoming.insert(*edge) {
                return Err(unique_violation(
                    "block_parents",
                    format!("{}, {}", edge.block_id, edge.parent_block_id),
                ));
            }
        }
        self.working.block_parents.extend(edges.iter().copied());
        Ok(())
    }

    async fn insert_transactions(&mut self, transactions: &[TransactionRecord]) -> Result<(), SyncError> {
        let mut incoming = BTreeSet::new();
        for transaction in transactions {
            if self.working.transaction_ids.contains_key(&transaction.transaction_hash)
                || !incoming.insert(transaction.transaction_hash.as_str())
            {
                return Err(unique_violation(
                    "transactions.transaction_hash",
                    &transaction.transaction_hash,
                ));
            }
            let subnetwork_known = transaction.subnetwork_id >= 1
                && transaction.subnetwork_id as usize <= self.working.subnetworks.len();
            if !subnetwork_known {
                return Err(foreign_key_violation(
                    "transactions.subnetwork_id",
                    transaction.subnetwork_id,
                ));
            }
        }
        for transaction in transactions {
            let id = self.working.transactions.len() as u64 + 1;
            self.working
                .transaction_ids
                .insert(transaction.transaction_hash.clone(), id);
            self.working.transactions.push(StoredTransaction {
                id,
                record: transaction.clone(),
            });
        }
        Ok(())
    }

    async fn insert_transaction_blocks(
        &mut self,
        links: &[TransactionBlockRecord],
    ) -> Result<(), SyncError> {
        let mut incoming = BTreeSet::new();
        for link in links {
            if !self.working.has_block(link.block_id) {
                return Err(foreign_key_violation("transactions_blocks.block_id", link.block_id));
            }
            if !self.working.has_transaction(link.transaction_id) {
                return Err(foreign_key_violation(
                    "transactions_blocks.transaction_id",
                    link.transaction_id,
                ));
            }
            if self.working.transaction_blocks.contains_key(&link.pair()) || !incoming.insert(link.pair()) {
                return Err(unique_violation(
                    "transactions_blocks",
                    format!("{}, {}", link.block_id, link.transaction_id),
                ));
            }
        }
        for link in links {
            self.working.transaction_blocks.insert(link.pair(), link.index);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), SyncError> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), SyncError> {
        Ok(())
    }
}

// ─── CheckpointStore impl ────────────────────────────────────────────────────

#[async_trait]
impl CheckpointStore for InMemoryStorage {
    async fn load(&self, network: &str, indexer_id: &str) -> Result<Option<Checkpoint>, SyncError> {
        let key = Self::checkpoint_key(network, indexer_id);
        Ok(self.checkpoint_entries()?.get(&key).cloned())
    }

    async fn save(&self, checkpoint: Checkpoint) -> Result<(), SyncError> {
        let key = Self::checkpoint_key(&checkpoint.network, &checkpoint.indexer_id);
        self.checkpoint_entries()?.insert(key, checkpoint);
        Ok(())
    }

    async fn delete(&self, network: &str, indexer_id: &str) -> Result<(), SyncError> {
        let key = Self::checkpoint_key(network, indexer_id);
        self.checkpoint_entries()?.remove(&key);
        Ok(())
    }
}
