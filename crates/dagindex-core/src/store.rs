//! Storage traits consumed by the ingestion pipeline.
//!
//! A [`DagStore`] hands out [`StoreTx`] units of work. Everything a batch
//! writes goes through one `StoreTx` and becomes visible only on
//! [`StoreTx::commit`]. Dropping a transaction without committing discards
//! its writes.
//!
//! Implementations live in `dagindex-storage` (memory, SQLite).

use async_trait::async_trait;

use crate::error::SyncError;
use crate::records::{
    BlockParentRecord, BlockRecord, RowId, StoreStats, StoredBlock, StoredTransaction,
    TransactionBlockRecord, TransactionRecord,
};

/// One atomic unit of work against the relational store.
///
/// Inserts must reject duplicate natural keys (block hash, transaction hash,
/// block/transaction pair) rather than silently merge them.
#[async_trait]
pub trait StoreTx: Send {
    /// Return the subset of `hashes` that already have a block row.
    async fn existing_block_hashes(&mut self, hashes: &[String]) -> Result<Vec<String>, SyncError>;

    /// Look up block identifiers by hash. Unknown hashes are omitted.
    async fn blocks_by_hashes(&mut self, hashes: &[String]) -> Result<Vec<RowId>, SyncError>;

    /// Look up transaction identifiers by hash. Unknown hashes are omitted.
    async fn transactions_by_hashes(&mut self, hashes: &[String]) -> Result<Vec<RowId>, SyncError>;

    /// Look up subnetwork identifiers by their string ID. Unknown IDs are omitted.
    async fn subnetworks_by_ids(&mut self, subnetwork_ids: &[String]) -> Result<Vec<RowId>, SyncError>;

    /// Linkage rows already stored for any of `block_ids`.
    async fn transaction_blocks_for(
        &mut self,
        block_ids: &[u64],
    ) -> Result<Vec<TransactionBlockRecord>, SyncError>;

    async fn insert_blocks(&mut self, blocks: &[BlockRecord]) -> Result<(), SyncError>;

    async fn insert_block_parents(&mut self, edges: &[BlockParentRecord]) -> Result<(), SyncError>;

    async fn insert_transactions(&mut self, transactions: &[TransactionRecord]) -> Result<(), SyncError>;

    async fn insert_transaction_blocks(
        &mut self,
        links: &[TransactionBlockRecord],
    ) -> Result<(), SyncError>;

    /// Make every write of this unit durable and visible.
    async fn commit(self: Box<Self>) -> Result<(), SyncError>;

    /// Discard every write of this unit.
    async fn rollback(self: Box<Self>) -> Result<(), SyncError>;
}

/// The relational store holding the block DAG.
#[async_trait]
pub trait DagStore: Send + Sync {
    /// Begin a new unit of work.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, SyncError>;

    async fn block_by_hash(&self, hash: &str) -> Result<Option<StoredBlock>, SyncError>;

    async fn block_by_id(&self, id: u64) -> Result<Option<StoredBlock>, SyncError>;

    /// Identifiers of the blocks `block_id` cites, ascending.
    async fn parent_ids(&self, block_id: u64) -> Result<Vec<u64>, SyncError>;

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<StoredTransaction>, SyncError>;

    /// Linkage rows of one block, ordered by index.
    async fn block_transactions(&self, block_id: u64) -> Result<Vec<TransactionBlockRecord>, SyncError>;

    /// Set the selected-chain flag of `block_ids`.
    ///
    /// Only the chain resolver calls this; ingestion never touches the flag
    /// after seeding it.
    async fn set_chain_membership(&self, block_ids: &[u64], is_chain_block: bool) -> Result<(), SyncError>;

    async fn stats(&self) -> Result<StoreStats, SyncError>;
}
