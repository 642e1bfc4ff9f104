//! Persisted record shapes.
//!
//! Records without an `id` are insert candidates; the store assigns the
//! surrogate key. Everything else in the system refers to blocks and
//! transactions by that key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Candidate row for the `blocks` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub block_hash: String,
    pub version: i32,
    pub hash_merkle_root: String,
    pub accepted_id_merkle_root: String,
    pub utxo_commitment: String,
    pub timestamp: DateTime<Utc>,
    pub bits: u32,
    /// Little-endian bytes of the 64-bit nonce.
    pub nonce: Vec<u8>,
    pub blue_score: u64,
    pub transaction_count: u32,
    pub difficulty: f64,
    /// Selected-chain membership. Seeded by ingestion, owned by the resolver.
    pub is_chain_block: bool,
}

/// A persisted block with its surrogate key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBlock {
    pub id: u64,
    #[serde(flatten)]
    pub record: BlockRecord,
}

/// Candidate row for the `transactions` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_hash: String,
    pub transaction_id: String,
    /// Little-endian bytes of the 64-bit lock time.
    pub lock_time: Vec<u8>,
    /// Internal identifier of the subnetwork.
    pub subnetwork_id: u64,
    pub gas: u64,
    pub payload: Vec<u8>,
    pub version: i32,
}

/// A persisted transaction with its surrogate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: u64,
    #[serde(flatten)]
    pub record: TransactionRecord,
}

/// DAG edge: `block_id` cites `parent_block_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockParentRecord {
    pub block_id: u64,
    pub parent_block_id: u64,
}

/// Position of a transaction inside one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionBlockRecord {
    pub block_id: u64,
    pub transaction_id: u64,
    /// Zero-based position in that block's reported transaction list.
    pub index: u32,
}

impl TransactionBlockRecord {
    /// The (block, transaction) pair the uniqueness constraint is defined on.
    pub fn pair(&self) -> (u64, u64) {
        (self.block_id, self.transaction_id)
    }
}

/// A natural key (hash or subnetwork string) and the surrogate key it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId {
    pub key: String,
    pub id: u64,
}

impl RowId {
    pub fn new(key: impl Into<String>, id: u64) -> Self {
        Self { key: key.into(), id }
    }
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub blocks: u64,
    pub block_parents: u64,
    pub transactions: u64,
    pub transaction_blocks: u64,
    pub subnetworks: u64,
}
