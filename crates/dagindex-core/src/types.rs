//! Payload types reported by the node for one sync window.

use serde::{Deserialize, Serialize};

// ─── VerboseBlock ─────────────────────────────────────────────────────────────

/// A block as reported by the node, including its ordered transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerboseBlock {
    pub hash: String,
    pub version: i32,
    pub hash_merkle_root: String,
    #[serde(rename = "acceptedIDMerkleRoot")]
    pub accepted_id_merkle_root: String,
    pub utxo_commitment: String,
    /// Block time in milliseconds since the Unix epoch.
    pub time: i64,
    /// Difficulty bits as hex text (e.g. `"207fffff"`).
    pub bits: String,
    pub nonce: u64,
    pub blue_score: u64,
    pub difficulty: f64,
    /// Hashes of the blocks this block cites. Empty only for the DAG root.
    #[serde(default)]
    pub parent_hashes: Vec<String>,
    /// Transactions in block order. The position is the linkage index.
    #[serde(default, rename = "transactionVerboseData")]
    pub transactions: Vec<VerboseTransaction>,
}

impl VerboseBlock {
    /// Returns `true` if the block cites no parents (the DAG root).
    pub fn is_genesis(&self) -> bool {
        self.parent_hashes.is_empty()
    }
}

// ─── VerboseTransaction ───────────────────────────────────────────────────────

/// A transaction as reported inside a [`VerboseBlock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerboseTransaction {
    /// Signature-inclusive hash; the natural key of the transaction record.
    pub hash: String,
    /// Mass/commitment identifier, kept alongside the hash.
    #[serde(rename = "txId")]
    pub transaction_id: String,
    /// Lock time as hex text.
    pub lock_time: String,
    pub subnetwork_id: String,
    #[serde(default)]
    pub gas: u64,
    /// Hex-encoded payload; empty for native transactions.
    #[serde(default)]
    pub payload: String,
    pub version: i32,
    #[serde(default, rename = "transactionVerboseInputs")]
    pub inputs: Vec<TransactionInput>,
    #[serde(default, rename = "transactionVerboseOutputs")]
    pub outputs: Vec<TransactionOutput>,
}

/// A reported transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    #[serde(rename = "txId")]
    pub previous_transaction_id: String,
    #[serde(rename = "outputIndex")]
    pub previous_output_index: u32,
    #[serde(default)]
    pub signature_script: String,
    pub sequence: u64,
}

/// A reported transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    pub value: u64,
    #[serde(default)]
    pub script_pub_key: String,
    pub index: u32,
}

// ─── BlockBatch ───────────────────────────────────────────────────────────────

/// One unit of work: the ordered block hashes of a sync window and their
/// verbose payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockBatch {
    pub block_hashes: Vec<String>,
    #[serde(rename = "blockVerboseData")]
    pub blocks: Vec<VerboseBlock>,
}

impl BlockBatch {
    /// Build a batch whose hash list mirrors the payload order.
    pub fn from_blocks(blocks: Vec<VerboseBlock>) -> Self {
        Self {
            block_hashes: blocks.iter().map(|b| b.hash.clone()).collect(),
            blocks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The block with the highest blue score, i.e. the deepest point this
    /// window reached. Used to advance the sync cursor.
    pub fn tip(&self) -> Option<&VerboseBlock> {
        self.blocks.iter().max_by_key(|b| b.blue_score)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
