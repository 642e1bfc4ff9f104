//! Batch ingestor — drives one reported batch through the pipeline inside a
//! single unit of work.
//!
//! # Stages
//!
//! ```text
//! Gathering → Filtering → InsertingBlocks → InsertingTransactions → Linking → Committed
//!     └────────────┴──────────────┴───────────────────┴────────────────┴──→ Aborted (rollback)
//! ```
//!
//! Either every block, parent edge, transaction and linkage row of the batch
//! is committed together, or nothing is. Replaying a committed batch is a
//! no-op: known blocks are filtered, known transactions reused, and stored
//! linkage pairs skipped.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::block::{materialize_block, parent_edges};
use crate::error::SyncError;
use crate::existence::non_existing_blocks;
use crate::identity::{referenced_block_hashes, resolve_block_ids};
use crate::linkage::{build_transaction_blocks, without_existing};
use crate::store::{DagStore, StoreTx};
use crate::transaction::insert_transactions;
use crate::types::{BlockBatch, VerboseBlock};

/// Where a batch is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestStage {
    Gathering,
    Filtering,
    InsertingBlocks,
    InsertingTransactions,
    Linking,
    Committed,
    Aborted,
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gathering => write!(f, "gathering"),
            Self::Filtering => write!(f, "filtering"),
            Self::InsertingBlocks => write!(f, "inserting-blocks"),
            Self::InsertingTransactions => write!(f, "inserting-transactions"),
            Self::Linking => write!(f, "linking"),
            Self::Committed => write!(f, "committed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Outcome of a committed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Hashes of blocks created by this batch, in batch order.
    pub new_blocks: Vec<String>,
    /// Reported blocks that were already persisted.
    pub skipped_blocks: usize,
    /// Hashes of transactions created by this batch.
    pub new_transactions: Vec<String>,
    /// Transactions of the batch that already had a row.
    pub reused_transactions: usize,
    pub parent_edges: usize,
    /// Linkage rows inserted.
    pub linked: usize,
}

impl IngestReport {
    /// `true` if the batch changed nothing in the store.
    pub fn is_noop(&self) -> bool {
        self.new_blocks.is_empty() && self.new_transactions.is_empty() && self.linked == 0
    }
}

/// Persists reported batches into a [`DagStore`].
///
/// The hash→identifier maps built for a batch live only for that call.
pub struct BatchIngestor {
    store: Arc<dyn DagStore>,
    timeout: Option<Duration>,
}

impl BatchIngestor {
    pub fn new(store: Arc<dyn DagStore>) -> Self {
        Self { store, timeout: None }
    }

    /// Abort (and roll back) any batch that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &Arc<dyn DagStore> {
        &self.store
    }

    /// Ingest one batch atomically.
    ///
    /// The deadline, if any, also covers waiting for the store to begin the
    /// unit of work.
    pub async fn ingest(&self, batch: &BlockBatch) -> Result<IngestReport, SyncError> {
        let started = Instant::now();
        let deadline = self
            .timeout
            .map(|limit| (tokio::time::Instant::now() + limit, limit));

        let mut tx = match within(deadline, self.store.begin()).await {
            Ok(tx) => tx,
            Err(err) => {
                warn!(error = %err, "could not begin unit of work");
                return Err(err);
            }
        };
        let mut stage = IngestStage::Gathering;
        let outcome = within(deadline, ingest_batch(tx.as_mut(), batch, &mut stage)).await;

        match outcome {
            Ok(report) => {
                tx.commit().await?;
                info!(
                    blocks = batch.blocks.len(),
                    new_blocks = report.new_blocks.len(),
                    skipped = report.skipped_blocks,
                    new_txs = report.new_transactions.len(),
                    linked = report.linked,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "batch committed"
                );
                Ok(report)
            }
            Err(err) => {
                warn!(
                    stage = %IngestStage::Aborted,
                    failed_at = %stage,
                    error = %err,
                    "batch aborted, rolling back"
                );
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Run `work`, failing with [`SyncError::Timeout`] once `deadline` passes.
async fn within<T>(
    deadline: Option<(tokio::time::Instant, Duration)>,
    work: impl Future<Output = Result<T, SyncError>>,
) -> Result<T, SyncError> {
    match deadline {
        Some((at, limit)) => match tokio::time::timeout_at(at, work).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout {
                ms: limit.as_millis() as u64,
            }),
        },
        None => work.await,
    }
}

/// The pipeline proper. `stage` tracks progress so a failure can be reported
/// against the step it happened in.
async fn ingest_batch(
    tx: &mut dyn StoreTx,
    batch: &BlockBatch,
    stage: &mut IngestStage,
) -> Result<IngestReport, SyncError> {
    *stage = IngestStage::Gathering;
    check_batch(batch)?;
    let blocks = first_occurrences(&batch.blocks);
    let referenced = referenced_block_hashes(&batch.blocks);
    debug!(
        reported = batch.blocks.len(),
        unique = blocks.len(),
        referenced = referenced.len(),
        "gathered hashes"
    );

    *stage = IngestStage::Filtering;
    let fresh = non_existing_blocks(tx, &batch.block_hashes, &batch.blocks).await?;

    *stage = IngestStage::InsertingBlocks;
    let records = fresh
        .iter()
        .map(|block| materialize_block(block))
        .collect::<Result<Vec<_>, _>>()?;
    tx.insert_blocks(&records).await?;

    let block_ids = resolve_block_ids(tx, &referenced).await?;
    let edges = parent_edges(&fresh, &block_ids)?;
    tx.insert_block_parents(&edges).await?;

    *stage = IngestStage::InsertingTransactions;
    let transactions = insert_transactions(tx, &blocks).await?;

    *stage = IngestStage::Linking;
    let links = build_transaction_blocks(&blocks, &block_ids, &transactions)?;
    let batch_block_ids: Vec<u64> = blocks
        .iter()
        .filter_map(|b| block_ids.get(&b.hash).copied())
        .collect();
    let stored = tx.transaction_blocks_for(&batch_block_ids).await?;
    let links = without_existing(links, &stored);
    tx.insert_transaction_blocks(&links).await?;

    let mut new_transactions: Vec<String> = transactions
        .iter()
        .filter(|(_, t)| t.is_new)
        .map(|(hash, _)| hash.clone())
        .collect();
    new_transactions.sort();

    *stage = IngestStage::Committed;
    Ok(IngestReport {
        skipped_blocks: blocks.len() - fresh.len(),
        new_blocks: fresh.iter().map(|b| b.hash.clone()).collect(),
        reused_transactions: transactions.len() - new_transactions.len(),
        new_transactions,
        parent_edges: edges.len(),
        linked: links.len(),
    })
}

/// One payload per block hash; a repeated hash keeps its first payload.
fn first_occurrences(blocks: &[VerboseBlock]) -> Vec<&VerboseBlock> {
    let mut seen = HashSet::new();
    blocks
        .iter()
        .filter(|block| seen.insert(block.hash.as_str()))
        .collect()
}

/// The hash list and the payloads must describe the same blocks.
fn check_batch(batch: &BlockBatch) -> Result<(), SyncError> {
    let listed: HashSet<&str> = batch.block_hashes.iter().map(String::as_str).collect();
    let reported: HashSet<&str> = batch.blocks.iter().map(|b| b.hash.as_str()).collect();

    if let Some(hash) = reported.difference(&listed).next() {
        return Err(SyncError::MalformedBatch(format!(
            "payload for block {hash} is not in the hash list"
        )));
    }
    if let Some(hash) = listed.difference(&reported).next() {
        return Err(SyncError::MalformedBatch(format!(
            "block {hash} is listed without a payload"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(hash: &str) -> VerboseBlock {
        VerboseBlock {
            hash: hash.into(),
            version: 1,
            hash_merkle_root: String::new(),
            accepted_id_merkle_root: String::new(),
            utxo_commitment: String::new(),
            time: 0,
            bits: "207fffff".into(),
            nonce: 0,
            blue_score: 0,
            difficulty: 1.0,
            parent_hashes: vec![],
            transactions: vec![],
        }
    }

    #[test]
    fn batch_hash_list_must_match_payloads() {
        let ok = BlockBatch::from_blocks(vec![block("a"), block("b")]);
        assert!(check_batch(&ok).is_ok());

        let mut extra_payload = ok.clone();
        extra_payload.block_hashes.pop();
        assert!(matches!(check_batch(&extra_payload), Err(SyncError::MalformedBatch(_))));

        let mut missing_payload = ok.clone();
        missing_payload.block_hashes.push("c".into());
        assert!(matches!(check_batch(&missing_payload), Err(SyncError::MalformedBatch(_))));
    }

    #[test]
    fn repeated_hash_keeps_first_payload() {
        let mut second = block("a");
        second.blue_score = 9;
        let blocks = vec![block("a"), block("b"), second];

        let unique = first_occurrences(&blocks);
        let hashes: Vec<&str> = unique.iter().map(|b| b.hash.as_str()).collect();
        assert_eq!(hashes, vec!["a", "b"]);
        assert_eq!(unique[0].blue_score, 0);
    }

    #[test]
    fn noop_report() {
        assert!(IngestReport::default().is_noop());
        let report = IngestReport {
            linked: 1,
            ..Default::default()
        };
        assert!(!report.is_noop());
    }

    #[test]
    fn stage_display() {
        assert_eq!(IngestStage::InsertingTransactions.to_string(), "inserting-transactions");
        assert_eq!(IngestStage::Aborted.to_string(), "aborted");
    }
}
