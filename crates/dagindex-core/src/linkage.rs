//! Linkage builder — one block↔transaction row per occurrence.

use std::collections::{HashMap, HashSet};

use crate::error::SyncError;
use crate::records::TransactionBlockRecord;
use crate::transaction::ResolvedTransaction;
use crate::types::VerboseBlock;

/// Build the linkage rows of `blocks`.
///
/// The index is the block-local position of the transaction. A transaction
/// cited by two blocks yields two rows, each with its own index.
pub fn build_transaction_blocks(
    blocks: &[&VerboseBlock],
    block_ids: &HashMap<String, u64>,
    transactions: &HashMap<String, ResolvedTransaction>,
) -> Result<Vec<TransactionBlockRecord>, SyncError> {
    let mut links = Vec::new();
    for block in blocks {
        let block_id = *block_ids
            .get(&block.hash)
            .ok_or_else(|| SyncError::Other(format!("block {} has no resolved identifier", block.hash)))?;

        for (i, transaction) in block.transactions.iter().enumerate() {
            let resolved = transactions.get(&transaction.hash).ok_or_else(|| {
                SyncError::DanglingReference {
                    block_hash: block.hash.clone(),
                    transaction_hash: transaction.hash.clone(),
                }
            })?;
            let index = u32::try_from(i)
                .map_err(|e| SyncError::decode(&block.hash, "transactions", e))?;

            links.push(TransactionBlockRecord {
                block_id,
                transaction_id: resolved.id,
                index,
            });
        }
    }
    Ok(links)
}

/// Drop rows whose (block, transaction) pair is already stored, and repeats
/// of the same pair within `links`.
pub fn without_existing(
    links: Vec<TransactionBlockRecord>,
    stored: &[TransactionBlockRecord],
) -> Vec<TransactionBlockRecord> {
    let mut seen: HashSet<(u64, u64)> = stored.iter().map(TransactionBlockRecord::pair).collect();
    links.into_iter().filter(|link| seen.insert(link.pair())).collect()
}
