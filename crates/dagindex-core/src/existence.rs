//! Existence filter — drops blocks that an earlier batch already persisted.
//!
//! Sync windows overlap (the node repeats the low hash, and retried windows
//! repeat everything), so re-reported blocks are skipped here instead of
//! being materialized a second time.

use std::collections::HashSet;

use tracing::debug;

use crate::error::SyncError;
use crate::store::StoreTx;
use crate::types::VerboseBlock;

/// Return the payloads whose hash is not persisted yet.
///
/// The result is a subsequence of `blocks`. A hash reported twice in the same
/// batch is kept once, at its first occurrence.
pub async fn non_existing_blocks<'a>(
    tx: &mut dyn StoreTx,
    block_hashes: &[String],
    blocks: &'a [VerboseBlock],
) -> Result<Vec<&'a VerboseBlock>, SyncError> {
    let existing = tx.existing_block_hashes(block_hashes).await?;
    let mut seen: HashSet<&str> = existing.iter().map(String::as_str).collect();

    let fresh: Vec<&VerboseBlock> = blocks
        .iter()
        .filter(|block| seen.insert(block.hash.as_str()))
        .collect();

    debug!(
        reported = blocks.len(),
        existing = existing.len(),
        fresh = fresh.len(),
        "filtered known blocks"
    );
    Ok(fresh)
}
