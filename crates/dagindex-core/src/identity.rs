//! Identity resolver — maps reported block hashes to surrogate keys.

use std::collections::{BTreeSet, HashMap};

use crate::error::SyncError;
use crate::store::StoreTx;
use crate::types::VerboseBlock;

/// Every hash a batch touches: its own blocks and all parents they cite.
pub fn referenced_block_hashes(blocks: &[VerboseBlock]) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    for block in blocks {
        set.insert(block.hash.clone());
        set.extend(block.parent_hashes.iter().cloned());
    }
    set
}

/// Resolve the identifier of every hash in `hashes`.
///
/// Fails with [`SyncError::IncompleteReference`] if any hash has no block
/// row. That means an ancestor was never ingested; retrying the same batch
/// fails the same way until the missing ancestor is ingested first.
pub async fn resolve_block_ids(
    tx: &mut dyn StoreTx,
    hashes: &BTreeSet<String>,
) -> Result<HashMap<String, u64>, SyncError> {
    let wanted: Vec<String> = hashes.iter().cloned().collect();
    let rows = tx.blocks_by_hashes(&wanted).await?;

    let ids: HashMap<String, u64> = rows.into_iter().map(|row| (row.key, row.id)).collect();
    if ids.len() != hashes.len() {
        let missing = hashes
            .iter()
            .filter(|h| !ids.contains_key(h.as_str()))
            .cloned()
            .collect();
        return Err(SyncError::IncompleteReference {
            expected: hashes.len(),
            found: ids.len(),
            missing,
        });
    }
    Ok(ids)
}
