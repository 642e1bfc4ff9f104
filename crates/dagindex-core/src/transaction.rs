//! Transaction materializer — collapses every transaction of a batch to one
//! row per hash, inserts the unknown ones and resolves all identifiers.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::decode::{decode_hex_bytes, parse_hex_u64, u64_to_bytes};
use crate::error::SyncError;
use crate::records::TransactionRecord;
use crate::store::StoreTx;
use crate::types::{VerboseBlock, VerboseTransaction};

/// A transaction hash resolved to its persisted identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTransaction {
    pub id: u64,
    /// `true` if this batch created the row. Downstream work that must run
    /// once per transaction keys off this flag.
    pub is_new: bool,
}

/// Unique transactions of `blocks` in first-occurrence order.
///
/// Reports of the same hash are expected to be identical; the first one wins.
pub fn unique_transactions<'a>(blocks: &[&'a VerboseBlock]) -> Vec<&'a VerboseTransaction> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for &block in blocks {
        for transaction in &block.transactions {
            if seen.insert(transaction.hash.as_str()) {
                unique.push(transaction);
            }
        }
    }
    unique
}

/// Convert one reported transaction into its persisted shape.
pub fn materialize_transaction(
    transaction: &VerboseTransaction,
    subnetwork_ids: &HashMap<String, u64>,
) -> Result<TransactionRecord, SyncError> {
    let payload = decode_hex_bytes(&transaction.payload)
        .map_err(|e| SyncError::decode(&transaction.hash, "payload", e))?;

    let lock_time = parse_hex_u64(&transaction.lock_time)
        .map_err(|e| SyncError::decode(&transaction.hash, "lock_time", e))?;

    let subnetwork_id = *subnetwork_ids.get(&transaction.subnetwork_id).ok_or_else(|| {
        SyncError::UnresolvedSubnetwork {
            subnetwork_id: transaction.subnetwork_id.clone(),
            transaction_hash: transaction.hash.clone(),
        }
    })?;

    Ok(TransactionRecord {
        transaction_hash: transaction.hash.clone(),
        transaction_id: transaction.transaction_id.clone(),
        lock_time: u64_to_bytes(lock_time),
        subnetwork_id,
        gas: transaction.gas,
        payload,
        version: transaction.version,
    })
}

/// Insert the batch's unknown transactions and resolve every hash.
///
/// Existing rows are reused; new rows are inserted and read back. A read-back
/// count that differs from the insert count is a [`SyncError::PartialInsert`]:
/// another writer raced on the same hashes, or the store lost rows.
pub async fn insert_transactions(
    tx: &mut dyn StoreTx,
    blocks: &[&VerboseBlock],
) -> Result<HashMap<String, ResolvedTransaction>, SyncError> {
    let unique = unique_transactions(blocks);
    let hashes: Vec<String> = unique.iter().map(|t| t.hash.clone()).collect();

    let mut resolved: HashMap<String, ResolvedTransaction> = tx
        .transactions_by_hashes(&hashes)
        .await?
        .into_iter()
        .map(|row| (row.key, ResolvedTransaction { id: row.id, is_new: false }))
        .collect();

    let fresh: Vec<&VerboseTransaction> = unique
        .into_iter()
        .filter(|t| !resolved.contains_key(&t.hash))
        .collect();

    debug!(
        unique = hashes.len(),
        existing = resolved.len(),
        fresh = fresh.len(),
        "resolved known transactions"
    );

    if fresh.is_empty() {
        return Ok(resolved);
    }

    let wanted_subnetworks: Vec<String> = fresh
        .iter()
        .map(|t| t.subnetwork_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let subnetwork_ids: HashMap<String, u64> = tx
        .subnetworks_by_ids(&wanted_subnetworks)
        .await?
        .into_iter()
        .map(|row| (row.key, row.id))
        .collect();

    let records = fresh
        .iter()
        .map(|t| materialize_transaction(t, &subnetwork_ids))
        .collect::<Result<Vec<_>, _>>()?;
    tx.insert_transactions(&records).await?;

    let new_hashes: Vec<String> = records.into_iter().map(|r| r.transaction_hash).collect();
    let inserted = tx.transactions_by_hashes(&new_hashes).await?;
    if inserted.len() != new_hashes.len() {
        return Err(SyncError::PartialInsert {
            table: "transactions",
            expected: new_hashes.len(),
            inserted: inserted.len(),
        });
    }

    for row in inserted {
        resolved.insert(row.key, ResolvedTransaction { id: row.id, is_new: true });
    }
    Ok(resolved)
}
