//! Block materializer — reported block → `blocks` row candidate.

use std::collections::HashMap;

use chrono::DateTime;

use crate::decode::{parse_hex_u32, u64_to_bytes};
use crate::error::SyncError;
use crate::records::{BlockParentRecord, BlockRecord};
use crate::types::VerboseBlock;

/// Convert one reported block into its persisted shape.
///
/// The chain flag is seeded `true` only for the DAG root. Every other block
/// starts `false` and is flipped later by the chain resolver alone.
pub fn materialize_block(block: &VerboseBlock) -> Result<BlockRecord, SyncError> {
    let bits = parse_hex_u32(&block.bits).map_err(|e| SyncError::decode(&block.hash, "bits", e))?;

    let timestamp = DateTime::from_timestamp_millis(block.time).ok_or_else(|| {
        SyncError::decode(&block.hash, "time", format!("{} ms is out of range", block.time))
    })?;

    let transaction_count = u32::try_from(block.transactions.len())
        .map_err(|e| SyncError::decode(&block.hash, "transactions", e))?;

    Ok(BlockRecord {
        block_hash: block.hash.clone(),
        version: block.version,
        hash_merkle_root: block.hash_merkle_root.clone(),
        accepted_id_merkle_root: block.accepted_id_merkle_root.clone(),
        utxo_commitment: block.utxo_commitment.clone(),
        timestamp,
        bits,
        nonce: u64_to_bytes(block.nonce),
        blue_score: block.blue_score,
        transaction_count,
        difficulty: block.difficulty,
        is_chain_block: block.is_genesis(),
    })
}

/// Build the DAG edges of `blocks` from resolved identifiers.
pub fn parent_edges(
    blocks: &[&VerboseBlock],
    block_ids: &HashMap<String, u64>,
) -> Result<Vec<BlockParentRecord>, SyncError> {
    let lookup = |hash: &str| {
        block_ids
            .get(hash)
            .copied()
            .ok_or_else(|| SyncError::Other(format!("block {hash} has no resolved identifier")))
    };

    let mut edges = Vec::new();
    for block in blocks {
        let block_id = lookup(&block.hash)?;
        for parent in &block.parent_hashes {
            edges.push(BlockParentRecord {
                block_id,
                parent_block_id: lookup(parent)?,
            });
        }
    }
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::bytes_to_u64;

    fn block(hash: &str, parents: &[&str]) -> VerboseBlock {
        VerboseBlock {
            hash: hash.into(),
            version: 1,
            hash_merkle_root: "hmr".into(),
            accepted_id_merkle_root: "aidmr".into(),
            utxo_commitment: "utxo".into(),
            time: 1_600_000_000_123,
            bits: "207fffff".into(),
            nonce: u64::MAX,
            blue_score: 42,
            difficulty: 4.2,
            parent_hashes: parents.iter().map(|p| p.to_string()).collect(),
            transactions: vec![],
        }
    }

    #[test]
    fn genesis_is_seeded_as_chain_block() {
        let record = materialize_block(&block("g", &[])).unwrap();
        assert!(record.is_chain_block);

        let record = materialize_block(&block("b", &["g"])).unwrap();
        assert!(!record.is_chain_block);

        let record = materialize_block(&block("m", &["g", "b"])).unwrap();
        assert!(!record.is_chain_block);
    }

    #[test]
    fn fields_are_decoded() {
        let record = materialize_block(&block("b", &["g"])).unwrap();
        assert_eq!(record.bits, 0x207f_ffff);
        assert_eq!(record.nonce.len(), 8);
        assert_eq!(bytes_to_u64(&record.nonce), Some(u64::MAX));
        assert_eq!(record.timestamp.timestamp_millis(), 1_600_000_000_123);
        assert_eq!(record.transaction_count, 0);
        assert_eq!(record.blue_score, 42);
    }

    #[test]
    fn malformed_bits_fail() {
        let mut b = block("bad", &["g"]);
        b.bits = "not-hex".into();
        match materialize_block(&b) {
            Err(SyncError::Decode { hash, field, .. }) => {
                assert_eq!(hash, "bad");
                assert_eq!(field, "bits");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn edges_follow_parent_lists() {
        let b2 = block("b2", &["b1"]);
        let b3 = block("b3", &["b1", "b2"]);
        let ids: HashMap<String, u64> =
            [("b1", 1), ("b2", 2), ("b3", 3)].iter().map(|(h, i)| (h.to_string(), *i)).collect();

        let edges = parent_edges(&[&b2, &b3], &ids).unwrap();
        assert_eq!(
            edges,
            vec![
                BlockParentRecord { block_id: 2, parent_block_id: 1 },
                BlockParentRecord { block_id: 3, parent_block_id: 1 },
                BlockParentRecord { block_id: 3, parent_block_id: 2 },
            ]
        );
    }

    #[test]
    fn edge_to_unresolved_parent_is_named() {
        let b2 = block("b2", &["gone"]);
        let ids = HashMap::from([("b2".to_string(), 2)]);

        match parent_edges(&[&b2], &ids) {
            Err(SyncError::Other(message)) => assert!(message.contains("gone")),
            other => panic!("expected unresolved parent, got {other:?}"),
        }
    }
}
