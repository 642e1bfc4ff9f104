//! Error types for the dagindex ingestion pipeline.

use thiserror::Error;

/// Errors that can occur while ingesting or syncing block batches.
///
/// Every variant aborts the current batch; the unit of work is rolled back
/// before the error reaches the caller.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A reported field could not be decoded (bad hex, out-of-range value).
    #[error("Decode error in {field} of {hash}: {reason}")]
    Decode {
        hash: String,
        field: &'static str,
        reason: String,
    },

    /// Some block hashes (self or parent) have no persisted identifier.
    #[error("Incomplete reference: resolved {found} of {expected} block IDs (missing: {missing:?})")]
    IncompleteReference {
        expected: usize,
        found: usize,
        missing: Vec<String>,
    },

    #[error("Couldn't find ID for subnetwork {subnetwork_id} (transaction {transaction_hash})")]
    UnresolvedSubnetwork {
        subnetwork_id: String,
        transaction_hash: String,
    },

    /// The store persisted fewer rows than were requested.
    #[error("Partial insert into {table}: requested {expected}, read back {inserted}")]
    PartialInsert {
        table: &'static str,
        expected: usize,
        inserted: usize,
    },

    /// A block references a transaction that was never resolved.
    #[error("Dangling reference: block {block_hash} lists unresolved transaction {transaction_hash}")]
    DanglingReference {
        block_hash: String,
        transaction_hash: String,
    },

    #[error("Malformed batch: {0}")]
    MalformedBatch(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Batch timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The upstream fetch collaborator failed.
    #[error("Source error: {0}")]
    Source(String),

    /// The post-commit chain resolver failed.
    #[error("Chain resolver error: {0}")]
    Resolver(String),

    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Returns `true` if the whole batch can be resubmitted as-is.
    ///
    /// Decode, reference and partial-insert failures fail identically on
    /// retry until the data or the ingestion order is fixed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Timeout { .. } | Self::Source(_)
        )
    }

    /// Returns `true` if the error came from a malformed reported field.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    pub(crate) fn decode(
        hash: impl Into<String>,
        field: &'static str,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::Decode {
            hash: hash.into(),
            field,
            reason: reason.to_string(),
        }
    }
}
