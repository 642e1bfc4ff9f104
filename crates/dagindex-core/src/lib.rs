//! dagindex-core — ingestion pipeline that persists a node's block DAG into a
//! relational store.
//!
//! # Architecture
//!
//! ```text
//! SyncLoop
//!   ├── BatchSource          (node fetch, external)
//!   ├── BatchIngestor        (one atomic unit of work per batch)
//!   │     ├── existence      (skip blocks already persisted)
//!   │     ├── block          (block rows + DAG edges, chain-flag seeding)
//!   │     ├── identity       (hash → block ID, incomplete-reference check)
//!   │     ├── transaction    (dedup across blocks, subnetwork resolution)
//!   │     └── linkage        (block ↔ transaction rows with block-local index)
//!   ├── ChainResolver        (post-commit, external)
//!   └── CheckpointManager    (sync cursor)
//! ```
//!
//! Storage backends implementing [`DagStore`] live in `dagindex-storage`.

pub mod block;
pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod decode;
pub mod error;
pub mod existence;
pub mod identity;
pub mod ingest;
pub mod linkage;
pub mod records;
pub mod store;
pub mod sync;
pub mod transaction;
pub mod types;

pub use builder::SyncBuilder;
pub use checkpoint::{Checkpoint, CheckpointManager, CheckpointStore, MemoryCheckpointStore};
pub use config::{SyncConfig, SyncState};
pub use error::SyncError;
pub use ingest::{BatchIngestor, IngestReport, IngestStage};
pub use records::{
    BlockParentRecord, BlockRecord, RowId, StoreStats, StoredBlock, StoredTransaction,
    TransactionBlockRecord, TransactionRecord,
};
pub use store::{DagStore, StoreTx};
pub use sync::{BatchSource, ChainResolver, SyncLoop};
pub use transaction::ResolvedTransaction;
pub use types::{BlockBatch, TransactionInput, TransactionOutput, VerboseBlock, VerboseTransaction};
