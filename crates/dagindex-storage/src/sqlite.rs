//! SQLite storage backend for DagIndex.
//!
//! Persists blocks, DAG edges, transactions, block↔transaction linkage,
//! subnetworks and checkpoints to a single SQLite file. Uses `sqlx` with WAL
//! mode; each batch runs inside one SQLite transaction.
//!
//! # Usage
//! ```rust,no_run
//! use dagindex_storage::sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStorage::open("./dag.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStorage::in_memory().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//! - `blocks` — one row per block hash; `nonce` is the 8-byte little-endian nonce
//! - `block_parents` — DAG edges
//! - `transactions` — one row per transaction hash; `lock_time` as 8 bytes
//! - `transactions_blocks` — (transaction, block) pairs with the block-local index
//! - `subnetworks` — subnetwork string ID → numeric ID
//! - `checkpoints` — sync cursor per (network, indexer)
//!
//! Unsigned 64-bit counters (`blue_score`, `gas`) are stored as `INTEGER`
//! (signed 64-bit); values above `i64::MAX` do not occur on the node side.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use dagindex_core::checkpoint::{Checkpoint, CheckpointStore};
use dagindex_core::error::SyncError;
use dagindex_core::records::{
    BlockParentRecord, BlockRecord, RowId, StoreStats, StoredBlock, StoredTransaction,
    TransactionBlockRecord, TransactionRecord,
};
use dagindex_core::store::{DagStore, StoreTx};

/// Bound parameters per statement (SQLite ≥ 3.32 default limit).
const MAX_BIND_PARAMS: usize = 32_766;

fn storage_err(e: sqlx::Error) -> SyncError {
    SyncError::Storage(e.to_string())
}

const BLOCK_COLUMNS: &str = "id, block_hash, version, hash_merkle_root, accepted_id_merkle_root, \
     utxo_commitment, timestamp, bits, nonce, blue_score, is_chain_block, transaction_count, difficulty";

const TRANSACTION_COLUMNS: &str =
    "id, transaction_hash, transaction_id, lock_time, subnetwork_id, gas, payload, version";

/// SQLite-backed DAG storage.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./dag.db"`) or a full
    /// SQLite URL (`"sqlite:./dag.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, SyncError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(storage_err)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        info!(path, "SqliteStorage opened");
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Every connection to `sqlite::memory:` is its own database, so the pool
    /// is pinned to a single connection that never expires. All data is lost
    /// when the pool is dropped. Ideal for tests.
    pub async fn in_memory() -> Result<Self, SyncError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(storage_err)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create tables and enable WAL mode.
    async fn init_schema(&self) -> Result<(), SyncError> {
        // WAL mode — better concurrent read throughput
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        let statements = [
            "CREATE TABLE IF NOT EXISTS subnetworks (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                subnetwork_id TEXT    NOT NULL UNIQUE
            );",
            "CREATE TABLE IF NOT EXISTS blocks (
                id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                block_hash              TEXT    NOT NULL UNIQUE,
                version                 INTEGER NOT NULL,
                hash_merkle_root        TEXT    NOT NULL,
                accepted_id_merkle_root TEXT    NOT NULL,
                utxo_commitment         TEXT    NOT NULL,
                timestamp               INTEGER NOT NULL,
                bits                    INTEGER NOT NULL,
                nonce                   BLOB    NOT NULL,
                blue_score              INTEGER NOT NULL,
                is_chain_block          INTEGER NOT NULL,
                transaction_count       INTEGER NOT NULL,
                difficulty              REAL    NOT NULL
            );",
            "CREATE TABLE IF NOT EXISTS block_parents (
                block_id        INTEGER NOT NULL REFERENCES blocks (id),
                parent_block_id INTEGER NOT NULL REFERENCES blocks (id),
                PRIMARY KEY (block_id, parent_block_id)
            );",
            "CREATE TABLE IF NOT EXISTS transactions (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                transaction_hash TEXT    NOT NULL UNIQUE,
                transaction_id   TEXT    NOT NULL,
                lock_time        BLOB    NOT NULL,
                subnetwork_id    INTEGER NOT NULL REFERENCES subnetworks (id),
                gas              INTEGER NOT NULL,
                payload          BLOB    NOT NULL,
                version          INTEGER NOT NULL
            );",
            "CREATE TABLE IF NOT EXISTS transactions_blocks (
                transaction_id INTEGER NOT NULL REFERENCES transactions (id),
                block_id       INTEGER NOT NULL REFERENCES blocks (id),
                tx_index       INTEGER NOT NULL,
                PRIMARY KEY (transaction_id, block_id)
            );",
            "CREATE INDEX IF NOT EXISTS idx_transactions_blocks_block
                ON transactions_blocks (block_id, tx_index);",
            "CREATE INDEX IF NOT EXISTS idx_blocks_blue_score ON blocks (blue_score);",
            "CREATE TABLE IF NOT EXISTS checkpoints (
                network     TEXT    NOT NULL,
                indexer_id  TEXT    NOT NULL,
                low_hash    TEXT    NOT NULL,
                blue_score  INTEGER NOT NULL,
                updated_at  INTEGER NOT NULL,
                PRIMARY KEY (network, indexer_id)
            );",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
        }
        Ok(())
    }

    /// Register subnetwork IDs (insert if absent) and return their identifiers.
    pub async fn register_subnetworks(&self, subnetwork_ids: &[String]) -> Result<Vec<RowId>, SyncError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        for sid in subnetwork_ids {
            sqlx::query("INSERT OR IGNORE INTO subnetworks (subnetwork_id) VALUES (?)")
                .bind(sid)
                .execute(&mut *tx)
                .await
                .map_err(storage_err)?;
        }
        let rows = lookup_ids(&mut tx, "subnetworks", "subnetwork_id", subnetwork_ids).await?;
        tx.commit().await.map_err(storage_err)?;

        debug!(count = rows.len(), "subnetworks registered");
        Ok(rows)
    }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

/// `SELECT id, <key> FROM <table> WHERE <key> IN (...)`, chunked.
async fn lookup_ids(
    conn: &mut SqliteConnection,
    table: &str,
    key_column: &str,
    keys: &[String],
) -> Result<Vec<RowId>, SyncError> {
    let mut found = Vec::new();
    for chunk in keys.chunks(MAX_BIND_PARAMS) {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT id, {key_column} AS natural_key FROM {table} WHERE {key_column} IN ("
        ));
        let mut separated = qb.separated(", ");
        for key in chunk {
            separated.push_bind(key.as_str());
        }
        separated.push_unseparated(") ORDER BY id");

        let rows = qb.build().fetch_all(&mut *conn).await.map_err(storage_err)?;
        for row in rows {
            let key: String = row.try_get("natural_key").map_err(storage_err)?;
            let id: i64 = row.try_get("id").map_err(storage_err)?;
            found.push(RowId::new(key, id as u64));
        }
    }
    Ok(found)
}

fn block_from_row(row: &SqliteRow) -> Result<StoredBlock, SyncError> {
    let millis: i64 = row.try_get("timestamp").map_err(storage_err)?;
    let timestamp = DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| SyncError::Storage(format!("stored timestamp {millis} out of range")))?;

    Ok(StoredBlock {
        id: row.try_get::<i64, _>("id").map_err(storage_err)? as u64,
        record: BlockRecord {
            block_hash: row.try_get("block_hash").map_err(storage_err)?,
            version: row.try_get("version").map_err(storage_err)?,
            hash_merkle_root: row.try_get("hash_merkle_root").map_err(storage_err)?,
            accepted_id_merkle_root: row.try_get("accepted_id_merkle_root").map_err(storage_err)?,
            utxo_commitment: row.try_get("utxo_commitment").map_err(storage_err)?,
            timestamp,
            bits: row.try_get::<i64, _>("bits").map_err(storage_err)? as u32,
            nonce: row.try_get("nonce").map_err(storage_err)?,
            blue_score: row.try_get::<i64, _>("blue_score").map_err(storage_err)? as u64,
            transaction_count: row.try_get::<i64, _>("transaction_count").map_err(storage_err)? as u32,
            difficulty: row.try_get("difficulty").map_err(storage_err)?,
            is_chain_block: row.try_get("is_chain_block").map_err(storage_err)?,
        },
    })
}

fn transaction_from_row(row: &SqliteRow) -> Result<StoredTransaction, SyncError> {
    Ok(StoredTransaction {
        id: row.try_get::<i64, _>("id").map_err(storage_err)? as u64,
        record: TransactionRecord {
            transaction_hash: row.try_get("transaction_hash").map_err(storage_err)?,
            transaction_id: row.try_get("transaction_id").map_err(storage_err)?,
            lock_time: row.try_get("lock_time").map_err(storage_err)?,
            subnetwork_id: row.try_get::<i64, _>("subnetwork_id").map_err(storage_err)? as u64,
            gas: row.try_get::<i64, _>("gas").map_err(storage_err)? as u64,
            payload: row.try_get("payload").map_err(storage_err)?,
            version: row.try_get("version").map_err(storage_err)?,
        },
    })
}

fn link_from_row(row: &SqliteRow) -> Result<TransactionBlockRecord, SyncError> {
    Ok(TransactionBlockRecord {
        block_id: row.try_get::<i64, _>("block_id").map_err(storage_err)? as u64,
        transaction_id: row.try_get::<i64, _>("transaction_id").map_err(storage_err)? as u64,
        index: row.try_get::<i64, _>("tx_index").map_err(storage_err)? as u32,
    })
}

// ─── DagStore impl ───────────────────────────────────────────────────────────

#[async_trait]
impl DagStore for SqliteStorage {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, SyncError> {
        let tx = self.pool.begin().await.map_err(storage_err)?;
        Ok(Box::new(SqliteTx { tx }))
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<StoredBlock>, SyncError> {
        let row = sqlx::query(&format!("SELECT {BLOCK_COLUMNS} FROM blocks WHERE block_hash = ?"))
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(block_from_row).transpose()
    }

    async fn block_by_id(&self, id: u64) -> Result<Option<StoredBlock>, SyncError> {
        let row = sqlx::query(&format!("SELECT {BLOCK_COLUMNS} FROM blocks WHERE id = ?"))
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(block_from_row).transpose()
    }

    async fn parent_ids(&self, block_id: u64) -> Result<Vec<u64>, SyncError> {
        let rows = sqlx::query(
            "SELECT parent_block_id FROM block_parents WHERE block_id = ? ORDER BY parent_block_id",
        )
        .bind(block_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter()
            .map(|r| {
                r.try_get::<i64, _>("parent_block_id")
                    .map(|id| id as u64)
                    .map_err(storage_err)
            })
            .collect()
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<StoredTransaction>, SyncError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE transaction_hash = ?"
        ))
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn block_transactions(&self, block_id: u64) -> Result<Vec<TransactionBlockRecord>, SyncError> {
        let rows = sqlx::query(
            "SELECT block_id, transaction_id, tx_index FROM transactions_blocks
             WHERE block_id = ? ORDER BY tx_index",
        )
        .bind(block_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.iter().map(link_from_row).collect()
    }

    async fn set_chain_membership(&self, block_ids: &[u64], is_chain_block: bool) -> Result<(), SyncError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        for chunk in block_ids.chunks(MAX_BIND_PARAMS - 1) {
            let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE blocks SET is_chain_block = ");
            qb.push_bind(is_chain_block);
            qb.push(" WHERE id IN (");
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id as i64);
            }
            separated.push_unseparated(")");
            qb.build().execute(&mut *tx).await.map_err(storage_err)?;
        }
        tx.commit().await.map_err(storage_err)?;

        debug!(blocks = block_ids.len(), is_chain_block, "chain membership updated");
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, SyncError> {
        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM blocks)              AS blocks,
                (SELECT COUNT(*) FROM block_parents)       AS block_parents,
                (SELECT COUNT(*) FROM transactions)        AS transactions,
                (SELECT COUNT(*) FROM transactions_blocks) AS transaction_blocks,
                (SELECT COUNT(*) FROM subnetworks)         AS subnetworks",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        let count = |column: &str| -> Result<u64, SyncError> {
            row.try_get::<i64, _>(column).map(|n| n as u64).map_err(storage_err)
        };
        Ok(StoreStats {
            blocks: count("blocks")?,
            block_parents: count("block_parents")?,
            transactions: count("transactions")?,
            transaction_blocks: count("transaction_blocks")?,
            subnetworks: count("subnetworks")?,
        })
    }
}

// ─── SqliteTx ────────────────────────────────────────────────────────────────

/// One batch's SQLite transaction. Dropping it without commit rolls back.
pub struct SqliteTx {
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn existing_block_hashes(&mut self, hashes: &[String]) -> Result<Vec<String>, SyncError> {
        let rows = lookup_ids(&mut self.tx, "blocks", "block_hash", hashes).await?;
        Ok(rows.into_iter().map(|row| row.key).collect())
    }

    async fn blocks_by_hashes(&mut self, hashes: &[String]) -> Result<Vec<RowId>, SyncError> {
        lookup_ids(&mut self.tx, "blocks", "block_hash", hashes).await
    }

    async fn transactions_by_hashes(&mut self, hashes: &[String]) -> Result<Vec<RowId>, SyncError> {
        lookup_ids(&mut self.tx, "transactions", "transaction_hash", hashes).await
    }

    async fn subnetworks_by_ids(&mut self, subnetwork_ids: &[String]) -> Result<Vec<RowId>, SyncError> {
        lookup_ids(&mut self.tx, "subnetworks", "subnetwork_id", subnetwork_ids).await
    }

    async fn transaction_blocks_for(
        &mut self,
        block_ids: &[u64],
    ) -> Result<Vec<TransactionBlockRecord>, SyncError> {
        let mut links = Vec::new();
        for chunk in block_ids.chunks(MAX_BIND_PARAMS) {
            let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
                "SELECT block_id, transaction_id, tx_index FROM transactions_blocks WHERE block_id IN (",
            );
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id as i64);
            }
            separated.push_unseparated(")");

            let rows = qb.build().fetch_all(&mut *self.tx).await.map_err(storage_err)?;
            for row in &rows {
                links.push(link_from_row(row)?);
            }
        }
        Ok(links)
    }

    async fn insert_blocks(&mut self, blocks: &[BlockRecord]) -> Result<(), SyncError> {
        for chunk in blocks.chunks(MAX_BIND_PARAMS / 12) {
            let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
                "INSERT INTO blocks (block_hash, version, hash_merkle_root, accepted_id_merkle_root, \
                 utxo_commitment, timestamp, bits, nonce, blue_score, is_chain_block, \
                 transaction_count, difficulty) ",
            );
            qb.push_values(chunk, |mut b, block| {
                b.push_bind(block.block_hash.as_str())
                    .push_bind(block.version)
                    .push_bind(block.hash_merkle_root.as_str())
                    .push_bind(block.accepted_id_merkle_root.as_str())
                    .push_bind(block.utxo_commitment.as_str())
                    .push_bind(block.timestamp.timestamp_millis())
                    .push_bind(block.bits as i64)
                    .push_bind(block.nonce.as_slice())
                    .push_bind(block.blue_score as i64)
                    .push_bind(block.is_chain_block)
                    .push_bind(block.transaction_count as i64)
                    .push_bind(block.difficulty);
            });
            qb.build().execute(&mut *self.tx).await.map_err(storage_err)?;
        }
        debug!(count = blocks.len(), "blocks inserted");
        Ok(())
    }

    async fn insert_block_parents(&mut self, edges: &[BlockParentRecord]) -> Result<(), SyncError> {
        for chunk in edges.chunks(MAX_BIND_PARAMS / 2) {
            let mut qb: QueryBuilder<'_, Sqlite> =
                QueryBuilder::new("INSERT INTO block_parents (block_id, parent_block_id) ");
            qb.push_values(chunk, |mut b, edge| {
                b.push_bind(edge.block_id as i64)
                    .push_bind(edge.parent_block_id as i64);
            });
            qb.build().execute(&mut *self.tx).await.map_err(storage_err)?;
        }
        Ok(())
    }

    async fn insert_transactions(&mut self, transactions: &[TransactionRecord]) -> Result<(), SyncError> {
        for chunk in transactions.chunks(MAX_BIND_PARAMS / 7) {
            let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
                "INSERT INTO transactions (transaction_hash, transaction_id, lock_time, \
                 subnetwork_id, gas, payload, version) ",
            );
            qb.push_values(chunk, |mut b, transaction| {
                b.push_bind(transaction.transaction_hash.as_str())
                    .push_bind(transaction.transaction_id.as_str())
                    .push_bind(transaction.lock_time.as_slice())
                    .push_bind(transaction.subnetwork_id as i64)
                    .push_bind(transaction.gas as i64)
                    .push_bind(transaction.payload.as_slice())
                    .push_bind(transaction.version);
            });
            qb.build().execute(&mut *self.tx).await.map_err(storage_err)?;
        }
        debug!(count = transactions.len(), "transactions inserted");
        Ok(())
    }

    async fn insert_transaction_blocks(
        &mut self,
        links: &[TransactionBlockRecord],
    ) -> Result<(), SyncError> {
        for chunk in links.chunks(MAX_BIND_PARAMS / 3) {
            let mut qb: QueryBuilder<'_, Sqlite> =
                QueryBuilder::new("INSERT INTO transactions_blocks (transaction_id, block_id, tx_index) ");
            qb.push_values(chunk, |mut b, link| {
                b.push_bind(link.transaction_id as i64)
                    .push_bind(link.block_id as i64)
                    .push_bind(link.index as i64);
            });
            qb.build().execute(&mut *self.tx).await.map_err(storage_err)?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), SyncError> {
        self.tx.commit().await.map_err(storage_err)
    }

    async fn rollback(self: Box<Self>) -> Result<(), SyncError> {
        self.tx.rollback().await.map_err(storage_err)
    }
}

// ─── CheckpointStore impl ────────────────────────────────────────────────────

#[async_trait]
impl CheckpointStore for SqliteStorage {
    async fn load(&self, network: &str, indexer_id: &str) -> Result<Option<Checkpoint>, SyncError> {
        let row = sqlx::query(
            "SELECT network, indexer_id, low_hash, blue_score, updated_at
             FROM checkpoints WHERE network = ? AND indexer_id = ?",
        )
        .bind(network)
        .bind(indexer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(|r| -> Result<Checkpoint, SyncError> {
            Ok(Checkpoint {
                network: r.try_get("network").map_err(storage_err)?,
                indexer_id: r.try_get("indexer_id").map_err(storage_err)?,
                low_hash: r.try_get("low_hash").map_err(storage_err)?,
                blue_score: r.try_get::<i64, _>("blue_score").map_err(storage_err)? as u64,
                updated_at: r.try_get("updated_at").map_err(storage_err)?,
            })
        })
        .transpose()
    }

    async fn save(&self, checkpoint: Checkpoint) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT OR REPLACE INTO checkpoints
             (network, indexer_id, low_hash, blue_score, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&checkpoint.network)
        .bind(&checkpoint.indexer_id)
        .bind(&checkpoint.low_hash)
        .bind(checkpoint.blue_score as i64)
        .bind(checkpoint.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(
            network = %checkpoint.network,
            indexer_id = %checkpoint.indexer_id,
            low_hash = %checkpoint.low_hash,
            "checkpoint saved"
        );
        Ok(())
    }

    async fn delete(&self, network: &str, indexer_id: &str) -> Result<(), SyncError> {
        sqlx::query("DELETE FROM checkpoints WHERE network = ? AND indexer_id = ?")
            .bind(network)
            .bind(indexer_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn block(hash: &str) -> BlockRecord {
        BlockRecord {
            block_hash: hash.into(),
            version: 1,
            hash_merkle_root: "hmr".into(),
            accepted_id_merkle_root: "aidmr".into(),
            utxo_commitment: "utxo".into(),
            timestamp: DateTime::from_timestamp_millis(1_600_000_000_123).unwrap(),
            bits: 0x207f_ffff,
            nonce: u64::MAX.to_le_bytes().to_vec(),
            blue_score: 7,
            transaction_count: 0,
            difficulty: 2.5,
            is_chain_block: false,
        }
    }

    // ── CheckpointStore ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn checkpoint_upsert() {
        let store = SqliteStorage::in_memory().await.unwrap();

        let mut cp = Checkpoint {
            network: "kaspa-mainnet".into(),
            indexer_id: "explorer".into(),
            low_hash: "old".into(),
            blue_score: 100,
            updated_at: Utc::now().timestamp(),
        };
        store.save(cp.clone()).await.unwrap();
        cp.low_hash = "new".into();
        cp.blue_score = 200;
        store.save(cp).await.unwrap();

        let loaded = store.load("kaspa-mainnet", "explorer").await.unwrap().unwrap();
        assert_eq!(loaded.low_hash, "new");
        assert_eq!(loaded.blue_score, 200);

        store.delete("kaspa-mainnet", "explorer").await.unwrap();
        assert!(store.load("kaspa-mainnet", "explorer").await.unwrap().is_none());
    }

    // ── Blocks ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn block_roundtrip_preserves_fields() {
        let store = SqliteStorage::in_memory().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_blocks(&[block("a")]).await.unwrap();
        tx.commit().await.unwrap();

        let stored = store.block_by_hash("a").await.unwrap().unwrap();
        assert_eq!(stored.record, block("a"));
        assert_eq!(store.block_by_id(stored.id).await.unwrap().unwrap().record.block_hash, "a");
        assert!(store.block_by_hash("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = SqliteStorage::in_memory().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_blocks(&[block("a")]).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.stats().await.unwrap().blocks, 0);
    }

    #[tokio::test]
    async fn duplicate_block_hash_violates_unique() {
        let store = SqliteStorage::in_memory().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_blocks(&[block("a")]).await.unwrap();
        let err = tx.insert_blocks(&[block("a")]).await.unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)));
        assert!(err.to_string().contains("UNIQUE"));
    }

    #[tokio::test]
    async fn chain_membership_update() {
        let store = SqliteStorage::in_memory().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_blocks(&[block("a"), block("b")]).await.unwrap();
        let ids = tx.blocks_by_hashes(&["a".into(), "b".into()]).await.unwrap();
        tx.commit().await.unwrap();

        store.set_chain_membership(&[ids[1].id], true).await.unwrap();
        assert!(!store.block_by_hash("a").await.unwrap().unwrap().record.is_chain_block);
        assert!(store.block_by_hash("b").await.unwrap().unwrap().record.is_chain_block);
    }

    #[tokio::test]
    async fn subnetworks_register_once() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let first = store.register_subnetworks(&["native".into()]).await.unwrap();
        let again = store.register_subnetworks(&["native".into(), "coinbase".into()]).await.unwrap();

        assert_eq!(again.len(), 2);
        assert_eq!(again.iter().find(|r| r.key == "native").unwrap().id, first[0].id);
        assert_eq!(store.stats().await.unwrap().subnetworks, 2);
    }
}
