//! dagindex CLI — ingest block batches and inspect the store.
//!
//! # Commands
//! ```
//! dagindex ingest --db ./dag.db --file batch.json [--config sync.json] [--timeout-ms 5000] [--subnetwork <id>]... [--json-logs]
//! dagindex stats  --db ./dag.db
//! dagindex info
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dagindex_core::{BatchIngestor, BlockBatch, DagStore, SyncConfig};
use dagindex_storage::SqliteStorage;

/// Subnetwork of plain value transfers; registered on every ingest.
const NATIVE_SUBNETWORK: &str = "0000000000000000000000000000000000000000";

#[derive(Parser)]
#[command(
    name = "dagindex",
    about = "Atomic block-DAG batch ingestion into a relational store",
    long_about = "
DagIndex CLI: persist a node's block DAG, transactions and their block-local
ordering into SQLite, one all-or-nothing batch at a time.

ENVIRONMENT VARIABLES:
  RUST_LOG    Log filter (default: info)
",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one JSON block batch into a SQLite database
    Ingest {
        /// Path to the SQLite database (created if missing)
        #[arg(long)]
        db: String,
        /// Path to the batch JSON (`blockHashes` + `blockVerboseData`)
        #[arg(long)]
        file: String,
        /// Sync configuration JSON; flags override it
        #[arg(long)]
        config: Option<String>,
        /// Abort and roll back the batch after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Extra subnetwork IDs to register (the native one always is)
        #[arg(long = "subnetwork")]
        subnetworks: Vec<String>,
        /// Emit JSON structured logs
        #[arg(long)]
        json_logs: bool,
    },

    /// Print row counts per table
    Stats {
        /// Path to the SQLite database
        #[arg(long)]
        db: String,
    },

    /// Show DagIndex configuration info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            db,
            file,
            config,
            timeout_ms,
            subnetworks,
            json_logs,
        } => {
            init_tracing(json_logs);
            cmd_ingest(&db, &file, config.as_deref(), timeout_ms, subnetworks).await
        }
        Commands::Stats { db } => cmd_stats(&db).await,
        Commands::Info => {
            cmd_info();
            Ok(())
        }
    }
}

fn cmd_info() {
    let defaults = SyncConfig::default();
    println!("DagIndex v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default network: {}", defaults.network);
    println!("  Default checkpoint interval: every {} batch(es)", defaults.checkpoint_interval);
    println!("  Default poll interval: {}ms", defaults.poll_interval_ms);
    println!("  Batch deadline: none unless configured");
    println!("  Storage backends: memory, SQLite (feature: sqlite)");
    println!("  Native subnetwork: {NATIVE_SUBNETWORK}");
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

fn load_config(path: Option<&str>) -> Result<SyncConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config {path}"))
        }
        None => Ok(SyncConfig::default()),
    }
}

async fn cmd_ingest(
    db: &str,
    file: &str,
    config: Option<&str>,
    timeout_ms: Option<u64>,
    extra_subnetworks: Vec<String>,
) -> Result<()> {
    let config = load_config(config)?;

    let raw = std::fs::read_to_string(file).with_context(|| format!("reading batch {file}"))?;
    let batch: BlockBatch =
        serde_json::from_str(&raw).with_context(|| format!("parsing batch {file}"))?;

    let storage = SqliteStorage::open(db).await?;
    let mut subnetworks = vec![NATIVE_SUBNETWORK.to_string()];
    subnetworks.extend(extra_subnetworks);
    storage.register_subnetworks(&subnetworks).await?;

    let mut ingestor = BatchIngestor::new(Arc::new(storage));
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .or_else(|| config.batch_timeout());
    if let Some(limit) = timeout {
        ingestor = ingestor.with_timeout(limit);
    }

    info!(network = %config.network, file, blocks = batch.blocks.len(), "Ingesting batch");
    let report = ingestor.ingest(&batch).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_stats(db: &str) -> Result<()> {
    let storage = SqliteStorage::open(db).await?;
    let stats = storage.stats().await?;
    println!("blocks:              {}", stats.blocks);
    println!("block_parents:       {}", stats.block_parents);
    println!("transactions:        {}", stats.transactions);
    println!("transactions_blocks: {}", stats.transaction_blocks);
    println!("subnetworks:         {}", stats.subnetworks);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ingest_collects_repeated_subnetworks() {
        let cli = Cli::try_parse_from([
            "dagindex", "ingest", "--db", "dag.db", "--file", "b.json", "--subnetwork", "aa",
            "--subnetwork", "bb", "--timeout-ms", "250", "--json-logs",
        ])
        .unwrap();

        match cli.command {
            Commands::Ingest { db, file, config, timeout_ms, subnetworks, json_logs } => {
                assert_eq!(db, "dag.db");
                assert_eq!(file, "b.json");
                assert_eq!(config, None);
                assert_eq!(subnetworks, vec!["aa", "bb"]);
                assert_eq!(timeout_ms, Some(250));
                assert!(json_logs);
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn rejects_unknown_and_incomplete_options() {
        assert!(Cli::try_parse_from(["dagindex", "ingest", "--db", "dag.db", "--verbose"]).is_err());
        assert!(Cli::try_parse_from(["dagindex", "ingest", "--file", "b.json"]).is_err());
        assert!(Cli::try_parse_from(["dagindex", "stats", "--db"]).is_err());
        assert!(Cli::try_parse_from([
            "dagindex", "ingest", "--db", "d", "--file", "f", "--timeout-ms", "soon",
        ])
        .is_err());
    }

    #[test]
    fn stats_requires_db() {
        let cli = Cli::try_parse_from(["dagindex", "stats", "--db", "dag.db"]).unwrap();
        assert!(matches!(cli.command, Commands::Stats { db } if db == "dag.db"));
    }

    #[test]
    fn missing_config_path_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), SyncConfig::default());
    }
}
