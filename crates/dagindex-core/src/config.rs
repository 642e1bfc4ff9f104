//! Sync configuration and state types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a sync instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Unique name for this syncer (used for checkpoint keys).
    pub id: String,
    /// Network the node serves (e.g. `"kaspa-mainnet"`).
    pub network: String,
    /// Deadline for one batch's unit of work. `None` = no deadline.
    pub batch_timeout_ms: Option<u64>,
    /// Save a checkpoint every N committed batches.
    pub checkpoint_interval: u64,
    /// Poll interval once caught up, in follow mode (milliseconds).
    pub poll_interval_ms: u64,
    /// Keep polling after catching up instead of stopping.
    pub follow: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            id: "default".into(),
            network: "kaspa-mainnet".into(),
            batch_timeout_ms: None,
            checkpoint_interval: 1,
            poll_interval_ms: 1000,
            follow: false,
        }
    }
}

impl SyncConfig {
    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_ms.map(Duration::from_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Runtime state of the sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// Not yet started.
    Idle,
    /// Ingesting windows that still contain unknown blocks.
    Syncing,
    /// Caught up and polling for new blocks.
    Live,
    /// Terminated.
    Stopped,
    /// Encountered an unrecoverable error.
    Error,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Syncing => write!(f, "syncing"),
            Self::Live => write!(f, "live"),
            Self::Stopped => write!(f, "stopped"),
            Self::Error => write!(f, "error"),
        }
    }
}
