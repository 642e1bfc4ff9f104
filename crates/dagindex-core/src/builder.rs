//! Fluent builder API for sync configuration.
//!
//! # Example
//!
//! ```rust
//! use dagindex_core::SyncBuilder;
//!
//! let config = SyncBuilder::new()
//!     .network("kaspa-testnet")
//!     .batch_timeout_ms(30_000)
//!     .follow(true)
//!     .build_config();
//! assert!(config.follow);
//! ```

use crate::config::SyncConfig;

/// Fluent builder for `SyncConfig`.
#[derive(Default)]
pub struct SyncBuilder {
    config: SyncConfig,
}

impl SyncBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    /// Set the syncer ID (used for checkpoint keys).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.config.network = network.into();
        self
    }

    /// Roll back any batch that takes longer than `ms`.
    pub fn batch_timeout_ms(mut self, ms: u64) -> Self {
        self.config.batch_timeout_ms = Some(ms);
        self
    }

    /// Set checkpoint save interval (every N committed batches).
    pub fn checkpoint_interval(mut self, n: u64) -> Self {
        self.config.checkpoint_interval = n;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Keep polling for new blocks after catching up.
    pub fn follow(mut self, follow: bool) -> Self {
        self.config.follow = follow;
        self
    }

    pub fn build_config(self) -> SyncConfig {
        self.config
    }
}
