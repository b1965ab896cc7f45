//! Command-line and environment configuration for the server binary.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use memkv_core::{StoreConfig, StoreKind};

use crate::network::NetworkConfig;

/// Store backend selectable from the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Map behind one read/write lock, with optional batch rollback.
    WriteOptimized,
    /// Bounded store that evicts the least recently used key.
    Lru,
    /// Hash-partitioned map with per-shard locking.
    Sharded,
}

impl From<Backend> for StoreKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::WriteOptimized => StoreKind::WriteOptimized,
            Backend::Lru => StoreKind::Lru,
            Backend::Sharded => StoreKind::Sharded,
        }
    }
}

/// Log output format.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, one event per line.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// In-memory key-value store served over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "memkv-server", version)]
pub struct ServerArgs {
    /// Address to bind.
    #[arg(long, env = "MEMKV_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on; 0 picks a free one.
    #[arg(long, env = "MEMKV_PORT", default_value_t = 11200)]
    pub port: u16,

    /// Storage backend.
    #[arg(long, env = "MEMKV_BACKEND", value_enum, default_value_t = Backend::WriteOptimized)]
    pub backend: Backend,

    /// Maximum number of keys. Required by `lru`, optional for `write-optimized`.
    #[arg(long, env = "MEMKV_CAPACITY", default_value_t = 100)]
    pub capacity: usize,

    /// Lift the capacity bound of `write-optimized`.
    #[arg(long, env = "MEMKV_UNBOUNDED")]
    pub unbounded: bool,

    /// Restore the pre-batch state when a bulk update is cancelled.
    #[arg(
        long,
        env = "MEMKV_ROLLBACK",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub rollback: bool,

    /// Check for cancellation every N pairs of a bulk update.
    #[arg(long, env = "MEMKV_CHECK_INTERVAL", default_value_t = 1)]
    pub check_interval: usize,

    /// Shard count for the `sharded` backend.
    #[arg(long, env = "MEMKV_SHARDS", default_value_t = 32)]
    pub shards: usize,

    /// Deadline for one bulk update, in seconds.
    #[arg(long, env = "MEMKV_BATCH_TIMEOUT_SECS", default_value_t = 30)]
    pub batch_timeout_secs: u64,

    /// HTTP request timeout, in seconds.
    #[arg(long, env = "MEMKV_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Log output format.
    #[arg(long, env = "MEMKV_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl ServerArgs {
    /// Transport settings derived from the arguments.
    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            batch_timeout: Duration::from_secs(self.batch_timeout_secs),
            ..NetworkConfig::default()
        }
    }

    /// Store settings derived from the arguments.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        let capacity = if self.unbounded && self.backend == Backend::WriteOptimized {
            None
        } else {
            Some(self.capacity)
        };
        StoreConfig {
            kind: self.backend.into(),
            capacity,
            rollback: self.rollback,
            check_interval: self.check_interval,
            shard_count: self.shards,
        }
    }
}
