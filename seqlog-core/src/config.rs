// config.rs
//! Binlog queue configuration.
//!
//! `BinlogConfig` controls whether mutations are logged at all, how many
//! entries the retention window keeps, and how often the background purge
//! driver wakes up.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default retention capacity (number of entries kept in the oplog)
pub const DEFAULT_CAPACITY: u64 = 20_000_000;

/// Default purge driver wake-up interval, in milliseconds
pub const DEFAULT_PURGE_INTERVAL_MS: u64 = 250;

/// Configuration for a [`BinlogQueue`](crate::BinlogQueue)
///
/// # Examples
///
/// ```rust
/// use seqlog_core::BinlogConfig;
///
/// // Logging on, default retention
/// let config = BinlogConfig::default();
///
/// // Logging on, small retention window
/// let config = BinlogConfig::with_capacity(10_000);
///
/// // Logging administratively off: data writes pass through, no entries
/// // are recorded and the sequence counters stay frozen
/// let config = BinlogConfig::disabled();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinlogConfig {
    /// When false the queue records no log entries and starts no purge
    /// thread; data mutations still commit normally
    pub enabled: bool,

    /// Maximum number of retained entries; eviction triggers once
    /// `last_seq - min_seq` exceeds this
    pub capacity: u64,

    /// Wake-up interval of the background purge driver, in milliseconds
    pub purge_interval_ms: u64,
}

impl Default for BinlogConfig {
    fn default() -> Self {
        BinlogConfig {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            purge_interval_ms: DEFAULT_PURGE_INTERVAL_MS,
        }
    }
}

impl BinlogConfig {
    /// Logging enabled with an explicit retention capacity
    pub fn with_capacity(capacity: u64) -> Self {
        BinlogConfig {
            capacity,
            ..BinlogConfig::default()
        }
    }

    /// Logging administratively disabled (pure data pass-through)
    pub fn disabled() -> Self {
        BinlogConfig {
            enabled: false,
            ..BinlogConfig::default()
        }
    }

    /// Purge driver wake-up interval as a `Duration`
    pub fn purge_interval(&self) -> Duration {
        Duration::from_millis(self.purge_interval_ms)
    }
}
