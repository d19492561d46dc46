// binlog/queue.rs
//! The circular binlog queue
//!
//! Entries live in the storage engine's `Oplog` family keyed by their
//! big-endian sequence number. Capacity is enforced by range-deleting the
//! oldest entries, not by wrapping physical slots: conceptually a bounded
//! ring indexed by sequence number.
//!
//! All mutation goes through the [`Transaction`] guard returned by
//! [`BinlogQueue::transaction`], which holds the queue's single exclusive
//! writer lock. Read-side methods never take that lock; they rely on the
//! engine's consistent point reads and on atomic snapshots of the sequence
//! counters, which concurrent writers may be advancing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use crate::binlog::entry::{encode_seq, Binlog};
use crate::binlog::purge::PurgeDriver;
use crate::binlog::transaction::Transaction;
use crate::config::BinlogConfig;
use crate::error::Result;
use crate::log_debug;
use crate::storage::{BatchOp, ColumnFamily, StorageEngine};

/// Data and oplog operations staged between begin and commit/rollback
#[derive(Debug, Default)]
pub(crate) struct PendingBatch {
    pub(crate) ops: Vec<BatchOp>,
    /// Sequence counter as staged entries see it: `last_seq` plus the
    /// number of `add_log` calls in this batch. Published to `last_seq`
    /// only on a successful commit.
    pub(crate) tran_seq: u64,
}

/// Queue state shared with the transaction guard and the purge driver
pub(crate) struct QueueInner<S: StorageEngine> {
    pub(crate) engine: Arc<S>,
    /// The single exclusive writer lock; guards the pending batch
    pub(crate) pending: Mutex<PendingBatch>,
    /// Smallest retained sequence; advances only via eviction
    pub(crate) min_seq: AtomicU64,
    /// Highest committed sequence; advances only via committed `add_log`s
    pub(crate) last_seq: AtomicU64,
    pub(crate) capacity: u64,
    pub(crate) enabled: bool,
}

impl<S: StorageEngine> QueueInner<S> {
    /// One eviction pass
    ///
    /// Takes the writer lock, so no commit can interleave with the range
    /// delete. `min_seq` advances only after the delete succeeded; a
    /// failed pass leaves the window untouched and is retried later.
    pub(crate) fn purge_once(&self) -> Result<u64> {
        let _pending = self.pending.lock();

        let last = self.last_seq.load(Ordering::SeqCst);
        let min = self.min_seq.load(Ordering::SeqCst);
        let target = last.saturating_sub(self.capacity);
        if target <= min {
            return Ok(0);
        }

        let purge = [BatchOp::DeleteRange {
            cf: ColumnFamily::Oplog,
            from: encode_seq(min).to_vec(),
            to: encode_seq(target - 1).to_vec(),
        }];
        self.engine.write(&purge)?;
        self.min_seq.store(target, Ordering::SeqCst);

        Ok(target - min)
    }
}

/// The binlog queue: sequence bookkeeping, transactional writes, entry
/// lookup and bounded retention over a shared storage engine
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use seqlog_core::{BinlogConfig, BinlogQueue, MemoryEngine};
///
/// # fn main() -> seqlog_core::Result<()> {
/// let engine = Arc::new(MemoryEngine::new());
/// let queue = BinlogQueue::open(engine, BinlogConfig::with_capacity(1000))?;
///
/// let mut tx = queue.transaction();
/// tx.put(b"user:1", b"alice");
/// tx.add_log(1, 1, b"user:1");
/// tx.commit()?;
///
/// assert_eq!(queue.last_seq(), 1);
/// # Ok(())
/// # }
/// ```
pub struct BinlogQueue<S: StorageEngine> {
    inner: Arc<QueueInner<S>>,
    /// Joined on drop; `None` when logging is disabled
    _purge: Option<PurgeDriver>,
}

impl<S: StorageEngine + 'static> BinlogQueue<S> {
    /// Open a queue over a shared engine, recovering `min_seq`/`last_seq`
    /// from the retained oplog window
    ///
    /// Starts the background purge driver when logging is enabled.
    pub fn open(engine: Arc<S>, config: BinlogConfig) -> Result<Self> {
        let (min_seq, last_seq) = recover_window(engine.as_ref())?;

        let inner = Arc::new(QueueInner {
            engine,
            pending: Mutex::new(PendingBatch::default()),
            min_seq: AtomicU64::new(min_seq),
            last_seq: AtomicU64::new(last_seq),
            capacity: config.capacity,
            enabled: config.enabled,
        });

        let purge = if config.enabled {
            Some(PurgeDriver::start(
                Arc::clone(&inner),
                config.purge_interval(),
            )?)
        } else {
            None
        };

        log_debug!(
            "binlog queue opened: min_seq={}, last_seq={}, capacity={}, enabled={}",
            min_seq,
            last_seq,
            config.capacity,
            config.enabled
        );

        Ok(BinlogQueue {
            inner,
            _purge: purge,
        })
    }

    /// Acquire the exclusive writer lock and begin a fresh batch
    ///
    /// The returned guard is the only way to stage and commit mutations.
    /// Dropping it rolls back anything uncommitted and releases the lock.
    pub fn transaction(&self) -> Transaction<'_, S> {
        Transaction::begin(&self.inner)
    }

    /// Point lookup by exact sequence number
    ///
    /// `Ok(None)` for sequences outside the retained window (evicted, or
    /// not yet assigned).
    pub fn get(&self, seq: u64) -> Result<Option<Binlog>> {
        match self
            .inner
            .engine
            .get(ColumnFamily::Oplog, &encode_seq(seq))?
        {
            Some(value) => Ok(Some(Binlog::load(value)?)),
            None => Ok(None),
        }
    }

    /// First retained entry with sequence `>= seq`
    ///
    /// The replication resume primitive: a follower passes its last
    /// acknowledged sequence plus one and continues without gaps or
    /// duplicates. `Ok(None)` means the follower is caught up,
    /// distinguished from an engine error.
    pub fn find_next(&self, seq: u64) -> Result<Option<Binlog>> {
        match self
            .inner
            .engine
            .seek(ColumnFamily::Oplog, &encode_seq(seq))?
        {
            Some((_, value)) => Ok(Some(Binlog::load(value)?)),
            None => Ok(None),
        }
    }

    /// The entry at `last_seq`, or `Ok(None)` if the log is empty
    pub fn find_last(&self) -> Result<Option<Binlog>> {
        match self.inner.engine.last(ColumnFamily::Oplog)? {
            Some((_, value)) => Ok(Some(Binlog::load(value)?)),
            None => Ok(None),
        }
    }

    /// Smallest retained sequence number (advisory snapshot)
    pub fn min_seq(&self) -> u64 {
        self.inner.min_seq.load(Ordering::SeqCst)
    }

    /// Highest committed sequence number (advisory snapshot)
    pub fn last_seq(&self) -> u64 {
        self.inner.last_seq.load(Ordering::SeqCst)
    }

    /// Configured retention capacity
    pub fn capacity(&self) -> u64 {
        self.inner.capacity
    }

    /// Whether mutations are being logged
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Run one eviction pass outside the background driver
    ///
    /// Returns the number of evicted sequence slots. Works whether or not
    /// logging is enabled, so operators can shrink an existing oplog.
    pub fn purge_once(&self) -> Result<u64> {
        self.inner.purge_once()
    }

    /// Diagnostic snapshot of the retention window
    pub fn stats(&self) -> serde_json::Value {
        let min_seq = self.min_seq();
        let last_seq = self.last_seq();
        json!({
            "min_seq": min_seq,
            "last_seq": last_seq,
            "window": last_seq.saturating_sub(min_seq),
            "capacity": self.inner.capacity,
            "enabled": self.inner.enabled,
        })
    }

    /// Ask the engine to persist buffered state to stable storage
    pub fn flush(&self) -> Result<()> {
        self.inner.engine.flush()
    }
}

/// Read `min_seq`/`last_seq` back from the retained oplog window
fn recover_window<S: StorageEngine>(engine: &S) -> Result<(u64, u64)> {
    let min_seq = match engine.first(ColumnFamily::Oplog)? {
        Some((_, value)) => Binlog::load(value)?.seq(),
        None => 0,
    };
    let last_seq = match engine.last(ColumnFamily::Oplog)? {
        Some((_, value)) => Binlog::load(value)?.seq(),
        None => 0,
    };
    Ok((min_seq, last_seq))
}
