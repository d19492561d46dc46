// binlog/transaction.rs
// Scoped single-writer transaction guard

use std::sync::atomic::Ordering;

use parking_lot::MutexGuard;

use crate::binlog::entry::{encode_seq, Binlog};
use crate::binlog::queue::{PendingBatch, QueueInner};
use crate::error::Result;
use crate::storage::{BatchOp, ColumnFamily, StorageEngine};

/// Exclusive-writer transaction over a [`BinlogQueue`](crate::BinlogQueue)
///
/// Construction acquires the queue's writer lock and begins a fresh batch;
/// the lock is held for the guard's whole lifetime, so only one
/// transaction (or purge pass) runs at a time. Dropping the guard rolls
/// back anything uncommitted and releases the lock on every exit path,
/// including panics unwinding through the caller.
///
/// Rollback after a successful commit is a defined no-op, so callers never
/// need to defuse the guard.
pub struct Transaction<'a, S: StorageEngine> {
    inner: &'a QueueInner<S>,
    pending: MutexGuard<'a, PendingBatch>,
}

impl<'a, S: StorageEngine> Transaction<'a, S> {
    /// Lock the queue and begin a fresh batch
    pub(crate) fn begin(inner: &'a QueueInner<S>) -> Self {
        let mut pending = inner.pending.lock();
        // Begin always starts clean; any uncommitted leftovers are discarded
        pending.ops.clear();
        pending.tran_seq = inner.last_seq.load(Ordering::SeqCst);
        Transaction { inner, pending }
    }

    /// Stage a data-family put
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.pending.ops.push(BatchOp::Put {
            cf: ColumnFamily::Data,
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Stage a data-family delete
    pub fn delete(&mut self, key: &[u8]) {
        self.pending.ops.push(BatchOp::Delete {
            cf: ColumnFamily::Data,
            key: key.to_vec(),
        });
    }

    /// Stage a data-family merge
    pub fn merge(&mut self, key: &[u8], value: &[u8]) {
        self.pending.ops.push(BatchOp::Merge {
            cf: ColumnFamily::Data,
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Allocate the next sequence number and stage a log entry for it
    ///
    /// No-op when logging is disabled: the counter does not advance and
    /// nothing is written to the oplog family.
    pub fn add_log(&mut self, entry_type: u8, cmd: u8, key: &[u8]) {
        if !self.inner.enabled {
            return;
        }
        self.pending.tran_seq += 1;
        let log = Binlog::new(self.pending.tran_seq, entry_type, cmd, key);
        self.stage_log(log);
    }

    /// Stage an entry under an explicit, already-assigned sequence number
    ///
    /// Re-tags an entry staged earlier in this batch (marking a
    /// transaction boundary after the fact). Does not advance the
    /// sequence counter and never touches durable records outside the
    /// batch.
    pub fn update_log(&mut self, seq: u64, entry_type: u8, cmd: u8, key: &[u8]) {
        if !self.inner.enabled {
            return;
        }
        let log = Binlog::new(seq, entry_type, cmd, key);
        self.stage_log(log);
    }

    fn stage_log(&mut self, log: Binlog) {
        self.pending.ops.push(BatchOp::Put {
            cf: ColumnFamily::Oplog,
            key: encode_seq(log.seq()).to_vec(),
            value: log.into_bytes(),
        });
    }

    /// Atomically write the whole batch to the engine
    ///
    /// On success the staged sequence counter is published and the batch
    /// is cleared, so the guard's eventual rollback is a no-op. On failure
    /// the batch stays staged and the counters are untouched; the caller
    /// may retry `commit` or let the guard roll back.
    pub fn commit(&mut self) -> Result<()> {
        self.inner.engine.write(&self.pending.ops)?;
        self.inner
            .last_seq
            .store(self.pending.tran_seq, Ordering::SeqCst);
        self.pending.ops.clear();
        Ok(())
    }

    /// Discard the staged batch
    ///
    /// Idempotent: safe to call repeatedly, and safe after a successful
    /// `commit`.
    pub fn rollback(&mut self) {
        self.pending.ops.clear();
        self.pending.tran_seq = self.inner.last_seq.load(Ordering::SeqCst);
    }

    /// Number of currently staged operations (both families)
    pub fn staged_ops(&self) -> usize {
        self.pending.ops.len()
    }
}

impl<S: StorageEngine> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        // Unconditional: a no-op when the caller committed
        self.rollback();
    }
}
