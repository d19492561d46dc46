// storage/traits.rs
//! Storage engine abstraction for SeqLog
//!
//! The binlog queue does not talk to a concrete key-value engine; it goes
//! through the `StorageEngine` trait. This enables:
//! - Dependency injection
//! - Easy testing with MemoryEngine
//! - Embedding over any ordered engine with atomic batches
//!
//! # Architecture
//!
//! ```text
//! StorageEngine trait (unified interface)
//!   ├── JournalEngine (file-backed, crash-safe journal)
//!   ├── MemoryEngine (testing, in-memory BTreeMap)
//!   └── adapters over external engines (RocksDB-style stores, etc.)
//! ```
//!
//! The engine exposes two logical column families: `Data` holds the store's
//! key/value pairs, `Oplog` holds binlog entries keyed by their big-endian
//! sequence number. Lexicographic key order must equal numeric sequence
//! order in the `Oplog` family, which is why all oplog keys are fixed-width
//! big-endian.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A named, independently-keyed partition within the storage engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnFamily {
    /// The store's actual key/value pairs
    Data,
    /// Binlog entries keyed by sequence number
    Oplog,
}

/// One operation inside an atomic write batch
///
/// Ranges are inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOp {
    Put {
        cf: ColumnFamily,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Merge {
        cf: ColumnFamily,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        cf: ColumnFamily,
        key: Vec<u8>,
    },
    DeleteRange {
        cf: ColumnFamily,
        from: Vec<u8>,
        to: Vec<u8>,
    },
}

/// Core storage abstraction consumed by the binlog queue
///
/// Implementations must apply `write` batches atomically: either every
/// operation in the batch becomes visible (and durable, for persistent
/// engines) or none does. Reads must be consistent point-in-time reads so
/// that lock-free readers never observe a half-applied batch.
pub trait StorageEngine: Send + Sync {
    /// Apply a batch of operations atomically, spanning both families
    ///
    /// An empty batch is a no-op. On failure no operation from the batch
    /// may be visible.
    fn write(&self, batch: &[BatchOp]) -> Result<()>;

    /// Point lookup
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// First pair whose key is `>= key` in lexicographic order
    fn seek(&self, cf: ColumnFamily, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>>;

    /// Pair with the smallest key in the family
    fn first(&self, cf: ColumnFamily) -> Result<Option<(Vec<u8>, Vec<u8>)>>;

    /// Pair with the largest key in the family
    fn last(&self, cf: ColumnFamily) -> Result<Option<(Vec<u8>, Vec<u8>)>>;

    /// Persist buffered state to stable storage
    ///
    /// For MemoryEngine this is a no-op.
    fn flush(&self) -> Result<()>;
}
