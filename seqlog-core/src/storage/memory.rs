// storage/memory.rs
//! Pure in-memory storage engine for fast testing and embedding
//!
//! `MemoryEngine` implements the `StorageEngine` trait over one `BTreeMap`
//! per column family. `BTreeMap` rather than a hash map because the oplog
//! contract requires ordered `seek`/`first`/`last`.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use crate::error::Result;
use crate::storage::{BatchOp, ColumnFamily, StorageEngine};

/// Ordered in-memory tables, one per column family
///
/// Shared between `MemoryEngine` and the journal engine's replayed state.
#[derive(Debug, Default)]
pub(crate) struct MemTables {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    oplog: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemTables {
    fn table(&self, cf: ColumnFamily) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        match cf {
            ColumnFamily::Data => &self.data,
            ColumnFamily::Oplog => &self.oplog,
        }
    }

    fn table_mut(&mut self, cf: ColumnFamily) -> &mut BTreeMap<Vec<u8>, Vec<u8>> {
        match cf {
            ColumnFamily::Data => &mut self.data,
            ColumnFamily::Oplog => &mut self.oplog,
        }
    }

    /// Apply one batch operation
    ///
    /// Merge concatenates the operand onto the existing value; an absent
    /// key behaves like a put. The queue never interprets merge payloads,
    /// so richer engines are free to install their own operator.
    pub(crate) fn apply(&mut self, op: &BatchOp) {
        match op {
            BatchOp::Put { cf, key, value } => {
                self.table_mut(*cf).insert(key.clone(), value.clone());
            }
            BatchOp::Merge { cf, key, value } => {
                self.table_mut(*cf)
                    .entry(key.clone())
                    .and_modify(|existing| existing.extend_from_slice(value))
                    .or_insert_with(|| value.clone());
            }
            BatchOp::Delete { cf, key } => {
                self.table_mut(*cf).remove(key);
            }
            BatchOp::DeleteRange { cf, from, to } => {
                let table = self.table_mut(*cf);
                let doomed: Vec<Vec<u8>> = table
                    .range::<[u8], _>((Bound::Included(from.as_slice()), Bound::Included(to.as_slice())))
                    .map(|(k, _)| k.clone())
                    .collect();
                for key in doomed {
                    table.remove(&key);
                }
            }
        }
    }

    pub(crate) fn apply_all(&mut self, batch: &[BatchOp]) {
        for op in batch {
            self.apply(op);
        }
    }

    pub(crate) fn get(&self, cf: ColumnFamily, key: &[u8]) -> Option<Vec<u8>> {
        self.table(cf).get(key).cloned()
    }

    pub(crate) fn seek(&self, cf: ColumnFamily, key: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
        self.table(cf)
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    pub(crate) fn first(&self, cf: ColumnFamily) -> Option<(Vec<u8>, Vec<u8>)> {
        self.table(cf)
            .iter()
            .next()
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    pub(crate) fn last(&self, cf: ColumnFamily) -> Option<(Vec<u8>, Vec<u8>)> {
        self.table(cf)
            .iter()
            .next_back()
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Snapshot the whole state as a batch of puts (journal compaction)
    pub(crate) fn snapshot_ops(&self) -> Vec<BatchOp> {
        let mut ops = Vec::with_capacity(self.data.len() + self.oplog.len());
        for (cf, table) in [
            (ColumnFamily::Data, &self.data),
            (ColumnFamily::Oplog, &self.oplog),
        ] {
            for (key, value) in table {
                ops.push(BatchOp::Put {
                    cf,
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }
        ops
    }

    pub(crate) fn len(&self, cf: ColumnFamily) -> usize {
        self.table(cf).len()
    }
}

/// In-memory storage engine (testing and volatile embedding)
///
/// Batches are applied atomically under a write lock, so concurrent
/// readers observe either all of a batch or none of it.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    tables: RwLock<MemTables>,
}

impl MemoryEngine {
    /// Create a new empty in-memory engine
    pub fn new() -> Self {
        MemoryEngine::default()
    }

    /// Number of live pairs in a family
    pub fn len(&self, cf: ColumnFamily) -> usize {
        self.tables.read().len(cf)
    }

    /// True if the family holds no pairs
    pub fn is_empty(&self, cf: ColumnFamily) -> bool {
        self.len(cf) == 0
    }
}

impl StorageEngine for MemoryEngine {
    fn write(&self, batch: &[BatchOp]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.tables.write().apply_all(batch);
        Ok(())
    }

    fn get(&self, cf: ColumnFamily, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.tables.read().get(cf, key))
    }

    fn seek(&self, cf: ColumnFamily, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        Ok(self.tables.read().seek(cf, key))
    }

    fn first(&self, cf: ColumnFamily) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        Ok(self.tables.read().first(cf))
    }

    fn last(&self, cf: ColumnFamily) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        Ok(self.tables.read().last(cf))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
