// binlog/mod.rs
// Replication binlog module
//
// This module provides:
// - `Binlog`: the entry codec (fixed 10-byte header + key)
// - `BinlogQueue`: the bounded, self-pruning log queue
// - `Transaction`: the scoped single-writer guard
// - the background purge driver (internal)

mod entry;
mod purge;
mod queue;
mod transaction;

pub use entry::{encode_seq, Binlog, HEADER_LEN};
pub use queue::BinlogQueue;
pub use transaction::Transaction;
