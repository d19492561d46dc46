// seqlog-core/src/lib.rs
// Replication binlog subsystem for embedded key-value stores

pub mod binlog;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;

// Public exports
pub use binlog::{encode_seq, Binlog, BinlogQueue, Transaction, HEADER_LEN};
pub use config::BinlogConfig;
pub use error::{Result, SeqLogError};
pub use logging::{get_log_level, set_log_level, LogLevel};
pub use storage::{BatchOp, ColumnFamily, JournalEngine, MemoryEngine, StorageEngine};
