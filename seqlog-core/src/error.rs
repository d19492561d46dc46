// error.rs
// Error types for the binlog subsystem

use thiserror::Error;

/// Errors produced by the binlog queue, entry codec and storage engines
#[derive(Debug, Error)]
pub enum SeqLogError {
    /// I/O failure from the filesystem layer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry buffer shorter than the fixed header, or otherwise unparseable
    #[error("malformed binlog entry")]
    MalformedEntry,

    /// Journal frame failed validation in a position that cannot be a torn tail
    #[error("journal corruption: {0}")]
    JournalCorruption(String),

    /// Batch record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Storage engine reported a batch or read failure
    #[error("storage engine failure: {0}")]
    Storage(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, SeqLogError>;
