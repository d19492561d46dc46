// binlog/entry.rs
// Binlog entry codec

use crate::error::{Result, SeqLogError};

/// Fixed header size: 8 (seq) + 1 (type) + 1 (cmd) = 10 bytes
pub const HEADER_LEN: usize = 10;

/// A single replication log record
///
/// Binary layout, bit-exact and unpadded:
/// - seq: 8 bytes (u64 BE)
/// - entry_type: 1 byte
/// - cmd: 1 byte
/// - key: variable, all remaining bytes (no length prefix)
///
/// The sequence number is big-endian so that lexicographic order of the
/// serialized form (and of the oplog key derived from it) equals numeric
/// order. `entry_type` and `cmd` are opaque tags owned by the command
/// dispatcher; this crate never interprets them.
///
/// The struct is backed by its serialized buffer: accessors are pure reads
/// over it, and `data()` hands the exact bytes to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binlog {
    buf: Vec<u8>,
}

impl Binlog {
    /// Construct an entry from its fields, encoding the buffer
    pub fn new(seq: u64, entry_type: u8, cmd: u8, key: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(HEADER_LEN + key.len());
        buf.extend_from_slice(&seq.to_be_bytes());
        buf.push(entry_type);
        buf.push(cmd);
        buf.extend_from_slice(key);
        Binlog { buf }
    }

    /// Decode an entry from any byte source
    ///
    /// Owned bytes, borrowed slices and string wrappers all decode
    /// identically. Fails with `MalformedEntry` if the buffer is shorter
    /// than the fixed header.
    pub fn load(buf: impl AsRef<[u8]>) -> Result<Self> {
        let raw = buf.as_ref();
        if raw.len() < HEADER_LEN {
            return Err(SeqLogError::MalformedEntry);
        }
        Ok(Binlog { buf: raw.to_vec() })
    }

    /// Sequence number of this entry
    pub fn seq(&self) -> u64 {
        u64::from_be_bytes(self.buf[0..8].try_into().unwrap())
    }

    /// Visibility/role tag (sync-worthy write, transaction marker, ...)
    pub fn entry_type(&self) -> u8 {
        self.buf[8]
    }

    /// Logical operation tag (SET, DELETE, ... as defined by the dispatcher)
    pub fn cmd(&self) -> u8 {
        self.buf[9]
    }

    /// The primary key affected by the operation
    pub fn key(&self) -> &[u8] {
        &self.buf[HEADER_LEN..]
    }

    /// Raw serialized form
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    /// Serialized size in bytes, always `>= HEADER_LEN`
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Consume the entry, yielding its serialized form
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Rewrite type/cmd/key in place, keeping the sequence number
    ///
    /// Used to re-tag an in-memory entry before it is staged (marking a
    /// transaction boundary after the fact); committed on-disk records are
    /// never mutated.
    pub fn update(&mut self, entry_type: u8, cmd: u8, key: &[u8]) {
        let seq = self.seq();
        *self = Binlog::new(seq, entry_type, cmd, key);
    }

    /// Diagnostic rendering; never parsed back
    pub fn dumps(&self) -> String {
        format!(
            "seq={} type={:#04x} cmd={:#04x} key={}",
            self.seq(),
            self.entry_type(),
            self.cmd(),
            String::from_utf8_lossy(self.key())
        )
    }
}

/// Oplog key for a sequence number: fixed-width big-endian
pub fn encode_seq(seq: u64) -> [u8; 8] {
    seq.to_be_bytes()
}
