// recovery_tests.rs
// Restart and crash-recovery behavior over the journal-backed engine

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;

use tempfile::TempDir;

use seqlog_core::{BinlogConfig, BinlogQueue, ColumnFamily, JournalEngine, StorageEngine};

fn quiet_config(capacity: u64) -> BinlogConfig {
    BinlogConfig {
        capacity,
        purge_interval_ms: 3_600_000,
        ..BinlogConfig::default()
    }
}

fn commit_one(queue: &BinlogQueue<JournalEngine>, key: &[u8]) {
    let mut tx = queue.transaction();
    tx.put(key, b"value");
    tx.add_log(1, 1, key);
    tx.commit().unwrap();
}

#[test]
fn test_window_survives_restart() {
    let dir = TempDir::new().unwrap();

    {
        let engine = Arc::new(JournalEngine::open(dir.path()).unwrap());
        let queue = BinlogQueue::open(engine, quiet_config(100)).unwrap();
        for i in 0..8u64 {
            commit_one(&queue, format!("k{}", i).as_bytes());
        }
        queue.flush().unwrap();
        assert_eq!(queue.last_seq(), 8);
    }

    // Fresh process: counters and entries come back from the journal
    let engine = Arc::new(JournalEngine::open(dir.path()).unwrap());
    let queue = BinlogQueue::open(Arc::clone(&engine), quiet_config(100)).unwrap();
    assert_eq!(queue.last_seq(), 8);
    assert_eq!(queue.min_seq(), 1);
    for seq in 1..=8u64 {
        assert_eq!(queue.get(seq).unwrap().unwrap().seq(), seq);
    }
    assert_eq!(
        engine.get(ColumnFamily::Data, b"k3").unwrap(),
        Some(b"value".to_vec())
    );

    // And sequencing continues without reuse
    commit_one(&queue, b"next");
    assert_eq!(queue.last_seq(), 9);
}

#[test]
fn test_eviction_survives_restart() {
    let dir = TempDir::new().unwrap();

    {
        let engine = Arc::new(JournalEngine::open(dir.path()).unwrap());
        let queue = BinlogQueue::open(engine, quiet_config(3)).unwrap();
        for i in 0..10u64 {
            commit_one(&queue, format!("k{}", i).as_bytes());
        }
        queue.purge_once().unwrap();
        assert_eq!(queue.min_seq(), 7);
    }

    let engine = Arc::new(JournalEngine::open(dir.path()).unwrap());
    let queue = BinlogQueue::open(engine, quiet_config(3)).unwrap();
    assert_eq!(queue.min_seq(), 7);
    assert_eq!(queue.last_seq(), 10);
    assert!(queue.get(6).unwrap().is_none());
    assert!(queue.get(7).unwrap().is_some());
    assert_eq!(queue.find_next(1).unwrap().unwrap().seq(), 7);
}

#[test]
fn test_torn_tail_drops_only_last_commit() {
    let dir = TempDir::new().unwrap();
    let journal_path;

    {
        let engine = Arc::new(JournalEngine::open(dir.path()).unwrap());
        journal_path = engine.path().to_path_buf();
        let queue = BinlogQueue::open(engine, quiet_config(100)).unwrap();
        commit_one(&queue, b"first");
        commit_one(&queue, b"second");
    }

    // Crash mid-append: a partial frame lands after the last commit
    let mut file = OpenOptions::new().append(true).open(&journal_path).unwrap();
    file.write_all(&[0x12, 0x00, 0x00, 0x00, 0xAB]).unwrap();
    drop(file);

    let engine = Arc::new(JournalEngine::open(dir.path()).unwrap());
    let queue = BinlogQueue::open(engine, quiet_config(100)).unwrap();
    assert_eq!(queue.last_seq(), 2);
    assert_eq!(queue.get(1).unwrap().unwrap().key(), b"first");
    assert_eq!(queue.get(2).unwrap().unwrap().key(), b"second");
}

#[test]
fn test_compaction_keeps_queue_consistent() {
    let dir = TempDir::new().unwrap();

    let engine = Arc::new(JournalEngine::open(dir.path()).unwrap());
    let queue = BinlogQueue::open(Arc::clone(&engine), quiet_config(5)).unwrap();
    for i in 0..20u64 {
        commit_one(&queue, format!("k{}", i).as_bytes());
    }
    queue.purge_once().unwrap();
    assert_eq!(queue.min_seq(), 15);

    // Compaction drops the journal's history of evicted entries
    let reclaimed = engine.compact().unwrap();
    assert!(reclaimed > 0);

    assert_eq!(queue.last_seq(), 20);
    assert!(queue.get(14).unwrap().is_none());
    assert_eq!(queue.get(16).unwrap().unwrap().seq(), 16);
    drop(queue);

    // The compacted journal still restores the same window
    let engine = Arc::new(JournalEngine::open(dir.path()).unwrap());
    let queue = BinlogQueue::open(engine, quiet_config(5)).unwrap();
    assert_eq!(queue.min_seq(), 15);
    assert_eq!(queue.last_seq(), 20);
}

#[test]
fn test_uncommitted_transaction_never_reaches_disk() {
    let dir = TempDir::new().unwrap();

    {
        let engine = Arc::new(JournalEngine::open(dir.path()).unwrap());
        let queue = BinlogQueue::open(engine, quiet_config(100)).unwrap();
        commit_one(&queue, b"durable");

        let mut tx = queue.transaction();
        tx.put(b"volatile", b"v");
        tx.add_log(1, 1, b"volatile");
        // Guard dropped without commit
    }

    let engine = Arc::new(JournalEngine::open(dir.path()).unwrap());
    let queue = BinlogQueue::open(Arc::clone(&engine), quiet_config(100)).unwrap();
    assert_eq!(queue.last_seq(), 1);
    assert_eq!(engine.get(ColumnFamily::Data, b"volatile").unwrap(), None);
}
