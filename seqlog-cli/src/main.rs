use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use seqlog_core::{BinlogConfig, BinlogQueue, JournalEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "seqlog")]
#[command(about = "SeqLog CLI - inspect and maintain replication binlogs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the queue's retention-window statistics
    Stats {
        /// Binlog directory
        #[arg(long, default_value = "seqlog")]
        db: PathBuf,
    },
    /// Dump entries, one line each, starting at a sequence number
    Dump {
        /// Binlog directory
        #[arg(long, default_value = "seqlog")]
        db: PathBuf,
        /// First sequence number to dump
        #[arg(long, default_value_t = 0)]
        from: u64,
        /// Maximum number of entries to print
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Run one eviction pass against an explicit capacity
    Purge {
        /// Binlog directory
        #[arg(long, default_value = "seqlog")]
        db: PathBuf,
        /// Retention capacity to enforce
        #[arg(long)]
        capacity: u64,
    },
}

fn main() -> Result<()> {
    seqlog_core::logging::init_from_env();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { db } => stats(&db),
        Commands::Dump { db, from, limit } => dump(&db, from, limit),
        Commands::Purge { db, capacity } => purge(&db, capacity),
    }
}

/// Open the queue for offline inspection: logging disabled so no purge
/// thread runs and the counters stay as recovered
fn open_queue(db: &Path, capacity: u64) -> Result<BinlogQueue<JournalEngine>> {
    let engine = Arc::new(
        JournalEngine::open(db)
            .with_context(|| format!("Failed to open binlog directory: {}", db.display()))?,
    );
    let config = BinlogConfig {
        capacity,
        ..BinlogConfig::disabled()
    };
    BinlogQueue::open(engine, config)
        .with_context(|| format!("Failed to open binlog queue: {}", db.display()))
}

fn stats(db: &Path) -> Result<()> {
    let queue = open_queue(db, seqlog_core::config::DEFAULT_CAPACITY)?;
    println!("{}", serde_json::to_string_pretty(&queue.stats())?);
    Ok(())
}

fn dump(db: &Path, from: u64, limit: Option<u64>) -> Result<()> {
    let queue = open_queue(db, seqlog_core::config::DEFAULT_CAPACITY)?;

    let mut acked = from.saturating_sub(1);
    let mut printed = 0u64;
    loop {
        if let Some(max) = limit {
            if printed >= max {
                break;
            }
        }
        let entry = match queue
            .find_next(acked + 1)
            .context("Failed to read next entry")?
        {
            Some(entry) => entry,
            None => break,
        };
        println!("{}", entry.dumps());
        acked = entry.seq();
        printed += 1;
    }

    eprintln!(
        "{} entries, window [{}, {}]",
        printed,
        queue.min_seq(),
        queue.last_seq()
    );
    Ok(())
}

fn purge(db: &Path, capacity: u64) -> Result<()> {
    let queue = open_queue(db, capacity)?;

    let before = (queue.min_seq(), queue.last_seq());
    let evicted = queue.purge_once().context("Eviction pass failed")?;
    queue.flush().context("Failed to flush after eviction")?;

    println!(
        "evicted {} entries, window [{}, {}] -> [{}, {}]",
        evicted,
        before.0,
        before.1,
        queue.min_seq(),
        queue.last_seq()
    );
    Ok(())
}
