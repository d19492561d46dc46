// binlog/purge.rs
// Background retention driver

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::binlog::queue::QueueInner;
use crate::error::Result;
use crate::storage::StorageEngine;
use crate::{log_debug, log_warn};

/// Quit-flag poll granularity; keeps shutdown prompt even with long
/// purge intervals
const TICK: Duration = Duration::from_millis(20);

/// Handle to the background purge thread
///
/// Runs one eviction pass per configured interval, contending on the same
/// writer lock as transactions. Dropping the handle signals the quit flag
/// and joins the thread.
pub(crate) struct PurgeDriver {
    quit: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PurgeDriver {
    pub(crate) fn start<S: StorageEngine + 'static>(
        inner: Arc<QueueInner<S>>,
        interval: Duration,
    ) -> Result<Self> {
        let quit = Arc::new(AtomicBool::new(false));
        let thread_quit = Arc::clone(&quit);

        let handle = thread::Builder::new()
            .name("binlog-purge".to_string())
            .spawn(move || run(inner, thread_quit, interval))?;

        Ok(PurgeDriver {
            quit,
            handle: Some(handle),
        })
    }
}

impl Drop for PurgeDriver {
    fn drop(&mut self) {
        self.quit.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run<S: StorageEngine>(inner: Arc<QueueInner<S>>, quit: Arc<AtomicBool>, interval: Duration) {
    let mut slept = Duration::ZERO;
    while !quit.load(Ordering::Acquire) {
        thread::sleep(TICK);
        slept += TICK;
        if slept < interval {
            continue;
        }
        slept = Duration::ZERO;

        // A failed pass never advances min_seq; retried next interval
        match inner.purge_once() {
            Ok(0) => {}
            Ok(evicted) => log_debug!(
                "evicted {} binlog entries, min_seq={}",
                evicted,
                inner.min_seq.load(Ordering::SeqCst)
            ),
            Err(e) => log_warn!("binlog purge pass failed: {}", e),
        }
    }
}
