//! # Periodic Detail Flushing
//!
//! A background task, independent of event arrival, that once per interval:
//!
//! 1. Logs the running event total (the liveness heartbeat, logged even when
//!    nothing new arrived)
//! 2. Swaps out the pending detail buffer and appends it to
//!    [`DETAILS_FILE_NAME`] inside the working directory
//!
//! A failed write is logged and that batch is dropped; the timer keeps going.
//! On cancellation the task runs one last flush and exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::AggregateState;
use crate::domain::FatalError;
use crate::workdir::WorkingDirectoryProvider;

/// Append-only file receiving sampled event details
pub const DETAILS_FILE_NAME: &str = "pinned-thread-details";

/// Default flush cadence
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// What a single flush did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Event total at the time of the heartbeat
    pub event_count: u64,
    /// Details appended to the file
    pub written: usize,
    /// Details taken from the buffer but lost to a write failure
    pub dropped: usize,
}

pub struct PeriodicFlusher {
    state: Arc<AggregateState>,
    file_path: PathBuf,
    interval: Duration,
}

impl PeriodicFlusher {
    /// Resolve the output file inside the shared working directory
    ///
    /// # Errors
    /// Propagates working directory creation failure
    pub fn new(
        state: Arc<AggregateState>,
        workdir: &WorkingDirectoryProvider,
        interval: Duration,
    ) -> Result<Self, FatalError> {
        let file_path = workdir.get()?.join(DETAILS_FILE_NAME);
        Ok(Self { state, file_path, interval })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Run a single heartbeat + flush
    pub async fn flush_once(&self) -> FlushReport {
        let event_count = self.state.event_count();
        info!("Pinned events count: {event_count}.");

        let batch = self.state.drain();
        if batch.is_empty() {
            return FlushReport { event_count, written: 0, dropped: 0 };
        }

        match append_lines(&self.file_path, &batch).await {
            Ok(()) => FlushReport { event_count, written: batch.len(), dropped: 0 },
            Err(e) => {
                error!(
                    "Error writing {} pinned event detail(s) to {}: {e}",
                    batch.len(),
                    self.file_path.display()
                );
                FlushReport { event_count, written: 0, dropped: batch.len() }
            }
        }
    }

    /// Start the fixed-rate loop on the current tokio runtime
    ///
    /// The first tick fires immediately.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        info!(
            "Flushing pinned event status every {:?}; sampled stack traces go to {}",
            self.interval,
            self.file_path.display()
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // Slow disks delay the schedule instead of bursting missed ticks
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.flush_once().await;
                    }
                    () = cancel.cancelled() => {
                        self.flush_once().await;
                        info!("Pinned event flusher stopped");
                        break;
                    }
                }
            }
        })
    }
}

async fn append_lines(path: &Path, lines: &[String]) -> std::io::Result<()> {
    let mut buf = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        buf.push_str(line);
        buf.push('\n');
    }

    let mut file =
        tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(buf.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flusher_in(base: &Path) -> (Arc<AggregateState>, PeriodicFlusher) {
        let state = Arc::new(AggregateState::new());
        let workdir = WorkingDirectoryProvider::with_base(base);
        let flusher =
            PeriodicFlusher::new(Arc::clone(&state), &workdir, Duration::from_secs(60)).unwrap();
        (state, flusher)
    }

    #[tokio::test]
    async fn test_heartbeat_without_details_writes_nothing() {
        let base = tempfile::tempdir().unwrap();
        let (state, flusher) = flusher_in(base.path());
        for _ in 0..42 {
            state.increment();
        }

        let report = flusher.flush_once().await;

        assert_eq!(report, FlushReport { event_count: 42, written: 0, dropped: 0 });
        assert!(!flusher.file_path().exists());
    }

    #[tokio::test]
    async fn test_flush_appends_across_ticks() {
        let base = tempfile::tempdir().unwrap();
        let (state, flusher) = flusher_in(base.path());

        state.push_detail("first".into());
        assert_eq!(flusher.flush_once().await.written, 1);
        state.push_detail("second".into());
        state.push_detail("third".into());
        assert_eq!(flusher.flush_once().await.written, 2);

        let content = std::fs::read_to_string(flusher.file_path()).unwrap();
        assert_eq!(content, "first\nsecond\nthird\n");
        assert_eq!(state.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_drops_batch_and_continues() {
        let base = tempfile::tempdir().unwrap();
        let (state, flusher) = flusher_in(base.path());
        // A directory where the file should be makes every open fail
        std::fs::create_dir(flusher.file_path()).unwrap();

        state.increment();
        state.push_detail("lost".into());
        let report = flusher.flush_once().await;

        assert_eq!(report, FlushReport { event_count: 1, written: 0, dropped: 1 });
        assert_eq!(state.pending_len(), 0);
        assert_eq!(state.event_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_runs_final_flush() {
        let base = tempfile::tempdir().unwrap();
        let (state, flusher) = flusher_in(base.path());
        let path = flusher.file_path().to_path_buf();
        let cancel = CancellationToken::new();

        let handle = flusher.spawn(cancel.clone());
        state.push_detail("pending at shutdown".into());
        cancel.cancel();
        handle.await.unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("pending at shutdown"));
    }
}
