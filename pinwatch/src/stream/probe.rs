//! Producer-side handles for publishing pinning events
//!
//! Application code wraps sections that hold a worker thread (a synchronous
//! lock, a blocking call inside an async task) in a [`PinnedSection`]:
//!
//! ```rust,ignore
//! let _pinned = probe.enter();
//! let guard = state.lock().unwrap();
//! std::thread::sleep(Duration::from_millis(5));
//! ```
//!
//! When the guard drops, the section's duration is published to the stream.

use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};

use super::RecordingStream;

/// Cloneable handle publishing into one [`RecordingStream`]
#[derive(Clone)]
pub struct PinProbe {
    stream: RecordingStream,
}

impl PinProbe {
    pub(crate) fn new(stream: RecordingStream) -> Self {
        Self { stream }
    }

    /// Publish a pinning event observed elsewhere
    ///
    /// Returns `true` if the event was queued for delivery.
    pub fn record(
        &self,
        thread_name: Option<String>,
        start_time: NaiveDateTime,
        duration: Duration,
    ) -> bool {
        self.stream.record(thread_name, start_time, duration)
    }

    /// Start timing a pinned section on the current thread
    #[must_use = "the section is recorded when the guard drops"]
    pub fn enter(&self) -> PinnedSection<'_> {
        PinnedSection {
            probe: self,
            started_at: Local::now().naive_local(),
            clock: Instant::now(),
        }
    }
}

/// RAII guard timing one pinned section
pub struct PinnedSection<'a> {
    probe: &'a PinProbe,
    started_at: NaiveDateTime,
    clock: Instant,
}

impl PinnedSection<'_> {
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }
}

impl Drop for PinnedSection<'_> {
    fn drop(&mut self) {
        let thread_name = std::thread::current().name().map(str::to_string);
        self.probe.record(thread_name, self.started_at, self.clock.elapsed());
    }
}
