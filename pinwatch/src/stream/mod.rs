//! Continuous event stream
//!
//! The monitor consumes pinning events through the [`EventSource`] seam:
//! - `recording`: in-process [`RecordingStream`] with one delivery thread per subscription
//! - `probe`: [`PinProbe`] handles that application code uses to publish events
//! - `stack_capture`: call-stack capture for probes

pub mod probe;
pub mod recording;
pub mod stack_capture;

use std::sync::Arc;
use std::time::Duration;

use pinwatch_common::{CapturedEvent, DEFAULT_MAX_AGE, DEFAULT_THRESHOLD, PINNED_EVENT_NAME};

use crate::domain::SessionError;

pub use probe::{PinProbe, PinnedSection};
pub use recording::{RecordingStream, StreamStats};
pub use stack_capture::{capture_stack, capture_stack_into};

/// Receives delivered events, one at a time, from a single delivery thread
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &CapturedEvent);
}

/// An open subscription; dropping it closes it
pub trait Subscription: Send {
    /// Stop delivery and release stream resources. Idempotent.
    fn close(&mut self);
}

/// A continuous source of pinning events
pub trait EventSource: Send + Sync {
    /// Begin delivering events matching `settings` to `sink`, asynchronously
    ///
    /// # Errors
    /// Fails if the source cannot open another subscription
    fn subscribe(
        &self,
        settings: &StreamSettings,
        sink: Arc<dyn EventSink>,
    ) -> Result<Box<dyn Subscription>, SessionError>;
}

/// Subscription configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    pub event_name: String,
    /// Events shorter than this are never delivered
    pub threshold: Duration,
    /// Capture the call stack of every recorded event
    pub stack_trace: bool,
    /// Deliver through one reused event buffer instead of a fresh allocation per event
    pub reuse: bool,
    /// Raw events older than this at delivery time are discarded
    pub max_age: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            event_name: PINNED_EVENT_NAME.to_string(),
            threshold: DEFAULT_THRESHOLD,
            stack_trace: true,
            reuse: true,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}
