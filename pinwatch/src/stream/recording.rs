//! # In-Process Recording Stream
//!
//! A continuous event source fed by [`PinProbe`](super::PinProbe) handles.
//!
//! ## Flow
//!
//! ```text
//! probe.record() ──threshold──▶ bounded queue ──▶ delivery thread ──max_age──▶ sink.on_event()
//!        ▲                                              │
//!        └──────────── recycled frame buffers ◀─────────┘  (reuse mode)
//! ```
//!
//! - Events below the subscription threshold are dropped at the producer
//! - The queue is bounded; a full queue drops the newest event
//! - Raw events older than `max_age` when dequeued are discarded, which
//!   bounds how stale (and how large) the backlog can get
//! - With `reuse`, delivered stack buffers go back to producers
//!
//! Only one subscription may be open at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use log::{debug, info, warn};
use pinwatch_common::{CapturedEvent, StackFrame};

use super::{capture_stack_into, EventSink, EventSource, PinProbe, StreamSettings, Subscription};
use crate::domain::SessionError;

/// Raw events buffered between producers and the delivery thread
const QUEUE_CAPACITY: usize = 16_384;

/// Frame buffers kept for reuse
const RECYCLE_CAPACITY: usize = 64;

/// Counters describing what happened to recorded events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub delivered: u64,
    pub expired: u64,
    pub below_threshold: u64,
    pub dropped: u64,
}

impl StreamStats {
    /// Counts accumulated after `earlier` was taken
    #[must_use]
    pub fn since(&self, earlier: &StreamStats) -> StreamStats {
        StreamStats {
            delivered: self.delivered.saturating_sub(earlier.delivered),
            expired: self.expired.saturating_sub(earlier.expired),
            below_threshold: self.below_threshold.saturating_sub(earlier.below_threshold),
            dropped: self.dropped.saturating_sub(earlier.dropped),
        }
    }
}

struct RawEvent {
    event: CapturedEvent,
    recorded_at: Instant,
}

struct ActiveStream {
    settings: StreamSettings,
    tx: Sender<RawEvent>,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    expired: AtomicU64,
    below_threshold: AtomicU64,
    dropped: AtomicU64,
}

struct Shared {
    active: RwLock<Option<ActiveStream>>,
    counters: Counters,
    recycle_tx: Sender<Vec<StackFrame>>,
    recycle_rx: Receiver<Vec<StackFrame>>,
}

impl Shared {
    fn active(&self) -> RwLockReadGuard<'_, Option<ActiveStream>> {
        self.active.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn active_mut(&self) -> RwLockWriteGuard<'_, Option<ActiveStream>> {
        self.active.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle to one in-process event stream
#[derive(Clone)]
pub struct RecordingStream {
    shared: Arc<Shared>,
}

impl RecordingStream {
    pub fn new() -> Self {
        let (recycle_tx, recycle_rx) = bounded(RECYCLE_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                active: RwLock::new(None),
                counters: Counters::default(),
                recycle_tx,
                recycle_rx,
            }),
        }
    }

    /// Producer handle publishing into this stream
    pub fn probe(&self) -> PinProbe {
        PinProbe::new(self.clone())
    }

    /// Whether a subscription is currently open
    pub fn is_subscribed(&self) -> bool {
        self.shared.active().is_some()
    }

    pub fn stats(&self) -> StreamStats {
        let c = &self.shared.counters;
        StreamStats {
            delivered: c.delivered.load(Ordering::Relaxed),
            expired: c.expired.load(Ordering::Relaxed),
            below_threshold: c.below_threshold.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
        }
    }

    /// Publish one event; returns `true` if it was queued for delivery
    ///
    /// A no-op without an open subscription.
    pub(crate) fn record(
        &self,
        thread_name: Option<String>,
        start_time: NaiveDateTime,
        duration: Duration,
    ) -> bool {
        let active = self.shared.active();
        let Some(stream) = active.as_ref() else {
            return false;
        };

        let counters = &self.shared.counters;
        if duration < stream.settings.threshold {
            counters.below_threshold.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let stack_trace = stream.settings.stack_trace.then(|| {
            let mut frames = self.shared.recycle_rx.try_recv().unwrap_or_default();
            capture_stack_into(&mut frames);
            frames
        });

        let raw = RawEvent {
            event: CapturedEvent { thread_name, duration, start_time, stack_trace },
            recorded_at: Instant::now(),
        };
        if stream.tx.try_send(raw).is_err() {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }
}

impl Default for RecordingStream {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for RecordingStream {
    fn subscribe(
        &self,
        settings: &StreamSettings,
        sink: Arc<dyn EventSink>,
    ) -> Result<Box<dyn Subscription>, SessionError> {
        let mut active = self.shared.active_mut();
        if active.is_some() {
            return Err(SessionError::AlreadySubscribed);
        }

        let (tx, rx) = bounded(QUEUE_CAPACITY);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let delivery_settings = settings.clone();

        let thread = std::thread::Builder::new()
            .name("pinwatch-delivery".to_string())
            .spawn(move || deliver(&shared, &delivery_settings, &rx, &stop_rx, sink.as_ref()))
            .map_err(SessionError::DeliveryThread)?;

        // Producers are excluded by the write lock, so this is the exact starting point
        let opened_with = self.stats();
        *active = Some(ActiveStream { settings: settings.clone(), tx });
        info!(
            "Subscribed to {} (threshold {:?}, stack traces {}, max age {:?})",
            settings.event_name,
            settings.threshold,
            if settings.stack_trace { "on" } else { "off" },
            settings.max_age
        );

        Ok(Box::new(RecordingSubscription {
            stream: self.clone(),
            opened_with,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }))
    }
}

fn deliver(
    shared: &Shared,
    settings: &StreamSettings,
    rx: &Receiver<RawEvent>,
    stop_rx: &Receiver<()>,
    sink: &dyn EventSink,
) {
    let counters = &shared.counters;
    loop {
        let next = select! {
            recv(rx) -> msg => msg.ok(),
            recv(stop_rx) -> _ => None,
        };
        let Some(mut raw) = next else {
            break;
        };

        if raw.recorded_at.elapsed() > settings.max_age {
            counters.expired.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        sink.on_event(&raw.event);
        counters.delivered.fetch_add(1, Ordering::Relaxed);

        if settings.reuse {
            if let Some(mut frames) = raw.event.stack_trace.take() {
                frames.clear();
                let _ = shared.recycle_tx.try_send(frames);
            }
        }
    }
    debug!("Delivery thread exiting");
}

struct RecordingSubscription {
    stream: RecordingStream,
    /// Stream totals when this subscription opened
    opened_with: StreamStats,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Subscription for RecordingSubscription {
    fn close(&mut self) {
        let Some(stop_tx) = self.stop_tx.take() else {
            return;
        };

        // Stop accepting events, then wake the delivery thread
        self.stream.shared.active_mut().take();
        drop(stop_tx);

        if let Some(thread) = self.thread.take() {
            // A sink closing its own subscription must not join itself
            if thread.thread().id() == std::thread::current().id() {
                debug!("Subscription closed from its delivery thread");
            } else if thread.join().is_err() {
                warn!("Delivery thread panicked");
            }
        }

        let stats = self.stream.stats().since(&self.opened_with);
        info!(
            "Subscription closed: {} delivered, {} expired, {} below threshold, {} dropped",
            stats.delivered, stats.expired, stats.below_threshold, stats.dropped
        );
    }
}

impl Drop for RecordingSubscription {
    fn drop(&mut self) {
        self.close();
    }
}
