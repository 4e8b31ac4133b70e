//! Shared counter and pending-detail buffer
//!
//! Written by the delivery thread, drained by the flusher. The counter only
//! ever grows; the buffer grows between flushes and is swapped out whole at a
//! flush, so a concurrent append lands either before or after the swap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct AggregateState {
    event_count: AtomicU64,
    pending_details: Mutex<Vec<String>>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one delivered event, returning the new total
    pub fn increment(&self) -> u64 {
        self.event_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Total events seen since creation
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }

    /// Buffer one rendered detail for the next flush
    pub fn push_detail(&self, detail: String) {
        self.details().push(detail);
    }

    pub fn pending_len(&self) -> usize {
        self.details().len()
    }

    /// Take every pending detail, leaving the buffer empty
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.details())
    }

    fn details(&self) -> MutexGuard<'_, Vec<String>> {
        // push and take never leave the Vec half-updated, so poison is ignored
        self.pending_details.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
