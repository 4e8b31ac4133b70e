//! # Pinned Event Handling
//!
//! Invoked once per delivered event by the stream's delivery thread.
//!
//! 1. Count the event (always, even when it is not sampled)
//! 2. Ask the [`Sampler`] whether to keep its detail
//! 3. Render it with [`format_event`] and append it to the pending buffer
//!
//! No I/O happens here; the flusher owns the disk.

use std::sync::Arc;

use pinwatch_common::CapturedEvent;

use super::{format_event, AggregateState, Sampler};
use crate::stream::EventSink;

pub struct PinningEventHandler {
    state: Arc<AggregateState>,
    sampler: Sampler,
}

impl PinningEventHandler {
    #[must_use]
    pub fn new(state: Arc<AggregateState>, sampler: Sampler) -> Self {
        Self { state, sampler }
    }

    /// Record one event
    pub fn handle(&self, event: &CapturedEvent) {
        self.state.increment();

        if self.sampler.should_sample() {
            self.state.push_detail(format_event(event));
        }
    }

    pub fn state(&self) -> &Arc<AggregateState> {
        &self.state
    }
}

impl EventSink for PinningEventHandler {
    fn on_event(&self, event: &CapturedEvent) {
        self.handle(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pinning::sampling::FixedSource;
    use std::time::Duration;

    fn pinned(thread: Option<&str>) -> CapturedEvent {
        CapturedEvent {
            thread_name: thread.map(str::to_string),
            duration: Duration::from_millis(3),
            ..Default::default()
        }
    }

    #[test]
    fn test_count_is_exact_under_sampling() {
        let state = Arc::new(AggregateState::new());
        let handler = PinningEventHandler::new(Arc::clone(&state), Sampler::default());

        for _ in 0..10_000 {
            handler.handle(&pinned(Some("w")));
        }

        assert_eq!(state.event_count(), 10_000);
        assert!(state.pending_len() < 10_000);
    }

    #[test]
    fn test_unsampled_events_only_count() {
        let state = Arc::new(AggregateState::new());
        let sampler = Sampler::new(0.01, Box::new(FixedSource(0.99)));
        let handler = PinningEventHandler::new(Arc::clone(&state), sampler);

        handler.handle(&pinned(Some("w")));
        handler.handle(&pinned(None));

        assert_eq!(state.event_count(), 2);
        assert_eq!(state.pending_len(), 0);
    }

    #[test]
    fn test_sampled_event_with_missing_fields_is_rendered() {
        let state = Arc::new(AggregateState::new());
        let handler = PinningEventHandler::new(Arc::clone(&state), Sampler::always());

        handler.handle(&pinned(None));

        assert_eq!(state.event_count(), 1);
        let details = state.drain();
        assert_eq!(details.len(), 1);
        assert!(details[0].contains("'<unknown>'"));
        assert!(details[0].contains("<not available>"));
    }
}
