use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use pinwatch::pinning::{
    AggregateState, FixedSource, PeriodicFlusher, PinningEventHandler, Sampler, DETAILS_FILE_NAME,
};
use pinwatch::workdir::WorkingDirectoryProvider;
use pinwatch_common::CapturedEvent;

const PRODUCERS: usize = 4;
const EVENTS_PER_PRODUCER: usize = 2_000;

fn event(producer: usize, seq: usize) -> CapturedEvent {
    CapturedEvent {
        thread_name: Some(format!("producer-{producer}-event-{seq}")),
        duration: Duration::from_millis(2),
        start_time: NaiveDateTime::default(),
        stack_trace: None,
    }
}

/// Every detail appended concurrently with draining shows up exactly once
#[test]
fn test_concurrent_handle_and_drain_loses_nothing() {
    let state = Arc::new(AggregateState::new());
    let handler = Arc::new(PinningEventHandler::new(
        Arc::clone(&state),
        Sampler::new(1.0, Box::new(FixedSource(0.0))),
    ));
    let done = Arc::new(AtomicBool::new(false));

    let drainer = {
        let state = Arc::clone(&state);
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            let mut drained = Vec::new();
            loop {
                let finished = done.load(Ordering::Acquire);
                drained.extend(state.drain());
                if finished {
                    break;
                }
                std::thread::yield_now();
            }
            drained
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let handler = Arc::clone(&handler);
            std::thread::spawn(move || {
                for seq in 0..EVENTS_PER_PRODUCER {
                    handler.handle(&event(p, seq));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    let drained = drainer.join().unwrap();

    let total = PRODUCERS * EVENTS_PER_PRODUCER;
    assert_eq!(state.event_count(), total as u64);
    assert_eq!(drained.len(), total);
    let unique: HashSet<_> = drained.iter().collect();
    assert_eq!(unique.len(), total, "a detail was emitted twice");
    assert_eq!(state.pending_len(), 0);
}

/// Same property through the flusher: the file holds each detail once
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_flushes_racing_producers_write_each_detail_once() {
    let base = tempfile::tempdir().unwrap();
    let workdir = WorkingDirectoryProvider::with_base(base.path());
    let state = Arc::new(AggregateState::new());
    let handler = Arc::new(PinningEventHandler::new(Arc::clone(&state), Sampler::always()));
    let flusher =
        PeriodicFlusher::new(Arc::clone(&state), &workdir, Duration::from_secs(3600)).unwrap();

    let producer = {
        let handler = Arc::clone(&handler);
        std::thread::spawn(move || {
            for seq in 0..EVENTS_PER_PRODUCER {
                handler.handle(&event(0, seq));
            }
        })
    };

    let mut written = 0;
    while !producer.is_finished() {
        written += flusher.flush_once().await.written;
    }
    producer.join().unwrap();
    written += flusher.flush_once().await.written;
    assert_eq!(written, EVENTS_PER_PRODUCER);

    let contents = std::fs::read_to_string(workdir.get().unwrap().join(DETAILS_FILE_NAME)).unwrap();
    for seq in 0..EVENTS_PER_PRODUCER {
        let needle = format!("Thread 'producer-0-event-{seq}' pinned");
        assert_eq!(contents.matches(&needle).count(), 1, "missing or duplicated: {needle}");
    }
}
