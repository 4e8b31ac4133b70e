//! Demo host that pins its own workers
//!
//! Shows a before/after scenario:
//! - BAD: a std mutex held across a blocking sleep inside an async task
//! - GOOD: the same work moved onto the blocking threadpool
//!
//! Only the BAD path is wrapped in a probe, so the detail file fills with its
//! stack traces while the GOOD path stays invisible.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --example pin-carrier
//! # then inspect <tmp>/pinwatch-*/pinned-thread-details
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pinwatch::config::MonitorConfig;
use pinwatch::monitor::Monitor;
use pinwatch::stream::{PinProbe, RecordingStream};

const REQUESTS: usize = 200;

// BAD: blocks the worker thread while holding the lock
async fn handle_bad(probe: PinProbe, cache: Arc<Mutex<u64>>) {
    let _pinned = probe.enter();
    let mut hits = cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    std::thread::sleep(Duration::from_millis(3));
    *hits += 1;
}

// GOOD: the blocking section runs off the async workers
async fn handle_good(cache: Arc<Mutex<u64>>) {
    tokio::task::spawn_blocking(move || {
        let mut hits = cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        std::thread::sleep(Duration::from_millis(3));
        *hits += 1;
    })
    .await
    .ok();
}

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let stream = RecordingStream::new();
    let config = MonitorConfig {
        sample_probability: 0.1,
        flush_interval: Duration::from_secs(2),
        memory: None,
        ..MonitorConfig::default()
    };
    let mut monitor = Monitor::new(config, Arc::new(stream.clone()));
    monitor.start().await?;

    let cache = Arc::new(Mutex::new(0_u64));
    let mut tasks = Vec::with_capacity(REQUESTS * 2);
    for _ in 0..REQUESTS {
        tasks.push(tokio::spawn(handle_bad(stream.probe(), Arc::clone(&cache))));
        tasks.push(tokio::spawn(handle_good(Arc::clone(&cache))));
    }
    for task in tasks {
        task.await?;
    }

    monitor.shutdown().await;
    println!("Details written to {}", monitor.workdir()?.display());
    Ok(())
}
