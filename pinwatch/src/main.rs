//! # pinwatch - Main Entry Point
//!
//! Runs the monitor against an in-process [`RecordingStream`] until Ctrl+C,
//! the `--duration` limit, or a fatal error from a background subsystem.
//!
//! With `--pin-every-ms`, a task deliberately blocks a worker on a timer so
//! the pipeline has something to observe.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

use pinwatch::cli::Args;
use pinwatch::domain::{FatalError, MonitorError};
use pinwatch::monitor::Monitor;
use pinwatch::stream::{PinProbe, RecordingStream};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_FATAL: i32 = 70;

/// How long the demo load holds a worker
const DEMO_PIN_DURATION: Duration = Duration::from_millis(5);

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let fatal = err.downcast_ref::<FatalError>().is_some()
        || matches!(err.downcast_ref::<MonitorError>(), Some(MonitorError::Fatal(_)));
    if fatal {
        EXIT_FATAL
    } else {
        EXIT_ERROR
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let config = args.to_config();

    let stream = RecordingStream::new();
    let mut monitor = Monitor::new(config, Arc::new(stream.clone()));

    if let Err(e) = monitor.start().await {
        monitor.shutdown().await;
        return Err(e).context("Failed to start pinning monitor");
    }
    info!("Working directory: {}", monitor.workdir()?.display());

    let load = args.pin_interval().map(|every| tokio::spawn(pin_workers(stream.probe(), every)));

    let limit = async {
        if args.duration > 0 {
            tokio::time::sleep(Duration::from_secs(args.duration)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    let outcome = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for Ctrl+C")?;
            info!("Interrupted, shutting down");
            Ok(())
        }
        () = limit => {
            info!("Duration limit reached, shutting down");
            Ok(())
        }
        fatal = monitor.wait_fatal() => match fatal {
            Some(e) => {
                error!("Terminating after unrecoverable error: {e}");
                Err(e)
            }
            None => Ok(()),
        },
    };

    if let Some(load) = load {
        load.abort();
    }
    monitor.shutdown().await;

    outcome.map_err(anyhow::Error::from)
}

/// Block a runtime worker on a timer, producing one pinning event per tick
async fn pin_workers(probe: PinProbe, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let _pinned = probe.enter();
        std::thread::sleep(DEMO_PIN_DURATION);
    }
}
