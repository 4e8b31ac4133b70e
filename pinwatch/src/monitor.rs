//! # Monitor Supervisor
//!
//! Owns every subsystem and the single [`FatalReceiver`]:
//!
//! ```text
//!                 ┌────────────────────────────┐
//!  EventSource ──▶│ EventStreamSession         │
//!                 │   └▶ PinningEventHandler ──┼──▶ AggregateState ──▶ PeriodicFlusher ──┐
//!                 └────────────────────────────┘                                          │
//!                                                                                         ▼
//!                 MemorySnapshotScheduler ──────────────────────────────────────▶ working directory
//!                          │
//!                          └── FatalReporter ──▶ Monitor::wait_fatal()
//! ```
//!
//! Start order is session, flusher, memory tracking; shutdown runs in reverse.
//! Must be started from within a tokio runtime.

use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::domain::{FatalError, MonitorError};
use crate::fatal::{fatal_channel, FatalReceiver, FatalReporter};
use crate::memory::MemorySnapshotScheduler;
use crate::pinning::{AggregateState, EventStreamSession, PeriodicFlusher, PinningEventHandler, Sampler};
use crate::stream::EventSource;
use crate::workdir::WorkingDirectoryProvider;

pub struct Monitor {
    config: MonitorConfig,
    workdir: Arc<WorkingDirectoryProvider>,
    state: Arc<AggregateState>,
    session: EventStreamSession,
    memory: Option<Arc<MemorySnapshotScheduler>>,
    fatal_tx: FatalReporter,
    fatal_rx: FatalReceiver,
    cancel: CancellationToken,
    flusher: Option<JoinHandle<()>>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, source: Arc<dyn EventSource>) -> Self {
        let workdir = Arc::new(match &config.workdir_base {
            Some(base) => WorkingDirectoryProvider::with_base(base),
            None => WorkingDirectoryProvider::new(),
        });
        Self::with_workdir(config, source, workdir)
    }

    /// Share an existing working directory provider
    pub fn with_workdir(
        config: MonitorConfig,
        source: Arc<dyn EventSource>,
        workdir: Arc<WorkingDirectoryProvider>,
    ) -> Self {
        let (fatal_tx, fatal_rx) = fatal_channel();
        let state = Arc::new(AggregateState::new());
        let handler = Arc::new(PinningEventHandler::new(
            Arc::clone(&state),
            Sampler::with_probability(config.sample_probability),
        ));
        let session = EventStreamSession::new(source, handler, config.stream.clone());
        let memory = config.memory.clone().map(|memory| {
            Arc::new(MemorySnapshotScheduler::new(memory, Arc::clone(&workdir), fatal_tx.clone()))
        });

        Self {
            config,
            workdir,
            state,
            session,
            memory,
            fatal_tx,
            fatal_rx,
            cancel: CancellationToken::new(),
            flusher: None,
        }
    }

    /// Start the session, the flusher and memory tracking
    ///
    /// # Errors
    /// Subscription failure, or a [`FatalError`] from working directory
    /// creation or the memory baseline. Subsystems already started are left
    /// running; call [`Monitor::shutdown`].
    pub async fn start(&mut self) -> Result<(), MonitorError> {
        self.session.start()?;

        if self.flusher.is_none() {
            let flusher =
                PeriodicFlusher::new(Arc::clone(&self.state), &self.workdir, self.config.flush_interval)?;
            self.flusher = Some(flusher.spawn(self.cancel.child_token()));
        }

        if let Some(memory) = &self.memory {
            let memory = Arc::clone(memory);
            tokio::task::spawn_blocking(move || memory.start())
                .await
                .map_err(|e| FatalError::ToolIo(std::io::Error::other(e.to_string())))??;
        }

        info!("Pinning monitor started");
        Ok(())
    }

    /// Wait for a background subsystem to report an unrecoverable error
    pub async fn wait_fatal(&mut self) -> Option<FatalError> {
        self.fatal_rx.recv().await
    }

    /// Stop memory tracking, flush pending details and close the session
    pub async fn shutdown(&mut self) {
        if let Some(memory) = &self.memory {
            let memory = Arc::clone(memory);
            if let Err(e) = tokio::task::spawn_blocking(move || memory.stop()).await {
                error!("Memory snapshot scheduler failed to stop: {e}");
            }
        }

        self.cancel.cancel();
        if let Some(flusher) = self.flusher.take() {
            if let Err(e) = flusher.await {
                error!("Flusher task failed: {e}");
            }
        }

        self.session.stop();
        info!("Pinning monitor stopped (total pinned events: {})", self.state.event_count());
    }

    pub fn state(&self) -> &Arc<AggregateState> {
        &self.state
    }

    pub fn session(&self) -> &EventStreamSession {
        &self.session
    }

    /// Working directory, creating it if nothing has yet
    ///
    /// # Errors
    /// [`FatalError::WorkDirCreation`]
    pub fn workdir(&self) -> Result<PathBuf, FatalError> {
        self.workdir.get()
    }

    /// Reporter for fatal errors raised outside the monitor's own subsystems
    pub fn fatal_reporter(&self) -> FatalReporter {
        self.fatal_tx.clone()
    }
}
