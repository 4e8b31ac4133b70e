//! # Memory Snapshot Scheduling
//!
//! NotStarted → Running → Stopped, with `start()`/`stop()` guarded by a
//! compare-and-set on the running flag.
//!
//! ## Start
//!
//! 1. Resolve the working directory, our PID and the tool location (all logged)
//! 2. Run the `baseline` command synchronously; any failure is fatal and is
//!    returned to the caller with the tool's output logged line by line
//! 3. Spawn a dedicated thread running `detail.diff` at a fixed rate
//!    (first run one period after start)
//!
//! A diff run that fails is reported through the [`FatalReporter`] and ends
//! the schedule; there is no retry.
//!
//! ## Stop
//!
//! Signals the thread, waits up to the grace period for an in-flight run,
//! then kills the tool and joins.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{error, info, warn};

use super::tool::{
    resolve_tool_home, tool_path, DiagnosticTool, DEFAULT_TOOL_CATEGORY, DEFAULT_TOOL_HOME_VAR,
    DEFAULT_TOOL_NAME,
};
use crate::domain::{FatalError, Pid, ToolError};
use crate::fatal::FatalReporter;
use crate::workdir::WorkingDirectoryProvider;

pub const DEFAULT_SNAPSHOT_PERIOD: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

/// Where the tool lives and how often it runs
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Overrides `tool_home_var` when set
    pub tool_home: Option<PathBuf>,
    pub tool_home_var: String,
    pub tool_name: String,
    pub tool_category: String,
    pub period: Duration,
    pub stop_grace: Duration,
    /// None waits for the tool indefinitely
    pub tool_timeout: Option<Duration>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            tool_home: None,
            tool_home_var: DEFAULT_TOOL_HOME_VAR.to_string(),
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            tool_category: DEFAULT_TOOL_CATEGORY.to_string(),
            period: DEFAULT_SNAPSHOT_PERIOD,
            stop_grace: DEFAULT_STOP_GRACE,
            tool_timeout: None,
        }
    }
}

struct Schedule {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    cancel: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

pub struct MemorySnapshotScheduler {
    config: SnapshotConfig,
    workdir: Arc<WorkingDirectoryProvider>,
    fatal: FatalReporter,
    running: AtomicBool,
    schedule: Mutex<Option<Schedule>>,
}

impl MemorySnapshotScheduler {
    #[must_use]
    pub fn new(
        config: SnapshotConfig,
        workdir: Arc<WorkingDirectoryProvider>,
        fatal: FatalReporter,
    ) -> Self {
        Self { config, workdir, fatal, running: AtomicBool::new(false), schedule: Mutex::new(None) }
    }

    /// Take the baseline and schedule periodic diffs
    ///
    /// # Errors
    /// Any [`FatalError`] raised before the schedule exists; the caller is
    /// expected to terminate the process
    pub fn start(&self) -> Result<(), FatalError> {
        let mut slot = self.slot();
        if self.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Ok(());
        }

        info!("Starting memory snapshot scheduler");
        match self.begin() {
            Ok(schedule) => {
                *slot = Some(schedule);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Cancel the schedule, allowing an in-flight run to finish within the grace period
    pub fn stop(&self) {
        let schedule = {
            let mut slot = self.slot();
            if self.running.compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire).is_err()
            {
                return;
            }
            slot.take()
        };
        info!("Stopping memory snapshot scheduler");

        let Some(schedule) = schedule else {
            return;
        };
        drop(schedule.stop_tx);

        if let Err(RecvTimeoutError::Timeout) = schedule.done_rx.recv_timeout(self.config.stop_grace) {
            warn!(
                "Diff run still in progress after {:?}, cancelling it",
                self.config.stop_grace
            );
            schedule.cancel.store(true, Ordering::Release);
        }
        if schedule.thread.join().is_err() {
            error!("Memory snapshot thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether the recurring diff schedule exists
    pub fn has_schedule(&self) -> bool {
        self.slot().is_some()
    }

    fn begin(&self) -> Result<Schedule, FatalError> {
        let workdir = self.workdir.get()?;
        let pid = Pid::current();
        let home = resolve_tool_home(self.config.tool_home.as_deref(), &self.config.tool_home_var)?;
        let executable = tool_path(&home, &self.config.tool_name);
        info!("Using tool home: {}", home.display());
        info!("Using tool: {}", executable.display());
        info!("Using {pid}");

        let tool = DiagnosticTool::new(executable, pid, self.config.tool_category.clone())
            .with_timeout(self.config.tool_timeout);

        tool.baseline(&workdir).map_err(baseline_failure)?;
        info!("Executed baseline command in directory: {}", workdir.display());

        info!("Scheduling a diff run every {:?}", self.config.period);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (done_tx, done_rx) = bounded::<()>(1);
        let cancel = Arc::new(AtomicBool::new(false));

        let period = self.config.period;
        let fatal = self.fatal.clone();
        let thread_cancel = Arc::clone(&cancel);
        let thread = std::thread::Builder::new()
            .name("pinwatch-snapshot".to_string())
            .spawn(move || {
                run_schedule(&tool, &workdir, period, &stop_rx, &thread_cancel, &fatal);
                drop(done_tx);
            })
            .map_err(FatalError::ToolIo)?;

        Ok(Schedule { stop_tx, done_rx, cancel, thread })
    }

    fn slot(&self) -> MutexGuard<'_, Option<Schedule>> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MemorySnapshotScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_schedule(
    tool: &DiagnosticTool,
    workdir: &Path,
    period: Duration,
    stop_rx: &Receiver<()>,
    cancel: &AtomicBool,
    fatal: &FatalReporter,
) {
    // Fixed rate: deadlines advance by `period` regardless of run time
    let mut next = Instant::now() + period;
    loop {
        match stop_rx.recv_deadline(next) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        next += period;

        info!("Running {} diff command", tool.executable().display());
        match tool.diff(workdir, cancel) {
            Ok(output) => info!(
                "Diff executed, saved its output into file {} in directory: {}",
                output.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
                workdir.display()
            ),
            Err(e) if e.is_cancelled() => {
                warn!("Diff run cancelled during shutdown");
                break;
            }
            Err(e) => {
                fatal.report(diff_failure(e));
                break;
            }
        }
    }
}

fn baseline_failure(err: ToolError) -> FatalError {
    match err {
        ToolError::NonZeroExit { exit_code, stdout, stderr, .. } => {
            error!(
                "Baseline command failed with exit code: {}",
                exit_code.map_or_else(|| "<signal>".to_string(), |c| c.to_string())
            );
            for line in stdout.lines() {
                error!("stdout: {line}");
            }
            for line in stderr.lines() {
                error!("stderr: {line}");
            }
            FatalError::BaselineFailed { exit_code, stdout, stderr }
        }
        other => tool_failure(other),
    }
}

fn diff_failure(err: ToolError) -> FatalError {
    match err {
        ToolError::NonZeroExit { exit_code, stderr, output, .. } => {
            for line in stderr.lines() {
                error!("stderr: {line}");
            }
            FatalError::DiffFailed { exit_code, output: output.unwrap_or_default() }
        }
        ToolError::Output { path, source } => FatalError::DiffOutput { path, source },
        other => tool_failure(other),
    }
}

fn tool_failure(err: ToolError) -> FatalError {
    match err {
        ToolError::Spawn { tool, source } => FatalError::ToolSpawn { tool, source },
        ToolError::Timeout { command, timeout } => FatalError::ToolTimeout { command, timeout },
        ToolError::Output { source, .. } | ToolError::Io(source) => FatalError::ToolIo(source),
        ToolError::NonZeroExit { exit_code, output, .. } => {
            FatalError::DiffFailed { exit_code, output: output.unwrap_or_default() }
        }
        ToolError::Cancelled => {
            FatalError::ToolIo(std::io::Error::new(std::io::ErrorKind::Interrupted, "cancelled"))
        }
    }
}
