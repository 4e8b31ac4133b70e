//! External diagnostic tool invocation
//!
//! The tool lives at `<home>/bin/<name>` and is invoked as
//! `<tool> <pid> <category> <subcommand>` with the shared working directory as
//! its cwd. Only exit code 0 counts as success.
//!
//! Invocations are synchronous: the calling thread polls the child until it
//! exits, is cancelled, or exceeds the optional timeout. Cancelled and
//! timed-out children are killed and reaped.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::warn;

use crate::domain::{file_timestamp_now, FatalError, Pid, ToolError};

/// Environment variable naming the tool's home directory
pub const DEFAULT_TOOL_HOME_VAR: &str = "PINWATCH_TOOL_HOME";

/// Executable name inside `<home>/bin`
pub const DEFAULT_TOOL_NAME: &str = "memtrack";

/// Category argument passed before every subcommand
pub const DEFAULT_TOOL_CATEGORY: &str = "native_memory";

pub const BASELINE_COMMAND: &str = "baseline";
pub const DIFF_COMMAND: &str = "detail.diff";

/// Prefix of the per-run diff output files
pub const DIFF_FILE_PREFIX: &str = "jfr-leak-diff-";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Resolve the tool home from an explicit path or the environment
///
/// # Errors
/// [`FatalError::ToolHomeMissing`] if neither is set
pub fn resolve_tool_home(explicit: Option<&Path>, home_var: &str) -> Result<PathBuf, FatalError> {
    if let Some(home) = explicit {
        return Ok(home.to_path_buf());
    }
    match std::env::var_os(home_var) {
        Some(home) if !home.is_empty() => Ok(PathBuf::from(home)),
        _ => Err(FatalError::ToolHomeMissing { var: home_var.to_string() }),
    }
}

/// `<home>/bin/<name>`
pub fn tool_path(home: &Path, name: &str) -> PathBuf {
    home.join("bin").join(name)
}

#[derive(Debug, Clone)]
pub struct DiagnosticTool {
    executable: PathBuf,
    pid: Pid,
    category: String,
    timeout: Option<Duration>,
}

impl DiagnosticTool {
    pub fn new(executable: impl Into<PathBuf>, pid: Pid, category: impl Into<String>) -> Self {
        Self { executable: executable.into(), pid, category: category.into(), timeout: None }
    }

    /// Kill invocations running longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Record the memory baseline, capturing output for diagnostics
    ///
    /// # Errors
    /// Spawn failure, timeout, or a non-zero exit carrying the captured output
    pub fn baseline(&self, workdir: &Path) -> Result<(), ToolError> {
        let mut stdout = tempfile::tempfile()?;
        let mut stderr = tempfile::tempfile()?;

        let mut child = self.spawn(BASELINE_COMMAND, workdir, &stdout, &stderr)?;
        let status = self.wait(&mut child, BASELINE_COMMAND, None)?;
        if status.success() {
            return Ok(());
        }

        Err(ToolError::NonZeroExit {
            command: BASELINE_COMMAND.to_string(),
            exit_code: status.code(),
            stdout: read_back(&mut stdout),
            stderr: read_back(&mut stderr),
            output: None,
        })
    }

    /// Run one diff, writing stdout to `jfr-leak-diff-<timestamp>` and
    /// stderr to the sibling `.err` file; returns the stdout file path
    ///
    /// # Errors
    /// Output file creation, spawn failure, timeout, cancellation, or non-zero exit
    pub fn diff(&self, workdir: &Path, cancel: &AtomicBool) -> Result<PathBuf, ToolError> {
        let name = format!("{DIFF_FILE_PREFIX}{}", file_timestamp_now());
        let out_path = workdir.join(&name);
        let err_path = workdir.join(format!("{name}.err"));

        let stdout = create_output(&out_path)?;
        let stderr = create_output(&err_path)?;

        let mut child = self.spawn(DIFF_COMMAND, workdir, &stdout, &stderr)?;
        let status = self.wait(&mut child, DIFF_COMMAND, Some(cancel))?;
        if status.success() {
            return Ok(out_path);
        }

        Err(ToolError::NonZeroExit {
            command: DIFF_COMMAND.to_string(),
            exit_code: status.code(),
            stdout: String::new(),
            stderr: std::fs::read_to_string(&err_path).unwrap_or_default(),
            output: Some(out_path),
        })
    }

    fn spawn(
        &self,
        subcommand: &str,
        workdir: &Path,
        stdout: &File,
        stderr: &File,
    ) -> Result<Child, ToolError> {
        Command::new(&self.executable)
            .arg(self.pid.0.to_string())
            .arg(&self.category)
            .arg(subcommand)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.try_clone()?))
            .stderr(Stdio::from(stderr.try_clone()?))
            .spawn()
            .map_err(|source| ToolError::Spawn { tool: self.executable.clone(), source })
    }

    fn wait(
        &self,
        child: &mut Child,
        command: &str,
        cancel: Option<&AtomicBool>,
    ) -> Result<ExitStatus, ToolError> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }

            if cancel.is_some_and(|c| c.load(Ordering::Acquire)) {
                kill_and_reap(child);
                return Err(ToolError::Cancelled);
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    kill_and_reap(child);
                    return Err(ToolError::Timeout { command: command.to_string(), timeout });
                }
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

fn create_output(path: &Path) -> Result<File, ToolError> {
    File::create(path).map_err(|source| ToolError::Output { path: path.to_path_buf(), source })
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("Failed to kill diagnostic tool (pid {}): {e}", child.id());
    }
    let _ = child.wait();
}

fn read_back(file: &mut File) -> String {
    let mut out = String::new();
    if file.seek(SeekFrom::Start(0)).is_ok() {
        let mut bytes = Vec::new();
        if file.read_to_end(&mut bytes).is_ok() {
            out = String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    out
}
