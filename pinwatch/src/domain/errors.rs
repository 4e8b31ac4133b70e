//! Structured error types for pinwatch
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! [`FatalError`] is never handled where it is raised: it travels to the
//! supervisor, which logs it and terminates the process.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FatalError {
    #[error("Failed to create working directory under {base}: {source}")]
    WorkDirCreation {
        base: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Diagnostic tool home is not set (expected env var {var} or --tool-home)")]
    ToolHomeMissing { var: String },

    #[error("Failed to start diagnostic tool {tool}: {source}")]
    ToolSpawn {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Baseline command failed with exit code: {}", exit_label(.exit_code))]
    BaselineFailed { exit_code: Option<i32>, stdout: String, stderr: String },

    #[error("Diff command failed with exit code: {} (output: {})", exit_label(.exit_code), .output.display())]
    DiffFailed { exit_code: Option<i32>, output: PathBuf },

    #[error("Failed to create diff output file {path}: {source}")]
    DiffOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Diagnostic tool {command} did not finish within {timeout:?}")]
    ToolTimeout { command: String, timeout: Duration },

    #[error("Diagnostic tool I/O error: {0}")]
    ToolIo(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Event stream already has an open subscription")]
    AlreadySubscribed,

    #[error("Failed to spawn delivery thread: {0}")]
    DeliveryThread(#[source] std::io::Error),
}

/// Failure to bring the monitor up
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// Outcome of a single diagnostic tool invocation
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create output file {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with code {}", exit_label(.exit_code))]
    NonZeroExit {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        /// File holding stdout when it was redirected to disk
        output: Option<PathBuf>,
    },

    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("Invocation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Whether the invocation was stopped on request rather than failing
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Cancelled)
    }
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "<terminated by signal>".to_string(), |c| c.to_string())
}
