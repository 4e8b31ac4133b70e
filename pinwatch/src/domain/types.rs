//! Domain types providing compile-time safety and self-documentation

use chrono::{Local, NaiveDateTime};
use std::fmt;

/// `strftime` pattern for timestamps embedded in directory and file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Process ID
///
/// Identifies the process the diagnostic tool is pointed at (always our own).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl Pid {
    /// The PID of the running process
    pub fn current() -> Self {
        Pid(std::process::id())
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

/// Local time rendered for use in file names (`2024-05-01T13:37:00`)
pub fn file_timestamp(at: NaiveDateTime) -> String {
    at.format(FILE_TIMESTAMP_FORMAT).to_string()
}

/// Current local time rendered for use in file names
pub fn file_timestamp_now() -> String {
    file_timestamp(Local::now().naive_local())
}
