//! Domain model for pinwatch
//!
//! Core newtypes and the error taxonomy shared by every subsystem.

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{file_timestamp, file_timestamp_now, Pid};

pub use errors::{FatalError, MonitorError, SessionError, ToolError};
