//! Out-of-process native memory tracking
//!
//! - `tool`: Invokes the external diagnostic tool (`baseline`, `detail.diff`)
//! - `scheduler`: One baseline at start, then fixed-rate diffs on a dedicated thread

mod scheduler;
mod tool;

pub use scheduler::{
    MemorySnapshotScheduler, SnapshotConfig, DEFAULT_SNAPSHOT_PERIOD, DEFAULT_STOP_GRACE,
};
pub use tool::{
    resolve_tool_home, tool_path, DiagnosticTool, BASELINE_COMMAND, DEFAULT_TOOL_CATEGORY,
    DEFAULT_TOOL_HOME_VAR, DEFAULT_TOOL_NAME, DIFF_COMMAND, DIFF_FILE_PREFIX,
};
