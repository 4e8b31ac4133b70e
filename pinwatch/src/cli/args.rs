//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::MonitorConfig;
use crate::memory::{SnapshotConfig, DEFAULT_TOOL_CATEGORY, DEFAULT_TOOL_HOME_VAR, DEFAULT_TOOL_NAME};
use crate::stream::StreamSettings;

#[derive(Parser, Debug)]
#[command(
    name = "pinwatch",
    about = "Watch for tokio workers pinned by synchronous sections and track native memory",
    after_help = "\
EXAMPLES:
    pinwatch --tool-home /opt/memtrack             Monitor with memory tracking
    pinwatch --no-memory-tracking --pin-every-ms 500   Demo load, pinning details only
    RUST_LOG=debug pinwatch --duration 60          Verbose run, stop after a minute"
)]
pub struct Args {
    /// Seconds between heartbeat/detail flushes
    #[arg(long, default_value = "60", value_name = "SECS")]
    pub flush_interval_secs: u64,

    /// Percentage of pinned events rendered with their stack trace
    #[arg(long, default_value = "1.0", value_name = "PERCENT")]
    pub sample_percent: f64,

    /// Minimum pinned duration delivered to the monitor
    #[arg(long, default_value = "1", value_name = "MS")]
    pub threshold_ms: u64,

    /// Discard raw events older than this when delivered
    #[arg(long, default_value = "5", value_name = "SECS")]
    pub max_age_secs: u64,

    /// Seconds between native memory diffs
    #[arg(long, default_value = "300", value_name = "SECS")]
    pub snapshot_period_secs: u64,

    /// Grace period for an in-flight diff at shutdown
    #[arg(long, default_value = "10", value_name = "SECS")]
    pub stop_grace_secs: u64,

    /// Home directory of the diagnostic tool (binary at <HOME>/bin/<NAME>)
    #[arg(long, env = DEFAULT_TOOL_HOME_VAR, value_name = "HOME")]
    pub tool_home: Option<PathBuf>,

    /// Diagnostic tool executable name
    #[arg(long, default_value = DEFAULT_TOOL_NAME, value_name = "NAME")]
    pub tool_name: String,

    /// Tracking category passed to every tool invocation
    #[arg(long, default_value = DEFAULT_TOOL_CATEGORY, value_name = "CATEGORY")]
    pub tool_category: String,

    /// Kill a tool invocation running longer than this (unlimited if omitted)
    #[arg(long, value_name = "SECS")]
    pub tool_timeout_secs: Option<u64>,

    /// Disable the baseline/diff native memory tracking
    #[arg(long)]
    pub no_memory_tracking: bool,

    /// Where to create the working directory (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    pub workdir_base: Option<PathBuf>,

    /// Stop after N seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Pin a worker thread every N milliseconds (0 = off)
    #[arg(long, default_value = "0", value_name = "MS")]
    pub pin_every_ms: u64,
}

impl Args {
    pub fn to_config(&self) -> MonitorConfig {
        let defaults = MonitorConfig::default();

        let memory = (!self.no_memory_tracking).then(|| SnapshotConfig {
            tool_home: self.tool_home.clone(),
            tool_name: self.tool_name.clone(),
            tool_category: self.tool_category.clone(),
            period: Duration::from_secs(self.snapshot_period_secs),
            stop_grace: Duration::from_secs(self.stop_grace_secs),
            tool_timeout: self.tool_timeout_secs.map(Duration::from_secs),
            ..SnapshotConfig::default()
        });

        MonitorConfig {
            stream: StreamSettings {
                threshold: Duration::from_millis(self.threshold_ms),
                max_age: Duration::from_secs(self.max_age_secs),
                ..defaults.stream
            },
            sample_probability: self.sample_percent / 100.0,
            flush_interval: Duration::from_secs(self.flush_interval_secs),
            workdir_base: self.workdir_base.clone(),
            memory,
        }
    }

    /// Demo load interval, if enabled
    pub fn pin_interval(&self) -> Option<Duration> {
        (self.pin_every_ms > 0).then(|| Duration::from_millis(self.pin_every_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config() {
        let args = Args::parse_from(["pinwatch"]);
        let config = args.to_config();
        let defaults = MonitorConfig::default();

        assert_eq!(config.stream, defaults.stream);
        assert!((config.sample_probability - defaults.sample_probability).abs() < 1e-12);
        assert_eq!(config.flush_interval, defaults.flush_interval);
        assert!(config.memory.is_some());
        assert!(args.pin_interval().is_none());
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "pinwatch",
            "--sample-percent",
            "50",
            "--threshold-ms",
            "20",
            "--tool-home",
            "/opt/memtrack",
            "--tool-timeout-secs",
            "30",
            "--pin-every-ms",
            "250",
        ]);
        let config = args.to_config();

        assert!((config.sample_probability - 0.5).abs() < 1e-12);
        assert_eq!(config.stream.threshold, Duration::from_millis(20));
        let memory = config.memory.unwrap();
        assert_eq!(memory.tool_home, Some(PathBuf::from("/opt/memtrack")));
        assert_eq!(memory.tool_timeout, Some(Duration::from_secs(30)));
        assert_eq!(args.pin_interval(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_memory_tracking_can_be_disabled() {
        let args = Args::parse_from(["pinwatch", "--no-memory-tracking"]);
        assert!(args.to_config().memory.is_none());
    }
}
