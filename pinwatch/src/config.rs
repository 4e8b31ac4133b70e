//! Monitor configuration
//!
//! Every knob with its default in one place; the CLI only overrides.

use std::path::PathBuf;
use std::time::Duration;

use crate::memory::SnapshotConfig;
use crate::pinning::{Sampler, DEFAULT_FLUSH_INTERVAL};
use crate::stream::StreamSettings;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Subscription settings for the pinned-event stream
    pub stream: StreamSettings,
    /// Fraction of events rendered into the detail file, in `[0, 1]`
    pub sample_probability: f64,
    pub flush_interval: Duration,
    /// Base directory for the shared working directory (system temp dir if unset)
    pub workdir_base: Option<PathBuf>,
    /// Native memory tracking; `None` disables the snapshot scheduler
    pub memory: Option<SnapshotConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stream: StreamSettings::default(),
            sample_probability: Sampler::DEFAULT_PROBABILITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            workdir_base: None,
            memory: Some(SnapshotConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{DEFAULT_SNAPSHOT_PERIOD, DEFAULT_STOP_GRACE};

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.stream.threshold, Duration::from_millis(1));
        assert_eq!(config.stream.max_age, Duration::from_secs(5));
        assert!(config.stream.stack_trace);
        assert!(config.stream.reuse);
        assert!((config.sample_probability - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.flush_interval, Duration::from_secs(60));

        let memory = config.memory.expect("memory tracking on by default");
        assert_eq!(memory.period, DEFAULT_SNAPSHOT_PERIOD);
        assert_eq!(memory.stop_grace, DEFAULT_STOP_GRACE);
        assert!(memory.tool_timeout.is_none());
    }
}
