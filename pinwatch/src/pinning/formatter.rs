//! Rendering of captured pinning events into human-readable text blocks
//!
//! Output shape (one block per sampled event):
//!
//! ```text
//! Thread 'tokio-runtime-worker' pinned for: 5ms at 2024-05-01T13:37:00.123, stacktrace:
//! 	my_app::handler#pin_carrier: 42
//! 	tokio::runtime::task::raw#poll: 255
//! 	(...)
//! ```

use pinwatch_common::{CapturedEvent, StackFrame};

/// Frames rendered per event before truncation
pub const STACK_TRACE_MAX_DEPTH: usize = 25;

/// Substituted when the source could not name the pinned thread
pub const UNKNOWN_THREAD: &str = "<unknown>";

/// Substituted when no call stack was captured
pub const NOT_AVAILABLE: &str = "<not available>";

/// Appended when the stack was deeper than [`STACK_TRACE_MAX_DEPTH`]
pub const TRUNCATION_MARKER: &str = "(...)";

/// Render one event as a text block
pub fn format_event(event: &CapturedEvent) -> String {
    let thread = event.thread_name.as_deref().unwrap_or(UNKNOWN_THREAD);
    let start = event.start_time.format("%Y-%m-%dT%H:%M:%S%.f");
    let stack = format_stack_trace(event.stack_trace.as_deref(), STACK_TRACE_MAX_DEPTH);

    format!(
        "Thread '{thread}' pinned for: {}ms at {start}, stacktrace: \n{stack}",
        event.duration_millis()
    )
}

/// Render frames one per line, tab-indented, capped at `max_depth`
///
/// A missing or empty stack renders as the [`NOT_AVAILABLE`] marker.
pub fn format_stack_trace(frames: Option<&[StackFrame]>, max_depth: usize) -> String {
    let Some(frames) = frames.filter(|f| !f.is_empty()) else {
        return format!("\t{NOT_AVAILABLE}");
    };

    let mut out = frames
        .iter()
        .take(max_depth)
        .map(|frame| format!("\t{}", format_frame(frame)))
        .collect::<Vec<_>>()
        .join("\n");

    if frames.len() > max_depth {
        out.push_str("\n\t");
        out.push_str(TRUNCATION_MARKER);
    }
    out
}

/// `TypeName#methodName: lineNumber`
pub fn format_frame(frame: &StackFrame) -> String {
    format!("{}#{}: {}", frame.type_name, frame.method_name, frame.line_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn frames(n: usize) -> Vec<StackFrame> {
        (0..n).map(|i| StackFrame::new("app::module", format!("f{i}"), u32::try_from(i).unwrap())).collect()
    }

    fn event(thread: Option<&str>, stack: Option<Vec<StackFrame>>) -> CapturedEvent {
        CapturedEvent {
            thread_name: thread.map(str::to_string),
            duration: Duration::from_millis(5),
            start_time: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_milli_opt(13, 37, 0, 123)
                .unwrap(),
            stack_trace: stack,
        }
    }

    #[test]
    fn test_format_event_header() {
        let text = format_event(&event(Some("worker-1"), Some(frames(1))));
        assert!(text.starts_with(
            "Thread 'worker-1' pinned for: 5ms at 2024-05-01T13:37:00.123, stacktrace: \n"
        ));
        assert!(text.ends_with("\tapp::module#f0: 0"));
    }

    #[test]
    fn test_missing_thread_uses_sentinel() {
        let text = format_event(&event(None, Some(frames(1))));
        assert!(text.contains("Thread '<unknown>'"));
    }

    #[test]
    fn test_missing_stack_uses_placeholder() {
        let text = format_event(&event(Some("w"), None));
        assert!(text.ends_with("\t<not available>"));
    }

    #[test]
    fn test_empty_stack_uses_placeholder() {
        assert_eq!(format_stack_trace(Some(&[]), STACK_TRACE_MAX_DEPTH), "\t<not available>");
    }

    #[test]
    fn test_stack_at_cap_is_not_truncated() {
        let out = format_stack_trace(Some(&frames(STACK_TRACE_MAX_DEPTH)), STACK_TRACE_MAX_DEPTH);
        assert_eq!(out.lines().count(), STACK_TRACE_MAX_DEPTH);
        assert!(!out.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_stack_over_cap_is_truncated() {
        let out = format_stack_trace(Some(&frames(40)), STACK_TRACE_MAX_DEPTH);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), STACK_TRACE_MAX_DEPTH + 1);
        assert_eq!(lines[STACK_TRACE_MAX_DEPTH], "\t(...)");
        assert_eq!(lines[STACK_TRACE_MAX_DEPTH - 1], "\tapp::module#f24: 24");
    }

    #[test]
    fn test_frames_keep_source_order() {
        let out = format_stack_trace(Some(&frames(3)), STACK_TRACE_MAX_DEPTH);
        assert_eq!(out, "\tapp::module#f0: 0\n\tapp::module#f1: 1\n\tapp::module#f2: 2");
    }
}
