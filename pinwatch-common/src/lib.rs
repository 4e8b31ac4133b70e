//! # Shared Event Vocabulary (Producers ↔ Monitor)
//!
//! Defines the data structures shared between the code that *records* pinning
//! events (probes compiled into the observed application) and the monitor
//! that *consumes* them.
//!
//! ## Key Types
//!
//! - [`CapturedEvent`] - One delivered pinning event (thread, duration, start, stack)
//! - [`StackFrame`] - One call-stack frame, innermost first
//!
//! A "pinning" event means a task held its runtime worker thread (the carrier)
//! for longer than it should have, preventing the worker from running other
//! tasks.

use chrono::NaiveDateTime;
use std::time::Duration;

// ============================================================================
// Stream Constants
// ============================================================================

/// Name of the continuous event the monitor subscribes to
pub const PINNED_EVENT_NAME: &str = "runtime.WorkerPinned";

/// Events shorter than this are never delivered
pub const DEFAULT_THRESHOLD: Duration = Duration::from_millis(1);

/// Raw events older than this at delivery time are discarded by the stream
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5);

// ============================================================================
// Shared Data Structures
// ============================================================================

/// One frame of a captured call stack
///
/// Frames are stored in call order as the source provides them: the frame that
/// was executing when the event fired comes first, the outermost caller last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackFrame {
    /// Owning type or module path (`tokio::runtime::task`)
    pub type_name: String,
    /// Function name (`poll`)
    pub method_name: String,
    /// Source line, 0 when unknown
    pub line_number: u32,
}

impl StackFrame {
    pub fn new(type_name: impl Into<String>, method_name: impl Into<String>, line_number: u32) -> Self {
        Self { type_name: type_name.into(), method_name: method_name.into(), line_number }
    }

    /// Split a fully qualified symbol (`a::b::c`) into type path and method.
    ///
    /// Symbols without a path separator keep an empty type name.
    pub fn from_symbol(symbol: &str, line_number: u32) -> Self {
        // Drop the trailing hash rustc appends to legacy mangled names
        let symbol = match symbol.rsplit_once("::h") {
            Some((head, hash))
                if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) =>
            {
                head
            }
            _ => symbol,
        };

        match last_top_level_separator(symbol) {
            Some(at) => Self::new(&symbol[..at], &symbol[at + 2..], line_number),
            None => Self::new("", symbol, line_number),
        }
    }
}

/// Byte offset of the last `::` outside generic arguments and qualified paths
fn last_top_level_separator(symbol: &str) -> Option<usize> {
    let bytes = symbol.as_bytes();
    let mut depth = 0_usize;
    let mut last = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                last = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    last
}

/// A delivered pinning event
///
/// Constructed once per delivery and never persisted as a struct; only its
/// rendered text reaches disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Name of the pinned thread, `None` when the source could not tell
    pub thread_name: Option<String>,
    /// How long the worker stayed pinned
    pub duration: Duration,
    /// Local wall-clock time at which pinning began
    pub start_time: NaiveDateTime,
    /// Call stack at the time of pinning, `None` if not captured
    pub stack_trace: Option<Vec<StackFrame>>,
}

impl CapturedEvent {
    /// Duration in whole milliseconds, saturating
    pub fn duration_millis(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_symbol_splits_path() {
        let frame = StackFrame::from_symbol("tokio::runtime::task::raw::poll", 42);
        assert_eq!(frame.type_name, "tokio::runtime::task::raw");
        assert_eq!(frame.method_name, "poll");
        assert_eq!(frame.line_number, 42);
    }

    #[test]
    fn test_from_symbol_ignores_separators_in_generics() {
        let frame = StackFrame::from_symbol(
            "core::ptr::drop_in_place<pinwatch::stream::probe::PinnedSection>",
            0,
        );
        assert_eq!(frame.type_name, "core::ptr");
        assert_eq!(frame.method_name, "drop_in_place<pinwatch::stream::probe::PinnedSection>");

        let frame = StackFrame::from_symbol(
            "<pinwatch::stream::probe::PinnedSection as core::ops::drop::Drop>::drop",
            71,
        );
        assert_eq!(frame.type_name, "<pinwatch::stream::probe::PinnedSection as core::ops::drop::Drop>");
        assert_eq!(frame.method_name, "drop");
    }

    #[test]
    fn test_from_symbol_strips_legacy_hash() {
        let frame = StackFrame::from_symbol("my_app::handler::run::h0123456789abcdef", 7);
        assert_eq!(frame.type_name, "my_app::handler");
        assert_eq!(frame.method_name, "run");
    }

    #[test]
    fn test_from_symbol_without_path() {
        let frame = StackFrame::from_symbol("main", 0);
        assert_eq!(frame.type_name, "");
        assert_eq!(frame.method_name, "main");
    }

    #[test]
    fn test_duration_millis_truncates() {
        let event = CapturedEvent { duration: Duration::from_micros(5_900), ..Default::default() };
        assert_eq!(event.duration_millis(), 5);
    }
}
