//! Call-stack capture for probes
//!
//! Walks the current thread's stack with the `backtrace` crate and maps each
//! resolved symbol onto a [`StackFrame`]. Frames belonging to the capture
//! machinery itself are skipped so the first frame is the probe's caller.

use backtrace::Backtrace;
use pinwatch_common::StackFrame;

/// Symbol prefixes of the recording path: backtrace itself, the stream
/// (`record`, probes, the section guard's `Drop`) and the core adapters
/// between them
const INTERNAL_FRAMES: &[&str] = &[
    "backtrace::",
    "pinwatch::stream::",
    "<pinwatch::stream::",
    "core::ptr::drop_in_place<pinwatch::stream::",
    "core::bool::",
    "core::ops::function::",
];

/// Capture the current call stack, innermost frame first
///
/// Unresolvable frames are skipped. Returns an empty vector if nothing
/// resolved (stripped binary).
pub fn capture_stack() -> Vec<StackFrame> {
    let mut frames = Vec::new();
    capture_stack_into(&mut frames);
    frames
}

/// Like [`capture_stack`], filling a recycled buffer
pub fn capture_stack_into(frames: &mut Vec<StackFrame>) {
    frames.clear();
    let trace = Backtrace::new();
    frames.reserve(trace.frames().len());

    for frame in trace.frames() {
        // Inlined calls resolve to several symbols for one frame
        for symbol in frame.symbols() {
            let Some(name) = symbol.name() else {
                continue;
            };
            let name = name.to_string();
            if frames.is_empty() && is_internal(&name) {
                continue;
            }
            frames.push(StackFrame::from_symbol(&name, symbol.lineno().unwrap_or(0)));
        }
    }
}

fn is_internal(symbol: &str) -> bool {
    // The crate's own unit tests are callers, not recording machinery
    INTERNAL_FRAMES.iter().any(|prefix| symbol.starts_with(prefix))
        && !symbol.contains("::tests::")
}
