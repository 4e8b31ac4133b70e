//! Pinned-event observation pipeline
//!
//! - `session`: subscription lifecycle against an [`EventSource`](crate::stream::EventSource)
//! - `handler`: per-event counting, sampling and rendering
//! - `formatter`: text rendering of one event
//! - `sampling`: pluggable sampling decision
//! - `aggregate`: counter + pending-detail buffer shared with the flusher
//! - `flusher`: periodic heartbeat and append-only detail file

pub mod aggregate;
pub mod flusher;
pub mod formatter;
pub mod handler;
pub mod sampling;
pub mod session;

// Re-export common types
pub use aggregate::AggregateState;
pub use flusher::{FlushReport, PeriodicFlusher, DEFAULT_FLUSH_INTERVAL, DETAILS_FILE_NAME};
pub use formatter::{format_event, format_stack_trace, STACK_TRACE_MAX_DEPTH};
pub use handler::PinningEventHandler;
pub use sampling::{FixedSource, RandomSource, Sampler, ThreadRngSource};
pub use session::EventStreamSession;
