//! # pinwatch - Pinned Worker Monitor
//!
//! pinwatch continuously observes a live process for "pinning" events: a
//! synchronous section (a blocking lock, a blocking syscall inside an async
//! task) holding a tokio worker thread so it cannot run other tasks. It
//! counts every event, renders a sampled fraction with its call stack, and
//! periodically persists that detail. Independently it drives an external
//! native memory tracking tool through a baseline and recurring diffs.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       User Application                          │
//! │           (PinProbe::enter() around synchronous sections)       │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ raw events (threshold-filtered)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 RecordingStream (delivery thread)               │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ CapturedEvent
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        pinwatch Monitor                         │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │  │   Session    │──▶│   Handler    │──▶│  Aggregate   │        │
//! │  │              │   │ (sampling)   │   │    State     │        │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘        │
//! │                                               ▼                 │
//! │  ┌──────────────┐                      ┌──────────────┐        │
//! │  │   Memory     │                      │   Flusher    │        │
//! │  │  Snapshots   │                      │  (1/minute)  │        │
//! │  └──────┬───────┘                      └──────┬───────┘        │
//! │         └──────────▶ working directory ◀──────┘                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`stream`]: the continuous event source seam and its in-process implementation
//!   - `recording`: bounded queue + single delivery thread per subscription
//!   - `probe`: producer handles and the RAII [`stream::PinnedSection`]
//!   - `stack_capture`: call stacks via the `backtrace` crate
//!
//! - [`pinning`]: session lifecycle, handler, formatter, sampling, aggregate state, flusher
//!
//! - [`memory`]: external diagnostic tool runner and the snapshot scheduler
//!
//! - [`workdir`]: lazily created, memoized working directory shared by both subsystems
//!
//! - [`fatal`]: typed fatal-error channel from background threads to the supervisor
//!
//! - [`monitor`]: the supervisor wiring everything together
//!
//! - [`cli`] / [`config`]: command-line parsing and the resulting configuration
//!
//! - [`domain`]: core types (Pid, timestamps) and the error taxonomy
//!
//! ## Output Files
//!
//! Inside the working directory (`<tmp>/pinwatch-<timestamp>-XXXXXX`):
//! - `pinned-thread-details`: one block per sampled event
//! - `jfr-leak-diff-<timestamp>` / `.err`: stdout/stderr of each memory diff
//!
//! ## Typical Usage
//!
//! ```bash
//! # Monitor with native memory tracking
//! PINWATCH_TOOL_HOME=/opt/memtrack RUST_LOG=info ./pinwatch
//!
//! # Pinning details only, with a synthetic load
//! RUST_LOG=info ./pinwatch --no-memory-tracking --pin-every-ms 200 --sample-percent 100
//! ```

// Expose modules for testing
pub mod cli;
pub mod config;
pub mod domain;
pub mod fatal;
pub mod memory;
pub mod monitor;
pub mod pinning;
pub mod stream;
pub mod workdir;
