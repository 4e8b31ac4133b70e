//! Fatal error signalling
//!
//! Background threads never exit the process themselves. They hand a
//! [`FatalError`] to a [`FatalReporter`]; the supervisor owning the matching
//! [`FatalReceiver`] decides to terminate.

use log::error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::domain::FatalError;

/// Cloneable sending half, usable from any thread
#[derive(Clone, Debug)]
pub struct FatalReporter {
    tx: UnboundedSender<FatalError>,
}

/// Receiving half held by the supervisor
#[derive(Debug)]
pub struct FatalReceiver {
    rx: UnboundedReceiver<FatalError>,
}

pub fn fatal_channel() -> (FatalReporter, FatalReceiver) {
    let (tx, rx) = unbounded_channel();
    (FatalReporter { tx }, FatalReceiver { rx })
}

impl FatalReporter {
    /// Log and forward an unrecoverable error
    pub fn report(&self, err: FatalError) {
        error!("Unrecoverable diagnostic failure: {err}");
        if self.tx.send(err).is_err() {
            error!("No supervisor is listening for fatal errors");
        }
    }
}

impl FatalReceiver {
    /// Wait for the next fatal error; `None` once every reporter is gone
    pub async fn recv(&mut self) -> Option<FatalError> {
        self.rx.recv().await
    }

    /// Blocking variant for non-async callers
    pub fn blocking_recv(&mut self) -> Option<FatalError> {
        self.rx.blocking_recv()
    }

    pub fn try_recv(&mut self) -> Option<FatalError> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_reaches_receiver() {
        let (reporter, mut receiver) = fatal_channel();
        let from_thread = reporter.clone();
        std::thread::spawn(move || {
            from_thread.report(FatalError::ToolHomeMissing { var: "X".into() });
        })
        .join()
        .unwrap();

        let err = receiver.try_recv().expect("fatal error forwarded");
        assert!(matches!(err, FatalError::ToolHomeMissing { .. }));
        assert!(receiver.try_recv().is_none());
    }
}
