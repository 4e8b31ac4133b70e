//! Lifecycle of the pinned-event subscription
//!
//! Two states, Stopped and Running. `start()` while Running and `stop()` while
//! Stopped are no-ops. Transitions are decided by a compare-and-set on the
//! running flag, taken under the subscription lock so a concurrent `stop()`
//! never observes Running without the subscription in place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;

use super::PinningEventHandler;
use crate::domain::SessionError;
use crate::stream::{EventSource, StreamSettings, Subscription};

pub struct EventStreamSession {
    source: Arc<dyn EventSource>,
    handler: Arc<PinningEventHandler>,
    settings: StreamSettings,
    running: AtomicBool,
    subscription: Mutex<Option<Box<dyn Subscription>>>,
}

impl EventStreamSession {
    #[must_use]
    pub fn new(
        source: Arc<dyn EventSource>,
        handler: Arc<PinningEventHandler>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            source,
            handler,
            settings,
            running: AtomicBool::new(false),
            subscription: Mutex::new(None),
        }
    }

    /// Subscribe the handler to the event source
    ///
    /// # Errors
    /// Returns the source's error; the session stays Stopped
    pub fn start(&self) -> Result<(), SessionError> {
        let mut slot = self.slot();
        if self.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Ok(());
        }

        match self.source.subscribe(&self.settings, Arc::clone(&self.handler) as _) {
            Ok(subscription) => {
                *slot = Some(subscription);
                info!("Started {} session", self.settings.event_name);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Close the subscription; safe to call at any time
    pub fn stop(&self) {
        let mut slot = self.slot();
        if self.running.compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return;
        }

        if let Some(mut subscription) = slot.take() {
            subscription.close();
        }
        info!("Stopped {} session", self.settings.event_name);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Box<dyn Subscription>>> {
        self.subscription.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for EventStreamSession {
    fn drop(&mut self) {
        self.stop();
    }
}
