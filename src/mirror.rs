//! State mirror and event bridge.
//!
//! One writer (the session actor) replaces the whole [`CameraState`] on every
//! change; readers get the latest `Arc` and never observe a half-applied
//! update. Events fan out to every subscriber through its own unbounded
//! queue, so a slow reader never causes another to miss or reorder events.

use crate::assert_invariant;
use crate::types::{CameraEvent, CameraState};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

/// Receiving end of the event stream.
pub type EventStream = mpsc::UnboundedReceiver<CameraEvent>;

pub struct StateMirror {
    state: watch::Sender<Arc<CameraState>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<CameraEvent>>>,
}

impl StateMirror {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(CameraState::default()));
        Self {
            state,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<CameraState> {
        self.state.borrow().clone()
    }

    /// Receiver that always yields the most recent snapshot; no history.
    pub fn watch(&self) -> watch::Receiver<Arc<CameraState>> {
        self.state.subscribe()
    }

    /// Events produced from now on, in production order.
    pub fn subscribe(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        rx
    }

    /// Apply `change` to a copy of the current snapshot and publish the copy.
    pub(crate) fn update<F>(&self, change: F) -> Arc<CameraState>
    where
        F: FnOnce(&mut CameraState),
    {
        let mut next = (**self.state.borrow()).clone();
        change(&mut next);
        next.version = next.version.wrapping_add(1);

        assert_invariant!(
            next.zoom.is_ordered(),
            "Published zoom range must satisfy 0 < min <= current <= max",
            "mirror::update"
        );

        let next = Arc::new(next);
        self.state.send_replace(next.clone());
        next
    }

    pub(crate) fn emit(&self, event: CameraEvent) {
        log::debug!("Event: {:?}", event);
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for StateMirror {
    fn default() -> Self {
        Self::new()
    }
}
