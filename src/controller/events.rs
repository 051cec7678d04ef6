//! Notifications raised by controllers and the registry
//!
//! Every subscriber gets its own unbounded channel. Emitting never blocks, so it
//! is safe from inside a poll. Dropping the receiver unsubscribes; closed
//! channels are pruned on the next emit.

use super::controller_handle::ControllerHandle;
use super::input::InputState;
use tokio::sync::mpsc;
use tracing::debug;

/// Events raised by a single [`Controller`](super::Controller)
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    ConnectedStateChanged { is_connected: bool },
    Polled,
}

/// Events raised by the [`ControllerRegistry`](crate::registry::ControllerRegistry)
///
/// A disconnected controller is already gone from the registry when its event
/// arrives, so the event carries the snapshot of its last poll.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    ControllerConnected(ControllerHandle),
    ControllerDisconnected {
        handle: ControllerHandle,
        last_state: InputState,
    },
}

impl RegistryEvent {
    pub fn handle(&self) -> &ControllerHandle {
        match self {
            RegistryEvent::ControllerConnected(handle)
            | RegistryEvent::ControllerDisconnected { handle, .. } => handle,
        }
    }
}

/// Fan-out list of event subscribers
#[derive(Debug)]
pub struct Subscribers<E> {
    senders: Vec<mpsc::UnboundedSender<E>>,
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self {
            senders: Vec::new(),
        }
    }
}

impl<E: Clone> Subscribers<E> {
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        rx
    }

    pub fn emit(&mut self, event: E) {
        let before = self.senders.len();
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());

        let dropped = before - self.senders.len();
        if dropped > 0 {
            debug!("Pruned {} closed subscriber(s)", dropped);
        }
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
