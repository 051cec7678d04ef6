//! Boundary to the native device layer
//!
//! The device layer does the actual enumeration, HID polling and haptic output.
//! This crate only talks to it through [`DeviceLayer`]. Two types cross the
//! boundary in the other direction and may be used from any thread:
//!
//! - [`ConnectionSink`] - enqueues connect/disconnect notifications for the
//!   registry, which applies them on its own thread during
//!   [`process_notifications`](crate::registry::ControllerRegistry::process_notifications)
//! - [`DiscoveryCompletion`] - one-shot token that resolves a pending wireless
//!   discovery
//!
//! The in-flight marker for wireless discovery is a [`DiscoveryGate`] owned by
//! the device layer, so every registry driving the same native layer shares it
//! and at most one discovery is outstanding at a time.
//!
//! ```text
//! device thread ──[DeviceNotification]──► queue ──► ControllerRegistry (game loop)
//!              ──[DiscoveryCompletion]──► PendingDiscovery
//! ```

pub mod gilrs_backend;

#[cfg(test)]
pub(crate) mod testing;

use crate::controller::{
    ControllerHandle, ControllerId, InputName, InputState, LightColor, RenderingMode, SymbolScale,
    TriggerEffect, TriggerSide,
};
use crate::error::RegistryError;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

pub use gilrs_backend::{GilrsDevice, GilrsSettings};

/// Capabilities consumed from the native device layer
pub trait DeviceLayer: Send + Sync {
    /// Fresh snapshot for one controller
    fn poll_controller(&self, id: &ControllerId) -> InputState;

    /// Every controller the device layer currently considers connected
    fn connected_controllers(&self) -> Vec<ControllerHandle>;

    /// Registers where connect/disconnect notifications go
    fn set_connection_handlers(&self, sink: ConnectionSink);

    /// Starts looking for wireless controllers; `on_complete` must be invoked
    /// once the discovery pass is over
    fn start_wireless_discovery(&self, on_complete: DiscoveryCompletion);

    fn stop_wireless_discovery(&self);

    /// In-flight marker shared by everyone starting discoveries on this layer
    fn discovery_gate(&self) -> &DiscoveryGate;

    fn set_light_color(&self, id: &ControllerId, color: LightColor);

    fn set_adaptive_trigger(&self, id: &ControllerId, side: TriggerSide, effect: TriggerEffect);

    /// Glyph for an input as drawn on this controller, if the device layer has one
    fn symbol_for_input(
        &self,
        id: &ControllerId,
        input: InputName,
        scale: SymbolScale,
        rendering_mode: RenderingMode,
    ) -> Option<SymbolImage>;
}

/// RGBA glyph image handed out by the device layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Connection change reported by the device layer
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceNotification {
    Connected(ControllerHandle),
    Disconnected(ControllerHandle),
}

/// Thread-safe entry point for connection notifications
#[derive(Clone, Debug)]
pub struct ConnectionSink {
    sender: mpsc::UnboundedSender<DeviceNotification>,
}

impl ConnectionSink {
    pub(crate) fn new(sender: mpsc::UnboundedSender<DeviceNotification>) -> Self {
        Self { sender }
    }

    pub fn on_connected(&self, handle: ControllerHandle) {
        self.notify(DeviceNotification::Connected(handle));
    }

    pub fn on_disconnected(&self, handle: ControllerHandle) {
        self.notify(DeviceNotification::Disconnected(handle));
    }

    fn notify(&self, notification: DeviceNotification) {
        debug!("Queueing device notification: {:?}", notification);
        if let Err(e) = self.sender.send(notification) {
            debug!("Registry is gone, dropping notification: {:?}", e.0);
        }
    }
}

pub(crate) type DiscoverySlot = Arc<Mutex<Option<oneshot::Sender<()>>>>;

/// Allows one outstanding wireless discovery at a time
#[derive(Debug, Default)]
pub struct DiscoveryGate {
    slot: DiscoverySlot,
}

impl DiscoveryGate {
    /// Marks a discovery in flight and hands out its completion token
    pub(crate) fn open(
        &self,
    ) -> Result<(DiscoveryCompletion, oneshot::Receiver<()>), RegistryError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(RegistryError::DiscoveryInProgress);
        }

        let (tx, rx) = oneshot::channel();
        *slot = Some(tx);
        Ok((DiscoveryCompletion::new(self.slot.clone()), rx))
    }

    pub fn is_open(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// One-shot completion callback for a wireless discovery
///
/// Consumed by [`complete`](Self::complete), so a discovery resolves at most
/// once. Dropping the token without completing it abandons the discovery; the
/// pending future then resolves with
/// [`RegistryError::DiscoveryAbandoned`](crate::error::RegistryError::DiscoveryAbandoned).
/// Either way the in-flight marker is cleared.
#[derive(Debug)]
pub struct DiscoveryCompletion {
    slot: DiscoverySlot,
}

impl DiscoveryCompletion {
    pub(crate) fn new(slot: DiscoverySlot) -> Self {
        Self { slot }
    }

    pub fn complete(mut self) {
        if let Some(tx) = self.take() {
            info!("Wireless discovery complete");
            if tx.send(()).is_err() {
                debug!("Nobody is waiting for the wireless discovery result");
            }
        }
    }

    fn take(&mut self) -> Option<oneshot::Sender<()>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Drop for DiscoveryCompletion {
    fn drop(&mut self) {
        if self.take().is_some() {
            warn!("Wireless discovery was dropped by the device layer without completing");
        }
    }
}
