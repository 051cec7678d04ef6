//! Controller registry - the live set of controllers
//!
//! The registry owns exactly one [`Controller`] per connected identity. It is
//! created by the input subsystem at start-up and dropped at shutdown; nothing
//! else keeps controllers alive, so a controller removed on disconnect is gone.
//!
//! # Threading
//!
//! The registry itself lives on the game-loop thread. The device layer reports
//! connection changes through a [`ConnectionSink`] from whatever thread it likes;
//! those land in a queue that [`tick`](ControllerRegistry::tick) drains before
//! polling, so every mutation of the controller map happens on one thread.
//!
//! ```text
//! loop {
//!     registry.tick();           // apply queued connects/disconnects, poll all
//!     for controller in registry.controllers_mut() {
//!         if controller.button_down(InputName::ButtonSouth, DEFAULT_THRESHOLD) { .. }
//!     }
//! }
//! ```

use crate::controller::{Controller, ControllerHandle, ControllerId, RegistryEvent, Subscribers};
use crate::device::{ConnectionSink, DeviceLayer, DeviceNotification};
use crate::error::RegistryError;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Future returned by [`ControllerRegistry::start_wireless_discovery`]
///
/// Resolves once the device layer reports that the discovery pass is over.
/// Stopping discovery does not resolve it.
#[derive(Debug)]
pub struct PendingDiscovery {
    receiver: oneshot::Receiver<()>,
}

impl Future for PendingDiscovery {
    type Output = Result<(), RegistryError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| RegistryError::DiscoveryAbandoned))
    }
}

/// Owner of every tracked controller
pub struct ControllerRegistry {
    device: Arc<dyn DeviceLayer>,
    controllers: HashMap<ControllerId, Controller>,
    subscribers: Subscribers<RegistryEvent>,
    notification_tx: mpsc::UnboundedSender<DeviceNotification>,
    notification_rx: mpsc::UnboundedReceiver<DeviceNotification>,
    sinks_registered: usize,
}

impl ControllerRegistry {
    pub fn new(device: Arc<dyn DeviceLayer>) -> Self {
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        debug!("Created controller registry");

        Self {
            device,
            controllers: HashMap::new(),
            subscribers: Subscribers::default(),
            notification_tx,
            notification_rx,
            sinks_registered: 0,
        }
    }

    /// Hooks the registry up to the device layer's connection notifications
    ///
    /// Meant to be called once. A second call registers a second sink and every
    /// notification then arrives twice, which is harmless but wasteful.
    pub fn initialize(&mut self) {
        if self.sinks_registered > 0 {
            warn!(
                "Controller registry initialized {} time(s) already, registering another connection sink",
                self.sinks_registered
            );
        }

        self.device
            .set_connection_handlers(ConnectionSink::new(self.notification_tx.clone()));
        self.sinks_registered += 1;
        info!("Controller registry listening for connection changes");
    }

    /// Receiver for registry events; drop it to unsubscribe
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RegistryEvent> {
        self.subscribers.subscribe()
    }

    /// Tracks a newly connected controller, or refreshes the handle of a known one
    pub fn on_connected(&mut self, handle: ControllerHandle) {
        if let Some(controller) = self.controllers.get_mut(&handle.id) {
            debug!("Controller {} already tracked", handle);
            controller.refresh_handle(handle);
            return;
        }

        info!("Controller connected: {}", handle);
        let controller = Controller::new(handle.clone(), self.device.clone());
        self.controllers.insert(handle.id.clone(), controller);
        self.subscribers.emit(RegistryEvent::ControllerConnected(handle));
    }

    /// Marks a controller disconnected, notifies everyone, and forgets it
    pub fn on_disconnected(&mut self, handle: ControllerHandle) {
        let Some(mut controller) = self.controllers.remove(&handle.id) else {
            debug!("Ignoring disconnect of untracked controller {}", handle);
            return;
        };

        info!("Controller disconnected: {}", handle);
        controller.refresh_handle(handle.clone());
        controller.mark_disconnected();
        self.subscribers.emit(RegistryEvent::ControllerDisconnected {
            handle,
            last_state: *controller.input_state(),
        });
    }

    /// Applies every queued device notification, in arrival order
    pub fn process_notifications(&mut self) -> usize {
        let mut applied = 0;

        while let Ok(notification) = self.notification_rx.try_recv() {
            match notification {
                DeviceNotification::Connected(handle) => self.on_connected(handle),
                DeviceNotification::Disconnected(handle) => self.on_disconnected(handle),
            }
            applied += 1;
        }

        if applied > 0 {
            debug!("Applied {} device notification(s)", applied);
        }
        applied
    }

    /// Polls every connected controller
    pub fn poll_all(&mut self) {
        for controller in self.controllers.values_mut() {
            if controller.is_connected() {
                controller.poll();
            }
        }
    }

    /// One frame: apply queued connection changes, then poll
    pub fn tick(&mut self) {
        self.process_notifications();
        self.poll_all();
    }

    /// Reconciles with the device layer's list of connected controllers
    ///
    /// Catches devices that connected before [`initialize`](Self::initialize) or
    /// whose notification got lost. Known controllers keep their press history.
    pub fn enumerate(&mut self) -> impl Iterator<Item = &Controller> + '_ {
        let handles = self.device.connected_controllers();
        debug!("Device layer reports {} connected controller(s)", handles.len());

        for handle in handles {
            self.on_connected(handle);
        }

        self.controllers.values()
    }

    pub fn get(&self, id: &ControllerId) -> Option<&Controller> {
        self.controllers.get(id)
    }

    pub fn get_mut(&mut self, id: &ControllerId) -> Option<&mut Controller> {
        self.controllers.get_mut(id)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &Controller> + '_ {
        self.controllers.values()
    }

    pub fn controllers_mut(&mut self) -> impl Iterator<Item = &mut Controller> + '_ {
        self.controllers.values_mut()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Starts a wireless discovery pass
    ///
    /// Only one discovery may be outstanding on a device layer, whichever
    /// registry started it; a second call before the first completes fails
    /// with [`RegistryError::DiscoveryInProgress`].
    pub fn start_wireless_discovery(&mut self) -> Result<PendingDiscovery, RegistryError> {
        let (completion, receiver) = match self.device.discovery_gate().open() {
            Ok(opened) => opened,
            Err(e) => {
                warn!("Wireless discovery requested while one is still running");
                return Err(e);
            }
        };

        info!("Starting wireless discovery");
        self.device.start_wireless_discovery(completion);

        Ok(PendingDiscovery { receiver })
    }

    /// Forwards a stop request; a pending discovery stays pending
    pub fn stop_wireless_discovery(&mut self) {
        info!("Stopping wireless discovery");
        self.device.stop_wireless_discovery();
    }

    pub fn is_discovering(&self) -> bool {
        self.device.discovery_gate().is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{BatteryState, ControllerEvent, InputName, DEFAULT_THRESHOLD};
    use crate::device::testing::{FakeDevice, ForwardedCommand};

    fn registry() -> (Arc<FakeDevice>, ControllerRegistry) {
        let device = Arc::new(FakeDevice::default());
        let mut registry = ControllerRegistry::new(device.clone());
        registry.initialize();
        (device, registry)
    }

    fn ids(registry: &mut ControllerRegistry) -> Vec<String> {
        let mut ids: Vec<String> = registry
            .enumerate()
            .map(|c| c.id().as_str().to_string())
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn connect_creates_one_controller_and_notifies() {
        let (_device, mut registry) = registry();
        let mut events = registry.subscribe();

        registry.on_connected(ControllerHandle::new("pad"));
        registry.on_connected(ControllerHandle::new("pad"));

        assert_eq!(registry.len(), 1);
        assert_eq!(
            events.try_recv(),
            Ok(RegistryEvent::ControllerConnected(ControllerHandle::new("pad")))
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn reconnect_refreshes_handle_without_losing_history() {
        let (device, mut registry) = registry();
        device.plug(ControllerHandle::new("pad"));
        device.update("pad", |s| s.button_a = 1.0);
        registry.on_connected(ControllerHandle::new("pad"));
        registry.poll_all();

        let id = ControllerId::new("pad");
        let controller = registry.get_mut(&id).unwrap();
        assert!(controller.button_down(InputName::ButtonSouth, DEFAULT_THRESHOLD));

        registry.on_connected(ControllerHandle::new("pad").with_vendor_name("DualSense"));
        registry.poll_all();

        let controller = registry.get_mut(&id).unwrap();
        assert_eq!(controller.handle().vendor_name.as_deref(), Some("DualSense"));
        assert!(!controller.button_down(InputName::ButtonSouth, DEFAULT_THRESHOLD));
    }

    #[test]
    fn disconnect_notifies_then_removes() {
        let (device, mut registry) = registry();
        let mut registry_events = registry.subscribe();
        device.plug(ControllerHandle::new("pad"));
        device.update("pad", |s| {
            s.battery_level = 0.3;
            s.battery_state = 0;
        });
        registry.on_connected(ControllerHandle::new("pad"));
        registry.poll_all();
        let mut controller_events = registry
            .get_mut(&ControllerId::new("pad"))
            .unwrap()
            .subscribe();

        let richer = ControllerHandle::new("pad").with_product_category("DualShock 4");
        registry.on_disconnected(richer.clone());

        assert!(registry.is_empty());
        assert_eq!(
            controller_events.try_recv(),
            Ok(ControllerEvent::ConnectedStateChanged {
                is_connected: false
            })
        );
        let connected = registry_events.try_recv().unwrap();
        assert!(matches!(connected, RegistryEvent::ControllerConnected(_)));
        assert_eq!(connected.handle(), &ControllerHandle::new("pad"));

        let disconnected = registry_events.try_recv().unwrap();
        assert_eq!(disconnected.handle(), &richer);
        let RegistryEvent::ControllerDisconnected { last_state, .. } = disconnected else {
            panic!("expected a disconnect, got {disconnected:?}");
        };
        assert_eq!(last_state.battery_level, 0.3);
        assert_eq!(BatteryState::from_raw(last_state.battery_state), BatteryState::Discharging);
    }

    #[test]
    fn unknown_identity_is_ignored() {
        let (_device, mut registry) = registry();
        let mut events = registry.subscribe();

        registry.on_disconnected(ControllerHandle::new("ghost"));
        registry.on_disconnected(ControllerHandle::new("ghost"));

        assert!(registry.is_empty());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn disconnect_removes_from_enumeration_until_reconnect() {
        let (device, mut registry) = registry();
        device.plug(ControllerHandle::new("a"));
        device.plug(ControllerHandle::new("b"));
        assert_eq!(ids(&mut registry), vec!["a", "b"]);

        device.disconnect(ControllerHandle::new("a"));
        registry.process_notifications();
        assert_eq!(ids(&mut registry), vec!["b"]);

        device.connect(ControllerHandle::new("a"));
        registry.process_notifications();
        assert_eq!(ids(&mut registry), vec!["a", "b"]);
    }

    #[test]
    fn reconnect_after_removal_starts_fresh() {
        let (device, mut registry) = registry();
        device.connect(ControllerHandle::new("pad"));
        device.update("pad", |s| s.button_x = 1.0);
        registry.tick();
        let id = ControllerId::new("pad");
        assert!(registry
            .get_mut(&id)
            .unwrap()
            .button_down(InputName::ButtonWest, DEFAULT_THRESHOLD));

        device.disconnect(ControllerHandle::new("pad"));
        device.connect(ControllerHandle::new("pad"));
        device.update("pad", |s| s.button_x = 1.0);
        registry.tick();

        // Same identity, new object: the held button edges again
        assert!(registry
            .get_mut(&id)
            .unwrap()
            .button_down(InputName::ButtonWest, DEFAULT_THRESHOLD));
    }

    #[test]
    fn enumerate_does_not_duplicate_or_reset() {
        let (device, mut registry) = registry();
        device.plug(ControllerHandle::new("pad"));
        device.update("pad", |s| s.dpad_vertical = 1.0);

        assert_eq!(registry.enumerate().count(), 1);
        registry.poll_all();
        let id = ControllerId::new("pad");
        assert!(registry
            .get_mut(&id)
            .unwrap()
            .button_down(InputName::DpadUp, DEFAULT_THRESHOLD));

        assert_eq!(registry.enumerate().count(), 1);
        registry.poll_all();
        assert!(!registry
            .get_mut(&id)
            .unwrap()
            .button_down(InputName::DpadUp, DEFAULT_THRESHOLD));
    }

    #[test]
    fn notifications_from_other_threads_apply_on_tick() {
        let (device, mut registry) = registry();
        device.connect(ControllerHandle::new("a"));
        device.connect(ControllerHandle::new("b"));
        assert!(registry.is_empty());

        registry.tick();

        assert_eq!(registry.len(), 2);
        assert_eq!(device.poll_count("a"), 1);
        assert_eq!(device.poll_count("b"), 1);
        assert_eq!(registry.process_notifications(), 0);
    }

    #[test]
    fn double_initialize_delivers_twice_without_duplicates() {
        let (device, mut registry) = registry();
        registry.initialize();
        assert_eq!(device.sink_count(), 2);

        device.connect(ControllerHandle::new("pad"));
        assert_eq!(registry.process_notifications(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn poll_all_raises_polled_for_each_controller() {
        let (device, mut registry) = registry();
        device.connect(ControllerHandle::new("pad"));
        registry.process_notifications();
        let mut events = registry
            .get_mut(&ControllerId::new("pad"))
            .unwrap()
            .subscribe();

        registry.poll_all();
        registry.poll_all();

        assert_eq!(events.try_recv(), Ok(ControllerEvent::Polled));
        assert_eq!(events.try_recv(), Ok(ControllerEvent::Polled));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn second_discovery_fails_until_first_completes() {
        let (device, mut registry) = registry();

        let pending = registry.start_wireless_discovery().unwrap();
        assert!(registry.is_discovering());
        assert_eq!(
            registry.start_wireless_discovery().unwrap_err(),
            RegistryError::DiscoveryInProgress
        );

        assert!(device.finish_discovery());
        assert_eq!(pending.await, Ok(()));
        assert!(!registry.is_discovering());

        let third = registry.start_wireless_discovery();
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn registries_on_one_device_share_the_discovery() {
        let device = Arc::new(FakeDevice::default());
        let mut first = ControllerRegistry::new(device.clone());
        let mut second = ControllerRegistry::new(device.clone());

        let pending = first.start_wireless_discovery().unwrap();
        assert!(second.is_discovering());
        assert_eq!(
            second.start_wireless_discovery().unwrap_err(),
            RegistryError::DiscoveryInProgress
        );

        assert!(device.finish_discovery());
        assert_eq!(pending.await, Ok(()));
        assert!(!first.is_discovering());
        assert!(second.start_wireless_discovery().is_ok());
    }

    #[tokio::test]
    async fn stop_does_not_resolve_pending_discovery() {
        let (device, mut registry) = registry();
        let mut pending = registry.start_wireless_discovery().unwrap();

        registry.stop_wireless_discovery();

        assert!(registry.is_discovering());
        let still_pending =
            tokio::time::timeout(std::time::Duration::from_millis(20), &mut pending).await;
        assert!(still_pending.is_err());
        assert_eq!(device.commands(), vec![ForwardedCommand::StopDiscovery]);

        device.finish_discovery();
        assert_eq!(pending.await, Ok(()));
    }

    #[tokio::test]
    async fn abandoned_discovery_resolves_with_error() {
        let (device, mut registry) = registry();
        let pending = registry.start_wireless_discovery().unwrap();

        device.drop_discovery();

        assert_eq!(pending.await, Err(RegistryError::DiscoveryAbandoned));
        assert!(!registry.is_discovering());
    }
}
