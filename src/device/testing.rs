//! In-memory device layer for unit tests

use super::{ConnectionSink, DeviceLayer, DiscoveryCompletion, DiscoveryGate, SymbolImage};
use crate::controller::{
    ControllerHandle, ControllerId, InputName, InputState, LightColor, RenderingMode, SymbolScale,
    TriggerEffect, TriggerSide,
};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ForwardedCommand {
    Light(ControllerId, LightColor),
    Trigger(ControllerId, TriggerSide, TriggerEffect),
    StopDiscovery,
}

#[derive(Default)]
pub(crate) struct FakeDevice {
    connected: Mutex<Vec<ControllerHandle>>,
    states: Mutex<HashMap<ControllerId, InputState>>,
    polls: Mutex<HashMap<ControllerId, usize>>,
    sinks: Mutex<Vec<ConnectionSink>>,
    discovery: Mutex<Option<DiscoveryCompletion>>,
    gate: DiscoveryGate,
    commands: Mutex<Vec<ForwardedCommand>>,
}

impl FakeDevice {
    /// Adds a device without raising any notification, like a controller that
    /// was already paired before the registry started listening
    pub(crate) fn plug(&self, handle: ControllerHandle) {
        let mut connected = self.connected.lock().unwrap();
        connected.retain(|h| h.id != handle.id);
        self.states
            .lock()
            .unwrap()
            .entry(handle.id.clone())
            .or_insert(InputState::NONE);
        connected.push(handle);
    }

    /// Adds a device and notifies every registered sink from another thread
    pub(crate) fn connect(&self, handle: ControllerHandle) {
        self.plug(handle.clone());
        let sinks = self.sinks.lock().unwrap().clone();
        std::thread::spawn(move || {
            for sink in sinks {
                sink.on_connected(handle.clone());
            }
        })
        .join()
        .unwrap();
    }

    pub(crate) fn disconnect(&self, handle: ControllerHandle) {
        self.connected.lock().unwrap().retain(|h| h.id != handle.id);
        self.states.lock().unwrap().remove(&handle.id);
        for sink in self.sinks.lock().unwrap().iter() {
            sink.on_disconnected(handle.clone());
        }
    }

    pub(crate) fn update(&self, id: &str, change: impl FnOnce(&mut InputState)) {
        let mut states = self.states.lock().unwrap();
        change(states.entry(ControllerId::new(id)).or_insert(InputState::NONE));
    }

    pub(crate) fn poll_count(&self, id: &str) -> usize {
        self.polls
            .lock()
            .unwrap()
            .get(&ControllerId::new(id))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn sink_count(&self) -> usize {
        self.sinks.lock().unwrap().len()
    }

    pub(crate) fn finish_discovery(&self) -> bool {
        match self.discovery.lock().unwrap().take() {
            Some(completion) => {
                completion.complete();
                true
            }
            None => false,
        }
    }

    pub(crate) fn drop_discovery(&self) {
        self.discovery.lock().unwrap().take();
    }

    pub(crate) fn commands(&self) -> Vec<ForwardedCommand> {
        self.commands.lock().unwrap().clone()
    }
}

impl DeviceLayer for FakeDevice {
    fn poll_controller(&self, id: &ControllerId) -> InputState {
        *self.polls.lock().unwrap().entry(id.clone()).or_default() += 1;
        self.states
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(InputState::NONE)
    }

    fn connected_controllers(&self) -> Vec<ControllerHandle> {
        self.connected.lock().unwrap().clone()
    }

    fn set_connection_handlers(&self, sink: ConnectionSink) {
        self.sinks.lock().unwrap().push(sink);
    }

    fn start_wireless_discovery(&self, on_complete: DiscoveryCompletion) {
        *self.discovery.lock().unwrap() = Some(on_complete);
    }

    fn stop_wireless_discovery(&self) {
        self.commands
            .lock()
            .unwrap()
            .push(ForwardedCommand::StopDiscovery);
    }

    fn discovery_gate(&self) -> &DiscoveryGate {
        &self.gate
    }

    fn set_light_color(&self, id: &ControllerId, color: LightColor) {
        self.commands
            .lock()
            .unwrap()
            .push(ForwardedCommand::Light(id.clone(), color));
    }

    fn set_adaptive_trigger(&self, id: &ControllerId, side: TriggerSide, effect: TriggerEffect) {
        self.commands
            .lock()
            .unwrap()
            .push(ForwardedCommand::Trigger(id.clone(), side, effect));
    }

    fn symbol_for_input(
        &self,
        _id: &ControllerId,
        input: InputName,
        _scale: SymbolScale,
        _rendering_mode: RenderingMode,
    ) -> Option<SymbolImage> {
        input.as_str().starts_with("Button").then(|| SymbolImage {
            width: 1,
            height: 1,
            rgba: vec![255, 255, 255, 255],
        })
    }
}
