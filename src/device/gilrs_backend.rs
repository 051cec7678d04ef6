//! Device layer backed by gilrs
//!
//! A blocking collector task owns the `Gilrs` context. Each pass it drains gilrs
//! events, turns connect/disconnect events into [`ConnectionSink`] notifications,
//! and publishes a fresh [`InputState`] for every tracked gamepad. The registry
//! side only ever reads those published snapshots.
//!
//! ```text
//! Gilrs ──► GilrsCollector ──► SharedState { devices, sinks, discovery } ◄── GilrsDevice (DeviceLayer)
//!           (blocking task)
//! ```
//!
//! gilrs has no light bar, adaptive trigger, glyph or pairing support. Those
//! requests are logged and dropped; wireless discovery completes on the next
//! collector pass because gilrs picks up new devices continuously.

use super::{ConnectionSink, DeviceLayer, DiscoveryCompletion, DiscoveryGate, SymbolImage};
use crate::controller::{
    ControllerHandle, ControllerId, InputName, InputState, LightColor, RenderingMode, SymbolScale,
    TriggerEffect, TriggerSide, BATTERY_STATE_UNKNOWN,
};
use crate::error::DeviceError;
use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs, PowerInfo};
use statum::{machine, state};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug)]
pub struct GilrsSettings {
    /// Pause between two collector passes
    pub idle: Duration,
}

impl Default for GilrsSettings {
    fn default() -> Self {
        Self {
            idle: Duration::from_micros(500),
        }
    }
}

#[derive(Debug, Clone)]
struct TrackedDevice {
    handle: ControllerHandle,
    snapshot: InputState,
}

/// State shared between the collector task and [`GilrsDevice`]
#[derive(Debug, Default)]
pub struct SharedState {
    devices: Mutex<HashMap<ControllerId, TrackedDevice>>,
    sinks: Mutex<Vec<ConnectionSink>>,
    discovery: Mutex<Option<DiscoveryCompletion>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SharedState {
    fn insert(&self, handle: ControllerHandle, snapshot: InputState) {
        lock(&self.devices).insert(
            handle.id.clone(),
            TrackedDevice {
                handle: handle.clone(),
                snapshot,
            },
        );
        for sink in lock(&self.sinks).iter() {
            sink.on_connected(handle.clone());
        }
    }

    fn remove(&self, handle: ControllerHandle) {
        lock(&self.devices).remove(&handle.id);
        for sink in lock(&self.sinks).iter() {
            sink.on_disconnected(handle.clone());
        }
    }

    fn store_snapshot(&self, id: &ControllerId, snapshot: InputState) {
        if let Some(device) = lock(&self.devices).get_mut(id) {
            device.snapshot = snapshot;
        }
    }

    fn snapshot(&self, id: &ControllerId) -> InputState {
        lock(&self.devices)
            .get(id)
            .map(|device| device.snapshot)
            .unwrap_or(InputState::NONE)
    }

    fn handles(&self) -> Vec<ControllerHandle> {
        lock(&self.devices)
            .values()
            .map(|device| device.handle.clone())
            .collect()
    }

    fn finish_discovery(&self) {
        if let Some(completion) = lock(&self.discovery).take() {
            completion.complete();
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum ScanState {
    Initializing,
    Scanning,
}

#[machine]
#[derive(Debug)]
pub struct GilrsCollector<S: ScanState> {
    gilrs: Gilrs,

    shared: Arc<SharedState>,

    // gilrs slot -> identity reported upwards
    tracked: HashMap<GamepadId, ControllerHandle>,

    settings: GilrsSettings,

    shutdown: CancellationToken,
}

impl<S: ScanState> GilrsCollector<S> {
    fn track(&mut self, id: GamepadId) {
        let gamepad = self.gilrs.gamepad(id);
        let handle = handle_for(id, &gamepad);
        let snapshot = snapshot_for(&gamepad);

        info!("Tracking gamepad {}", handle);
        self.tracked.insert(id, handle.clone());
        self.shared.insert(handle, snapshot);
    }

    fn untrack(&mut self, id: GamepadId) {
        match self.tracked.remove(&id) {
            Some(handle) => {
                info!("Gamepad {} went away", handle);
                self.shared.remove(handle);
            }
            None => debug!("Disconnect for untracked gamepad slot {}", id),
        }
    }

    fn publish_snapshots(&self) {
        for (id, handle) in &self.tracked {
            let gamepad = self.gilrs.gamepad(*id);
            self.shared.store_snapshot(&handle.id, snapshot_for(&gamepad));
        }
    }
}

impl GilrsCollector<Initializing> {
    pub fn create(
        shared: Arc<SharedState>,
        settings: GilrsSettings,
        shutdown: CancellationToken,
    ) -> Result<Self, DeviceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(DeviceError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, shared, HashMap::new(), settings, shutdown))
    }

    /// Picks up gamepads that were connected before the collector started
    pub fn initialize(mut self) -> GilrsCollector<Scanning> {
        let present: Vec<GamepadId> = self.gilrs.gamepads().map(|(id, _)| id).collect();

        if present.is_empty() {
            warn!("No gamepad connected, waiting for connections");
        } else {
            info!("Found {} gamepad(s)", present.len());
        }

        for id in present {
            self.track(id);
        }

        self.transition()
    }
}

impl GilrsCollector<Scanning> {
    /// Drains pending gilrs events, returns how many there were
    pub fn collect_pending_events(&mut self) -> usize {
        let mut count = 0;

        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            count += 1;
            match event {
                EventType::Connected => self.track(id),
                EventType::Disconnected => self.untrack(id),
                _ => {}
            }
        }

        count
    }

    pub fn run_collection_loop(&mut self) {
        info!("Starting gilrs collection loop");

        let mut event_count = 0;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);

        while !self.shutdown.is_cancelled() {
            event_count += self.collect_pending_events();
            self.publish_snapshots();
            self.shared.finish_discovery();

            let now = Local::now();
            if now - last_log_time > log_interval {
                debug!(
                    "Gilrs collector stats: {} events from {} gamepad(s) in last {} seconds",
                    event_count,
                    self.tracked.len(),
                    log_interval.num_seconds()
                );
                event_count = 0;
                last_log_time = now;
            }

            std::thread::sleep(self.settings.idle);
        }

        info!("Gilrs collection loop stopped");
    }
}

/// [`DeviceLayer`] implementation over gilrs
#[derive(Debug)]
pub struct GilrsDevice {
    shared: Arc<SharedState>,
    discovery_gate: DiscoveryGate,
    collector: JoinHandle<()>,
}

impl GilrsDevice {
    /// Starts the collector task and waits until gilrs is up
    ///
    /// The collector runs until `shutdown` is cancelled.
    pub async fn spawn(
        settings: GilrsSettings,
        shutdown: CancellationToken,
    ) -> Result<Self, DeviceError> {
        info!("Spawning gilrs collector with settings: {:?}", settings);

        let shared = Arc::new(SharedState::default());
        let task_shared = shared.clone();
        let (ready_tx, ready_rx) = oneshot::channel();

        let collector = tokio::task::spawn_blocking(move || {
            let collector = match GilrsCollector::create(task_shared, settings, shutdown) {
                Ok(collector) => collector,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let mut scanning = collector.initialize();
            let _ = ready_tx.send(Ok(()));
            scanning.run_collection_loop();
        });

        ready_rx.await.map_err(|_| {
            DeviceError::InitializationError("gilrs collector exited during start-up".to_string())
        })??;

        info!("Gilrs collector started");
        Ok(Self {
            shared,
            discovery_gate: DiscoveryGate::default(),
            collector,
        })
    }

    pub fn is_running(&self) -> bool {
        !self.collector.is_finished()
    }
}

impl DeviceLayer for GilrsDevice {
    fn poll_controller(&self, id: &ControllerId) -> InputState {
        self.shared.snapshot(id)
    }

    fn connected_controllers(&self) -> Vec<ControllerHandle> {
        self.shared.handles()
    }

    fn set_connection_handlers(&self, sink: ConnectionSink) {
        lock(&self.shared.sinks).push(sink);
    }

    fn start_wireless_discovery(&self, on_complete: DiscoveryCompletion) {
        debug!("gilrs scans continuously, discovery completes on the next collector pass");
        *lock(&self.shared.discovery) = Some(on_complete);
    }

    fn stop_wireless_discovery(&self) {
        debug!("gilrs has no discovery to stop");
    }

    fn discovery_gate(&self) -> &DiscoveryGate {
        &self.discovery_gate
    }

    fn set_light_color(&self, id: &ControllerId, color: LightColor) {
        debug!("Light color {:?} for {} not supported by gilrs", color, id);
    }

    fn set_adaptive_trigger(&self, id: &ControllerId, side: TriggerSide, effect: TriggerEffect) {
        debug!(
            "{:?} trigger {} for {} not supported by gilrs",
            side,
            effect.name(),
            id
        );
    }

    fn symbol_for_input(
        &self,
        id: &ControllerId,
        input: InputName,
        _scale: SymbolScale,
        _rendering_mode: RenderingMode,
    ) -> Option<SymbolImage> {
        debug!("No glyph for {} on {}", input, id);
        None
    }
}

fn handle_for(id: GamepadId, gamepad: &Gamepad<'_>) -> ControllerHandle {
    let uuid: String = gamepad.uuid().iter().map(|b| format!("{b:02x}")).collect();

    // Identical models share a uuid, the slot tells them apart
    ControllerHandle::new(format!("{}-{}", uuid, usize::from(id))).with_vendor_name(gamepad.name())
}

fn snapshot_for(gamepad: &Gamepad<'_>) -> InputState {
    let button = |button: Button| {
        gamepad
            .button_data(button)
            .map(|data| data.value())
            .unwrap_or(0.0)
    };
    let (battery_level, battery_state) = battery_from_power_info(gamepad.power_info());

    InputState {
        button_home: button(Button::Mode),
        button_menu: button(Button::Start),
        button_options: button(Button::Select),
        button_a: button(Button::South),
        button_b: button(Button::East),
        button_x: button(Button::West),
        button_y: button(Button::North),
        shoulder_right_front: button(Button::RightTrigger),
        shoulder_right_back: button(Button::RightTrigger2),
        shoulder_left_front: button(Button::LeftTrigger),
        shoulder_left_back: button(Button::LeftTrigger2),
        dpad_horizontal: (button(Button::DPadRight) - button(Button::DPadLeft)
            + gamepad.value(Axis::DPadX))
        .clamp(-1.0, 1.0),
        dpad_vertical: (button(Button::DPadUp) - button(Button::DPadDown)
            + gamepad.value(Axis::DPadY))
        .clamp(-1.0, 1.0),
        thumbstick_left_horizontal: gamepad.value(Axis::LeftStickX),
        thumbstick_left_vertical: gamepad.value(Axis::LeftStickY),
        thumbstick_left_button: button(Button::LeftThumb),
        thumbstick_right_horizontal: gamepad.value(Axis::RightStickX),
        thumbstick_right_vertical: gamepad.value(Axis::RightStickY),
        thumbstick_right_button: button(Button::RightThumb),
        battery_level,
        battery_state,
        ..InputState::NONE
    }
}

fn battery_from_power_info(info: PowerInfo) -> (f32, i32) {
    match info {
        PowerInfo::Discharging(level) => (f32::from(level) / 100.0, 0),
        PowerInfo::Charging(level) => (f32::from(level) / 100.0, 1),
        PowerInfo::Charged | PowerInfo::Wired => (1.0, 2),
        _ => (0.0, BATTERY_STATE_UNKNOWN),
    }
}
