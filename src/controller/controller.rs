//! Per-device controller state
//!
//! A [`Controller`] holds the latest snapshot of one physical device and a small
//! press history per named input, which is enough to answer "pressed this
//! frame" and "released this frame" questions from a continuous analog value.
//!
//! # Frame model
//!
//! ```text
//! poll() ──► previous = current, current = false ──► snapshot = device.poll_controller(id)
//!                                                      │
//! button_down / button_up ◄── compares previous with ──┘ the value read now
//!                              and records it as current
//! ```
//!
//! Edge queries are lazy: nothing is computed for an input until somebody asks.
//! An input asked about for the first time has no history, which counts as "not
//! pressed", so an input already held at that point reports one down edge.

use super::controller_handle::{ControllerHandle, ControllerId};
use super::events::{ControllerEvent, Subscribers};
use super::haptics::{LightColor, TriggerEffect, TriggerSide, TRIGGER_ZONES};
use super::input::{BatteryState, InputName, InputState, RenderingMode, SymbolScale};
use crate::device::{DeviceLayer, SymbolImage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Threshold used when a caller has no opinion
pub const DEFAULT_THRESHOLD: f32 = 0.25;

/// Press history of one named input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PressState {
    current: bool,
    previous: bool,
}

/// One tracked physical controller
pub struct Controller {
    handle: ControllerHandle,
    input_state: InputState,
    is_connected: bool,
    press_states: HashMap<InputName, PressState>,
    device: Arc<dyn DeviceLayer>,
    subscribers: Subscribers<ControllerEvent>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("handle", &self.handle)
            .field("is_connected", &self.is_connected)
            .field("input_state", &self.input_state)
            .field("tracked_inputs", &self.press_states.len())
            .finish()
    }
}

impl Controller {
    pub(crate) fn new(handle: ControllerHandle, device: Arc<dyn DeviceLayer>) -> Self {
        debug!("Creating controller state for {}", handle);
        Self {
            handle,
            input_state: InputState::NONE,
            is_connected: true,
            press_states: HashMap::new(),
            device,
            subscribers: Subscribers::default(),
        }
    }

    pub fn id(&self) -> &ControllerId {
        &self.handle.id
    }

    pub fn handle(&self) -> &ControllerHandle {
        &self.handle
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// Snapshot taken by the last [`poll`](Self::poll)
    pub fn input_state(&self) -> &InputState {
        &self.input_state
    }

    /// Receiver for this controller's events; drop it to unsubscribe
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ControllerEvent> {
        self.subscribers.subscribe()
    }

    pub(crate) fn refresh_handle(&mut self, handle: ControllerHandle) {
        if self.handle != handle {
            debug!("Refreshing handle {} -> {}", self.handle, handle);
        }
        self.handle = handle;
    }

    pub(crate) fn mark_disconnected(&mut self) {
        self.is_connected = false;
        self.subscribers.emit(ControllerEvent::ConnectedStateChanged {
            is_connected: false,
        });
    }

    /// Advances the press history by one frame and fetches a new snapshot
    pub fn poll(&mut self) {
        for state in self.press_states.values_mut() {
            state.previous = state.current;
            state.current = false;
        }

        self.input_state = if self.is_connected {
            self.device.poll_controller(&self.handle.id)
        } else {
            InputState::NONE
        };

        self.subscribers.emit(ControllerEvent::Polled);
    }

    pub fn input_value(&self, input: InputName) -> f32 {
        self.input_state.value(input)
    }

    /// Value of an input given by its textual name; unknown names read as zero
    pub fn input_value_named(&self, name: &str) -> f32 {
        name.parse::<InputName>()
            .map(|input| self.input_value(input))
            .unwrap_or(0.0)
    }

    /// Whether the input is at or beyond `threshold` in either direction
    pub fn button(&self, input: InputName, threshold: f32) -> bool {
        self.input_value(input).abs() >= threshold
    }

    /// [`button`](Self::button) with [`DEFAULT_THRESHOLD`]
    pub fn is_pressed(&self, input: InputName) -> bool {
        self.button(input, DEFAULT_THRESHOLD)
    }

    /// True on the frame the input goes from released to pressed
    pub fn button_down(&mut self, input: InputName, threshold: f32) -> bool {
        let pressed = self.button(input, threshold);
        let state = self.press_states.entry(input).or_default();
        let is_down = !state.previous && pressed;
        state.current = pressed;
        is_down
    }

    /// True on the frame the input goes from pressed to released
    pub fn button_up(&mut self, input: InputName, threshold: f32) -> bool {
        let pressed = self.button(input, threshold);
        let state = self.press_states.entry(input).or_default();
        let is_up = state.previous && !pressed;
        state.current = pressed;
        is_up
    }

    pub fn battery_level(&self) -> f32 {
        self.input_state.battery_level
    }

    pub fn battery_state(&self) -> BatteryState {
        BatteryState::from_raw(self.input_state.battery_state)
    }

    pub fn symbol_for_input(
        &self,
        input: InputName,
        scale: SymbolScale,
        rendering_mode: RenderingMode,
    ) -> Option<SymbolImage> {
        self.device
            .symbol_for_input(&self.handle.id, input, scale, rendering_mode)
    }

    pub fn set_light_color(&self, red: f32, green: f32, blue: f32) {
        let color = LightColor::new(red, green, blue);
        debug!(
            "Setting controller {} to [{}, {}, {}]",
            self.handle.id, color.red, color.green, color.blue
        );
        self.device.set_light_color(&self.handle.id, color);
    }

    /// Forwards any trigger effect to the device layer
    pub fn set_adaptive_trigger(&self, side: TriggerSide, effect: TriggerEffect) {
        debug!(
            "Setting controller {} {:?} trigger to {}: {:?}",
            self.handle.id,
            side,
            effect.name(),
            effect
        );
        self.device
            .set_adaptive_trigger(&self.handle.id, side, effect);
    }

    pub fn set_adaptive_left_feedback(&self, start_position: f32, resistive_strength: f32) {
        self.set_adaptive_trigger(
            TriggerSide::Left,
            TriggerEffect::Feedback {
                start_position,
                resistive_strength,
            },
        );
    }

    pub fn set_adaptive_right_feedback(&self, start_position: f32, resistive_strength: f32) {
        self.set_adaptive_trigger(
            TriggerSide::Right,
            TriggerEffect::Feedback {
                start_position,
                resistive_strength,
            },
        );
    }

    pub fn set_adaptive_left_weapon(
        &self,
        start_position: f32,
        end_position: f32,
        resistive_strength: f32,
    ) {
        self.set_adaptive_trigger(
            TriggerSide::Left,
            TriggerEffect::Weapon {
                start_position,
                end_position,
                resistive_strength,
            },
        );
    }

    pub fn set_adaptive_right_weapon(
        &self,
        start_position: f32,
        end_position: f32,
        resistive_strength: f32,
    ) {
        self.set_adaptive_trigger(
            TriggerSide::Right,
            TriggerEffect::Weapon {
                start_position,
                end_position,
                resistive_strength,
            },
        );
    }

    pub fn set_adaptive_left_slope(
        &self,
        start_position: f32,
        end_position: f32,
        start_strength: f32,
        end_strength: f32,
    ) {
        self.set_adaptive_trigger(
            TriggerSide::Left,
            TriggerEffect::Slope {
                start_position,
                end_position,
                start_strength,
                end_strength,
            },
        );
    }

    pub fn set_adaptive_right_slope(
        &self,
        start_position: f32,
        end_position: f32,
        start_strength: f32,
        end_strength: f32,
    ) {
        self.set_adaptive_trigger(
            TriggerSide::Right,
            TriggerEffect::Slope {
                start_position,
                end_position,
                start_strength,
                end_strength,
            },
        );
    }

    pub fn set_adaptive_left_vibration(&self, start_position: f32, amplitude: f32, frequency: f32) {
        self.set_adaptive_trigger(
            TriggerSide::Left,
            TriggerEffect::Vibration {
                start_position,
                amplitude,
                frequency,
            },
        );
    }

    pub fn set_adaptive_right_vibration(
        &self,
        start_position: f32,
        amplitude: f32,
        frequency: f32,
    ) {
        self.set_adaptive_trigger(
            TriggerSide::Right,
            TriggerEffect::Vibration {
                start_position,
                amplitude,
                frequency,
            },
        );
    }

    pub fn set_adaptive_left_positional_vibration(
        &self,
        amplitudes: [f32; TRIGGER_ZONES],
        frequency: f32,
    ) {
        self.set_adaptive_trigger(
            TriggerSide::Left,
            TriggerEffect::PositionalVibration {
                amplitudes,
                frequency,
            },
        );
    }

    pub fn set_adaptive_right_positional_vibration(
        &self,
        amplitudes: [f32; TRIGGER_ZONES],
        frequency: f32,
    ) {
        self.set_adaptive_trigger(
            TriggerSide::Right,
            TriggerEffect::PositionalVibration {
                amplitudes,
                frequency,
            },
        );
    }

    pub fn set_adaptive_left_positional_resistance(&self, strengths: [f32; TRIGGER_ZONES]) {
        self.set_adaptive_trigger(
            TriggerSide::Left,
            TriggerEffect::PositionalResistance { strengths },
        );
    }

    pub fn set_adaptive_right_positional_resistance(&self, strengths: [f32; TRIGGER_ZONES]) {
        self.set_adaptive_trigger(
            TriggerSide::Right,
            TriggerEffect::PositionalResistance { strengths },
        );
    }
}
