//! Controller subsystem: per-device state and the types game code queries
//!
//! - [`input`] - per-poll snapshot, named inputs, battery and glyph enums
//! - [`controller`] - per-device state machine with edge detection
//! - [`controller_handle`] - identity and metadata of a device
//! - [`events`] - notifications raised by controllers and the registry
//! - [`haptics`] - light bar and adaptive trigger parameters
//!
//! # Architecture
//!
//! ```text
//! DeviceLayer ──► InputState ──► Controller ──► button_down / button_up / input_value
//!   (native)      (snapshot)     (history)
//! ```

#[allow(clippy::module_inception)]
pub mod controller;
pub mod controller_handle;
pub mod events;
pub mod haptics;
pub mod input;

pub use controller::{Controller, DEFAULT_THRESHOLD};
pub use controller_handle::{ControllerHandle, ControllerId};
pub use events::{ControllerEvent, RegistryEvent, Subscribers};
pub use haptics::{LightColor, TriggerEffect, TriggerSide, TRIGGER_ZONES};
pub use input::{
    BatteryState, InputName, InputState, RenderingMode, SymbolScale, UnknownInputName,
    BATTERY_STATE_UNKNOWN,
};
