//! Game controller session core
//!
//! Tracks one [`Controller`] per physical device across connect/disconnect churn,
//! turns the device layer's per-frame snapshots into named inputs, and derives
//! frame-accurate press/release edges from analog values.
//!
//! ```text
//! DeviceLayer ──[notifications]──► ControllerRegistry ──► Controller (per device)
//!      ▲                                 │ tick()               │
//!      └──────────── poll_controller ────┴──────────────────────┘
//! ```
//!
//! The device layer is abstracted by [`DeviceLayer`]; [`GilrsDevice`] is the
//! bundled implementation.

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod registry;

pub use config::SessionSettings;
pub use controller::{
    BatteryState, Controller, ControllerEvent, ControllerHandle, ControllerId, InputName,
    InputState, LightColor, RegistryEvent, RenderingMode, SymbolScale, TriggerEffect, TriggerSide,
    DEFAULT_THRESHOLD,
};
pub use device::{
    ConnectionSink, DeviceLayer, DiscoveryCompletion, DiscoveryGate, GilrsDevice, SymbolImage,
};
pub use error::{DeviceError, RegistryError};
pub use registry::{ControllerRegistry, PendingDiscovery};
