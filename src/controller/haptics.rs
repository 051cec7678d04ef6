//! Light bar and adaptive trigger commands
//!
//! These are plain parameter bundles. Nothing here synthesizes a waveform or
//! validates ranges; the device layer receives the values exactly as the caller
//! supplied them.

use serde::{Deserialize, Serialize};

/// Number of zones along the travel of an adaptive trigger
pub const TRIGGER_ZONES: usize = 10;

/// Light bar color, each channel nominally in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LightColor {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl LightColor {
    pub fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerSide {
    Left,
    Right,
}

/// Adaptive trigger mode together with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TriggerEffect {
    /// Constant resistance from `start_position` to the end of travel
    Feedback {
        start_position: f32,
        resistive_strength: f32,
    },
    /// Resistance between two positions that gives way like a gun trigger
    Weapon {
        start_position: f32,
        end_position: f32,
        resistive_strength: f32,
    },
    /// Resistance ramping linearly between two positions
    Slope {
        start_position: f32,
        end_position: f32,
        start_strength: f32,
        end_strength: f32,
    },
    Vibration {
        start_position: f32,
        amplitude: f32,
        frequency: f32,
    },
    /// Per-zone vibration amplitudes sharing one frequency
    PositionalVibration {
        amplitudes: [f32; TRIGGER_ZONES],
        frequency: f32,
    },
    /// Per-zone resistance
    PositionalResistance { strengths: [f32; TRIGGER_ZONES] },
}

impl TriggerEffect {
    pub fn name(&self) -> &'static str {
        match self {
            TriggerEffect::Feedback { .. } => "Feedback",
            TriggerEffect::Weapon { .. } => "Weapon",
            TriggerEffect::Slope { .. } => "Slope",
            TriggerEffect::Vibration { .. } => "Vibration",
            TriggerEffect::PositionalVibration { .. } => "Positional Vibration",
            TriggerEffect::PositionalResistance { .. } => "Positional Resistance",
        }
    }
}
