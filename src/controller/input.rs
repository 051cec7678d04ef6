//! Per-poll snapshot and the named inputs derived from it
//!
//! [`InputState`] mirrors the physical layout the device layer reports once per
//! poll. [`InputName`] is the logical view game code queries; several names map
//! onto the same physical axis (the d-pad directions are half-ranges of the two
//! d-pad axes).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw battery-state code the device layer uses when it has no information
pub const BATTERY_STATE_UNKNOWN: i32 = -1;

/// One immutable capture of every analog and digital value of a controller
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputState {
    // Digital buttons, reported as intensities in [0, 1]
    pub button_home: f32,
    pub button_menu: f32,
    pub button_options: f32,
    pub button_a: f32,
    pub button_b: f32,
    pub button_x: f32,
    pub button_y: f32,
    pub shoulder_right_front: f32,
    pub shoulder_right_back: f32,
    pub shoulder_left_front: f32,
    pub shoulder_left_back: f32,

    // D-pad axes in [-1, 1]
    pub dpad_horizontal: f32,
    pub dpad_vertical: f32,

    pub thumbstick_left_horizontal: f32,
    pub thumbstick_left_vertical: f32,
    pub thumbstick_left_button: f32,
    pub thumbstick_right_horizontal: f32,
    pub thumbstick_right_vertical: f32,
    pub thumbstick_right_button: f32,

    // Touchpad (DualShock / DualSense only)
    pub touchpad_button: f32,
    pub touchpad_primary_horizontal: f32,
    pub touchpad_primary_vertical: f32,
    pub touchpad_secondary_horizontal: f32,
    pub touchpad_secondary_vertical: f32,

    /// Charge in [0, 1]
    pub battery_level: f32,
    /// Raw code, see [`BatteryState::from_raw`]
    pub battery_state: i32,
}

impl InputState {
    /// Snapshot used for a controller that is polled while disconnected
    pub const NONE: InputState = InputState {
        button_home: 0.0,
        button_menu: 0.0,
        button_options: 0.0,
        button_a: 0.0,
        button_b: 0.0,
        button_x: 0.0,
        button_y: 0.0,
        shoulder_right_front: 0.0,
        shoulder_right_back: 0.0,
        shoulder_left_front: 0.0,
        shoulder_left_back: 0.0,
        dpad_horizontal: 0.0,
        dpad_vertical: 0.0,
        thumbstick_left_horizontal: 0.0,
        thumbstick_left_vertical: 0.0,
        thumbstick_left_button: 0.0,
        thumbstick_right_horizontal: 0.0,
        thumbstick_right_vertical: 0.0,
        thumbstick_right_button: 0.0,
        touchpad_button: 0.0,
        touchpad_primary_horizontal: 0.0,
        touchpad_primary_vertical: 0.0,
        touchpad_secondary_horizontal: 0.0,
        touchpad_secondary_vertical: 0.0,
        battery_level: 0.0,
        battery_state: BATTERY_STATE_UNKNOWN,
    };

    /// Value of a named input, derived from this snapshot
    pub fn value(&self, input: InputName) -> f32 {
        match input {
            InputName::ButtonHome => self.button_home,
            InputName::ButtonMenu => self.button_menu,
            InputName::ButtonOptions => self.button_options,
            InputName::ButtonSouth => self.button_a,
            InputName::ButtonEast => self.button_b,
            InputName::ButtonNorth => self.button_y,
            InputName::ButtonWest => self.button_x,
            InputName::ShoulderRightFront => self.shoulder_right_front,
            InputName::ShoulderRightBack => self.shoulder_right_back,
            InputName::ShoulderLeftFront => self.shoulder_left_front,
            InputName::ShoulderLeftBack => self.shoulder_left_back,
            InputName::DpadHorizontal => self.dpad_horizontal,
            InputName::DpadVertical => self.dpad_vertical,
            InputName::DpadRight => self.dpad_horizontal.clamp(0.0, 1.0),
            InputName::DpadLeft => self.dpad_horizontal.clamp(-1.0, 0.0),
            InputName::DpadUp => self.dpad_vertical.clamp(0.0, 1.0),
            InputName::DpadDown => self.dpad_vertical.clamp(-1.0, 0.0),
            InputName::ThumbstickLeftHorizontal => self.thumbstick_left_horizontal,
            InputName::ThumbstickLeftVertical => self.thumbstick_left_vertical,
            InputName::ThumbstickLeftButton => self.thumbstick_left_button,
            InputName::ThumbstickRightHorizontal => self.thumbstick_right_horizontal,
            InputName::ThumbstickRightVertical => self.thumbstick_right_vertical,
            InputName::ThumbstickRightButton => self.thumbstick_right_button,
            InputName::TouchpadButton => self.touchpad_button,
            InputName::TouchpadPrimaryHorizontal => self.touchpad_primary_horizontal,
            InputName::TouchpadPrimaryVertical => self.touchpad_primary_vertical,
            InputName::TouchpadSecondaryHorizontal => self.touchpad_secondary_horizontal,
            InputName::TouchpadSecondaryVertical => self.touchpad_secondary_vertical,
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::NONE
    }
}

/// Logical input identifier, decoupled from the snapshot layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InputName {
    ButtonHome,
    ButtonMenu,
    ButtonOptions,
    ButtonSouth,
    ButtonEast,
    ButtonNorth,
    ButtonWest,
    ShoulderRightFront,
    ShoulderRightBack,
    ShoulderLeftFront,
    ShoulderLeftBack,
    DpadHorizontal,
    DpadVertical,
    DpadRight,
    DpadLeft,
    DpadUp,
    DpadDown,
    ThumbstickLeftHorizontal,
    ThumbstickLeftVertical,
    ThumbstickLeftButton,
    ThumbstickRightHorizontal,
    ThumbstickRightVertical,
    ThumbstickRightButton,
    TouchpadButton,
    TouchpadPrimaryHorizontal,
    TouchpadPrimaryVertical,
    TouchpadSecondaryHorizontal,
    TouchpadSecondaryVertical,
}

impl InputName {
    pub const ALL: [InputName; 28] = [
        InputName::ButtonHome,
        InputName::ButtonMenu,
        InputName::ButtonOptions,
        InputName::ButtonSouth,
        InputName::ButtonEast,
        InputName::ButtonNorth,
        InputName::ButtonWest,
        InputName::ShoulderRightFront,
        InputName::ShoulderRightBack,
        InputName::ShoulderLeftFront,
        InputName::ShoulderLeftBack,
        InputName::DpadHorizontal,
        InputName::DpadVertical,
        InputName::DpadRight,
        InputName::DpadLeft,
        InputName::DpadUp,
        InputName::DpadDown,
        InputName::ThumbstickLeftHorizontal,
        InputName::ThumbstickLeftVertical,
        InputName::ThumbstickLeftButton,
        InputName::ThumbstickRightHorizontal,
        InputName::ThumbstickRightVertical,
        InputName::ThumbstickRightButton,
        InputName::TouchpadButton,
        InputName::TouchpadPrimaryHorizontal,
        InputName::TouchpadPrimaryVertical,
        InputName::TouchpadSecondaryHorizontal,
        InputName::TouchpadSecondaryVertical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InputName::ButtonHome => "ButtonHome",
            InputName::ButtonMenu => "ButtonMenu",
            InputName::ButtonOptions => "ButtonOptions",
            InputName::ButtonSouth => "ButtonSouth",
            InputName::ButtonEast => "ButtonEast",
            InputName::ButtonNorth => "ButtonNorth",
            InputName::ButtonWest => "ButtonWest",
            InputName::ShoulderRightFront => "ShoulderRightFront",
            InputName::ShoulderRightBack => "ShoulderRightBack",
            InputName::ShoulderLeftFront => "ShoulderLeftFront",
            InputName::ShoulderLeftBack => "ShoulderLeftBack",
            InputName::DpadHorizontal => "DpadHorizontal",
            InputName::DpadVertical => "DpadVertical",
            InputName::DpadRight => "DpadRight",
            InputName::DpadLeft => "DpadLeft",
            InputName::DpadUp => "DpadUp",
            InputName::DpadDown => "DpadDown",
            InputName::ThumbstickLeftHorizontal => "ThumbstickLeftHorizontal",
            InputName::ThumbstickLeftVertical => "ThumbstickLeftVertical",
            InputName::ThumbstickLeftButton => "ThumbstickLeftButton",
            InputName::ThumbstickRightHorizontal => "ThumbstickRightHorizontal",
            InputName::ThumbstickRightVertical => "ThumbstickRightVertical",
            InputName::ThumbstickRightButton => "ThumbstickRightButton",
            InputName::TouchpadButton => "TouchpadButton",
            InputName::TouchpadPrimaryHorizontal => "TouchpadPrimaryHorizontal",
            InputName::TouchpadPrimaryVertical => "TouchpadPrimaryVertical",
            InputName::TouchpadSecondaryHorizontal => "TouchpadSecondaryHorizontal",
            InputName::TouchpadSecondaryVertical => "TouchpadSecondaryVertical",
        }
    }
}

impl fmt::Display for InputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised input name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown input name: {0}")]
pub struct UnknownInputName(pub String);

impl FromStr for InputName {
    type Err = UnknownInputName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InputName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownInputName(s.to_string()))
    }
}

/// Battery state decoded from the raw snapshot code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatteryState {
    Discharging,
    Charging,
    Full,
    Unknown,
}

impl BatteryState {
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => BatteryState::Discharging,
            1 => BatteryState::Charging,
            2 => BatteryState::Full,
            _ => BatteryState::Unknown,
        }
    }
}

/// Size of a button glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SymbolScale {
    Small,
    #[default]
    Medium,
    Large,
}

/// How the device layer should render a button glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderingMode {
    #[default]
    Automatic,
    AlwaysOriginal,
    AlwaysTemplate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_buttons_follow_positional_layout() {
        let state = InputState {
            button_a: 0.1,
            button_b: 0.2,
            button_x: 0.3,
            button_y: 0.4,
            ..InputState::NONE
        };

        assert_eq!(state.value(InputName::ButtonSouth), 0.1);
        assert_eq!(state.value(InputName::ButtonEast), 0.2);
        assert_eq!(state.value(InputName::ButtonWest), 0.3);
        assert_eq!(state.value(InputName::ButtonNorth), 0.4);
    }

    #[test]
    fn dpad_directions_never_overlap() {
        for step in -20..=20 {
            let axis = step as f32 / 20.0;
            let state = InputState {
                dpad_horizontal: axis,
                dpad_vertical: axis,
                ..InputState::NONE
            };

            let right = state.value(InputName::DpadRight);
            let left = state.value(InputName::DpadLeft);
            assert!(right == 0.0 || left == 0.0, "both set for {axis}");
            assert!((0.0..=1.0).contains(&right));
            assert!((-1.0..=0.0).contains(&left));

            let up = state.value(InputName::DpadUp);
            let down = state.value(InputName::DpadDown);
            assert!(up == 0.0 || down == 0.0, "both set for {axis}");
        }
    }

    #[test]
    fn dpad_halves_keep_magnitude() {
        let state = InputState {
            dpad_horizontal: -0.75,
            dpad_vertical: 0.5,
            ..InputState::NONE
        };

        assert_eq!(state.value(InputName::DpadLeft), -0.75);
        assert_eq!(state.value(InputName::DpadRight), 0.0);
        assert_eq!(state.value(InputName::DpadUp), 0.5);
        assert_eq!(state.value(InputName::DpadDown), 0.0);
        assert_eq!(state.value(InputName::DpadHorizontal), -0.75);
    }

    #[test]
    fn battery_codes() {
        assert_eq!(BatteryState::from_raw(0), BatteryState::Discharging);
        assert_eq!(BatteryState::from_raw(1), BatteryState::Charging);
        assert_eq!(BatteryState::from_raw(2), BatteryState::Full);
        assert_eq!(BatteryState::from_raw(7), BatteryState::Unknown);
        assert_eq!(
            BatteryState::from_raw(InputState::NONE.battery_state),
            BatteryState::Unknown
        );
    }

    #[test]
    fn none_snapshot_reads_zero_everywhere() {
        for name in InputName::ALL {
            assert_eq!(InputState::default().value(name), 0.0, "{name}");
        }
    }

    #[test]
    fn input_names_parse_from_their_display_form() {
        for name in InputName::ALL {
            assert_eq!(name.to_string().parse::<InputName>(), Ok(name));
        }
        assert_eq!(
            "ButtonTurbo".parse::<InputName>(),
            Err(UnknownInputName("ButtonTurbo".to_string()))
        );
    }
}
