//! Control commands and their line encoding.
//!
//! Each command travels as one compact JSON object followed by `\n`:
//!
//! ```text
//! {"type":"brightness","value":128}
//! {"type":"speed","value":1.5}
//! {"type":"color","value":{"r":255,"g":64,"b":0}}
//! {"type":"preset","value":"Fire Flicker"}
//! {"type":"save"}
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Line terminator appended to every encoded command.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Lowest speed multiplier the controller accepts.
pub const MIN_SPEED: f64 = 0.1;

/// Highest speed multiplier the controller accepts.
pub const MAX_SPEED: f64 = 5.0;

/// RGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Creates a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Animation speed multiplier, always within [`MIN_SPEED`, `MAX_SPEED`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Speed(f64);

impl Speed {
    /// Validates a raw multiplier.
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&value) {
            return Err(Error::InvalidSpeed(value));
        }
        Ok(Self(value))
    }

    /// Returns the multiplier.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self(1.0)
    }
}

impl TryFrom<f64> for Speed {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Speed> for f64 {
    fn from(speed: Speed) -> Self {
        speed.0
    }
}

/// Built-in lighting animations, selected by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Preset {
    /// Rainbow cycling effect.
    #[default]
    Rainbow,
    /// Single solid color.
    Solid,
    /// Slow hue drift.
    #[serde(rename = "Smooth Shift")]
    SmoothShift,
    /// Flickering fire effect.
    #[serde(rename = "Fire Flicker")]
    FireFlicker,
    /// Travelling waves.
    Waves,
    /// Synchronized pulsing.
    #[serde(rename = "Pulse Sync")]
    PulseSync,
}

impl Preset {
    /// Every preset, in the order the controller lists them.
    pub const ALL: [Preset; 6] = [
        Preset::Rainbow,
        Preset::Solid,
        Preset::SmoothShift,
        Preset::FireFlicker,
        Preset::Waves,
        Preset::PulseSync,
    ];

    /// Returns the label the firmware matches on.
    pub fn label(&self) -> &'static str {
        match self {
            Preset::Rainbow => "Rainbow",
            Preset::Solid => "Solid",
            Preset::SmoothShift => "Smooth Shift",
            Preset::FireFlicker => "Fire Flicker",
            Preset::Waves => "Waves",
            Preset::PulseSync => "Pulse Sync",
        }
    }
}

impl FromStr for Preset {
    type Err = Error;

    /// Accepts the label in any case, with spaces, dashes or underscores.
    fn from_str(s: &str) -> Result<Self> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        Preset::ALL
            .into_iter()
            .find(|preset| preset.label().replace(' ', "").to_lowercase() == wanted)
            .ok_or_else(|| Error::InvalidPreset(s.to_string()))
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single control message for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Command {
    /// Global brightness, 0-255.
    Brightness(u8),
    /// Animation speed multiplier.
    Speed(Speed),
    /// Solid color.
    Color(Rgb),
    /// Switch to a built-in animation.
    Preset(Preset),
    /// Persist the current settings on the controller. Carries no value.
    Save,
}

impl Command {
    /// Short name of the command, matching the `type` field on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Brightness(_) => "brightness",
            Command::Speed(_) => "speed",
            Command::Color(_) => "color",
            Command::Preset(_) => "preset",
            Command::Save => "save",
        }
    }

    /// Encodes the command as one newline-terminated line.
    pub fn encode_line(&self) -> Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(LINE_TERMINATOR);
        Ok(line)
    }

    /// Decodes one line, with or without its terminator.
    pub fn decode_line(line: &[u8]) -> Result<Self> {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Ok(serde_json::from_slice(line)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(command: Command) -> String {
        String::from_utf8(command.encode_line().unwrap()).unwrap()
    }

    #[test]
    fn test_brightness_encodes_input_for_full_range() {
        for value in 0..=u8::MAX {
            let line = encoded(Command::Brightness(value));
            assert_eq!(
                line,
                format!("{{\"type\":\"brightness\",\"value\":{}}}\n", value)
            );
        }
    }

    #[test]
    fn test_speed_encodes_as_float() {
        assert_eq!(
            encoded(Command::Speed(Speed::new(1.0).unwrap())),
            "{\"type\":\"speed\",\"value\":1.0}\n"
        );
        assert_eq!(
            encoded(Command::Speed(Speed::new(2.5).unwrap())),
            "{\"type\":\"speed\",\"value\":2.5}\n"
        );
    }

    #[test]
    fn test_speed_range() {
        assert!(Speed::new(MIN_SPEED).is_ok());
        assert!(Speed::new(MAX_SPEED).is_ok());
        assert!(matches!(Speed::new(0.0), Err(Error::InvalidSpeed(_))));
        assert!(matches!(Speed::new(5.01), Err(Error::InvalidSpeed(_))));
        assert!(Speed::new(f64::NAN).is_err());
        assert_eq!(Speed::default().value(), 1.0);
    }

    #[test]
    fn test_color_encodes_object() {
        assert_eq!(
            encoded(Command::Color(Rgb::new(255, 64, 0))),
            "{\"type\":\"color\",\"value\":{\"r\":255,\"g\":64,\"b\":0}}\n"
        );
    }

    #[test]
    fn test_preset_encodes_label() {
        assert_eq!(
            encoded(Command::Preset(Preset::FireFlicker)),
            "{\"type\":\"preset\",\"value\":\"Fire Flicker\"}\n"
        );
        assert_eq!(
            encoded(Command::Preset(Preset::Rainbow)),
            "{\"type\":\"preset\",\"value\":\"Rainbow\"}\n"
        );
    }

    #[test]
    fn test_save_has_no_value() {
        assert_eq!(encoded(Command::Save), "{\"type\":\"save\"}\n");
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(
            Command::decode_line(b"{\"type\":\"save\"}\n").unwrap(),
            Command::Save
        );
        assert_eq!(
            Command::decode_line(b"{\"type\":\"preset\",\"value\":\"Pulse Sync\"}\r\n").unwrap(),
            Command::Preset(Preset::PulseSync)
        );
        assert!(Command::decode_line(b"{\"type\":\"strobe\",\"value\":1}").is_err());
        assert!(Command::decode_line(b"{\"type\":\"speed\",\"value\":9.0}").is_err());
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("rainbow".parse::<Preset>().unwrap(), Preset::Rainbow);
        assert_eq!("Fire Flicker".parse::<Preset>().unwrap(), Preset::FireFlicker);
        assert_eq!("smooth-shift".parse::<Preset>().unwrap(), Preset::SmoothShift);
        assert_eq!("pulse_sync".parse::<Preset>().unwrap(), Preset::PulseSync);
        assert!(matches!(
            "strobe".parse::<Preset>(),
            Err(Error::InvalidPreset(_))
        ));
    }

    #[test]
    fn test_preset_display_matches_label() {
        for preset in Preset::ALL {
            assert_eq!(preset.to_string(), preset.label());
        }
    }
}
