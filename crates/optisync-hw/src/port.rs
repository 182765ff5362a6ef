//! Port selection.
//!
//! A selection is either a concrete device identifier or the placeholder shown
//! before the user has picked one (or when none were found).

use crate::{Error, Result};
use std::convert::Infallible;
use std::str::FromStr;

/// Label shown when no port has been picked yet.
pub const SELECT_PORT_PLACEHOLDER: &str = "Select Port";

/// Label shown when enumeration found nothing.
pub const NO_PORTS_PLACEHOLDER: &str = "No ports found";

/// The currently selected serial port.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PortSelection {
    /// Nothing usable selected.
    #[default]
    Unselected,
    /// A concrete device such as `/dev/ttyUSB0` or `COM3`.
    Device(String),
}

impl PortSelection {
    /// Returns the device identifier, if one is selected.
    pub fn device(&self) -> Option<&str> {
        match self {
            PortSelection::Unselected => None,
            PortSelection::Device(name) => Some(name),
        }
    }

    /// Returns the device identifier or [`Error::InvalidPort`].
    pub fn require(&self) -> Result<&str> {
        self.device()
            .ok_or_else(|| Error::InvalidPort(self.to_string()))
    }
}

impl From<Option<String>> for PortSelection {
    fn from(value: Option<String>) -> Self {
        value.map_or(PortSelection::Unselected, |name| {
            name.parse().unwrap_or_default()
        })
    }
}

impl FromStr for PortSelection {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Infallible> {
        let name = s.trim();
        if name.is_empty() || name == SELECT_PORT_PLACEHOLDER || name == NO_PORTS_PLACEHOLDER {
            Ok(PortSelection::Unselected)
        } else {
            Ok(PortSelection::Device(name.to_string()))
        }
    }
}

impl std::fmt::Display for PortSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortSelection::Unselected => f.write_str(SELECT_PORT_PLACEHOLDER),
            PortSelection::Device(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_unselected() {
        for label in ["Select Port", "No ports found", "", "   "] {
            let selection: PortSelection = label.parse().unwrap();
            assert_eq!(selection, PortSelection::Unselected);
            assert!(matches!(selection.require(), Err(Error::InvalidPort(_))));
        }
    }

    #[test]
    fn test_device_selection() {
        let selection: PortSelection = " /dev/ttyUSB0 ".parse().unwrap();
        assert_eq!(selection.device(), Some("/dev/ttyUSB0"));
        assert_eq!(selection.to_string(), "/dev/ttyUSB0");
    }

    #[test]
    fn test_from_option() {
        assert_eq!(PortSelection::from(None), PortSelection::Unselected);
        assert_eq!(
            PortSelection::from(Some("COM3".to_string())),
            PortSelection::Device("COM3".to_string())
        );
    }
}
