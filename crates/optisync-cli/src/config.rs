//! Configuration management.

use anyhow::{Context, Result};
use optisync_hw::{FlasherConfig, CONTROL_BAUD_RATE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Serial control channel
    #[serde(default)]
    pub serial: SerialConfig,

    /// Firmware flashing tool
    #[serde(default)]
    pub flasher: FlasherSection,
}

/// Serial port configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Default port path (overridden by --port)
    #[serde(default)]
    pub port: Option<String>,

    /// Control channel baud rate
    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Read timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: default_baud(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Flashing tool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlasherSection {
    /// Tool executable
    #[serde(default = "default_tool")]
    pub tool: PathBuf,

    /// Target chip
    #[serde(default = "default_chip")]
    pub chip: String,

    /// Flashing baud rate
    #[serde(default = "default_flash_baud")]
    pub baud: u32,

    /// Flash offset
    #[serde(default = "default_offset")]
    pub offset: String,

    /// Compress the image in transit
    #[serde(default = "default_compress")]
    pub compress: bool,

    /// Delay after a successful flash in milliseconds
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Give up on the tool after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for FlasherSection {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            chip: default_chip(),
            baud: default_flash_baud(),
            offset: default_offset(),
            compress: default_compress(),
            settle_ms: default_settle_ms(),
            timeout_secs: None,
        }
    }
}

impl From<&FlasherSection> for FlasherConfig {
    fn from(section: &FlasherSection) -> Self {
        Self {
            tool: section.tool.clone(),
            chip: section.chip.clone(),
            baud: section.baud,
            offset: section.offset.clone(),
            compress: section.compress,
            settle: Duration::from_millis(section.settle_ms),
            timeout: section.timeout_secs.map(Duration::from_secs),
        }
    }
}

// Default value functions
fn default_baud() -> u32 {
    CONTROL_BAUD_RATE
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_tool() -> PathBuf {
    FlasherConfig::default().tool
}

fn default_chip() -> String {
    FlasherConfig::default().chip
}

fn default_flash_baud() -> u32 {
    FlasherConfig::default().baud
}

fn default_offset() -> String {
    FlasherConfig::default().offset
}

fn default_compress() -> bool {
    true
}

fn default_settle_ms() -> u64 {
    2000
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read configuration file {}",
                path.as_ref().display()
            )
        })?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Loads `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.serial.port, None);

        let flasher = FlasherConfig::from(&config.flasher);
        assert_eq!(flasher, FlasherConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[serial]\nport = \"/dev/ttyUSB1\"\n\n[flasher]\ntool = \"/opt/esptool/esptool\"\ntimeout_secs = 90"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.serial.timeout(), Duration::from_millis(1000));

        let flasher = FlasherConfig::from(&config.flasher);
        assert_eq!(flasher.tool, PathBuf::from("/opt/esptool/esptool"));
        assert_eq!(flasher.baud, 460_800);
        assert_eq!(flasher.timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(dir.path().join("nope.toml")).is_err());
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
    }
}
