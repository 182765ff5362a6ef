//! OptiSync Hardware Library
//!
//! Talks to OptiSync LED controllers (ESP32-based) over a serial control
//! channel, and reflashes their firmware through an external flashing tool.

pub mod channel;
pub mod command;
pub mod error;
pub mod flash;
pub mod notice;
pub mod port;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{Connection, CONTROL_BAUD_RATE, DEFAULT_TIMEOUT};
pub use command::{Command, Preset, Rgb, Speed};
pub use error::{Error, FlashFailure, Result};
pub use flash::{FirmwareImage, FirmwareUpdater, FlashOutcome, FlashState, FlasherConfig};
pub use notice::{Notice, NoticeLevel};
pub use port::PortSelection;
pub use session::{ColorChannel, Controls, SendOutcome, Session};
