//! Firmware update module.
//!
//! Hands a firmware image to an external flashing tool after releasing the
//! control channel's hold on the port.

mod runner;
mod updater;

pub use runner::{ProcessRunner, ToolExit, ToolRunner};
pub use updater::{
    FirmwareImage, FirmwareUpdater, FlashOutcome, FlashState, FlasherConfig, FLASH_BAUD_RATE,
};
