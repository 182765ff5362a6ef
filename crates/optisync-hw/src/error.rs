//! Error types for the OptiSync hardware library.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the controller or flashing it.
#[derive(Error, Debug)]
pub enum Error {
    /// Serial port missing, or already claimed by another process.
    #[error("Failed to connect to {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// Writing a command line to an open port failed.
    #[error("Failed to write to {port}: {source}")]
    Transmission {
        port: String,
        #[source]
        source: std::io::Error,
    },

    /// An operation needing a concrete port was given the placeholder.
    #[error("No valid port selected (got {0:?})")]
    InvalidPort(String),

    /// The flashing utility executable could not be located.
    #[error("Flashing tool not found: {0}")]
    ToolNotFound(String),

    /// The flashing utility ran but did not succeed.
    #[error("Firmware flash failed: {0}")]
    Flash(FlashFailure),

    /// The flashing utility could not be started or waited on.
    #[error("Failed to run {program}: {source}")]
    Tool {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Command (de)serialization error.
    #[error("Command encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Speed outside the 0.1-5.0 slider range.
    #[error("Invalid speed (must be 0.1-5.0): {0}")]
    InvalidSpeed(f64),

    /// Unknown preset name.
    #[error("Invalid preset: {0}")]
    InvalidPreset(String),

    /// Unknown color channel name.
    #[error("Invalid color channel: {0}")]
    InvalidChannel(String),
}

/// Why a flashing run was considered failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashFailure {
    /// The tool exited with a non-zero status (`None` when killed by a signal).
    Exit(Option<i32>),
    /// The tool did not finish within the configured limit and was killed.
    TimedOut(Duration),
}

impl fmt::Display for FlashFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashFailure::Exit(Some(code)) => write!(f, "tool exited with status {}", code),
            FlashFailure::Exit(None) => write!(f, "tool terminated by signal"),
            FlashFailure::TimedOut(limit) => write!(f, "tool timed out after {:?}", limit),
        }
    }
}
