//! Control session.
//!
//! Owns at most one open [`Connection`] together with the current control
//! values, so slider-style updates always send a complete, current message.

use crate::channel::{open_serial, Connection};
use crate::command::{Command, Preset, Rgb, Speed};
use crate::{Error, Result};
use std::str::FromStr;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio_serial::SerialStream;
use tracing::{debug, info, warn};

/// What happened to a command handed to [`Session::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The command was written to the open connection.
    Sent,
    /// No connection is open; nothing was written.
    NotConnected,
}

/// One channel of the color sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
}

impl FromStr for ColorChannel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "r" | "red" => Ok(ColorChannel::Red),
            "g" | "green" => Ok(ColorChannel::Green),
            "b" | "blue" => Ok(ColorChannel::Blue),
            _ => Err(Error::InvalidChannel(s.to_string())),
        }
    }
}

/// Current values of the controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    pub brightness: u8,
    pub speed: Speed,
    pub color: Rgb,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            brightness: 128,
            speed: Speed::default(),
            color: Rgb::default(),
        }
    }
}

/// A control session with at most one open connection.
pub struct Session<T = SerialStream> {
    connection: Option<Connection<T>>,
    controls: Controls,
}

impl<T: AsyncWrite + Unpin> Default for Session<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl Session<SerialStream> {
    /// Opens a serial port and makes it the active connection.
    ///
    /// See [`Session::connect_with`] for how an existing connection is treated.
    pub async fn connect(&mut self, port_name: &str, baud_rate: u32, timeout: Duration) -> Result<()> {
        self.connect_with(port_name, |name| open_serial(name, baud_rate, timeout))
            .await
    }
}

impl<T: AsyncWrite + Unpin> Session<T> {
    /// Creates a disconnected session with default controls.
    pub fn new() -> Self {
        Self {
            connection: None,
            controls: Controls::default(),
        }
    }

    /// Opens a port through `open` and makes it the active connection.
    ///
    /// The new port is opened first. If that fails the previous connection,
    /// if any, stays active and untouched. On success the previous connection
    /// is closed before being replaced.
    pub async fn connect_with<F>(&mut self, port_name: &str, open: F) -> Result<()>
    where
        F: FnOnce(&str) -> Result<T>,
    {
        let io = match open(port_name) {
            Ok(io) => io,
            Err(e) => {
                warn!("Failed to connect to {}: {}", port_name, e);
                return Err(e);
            }
        };

        if let Some(previous) = self.connection.take() {
            debug!("Replacing connection to {}", previous.port_name());
            if let Err(e) = previous.close().await {
                warn!("Error closing previous connection: {}", e);
            }
        }

        self.connection = Some(Connection::new(port_name, io));
        info!("Connected to {}", port_name);
        Ok(())
    }

    /// Closes the active connection. Returns whether one was open.
    ///
    /// Closing a disconnected session is a no-op. The port is released even
    /// when shutting the stream down reports an error.
    pub async fn close(&mut self) -> Result<bool> {
        match self.connection.take() {
            Some(connection) => connection.close().await.map(|_| true),
            None => Ok(false),
        }
    }

    /// Returns true if a connection is open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Returns the name of the connected port.
    pub fn port_name(&self) -> Option<&str> {
        self.connection.as_ref().map(Connection::port_name)
    }

    /// Returns the current control values.
    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// Sends a command if connected.
    ///
    /// Sending while disconnected writes nothing and is not an error.
    pub async fn send(&mut self, command: &Command) -> Result<SendOutcome> {
        match self.connection.as_mut() {
            Some(connection) => {
                connection.send(command).await?;
                Ok(SendOutcome::Sent)
            }
            None => {
                debug!("Not connected, dropping {} command", command.kind());
                Ok(SendOutcome::NotConnected)
            }
        }
    }

    /// Sets the brightness and sends it.
    pub async fn set_brightness(&mut self, value: u8) -> Result<SendOutcome> {
        self.controls.brightness = value;
        self.send(&Command::Brightness(value)).await
    }

    /// Sets the speed multiplier and sends it.
    ///
    /// Out-of-range values are rejected and nothing is sent.
    pub async fn set_speed(&mut self, value: f64) -> Result<SendOutcome> {
        let speed = Speed::new(value)?;
        self.controls.speed = speed;
        self.send(&Command::Speed(speed)).await
    }

    /// Moves one color slider and sends the full current color.
    pub async fn set_color_channel(
        &mut self,
        channel: ColorChannel,
        value: u8,
    ) -> Result<SendOutcome> {
        let mut color = self.controls.color;
        match channel {
            ColorChannel::Red => color.r = value,
            ColorChannel::Green => color.g = value,
            ColorChannel::Blue => color.b = value,
        }
        self.set_color(color).await
    }

    /// Sets all three color channels and sends them.
    pub async fn set_color(&mut self, color: Rgb) -> Result<SendOutcome> {
        self.controls.color = color;
        self.send(&Command::Color(color)).await
    }

    /// Switches to a built-in animation.
    pub async fn select_preset(&mut self, preset: Preset) -> Result<SendOutcome> {
        self.send(&Command::Preset(preset)).await
    }

    /// Asks the controller to persist its current settings.
    pub async fn save_preset(&mut self) -> Result<SendOutcome> {
        self.send(&Command::Save).await
    }
}
