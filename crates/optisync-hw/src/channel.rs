//! Device command channel over a serial port.

use crate::command::Command;
use crate::{Error, Result};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info};

/// Control channel baud rate.
pub const CONTROL_BAUD_RATE: u32 = 115_200;

/// Read timeout applied to the opened port.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Opens a serial port for the control channel.
///
/// Fails with [`Error::Connection`] when the port does not exist or is held
/// by another process.
pub fn open_serial(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<SerialStream> {
    let stream = tokio_serial::new(port_name, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(timeout)
        .open_native_async()
        .map_err(|source| Error::Connection {
            port: port_name.to_string(),
            source,
        })?;

    debug!("Opened {} at {} baud", port_name, baud_rate);
    Ok(stream)
}

/// An open byte stream to the controller.
pub struct Connection<T = SerialStream> {
    port_name: String,
    io: T,
}

impl Connection<SerialStream> {
    /// Opens the named serial port.
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let io = open_serial(port_name, baud_rate, timeout)?;
        Ok(Self::new(port_name, io))
    }
}

impl<T: AsyncWrite + Unpin> Connection<T> {
    /// Wraps an already opened stream.
    pub fn new(port_name: impl Into<String>, io: T) -> Self {
        Self {
            port_name: port_name.into(),
            io,
        }
    }

    /// Returns the port name.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Writes one encoded command line.
    ///
    /// The line is encoded in full before anything is written, so a command
    /// is either handed to the port whole or not at all.
    pub async fn send(&mut self, command: &Command) -> Result<()> {
        let line = command.encode_line()?;

        debug!(
            "Sending to {}: {}",
            self.port_name,
            String::from_utf8_lossy(&line).trim_end()
        );

        self.io
            .write_all(&line)
            .await
            .map_err(|source| self.transmission(source))?;
        self.io
            .flush()
            .await
            .map_err(|source| self.transmission(source))?;

        Ok(())
    }

    /// Shuts the stream down and releases the port.
    pub async fn close(mut self) -> Result<()> {
        let result = self.io.shutdown().await;
        info!("Closed {}", self.port_name);
        result.map_err(|source| self.transmission(source))
    }

    fn transmission(&self, source: std::io::Error) -> Error {
        Error::Transmission {
            port: self.port_name.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Preset, Rgb};
    use tokio::io::{AsyncBufReadExt, BufReader};

    #[tokio::test]
    async fn test_send_writes_one_line_per_command() {
        let (client, server) = tokio::io::duplex(1024);
        let mut connection = Connection::new("test", client);

        connection.send(&Command::Brightness(42)).await.unwrap();
        connection
            .send(&Command::Color(Rgb::new(1, 2, 3)))
            .await
            .unwrap();
        connection
            .send(&Command::Preset(Preset::Waves))
            .await
            .unwrap();
        connection.close().await.unwrap();

        let mut lines = BufReader::new(server).lines();
        let mut received = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            received.push(line);
        }

        assert_eq!(
            received,
            vec![
                "{\"type\":\"brightness\",\"value\":42}",
                "{\"type\":\"color\",\"value\":{\"r\":1,\"g\":2,\"b\":3}}",
                "{\"type\":\"preset\",\"value\":\"Waves\"}",
            ]
        );
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_is_transmission_error() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let mut connection = Connection::new("gone", client);

        let err = connection.send(&Command::Save).await.unwrap_err();
        assert!(matches!(err, Error::Transmission { ref port, .. } if port == "gone"));
    }

    #[tokio::test]
    async fn test_open_missing_port_is_connection_error() {
        let err = Connection::open("/dev/optisync-missing-port", CONTROL_BAUD_RATE, DEFAULT_TIMEOUT)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connection { .. }));
    }
}
