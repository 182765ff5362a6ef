//! In-memory stand-ins for the serial port, shared by unit tests.

use crate::command::Command;
use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

#[derive(Default)]
struct Inner {
    events: Vec<String>,
    written: HashMap<String, Vec<u8>>,
}

/// Ordered record of writes, closes and spawns across fake devices.
#[derive(Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Inner>>);

impl EventLog {
    pub(crate) fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().events.push(event.into());
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().events.clone()
    }

    /// Decodes every line written to `port`.
    pub(crate) fn lines(&self, port: &str) -> Vec<Command> {
        let inner = self.0.lock().unwrap();
        inner
            .written
            .get(port)
            .map(|bytes| {
                bytes
                    .split_inclusive(|&b| b == b'\n')
                    .map(|line| Command::decode_line(line).unwrap())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Writable fake port that records into an [`EventLog`].
pub(crate) struct RecordingIo {
    port: String,
    log: EventLog,
}

impl RecordingIo {
    pub(crate) fn new(port: &str, log: EventLog) -> Self {
        Self {
            port: port.to_string(),
            log,
        }
    }
}

impl AsyncWrite for RecordingIo {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut inner = self.log.0.lock().unwrap();
        inner.events.push(format!("write {}", self.port));
        inner
            .written
            .entry(self.port.clone())
            .or_default()
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.log.push(format!("close {}", self.port));
        Poll::Ready(Ok(()))
    }
}
