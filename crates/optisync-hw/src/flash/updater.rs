//! Firmware update flow.

use super::runner::{ProcessRunner, ToolRunner};
use crate::error::FlashFailure;
use crate::notice::Notice;
use crate::port::PortSelection;
use crate::session::Session;
use crate::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

/// Baud rate used while flashing, higher than the control channel's.
pub const FLASH_BAUD_RATE: u32 = 460_800;

/// A firmware binary picked by the user. Its content is never inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    path: PathBuf,
}

impl FirmwareImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Flashing tool invocation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FlasherConfig {
    /// Tool executable, looked up on PATH when not a path.
    pub tool: PathBuf,
    /// Target chip identifier.
    pub chip: String,
    /// Baud rate for the transfer.
    pub baud: u32,
    /// Flash offset the image is written at.
    pub offset: String,
    /// Pass `-z` so the tool compresses the image in transit.
    pub compress: bool,
    /// Pause after a successful flash before reporting it.
    pub settle: Duration,
    /// Kill the tool if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl Default for FlasherConfig {
    fn default() -> Self {
        Self {
            tool: PathBuf::from("esptool"),
            chip: "esp32".to_string(),
            baud: FLASH_BAUD_RATE,
            offset: "0x0".to_string(),
            compress: true,
            settle: Duration::from_secs(2),
            timeout: None,
        }
    }
}

impl FlasherConfig {
    /// Builds the tool's argument list.
    pub fn args(&self, port: &str, image: &FirmwareImage) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--chip".into(),
            self.chip.as_str().into(),
            "--port".into(),
            port.into(),
            "--baud".into(),
            self.baud.to_string().into(),
            "write-flash".into(),
        ];
        if self.compress {
            args.push("-z".into());
        }
        args.push(self.offset.as_str().into());
        args.push(image.path().into());
        args
    }
}

/// Where the update flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashState {
    #[default]
    Idle,
    PromptingForFile,
    ValidatingPort,
    ClosingConnection,
    Invoking,
    Success,
    Failed,
}

impl std::fmt::Display for FlashState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FlashState::Idle => "idle",
            FlashState::PromptingForFile => "prompting-for-file",
            FlashState::ValidatingPort => "validating-port",
            FlashState::ClosingConnection => "closing-connection",
            FlashState::Invoking => "invoking",
            FlashState::Success => "success",
            FlashState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a completed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOutcome {
    /// No image was selected; nothing happened.
    Cancelled,
    /// The tool reported success.
    Flashed,
}

type Notifier = Box<dyn FnMut(&Notice) + Send>;

/// Drives one firmware update at a time.
///
/// Every run ends back in [`FlashState::Idle`]. Failures are never retried.
pub struct FirmwareUpdater<R = ProcessRunner> {
    config: FlasherConfig,
    runner: R,
    state: FlashState,
    notifier: Option<Notifier>,
    trail: Vec<FlashState>,
}

impl FirmwareUpdater<ProcessRunner> {
    /// Creates an updater that spawns the real tool.
    pub fn new(config: FlasherConfig) -> Self {
        Self::with_runner(config, ProcessRunner)
    }
}

impl<R: ToolRunner> FirmwareUpdater<R> {
    /// Creates an updater with a custom tool runner.
    pub fn with_runner(config: FlasherConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            state: FlashState::Idle,
            notifier: None,
            trail: Vec::new(),
        }
    }

    /// Registers a callback for user-facing notices.
    pub fn on_notice(mut self, notifier: impl FnMut(&Notice) + Send + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn config(&self) -> &FlasherConfig {
        &self.config
    }

    pub fn state(&self) -> FlashState {
        self.state
    }

    /// States visited by the most recent run, in order.
    pub fn trail(&self) -> &[FlashState] {
        &self.trail
    }

    /// Flashes `image` to the device on `port`.
    ///
    /// `image` is `None` when the user cancelled file selection. The
    /// session's connection is closed before the tool is spawned and is not
    /// reopened afterwards.
    pub async fn run<T: AsyncWrite + Unpin>(
        &mut self,
        session: &mut Session<T>,
        port: &PortSelection,
        image: Option<FirmwareImage>,
    ) -> Result<FlashOutcome> {
        self.trail.clear();
        let result = self.drive(session, port, image).await;

        match &result {
            Ok(FlashOutcome::Flashed) => {
                self.enter(FlashState::Success);
                info!("Firmware flashed");
                self.notify(Notice::flashed());
            }
            Ok(FlashOutcome::Cancelled) => {}
            Err(e) => {
                self.enter(FlashState::Failed);
                warn!("Firmware update failed: {}", e);
                self.notify(Notice::from(e));
            }
        }

        self.enter(FlashState::Idle);
        result
    }

    async fn drive<T: AsyncWrite + Unpin>(
        &mut self,
        session: &mut Session<T>,
        port: &PortSelection,
        image: Option<FirmwareImage>,
    ) -> Result<FlashOutcome> {
        self.enter(FlashState::PromptingForFile);
        let Some(image) = image else {
            info!("No firmware selected, update cancelled");
            return Ok(FlashOutcome::Cancelled);
        };

        self.enter(FlashState::ValidatingPort);
        let port = port.require()?;

        self.enter(FlashState::ClosingConnection);
        if let Err(e) = session.close().await {
            warn!("Error closing connection before flashing: {}", e);
        }

        self.enter(FlashState::Invoking);
        self.notify(Notice::flashing());
        let args = self.config.args(port, &image);
        info!(
            "Flashing {} to {} with {}",
            image.path().display(),
            port,
            self.config.tool.display()
        );

        let exit = self
            .runner
            .run(&self.config.tool, &args, self.config.timeout)
            .await?;
        if !exit.success() {
            return Err(Error::Flash(FlashFailure::Exit(exit.code)));
        }

        if !self.config.settle.is_zero() {
            tokio::time::sleep(self.config.settle).await;
        }
        Ok(FlashOutcome::Flashed)
    }

    fn enter(&mut self, state: FlashState) {
        debug!("Flash state: {} -> {}", self.state, state);
        self.state = state;
        self.trail.push(state);
    }

    fn notify(&mut self, notice: Notice) {
        if let Some(notifier) = self.notifier.as_mut() {
            notifier(&notice);
        }
    }
}
