//! Running the external flashing tool.

use crate::error::FlashFailure;
use crate::{Error, Result};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Exit status of a finished tool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ToolExit {
    /// Returns true for exit status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Something that can run the flashing tool to completion.
#[allow(async_fn_in_trait)]
pub trait ToolRunner {
    /// Runs `program` with `args` and waits for it to exit.
    ///
    /// Returns [`Error::ToolNotFound`] when `program` cannot be located and
    /// [`FlashFailure::TimedOut`] when `timeout` elapses first.
    async fn run(
        &mut self,
        program: &Path,
        args: &[OsString],
        timeout: Option<Duration>,
    ) -> Result<ToolExit>;
}

/// Runs the tool as a supervised child process.
///
/// The child inherits stdout and stderr so the tool's own progress output
/// stays visible. It is killed if the wait is abandoned or times out.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    async fn run(
        &mut self,
        program: &Path,
        args: &[OsString],
        timeout: Option<Duration>,
    ) -> Result<ToolExit> {
        debug!("Spawning {} {:?}", program.display(), args);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => Error::ToolNotFound(program.display().to_string()),
                _ => Error::Tool {
                    program: program.display().to_string(),
                    source,
                },
            })?;

        let waited = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    warn!("{} timed out after {:?}, killing it", program.display(), limit);
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill {}: {}", program.display(), e);
                    }
                    return Err(Error::Flash(FlashFailure::TimedOut(limit)));
                }
            },
            None => child.wait().await,
        };

        let status = waited.map_err(|source| Error::Tool {
            program: program.display().to_string(),
            source,
        })?;

        debug!("{} exited with {}", program.display(), status);
        Ok(ToolExit {
            code: status.code(),
        })
    }
}
