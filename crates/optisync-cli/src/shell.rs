//! Interactive shell and command execution.
//!
//! One-shot subcommands and shell lines both end up as an [`Action`] run
//! against the same [`Controller`].

use anyhow::Result;
use optisync_hw::{
    ColorChannel, FirmwareImage, FirmwareUpdater, FlashOutcome, Notice, NoticeLevel,
    PortSelection, Preset, Rgb, SendOutcome, Session,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::config::SerialConfig;

/// Extension the firmware file chooser is restricted to.
pub const FIRMWARE_EXTENSION: &str = "bin";

/// Validates a firmware path argument.
pub fn firmware_path(s: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(s);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(FIRMWARE_EXTENSION) => Ok(path),
        _ => Err(format!("firmware must be a .{} file: {}", FIRMWARE_EXTENSION, s)),
    }
}

/// A single user intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Select a port without connecting.
    Port(String),
    /// Connect to the given port, or the selected one.
    Connect(Option<String>),
    Disconnect,
    Brightness(u8),
    Speed(f64),
    Channel(ColorChannel, u8),
    Color(Rgb),
    Preset(Preset),
    Save,
    /// Flash firmware; `None` means no file was chosen.
    Flash(Option<PathBuf>),
    Status,
    Presets,
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  port <name>              select a port
  connect [port]           connect to a port (default: selected)
  disconnect               close the connection
  brightness <0-255>       set brightness
  speed <0.1-5.0>          set speed multiplier
  red|green|blue <0-255>   move one color slider
  color <r> <g> <b>        set the full color
  preset <name>            select a preset
  presets                  list presets
  save                     save the current preset on the device
  flash [file.bin]         flash firmware to the selected port
  status                   show connection and control values
  quit                     leave the shell";

fn parse_u8(what: &str, value: Option<&str>) -> std::result::Result<u8, String> {
    let value = value.ok_or_else(|| format!("{} needs a value", what))?;
    value
        .parse()
        .map_err(|_| format!("{} must be 0-255, got {}", what, value))
}

/// Parses one shell line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> std::result::Result<Option<Action>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();

    let action = match word.to_lowercase().as_str() {
        "port" if !rest.is_empty() => Action::Port(rest.to_string()),
        "port" => return Err("port needs a name".to_string()),
        "connect" => Action::Connect((!rest.is_empty()).then(|| rest.to_string())),
        "disconnect" | "close" => Action::Disconnect,
        "brightness" => Action::Brightness(parse_u8("brightness", args.next())?),
        "speed" => {
            let value = args.next().ok_or("speed needs a value")?;
            Action::Speed(
                value
                    .parse()
                    .map_err(|_| format!("speed must be a number, got {}", value))?,
            )
        }
        "red" | "green" | "blue" => {
            let channel = word.parse::<ColorChannel>().map_err(|e| e.to_string())?;
            Action::Channel(channel, parse_u8(word, args.next())?)
        }
        "color" => Action::Color(Rgb::new(
            parse_u8("red", args.next())?,
            parse_u8("green", args.next())?,
            parse_u8("blue", args.next())?,
        )),
        "preset" => Action::Preset(rest.parse().map_err(|e: optisync_hw::Error| e.to_string())?),
        "presets" => Action::Presets,
        "save" => Action::Save,
        "flash" if rest.is_empty() => Action::Flash(None),
        "flash" => Action::Flash(Some(firmware_path(rest)?)),
        "status" => Action::Status,
        "help" | "?" => Action::Help,
        "quit" | "exit" => Action::Quit,
        other => return Err(format!("unknown command: {} (try 'help')", other)),
    };

    Ok(Some(action))
}

/// Whether the shell keeps reading after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Holds the session, the flashing flow and the selected port.
pub struct Controller {
    session: Session,
    updater: FirmwareUpdater,
    selected: PortSelection,
    serial: SerialConfig,
}

impl Controller {
    pub fn new(serial: SerialConfig, updater: FirmwareUpdater, selected: PortSelection) -> Self {
        Self {
            session: Session::new(),
            updater,
            selected,
            serial,
        }
    }

    /// Runs one action. Errors are returned for the caller to report.
    pub async fn execute(&mut self, action: Action) -> Result<Flow> {
        debug!("Executing {:?}", action);
        match action {
            Action::Port(name) => {
                self.selected = name.parse().unwrap_or_default();
                println!("Selected port: {}", self.selected);
            }
            Action::Connect(port) => {
                if let Some(name) = port {
                    self.selected = name.parse().unwrap_or_default();
                }
                let port = self.selected.require()?.to_string();
                self.session
                    .connect(&port, self.serial.baud, self.serial.timeout())
                    .await?;
                println!("Connected to {}", port);
            }
            Action::Disconnect => {
                if self.session.close().await? {
                    println!("Disconnected");
                } else {
                    println!("Not connected");
                }
            }
            Action::Brightness(value) => {
                let outcome = self.session.set_brightness(value).await?;
                report(outcome, format!("Brightness set to: {}", value));
            }
            Action::Speed(value) => {
                let outcome = self.session.set_speed(value).await?;
                report(outcome, format!("Speed set to: {}", value));
            }
            Action::Channel(channel, value) => {
                let outcome = self.session.set_color_channel(channel, value).await?;
                let c = self.session.controls().color;
                report(outcome, format!("Color set to: {} {} {}", c.r, c.g, c.b));
            }
            Action::Color(color) => {
                let outcome = self.session.set_color(color).await?;
                report(
                    outcome,
                    format!("Color set to: {} {} {}", color.r, color.g, color.b),
                );
            }
            Action::Preset(preset) => {
                let outcome = self.session.select_preset(preset).await?;
                report(outcome, format!("Preset set to: {}", preset));
            }
            Action::Save => {
                let outcome = self.session.save_preset().await?;
                report(outcome, "Preset saved".to_string());
            }
            Action::Flash(path) => {
                let image = path.map(FirmwareImage::new);
                if let FlashOutcome::Cancelled = self
                    .updater
                    .run(&mut self.session, &self.selected, image)
                    .await?
                {
                    println!("No firmware selected");
                }
            }
            Action::Status => {
                let controls = self.session.controls();
                println!("Status:");
                println!("  Selected port: {}", self.selected);
                println!(
                    "  Connected: {}",
                    self.session.port_name().unwrap_or("no")
                );
                println!("  Brightness: {}", controls.brightness);
                println!("  Speed: {}", controls.speed.value());
                println!(
                    "  Color: {} {} {}",
                    controls.color.r, controls.color.g, controls.color.b
                );
            }
            Action::Presets => {
                println!("Available presets:");
                for preset in Preset::ALL {
                    println!("  {}", preset);
                }
            }
            Action::Help => println!("{}", HELP),
            Action::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Releases the port.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.session.close().await?;
        Ok(())
    }

    /// Reads actions from stdin until `quit` or end of input.
    ///
    /// Failed actions are reported and the shell keeps going.
    pub async fn run_shell(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            stdout.write_all(b"optisync> ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            let action = match parse_line(&line) {
                Ok(Some(action)) => action,
                Ok(None) => continue,
                Err(msg) => {
                    eprintln!("{}", msg);
                    continue;
                }
            };

            match self.execute(action).await {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => show_error(&e),
            }
        }

        self.shutdown().await
    }
}

fn report(outcome: SendOutcome, message: String) {
    match outcome {
        SendOutcome::Sent => println!("{}", message),
        SendOutcome::NotConnected => println!("Not connected, nothing sent"),
    }
}

/// Prints an error as a notice when it came from the device layer.
pub fn show_error(err: &anyhow::Error) {
    match err.downcast_ref::<optisync_hw::Error>() {
        Some(hw) => eprintln!("{}", Notice::from(hw)),
        None => eprintln!("Error: {:#}", err),
    }
}

/// Prints progress notices raised during flashing.
///
/// Error notices are skipped; the failure comes back as the action's result
/// and is shown by [`show_error`].
pub fn print_notice(notice: &Notice) {
    if notice.level == NoticeLevel::Info {
        println!("{}", notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Action {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   # note").unwrap(), None);
    }

    #[test]
    fn test_control_lines() {
        assert_eq!(parse("brightness 200"), Action::Brightness(200));
        assert_eq!(parse("speed 2.5"), Action::Speed(2.5));
        assert_eq!(parse("green 10"), Action::Channel(ColorChannel::Green, 10));
        assert_eq!(parse("color 1 2 3"), Action::Color(Rgb::new(1, 2, 3)));
        assert_eq!(parse("preset Fire Flicker"), Action::Preset(Preset::FireFlicker));
        assert_eq!(parse("SAVE"), Action::Save);
    }

    #[test]
    fn test_port_lines() {
        assert_eq!(parse("connect"), Action::Connect(None));
        assert_eq!(
            parse("connect /dev/ttyUSB0"),
            Action::Connect(Some("/dev/ttyUSB0".to_string()))
        );
        assert_eq!(parse("port COM3"), Action::Port("COM3".to_string()));
        assert!(parse_line("port").is_err());
    }

    #[test]
    fn test_flash_lines() {
        assert_eq!(parse("flash"), Action::Flash(None));
        assert_eq!(
            parse("flash build/fw.bin"),
            Action::Flash(Some(PathBuf::from("build/fw.bin")))
        );
        assert!(parse_line("flash fw.elf").is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse_line("brightness 256").is_err());
        assert!(parse_line("brightness").is_err());
        assert!(parse_line("speed fast").is_err());
        assert!(parse_line("color 1 2").is_err());
        assert!(parse_line("preset strobe").is_err());
        assert!(parse_line("dance").is_err());
    }

    #[test]
    fn test_firmware_path_extension() {
        assert!(firmware_path("fw.bin").is_ok());
        assert!(firmware_path("FW.BIN").is_ok());
        assert!(firmware_path("fw").is_err());
        assert!(firmware_path("fw.hex").is_err());
    }
}
