//! OptiSync Control Tool
//!
//! CLI for driving an OptiSync LED controller over its serial control channel
//! and for reflashing its firmware.

mod config;
mod shell;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use optisync_hw::{FirmwareUpdater, FlasherConfig, PortSelection, Preset, Rgb};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::Config;
use shell::{Action, Controller};

#[derive(Parser)]
#[command(name = "optisyncctl")]
#[command(about = "Control tool for OptiSync LED controllers")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial port (e.g., /dev/ttyUSB0 or COM3)
    #[arg(short, long)]
    port: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set brightness
    Brightness {
        /// Brightness (0-255)
        value: u8,
    },
    /// Set animation speed multiplier
    Speed {
        /// Speed multiplier (0.1-5.0)
        value: f64,
    },
    /// Set a solid color
    Color {
        /// Red channel (0-255)
        #[arg(short, long, default_value = "0")]
        red: u8,

        /// Green channel (0-255)
        #[arg(short, long, default_value = "0")]
        green: u8,

        /// Blue channel (0-255)
        #[arg(short, long, default_value = "0")]
        blue: u8,
    },
    /// Select a preset animation
    Preset {
        /// Preset: rainbow, solid, smooth-shift, fire-flicker, waves, pulse-sync
        #[arg(value_parser = parse_preset)]
        name: Preset,
    },
    /// List available presets
    Presets,
    /// Save the current preset on the device
    Save,
    /// Flash firmware with the external flashing tool
    Flash {
        /// Firmware image (.bin); omit to cancel
        #[arg(value_name = "FILE", value_parser = shell::firmware_path)]
        file: Option<PathBuf>,
    },
    /// Interactive session keeping the connection open
    Shell,
}

fn parse_preset(s: &str) -> std::result::Result<Preset, String> {
    s.parse().map_err(|e: optisync_hw::Error| e.to_string())
}

impl Commands {
    /// Maps a one-shot subcommand to its action, and whether it needs an open
    /// connection first. `None` for the interactive shell.
    fn action(self) -> Option<(Action, bool)> {
        let mapped = match self {
            Commands::Brightness { value } => (Action::Brightness(value), true),
            Commands::Speed { value } => (Action::Speed(value), true),
            Commands::Color { red, green, blue } => {
                (Action::Color(Rgb::new(red, green, blue)), true)
            }
            Commands::Preset { name } => (Action::Preset(name), true),
            Commands::Presets => (Action::Presets, false),
            Commands::Save => (Action::Save, true),
            Commands::Flash { file } => (Action::Flash(file), false),
            Commands::Shell => return None,
        };
        Some(mapped)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let selected = PortSelection::from(cli.port.or_else(|| config.serial.port.clone()));
    let updater = FirmwareUpdater::new(FlasherConfig::from(&config.flasher))
        .on_notice(shell::print_notice);
    let mut controller = Controller::new(config.serial.clone(), updater, selected);

    let Some((action, needs_connection)) = cli.command.action() else {
        println!("OptiSync shell. Type 'help' for commands.");
        return controller.run_shell().await;
    };

    let result = run_once(&mut controller, action, needs_connection).await;
    controller.shutdown().await?;
    if let Err(e) = result {
        shell::show_error(&e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run_once(
    controller: &mut Controller,
    action: Action,
    needs_connection: bool,
) -> Result<()> {
    if needs_connection {
        controller.execute(Action::Connect(None)).await?;
    }
    controller.execute(action).await?;
    Ok(())
}
