//! CLI command definitions and handlers.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Load configuration with graceful fallback to defaults.
///
/// If the config file doesn't exist or can't be parsed, the defaults are
/// used and a warning is logged.
pub fn load_config() -> inkport_core::config::Config {
    inkport_core::config::Config::load().unwrap_or_else(|e| {
        tracing::warn!("Ignoring configuration: {}", e);
        inkport_core::config::Config::default()
    })
}

pub mod config;
pub mod envelope;
pub mod extract;
pub mod import;
pub mod inspect;

/// Inkport - export and re-import 3D ink sessions
#[derive(Parser)]
#[command(name = "inkport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Detailed logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Extract the latest exported session from a log file
    Extract(ExtractArgs),

    /// Wrap a payload file as a transport line
    Envelope(EnvelopeArgs),

    /// Decode and summarize a payload
    Inspect(InspectArgs),

    /// Import a payload through the board state machine
    Import(ImportArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the extract command
#[derive(Parser)]
pub struct ExtractArgs {
    /// Log file to search
    pub log: PathBuf,

    /// Write the payload here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the envelope command
#[derive(Parser)]
pub struct EnvelopeArgs {
    /// Payload JSON file
    pub payload: PathBuf,

    /// Emit one line per stroke between export markers
    #[arg(long)]
    pub per_stroke: bool,

    /// Keep the payload's timestamp instead of stamping the current time
    #[arg(long)]
    pub keep_timestamp: bool,
}

/// Arguments for the inspect command
#[derive(Parser)]
pub struct InspectArgs {
    /// Payload path or URL
    pub locator: String,

    /// Scale used for the reported size
    #[arg(short, long)]
    pub scale: Option<f32>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the import command
#[derive(Parser)]
pub struct ImportArgs {
    /// Payload path or URL
    pub locator: String,

    /// Scale factor applied to positions and widths
    #[arg(short, long)]
    pub scale: Option<f32>,

    /// Import into the pickup container
    #[arg(long)]
    pub pickup: bool,

    /// Accept a payload larger than the configured size limit
    #[arg(long)]
    pub confirm: bool,

    /// Write the resulting scene as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show all configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Reset to defaults
    Reset,
}
