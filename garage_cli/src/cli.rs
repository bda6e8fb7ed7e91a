//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "garage", version, about = "Garage door controller")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/garage.toml")]
    pub config: PathBuf,

    /// Log and print as JSON lines instead of plain text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the door from line commands on stdin
    #[command(
        long_about = "Drive the door from line commands on stdin.\n\nCommands: open, close, stop, status, quit.\nIn simulation builds `sim <open|closed> <on|off>` flips a simulated sensor.\nState changes are printed as `event: <Name>` lines."
    )]
    Run,
    /// Load the config, build the door and report its initial state
    SelfCheck,
}
