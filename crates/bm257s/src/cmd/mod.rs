use std::path::PathBuf;
use std::time::Duration;

use bm257s::measure::ModeChange;
use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod monitor;
pub mod ports;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print live readings from a meter.
    Monitor(MonitorArgs),
    /// Decode hex frames or a raw frame log offline.
    Decode(DecodeArgs),
    /// List serial ports.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Serial port the meter's adapter is attached to.
    #[arg(env = "BM257S_PORT", default_value = "/dev/ttyUSB0")]
    pub port: String,
    /// Print the mean over each window of this length (e.g. 2s, 500ms).
    #[arg(long)]
    pub window: Option<String>,
    /// Record every raw frame to this file.
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,
    /// Serial read timeout (e.g. 100ms).
    #[arg(long, default_value = "100ms")]
    pub read_timeout: String,
    /// Fail when no frame arrives for this long.
    #[arg(long, default_value = "5s")]
    pub idle_timeout: String,
    /// Exit after printing N readings.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frames as hex dumps, one argument per frame (e.g. "02 1a 20 ...").
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub frames: Vec<String>,
    /// Read frames from a log written by `monitor --log`.
    #[arg(long, value_name = "LOG")]
    pub file: Option<PathBuf>,
    /// What to do when the unit changes mid-batch: fail, truncate or ignore.
    #[arg(long, default_value = "fail")]
    pub mode_change: ModeChange,
    /// Print the mean of all readings instead of each one.
    #[arg(long)]
    pub average: bool,
}

#[derive(Args, Debug)]
pub struct PortsArgs {
    /// Only list USB adapters.
    #[arg(long)]
    pub usb: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
